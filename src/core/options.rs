use std::collections::BTreeMap;
use std::ffi::OsString;

/// Command-line options in the engine's `--key=value` grammar, plus the
/// trailing paths to play.
///
/// `--flag` means `yes`, `--no-flag` means `no`, `--key=value` is taken
/// literally. `--` ends option parsing and a lone `-` (standard input) is a
/// path. When a key repeats, the first occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionParser {
    pub options: BTreeMap<String, String>,
    pub paths: Vec<String>,
}

impl OptionParser {
    /// Parse arguments, excluding the program name.
    pub fn parse<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut parser = Self::default();
        let mut options_done = false;

        for arg in args {
            let arg: String = arg.into();
            if options_done || arg == "-" || !arg.starts_with('-') {
                parser.paths.push(arg);
                continue;
            }

            let name = match arg.strip_prefix("--") {
                Some("") => {
                    options_done = true;
                    continue;
                }
                Some(name) => name,
                None => &arg[1..],
            };
            let (key, value) = if let Some(negated) = name.strip_prefix("no-") {
                if negated.is_empty() {
                    continue;
                }
                (negated.to_string(), "no".to_string())
            } else if let Some((key, value)) = name.split_once('=') {
                (key.to_string(), value.to_string())
            } else {
                (name.to_string(), "yes".to_string())
            };
            parser.options.entry(key).or_insert(value);
        }

        parser
    }

    /// Parse raw platform arguments. Arguments that are not valid Unicode
    /// are decoded lossily, since the engine protocol only carries text.
    pub fn parse_os<I>(args: I) -> Self
    where
        I: IntoIterator<Item = OsString>,
    {
        Self::parse(args.into_iter().map(|arg| match arg.into_string() {
            Ok(arg) => arg,
            Err(raw) => {
                let decoded = raw.to_string_lossy().into_owned();
                log::warn!("Argument {:?} is not valid Unicode, using {:?}", raw, decoded);
                decoded
            }
        }))
    }

    pub fn from_env() -> Self {
        Self::parse_os(std::env::args_os().skip(1))
    }

    #[cfg(test)]
    pub fn check(&self, key: &str, value: &str) -> bool {
        self.options.get(key).map(|v| v == value).unwrap_or(false)
    }
}
