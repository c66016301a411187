// =============================================================================
// ENGINE PROTOCOL TYPES
// =============================================================================
//
// The playback engine is an opaque component. Everything we exchange with it
// is one of: a named property in a fixed wire format, a command made of
// string arguments, or an event from its asynchronous event stream.
//
// =============================================================================

use std::fmt;

/// Wire format of a property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    None,
    String,
    Flag,
    Int64,
    Double,
    Node,
}

/// A decoded property value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    String(String),
    Flag(bool),
    Int64(i64),
    Double(f64),
    Node(serde_json::Value),
}

impl Value {
    pub fn format(&self) -> Format {
        match self {
            Value::None => Format::None,
            Value::String(_) => Format::String,
            Value::Flag(_) => Format::Flag,
            Value::Int64(_) => Format::Int64,
            Value::Double(_) => Format::Double,
            Value::Node(_) => Format::Node,
        }
    }

    /// Convert a JSON payload into the requested format.
    ///
    /// The engine returns every value as JSON over IPC, so the conversion is
    /// lenient: numbers coerce between integer and float, flags render as
    /// `yes`/`no` when a string is asked for. Anything that cannot be
    /// represented becomes `Value::None`.
    pub fn from_json(json: &serde_json::Value, format: Format) -> Value {
        use serde_json::Value as Json;

        match (format, json) {
            (_, Json::Null) => Value::None,
            (Format::None, _) => Value::None,
            (Format::Node, other) => Value::Node(other.clone()),
            (Format::Flag, Json::Bool(b)) => Value::Flag(*b),
            (Format::Flag, Json::String(s)) => match s.as_str() {
                "yes" => Value::Flag(true),
                "no" => Value::Flag(false),
                _ => Value::None,
            },
            (Format::Int64, Json::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .map(Value::Int64)
                .unwrap_or(Value::None),
            (Format::Double, Json::Number(n)) => n.as_f64().map(Value::Double).unwrap_or(Value::None),
            (Format::String, Json::String(s)) => Value::String(s.clone()),
            (Format::String, Json::Bool(b)) => Value::String(if *b { "yes" } else { "no" }.to_string()),
            (Format::String, other) => Value::String(other.to_string()),
            _ => Value::None,
        }
    }

    /// Reinterpret this value in another format. Used when the same property
    /// is consumed in several formats, or when a backend delivers raw nodes.
    pub fn coerce(&self, format: Format) -> Value {
        if self.format() == format {
            return self.clone();
        }
        match (self, format) {
            (Value::Node(json), _) => Value::from_json(json, format),
            (Value::Int64(i), Format::Double) => Value::Double(*i as f64),
            (Value::Double(f), Format::Int64) => Value::Int64(*f as i64),
            (Value::Flag(b), Format::String) => Value::String(if *b { "yes" } else { "no" }.to_string()),
            (Value::String(s), Format::Flag) => match s.as_str() {
                "yes" => Value::Flag(true),
                "no" => Value::Flag(false),
                _ => Value::None,
            },
            (Value::String(s), Format::Int64) => s.parse().map(Value::Int64).unwrap_or(Value::None),
            (Value::String(s), Format::Double) => s.parse().map(Value::Double).unwrap_or(Value::None),
            (Value::Int64(i), Format::String) => Value::String(i.to_string()),
            (Value::Double(f), Format::String) => Value::String(format!("{:.6}", f)),
            (other, Format::Node) => Value::Node(other.to_json()),
            _ => Value::None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::None => serde_json::Value::Null,
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Flag(b) => serde_json::Value::Bool(*b),
            Value::Int64(i) => serde_json::Value::from(*i),
            Value::Double(f) => serde_json::Value::from(*f),
            Value::Node(node) => node.clone(),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Flag(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int64(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Double(f)
    }
}

/// A Rust type that maps onto one engine wire format.
///
/// Decoding never fails: an absent or mismatched value yields the type's
/// zero value, which is what callers of a property getter expect.
pub trait PropertyValue: Sized + Send + 'static {
    const FORMAT: Format;

    fn from_value(value: &Value) -> Option<Self>;

    fn decode(value: &Value) -> Self
    where
        Self: Default,
    {
        Self::from_value(value).unwrap_or_default()
    }
}

impl PropertyValue for bool {
    const FORMAT: Format = Format::Flag;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Flag(b) => Some(*b),
            _ => None,
        }
    }
}

impl PropertyValue for i64 {
    const FORMAT: Format = Format::Int64;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int64(i) => Some(*i),
            Value::Double(f) => Some(*f as i64),
            _ => None,
        }
    }
}

impl PropertyValue for f64 {
    const FORMAT: Format = Format::Double;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Double(f) => Some(*f),
            Value::Int64(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl PropertyValue for String {
    const FORMAT: Format = Format::String;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl PropertyValue for serde_json::Value {
    const FORMAT: Format = Format::Node;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Node(node) => Some(node.clone()),
            _ => None,
        }
    }
}

/// Engine status codes. Negative on the wire, zero is success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    EventQueueFull,
    NoMem,
    Uninitialized,
    InvalidParameter,
    OptionNotFound,
    OptionFormat,
    OptionError,
    PropertyNotFound,
    PropertyFormat,
    PropertyUnavailable,
    PropertyError,
    Command,
    LoadingFailed,
    AoInitFailed,
    VoInitFailed,
    NothingToPlay,
    UnknownFormat,
    Unsupported,
    NotImplemented,
    Generic,
}

const ERROR_TABLE: &[(ErrorCode, i32, &str)] = &[
    (ErrorCode::EventQueueFull, -1, "event queue full"),
    (ErrorCode::NoMem, -2, "memory allocation failed"),
    (ErrorCode::Uninitialized, -3, "core not uninitialized"),
    (ErrorCode::InvalidParameter, -4, "invalid parameter"),
    (ErrorCode::OptionNotFound, -5, "option not found"),
    (ErrorCode::OptionFormat, -6, "unsupported format for accessing option"),
    (ErrorCode::OptionError, -7, "error setting option"),
    (ErrorCode::PropertyNotFound, -8, "property not found"),
    (ErrorCode::PropertyFormat, -9, "unsupported format for accessing property"),
    (ErrorCode::PropertyUnavailable, -10, "property unavailable"),
    (ErrorCode::PropertyError, -11, "error accessing property"),
    (ErrorCode::Command, -12, "error running command"),
    (ErrorCode::LoadingFailed, -13, "loading failed"),
    (ErrorCode::AoInitFailed, -14, "audio output initialization failed"),
    (ErrorCode::VoInitFailed, -15, "video output initialization failed"),
    (ErrorCode::NothingToPlay, -16, "no audio or video data played"),
    (ErrorCode::UnknownFormat, -17, "unrecognized file format"),
    (ErrorCode::Unsupported, -18, "not supported"),
    (ErrorCode::NotImplemented, -19, "operation not implemented"),
    (ErrorCode::Generic, -20, "something happened"),
];

impl ErrorCode {
    pub fn as_raw(self) -> i32 {
        ERROR_TABLE
            .iter()
            .find(|(code, _, _)| *code == self)
            .map(|(_, raw, _)| *raw)
            .unwrap_or(-20)
    }

    /// Map the engine's error string back to a code. Unknown strings are
    /// treated as a generic failure.
    pub fn from_message(message: &str) -> Self {
        ERROR_TABLE
            .iter()
            .find(|(_, _, text)| *text == message)
            .map(|(code, _, _)| *code)
            .unwrap_or(ErrorCode::Generic)
    }

    pub fn message(self) -> &'static str {
        ERROR_TABLE
            .iter()
            .find(|(code, _, _)| *code == self)
            .map(|(_, _, text)| *text)
            .unwrap_or("something happened")
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// A single entry of the engine's log stream.
#[derive(Debug, Clone, PartialEq)]
pub struct LogMessage {
    pub prefix: String,
    pub level: String,
    pub text: String,
}

impl LogMessage {
    pub fn log_level(&self) -> log::Level {
        match self.level.as_str() {
            "fatal" | "error" => log::Level::Error,
            "warn" => log::Level::Warn,
            "info" => log::Level::Info,
            "v" | "debug" => log::Level::Debug,
            _ => log::Level::Trace,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Shutdown,
    StartFile,
    EndFile,
    FileLoaded,
    Idle,
    VideoReconfig,
    AudioReconfig,
    Seek,
    PlaybackRestart,
    ClientMessage(Vec<String>),
    LogMessage(LogMessage),
    PropertyChange { name: String, value: Value },
    Other(String),
}

/// Subscription key for [`Event`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Shutdown,
    StartFile,
    EndFile,
    FileLoaded,
    Idle,
    VideoReconfig,
    AudioReconfig,
    Seek,
    PlaybackRestart,
    ClientMessage,
    LogMessage,
    PropertyChange,
    Other,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Shutdown => EventKind::Shutdown,
            Event::StartFile => EventKind::StartFile,
            Event::EndFile => EventKind::EndFile,
            Event::FileLoaded => EventKind::FileLoaded,
            Event::Idle => EventKind::Idle,
            Event::VideoReconfig => EventKind::VideoReconfig,
            Event::AudioReconfig => EventKind::AudioReconfig,
            Event::Seek => EventKind::Seek,
            Event::PlaybackRestart => EventKind::PlaybackRestart,
            Event::ClientMessage(_) => EventKind::ClientMessage,
            Event::LogMessage(_) => EventKind::LogMessage,
            Event::PropertyChange { .. } => EventKind::PropertyChange,
            Event::Other(_) => EventKind::Other,
        }
    }

    /// Build an event from its protocol name. Payload-carrying events are
    /// constructed by the backend directly.
    pub fn from_name(name: &str) -> Event {
        match name {
            "shutdown" => Event::Shutdown,
            "start-file" => Event::StartFile,
            "end-file" => Event::EndFile,
            "file-loaded" => Event::FileLoaded,
            "idle" => Event::Idle,
            "video-reconfig" => Event::VideoReconfig,
            "audio-reconfig" => Event::AudioReconfig,
            "seek" => Event::Seek,
            "playback-restart" => Event::PlaybackRestart,
            other => Event::Other(other.to_string()),
        }
    }
}
