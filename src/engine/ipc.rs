// =============================================================================
// IPC BACKEND - DRIVES AN EXTERNAL ENGINE PROCESS OVER ITS JSON SOCKET
// =============================================================================
//
// The engine process is launched idle, embedded into our window through its
// native id, and controlled through newline-delimited JSON:
//
//   -> {"command": ["get_property", "pause"], "request_id": 7}
//   <- {"request_id": 7, "error": "success", "data": false}
//   <- {"event": "property-change", "id": 3, "name": "pause", "data": true}
//
// A reader thread routes replies to the caller waiting on that request id and
// pushes everything else into the event stream consumed by `wait_event`.
// When the socket closes the stream receives a final `Shutdown`.
//
// =============================================================================

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[cfg(unix)]
use std::os::unix::net::UnixStream;

use parking_lot::Mutex;
use serde_json::{json, Value as Json};
use tokio::sync::oneshot;

use crate::engine::backend::{Backend, Notify, RenderContext};
use crate::engine::error::{EngineError, Result};
use crate::engine::protocol::{ErrorCode, Event, Format, LogMessage, Value};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const QUIT_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct IpcConfig {
    /// Engine executable, looked up on `PATH` when not absolute.
    pub binary: PathBuf,
    /// Native id of the window to embed into. 0 lets the engine open its own.
    pub wid: u64,
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("mpv"),
            wid: 0,
        }
    }
}

#[derive(Debug)]
struct Reply {
    error: String,
    data: Json,
}

type Replies = Arc<Mutex<HashMap<u64, oneshot::Sender<Reply>>>>;
type Formats = Arc<Mutex<HashMap<u64, Format>>>;

pub struct IpcBackend {
    config: IpcConfig,
    socket_path: PathBuf,
    pending_options: Mutex<Vec<(String, String)>>,
    started: AtomicBool,
    #[cfg(unix)]
    writer: Mutex<Option<UnixStream>>,
    child: Mutex<Option<Child>>,
    reader: Mutex<Option<thread::JoinHandle<()>>>,
    next_request: AtomicU64,
    replies: Replies,
    formats: Formats,
    events_tx: mpsc::Sender<Option<Event>>,
    events_rx: Mutex<mpsc::Receiver<Option<Event>>>,
}

impl IpcBackend {
    pub fn new(config: IpcConfig) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        let socket_path = std::env::temp_dir().join(format!("glimpse-{}.sock", uuid::Uuid::new_v4()));

        Self {
            config,
            socket_path,
            pending_options: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
            #[cfg(unix)]
            writer: Mutex::new(None),
            child: Mutex::new(None),
            reader: Mutex::new(None),
            next_request: AtomicU64::new(1),
            replies: Arc::new(Mutex::new(HashMap::new())),
            formats: Arc::new(Mutex::new(HashMap::new())),
            events_tx,
            events_rx: Mutex::new(events_rx),
        }
    }

    fn launch_args(&self) -> Vec<String> {
        let mut args = vec![
            "--idle=yes".to_string(),
            "--no-terminal".to_string(),
            format!("--input-ipc-server={}", self.socket_path.display()),
        ];
        if self.config.wid != 0 {
            args.push(format!("--wid={}", self.config.wid));
        }
        for (name, value) in self.pending_options.lock().iter() {
            args.push(format!("--{}={}", name, value));
        }
        args
    }

    #[cfg(unix)]
    fn connect(&self, child: &mut Child) -> Result<UnixStream> {
        let started = Instant::now();
        loop {
            match UnixStream::connect(&self.socket_path) {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    if let Ok(Some(status)) = child.try_wait() {
                        log::error!("Engine exited during startup with {}", status);
                        return Err(EngineError::rejected(ErrorCode::OptionError, format!("engine exited with {}", status)));
                    }
                    if started.elapsed() > CONNECT_TIMEOUT {
                        let _ = child.kill();
                        return Err(EngineError::Spawn(e));
                    }
                    thread::sleep(Duration::from_millis(20));
                }
            }
        }
    }

    #[cfg(unix)]
    fn send_line(&self, payload: &Json) -> Result<()> {
        let mut writer = self.writer.lock();
        let stream = writer.as_mut().ok_or(EngineError::NotRunning)?;
        let mut line = payload.to_string();
        line.push('\n');
        stream.write_all(line.as_bytes())?;
        stream.flush()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn send_line(&self, _payload: &Json) -> Result<()> {
        Err(EngineError::NotRunning)
    }

    /// Send one request and block until its reply arrives.
    fn request(&self, args: Vec<Json>) -> Result<Json> {
        if !self.started.load(Ordering::Acquire) {
            return Err(EngineError::NotRunning);
        }

        let id = self.next_request.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.replies.lock().insert(id, tx);

        let context = args.first().and_then(Json::as_str).unwrap_or_default().to_string();
        if let Err(e) = self.send_line(&json!({ "command": args, "request_id": id })) {
            self.replies.lock().remove(&id);
            return Err(e);
        }

        // The reader drops every pending sender when the socket closes.
        let reply = rx.blocking_recv().map_err(|_| EngineError::NotRunning)?;
        if reply.error == "success" {
            Ok(reply.data)
        } else {
            Err(EngineError::rejected(ErrorCode::from_message(&reply.error), context))
        }
    }

    #[cfg(unix)]
    fn spawn_reader(&self, stream: UnixStream) -> Result<thread::JoinHandle<()>> {
        let replies = Arc::clone(&self.replies);
        let formats = Arc::clone(&self.formats);
        let events = self.events_tx.clone();

        thread::Builder::new()
            .name("engine-ipc".to_string())
            .spawn(move || read_messages(stream, &replies, &formats, &events))
            .map_err(EngineError::Spawn)
    }
}

/// Route every line from the engine until the socket closes, then release
/// pending requests and make sure the event stream ends with `Shutdown`.
///
/// The engine passes filenames and tags through as raw bytes, so lines are
/// decoded lossily; only I/O errors and EOF end the stream.
fn read_messages(stream: impl Read, replies: &Replies, formats: &Formats, events: &mpsc::Sender<Option<Event>>) {
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    let mut saw_shutdown = false;
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                log::warn!("Engine socket read failed: {}", e);
                break;
            }
        }
        let line = String::from_utf8_lossy(&buf);
        if line.trim().is_empty() {
            continue;
        }
        match route_message(&line, replies, &formats.lock()) {
            Ok(Some(event)) => {
                saw_shutdown |= event == Event::Shutdown;
                if events.send(Some(event)).is_err() {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => log::warn!("{}", e),
        }
    }

    replies.lock().clear();
    if !saw_shutdown {
        let _ = events.send(Some(Event::Shutdown));
    }
    log::debug!("Engine socket closed");
}

/// Split a command line into arguments. Whitespace separates; single or
/// double quotes group, and a backslash escapes the next character inside
/// double quotes.
pub fn tokenize(command: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;
    let mut chars = command.chars();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) if c == q => quote = None,
            Some('"') if c == '\\' => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_token = true;
            }
            None if c.is_whitespace() => {
                if in_token {
                    args.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                current.push(c);
                in_token = true;
            }
        }
    }
    if in_token {
        args.push(current);
    }
    args
}

/// Decode one line from the socket. Replies are handed to their waiter and
/// yield `None`; events are returned.
fn route_message(line: &str, replies: &Replies, formats: &HashMap<u64, Format>) -> Result<Option<Event>> {
    let message: Json =
        serde_json::from_str(line).map_err(|e| EngineError::Protocol(format!("{} in {:?}", e, line)))?;

    if message.get("event").is_none() {
        if let Some(id) = message.get("request_id").and_then(Json::as_u64) {
            let reply = Reply {
                error: message.get("error").and_then(Json::as_str).unwrap_or("success").to_string(),
                data: message.get("data").cloned().unwrap_or(Json::Null),
            };
            if let Some(tx) = replies.lock().remove(&id) {
                let _ = tx.send(reply);
            }
        }
        return Ok(None);
    }

    Ok(parse_event(&message, formats))
}

pub(crate) fn parse_event(message: &Json, formats: &HashMap<u64, Format>) -> Option<Event> {
    let name = message.get("event")?.as_str()?;
    let text = |key: &str| message.get(key).and_then(Json::as_str).unwrap_or_default().to_string();

    let event = match name {
        "property-change" => {
            let format = message
                .get("id")
                .and_then(Json::as_u64)
                .and_then(|id| formats.get(&id).copied())
                .unwrap_or(Format::Node);
            Event::PropertyChange {
                name: text("name"),
                value: message.get("data").map(|data| Value::from_json(data, format)).unwrap_or(Value::None),
            }
        }
        "client-message" => Event::ClientMessage(
            message
                .get("args")
                .and_then(Json::as_array)
                .map(|args| args.iter().filter_map(Json::as_str).map(str::to_string).collect())
                .unwrap_or_default(),
        ),
        "log-message" => Event::LogMessage(LogMessage {
            prefix: text("prefix"),
            level: text("level"),
            text: text("text"),
        }),
        other => Event::from_name(other),
    };
    Some(event)
}

impl Backend for IpcBackend {
    fn set_option(&self, name: &str, value: &str) -> Result<()> {
        if !self.started.load(Ordering::Acquire) {
            self.pending_options.lock().push((name.to_string(), value.to_string()));
            return Ok(());
        }
        self.request(vec![json!("set_property"), json!(format!("options/{}", name)), json!(value)])
            .map(|_| ())
    }

    fn unset_option(&self, name: &str) {
        self.pending_options.lock().retain(|(queued, _)| queued != name);
    }

    #[cfg(unix)]
    fn start(&self) -> Result<()> {
        let args = self.launch_args();
        log::info!("Launching engine: {} {}", self.config.binary.display(), args.join(" "));

        let mut child = Command::new(&self.config.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(EngineError::Spawn)?;

        let stream = self.connect(&mut child)?;
        let reader = self.spawn_reader(stream.try_clone()?)?;

        *self.writer.lock() = Some(stream);
        *self.reader.lock() = Some(reader);
        *self.child.lock() = Some(child);
        self.started.store(true, Ordering::Release);
        log::info!("Engine connected on {}", self.socket_path.display());
        Ok(())
    }

    #[cfg(not(unix))]
    fn start(&self) -> Result<()> {
        Err(EngineError::Spawn(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "engine IPC needs unix domain sockets",
        )))
    }

    fn command(&self, args: &[&str]) -> Result<()> {
        self.request(args.iter().map(|a| json!(a)).collect()).map(|_| ())
    }

    fn command_string(&self, command: &str) -> Result<()> {
        let args = tokenize(command);
        if args.is_empty() {
            return Err(EngineError::rejected(ErrorCode::InvalidParameter, "empty command"));
        }
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.command(&refs)
    }

    fn get_property(&self, name: &str, format: Format) -> Result<Value> {
        let data = self.request(vec![json!("get_property"), json!(name)])?;
        Ok(Value::from_json(&data, format))
    }

    fn set_property(&self, name: &str, value: Value) -> Result<()> {
        self.request(vec![json!("set_property"), json!(name), value.to_json()])
            .map(|_| ())
    }

    fn observe_property(&self, id: u64, name: &str, format: Format) -> Result<()> {
        self.formats.lock().insert(id, format);
        self.request(vec![json!("observe_property"), json!(id), json!(name)])
            .map(|_| ())
    }

    fn request_log_messages(&self, level: &str) -> Result<()> {
        self.request(vec![json!("request_log_messages"), json!(level)])
            .map(|_| ())
    }

    fn wait_event(&self, timeout: Option<Duration>) -> Option<Event> {
        let rx = self.events_rx.lock();
        let received = match timeout {
            Some(timeout) => rx.recv_timeout(timeout).ok(),
            None => rx.recv().ok(),
        };
        received.flatten()
    }

    fn wakeup(&self) {
        let _ = self.events_tx.send(None);
    }

    fn create_render_context(&self, _update: Notify) -> Result<Box<dyn RenderContext>> {
        // The engine paints straight into the embedded window.
        log::debug!("Render context bound to window id {}", self.config.wid);
        Ok(Box::new(EmbeddedRender))
    }

    fn destroy(&self) {
        if let Some(mut child) = self.child.lock().take() {
            if self.send_line(&json!({ "command": ["quit"] })).is_ok() {
                let deadline = Instant::now() + QUIT_GRACE;
                while Instant::now() < deadline {
                    if let Ok(Some(_)) = child.try_wait() {
                        break;
                    }
                    thread::sleep(Duration::from_millis(20));
                }
            }
            if let Ok(None) = child.try_wait() {
                log::warn!("Engine did not exit in time, killing it");
                let _ = child.kill();
            }
            let _ = child.wait();
        }

        #[cfg(unix)]
        if let Some(stream) = self.writer.lock().take() {
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
        if let Some(reader) = self.reader.lock().take() {
            let _ = reader.join();
        }
        self.started.store(false, Ordering::Release);
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

struct EmbeddedRender;

impl RenderContext for EmbeddedRender {
    fn render(&mut self, _width: u32, _height: u32) {}

    fn update(&mut self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_plain_and_quoted() {
        assert_eq!(tokenize("seek 10 relative"), vec!["seek", "10", "relative"]);
        assert_eq!(
            tokenize("keybind SPACE 'script-message-to glimpse play-pause'"),
            vec!["keybind", "SPACE", "script-message-to glimpse play-pause"]
        );
        assert_eq!(tokenize(r#"show-text "a \"b\" c""#), vec!["show-text", r#"a "b" c"#]);
        assert_eq!(tokenize("  loadfile   ''  "), vec!["loadfile", ""]);
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn test_reply_routed_to_waiter() {
        let replies: Replies = Arc::new(Mutex::new(HashMap::new()));
        let (tx, rx) = oneshot::channel();
        replies.lock().insert(7, tx);

        let event = route_message(r#"{"request_id":7,"error":"property not found","data":null}"#, &replies, &HashMap::new())
            .expect("valid message");
        assert!(event.is_none());

        let reply = rx.blocking_recv().expect("reply delivered");
        assert_eq!(ErrorCode::from_message(&reply.error), ErrorCode::PropertyNotFound);
        assert!(replies.lock().is_empty());
    }

    #[test]
    fn test_property_change_uses_observed_format() {
        let mut formats = HashMap::new();
        formats.insert(3, Format::Flag);
        let message: Json = serde_json::from_str(r#"{"event":"property-change","id":3,"name":"pause","data":true}"#).unwrap();

        let event = parse_event(&message, &formats).unwrap();
        assert_eq!(
            event,
            Event::PropertyChange {
                name: "pause".to_string(),
                value: Value::Flag(true)
            }
        );
    }

    #[test]
    fn test_client_message_and_unknown_events() {
        let message: Json = serde_json::from_str(r#"{"event":"client-message","args":["context-menu","x"]}"#).unwrap();
        assert_eq!(
            parse_event(&message, &HashMap::new()),
            Some(Event::ClientMessage(vec!["context-menu".to_string(), "x".to_string()]))
        );

        let message: Json = serde_json::from_str(r#"{"event":"tick"}"#).unwrap();
        assert_eq!(parse_event(&message, &HashMap::new()), Some(Event::Other("tick".to_string())));
    }

    #[test]
    fn test_malformed_line_is_protocol_error() {
        let replies: Replies = Arc::new(Mutex::new(HashMap::new()));
        assert!(matches!(
            route_message("{not json", &replies, &HashMap::new()),
            Err(EngineError::Protocol(_))
        ));
    }

    #[test]
    fn test_request_before_start_is_not_running() {
        let backend = IpcBackend::new(IpcConfig::default());
        assert!(matches!(backend.command(&["stop"]), Err(EngineError::NotRunning)));
        // Options before start are only queued for the launch command line.
        backend.set_option("osc", "yes").unwrap();
        backend.set_option("config-dir", "/tmp/glimpse").unwrap();
        assert!(backend.launch_args().contains(&"--osc=yes".to_string()));
        assert!(backend.launch_args().contains(&"--config-dir=/tmp/glimpse".to_string()));

        backend.unset_option("config-dir");
        assert!(!backend.launch_args().iter().any(|arg| arg.starts_with("--config-dir")));
    }

    #[cfg(unix)]
    #[test]
    fn test_reader_survives_non_utf8_lines() {
        let (mut engine_side, our_side) = UnixStream::pair().unwrap();
        let replies: Replies = Arc::new(Mutex::new(HashMap::new()));
        let formats: Formats = Arc::new(Mutex::new(HashMap::new()));
        let (tx, rx) = mpsc::channel();

        let reader = {
            let replies = Arc::clone(&replies);
            let formats = Arc::clone(&formats);
            thread::spawn(move || read_messages(our_side, &replies, &formats, &tx))
        };

        let mut raw = b"{\"event\":\"log-message\",\"prefix\":\"cplayer\",\"level\":\"info\",\"text\":\"Playing: \xff\xfe.mkv\"}\n".to_vec();
        raw.extend_from_slice(b"{\"event\":\"idle\"}\n");
        engine_side.write_all(&raw).unwrap();

        let timeout = Duration::from_secs(2);
        match rx.recv_timeout(timeout).unwrap() {
            Some(Event::LogMessage(msg)) => {
                assert_eq!(msg.prefix, "cplayer");
                assert!(msg.text.starts_with("Playing: "));
                assert!(msg.text.ends_with(".mkv"));
            }
            other => panic!("expected the log line, got {:?}", other),
        }
        assert_eq!(rx.recv_timeout(timeout).unwrap(), Some(Event::Idle));

        // Only the socket closing ends the stream.
        drop(engine_side);
        assert_eq!(rx.recv_timeout(timeout).unwrap(), Some(Event::Shutdown));
        reader.join().unwrap();
    }
}
