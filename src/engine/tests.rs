use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::json;

use crate::engine::cache::{parse_playlist, parse_profiles, parse_tracks};
use crate::engine::mock::MockBackend;
use crate::engine::{Engine, EngineError, EngineState, ErrorCode, Event, EventKind, LogMessage, Value};

fn wait_until(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    check()
}

fn running_engine() -> (Engine, MockBackend) {
    let backend = MockBackend::new();
    let mut engine = Engine::new(backend.clone());
    engine.set_wait_timeout(Some(Duration::from_millis(10)));
    engine.init().expect("engine starts");
    (engine, backend)
}

#[test]
fn test_property_round_trip() {
    let (engine, _backend) = running_engine();
    let client = engine.client();

    client.set_property("volume", 42i64).unwrap();
    assert_eq!(client.property::<i64>("volume"), 42);

    client.set_property("speed", 1.5f64).unwrap();
    assert_eq!(client.property::<f64>("speed"), 1.5);

    client.set_property("pause", true).unwrap();
    assert!(client.property::<bool>("pause"));
    assert_eq!(client.property_string("pause"), "yes");

    client.set_property("media-title", "clip.mkv").unwrap();
    assert_eq!(client.property_string("media-title"), "clip.mkv");
}

#[test]
fn test_absent_property_yields_zero_value() {
    let (engine, _backend) = running_engine();
    let client = engine.client();

    assert_eq!(client.property_string("no-such-thing"), "");
    assert_eq!(client.property::<i64>("dwidth"), 0);
    assert!(!client.property::<bool>("keepaspect-window"));
}

#[test]
fn test_rejected_command_is_negative_status() {
    let (engine, backend) = running_engine();
    backend.reject_command("frobnicate");

    let err = engine.client().commandv(&["frobnicate", "now"]).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidParameter));
    assert!(err.status() < 0);

    // The engine keeps working after a rejection.
    engine.client().command("seek 10 relative").unwrap();
    assert_eq!(backend.commands().last().unwrap(), &vec!["seek", "10", "relative"]);
}

#[test]
fn test_builtin_option_rejection_aborts_init() {
    let backend = MockBackend::new();
    backend.reject_option("bogus");
    let mut engine = Engine::new(backend.clone());
    engine.option("osc", "yes");
    engine.option("bogus", "1");

    match engine.init() {
        Err(EngineError::Option { name, value, .. }) => {
            assert_eq!(name, "bogus");
            assert_eq!(value, "1");
        }
        other => panic!("expected option failure, got {:?}", other.err()),
    }
    assert!(!backend.state.lock().started);
    assert_eq!(engine.state(), EngineState::Uninitialized);
}

#[test]
fn test_user_option_rejection_is_skipped() {
    let backend = MockBackend::new();
    backend.reject_option("bogus");
    let mut engine = Engine::new(backend.clone());
    engine.option("osc", "yes");
    engine.user_option("bogus", "1");
    engine.user_option("volume-max", "150");

    engine.init().expect("startup continues");
    let options = backend.state.lock().options.clone();
    assert_eq!(
        options,
        vec![
            ("osc".to_string(), "yes".to_string()),
            ("volume-max".to_string(), "150".to_string())
        ]
    );
    assert_eq!(engine.state(), EngineState::Running);
}

#[test]
fn test_user_options_are_part_of_the_launch() {
    let backend = MockBackend::new();
    let mut engine = Engine::new(backend.clone());
    engine.option("osc", "yes");
    engine.user_option("config-dir", "/srv/mpv");
    engine.user_option("include", "/srv/extra.conf");

    engine.init().expect("engine starts");
    let state = backend.state.lock();
    assert_eq!(state.launches, 1);
    assert_eq!(
        state.launch_options,
        vec![
            ("osc".to_string(), "yes".to_string()),
            ("config-dir".to_string(), "/srv/mpv".to_string()),
            ("include".to_string(), "/srv/extra.conf".to_string()),
        ]
    );
}

#[test]
fn test_launch_refused_over_user_option_relaunches_without_it() {
    let backend = MockBackend::new();
    backend.state.lock().refused_at_start.insert("vo".to_string());
    let mut engine = Engine::new(backend.clone());
    engine.option("osc", "yes");
    engine.user_option("mute", "yes");
    engine.user_option("vo", "nonsense");

    engine.init().expect("startup continues without the bad option");
    let state = backend.state.lock();
    assert_eq!(state.launches, 2);
    assert!(state.launch_options.contains(&("mute".to_string(), "yes".to_string())));
    assert!(!state.launch_options.iter().any(|(name, _)| name == "vo"));
    drop(state);
    assert_eq!(engine.state(), EngineState::Running);
}

#[test]
fn test_launch_refused_over_builtin_option_is_fatal() {
    let backend = MockBackend::new();
    backend.state.lock().refused_at_start.insert("osc".to_string());
    let mut engine = Engine::new(backend.clone());
    engine.option("osc", "yes");
    engine.user_option("mute", "yes");

    let err = engine.init().unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::OptionError));
    // The user option went first; the built-in was never withdrawn.
    assert_eq!(backend.state.lock().launches, 2);
    assert!(!backend.state.lock().started);
}

#[test]
fn test_hard_start_failure_is_fatal() {
    let backend = MockBackend::new();
    backend.state.lock().fail_start = true;
    let mut engine = Engine::new(backend);
    assert!(matches!(engine.init(), Err(EngineError::Spawn(_))));
}

#[test]
fn test_subscriptions_frozen_after_init() {
    let (mut engine, _backend) = running_engine();
    assert!(matches!(
        engine.observe_event(EventKind::FileLoaded, |_| {}),
        Err(EngineError::SubscriptionsFrozen)
    ));
    assert!(matches!(
        engine.observe_property::<bool, _>("pause", |_| {}),
        Err(EngineError::SubscriptionsFrozen)
    ));
}

#[test]
fn test_events_delivered_in_order_to_matching_handlers() {
    let backend = MockBackend::new();
    let mut engine = Engine::new(backend.clone());
    engine.set_wait_timeout(Some(Duration::from_millis(10)));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    engine
        .observe_event(EventKind::ClientMessage, move |event| {
            if let Event::ClientMessage(args) = event {
                log.lock().push(args.join(" "));
            }
        })
        .unwrap();
    let files = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&files);
    engine
        .observe_event(EventKind::FileLoaded, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    engine.init().unwrap();

    backend.push_event(Event::ClientMessage(vec!["a".into()]));
    backend.push_event(Event::FileLoaded);
    backend.push_event(Event::Other("tick".into()));
    backend.push_event(Event::ClientMessage(vec!["b".into(), "c".into()]));

    assert!(wait_until(Duration::from_secs(2), || seen.lock().len() == 2));
    assert_eq!(*seen.lock(), vec!["a".to_string(), "b c".to_string()]);
    assert_eq!(files.load(Ordering::SeqCst), 1);
}

#[test]
fn test_observed_property_decoded_and_cached() {
    let backend = MockBackend::new();
    let mut engine = Engine::new(backend.clone());
    engine.set_wait_timeout(Some(Duration::from_millis(10)));

    let titles = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&titles);
    engine
        .observe_property::<String, _>("media-title", move |title| sink.lock().push(title))
        .unwrap();
    engine.init().unwrap();

    // Fixed table plus the extra subscription, each observed once.
    let observed = backend.state.lock().observed.clone();
    assert_eq!(observed.iter().filter(|(_, name, _)| name == "pause").count(), 1);
    assert_eq!(observed.iter().filter(|(_, name, _)| name == "media-title").count(), 1);

    backend.push_event(Event::PropertyChange {
        name: "media-title".into(),
        value: Value::Node(json!("Big Buck Bunny")),
    });
    backend.push_event(Event::PropertyChange {
        name: "pause".into(),
        value: Value::Flag(true),
    });
    backend.push_event(Event::PropertyChange {
        name: "playlist-playing-pos".into(),
        value: Value::Int64(0),
    });

    let client = engine.client();
    assert!(wait_until(Duration::from_secs(2), || client.playing()));
    assert!(client.paused());
    assert_eq!(*titles.lock(), vec!["Big Buck Bunny".to_string()]);
}

#[test]
fn test_shutdown_transitions_state_and_later_events_still_delivered() {
    let backend = MockBackend::new();
    let mut engine = Engine::new(backend.clone());
    engine.set_wait_timeout(Some(Duration::from_millis(10)));

    let shutdowns = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&shutdowns);
    engine
        .observe_event(EventKind::Shutdown, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    let late = Arc::new(AtomicUsize::new(0));
    let late_counter = Arc::clone(&late);
    engine
        .observe_event(EventKind::EndFile, move |_| {
            late_counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    engine.init().unwrap();

    backend.push_events([Event::Shutdown, Event::EndFile]);

    let client = engine.client();
    assert!(wait_until(Duration::from_secs(2), || client.state() == EngineState::Stopped));
    assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
    assert_eq!(late.load(Ordering::SeqCst), 1);
}

#[test]
fn test_destroy_releases_render_context_before_engine() {
    let (mut engine, backend) = running_engine();
    engine.destroy();

    let state = backend.state.lock();
    assert!(state.render_released);
    assert!(state.destroyed);
    drop(state);
    assert_eq!(engine.state(), EngineState::Stopped);
}

#[test]
fn test_render_request_reaches_update_callback() {
    let (engine, backend) = running_engine();
    let wakes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&wakes);
    engine.set_update_callback(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    assert!(!engine.want_render());
    backend.frame_ready();
    assert_eq!(wakes.load(Ordering::SeqCst), 1);
    assert!(engine.want_render());
    assert!(!engine.want_render());

    engine.render(640, 360);
    assert_eq!(backend.state.lock().renders, vec![(640, 360)]);
}

#[test]
fn test_log_messages_requested_and_mapped() {
    let backend = MockBackend::new();
    let mut engine = Engine::new(backend.clone());
    engine.request_log("warn");
    engine.init().unwrap();
    assert_eq!(backend.state.lock().log_level.as_deref(), Some("warn"));

    let msg = |level: &str| LogMessage {
        prefix: "cplayer".into(),
        level: level.into(),
        text: "x\n".into(),
    };
    assert_eq!(msg("fatal").log_level(), log::Level::Error);
    assert_eq!(msg("warn").log_level(), log::Level::Warn);
    assert_eq!(msg("v").log_level(), log::Level::Debug);
    assert_eq!(msg("trace").log_level(), log::Level::Trace);
}

#[test]
fn test_error_codes_match_engine_strings() {
    assert_eq!(ErrorCode::from_message("property unavailable"), ErrorCode::PropertyUnavailable);
    assert_eq!(ErrorCode::PropertyUnavailable.as_raw(), -10);
    assert_eq!(ErrorCode::Command.as_raw(), -12);
    assert_eq!(ErrorCode::from_message("no idea"), ErrorCode::Generic);
    assert_eq!(ErrorCode::Command.to_string(), "error running command");
}

#[test]
fn test_value_coercion() {
    assert_eq!(Value::Node(json!(3)).coerce(crate::engine::Format::Double), Value::Double(3.0));
    assert_eq!(Value::String("yes".into()).coerce(crate::engine::Format::Flag), Value::Flag(true));
    assert_eq!(Value::Int64(7).coerce(crate::engine::Format::String), Value::String("7".into()));
    assert_eq!(Value::Node(json!(null)).coerce(crate::engine::Format::Int64), Value::None);
}

#[test]
fn test_parse_lists() {
    let playlist = parse_playlist(&json!([
        {"filename": "/videos/a.mkv", "title": "A", "id": 1},
        {"filename": "https://example.com/stream"}
    ]));
    assert_eq!(playlist.len(), 2);
    assert_eq!(playlist[0].filename, "a.mkv");
    assert_eq!(playlist[0].id, 1);
    assert_eq!(playlist[1].id, 1);
    assert_eq!(playlist[1].filename, "stream");

    let tracks = parse_tracks(&json!([
        {"id": 1, "type": "video", "selected": true},
        {"id": 2, "type": "sub", "lang": "en", "title": "English"}
    ]));
    assert!(tracks[0].selected);
    assert_eq!(tracks[1].lang, "en");
    assert!(!tracks[1].selected);

    let profiles = parse_profiles(r#"[{"name":"default"},{"name":"gpu-hq"},{"name":"builtin-pseudo-gui"},{"name":"anime"}]"#);
    assert_eq!(profiles, vec!["gpu-hq".to_string(), "anime".to_string()]);
    assert!(parse_profiles("not json").is_empty());
}
