//! Integration Tests for Error Handling
//!
//! Every failure is reported at the action boundary and leaves the
//! controller in a usable state.

#[path = "../test_utils/mod.rs"]
mod test_utils;

use std::sync::Arc;
use std::time::Duration;

use aiderchat::config::credentials::Credential;
use aiderchat::error::user_message;
use aiderchat::process::LaunchSpec;
use aiderchat::relay::{
    delivery_queue, OutputRelay, RelayExit, RelayOptions, SessionLog, StopSignal,
};
use aiderchat::{Config, Error, SessionController, SessionState};
use test_utils::{fast_relay_config, FakeChild, ScriptedSource, SourceEvent};

#[test]
fn test_missing_binary_leaves_controller_idle() {
    let spec = LaunchSpec::new("/nonexistent/aider", ["--model", "o3-mini"]);
    let mut controller = SessionController::new(spec, &fast_relay_config());

    match controller.start() {
        Err(e @ Error::LaunchFailed { .. }) => {
            assert!(user_message(&e).contains("/nonexistent/aider"));
        }
        other => panic!("Expected LaunchFailed, got {:?}", other),
    }
    assert_eq!(controller.state(), SessionState::Idle);
    assert!(controller.status().is_none());
    assert!(controller.stop().is_ok());
}

#[test]
fn test_controller_from_config_with_missing_binary() {
    let mut config = Config::default();
    config.assistant.binary = "/nonexistent/aider-binary".to_string();
    let credential = Credential::new("OPENAI_API_KEY", "sk-secret".to_string());

    let mut controller = SessionController::from_config(&config, &credential);
    let err = controller.start().unwrap_err();
    // The credential never leaks into the error text
    assert!(!user_message(&err).contains("sk-secret"));
    assert!(!format!("{:?}", controller).contains("sk-secret"));
}

#[test]
fn test_missing_credential_message() {
    let err = Credential::from_env("AIDERCHAT_TEST_NO_SUCH_KEY").unwrap_err();
    assert!(err.is_fatal_config());
    let message = user_message(&err);
    assert!(message.contains("AIDERCHAT_TEST_NO_SUCH_KEY"));
    assert!(message.contains("export"));
}

#[test]
fn test_send_without_session() {
    let mut controller = SessionController::new(
        LaunchSpec::new("/bin/true", Vec::<String>::new()),
        &fast_relay_config(),
    );
    assert!(matches!(controller.send("hi"), Err(Error::NoActiveSession)));
    assert!(matches!(controller.send(" "), Err(Error::EmptyMessage)));
    assert!(matches!(controller.interrupt(), Err(Error::NoActiveSession)));
}

#[cfg(unix)]
#[test]
fn test_send_to_exited_child_is_reported() {
    let mut controller = SessionController::new(
        LaunchSpec::new("/bin/sh", ["-c", "exec 0<&-; sleep 0.2"]),
        &fast_relay_config(),
    );
    controller.start().unwrap();
    std::thread::sleep(Duration::from_millis(50));

    // stdin is closed on the child side, so the write fails with EPIPE
    match controller.send("anyone there?") {
        Err(Error::SendFailed { source }) => {
            assert_eq!(source.kind(), std::io::ErrorKind::BrokenPipe)
        }
        other => panic!("Expected SendFailed, got {:?}", other),
    }
    controller.stop().unwrap();
    assert_eq!(controller.state(), SessionState::Idle);
}

#[test]
fn test_persistent_read_errors_end_relay_quietly() {
    let child = Arc::new(FakeChild::running());
    let log = SessionLog::new();
    let (sender, mut queue) = delivery_queue();
    let source = ScriptedSource::new(vec![
        SourceEvent::Text("before\n".to_string()),
        SourceEvent::Error(std::io::ErrorKind::ConnectionReset),
        SourceEvent::Error(std::io::ErrorKind::ConnectionReset),
        SourceEvent::Error(std::io::ErrorKind::ConnectionReset),
    ]);
    let relay = OutputRelay::new(
        Box::new(source),
        child.clone(),
        log.clone(),
        sender,
        StopSignal::new(),
        RelayOptions {
            idle_backoff: Duration::from_millis(1),
            strip_carriage_returns: true,
            max_consecutive_read_errors: 3,
        },
    );

    assert_eq!(relay.spawn().unwrap().join(), Some(RelayExit::ReadFailed));
    assert_eq!(queue.drain_available(), vec!["before"]);
    assert!(log.has_ended());
    assert!(queue.is_closed());
}
