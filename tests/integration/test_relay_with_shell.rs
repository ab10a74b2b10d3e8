//! Integration Tests: Relay over Real Shell Output
//!
//! Spawns `/bin/sh` scripts and checks what reaches the session log and
//! the delivery queue.

#![cfg(unix)]

#[path = "../test_utils/mod.rs"]
mod test_utils;

use aiderchat::process::spawn_process;
use aiderchat::relay::{
    delivery_queue, CharReader, OutputRelay, RelayExit, RelayOptions, SessionLog, StopSignal,
};
use aiderchat::{LineKind, SessionState, SESSION_ENDED};
use test_utils::{fast_relay_config, recv_line, shell_controller, shell_spec, wait_for};

/// Run `script` to completion; returns log texts, queued lines and exit
fn relay_script(script: &str) -> (Vec<String>, Vec<String>, RelayExit) {
    let launched = spawn_process(&shell_spec(script)).unwrap();
    drop(launched.stdin);

    let log = SessionLog::new();
    let (sender, mut queue) = delivery_queue();
    let relay = OutputRelay::new(
        Box::new(CharReader::new(launched.output)),
        launched.control,
        log.clone(),
        sender,
        StopSignal::new(),
        RelayOptions::from(&fast_relay_config()),
    );
    let exit = relay.spawn().unwrap().join().unwrap();
    (log.texts(), queue.drain_available(), exit)
}

#[test]
fn test_lines_arrive_in_order() {
    let (log, queued, exit) = relay_script("for i in 1 2 3 4 5; do echo line $i; done");

    let expected: Vec<String> = (1..=5).map(|i| format!("line {}", i)).collect();
    assert_eq!(queued, expected);
    assert_eq!(log[..5], expected[..]);
    assert_eq!(log[5], SESSION_ENDED);
    assert_eq!(exit, RelayExit::ChildExited(Some(0)));
}

#[test]
fn test_stderr_is_relayed() {
    let (log, _, _) = relay_script("echo out; echo err >&2; exit 1");
    assert_eq!(log, vec!["out", "err", SESSION_ENDED]);
}

#[test]
fn test_unterminated_output_is_flushed() {
    let (log, queued, _) = relay_script("printf 'prompt> '");
    assert_eq!(log, vec!["prompt> ", SESSION_ENDED]);
    assert!(queued.is_empty());
}

#[test]
fn test_crlf_and_unicode_output() {
    let (log, _, _) = relay_script("printf 'caf\\303\\251\\r\\n\\360\\237\\224\\232 done\\n'");
    assert_eq!(log, vec!["café", "🔚 done", SESSION_ENDED]);
}

#[test]
fn test_no_output_then_exit() {
    let (log, queued, exit) = relay_script("exit 9");
    assert_eq!(log, vec![SESSION_ENDED]);
    assert!(queued.is_empty());
    assert_eq!(exit, RelayExit::ChildExited(Some(9)));
}

#[test]
fn test_large_output_is_not_dropped() {
    let (log, queued, _) =
        relay_script("i=0; while [ $i -lt 2000 ]; do echo \"row $i\"; i=$((i+1)); done");
    assert_eq!(queued.len(), 2000);
    assert_eq!(log.len(), 2001);
    assert_eq!(queued[1999], "row 1999");
}

#[tokio::test]
async fn test_conversation_through_controller() {
    let mut controller = shell_controller(
        "while read line; do [ \"$line\" = quit ] && exit 0; echo \"you said: $line\"; done",
    );
    controller.start().unwrap();

    controller.send("hello").unwrap();
    assert_eq!(recv_line(&mut controller).await.as_deref(), Some("you said: hello"));

    controller.send("quit").unwrap();
    assert_eq!(recv_line(&mut controller).await, None);
    assert!(wait_for(|| controller.refresh() == SessionState::Idle));

    // The reply and the sent messages are interleaved in one log
    let log = controller.log_snapshot();
    assert_eq!(log.len(), 4);
    let texts_of = |kind: LineKind| -> Vec<&str> {
        log.iter()
            .filter(|line| line.kind == kind)
            .map(|line| line.text.as_str())
            .collect()
    };
    assert_eq!(texts_of(LineKind::User), vec!["hello", "quit"]);
    assert_eq!(texts_of(LineKind::Output), vec!["you said: hello"]);
    assert_eq!(texts_of(LineKind::Sentinel), vec![SESSION_ENDED]);
}

#[test]
fn test_stop_mid_stream() {
    let mut controller = shell_controller("while true; do echo tick; sleep 0.01; done");
    controller.start().unwrap();
    assert!(wait_for(|| controller.log().len() >= 3));

    controller.stop().unwrap();
    assert_eq!(controller.state(), SessionState::Idle);
    assert!(wait_for(|| controller.log().has_ended()));

    // Nothing is appended after the sentinel
    let len = controller.log().len();
    std::thread::sleep(std::time::Duration::from_millis(50));
    assert_eq!(controller.log().len(), len);
}
