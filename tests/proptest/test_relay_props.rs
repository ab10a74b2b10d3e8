//! Property-based tests for line assembly and relay ordering

#[path = "../test_utils/mod.rs"]
mod test_utils;

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use aiderchat::relay::{
    delivery_queue, CharReader, LineAssembler, OutputRelay, RelayOptions, SessionLog, StopSignal,
};
use aiderchat::{LineKind, SESSION_ENDED};
use proptest::prelude::*;
use test_utils::{FakeChild, ScriptedSource, SourceEvent};

fn options() -> RelayOptions {
    RelayOptions {
        idle_backoff: Duration::from_millis(1),
        strip_carriage_returns: false,
        max_consecutive_read_errors: 1,
    }
}

proptest! {
    #[test]
    fn test_k_newlines_give_k_lines(lines in prop::collection::vec("[^\n]{0,40}", 0..30)) {
        let text: String = lines.iter().map(|l| format!("{}\n", l)).collect();

        let log = SessionLog::new();
        let (sender, mut queue) = delivery_queue();
        let relay = OutputRelay::new(
            Box::new(ScriptedSource::text(&text)),
            Arc::new(FakeChild::exited(Some(0))),
            log.clone(),
            sender,
            StopSignal::new(),
            options(),
        );
        relay.run();

        prop_assert_eq!(queue.drain_available(), lines.clone());
        let texts = log.texts();
        prop_assert_eq!(texts.len(), lines.len() + 1);
        prop_assert_eq!(&texts[..lines.len()], &lines[..]);
        prop_assert_eq!(texts.last().map(String::as_str), Some(SESSION_ENDED));
    }

    #[test]
    fn test_log_reassembles_the_stream(text in "(\\PC|\n|\r){0,300}") {
        let log = SessionLog::new();
        let (sender, _queue) = delivery_queue();
        let relay = OutputRelay::new(
            Box::new(CharReader::new(Cursor::new(text.clone().into_bytes()))),
            Arc::new(FakeChild::exited(None)),
            log.clone(),
            sender,
            StopSignal::new(),
            options(),
        );
        relay.run();

        // Rejoining everything but the sentinel gives back the input
        let entries = log.snapshot();
        let mut rebuilt = String::new();
        for entry in &entries {
            match entry.kind {
                LineKind::Output => {
                    rebuilt.push_str(&entry.text);
                    rebuilt.push('\n');
                }
                LineKind::Partial => rebuilt.push_str(&entry.text),
                LineKind::Sentinel | LineKind::User => {}
            }
        }
        prop_assert_eq!(rebuilt, text);
        prop_assert!(entries.last().is_some_and(|e| e.is_sentinel()));
    }

    #[test]
    fn test_decoding_matches_lossy_conversion(
        bytes in prop::collection::vec(any::<u8>(), 0..200),
        capacity in 1usize..16,
    ) {
        let mut reader = CharReader::with_capacity(capacity, Cursor::new(bytes.clone()));
        let mut decoded = String::new();
        while let Some(c) = reader.next_char().unwrap() {
            decoded.push(c);
        }
        prop_assert_eq!(decoded, String::from_utf8_lossy(&bytes).into_owned());
    }

    #[test]
    fn test_chunking_does_not_change_lines(
        text in "[a-z\n]{0,200}",
        cuts in prop::collection::vec(0usize..200, 0..10),
    ) {
        let mut whole = LineAssembler::new(true);
        let expected = whole.push_str(&text);

        let mut bounds: Vec<usize> = cuts.into_iter().filter(|&c| c <= text.len()).collect();
        bounds.push(0);
        bounds.push(text.len());
        bounds.sort_unstable();

        let mut chunked = LineAssembler::new(true);
        let mut got = Vec::new();
        for pair in bounds.windows(2) {
            got.extend(chunked.push_str(&text[pair[0]..pair[1]]));
        }

        prop_assert_eq!(got, expected);
        prop_assert_eq!(chunked.pending(), whole.pending());
    }

    #[test]
    fn test_queue_order_matches_log_order(
        bursts in prop::collection::vec(prop::collection::vec("[a-z]{1,8}", 1..5), 1..6),
    ) {
        // Bursts separated by idle reads, as an interactive child produces
        let mut script = Vec::new();
        for burst in &bursts {
            let text: String = burst.iter().map(|l| format!("{}\n", l)).collect();
            script.push(SourceEvent::Text(text));
            script.push(SourceEvent::Eof);
        }

        let child = Arc::new(FakeChild::running());
        let log = SessionLog::new();
        let (sender, mut queue) = delivery_queue();
        let relay = OutputRelay::new(
            Box::new(ScriptedSource::new(script)),
            child.clone(),
            log.clone(),
            sender,
            StopSignal::new(),
            options(),
        );
        let handle = relay.spawn().unwrap();

        let expected: Vec<String> = bursts.concat();
        let mut delivered = Vec::new();
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while delivered.len() < expected.len() && std::time::Instant::now() < deadline {
            delivered.extend(queue.drain_available());
            std::thread::yield_now();
        }
        child.exit(Some(0));
        handle.join();

        prop_assert_eq!(&delivered, &expected);
        let texts = log.texts();
        prop_assert_eq!(&texts[..expected.len()], &expected[..]);
    }
}
