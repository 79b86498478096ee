//! Fuzz test for now-playing payload parsing and reconciliation.
//!
//! Whatever the provider bridge emits, parsing must not panic and a
//! committed snapshot must keep its position inside `[0, duration]`.

#![no_main]

use std::time::{Duration, Instant};

use libfuzzer_sys::fuzz_target;
use notch_island_lib::config::PlaybackTiming;
use notch_island_lib::playback::{parse_now_playing, PassOutcome, PlaybackReconciler};

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };

    let answer = parse_now_playing(raw);

    let mut reconciler = PlaybackReconciler::new(PlaybackTiming::default());
    let start = Instant::now();
    let _ = reconciler.begin_pass(start, true, "Music".to_string());
    let result = reconciler.finish_pass(start + Duration::from_millis(5), start, answer);

    if let PassOutcome::Committed { .. } = result.outcome {
        let snapshot = reconciler.snapshot().expect("committed pass publishes a snapshot");
        assert!(snapshot.duration > 0.0);
        assert!(snapshot.elapsed_time >= 0.0);
        assert!(snapshot.elapsed_time <= snapshot.duration);
        assert_eq!(reconciler.current_time(), snapshot.elapsed_time);
    }

    // Arbitrary JSON values must be rejected cleanly too.
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) {
        let _ = parse_now_playing(&value.to_string());
    }
});
