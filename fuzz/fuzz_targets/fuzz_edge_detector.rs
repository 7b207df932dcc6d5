//! Fuzz target: `EdgeDetector`
//!
//! Interprets the input as a stream of (time step, level) pairs and checks
//! that accepted presses are never closer together than the window, across
//! tick wraparound.
//!
//! cargo fuzz run fuzz_edge_detector

#![no_main]

use libfuzzer_sys::fuzz_target;
use togglepub::drivers::button::EdgeDetector;

fuzz_target!(|data: &[u8]| {
    let Some((&window, steps)) = data.split_first() else {
        return;
    };
    let window = u32::from(window).max(1);
    let mut d = EdgeDetector::new(window);
    let mut now = u32::MAX - 512;
    let mut last_emit: Option<u32> = None;

    for &b in steps {
        now = now.wrapping_add(u32::from(b >> 1));
        let emitted = if b & 1 == 1 { d.on_edge(now) } else { d.settle(now) };
        if emitted {
            if let Some(prev) = last_emit {
                assert!(now.wrapping_sub(prev) >= window);
            }
            last_emit = Some(now);
            assert!(!d.is_debouncing());
        }
    }
});
