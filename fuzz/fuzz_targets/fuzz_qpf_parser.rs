//! Fuzz target: `parse_hourly_qpf`
//!
//! Feeds arbitrary text to the hourly-qpf extractor and asserts that it
//! never panics and only ever yields finite, non-negative amounts.
//!
//! cargo fuzz run fuzz_qpf_parser

#![no_main]

use libfuzzer_sys::fuzz_target;
use rainbypass::adapters::forecast::parse_hourly_qpf;

fuzz_target!(|data: &[u8]| {
    let Ok(doc) = core::str::from_utf8(data) else {
        return;
    };
    if let Ok(values) = parse_hourly_qpf(doc) {
        assert!(values.iter().all(|v| v.is_finite() && *v >= 0.0));
    }
});
