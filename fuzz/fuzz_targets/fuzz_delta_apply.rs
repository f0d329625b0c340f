//! Fuzz target for delta instruction replay.
//!
//! Tests that delta application handles arbitrary streams without panicking
//! and never reads outside the base buffer.

#![no_main]

use libfuzzer_sys::fuzz_target;
use marrow_protocol::apply;

fuzz_target!(|data: &[u8]| {
    // Split the input into a base and an instruction stream.
    let split = data.first().copied().unwrap_or(0) as usize % (data.len().max(1));
    let (base, stream) = data.split_at(split);
    let _ = apply(base, stream);
});
