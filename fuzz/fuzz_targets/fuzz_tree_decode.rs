//! Fuzz target for tree body decoding.
//!
//! Tests that the tree codec handles arbitrary input without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use marrow_storage::Tree;

fuzz_target!(|data: &[u8]| {
    if let Ok(entries) = Tree::decode(data) {
        // A successful decode must re-encode without panicking.
        let _ = Tree::encode(&entries);
    }
});
