#![no_main]

//! Fuzz target for the import path: arbitrary bytes through the base64
//! decoder and the package parser. Malformed input may fail with an error
//! but must never panic.

use libfuzzer_sys::fuzz_target;
use sheetpack_core::{deserialize, payload, Workbook};

fuzz_target!(|data: &[u8]| {
    // Raw bytes as a zip payload.
    let _ = Workbook::load_from_bytes(data);

    // The same bytes wrapped as a base64 payload exercise the scrubbing
    // decoder in front of the parser.
    let encoded = payload::encode(data);
    let _ = deserialize(&encoded);

    // And interpreted as text, in case the bytes themselves are a payload.
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = deserialize(text);
    }
});
