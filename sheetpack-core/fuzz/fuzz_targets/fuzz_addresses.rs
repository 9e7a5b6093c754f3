#![no_main]

//! Fuzz target for address parsing in sheetpack-core.
//!
//! Exercises the address codec with arbitrary input to ensure:
//! - No panics on any input (graceful error handling)
//! - No integer overflow issues
//! - Correct roundtrip behavior for valid indices

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sheetpack_core::address::{
    column_to_letters, letters_to_column, parse_address, parse_address_bytes, parse_range,
    to_address, MAX_COLUMN,
};

#[derive(Arbitrary, Debug)]
struct AddressFuzzInput {
    raw_bytes: Vec<u8>,
    string_input: String,
    row: u32,
    col: u32,
    abs_row: bool,
    abs_col: bool,
}

fuzz_target!(|input: AddressFuzzInput| {
    // Byte and string parsers must never panic.
    let _ = parse_address_bytes(&input.raw_bytes);
    let _ = parse_address(&input.string_input);
    let _ = parse_range(&input.string_input);
    let _ = letters_to_column(&input.string_input);

    // Rendering any in-range index must parse back to the same reference.
    let row = input.row % 1_048_576;
    let col = input.col % (MAX_COLUMN + 1);
    let rendered = to_address(Some(row), Some(col), input.abs_row, input.abs_col);
    let parsed = parse_address(&rendered).expect("rendered address must parse");
    assert_eq!(parsed.row, Some(row));
    assert_eq!(parsed.col, Some(col));
    assert_eq!(parsed.abs_row, input.abs_row);
    assert_eq!(parsed.abs_col, input.abs_col);

    let letters = column_to_letters(col);
    assert_eq!(letters_to_column(&letters).ok(), Some(col));
});
