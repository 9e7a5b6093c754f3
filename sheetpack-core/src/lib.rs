//! Core library for converting between an in-memory spreadsheet object
//! model and the OOXML xlsx package format.
//!
//! The two entry points are [`serialize`], which turns a [`Workbook`] into a
//! base64-encoded xlsx archive, and [`deserialize`], which inverts it. Both
//! are pure batch transforms: every table they need (shared strings, style
//! interning, theme colors) is created fresh per call.
//!
//! ```no_run
//! use sheetpack_core::{serialize, deserialize, Workbook};
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.create_sheet(Some("Data".to_string()))?;
//! sheet.set_value(0, 0, "hello");
//! sheet.set_value(0, 1, 42.0);
//!
//! let payload = serialize(&workbook)?;
//! let round_tripped = deserialize(&payload)?;
//! assert_eq!(round_tripped.sheets[0].name, "Data");
//! # Ok::<(), sheetpack_core::SheetpackError>(())
//! ```

pub mod address;
pub mod cell;
pub mod color;
pub mod date;
pub mod error;
pub mod format;
pub mod payload;
pub mod shared_formula;
pub mod style;
pub mod workbook;
pub mod worksheet;
pub mod writer;
pub mod xml;

pub use cell::{Cell, CellValue};
pub use color::{Color, ThemePalette};
pub use error::{Result, SheetpackError};
pub use style::{
    Border, BorderEdge, BorderKind, Fill, Font, HorizontalAlignment, Style, StyleId,
    VerticalAlignment,
};
pub use workbook::{CompressionLevel, DocumentMetadata, ReservedContent, Workbook};
pub use worksheet::{Column, ColumnWidth, FrozenPane, Row, WorkSheet};

/// Serialize a workbook into a base64-encoded xlsx archive.
pub fn serialize(workbook: &Workbook) -> Result<String> {
    let bytes = workbook.save_to_bytes()?;
    Ok(payload::encode(&bytes))
}

/// Deserialize a base64 (or data-URI) payload into a workbook.
///
/// Fails with an invalid-content error on empty input; a leading
/// `"...base64,"` prefix is stripped before decoding.
pub fn deserialize(input: &str) -> Result<Workbook> {
    if input.trim().is_empty() {
        return Err(SheetpackError::InvalidContent(
            "empty import payload".to_string(),
        ));
    }
    let bytes = payload::decode(input)?;
    Workbook::load_from_bytes(&bytes)
}
