//! Error types for sheetpack operations.

use thiserror::Error;

/// Result type alias for sheetpack operations.
pub type Result<T> = std::result::Result<T, SheetpackError>;

/// Errors that can occur while converting between the object model and the
/// xlsx package format.
#[derive(Error, Debug)]
pub enum SheetpackError {
    /// I/O error while reading or writing a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Zip archive error.
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// XML parsing error inside one of the package parts.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The import payload was empty or not decodable content.
    #[error("Invalid content: {0}")]
    InvalidContent(String),

    /// A cell/column/row address string could not be parsed.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// A target file name reduces to a bare extension dot.
    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    /// The workbook contains no worksheets.
    #[error("Workbook has no worksheets")]
    NoWorksheets,

    /// The requested worksheet does not exist.
    #[error("Worksheet not found: {0}")]
    WorksheetNotFound(String),

    /// A worksheet with this name already exists.
    #[error("Worksheet already exists: {0}")]
    WorksheetAlreadyExists(String),
}
