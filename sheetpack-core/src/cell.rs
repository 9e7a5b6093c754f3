//! Cell values and cell data.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::style::Style;

/// The value stored in a cell.
///
/// Dates are a distinct variant rather than a flag on numbers: the variant
/// alone decides whether a numeric serial is written, and on import a
/// date-classified number format turns the serial back into this variant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    String(String),
    Number(f64),
    Boolean(bool),
    DateTime(NaiveDateTime),
    Empty,
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(dt: NaiveDateTime) -> Self {
        CellValue::DateTime(dt)
    }
}

/// A single cell: value, optional formula text, merge span, style.
///
/// Formula text is always fully expanded; shared-formula indirection is
/// resolved during import and never stored. A span of 1 means "not merged"
/// and spans are only ever set on the top-left cell of a merge region.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub value: CellValue,
    pub formula: Option<String>,
    pub col_span: Option<u32>,
    pub row_span: Option<u32>,
    pub style: Option<Style>,
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Empty
    }
}

impl Cell {
    pub fn new(value: CellValue) -> Self {
        Cell {
            value,
            formula: None,
            col_span: None,
            row_span: None,
            style: None,
        }
    }

    pub fn with_formula<S: Into<String>>(mut self, formula: S) -> Self {
        self.formula = Some(formula.into());
        self
    }

    pub fn with_span(mut self, col_span: u32, row_span: u32) -> Self {
        self.col_span = Some(col_span.max(1));
        self.row_span = Some(row_span.max(1));
        self
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = Some(style);
        self
    }

    /// Effective merge extent; absent spans count as 1.
    pub fn span(&self) -> (u32, u32) {
        (self.col_span.unwrap_or(1), self.row_span.unwrap_or(1))
    }

    /// Whether this cell anchors a merge region.
    pub fn is_merge_anchor(&self) -> bool {
        let (cols, rows) = self.span();
        cols > 1 || rows > 1
    }
}
