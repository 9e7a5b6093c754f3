//! Worksheet, row and column definitions.
//!
//! Rows and cells are sparse maps keyed by zero-based index; index i in the
//! model corresponds to 1-based row/column i+1 in the package format. Keys
//! iterate in order, which is what the writer relies on for deterministic
//! part output.

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};

use crate::cell::{Cell, CellValue};
use crate::style::Style;

/// A frozen-pane split: the topmost `rows` rows and leftmost `columns`
/// columns stay fixed while the rest scrolls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrozenPane {
    pub rows: u32,
    pub columns: u32,
}

/// Width of a column definition.
///
/// The package format stores widths in "character width" units; pixel
/// widths and explicit character counts convert on the way in and out.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ColumnWidth {
    Pixels(f64),
    Chars(f64),
}

/// A column definition: width, visibility, default style.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub width: Option<ColumnWidth>,
    pub visible: bool,
    pub style: Option<Style>,
}

impl Default for Column {
    fn default() -> Self {
        Column {
            width: None,
            visible: true,
            style: None,
        }
    }
}

impl Column {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A row: sparse cells plus row-level settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub cells: BTreeMap<u32, Cell>,
    pub height: Option<f64>,
    pub visible: bool,
    /// Outline depth; 0 or absent means not grouped.
    pub group_level: Option<u32>,
    pub collapsed: bool,
    /// Row-level default style.
    pub style: Option<Style>,
}

impl Default for Row {
    fn default() -> Self {
        Row {
            cells: BTreeMap::new(),
            height: None,
            visible: true,
            group_level: None,
            collapsed: false,
            style: None,
        }
    }
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the row carries anything worth writing besides its cells.
    pub fn has_settings(&self) -> bool {
        self.height.is_some()
            || !self.visible
            || self.group_level.is_some()
            || self.collapsed
            || self.style.is_some()
    }
}

/// A worksheet: sparse rows and columns plus sheet-level settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkSheet {
    pub name: String,
    pub rows: BTreeMap<u32, Row>,
    pub columns: BTreeMap<u32, Column>,
    pub frozen: Option<FrozenPane>,
    /// Sheet-level default style, the weakest layer of the cascade.
    pub style: Option<Style>,
    pub visible: bool,
    /// Outline summary rows below the detail (the usual direction).
    pub summary_below: bool,
}

impl WorkSheet {
    pub fn new<S: Into<String>>(name: S) -> Self {
        WorkSheet {
            name: name.into(),
            rows: BTreeMap::new(),
            columns: BTreeMap::new(),
            frozen: None,
            style: None,
            visible: true,
            summary_below: true,
        }
    }

    /// Get a cell if present.
    pub fn cell(&self, row: u32, col: u32) -> Option<&Cell> {
        self.rows.get(&row)?.cells.get(&col)
    }

    /// Get or create a cell.
    pub fn cell_mut(&mut self, row: u32, col: u32) -> &mut Cell {
        self.rows
            .entry(row)
            .or_default()
            .cells
            .entry(col)
            .or_default()
    }

    /// Set a cell value, creating the row and cell as needed.
    pub fn set_value<V: Into<CellValue>>(&mut self, row: u32, col: u32, value: V) {
        self.cell_mut(row, col).value = value.into();
    }

    /// Set a cell formula (already-expanded text, without a leading `=`
    /// being required either way).
    pub fn set_formula<S: Into<String>>(&mut self, row: u32, col: u32, formula: S) {
        self.cell_mut(row, col).formula = Some(formula.into());
    }

    /// Set a cell style.
    pub fn set_style(&mut self, row: u32, col: u32, style: Style) {
        self.cell_mut(row, col).style = Some(style);
    }

    /// Merge a region; the top-left cell carries the span.
    pub fn merge(&mut self, row: u32, col: u32, col_span: u32, row_span: u32) {
        let cell = self.cell_mut(row, col);
        cell.col_span = Some(col_span.max(1));
        cell.row_span = Some(row_span.max(1));
    }

    /// Set a row height in points.
    pub fn set_row_height(&mut self, row: u32, height: f64) {
        self.rows.entry(row).or_default().height = Some(height);
    }

    /// Set a column width.
    pub fn set_column_width(&mut self, col: u32, width: ColumnWidth) {
        self.columns.entry(col).or_insert_with(Column::new).width = Some(width);
    }

    /// Freeze the topmost `rows` rows and leftmost `columns` columns.
    pub fn freeze(&mut self, rows: u32, columns: u32) {
        self.frozen = if rows == 0 && columns == 0 {
            None
        } else {
            Some(FrozenPane { rows, columns })
        };
    }

    /// The populated extent as zero-based (max_row, max_col), if any cell
    /// or row definition exists.
    pub fn dimension(&self) -> Option<(u32, u32)> {
        let mut max: Option<(u32, u32)> = None;
        for (row_idx, row) in &self.rows {
            let row_max_col = row.cells.keys().next_back().copied().unwrap_or(0);
            max = Some(match max {
                Some((r, c)) => (r.max(*row_idx), c.max(row_max_col)),
                None => (*row_idx, row_max_col),
            });
        }
        max
    }

    /// All merge regions as zero-based (top, left, bottom, right).
    pub fn merge_regions(&self) -> Vec<(u32, u32, u32, u32)> {
        let mut regions = Vec::new();
        for (row_idx, row) in &self.rows {
            for (col_idx, cell) in &row.cells {
                if cell.is_merge_anchor() {
                    let (cols, rows) = cell.span();
                    regions.push((*row_idx, *col_idx, row_idx + rows - 1, col_idx + cols - 1));
                }
            }
        }
        regions
    }
}
