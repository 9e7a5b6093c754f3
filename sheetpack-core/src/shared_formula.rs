//! Shared-formula expansion during import.
//!
//! The package format may store one base formula plus a cell range and have
//! the other cells in the range reference it by group index. The object
//! model only ever holds fully expanded formula text, so while a worksheet
//! part is being parsed each base formula is turned into a template (address
//! tokens replaced by positional placeholders) and dependent cells render
//! the template shifted by their offset from the anchor. Templates are
//! discarded with the registry once the worksheet is done.

#[cfg(feature = "fast-hash")]
use hashbrown::HashMap;
#[cfg(not(feature = "fast-hash"))]
use std::collections::HashMap;

use crate::address::{parse_address, to_address, CellRef};

/// One address token extracted from a base formula.
#[derive(Clone, Debug, PartialEq)]
struct SharedRef {
    /// Sheet-reference prefix including the `!`, verbatim (e.g. `'My Sheet'!`).
    sheet: Option<String>,
    cell: CellRef,
}

/// A base formula with its address tokens replaced by `{i}` placeholders.
#[derive(Clone, Debug)]
pub struct SharedFormulaTemplate {
    anchor_row: u32,
    anchor_col: u32,
    template: String,
    refs: Vec<SharedRef>,
}

/// Per-worksheet registry of shared-formula templates, keyed by group index.
#[derive(Debug, Default)]
pub struct SharedFormulaRegistry {
    templates: HashMap<u32, SharedFormulaTemplate>,
}

impl SharedFormulaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the base formula of a shared group, anchored at the cell
    /// that carries the explicit formula text.
    pub fn insert_base(&mut self, group: u32, anchor_row: u32, anchor_col: u32, formula: &str) {
        let (template, refs) = extract_template(formula);
        self.templates.insert(
            group,
            SharedFormulaTemplate {
                anchor_row,
                anchor_col,
                template,
                refs,
            },
        );
    }

    /// Render the formula for a dependent cell of a shared group. Relative
    /// reference components shift by the cell's offset from the anchor;
    /// absolute components stay put. Returns `None` for an unknown group.
    pub fn expand(&self, group: u32, target_row: u32, target_col: u32) -> Option<String> {
        let tmpl = self.templates.get(&group)?;
        let row_delta = target_row as i64 - tmpl.anchor_row as i64;
        let col_delta = target_col as i64 - tmpl.anchor_col as i64;

        let mut out = tmpl.template.clone();
        for (i, shared_ref) in tmpl.refs.iter().enumerate() {
            let row = shared_ref.cell.row.map(|r| {
                if shared_ref.cell.abs_row {
                    r
                } else {
                    (r as i64 + row_delta).max(0) as u32
                }
            });
            let col = shared_ref.cell.col.map(|c| {
                if shared_ref.cell.abs_col {
                    c
                } else {
                    (c as i64 + col_delta).max(0) as u32
                }
            });
            let mut rendered = String::new();
            if let Some(prefix) = &shared_ref.sheet {
                rendered.push_str(prefix);
            }
            rendered.push_str(&to_address(
                row,
                col,
                shared_ref.cell.abs_row,
                shared_ref.cell.abs_col,
            ));
            out = out.replacen(&format!("{{{}}}", i), &rendered, 1);
        }
        Some(out)
    }
}

/// Scan a formula for cell references (optionally sheet-qualified) and
/// replace each with a `{i}` placeholder.
fn extract_template(formula: &str) -> (String, Vec<SharedRef>) {
    let bytes = formula.as_bytes();
    let mut template = String::with_capacity(formula.len());
    let mut refs = Vec::new();
    let mut i = 0usize;

    while i < bytes.len() {
        let b = bytes[i];

        // String literals pass through untouched.
        if b == b'"' {
            let start = i;
            i += 1;
            while i < bytes.len() && bytes[i] != b'"' {
                i += 1;
            }
            i = (i + 1).min(bytes.len());
            template.push_str(&formula[start..i]);
            continue;
        }

        // Quoted sheet prefix: 'Name with spaces'!A1
        if b == b'\'' {
            let start = i;
            i += 1;
            while i < bytes.len() && bytes[i] != b'\'' {
                i += 1;
            }
            if i < bytes.len() {
                i += 1;
            }
            if i < bytes.len() && bytes[i] == b'!' {
                i += 1;
                let prefix = &formula[start..i];
                if let Some((cell, consumed)) = take_cell_ref(&bytes[i..]) {
                    refs.push(SharedRef {
                        sheet: Some(prefix.to_string()),
                        cell,
                    });
                    template.push_str(&format!("{{{}}}", refs.len() - 1));
                    i += consumed;
                    continue;
                }
            }
            template.push_str(&formula[start..i]);
            continue;
        }

        if b == b'$' || b.is_ascii_alphabetic() {
            // Maximal identifier-ish run; it is a reference only if the
            // whole run parses as one and it is not a function call.
            let start = i;
            while i < bytes.len()
                && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'$' || bytes[i] == b'_')
            {
                i += 1;
            }
            let run = &formula[start..i];

            // Bare sheet prefix: Sheet1!A1
            if i < bytes.len() && bytes[i] == b'!' {
                let prefix_end = i + 1;
                if let Some((cell, consumed)) = take_cell_ref(&bytes[prefix_end..]) {
                    refs.push(SharedRef {
                        sheet: Some(formula[start..prefix_end].to_string()),
                        cell,
                    });
                    template.push_str(&format!("{{{}}}", refs.len() - 1));
                    i = prefix_end + consumed;
                    continue;
                }
                template.push_str(run);
                continue;
            }

            let next_is_call = i < bytes.len() && bytes[i] == b'(';
            match parse_address(run) {
                Some(cell) if cell.row.is_some() && cell.col.is_some() && !next_is_call => {
                    refs.push(SharedRef { sheet: None, cell });
                    template.push_str(&format!("{{{}}}", refs.len() - 1));
                }
                _ => template.push_str(run),
            }
            continue;
        }

        // Any other character (possibly multi-byte) passes through.
        let c = formula[i..].chars().next().unwrap_or('\0');
        template.push(c);
        i += c.len_utf8().max(1);
    }

    (template, refs)
}

/// Try to consume a full cell reference at the start of `bytes`; returns the
/// parsed reference and the number of bytes consumed.
fn take_cell_ref(bytes: &[u8]) -> Option<(CellRef, usize)> {
    let mut end = 0usize;
    while end < bytes.len()
        && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'$')
    {
        end += 1;
    }
    let run = std::str::from_utf8(&bytes[..end]).ok()?;
    match parse_address(run) {
        Some(cell) if cell.row.is_some() && cell.col.is_some() => Some((cell, end)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_extraction() {
        let (template, refs) = extract_template("A1+B1");
        assert_eq!(template, "{0}+{1}");
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].cell, CellRef::cell(0, 0));
        assert_eq!(refs[1].cell, CellRef::cell(0, 1));
    }

    #[test]
    fn test_function_names_are_not_references() {
        let (template, refs) = extract_template("SUM(A1:A10)");
        assert_eq!(template, "SUM({0}:{1})");
        assert_eq!(refs.len(), 2);
    }

    #[test]
    fn test_expand_shifts_relative_references() {
        // Base A1+B1 anchored at B2 (row 1, col 1); dependent at B3 shifts
        // one row down.
        let mut registry = SharedFormulaRegistry::new();
        registry.insert_base(0, 1, 1, "A1+B1");
        assert_eq!(registry.expand(0, 2, 1).unwrap(), "A2+B2");
    }

    #[test]
    fn test_expand_keeps_absolute_components() {
        let mut registry = SharedFormulaRegistry::new();
        registry.insert_base(3, 0, 0, "$A$1+B1");
        assert_eq!(registry.expand(3, 1, 1).unwrap(), "$A$1+C2");
    }

    #[test]
    fn test_expand_mixed_absolute() {
        let mut registry = SharedFormulaRegistry::new();
        registry.insert_base(0, 0, 0, "$A1+B$2");
        // One right, one down: absolute column/row components stay.
        assert_eq!(registry.expand(0, 1, 1).unwrap(), "$A2+C$2");
    }

    #[test]
    fn test_expand_sheet_qualified() {
        let mut registry = SharedFormulaRegistry::new();
        registry.insert_base(0, 0, 0, "Rates!A1*'Raw Data'!B1");
        assert_eq!(
            registry.expand(0, 1, 0).unwrap(),
            "Rates!A2*'Raw Data'!B2"
        );
    }

    #[test]
    fn test_expand_unknown_group() {
        let registry = SharedFormulaRegistry::new();
        assert_eq!(registry.expand(9, 0, 0), None);
    }

    #[test]
    fn test_string_literals_untouched() {
        let (template, refs) = extract_template("IF(A1>0,\"A1\",\"\")");
        assert_eq!(template, "IF({0}>0,\"A1\",\"\")");
        assert_eq!(refs.len(), 1);
    }
}
