//! Cell styling: Font, Fill, Border, alignment, style inheritance and the
//! interning tables behind the stylesheet part.
//!
//! Styles attach to cells, rows, columns and sheets as plain values. At
//! export time each usage is flattened through its `based_on` chain, cascaded
//! (cell wins over column over row over sheet), normalized (colors resolved,
//! formats translated) and interned: the stylesheet stores fonts, fills and
//! borders in separate indexed tables referenced by the cell format records.

use crate::color::{self, Color, ThemePalette};
use crate::error::Result;
use crate::format;
use serde::{Deserialize, Serialize};

/// Horizontal alignment of cell content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HorizontalAlignment {
    Left,
    Center,
    Right,
    Fill,
    Justify,
    Distributed,
}

impl HorizontalAlignment {
    pub fn as_str(&self) -> &'static str {
        match self {
            HorizontalAlignment::Left => "left",
            HorizontalAlignment::Center => "center",
            HorizontalAlignment::Right => "right",
            HorizontalAlignment::Fill => "fill",
            HorizontalAlignment::Justify => "justify",
            HorizontalAlignment::Distributed => "distributed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "left" => Some(HorizontalAlignment::Left),
            "center" => Some(HorizontalAlignment::Center),
            "right" => Some(HorizontalAlignment::Right),
            "fill" => Some(HorizontalAlignment::Fill),
            "justify" => Some(HorizontalAlignment::Justify),
            "distributed" => Some(HorizontalAlignment::Distributed),
            _ => None,
        }
    }
}

/// Vertical alignment of cell content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerticalAlignment {
    Top,
    Center,
    Bottom,
    Justify,
    Distributed,
}

impl VerticalAlignment {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerticalAlignment::Top => "top",
            VerticalAlignment::Center => "center",
            VerticalAlignment::Bottom => "bottom",
            VerticalAlignment::Justify => "justify",
            VerticalAlignment::Distributed => "distributed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "top" => Some(VerticalAlignment::Top),
            "center" => Some(VerticalAlignment::Center),
            "bottom" => Some(VerticalAlignment::Bottom),
            "justify" => Some(VerticalAlignment::Justify),
            "distributed" => Some(VerticalAlignment::Distributed),
            _ => None,
        }
    }
}

/// Line style of a border edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BorderKind {
    Thin,
    Medium,
    Thick,
    Dashed,
    Dotted,
    Double,
    Hair,
    MediumDashed,
    DashDot,
    MediumDashDot,
    DashDotDot,
    MediumDashDotDot,
    SlantDashDot,
}

impl BorderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BorderKind::Thin => "thin",
            BorderKind::Medium => "medium",
            BorderKind::Thick => "thick",
            BorderKind::Dashed => "dashed",
            BorderKind::Dotted => "dotted",
            BorderKind::Double => "double",
            BorderKind::Hair => "hair",
            BorderKind::MediumDashed => "mediumDashed",
            BorderKind::DashDot => "dashDot",
            BorderKind::MediumDashDot => "mediumDashDot",
            BorderKind::DashDotDot => "dashDotDot",
            BorderKind::MediumDashDotDot => "mediumDashDotDot",
            BorderKind::SlantDashDot => "slantDashDot",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "thin" => Some(BorderKind::Thin),
            "medium" => Some(BorderKind::Medium),
            "thick" => Some(BorderKind::Thick),
            "dashed" => Some(BorderKind::Dashed),
            "dotted" => Some(BorderKind::Dotted),
            "double" => Some(BorderKind::Double),
            "hair" => Some(BorderKind::Hair),
            "mediumDashed" => Some(BorderKind::MediumDashed),
            "dashDot" => Some(BorderKind::DashDot),
            "mediumDashDot" => Some(BorderKind::MediumDashDot),
            "dashDotDot" => Some(BorderKind::DashDotDot),
            "mediumDashDotDot" => Some(BorderKind::MediumDashDotDot),
            "slantDashDot" => Some(BorderKind::SlantDashDot),
            _ => None,
        }
    }
}

/// Font properties. Every field is optional so cascading can tell "unset"
/// from an explicit value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Font {
    /// Font family name (e.g. "Calibri", "Arial").
    pub name: Option<String>,
    /// Font size in points.
    pub size: Option<f64>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub strike: Option<bool>,
    pub color: Option<Color>,
}

impl Font {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_bold(mut self, bold: bool) -> Self {
        self.bold = Some(bold);
        self
    }

    pub fn with_italic(mut self, italic: bool) -> Self {
        self.italic = Some(italic);
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    fn merge_missing(&mut self, parent: &Font) {
        if self.name.is_none() {
            self.name = parent.name.clone();
        }
        if self.size.is_none() {
            self.size = parent.size;
        }
        if self.bold.is_none() {
            self.bold = parent.bold;
        }
        if self.italic.is_none() {
            self.italic = parent.italic;
        }
        if self.underline.is_none() {
            self.underline = parent.underline;
        }
        if self.strike.is_none() {
            self.strike = parent.strike;
        }
        if self.color.is_none() {
            self.color = parent.color.clone();
        }
    }
}

/// Pattern fill properties.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    /// Pattern type: solid, gray125, darkGray, ...
    pub pattern: Option<String>,
    pub fg_color: Option<Color>,
    pub bg_color: Option<Color>,
}

impl Fill {
    pub fn new() -> Self {
        Self::default()
    }

    /// A solid fill of the given color.
    pub fn solid(color: Color) -> Self {
        Fill {
            pattern: Some("solid".to_string()),
            fg_color: Some(color),
            bg_color: None,
        }
    }

    fn merge_missing(&mut self, parent: &Fill) {
        if self.pattern.is_none() {
            self.pattern = parent.pattern.clone();
        }
        if self.fg_color.is_none() {
            self.fg_color = parent.fg_color.clone();
        }
        if self.bg_color.is_none() {
            self.bg_color = parent.bg_color.clone();
        }
    }
}

/// One edge of a cell border.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BorderEdge {
    pub kind: BorderKind,
    pub color: Option<Color>,
}

impl BorderEdge {
    pub fn new(kind: BorderKind) -> Self {
        BorderEdge { kind, color: None }
    }

    pub fn thin() -> Self {
        Self::new(BorderKind::Thin)
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }
}

/// Cell border, one optional edge per side.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Border {
    pub left: Option<BorderEdge>,
    pub right: Option<BorderEdge>,
    pub top: Option<BorderEdge>,
    pub bottom: Option<BorderEdge>,
    pub diagonal: Option<BorderEdge>,
}

impl Border {
    pub fn new() -> Self {
        Self::default()
    }

    /// All four outer edges in the same style.
    pub fn all(edge: BorderEdge) -> Self {
        Border {
            left: Some(edge.clone()),
            right: Some(edge.clone()),
            top: Some(edge.clone()),
            bottom: Some(edge),
            diagonal: None,
        }
    }

    fn merge_missing(&mut self, parent: &Border) {
        if self.left.is_none() {
            self.left = parent.left.clone();
        }
        if self.right.is_none() {
            self.right = parent.right.clone();
        }
        if self.top.is_none() {
            self.top = parent.top.clone();
        }
        if self.bottom.is_none() {
            self.bottom = parent.bottom.clone();
        }
        if self.diagonal.is_none() {
            self.diagonal = parent.diagonal.clone();
        }
    }
}

/// A complete style as carried on cells, rows, columns and sheets.
///
/// `based_on` points at an inheritance parent; because the parent is owned,
/// a chain can never loop back on itself. The chain is flattened away before
/// interning and never survives into the package.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Style {
    /// Compact display format (see the format module).
    pub format: Option<String>,
    pub font: Option<Font>,
    pub fill: Option<Fill>,
    pub border: Option<Border>,
    pub h_align: Option<HorizontalAlignment>,
    pub v_align: Option<VerticalAlignment>,
    pub indent: Option<u32>,
    pub word_wrap: Option<bool>,
    /// Inheritance parent, export-only.
    pub based_on: Option<Box<Style>>,
}

impl Style {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format<S: Into<String>>(mut self, format: S) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_font(mut self, font: Font) -> Self {
        self.font = Some(font);
        self
    }

    pub fn with_fill(mut self, fill: Fill) -> Self {
        self.fill = Some(fill);
        self
    }

    pub fn with_border(mut self, border: Border) -> Self {
        self.border = Some(border);
        self
    }

    pub fn with_h_align(mut self, align: HorizontalAlignment) -> Self {
        self.h_align = Some(align);
        self
    }

    pub fn with_v_align(mut self, align: VerticalAlignment) -> Self {
        self.v_align = Some(align);
        self
    }

    pub fn with_indent(mut self, indent: u32) -> Self {
        self.indent = Some(indent);
        self
    }

    pub fn with_word_wrap(mut self, wrap: bool) -> Self {
        self.word_wrap = Some(wrap);
        self
    }

    pub fn with_based_on(mut self, parent: Style) -> Self {
        self.based_on = Some(Box::new(parent));
        self
    }

    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Style::default()
    }

    /// Fill fields that are unset here from `parent`, recursively through
    /// the nested font/fill/border objects. Values already present win.
    pub fn merge_missing(&mut self, parent: &Style) {
        if self.format.is_none() {
            self.format = parent.format.clone();
        }
        match (&mut self.font, &parent.font) {
            (None, Some(p)) => self.font = Some(p.clone()),
            (Some(f), Some(p)) => f.merge_missing(p),
            _ => {}
        }
        match (&mut self.fill, &parent.fill) {
            (None, Some(p)) => self.fill = Some(p.clone()),
            (Some(f), Some(p)) => f.merge_missing(p),
            _ => {}
        }
        match (&mut self.border, &parent.border) {
            (None, Some(p)) => self.border = Some(p.clone()),
            (Some(b), Some(p)) => b.merge_missing(p),
            _ => {}
        }
        if self.h_align.is_none() {
            self.h_align = parent.h_align;
        }
        if self.v_align.is_none() {
            self.v_align = parent.v_align;
        }
        if self.indent.is_none() {
            self.indent = parent.indent;
        }
        if self.word_wrap.is_none() {
            self.word_wrap = parent.word_wrap;
        }
    }

    /// Flatten the `based_on` chain into a single style. Child values win at
    /// every level of nesting; the returned style has no parent.
    pub fn resolve_inheritance(&self) -> Style {
        let mut flat = self.clone();
        flat.based_on = None;
        let mut ancestor = self.based_on.as_deref();
        while let Some(parent) = ancestor {
            flat.merge_missing(parent);
            ancestor = parent.based_on.as_deref();
        }
        flat
    }
}

/// Merge styles in strict precedence order: cell wins over column over row
/// over sheet default. Each input is flattened through its own inheritance
/// chain first. Returns `None` when no layer carries a style.
pub fn cascade(
    cell: Option<&Style>,
    column: Option<&Style>,
    row: Option<&Style>,
    sheet: Option<&Style>,
) -> Option<Style> {
    let mut layers = [cell, column, row, sheet]
        .into_iter()
        .flatten()
        .map(Style::resolve_inheritance);
    let mut effective = layers.next()?;
    for layer in layers {
        effective.merge_missing(&layer);
    }
    Some(effective)
}

/// Index of an interned style record in the stylesheet, as written into the
/// `s` attribute of cell/row/col elements.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct StyleId(pub u32);

/// A font record after normalization: colors resolved to hex, flags
/// defaulted. Equality is structural, which is what drives deduplication.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CanonFont {
    pub name: Option<String>,
    pub size: Option<f64>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
    pub color: Option<String>,
}

/// A normalized fill record.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CanonFill {
    pub pattern: Option<String>,
    pub fg_color: Option<String>,
    pub bg_color: Option<String>,
}

/// A normalized border edge.
#[derive(Clone, Debug, PartialEq)]
pub struct CanonEdge {
    pub kind: BorderKind,
    pub color: Option<String>,
}

/// A normalized border record.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CanonBorder {
    pub left: Option<CanonEdge>,
    pub right: Option<CanonEdge>,
    pub top: Option<CanonEdge>,
    pub bottom: Option<CanonEdge>,
    pub diagonal: Option<CanonEdge>,
}

/// A cell format record (`xf`): indices into the font/fill/border tables
/// plus the directly-stored alignment settings.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CellXf {
    pub num_fmt_id: u32,
    pub font_id: usize,
    pub fill_id: usize,
    pub border_id: usize,
    pub h_align: Option<HorizontalAlignment>,
    pub v_align: Option<VerticalAlignment>,
    pub indent: Option<u32>,
    pub wrap_text: bool,
}

impl CellXf {
    pub fn has_alignment(&self) -> bool {
        self.h_align.is_some() || self.v_align.is_some() || self.indent.is_some() || self.wrap_text
    }
}

/// Interning tables for one export run.
///
/// The stylesheet part stores fonts, fills and borders separately and has
/// cell formats reference them by index, so each sub-structure deduplicates
/// against its own table. For K distinct effective styles exactly K cell
/// format records are emitted.
#[derive(Clone, Debug)]
pub struct StyleTable {
    pub fonts: Vec<CanonFont>,
    pub fills: Vec<CanonFill>,
    pub borders: Vec<CanonBorder>,
    /// Custom number formats: (id, code), ids starting at 164.
    pub num_fmts: Vec<(u32, String)>,
    pub cell_xfs: Vec<CellXf>,
    theme: ThemePalette,
}

impl StyleTable {
    /// A fresh table with the records every stylesheet must carry: one
    /// default font, the none/gray125 fills, one empty border, xf 0.
    pub fn new(theme: ThemePalette) -> Self {
        StyleTable {
            fonts: vec![CanonFont {
                name: Some("Calibri".to_string()),
                size: Some(11.0),
                ..Default::default()
            }],
            fills: vec![
                CanonFill::default(),
                CanonFill {
                    pattern: Some("gray125".to_string()),
                    ..Default::default()
                },
            ],
            borders: vec![CanonBorder::default()],
            num_fmts: Vec::new(),
            cell_xfs: vec![CellXf::default()],
            theme,
        }
    }

    /// Intern a flattened, cascaded style and return its record index.
    ///
    /// The style is normalized first (colors resolved against the theme,
    /// compact format translated to a numFmt); structurally equal results
    /// share one record. `is_date` picks a date numFmt when the style does
    /// not specify a format of its own.
    pub fn intern(&mut self, style: &Style, is_date: bool) -> Result<StyleId> {
        let num_fmt_id = match &style.format {
            Some(compact) => {
                let code = format::to_num_fmt(compact, is_date || format_is_dateish(compact));
                self.num_fmt_id_for(&code)
            }
            None if is_date => 22,
            None => 0,
        };

        let font_id = match &style.font {
            Some(font) => self.intern_font(font)?,
            None => 0,
        };
        let fill_id = match &style.fill {
            Some(fill) => self.intern_fill(fill)?,
            None => 0,
        };
        let border_id = match &style.border {
            Some(border) => self.intern_border(border)?,
            None => 0,
        };

        let xf = CellXf {
            num_fmt_id,
            font_id,
            fill_id,
            border_id,
            h_align: style.h_align,
            v_align: style.v_align,
            indent: style.indent,
            wrap_text: style.word_wrap.unwrap_or(false),
        };

        if let Some(idx) = self.cell_xfs.iter().position(|x| x == &xf) {
            return Ok(StyleId(idx as u32));
        }
        let idx = self.cell_xfs.len();
        self.cell_xfs.push(xf);
        Ok(StyleId(idx as u32))
    }

    /// Resolve a format code to a numFmt id, allocating a custom id when it
    /// is not one of the built-ins.
    fn num_fmt_id_for(&mut self, code: &str) -> u32 {
        if let Some(id) = format::builtin_id(code) {
            return id;
        }
        if let Some((id, _)) = self.num_fmts.iter().find(|(_, c)| c == code) {
            return *id;
        }
        let id = format::FIRST_CUSTOM_NUM_FMT_ID + self.num_fmts.len() as u32;
        self.num_fmts.push((id, code.to_string()));
        id
    }

    fn intern_font(&mut self, font: &Font) -> Result<usize> {
        let canon = CanonFont {
            name: font.name.clone(),
            size: font.size,
            bold: font.bold.unwrap_or(false),
            italic: font.italic.unwrap_or(false),
            underline: font.underline.unwrap_or(false),
            strike: font.strike.unwrap_or(false),
            color: self.resolve_color(&font.color)?,
        };
        if let Some(idx) = self.fonts.iter().position(|f| f == &canon) {
            return Ok(idx);
        }
        self.fonts.push(canon);
        Ok(self.fonts.len() - 1)
    }

    fn intern_fill(&mut self, fill: &Fill) -> Result<usize> {
        let canon = CanonFill {
            pattern: fill
                .pattern
                .clone()
                .or_else(|| fill.fg_color.as_ref().map(|_| "solid".to_string())),
            fg_color: self.resolve_color(&fill.fg_color)?,
            bg_color: self.resolve_color(&fill.bg_color)?,
        };
        if let Some(idx) = self.fills.iter().position(|f| f == &canon) {
            return Ok(idx);
        }
        self.fills.push(canon);
        Ok(self.fills.len() - 1)
    }

    fn intern_border(&mut self, border: &Border) -> Result<usize> {
        let canon = CanonBorder {
            left: self.canon_edge(&border.left)?,
            right: self.canon_edge(&border.right)?,
            top: self.canon_edge(&border.top)?,
            bottom: self.canon_edge(&border.bottom)?,
            diagonal: self.canon_edge(&border.diagonal)?,
        };
        if let Some(idx) = self.borders.iter().position(|b| b == &canon) {
            return Ok(idx);
        }
        self.borders.push(canon);
        Ok(self.borders.len() - 1)
    }

    fn canon_edge(&self, edge: &Option<BorderEdge>) -> Result<Option<CanonEdge>> {
        Ok(match edge {
            Some(e) => Some(CanonEdge {
                kind: e.kind,
                color: self.resolve_color(&e.color)?,
            }),
            None => None,
        })
    }

    fn resolve_color(&self, c: &Option<Color>) -> Result<Option<String>> {
        Ok(match c {
            Some(color) => Some(color::resolve(color, &self.theme)?),
            None => None,
        })
    }
}

/// A compact format counts as a date pattern when it is not one of the
/// numeric kind codes.
fn format_is_dateish(compact: &str) -> bool {
    let mut chars = compact.chars();
    match chars.next() {
        Some(kind) if matches!(kind, 'n' | 'c' | 'p' | 'f' | 'd' | 'g') => {
            !chars.as_str().chars().all(|c| c.is_ascii_digit())
        }
        Some(_) => true,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_builder() {
        let font = Font::new()
            .with_name("Arial")
            .with_size(12.0)
            .with_bold(true)
            .with_color(Color::rgb("#FF0000"));
        assert_eq!(font.name, Some("Arial".to_string()));
        assert_eq!(font.size, Some(12.0));
        assert_eq!(font.bold, Some(true));
    }

    #[test]
    fn test_inheritance_child_wins() {
        let parent = Style::new()
            .with_format("n2")
            .with_font(Font::new().with_name("Arial").with_size(10.0));
        let child = Style::new()
            .with_font(Font::new().with_size(14.0))
            .with_based_on(parent);

        let flat = child.resolve_inheritance();
        assert_eq!(flat.format, Some("n2".to_string()));
        let font = flat.font.unwrap();
        assert_eq!(font.size, Some(14.0));
        assert_eq!(font.name, Some("Arial".to_string()));
        assert!(flat.based_on.is_none());
    }

    #[test]
    fn test_inheritance_grandparent() {
        let grandparent = Style::new().with_h_align(HorizontalAlignment::Center);
        let parent = Style::new().with_format("p1").with_based_on(grandparent);
        let child = Style::new().with_based_on(parent);

        let flat = child.resolve_inheritance();
        assert_eq!(flat.format, Some("p1".to_string()));
        assert_eq!(flat.h_align, Some(HorizontalAlignment::Center));
    }

    #[test]
    fn test_cascade_precedence() {
        let cell = Style::new().with_format("f0");
        let column = Style::new()
            .with_format("n2")
            .with_h_align(HorizontalAlignment::Right);
        let row = Style::new().with_v_align(VerticalAlignment::Top);
        let sheet = Style::new().with_font(Font::new().with_name("Courier"));

        let effective = cascade(Some(&cell), Some(&column), Some(&row), Some(&sheet)).unwrap();
        assert_eq!(effective.format, Some("f0".to_string()));
        assert_eq!(effective.h_align, Some(HorizontalAlignment::Right));
        assert_eq!(effective.v_align, Some(VerticalAlignment::Top));
        assert_eq!(effective.font.unwrap().name, Some("Courier".to_string()));
    }

    #[test]
    fn test_cascade_empty() {
        assert_eq!(cascade(None, None, None, None), None);
    }

    #[test]
    fn test_intern_deduplicates() {
        let mut table = StyleTable::new(ThemePalette::default());
        let a = Style::new().with_format("n2").with_font(Font::new().with_bold(true));
        let b = Style::new().with_format("n2").with_font(Font::new().with_bold(true));
        let c = Style::new().with_format("p1");

        let id_a = table.intern(&a, false).unwrap();
        let id_b = table.intern(&b, false).unwrap();
        let id_c = table.intern(&c, false).unwrap();

        assert_eq!(id_a, id_b);
        assert_ne!(id_a, id_c);
        // Default xf plus two distinct interned styles.
        assert_eq!(table.cell_xfs.len(), 3);
    }

    #[test]
    fn test_intern_shares_sub_records() {
        let mut table = StyleTable::new(ThemePalette::default());
        let bold = Font::new().with_bold(true);
        let a = Style::new().with_format("n2").with_font(bold.clone());
        let b = Style::new().with_format("p1").with_font(bold);

        table.intern(&a, false).unwrap();
        table.intern(&b, false).unwrap();

        // Two styles, one shared non-default font record.
        assert_eq!(table.fonts.len(), 2);
        assert_eq!(table.cell_xfs.len(), 3);
    }

    #[test]
    fn test_intern_normalizes_colors() {
        let mut table = StyleTable::new(ThemePalette::default());
        let by_hex = Style::new().with_fill(Fill::solid(Color::rgb("FF0000")));
        let by_index = Style::new().with_fill(Fill::solid(Color::Indexed(2)));

        let id_a = table.intern(&by_hex, false).unwrap();
        let id_b = table.intern(&by_index, false).unwrap();
        // Both resolve to FF0000, so they share one record.
        assert_eq!(id_a, id_b);
    }

    #[test]
    fn test_intern_empty_style_is_default_xf() {
        let mut table = StyleTable::new(ThemePalette::default());
        let id = table.intern(&Style::new(), false).unwrap();
        assert_eq!(id, StyleId(0));
        assert_eq!(table.cell_xfs.len(), 1);
    }

    #[test]
    fn test_custom_num_fmt_allocation() {
        let mut table = StyleTable::new(ThemePalette::default());
        let style = Style::new().with_format("yyyy-MM-dd HH:mm");
        table.intern(&style, true).unwrap();
        assert_eq!(table.num_fmts.len(), 1);
        assert_eq!(table.num_fmts[0].0, 164);
    }

    #[test]
    fn test_date_without_format_gets_date_num_fmt() {
        let mut table = StyleTable::new(ThemePalette::default());
        let id = table.intern(&Style::new(), true).unwrap();
        assert_eq!(table.cell_xfs[id.0 as usize].num_fmt_id, 22);
    }
}
