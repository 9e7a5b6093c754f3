//! Package assembly: turns a workbook into the zip-of-XML-parts archive.
//!
//! All per-document tables (shared strings, style interning, relationship
//! ids) live on the assembler value created fresh for each call; nothing is
//! shared across invocations. Worksheet parts are built first so the shared
//! string and style tables are complete before their own parts are written.

use std::io::{Seek, Write};

#[cfg(feature = "fast-hash")]
use hashbrown::HashMap;
#[cfg(not(feature = "fast-hash"))]
use std::collections::HashMap;

use zip::write::{ExtendedFileOptions, FileOptions};
use zip::{CompressionMethod, ZipWriter};

use crate::address::{range_to_address, to_address};
use crate::cell::{Cell, CellValue};
use crate::color::ThemePalette;
use crate::date;
use crate::error::Result;
use crate::style::{cascade, Style, StyleId, StyleTable};
use crate::workbook::{CompressionLevel, Workbook};
use crate::worksheet::{ColumnWidth, WorkSheet};
use crate::xml::XmlElement;

const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_PKG_REL: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

const CT_WORKBOOK: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml";
const CT_WORKBOOK_MACRO: &str = "application/vnd.ms-excel.sheet.macroEnabled.main+xml";
const CT_WORKSHEET: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";
const CT_STYLES: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml";
const CT_SHARED_STRINGS: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml";
const CT_THEME: &str = "application/vnd.openxmlformats-officedocument.theme+xml";
const CT_CORE: &str = "application/vnd.openxmlformats-package.core-properties+xml";
const CT_APP: &str = "application/vnd.openxmlformats-officedocument.extended-properties+xml";
const CT_VBA: &str = "application/vnd.ms-office.vbaProject";

const REL_WORKSHEET: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
const REL_STYLES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const REL_THEME: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";
const REL_SHARED_STRINGS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings";
const REL_VBA: &str = "http://schemas.microsoft.com/office/2006/relationships/vbaProject";

/// Index of an interned shared string, written into `t="s"` cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SharedStringId(pub usize);

/// Insertion-ordered shared string table. Tracks total references so the
/// part can declare both `count` and `uniqueCount`.
#[derive(Debug, Default)]
pub struct SharedStrings {
    strings: Vec<String>,
    index: HashMap<String, usize>,
    total: usize,
}

impl SharedStrings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning its table index.
    pub fn intern(&mut self, s: &str) -> SharedStringId {
        self.total += 1;
        if let Some(idx) = self.index.get(s) {
            return SharedStringId(*idx);
        }
        let idx = self.strings.len();
        self.strings.push(s.to_string());
        self.index.insert(s.to_string(), idx);
        SharedStringId(idx)
    }

    pub fn unique_count(&self) -> usize {
        self.strings.len()
    }

    pub fn total_count(&self) -> usize {
        self.total
    }
}

/// Sequential relationship id allocator ("rId1", "rId2", ...).
#[derive(Debug, Default)]
struct RelIdAllocator {
    next: u32,
}

impl RelIdAllocator {
    fn next(&mut self) -> String {
        self.next += 1;
        format!("rId{}", self.next)
    }
}

/// Convert a column width to the stored "character width" unit.
pub fn width_to_chars(width: ColumnWidth) -> f64 {
    match width {
        ColumnWidth::Pixels(px) => ((px - 5.0) / 7.0 * 100.0).trunc() / 100.0,
        ColumnWidth::Chars(n) => ((n * 7.0 + 5.0) / 7.0 * 256.0).trunc() / 256.0,
    }
}

/// Convert a stored character width back to pixels.
pub fn chars_to_pixels(chars: f64) -> f64 {
    ((256.0 * chars + 18.0) / 256.0 * 7.0).trunc()
}

/// Write the whole package into `sink`.
pub fn write_package<W: Write + Seek>(workbook: &Workbook, sink: W) -> Result<()> {
    let mut assembler = PackageAssembler::new(workbook);
    assembler.write(sink)
}

struct PackageAssembler<'a> {
    workbook: &'a Workbook,
    styles: StyleTable,
    shared: SharedStrings,
}

impl<'a> PackageAssembler<'a> {
    fn new(workbook: &'a Workbook) -> Self {
        PackageAssembler {
            workbook,
            styles: StyleTable::new(workbook.theme),
            shared: SharedStrings::new(),
        }
    }

    fn file_options(&self) -> FileOptions<'static, ExtendedFileOptions> {
        match self.workbook.compression {
            CompressionLevel::None => {
                FileOptions::default().compression_method(CompressionMethod::Stored)
            }
            CompressionLevel::Fast => FileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(1)),
            CompressionLevel::Default => FileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(6)),
            CompressionLevel::Best => FileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(9)),
        }
    }

    fn write<W: Write + Seek>(&mut self, sink: W) -> Result<()> {
        let mut zip = ZipWriter::new(sink);

        // Build worksheet parts first: they populate the shared string and
        // style tables the later parts declare.
        let workbook = self.workbook;
        let mut sheet_docs = Vec::with_capacity(workbook.sheets.len());
        for (idx, sheet) in workbook.sheets.iter().enumerate() {
            sheet_docs.push(self.build_worksheet(sheet, idx)?);
        }

        self.start(&mut zip, "[Content_Types].xml")?;
        zip.write_all(self.content_types().to_document().as_bytes())?;

        self.start(&mut zip, "_rels/.rels")?;
        zip.write_all(package_rels().to_document().as_bytes())?;

        self.start(&mut zip, "docProps/core.xml")?;
        zip.write_all(self.core_properties().as_bytes())?;

        self.start(&mut zip, "docProps/app.xml")?;
        zip.write_all(self.app_properties().as_bytes())?;

        self.start(&mut zip, "xl/workbook.xml")?;
        zip.write_all(self.workbook_part().to_document().as_bytes())?;

        self.start(&mut zip, "xl/_rels/workbook.xml.rels")?;
        zip.write_all(self.workbook_rels().to_document().as_bytes())?;

        self.start(&mut zip, "xl/theme/theme1.xml")?;
        zip.write_all(theme_part(&workbook.theme).as_bytes())?;

        self.start(&mut zip, "xl/styles.xml")?;
        zip.write_all(self.styles_part().to_document().as_bytes())?;

        self.start(&mut zip, "xl/sharedStrings.xml")?;
        zip.write_all(self.shared_strings_part().to_document().as_bytes())?;

        for (idx, doc) in sheet_docs.iter().enumerate() {
            self.start(&mut zip, &format!("xl/worksheets/sheet{}.xml", idx + 1))?;
            zip.write_all(doc.as_bytes())?;
        }

        if let Some(macros) = &self.workbook.reserved.macros {
            self.start(&mut zip, "xl/vbaProject.bin")?;
            zip.write_all(macros)?;
        }

        zip.finish()?;
        Ok(())
    }

    fn start<W: Write + Seek>(&self, zip: &mut ZipWriter<W>, name: &str) -> Result<()> {
        zip.start_file(name, self.file_options())?;
        Ok(())
    }

    fn content_types(&self) -> XmlElement {
        let mut types = XmlElement::new("Types").attr("xmlns", NS_CONTENT_TYPES);
        types.push(
            XmlElement::new("Default")
                .attr("Extension", "rels")
                .attr("ContentType", "application/vnd.openxmlformats-package.relationships+xml"),
        );
        types.push(
            XmlElement::new("Default")
                .attr("Extension", "xml")
                .attr("ContentType", "application/xml"),
        );
        let has_macros = self.workbook.reserved.macros.is_some();
        if has_macros {
            types.push(
                XmlElement::new("Default")
                    .attr("Extension", "bin")
                    .attr("ContentType", CT_VBA),
            );
        }
        types.push(
            XmlElement::new("Override")
                .attr("PartName", "/xl/workbook.xml")
                .attr("ContentType", if has_macros { CT_WORKBOOK_MACRO } else { CT_WORKBOOK }),
        );
        for idx in 0..self.workbook.sheets.len() {
            types.push(
                XmlElement::new("Override")
                    .attr("PartName", format!("/xl/worksheets/sheet{}.xml", idx + 1))
                    .attr("ContentType", CT_WORKSHEET),
            );
        }
        types.push(
            XmlElement::new("Override")
                .attr("PartName", "/xl/theme/theme1.xml")
                .attr("ContentType", CT_THEME),
        );
        types.push(
            XmlElement::new("Override")
                .attr("PartName", "/xl/styles.xml")
                .attr("ContentType", CT_STYLES),
        );
        types.push(
            XmlElement::new("Override")
                .attr("PartName", "/xl/sharedStrings.xml")
                .attr("ContentType", CT_SHARED_STRINGS),
        );
        types.push(
            XmlElement::new("Override")
                .attr("PartName", "/docProps/core.xml")
                .attr("ContentType", CT_CORE),
        );
        types.push(
            XmlElement::new("Override")
                .attr("PartName", "/docProps/app.xml")
                .attr("ContentType", CT_APP),
        );
        types
    }

    fn core_properties(&self) -> String {
        let meta = &self.workbook.metadata;
        let mut root = XmlElement::new("cp:coreProperties")
            .attr("xmlns:cp", "http://schemas.openxmlformats.org/package/2006/metadata/core-properties")
            .attr("xmlns:dc", "http://purl.org/dc/elements/1.1/")
            .attr("xmlns:dcterms", "http://purl.org/dc/terms/")
            .attr("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance");
        if let Some(creator) = &meta.creator {
            root.push(XmlElement::new("dc:creator").text(creator.clone()));
            root.push(XmlElement::new("cp:lastModifiedBy").text(creator.clone()));
        }
        if let Some(created) = meta.created {
            root.push(
                XmlElement::new("dcterms:created")
                    .attr("xsi:type", "dcterms:W3CDTF")
                    .text(created.format("%Y-%m-%dT%H:%M:%SZ").to_string()),
            );
        }
        if let Some(modified) = meta.modified {
            root.push(
                XmlElement::new("dcterms:modified")
                    .attr("xsi:type", "dcterms:W3CDTF")
                    .text(modified.format("%Y-%m-%dT%H:%M:%SZ").to_string()),
            );
        }
        root.to_document()
    }

    fn app_properties(&self) -> String {
        let meta = &self.workbook.metadata;
        let mut root = XmlElement::new("Properties").attr(
            "xmlns",
            "http://schemas.openxmlformats.org/officeDocument/2006/extended-properties",
        );
        root.push(
            XmlElement::new("Application")
                .text(meta.application.clone().unwrap_or_else(|| "sheetpack".to_string())),
        );
        if let Some(company) = &meta.company {
            root.push(XmlElement::new("Company").text(company.clone()));
        }
        root.to_document()
    }

    fn workbook_part(&self) -> XmlElement {
        let mut root = XmlElement::new("workbook")
            .attr("xmlns", NS_MAIN)
            .attr("xmlns:r", NS_REL);
        root.push(XmlElement::new("workbookPr"));
        root.push(
            XmlElement::new("bookViews").child(
                XmlElement::new("workbookView")
                    .attr("activeTab", self.workbook.metadata.active_sheet.to_string()),
            ),
        );
        let mut sheets = XmlElement::new("sheets");
        let mut rel_ids = RelIdAllocator::default();
        for (idx, sheet) in self.workbook.sheets.iter().enumerate() {
            let mut el = XmlElement::new("sheet")
                .attr("name", sheet.name.clone())
                .attr("sheetId", (idx + 1).to_string());
            if !sheet.visible {
                el = el.attr("state", "hidden");
            }
            sheets.push(el.attr("r:id", rel_ids.next()));
        }
        root.push(sheets);
        root
    }

    fn workbook_rels(&self) -> XmlElement {
        let mut root = XmlElement::new("Relationships").attr("xmlns", NS_PKG_REL);
        let mut rel_ids = RelIdAllocator::default();
        for idx in 0..self.workbook.sheets.len() {
            root.push(
                XmlElement::new("Relationship")
                    .attr("Id", rel_ids.next())
                    .attr("Type", REL_WORKSHEET)
                    .attr("Target", format!("worksheets/sheet{}.xml", idx + 1)),
            );
        }
        root.push(
            XmlElement::new("Relationship")
                .attr("Id", rel_ids.next())
                .attr("Type", REL_STYLES)
                .attr("Target", "styles.xml"),
        );
        root.push(
            XmlElement::new("Relationship")
                .attr("Id", rel_ids.next())
                .attr("Type", REL_THEME)
                .attr("Target", "theme/theme1.xml"),
        );
        root.push(
            XmlElement::new("Relationship")
                .attr("Id", rel_ids.next())
                .attr("Type", REL_SHARED_STRINGS)
                .attr("Target", "sharedStrings.xml"),
        );
        if self.workbook.reserved.macros.is_some() {
            root.push(
                XmlElement::new("Relationship")
                    .attr("Id", rel_ids.next())
                    .attr("Type", REL_VBA)
                    .attr("Target", "vbaProject.bin"),
            );
        }
        root
    }

    fn shared_strings_part(&self) -> XmlElement {
        let mut root = XmlElement::new("sst")
            .attr("xmlns", NS_MAIN)
            .attr("count", self.shared.total_count().to_string())
            .attr("uniqueCount", self.shared.unique_count().to_string());
        for s in &self.shared.strings {
            let mut t = XmlElement::new("t").text(s.clone());
            if s.starts_with(char::is_whitespace) || s.ends_with(char::is_whitespace) {
                t = t.attr("xml:space", "preserve");
            }
            root.push(XmlElement::new("si").child(t));
        }
        root
    }

    fn styles_part(&self) -> XmlElement {
        let mut root = XmlElement::new("styleSheet").attr("xmlns", NS_MAIN);

        if !self.styles.num_fmts.is_empty() {
            let mut num_fmts =
                XmlElement::new("numFmts").attr("count", self.styles.num_fmts.len().to_string());
            for (id, code) in &self.styles.num_fmts {
                num_fmts.push(
                    XmlElement::new("numFmt")
                        .attr("numFmtId", id.to_string())
                        .attr("formatCode", code.clone()),
                );
            }
            root.push(num_fmts);
        }

        let mut fonts =
            XmlElement::new("fonts").attr("count", self.styles.fonts.len().to_string());
        for font in &self.styles.fonts {
            let mut el = XmlElement::new("font");
            if font.bold {
                el.push(XmlElement::new("b"));
            }
            if font.italic {
                el.push(XmlElement::new("i"));
            }
            if font.underline {
                el.push(XmlElement::new("u"));
            }
            if font.strike {
                el.push(XmlElement::new("strike"));
            }
            if let Some(size) = font.size {
                el.push(XmlElement::new("sz").attr("val", float_attr(size)));
            }
            if let Some(color) = &font.color {
                el.push(XmlElement::new("color").attr("rgb", format!("FF{}", color)));
            }
            if let Some(name) = &font.name {
                el.push(XmlElement::new("name").attr("val", name.clone()));
            }
            fonts.push(el);
        }
        root.push(fonts);

        let mut fills =
            XmlElement::new("fills").attr("count", self.styles.fills.len().to_string());
        for fill in &self.styles.fills {
            let mut pattern = XmlElement::new("patternFill")
                .attr("patternType", fill.pattern.clone().unwrap_or_else(|| "none".to_string()));
            if let Some(fg) = &fill.fg_color {
                pattern.push(XmlElement::new("fgColor").attr("rgb", format!("FF{}", fg)));
            }
            if let Some(bg) = &fill.bg_color {
                pattern.push(XmlElement::new("bgColor").attr("rgb", format!("FF{}", bg)));
            }
            fills.push(XmlElement::new("fill").child(pattern));
        }
        root.push(fills);

        let mut borders =
            XmlElement::new("borders").attr("count", self.styles.borders.len().to_string());
        for border in &self.styles.borders {
            let mut el = XmlElement::new("border");
            for (tag, edge) in [
                ("left", &border.left),
                ("right", &border.right),
                ("top", &border.top),
                ("bottom", &border.bottom),
                ("diagonal", &border.diagonal),
            ] {
                let mut side = XmlElement::new(tag);
                if let Some(edge) = edge {
                    side = side.attr("style", edge.kind.as_str());
                    if let Some(color) = &edge.color {
                        side.push(XmlElement::new("color").attr("rgb", format!("FF{}", color)));
                    }
                }
                el.push(side);
            }
            borders.push(el);
        }
        root.push(borders);

        root.push(
            XmlElement::new("cellStyleXfs").attr("count", "1").child(
                XmlElement::new("xf")
                    .attr("numFmtId", "0")
                    .attr("fontId", "0")
                    .attr("fillId", "0")
                    .attr("borderId", "0"),
            ),
        );

        let mut cell_xfs =
            XmlElement::new("cellXfs").attr("count", self.styles.cell_xfs.len().to_string());
        for xf in &self.styles.cell_xfs {
            let mut el = XmlElement::new("xf")
                .attr("numFmtId", xf.num_fmt_id.to_string())
                .attr("fontId", xf.font_id.to_string())
                .attr("fillId", xf.fill_id.to_string())
                .attr("borderId", xf.border_id.to_string())
                .attr("xfId", "0");
            if xf.num_fmt_id != 0 {
                el = el.attr("applyNumberFormat", "1");
            }
            if xf.font_id != 0 {
                el = el.attr("applyFont", "1");
            }
            if xf.fill_id != 0 {
                el = el.attr("applyFill", "1");
            }
            if xf.border_id != 0 {
                el = el.attr("applyBorder", "1");
            }
            if xf.has_alignment() {
                el = el.attr("applyAlignment", "1");
                let mut alignment = XmlElement::new("alignment");
                if let Some(h) = xf.h_align {
                    alignment = alignment.attr("horizontal", h.as_str());
                }
                if let Some(v) = xf.v_align {
                    alignment = alignment.attr("vertical", v.as_str());
                }
                if let Some(indent) = xf.indent {
                    alignment = alignment.attr("indent", indent.to_string());
                }
                if xf.wrap_text {
                    alignment = alignment.attr("wrapText", "1");
                }
                el.push(alignment);
            }
            cell_xfs.push(el);
        }
        root.push(cell_xfs);

        root.push(
            XmlElement::new("cellStyles").attr("count", "1").child(
                XmlElement::new("cellStyle")
                    .attr("name", "Normal")
                    .attr("xfId", "0")
                    .attr("builtinId", "0"),
            ),
        );
        root
    }

    fn build_worksheet(&mut self, sheet: &WorkSheet, index: usize) -> Result<String> {
        let mut root = XmlElement::new("worksheet")
            .attr("xmlns", NS_MAIN)
            .attr("xmlns:r", NS_REL);

        if !sheet.summary_below {
            root.push(
                XmlElement::new("sheetPr")
                    .child(XmlElement::new("outlinePr").attr("summaryBelow", "0")),
            );
        }

        let dimension = match sheet.dimension() {
            Some((max_row, max_col)) => {
                if (max_row, max_col) == (0, 0) {
                    "A1".to_string()
                } else {
                    range_to_address(0, 0, max_row, max_col)
                }
            }
            None => "A1".to_string(),
        };
        root.push(XmlElement::new("dimension").attr("ref", dimension));

        let mut view = XmlElement::new("sheetView").attr("workbookViewId", "0");
        if index as u32 == self.workbook.metadata.active_sheet {
            view = view.attr("tabSelected", "1");
        }
        if let Some(pane) = sheet.frozen {
            let mut el = XmlElement::new("pane").attr("state", "frozen");
            if pane.columns > 0 {
                el = el.attr("xSplit", pane.columns.to_string());
            }
            if pane.rows > 0 {
                el = el.attr("ySplit", pane.rows.to_string());
            }
            el = el.attr(
                "topLeftCell",
                to_address(Some(pane.rows), Some(pane.columns), false, false),
            );
            let active = match (pane.rows > 0, pane.columns > 0) {
                (true, true) => "bottomRight",
                (true, false) => "bottomLeft",
                _ => "topRight",
            };
            view.push(el.attr("activePane", active));
        }
        root.push(XmlElement::new("sheetViews").child(view));
        root.push(XmlElement::new("sheetFormatPr").attr("defaultRowHeight", "15"));

        if !sheet.columns.is_empty() {
            let mut cols = XmlElement::new("cols");
            for (col_idx, column) in &sheet.columns {
                let mut el = XmlElement::new("col")
                    .attr("min", (col_idx + 1).to_string())
                    .attr("max", (col_idx + 1).to_string());
                if let Some(width) = column.width {
                    el = el
                        .attr("width", float_attr(width_to_chars(width)))
                        .attr("customWidth", "1");
                }
                if !column.visible {
                    el = el.attr("hidden", "1");
                }
                if let Some(style) = &column.style {
                    let id = self.styles.intern(&style.resolve_inheritance(), false)?;
                    el = el.attr("style", id.0.to_string());
                }
                cols.push(el);
            }
            root.push(cols);
        }

        let mut sheet_data = XmlElement::new("sheetData");
        for (row_idx, row) in &sheet.rows {
            let mut row_el = XmlElement::new("row").attr("r", (row_idx + 1).to_string());
            if let Some(height) = row.height {
                row_el = row_el
                    .attr("ht", float_attr(height))
                    .attr("customHeight", "1");
            }
            if !row.visible {
                row_el = row_el.attr("hidden", "1");
            }
            if let Some(level) = row.group_level {
                if level > 0 {
                    row_el = row_el.attr("outlineLevel", level.to_string());
                }
            }
            if row.collapsed {
                row_el = row_el.attr("collapsed", "1");
            }
            if let Some(style) = &row.style {
                let id = self.styles.intern(&style.resolve_inheritance(), false)?;
                row_el = row_el
                    .attr("s", id.0.to_string())
                    .attr("customFormat", "1");
            }

            for (col_idx, cell) in &row.cells {
                if let Some(cell_el) = self.build_cell(sheet, row, *row_idx, *col_idx, cell)? {
                    row_el.push(cell_el);
                }
            }
            sheet_data.push(row_el);
        }
        root.push(sheet_data);

        let merges = sheet.merge_regions();
        if !merges.is_empty() {
            let mut merge_cells =
                XmlElement::new("mergeCells").attr("count", merges.len().to_string());
            for (top, left, bottom, right) in merges {
                merge_cells.push(
                    XmlElement::new("mergeCell")
                        .attr("ref", range_to_address(top, left, bottom, right)),
                );
            }
            root.push(merge_cells);
        }

        root.push(
            XmlElement::new("pageMargins")
                .attr("left", "0.7")
                .attr("right", "0.7")
                .attr("top", "0.75")
                .attr("bottom", "0.75")
                .attr("header", "0.3")
                .attr("footer", "0.3"),
        );

        Ok(root.to_document())
    }

    fn build_cell(
        &mut self,
        sheet: &WorkSheet,
        row: &crate::worksheet::Row,
        row_idx: u32,
        col_idx: u32,
        cell: &Cell,
    ) -> Result<Option<XmlElement>> {
        let is_date = matches!(cell.value, CellValue::DateTime(_));
        let column_style = sheet.columns.get(&col_idx).and_then(|c| c.style.as_ref());
        let effective = cascade(
            cell.style.as_ref(),
            column_style,
            row.style.as_ref(),
            sheet.style.as_ref(),
        );
        let style_id = match (&effective, is_date) {
            (Some(style), _) => Some(self.styles.intern(style, is_date)?),
            (None, true) => Some(self.styles.intern(&Style::default(), true)?),
            (None, false) => None,
        };

        let has_content = !cell.value.is_empty() || cell.formula.is_some();
        if !has_content && style_id.map_or(true, |id| id == StyleId(0)) && !cell.is_merge_anchor() {
            return Ok(None);
        }

        let mut el = XmlElement::new("c").attr(
            "r",
            to_address(Some(row_idx), Some(col_idx), false, false),
        );
        if let Some(id) = style_id {
            if id != StyleId(0) {
                el = el.attr("s", id.0.to_string());
            }
        }

        if let Some(formula) = &cell.formula {
            let text = formula.strip_prefix('=').unwrap_or(formula);
            el.push(XmlElement::new("f").text(text.to_string()));
        }

        match &cell.value {
            CellValue::String(s) => {
                let SharedStringId(idx) = self.shared.intern(s);
                el = el.attr("t", "s");
                el.push(XmlElement::new("v").text(idx.to_string()));
            }
            CellValue::Number(n) => {
                el.push(XmlElement::new("v").text(number_text(*n)));
            }
            CellValue::Boolean(b) => {
                el = el.attr("t", "b");
                el.push(XmlElement::new("v").text(if *b { "1" } else { "0" }));
            }
            CellValue::DateTime(dt) => {
                el.push(XmlElement::new("v").text(number_text(date::to_serial(*dt))));
            }
            CellValue::Empty => {}
        }

        Ok(Some(el))
    }
}

fn package_rels() -> XmlElement {
    let mut root = XmlElement::new("Relationships").attr("xmlns", NS_PKG_REL);
    root.push(
        XmlElement::new("Relationship")
            .attr("Id", "rId1")
            .attr(
                "Type",
                "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument",
            )
            .attr("Target", "xl/workbook.xml"),
    );
    root.push(
        XmlElement::new("Relationship")
            .attr("Id", "rId2")
            .attr(
                "Type",
                "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties",
            )
            .attr("Target", "docProps/core.xml"),
    );
    root.push(
        XmlElement::new("Relationship")
            .attr("Id", "rId3")
            .attr(
                "Type",
                "http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties",
            )
            .attr("Target", "docProps/app.xml"),
    );
    root
}

/// The theme part is fixed boilerplate apart from the color scheme, so it is
/// emitted from a template with the palette substituted in.
fn theme_part(palette: &ThemePalette) -> String {
    let c = &palette.0;
    format!(
        concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\r\n",
            "<a:theme xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" name=\"Office Theme\">",
            "<a:themeElements><a:clrScheme name=\"Office\">",
            "<a:dk1><a:srgbClr val=\"{dk1}\"/></a:dk1><a:lt1><a:srgbClr val=\"{lt1}\"/></a:lt1>",
            "<a:dk2><a:srgbClr val=\"{dk2}\"/></a:dk2><a:lt2><a:srgbClr val=\"{lt2}\"/></a:lt2>",
            "<a:accent1><a:srgbClr val=\"{a1}\"/></a:accent1><a:accent2><a:srgbClr val=\"{a2}\"/></a:accent2>",
            "<a:accent3><a:srgbClr val=\"{a3}\"/></a:accent3><a:accent4><a:srgbClr val=\"{a4}\"/></a:accent4>",
            "<a:accent5><a:srgbClr val=\"{a5}\"/></a:accent5><a:accent6><a:srgbClr val=\"{a6}\"/></a:accent6>",
            "<a:hlink><a:srgbClr val=\"0000FF\"/></a:hlink><a:folHlink><a:srgbClr val=\"800080\"/></a:folHlink>",
            "</a:clrScheme>",
            "<a:fontScheme name=\"Office\">",
            "<a:majorFont><a:latin typeface=\"Cambria\"/><a:ea typeface=\"\"/><a:cs typeface=\"\"/></a:majorFont>",
            "<a:minorFont><a:latin typeface=\"Calibri\"/><a:ea typeface=\"\"/><a:cs typeface=\"\"/></a:minorFont>",
            "</a:fontScheme>",
            "<a:fmtScheme name=\"Office\">",
            "<a:fillStyleLst><a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill>",
            "<a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill>",
            "<a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill></a:fillStyleLst>",
            "<a:lnStyleLst><a:ln w=\"9525\"><a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill></a:ln>",
            "<a:ln w=\"25400\"><a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill></a:ln>",
            "<a:ln w=\"38100\"><a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill></a:ln></a:lnStyleLst>",
            "<a:effectStyleLst><a:effectStyle><a:effectLst/></a:effectStyle>",
            "<a:effectStyle><a:effectLst/></a:effectStyle>",
            "<a:effectStyle><a:effectLst/></a:effectStyle></a:effectStyleLst>",
            "<a:bgFillStyleLst><a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill>",
            "<a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill>",
            "<a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill></a:bgFillStyleLst>",
            "</a:fmtScheme></a:themeElements></a:theme>"
        ),
        lt1 = format!("{:06X}", c[0]),
        dk1 = format!("{:06X}", c[1]),
        lt2 = format!("{:06X}", c[2]),
        dk2 = format!("{:06X}", c[3]),
        a1 = format!("{:06X}", c[4]),
        a2 = format!("{:06X}", c[5]),
        a3 = format!("{:06X}", c[6]),
        a4 = format!("{:06X}", c[7]),
        a5 = format!("{:06X}", c[8]),
        a6 = format!("{:06X}", c[9]),
    )
}

/// Render an f64 for a `v` element: integral values without a trailing
/// fraction, everything else through ryu.
fn number_text(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        let mut buf = itoa::Buffer::new();
        buf.format(n as i64).to_string()
    } else {
        let mut buf = ryu::Buffer::new();
        buf.format(n).to_string()
    }
}

/// Render an f64 attribute value, trimming a trailing ".0".
fn float_attr(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        let mut buf = itoa::Buffer::new();
        buf.format(v as i64).to_string()
    } else {
        let mut buf = ryu::Buffer::new();
        buf.format(v).to_string()
    }
}
