//! Workbook representation, file I/O and package parsing.

#[cfg(feature = "fast-hash")]
use hashbrown::HashMap;
#[cfg(not(feature = "fast-hash"))]
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Read, Seek};
use std::path::Path;

use chrono::NaiveDateTime;
use quick_xml::events::{BytesStart, Event};
use serde::{Deserialize, Serialize};
use quick_xml::Reader;
use zip::ZipArchive;

use crate::address::parse_address_bytes;
use crate::cell::{Cell, CellValue};
use crate::color::{Color, ThemePalette};
use crate::date;
use crate::error::{Result, SheetpackError};
use crate::format;
use crate::shared_formula::SharedFormulaRegistry;
use crate::style::{
    Border, BorderEdge, BorderKind, Fill, Font, HorizontalAlignment, Style, VerticalAlignment,
};
use crate::worksheet::{Column, ColumnWidth, FrozenPane, WorkSheet};
use crate::writer;

/// Compression level for saving workbooks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum CompressionLevel {
    /// No compression - fastest saves, largest files
    None,
    /// Fast compression (deflate level 1) - good balance
    Fast,
    /// Default compression (deflate level 6) - smaller files, slower
    #[default]
    Default,
    /// Best compression (deflate level 9) - smallest files, slowest
    Best,
}

/// Document metadata carried in the docProps parts and workbook view.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub creator: Option<String>,
    pub application: Option<String>,
    pub company: Option<String>,
    pub created: Option<NaiveDateTime>,
    pub modified: Option<NaiveDateTime>,
    /// Zero-based index of the active sheet tab.
    pub active_sheet: u32,
}

/// Opaque content carried through a round-trip unmodified.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReservedContent {
    /// Macro project binary; its presence switches the package to the
    /// macro-enabled content type.
    pub macros: Option<Vec<u8>>,
}

/// A workbook: ordered worksheets plus document-level state.
///
/// Sheet order is significant - it is the tab order of the package.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Workbook {
    pub sheets: Vec<WorkSheet>,
    pub metadata: DocumentMetadata,
    pub reserved: ReservedContent,
    pub compression: CompressionLevel,
    /// Theme color table, populated from the theme part on import and
    /// consumed by color resolution on export.
    pub theme: ThemePalette,
}

impl Workbook {
    /// Create a new empty workbook.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set compression level for saving.
    pub fn set_compression(&mut self, level: CompressionLevel) {
        self.compression = level;
    }

    /// Create a new worksheet, appended to the tab order.
    pub fn create_sheet(&mut self, name: Option<String>) -> Result<&mut WorkSheet> {
        let name = name.unwrap_or_else(|| format!("Sheet{}", self.sheets.len() + 1));
        if self.sheets.iter().any(|s| s.name == name) {
            return Err(SheetpackError::WorksheetAlreadyExists(name));
        }
        self.sheets.push(WorkSheet::new(name));
        Ok(self.sheets.last_mut().unwrap())
    }

    /// Remove a worksheet by name.
    pub fn remove_sheet(&mut self, name: &str) -> Result<()> {
        match self.sheets.iter().position(|s| s.name == name) {
            Some(idx) => {
                self.sheets.remove(idx);
                Ok(())
            }
            None => Err(SheetpackError::WorksheetNotFound(name.to_string())),
        }
    }

    /// Get the active worksheet (falling back to the first).
    pub fn active(&self) -> Result<&WorkSheet> {
        self.sheets
            .get(self.metadata.active_sheet as usize)
            .or_else(|| self.sheets.first())
            .ok_or(SheetpackError::NoWorksheets)
    }

    /// Get a mutable reference to the active worksheet.
    pub fn active_mut(&mut self) -> Result<&mut WorkSheet> {
        let idx = (self.metadata.active_sheet as usize).min(self.sheets.len().saturating_sub(1));
        self.sheets.get_mut(idx).ok_or(SheetpackError::NoWorksheets)
    }

    /// Get a worksheet by name.
    pub fn sheet_by_name(&self, name: &str) -> Result<&WorkSheet> {
        self.sheets
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| SheetpackError::WorksheetNotFound(name.to_string()))
    }

    /// Get a mutable worksheet by name.
    pub fn sheet_by_name_mut(&mut self, name: &str) -> Result<&mut WorkSheet> {
        self.sheets
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| SheetpackError::WorksheetNotFound(name.to_string()))
    }

    /// Get a worksheet by tab index.
    pub fn sheet_by_index(&self, index: usize) -> Result<&WorkSheet> {
        self.sheets
            .get(index)
            .ok_or_else(|| SheetpackError::WorksheetNotFound(format!("index {}", index)))
    }

    /// Get a mutable worksheet by tab index.
    pub fn sheet_by_index_mut(&mut self, index: usize) -> Result<&mut WorkSheet> {
        self.sheets
            .get_mut(index)
            .ok_or_else(|| SheetpackError::WorksheetNotFound(format!("index {}", index)))
    }

    /// Save the workbook to a file.
    pub fn save(&self, path: &str) -> Result<()> {
        validate_file_name(path)?;
        let file = File::create(path)?;
        self.save_to_writer(file)
    }

    /// Save the workbook to an in-memory byte vector.
    pub fn save_to_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        writer::write_package(self, &mut buffer)?;
        Ok(buffer.into_inner())
    }

    /// Save the workbook to any writer that implements Write + Seek.
    pub fn save_to_writer<W: std::io::Write + Seek>(&self, sink: W) -> Result<()> {
        writer::write_package(self, sink)
    }

    /// Load a workbook from a file path.
    pub fn load(path: &str) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            SheetpackError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Failed to open file '{}': {}", path, e),
            ))
        })?;
        let mut archive = ZipArchive::new(BufReader::new(file))?;
        Self::parse_package(&mut archive)
    }

    /// Load a workbook from bytes (e.g. from memory or network).
    pub fn load_from_bytes(data: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(data))?;
        Self::parse_package(&mut archive)
    }

    /// Parse a package archive into a workbook.
    fn parse_package<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Self> {
        let workbook_xml = Self::read_zip_file(archive, "xl/workbook.xml")?;
        let workbook_rels_xml = Self::read_zip_file(archive, "xl/_rels/workbook.xml.rels").ok();
        let shared_strings_xml = Self::read_zip_file(archive, "xl/sharedStrings.xml").ok();
        let styles_xml = Self::read_zip_file(archive, "xl/styles.xml").ok();
        let theme_xml = Self::read_zip_file(archive, "xl/theme/theme1.xml").ok();
        let core_xml = Self::read_zip_file(archive, "docProps/core.xml").ok();
        let app_xml = Self::read_zip_file(archive, "docProps/app.xml").ok();
        let macros = Self::read_zip_file(archive, "xl/vbaProject.bin").ok();

        let (sheet_info, active_sheet) = Self::parse_workbook_xml(Cursor::new(&workbook_xml))?;

        let rels_map: HashMap<String, String> = match workbook_rels_xml {
            Some(xml) => Self::parse_workbook_rels(Cursor::new(&xml))?,
            None => HashMap::new(),
        };

        let shared_strings = match shared_strings_xml {
            Some(xml) => Self::parse_shared_strings_xml(Cursor::new(&xml))?,
            None => Vec::new(),
        };

        let theme = match theme_xml {
            Some(xml) => Self::parse_theme_xml(Cursor::new(&xml))?,
            None => ThemePalette::default(),
        };

        let styles = match styles_xml {
            Some(xml) => Self::parse_styles_xml(&xml)?,
            None => Vec::new(),
        };

        let mut metadata = match core_xml {
            Some(xml) => Self::parse_core_xml(Cursor::new(&xml))?,
            None => DocumentMetadata::default(),
        };
        if let Some(xml) = app_xml {
            Self::parse_app_xml(Cursor::new(&xml), &mut metadata)?;
        }
        metadata.active_sheet = active_sheet;

        let mut workbook = Workbook {
            sheets: Vec::with_capacity(sheet_info.len()),
            metadata,
            reserved: ReservedContent { macros },
            compression: CompressionLevel::default(),
            theme,
        };

        for (idx, info) in sheet_info.iter().enumerate() {
            let sheet_path = match rels_map.get(&info.rel_id) {
                Some(target) if target.starts_with('/') => target[1..].to_string(),
                Some(target) => format!("xl/{}", target),
                None => format!("xl/worksheets/sheet{}.xml", idx + 1),
            };
            let sheet_xml = Self::read_zip_file(archive, &sheet_path)?;
            let mut sheet = WorkSheet::new(info.name.clone());
            sheet.visible = info.visible;
            Self::parse_worksheet_xml(Cursor::new(&sheet_xml), &shared_strings, &styles, &mut sheet)?;
            workbook.sheets.push(sheet);
        }

        Ok(workbook)
    }

    /// Read a file from the ZIP archive into a Vec<u8>.
    fn read_zip_file<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<Vec<u8>> {
        let mut file = archive.by_name(path).map_err(|e| {
            SheetpackError::InvalidContent(format!("Failed to find {} in archive: {}", path, e))
        })?;
        let mut buf = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Parses workbook.xml: sheet entries in tab order plus the active tab.
    fn parse_workbook_xml<R: BufRead>(reader: R) -> Result<(Vec<SheetInfo>, u32)> {
        let mut reader = Reader::from_reader(reader);
        reader.config_mut().trim_text(true);

        let mut sheets = Vec::new();
        let mut active_sheet = 0u32;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e)) => {
                    let name = e.local_name();
                    let name = name.as_ref();
                    if name == b"sheet" {
                        let mut info = SheetInfo::default();
                        info.visible = true;
                        for attr in e.attributes().flatten() {
                            let key = attr.key.local_name();
                            match key.as_ref() {
                                b"name" => {
                                    info.name = String::from_utf8_lossy(&attr.value).to_string()
                                }
                                b"id" => {
                                    info.rel_id = String::from_utf8_lossy(&attr.value).to_string()
                                }
                                b"state" => {
                                    let state = String::from_utf8_lossy(&attr.value);
                                    info.visible = state == "visible";
                                }
                                _ => {}
                            }
                        }
                        if !info.name.is_empty() {
                            sheets.push(info);
                        }
                    } else if name == b"workbookView" {
                        if let Some(tab) = Self::get_attr_u32(&e, b"activeTab") {
                            active_sheet = tab;
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(SheetpackError::ParseError(format!(
                        "XML parsing error in workbook.xml: {}",
                        e
                    )));
                }
                _ => {}
            }
            buf.clear();
        }

        Ok((sheets, active_sheet))
    }

    /// Parses workbook.xml.rels into a relationship-id to target map.
    fn parse_workbook_rels<R: BufRead>(reader: R) -> Result<HashMap<String, String>> {
        let mut reader = Reader::from_reader(reader);
        reader.config_mut().trim_text(true);

        let mut rels = HashMap::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e)) => {
                    if e.local_name().as_ref() == b"Relationship" {
                        let id = Self::get_attr_str(&e, b"Id");
                        let target = Self::get_attr_str(&e, b"Target");
                        if let (Some(id), Some(target)) = (id, target) {
                            rels.insert(id, target);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(SheetpackError::ParseError(format!(
                        "XML parsing error in workbook.xml.rels: {}",
                        e
                    )));
                }
                _ => {}
            }
            buf.clear();
        }

        Ok(rels)
    }

    fn parse_shared_strings_xml<R: BufRead>(reader: R) -> Result<Vec<String>> {
        let mut reader = Reader::from_reader(reader);
        // Don't trim text - whitespace in string values is significant.
        reader.config_mut().trim_text(false);

        let mut strings = Vec::new();
        let mut buf = Vec::new();
        let mut current = String::new();
        let mut in_t = false;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    if e.name().as_ref() == b"t" {
                        in_t = true;
                    }
                }
                Ok(Event::Text(e)) => {
                    if in_t {
                        current.push_str(&e.unescape().unwrap_or_default());
                    }
                }
                Ok(Event::End(e)) => {
                    if e.name().as_ref() == b"t" {
                        in_t = false;
                    } else if e.name().as_ref() == b"si" {
                        strings.push(std::mem::take(&mut current));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(SheetpackError::ParseError(format!(
                        "XML parsing error in sharedStrings.xml: {}",
                        e
                    )));
                }
                _ => {}
            }
            buf.clear();
        }

        Ok(strings)
    }

    /// Parses theme1.xml into the ten-slot palette used for theme colors.
    fn parse_theme_xml<R: BufRead>(reader: R) -> Result<ThemePalette> {
        let mut reader = Reader::from_reader(reader);
        reader.config_mut().trim_text(true);

        let mut palette = ThemePalette::default();
        let mut buf = Vec::new();
        let mut current_slot: Option<usize> = None;
        let mut in_clr_scheme = false;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                    let name = e.local_name();
                    let name = name.as_ref();
                    if name == b"clrScheme" {
                        in_clr_scheme = true;
                    } else if in_clr_scheme {
                        match name {
                            b"lt1" => current_slot = Some(0),
                            b"dk1" => current_slot = Some(1),
                            b"lt2" => current_slot = Some(2),
                            b"dk2" => current_slot = Some(3),
                            b"accent1" => current_slot = Some(4),
                            b"accent2" => current_slot = Some(5),
                            b"accent3" => current_slot = Some(6),
                            b"accent4" => current_slot = Some(7),
                            b"accent5" => current_slot = Some(8),
                            b"accent6" => current_slot = Some(9),
                            b"srgbClr" => {
                                if let (Some(slot), Some(val)) =
                                    (current_slot, Self::get_attr_str(&e, b"val"))
                                {
                                    if let Ok(rgb) = u32::from_str_radix(&val, 16) {
                                        palette.0[slot] = rgb & 0x00FF_FFFF;
                                    }
                                }
                            }
                            b"sysClr" => {
                                if let (Some(slot), Some(val)) =
                                    (current_slot, Self::get_attr_str(&e, b"lastClr"))
                                {
                                    if let Ok(rgb) = u32::from_str_radix(&val, 16) {
                                        palette.0[slot] = rgb & 0x00FF_FFFF;
                                    }
                                }
                            }
                            _ => {}
                        }
                    }
                }
                Ok(Event::End(e)) => {
                    let name = e.local_name();
                    let name = name.as_ref();
                    if name == b"clrScheme" {
                        break;
                    }
                    if matches!(
                        name,
                        b"lt1" | b"dk1"
                            | b"lt2"
                            | b"dk2"
                            | b"accent1"
                            | b"accent2"
                            | b"accent3"
                            | b"accent4"
                            | b"accent5"
                            | b"accent6"
                    ) {
                        current_slot = None;
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(SheetpackError::ParseError(format!(
                        "XML parsing error in theme1.xml: {}",
                        e
                    )));
                }
                _ => {}
            }
            buf.clear();
        }

        Ok(palette)
    }

    fn parse_core_xml<R: BufRead>(reader: R) -> Result<DocumentMetadata> {
        let mut reader = Reader::from_reader(reader);
        reader.config_mut().trim_text(true);

        let mut metadata = DocumentMetadata::default();
        let mut buf = Vec::new();
        let mut current: Option<&'static str> = None;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    current = match e.local_name().as_ref() {
                        b"creator" => Some("creator"),
                        b"created" => Some("created"),
                        b"modified" => Some("modified"),
                        _ => None,
                    };
                }
                Ok(Event::Text(e)) => {
                    let text = e.unescape().unwrap_or_default().to_string();
                    match current {
                        Some("creator") => metadata.creator = Some(text),
                        Some("created") => metadata.created = parse_w3cdtf(&text),
                        Some("modified") => metadata.modified = parse_w3cdtf(&text),
                        _ => {}
                    }
                }
                Ok(Event::End(_)) => current = None,
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(SheetpackError::ParseError(format!(
                        "XML parsing error in core.xml: {}",
                        e
                    )));
                }
                _ => {}
            }
            buf.clear();
        }

        Ok(metadata)
    }

    fn parse_app_xml<R: BufRead>(reader: R, metadata: &mut DocumentMetadata) -> Result<()> {
        let mut reader = Reader::from_reader(reader);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut current: Option<&'static str> = None;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    current = match e.local_name().as_ref() {
                        b"Application" => Some("application"),
                        b"Company" => Some("company"),
                        _ => None,
                    };
                }
                Ok(Event::Text(e)) => {
                    let text = e.unescape().unwrap_or_default().to_string();
                    match current {
                        Some("application") => metadata.application = Some(text),
                        Some("company") => metadata.company = Some(text),
                        _ => {}
                    }
                }
                Ok(Event::End(_)) => current = None,
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(SheetpackError::ParseError(format!(
                        "XML parsing error in app.xml: {}",
                        e
                    )));
                }
                _ => {}
            }
            buf.clear();
        }

        Ok(())
    }

    /// Get a string attribute value from an XML element.
    fn get_attr_str(e: &BytesStart, key: &[u8]) -> Option<String> {
        for attr in e.attributes().flatten() {
            if attr.key.as_ref() == key {
                return Some(String::from_utf8_lossy(&attr.value).to_string());
            }
        }
        None
    }

    /// Get an optional u32 attribute value from an XML element.
    fn get_attr_u32(e: &BytesStart, key: &[u8]) -> Option<u32> {
        Self::get_attr_str(e, key).and_then(|s| s.parse().ok())
    }

    /// Get an optional f64 attribute value from an XML element.
    fn get_attr_f64(e: &BytesStart, key: &[u8]) -> Option<f64> {
        Self::get_attr_str(e, key).and_then(|s| s.parse().ok())
    }

    /// Check if an attribute equals "1" or "true".
    fn get_attr_bool(e: &BytesStart, key: &[u8]) -> bool {
        Self::get_attr_str(e, key)
            .map(|s| s == "1" || s == "true")
            .unwrap_or(false)
    }

    /// Parse a color element (rgb / indexed / theme+tint attributes).
    fn parse_color_element(e: &BytesStart) -> Option<Color> {
        if let Some(rgb) = Self::get_attr_str(e, b"rgb") {
            return Some(Color::Rgb(rgb));
        }
        if let Some(indexed) = Self::get_attr_u32(e, b"indexed") {
            return Some(Color::Indexed(indexed as u8));
        }
        if let Some(theme) = Self::get_attr_u32(e, b"theme") {
            return Some(Color::Theme {
                index: theme as u8,
                tint: Self::get_attr_f64(e, b"tint"),
            });
        }
        None
    }

    /// Parse a font child element into the font being built.
    fn parse_font_element(e: &BytesStart, font: &mut Font) {
        match e.name().as_ref() {
            b"b" => font.bold = Some(true),
            b"i" => font.italic = Some(true),
            b"u" => font.underline = Some(true),
            b"strike" => font.strike = Some(true),
            b"sz" => font.size = Self::get_attr_f64(e, b"val"),
            b"name" => font.name = Self::get_attr_str(e, b"val"),
            b"color" => font.color = Self::parse_color_element(e),
            _ => {}
        }
    }

    /// Parse a fill child element into the fill being built.
    fn parse_fill_element(e: &BytesStart, fill: &mut Fill) {
        match e.name().as_ref() {
            b"patternFill" => fill.pattern = Self::get_attr_str(e, b"patternType"),
            b"fgColor" => fill.fg_color = Self::parse_color_element(e),
            b"bgColor" => fill.bg_color = Self::parse_color_element(e),
            _ => {}
        }
    }

    /// Parses styles.xml into one reconstructed style per cellXfs entry.
    fn parse_styles_xml(xml: &[u8]) -> Result<Vec<ParsedXf>> {
        let mut reader = Reader::from_reader(Cursor::new(xml));
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut fonts: Vec<Font> = Vec::new();
        let mut fills: Vec<Fill> = Vec::new();
        let mut borders: Vec<Border> = Vec::new();
        let mut number_formats: HashMap<u32, String> = HashMap::new();
        let mut xfs: Vec<ParsedXf> = Vec::new();

        let mut in_font = false;
        let mut in_fill = false;
        let mut in_border = false;
        let mut in_cell_xfs = false;
        let mut in_xf = false;
        let mut border_side: Option<&'static str> = None;

        let mut current_font = Font::default();
        let mut current_fill = Fill::default();
        let mut current_border = Border::default();
        let mut current_edge_kind: Option<BorderKind> = None;
        let mut current_edge_color: Option<Color> = None;
        let mut current_style = Style::default();
        let mut current_is_date = false;

        loop {
            let event = reader.read_event_into(&mut buf);
            match event {
                Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                    let is_empty = matches!(&event, Ok(Event::Empty(_)));
                    let name = e.name();
                    let name = name.as_ref();
                    match name {
                        b"numFmt" => {
                            if let (Some(id), Some(code)) = (
                                Self::get_attr_u32(e, b"numFmtId"),
                                Self::get_attr_str(e, b"formatCode"),
                            ) {
                                number_formats.insert(id, code);
                            }
                        }
                        b"font" => {
                            if is_empty {
                                fonts.push(Font::default());
                            } else {
                                in_font = true;
                                current_font = Font::default();
                            }
                        }
                        b"fill" => {
                            if is_empty {
                                fills.push(Fill::default());
                            } else {
                                in_fill = true;
                                current_fill = Fill::default();
                            }
                        }
                        b"border" => {
                            if is_empty {
                                borders.push(Border::default());
                            } else {
                                in_border = true;
                                current_border = Border::default();
                            }
                        }
                        b"left" | b"right" | b"top" | b"bottom" | b"diagonal" if in_border => {
                            let side = match name {
                                b"left" => "left",
                                b"right" => "right",
                                b"top" => "top",
                                b"bottom" => "bottom",
                                _ => "diagonal",
                            };
                            current_edge_kind = Self::get_attr_str(e, b"style")
                                .as_deref()
                                .and_then(BorderKind::from_str);
                            current_edge_color = None;
                            if is_empty {
                                set_border_edge(
                                    &mut current_border,
                                    side,
                                    current_edge_kind.take(),
                                    None,
                                );
                            } else {
                                border_side = Some(side);
                            }
                        }
                        b"color" if border_side.is_some() => {
                            current_edge_color = Self::parse_color_element(e);
                        }
                        b"cellXfs" => {
                            in_cell_xfs = true;
                        }
                        b"xf" if in_cell_xfs => {
                            let mut style = Style::default();
                            let mut is_date = false;

                            if let Some(id) = Self::get_attr_u32(e, b"numFmtId") {
                                let code = number_formats
                                    .get(&id)
                                    .cloned()
                                    .or_else(|| format::builtin_code(id).map(str::to_string));
                                if let Some(code) = code {
                                    is_date = format::is_date_format(&code);
                                    let compact = format::from_num_fmt(&code)
                                        .into_iter()
                                        .next()
                                        .unwrap_or_default();
                                    if !compact.is_empty() {
                                        style.format = Some(compact);
                                    }
                                }
                            }
                            if let Some(id) = Self::get_attr_u32(e, b"fontId") {
                                if id > 0 {
                                    if let Some(font) = fonts.get(id as usize) {
                                        style.font = Some(font.clone());
                                    }
                                }
                            }
                            if let Some(id) = Self::get_attr_u32(e, b"fillId") {
                                if id > 1 {
                                    if let Some(fill) = fills.get(id as usize) {
                                        style.fill = Some(fill.clone());
                                    }
                                }
                            }
                            if let Some(id) = Self::get_attr_u32(e, b"borderId") {
                                if id > 0 {
                                    if let Some(border) = borders.get(id as usize) {
                                        style.border = Some(border.clone());
                                    }
                                }
                            }

                            if is_empty {
                                xfs.push(ParsedXf {
                                    style: non_empty_style(style),
                                    is_date,
                                });
                            } else {
                                in_xf = true;
                                current_style = style;
                                current_is_date = is_date;
                            }
                        }
                        b"alignment" if in_xf => {
                            Self::parse_alignment_element(e, &mut current_style);
                        }
                        _ => {
                            if in_font {
                                Self::parse_font_element(e, &mut current_font);
                            } else if in_fill {
                                Self::parse_fill_element(e, &mut current_fill);
                            }
                        }
                    }
                }
                Ok(Event::End(ref e)) => {
                    let name = e.name();
                    let name = name.as_ref();
                    match name {
                        b"font" => {
                            if in_font {
                                fonts.push(current_font.clone());
                                in_font = false;
                            }
                        }
                        b"fill" => {
                            if in_fill {
                                fills.push(current_fill.clone());
                                in_fill = false;
                            }
                        }
                        b"border" => {
                            if in_border {
                                borders.push(current_border.clone());
                                in_border = false;
                            }
                        }
                        b"left" | b"right" | b"top" | b"bottom" | b"diagonal" => {
                            if let Some(side) = border_side.take() {
                                set_border_edge(
                                    &mut current_border,
                                    side,
                                    current_edge_kind.take(),
                                    current_edge_color.take(),
                                );
                            }
                        }
                        b"cellXfs" => in_cell_xfs = false,
                        b"xf" => {
                            if in_xf {
                                xfs.push(ParsedXf {
                                    style: non_empty_style(current_style.clone()),
                                    is_date: current_is_date,
                                });
                                in_xf = false;
                            }
                        }
                        _ => {}
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(SheetpackError::ParseError(format!(
                        "XML parsing error in styles.xml: {}",
                        e
                    )));
                }
                _ => {}
            }
            buf.clear();
        }

        Ok(xfs)
    }

    fn parse_alignment_element(e: &BytesStart, style: &mut Style) {
        if let Some(h) = Self::get_attr_str(e, b"horizontal") {
            style.h_align = HorizontalAlignment::from_str(&h);
        }
        if let Some(v) = Self::get_attr_str(e, b"vertical") {
            style.v_align = VerticalAlignment::from_str(&v);
        }
        if let Some(indent) = Self::get_attr_u32(e, b"indent") {
            style.indent = Some(indent);
        }
        if Self::get_attr_bool(e, b"wrapText") {
            style.word_wrap = Some(true);
        }
    }

    fn parse_worksheet_xml<R: BufRead>(
        reader: R,
        shared_strings: &[String],
        styles: &[ParsedXf],
        sheet: &mut WorkSheet,
    ) -> Result<()> {
        let mut reader = Reader::from_reader(reader);
        // Don't trim text - cell values keep their whitespace.
        reader.config_mut().trim_text(false);

        let mut buf = Vec::new();
        let mut shared_formulas = SharedFormulaRegistry::new();

        let mut current_row: Option<u32> = None;
        let mut current_col: Option<u32> = None;
        let mut current_type: u8 = 0;
        let mut current_style_id: Option<u32> = None;
        let mut current_value: Option<String> = None;
        let mut current_formula: Option<String> = None;
        let mut current_shared_group: Option<u32> = None;
        let mut current_shared_base = false;
        let mut in_cell = false;
        let mut in_v = false;
        let mut in_f = false;
        let mut in_is_t = false;
        let mut merges: Vec<String> = Vec::new();

        loop {
            let event = reader.read_event_into(&mut buf);
            match event {
                Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                    let is_empty = matches!(&event, Ok(Event::Empty(_)));
                    let name = e.name();
                    let name = name.as_ref();
                    match name {
                        b"outlinePr" => {
                            if let Some(v) = Self::get_attr_str(e, b"summaryBelow") {
                                sheet.summary_below = v == "1" || v == "true";
                            }
                        }
                        b"pane" => {
                            if Self::get_attr_str(e, b"state").as_deref() == Some("frozen") {
                                let columns = Self::get_attr_u32(e, b"xSplit").unwrap_or(0);
                                let rows = Self::get_attr_u32(e, b"ySplit").unwrap_or(0);
                                if rows > 0 || columns > 0 {
                                    sheet.frozen = Some(FrozenPane { rows, columns });
                                }
                            }
                        }
                        b"col" => {
                            let min = Self::get_attr_u32(e, b"min").unwrap_or(1).max(1);
                            let max = Self::get_attr_u32(e, b"max").unwrap_or(min).max(min);
                            let width = Self::get_attr_f64(e, b"width");
                            let hidden = Self::get_attr_bool(e, b"hidden");
                            let style = Self::get_attr_u32(e, b"style")
                                .and_then(|id| styles.get(id as usize))
                                .and_then(|xf| xf.style.clone());
                            for col in min..=max {
                                let column = sheet
                                    .columns
                                    .entry(col - 1)
                                    .or_insert_with(Column::new);
                                if let Some(w) = width {
                                    column.width =
                                        Some(ColumnWidth::Pixels(writer::chars_to_pixels(w)));
                                }
                                column.visible = !hidden;
                                column.style = style.clone();
                            }
                        }
                        b"row" => {
                            current_row =
                                Self::get_attr_u32(e, b"r").filter(|r| *r > 0).map(|r| r - 1);
                            if let Some(row_idx) = current_row {
                                let has_settings = e.attributes().flatten().any(|a| {
                                    matches!(
                                        a.key.as_ref(),
                                        b"ht" | b"hidden" | b"outlineLevel" | b"collapsed" | b"customFormat"
                                    )
                                });
                                if has_settings {
                                    let row = sheet.rows.entry(row_idx).or_default();
                                    row.height = Self::get_attr_f64(e, b"ht");
                                    row.visible = !Self::get_attr_bool(e, b"hidden");
                                    row.group_level =
                                        Self::get_attr_u32(e, b"outlineLevel").filter(|l| *l > 0);
                                    row.collapsed = Self::get_attr_bool(e, b"collapsed");
                                    if Self::get_attr_bool(e, b"customFormat") {
                                        row.style = Self::get_attr_u32(e, b"s")
                                            .and_then(|id| styles.get(id as usize))
                                            .and_then(|xf| xf.style.clone());
                                    }
                                }
                            }
                        }
                        b"c" => {
                            current_type = 0;
                            current_style_id = None;
                            current_value = None;
                            current_formula = None;
                            current_shared_group = None;
                            current_shared_base = false;
                            for attr in e.attributes().flatten() {
                                match attr.key.as_ref() {
                                    b"r" => {
                                        if let Some(cell_ref) = parse_address_bytes(&attr.value) {
                                            current_row = cell_ref.row.or(current_row);
                                            current_col = cell_ref.col;
                                        }
                                    }
                                    b"t" => {
                                        current_type = attr.value.first().copied().unwrap_or(0);
                                    }
                                    b"s" => {
                                        current_style_id =
                                            std::str::from_utf8(&attr.value).ok().and_then(|s| s.parse().ok());
                                    }
                                    _ => {}
                                }
                            }
                            if is_empty {
                                Self::finish_cell(
                                    sheet,
                                    styles,
                                    shared_strings,
                                    &mut shared_formulas,
                                    current_row,
                                    current_col,
                                    current_type,
                                    current_style_id,
                                    None,
                                    None,
                                    None,
                                    false,
                                );
                            } else {
                                in_cell = true;
                            }
                        }
                        b"v" if in_cell => {
                            if !is_empty {
                                in_v = true;
                            }
                        }
                        b"t" if in_cell => {
                            if !is_empty {
                                in_is_t = true;
                            }
                        }
                        b"f" if in_cell => {
                            if Self::get_attr_str(e, b"t").as_deref() == Some("shared") {
                                current_shared_group = Self::get_attr_u32(e, b"si");
                                current_shared_base = Self::get_attr_str(e, b"ref").is_some();
                            }
                            if !is_empty {
                                in_f = true;
                                current_formula = Some(String::new());
                            }
                        }
                        b"mergeCell" => {
                            if let Some(r) = Self::get_attr_str(e, b"ref") {
                                merges.push(r);
                            }
                        }
                        _ => {}
                    }
                }
                Ok(Event::Text(ref e)) => {
                    let text = e.unescape().unwrap_or_default();
                    if in_v || in_is_t {
                        match &mut current_value {
                            Some(v) => v.push_str(&text),
                            None => current_value = Some(text.into_owned()),
                        }
                    } else if in_f {
                        if let Some(f) = &mut current_formula {
                            f.push_str(&text);
                        }
                    }
                }
                Ok(Event::End(ref e)) => {
                    let name = e.name();
                    let name = name.as_ref();
                    match name {
                        b"v" => in_v = false,
                        b"t" => in_is_t = false,
                        b"f" => in_f = false,
                        b"c" => {
                            Self::finish_cell(
                                sheet,
                                styles,
                                shared_strings,
                                &mut shared_formulas,
                                current_row,
                                current_col,
                                current_type,
                                current_style_id,
                                current_value.take(),
                                current_formula.take(),
                                current_shared_group.take(),
                                current_shared_base,
                            );
                            in_cell = false;
                        }
                        b"row" => current_row = None,
                        _ => {}
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(SheetpackError::ParseError(format!(
                        "XML parsing error in worksheet: {}",
                        e
                    )));
                }
                _ => {}
            }
            buf.clear();
        }

        Self::apply_merges(sheet, &merges);
        Ok(())
    }

    /// Commit a parsed cell into the sheet.
    #[allow(clippy::too_many_arguments)]
    fn finish_cell(
        sheet: &mut WorkSheet,
        styles: &[ParsedXf],
        shared_strings: &[String],
        shared_formulas: &mut SharedFormulaRegistry,
        row: Option<u32>,
        col: Option<u32>,
        cell_type: u8,
        style_id: Option<u32>,
        value: Option<String>,
        formula: Option<String>,
        shared_group: Option<u32>,
        shared_base: bool,
    ) {
        let (Some(row), Some(col)) = (row, col) else {
            return;
        };
        let parsed_xf = style_id.and_then(|id| styles.get(id as usize));
        let is_date_style = parsed_xf.map(|xf| xf.is_date).unwrap_or(false);

        let cell_value = match (&value, cell_type) {
            (Some(text), b's') => match text.parse::<usize>() {
                Ok(idx) if idx < shared_strings.len() => {
                    CellValue::String(shared_strings[idx].clone())
                }
                _ => CellValue::String(text.clone()),
            },
            (Some(text), b'b') => CellValue::Boolean(text.as_bytes().first() == Some(&b'1')),
            (Some(text), b'i') => CellValue::String(text.clone()),
            (Some(text), b'd') => match NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
                Ok(dt) => CellValue::DateTime(dt),
                Err(_) => CellValue::String(text.clone()),
            },
            (Some(text), _) => match text.parse::<f64>() {
                Ok(n) if is_date_style => match date::from_serial(n) {
                    Ok(dt) => CellValue::DateTime(dt),
                    Err(_) => CellValue::Number(n),
                },
                Ok(n) => CellValue::Number(n),
                Err(_) => CellValue::String(text.clone()),
            },
            (None, b'i') | (None, b's') => CellValue::String(String::new()),
            (None, _) => CellValue::Empty,
        };

        let formula = match (formula, shared_group) {
            (Some(text), Some(group)) if shared_base && !text.is_empty() => {
                // A base formula: register its template and keep the text.
                shared_formulas.insert_base(group, row, col, &text);
                Some(text)
            }
            (Some(text), _) if !text.is_empty() => Some(text),
            (_, Some(group)) => {
                // Dependent cell of a shared group; a missing template
                // yields an empty formula rather than failing the parse.
                Some(shared_formulas.expand(group, row, col).unwrap_or_default())
            }
            _ => None,
        };

        let cell = Cell {
            value: cell_value,
            formula,
            col_span: None,
            row_span: None,
            style: parsed_xf.and_then(|xf| xf.style.clone()),
        };

        // Skip cells that carry nothing; they only existed for layout.
        if cell.value.is_empty() && cell.formula.is_none() && cell.style.is_none() {
            return;
        }
        *sheet.cell_mut(row, col) = cell;
    }

    /// Set merge spans on the top-left cell of each merge range.
    fn apply_merges(sheet: &mut WorkSheet, merges: &[String]) {
        for merge_ref in merges {
            if let Ok(((top, left), (bottom, right))) = crate::address::parse_range(merge_ref) {
                let cell = sheet.cell_mut(top, left);
                cell.col_span = Some(right.saturating_sub(left) + 1);
                cell.row_span = Some(bottom.saturating_sub(top) + 1);
            }
        }
    }
}

/// One entry of the workbook.xml sheet list.
#[derive(Clone, Debug, Default)]
struct SheetInfo {
    name: String,
    rel_id: String,
    visible: bool,
}

/// A cellXfs entry reconstructed into an object-model style.
#[derive(Clone, Debug)]
struct ParsedXf {
    style: Option<Style>,
    is_date: bool,
}

fn non_empty_style(style: Style) -> Option<Style> {
    if style.is_empty() {
        None
    } else {
        Some(style)
    }
}

fn set_border_edge(
    border: &mut Border,
    side: &str,
    kind: Option<BorderKind>,
    color: Option<Color>,
) {
    let Some(kind) = kind else {
        return;
    };
    let edge = BorderEdge { kind, color };
    match side {
        "left" => border.left = Some(edge),
        "right" => border.right = Some(edge),
        "top" => border.top = Some(edge),
        "bottom" => border.bottom = Some(edge),
        _ => border.diagonal = Some(edge),
    }
}

/// Parse a W3CDTF timestamp as written in core.xml.
fn parse_w3cdtf(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%SZ")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.fZ"))
        .ok()
}

/// The target file name must keep a non-empty stem once the extension is
/// stripped; a bare ".xlsx" is rejected.
fn validate_file_name(path: &str) -> Result<()> {
    let name = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .trim();
    let stem = match name.rsplit_once('.') {
        Some((before, _ext)) => before,
        None => name,
    };
    if stem.is_empty() {
        return Err(SheetpackError::InvalidFileName(path.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workbook_new() {
        let wb = Workbook::new();
        assert!(wb.sheets.is_empty());
        assert_eq!(wb.metadata.active_sheet, 0);
    }

    #[test]
    fn test_create_sheet() {
        let mut wb = Workbook::new();
        wb.create_sheet(Some("Data".to_string())).unwrap();
        assert_eq!(wb.sheets.len(), 1);
        assert_eq!(wb.sheets[0].name, "Data");
    }

    #[test]
    fn test_create_sheet_duplicate() {
        let mut wb = Workbook::new();
        wb.create_sheet(Some("Data".to_string())).unwrap();
        assert!(wb.create_sheet(Some("Data".to_string())).is_err());
    }

    #[test]
    fn test_create_sheet_default_name() {
        let mut wb = Workbook::new();
        wb.create_sheet(None).unwrap();
        wb.create_sheet(None).unwrap();
        assert_eq!(wb.sheets[0].name, "Sheet1");
        assert_eq!(wb.sheets[1].name, "Sheet2");
    }

    #[test]
    fn test_remove_sheet() {
        let mut wb = Workbook::new();
        wb.create_sheet(Some("A".to_string())).unwrap();
        wb.create_sheet(Some("B".to_string())).unwrap();
        wb.remove_sheet("A").unwrap();
        assert_eq!(wb.sheets.len(), 1);
        assert_eq!(wb.sheets[0].name, "B");
        assert!(wb.remove_sheet("A").is_err());
    }

    #[test]
    fn test_validate_file_name() {
        assert!(validate_file_name("book.xlsx").is_ok());
        assert!(validate_file_name("/tmp/some/report.xlsm").is_ok());
        assert!(validate_file_name("/tmp/.hidden.xlsx").is_ok());
        assert!(validate_file_name(".xlsx").is_err());
        assert!(validate_file_name("/tmp/.xlsx").is_err());
        assert!(validate_file_name(".").is_err());
    }

    #[test]
    fn test_parse_workbook_xml() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
    <bookViews><workbookView activeTab="1"/></bookViews>
    <sheets>
        <sheet name="Data" sheetId="1" r:id="rId1"/>
        <sheet name="Hidden" sheetId="2" state="hidden" r:id="rId2"/>
    </sheets>
</workbook>"#;
        let (sheets, active) = Workbook::parse_workbook_xml(Cursor::new(xml)).unwrap();
        assert_eq!(active, 1);
        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].name, "Data");
        assert!(sheets[0].visible);
        assert_eq!(sheets[1].name, "Hidden");
        assert!(!sheets[1].visible);
        assert_eq!(sheets[1].rel_id, "rId2");
    }

    #[test]
    fn test_parse_workbook_rels() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
    <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet5.xml"/>
</Relationships>"#;
        let rels = Workbook::parse_workbook_rels(Cursor::new(xml)).unwrap();
        assert_eq!(rels.get("rId1").map(String::as_str), Some("worksheets/sheet1.xml"));
        assert_eq!(rels.get("rId2").map(String::as_str), Some("worksheets/sheet5.xml"));
    }

    #[test]
    fn test_parse_shared_strings() {
        let xml = r#"<?xml version="1.0"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="3" uniqueCount="2">
<si><t>hello</t></si><si><t xml:space="preserve"> padded </t></si>
</sst>"#;
        let strings = Workbook::parse_shared_strings_xml(Cursor::new(xml)).unwrap();
        assert_eq!(strings, vec!["hello".to_string(), " padded ".to_string()]);
    }

    #[test]
    fn test_parse_theme() {
        let xml = r#"<?xml version="1.0"?>
<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="T"><a:themeElements>
<a:clrScheme name="T">
<a:dk1><a:sysClr val="windowText" lastClr="111111"/></a:dk1>
<a:lt1><a:sysClr val="window" lastClr="FEFEFE"/></a:lt1>
<a:dk2><a:srgbClr val="1F497D"/></a:dk2>
<a:lt2><a:srgbClr val="EEECE1"/></a:lt2>
<a:accent1><a:srgbClr val="4F81BD"/></a:accent1>
<a:accent2><a:srgbClr val="C0504D"/></a:accent2>
<a:accent3><a:srgbClr val="9BBB59"/></a:accent3>
<a:accent4><a:srgbClr val="8064A2"/></a:accent4>
<a:accent5><a:srgbClr val="4BACC6"/></a:accent5>
<a:accent6><a:srgbClr val="F79646"/></a:accent6>
<a:hlink><a:srgbClr val="0000FF"/></a:hlink>
<a:folHlink><a:srgbClr val="800080"/></a:folHlink>
</a:clrScheme></a:themeElements></a:theme>"#;
        let palette = Workbook::parse_theme_xml(Cursor::new(xml)).unwrap();
        assert_eq!(palette.0[0], 0xFEFEFE);
        assert_eq!(palette.0[1], 0x111111);
        assert_eq!(palette.0[4], 0x4F81BD);
    }

    #[test]
    fn test_parse_w3cdtf() {
        let dt = parse_w3cdtf("2024-05-01T10:30:00Z").unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-05-01 10:30:00");
        assert!(parse_w3cdtf("not a date").is_none());
    }
}
