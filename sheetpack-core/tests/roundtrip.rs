use chrono::NaiveDate;
use sheetpack_core::{
    deserialize, serialize, Cell, CellValue, Color, Fill, Font, HorizontalAlignment, Style,
    Workbook,
};
use std::io::Read;

fn read_part(bytes: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut out = String::new();
    file.read_to_string(&mut out).unwrap();
    out
}

#[test]
fn test_value_roundtrip() {
    let mut wb = Workbook::new();
    let ws = wb.create_sheet(Some("Values".to_string())).unwrap();
    ws.set_value(0, 0, "hello world");
    ws.set_value(0, 1, 123.45);
    ws.set_value(1, 0, true);
    ws.set_value(1, 1, false);
    ws.set_value(2, 0, "hello world");

    let wb2 = deserialize(&serialize(&wb).unwrap()).unwrap();
    let ws2 = wb2.sheet_by_name("Values").unwrap();

    assert_eq!(
        ws2.cell(0, 0).unwrap().value,
        CellValue::String("hello world".to_string())
    );
    assert_eq!(ws2.cell(0, 1).unwrap().value, CellValue::Number(123.45));
    assert_eq!(ws2.cell(1, 0).unwrap().value, CellValue::Boolean(true));
    assert_eq!(ws2.cell(1, 1).unwrap().value, CellValue::Boolean(false));
    assert_eq!(
        ws2.cell(2, 0).unwrap().value,
        CellValue::String("hello world".to_string())
    );
}

#[test]
fn test_shared_strings_are_deduplicated() {
    let mut wb = Workbook::new();
    let ws = wb.create_sheet(None).unwrap();
    for row in 0..10 {
        ws.set_value(row, 0, "repeated");
    }
    ws.set_value(10, 0, "unique");

    let bytes = wb.save_to_bytes().unwrap();
    let sst = read_part(&bytes, "xl/sharedStrings.xml");
    assert!(sst.contains("count=\"11\""));
    assert!(sst.contains("uniqueCount=\"2\""));
}

#[test]
fn test_date_roundtrip() {
    let mut wb = Workbook::new();
    let ws = wb.create_sheet(Some("Dates".to_string())).unwrap();
    let dt = NaiveDate::from_ymd_opt(2024, 3, 15)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap();
    ws.set_value(0, 0, dt);
    ws.set_style(0, 0, Style::new().with_format("yyyy-MM-dd HH:mm"));

    let wb2 = deserialize(&serialize(&wb).unwrap()).unwrap();
    let cell = wb2.sheets[0].cell(0, 0).unwrap();
    assert_eq!(cell.value, CellValue::DateTime(dt));
    assert_eq!(
        cell.style.as_ref().unwrap().format.as_deref(),
        Some("yyyy-MM-dd HH:mm")
    );
}

#[test]
fn test_formula_roundtrip() {
    let mut wb = Workbook::new();
    let ws = wb.create_sheet(None).unwrap();
    ws.set_value(0, 0, 1.0);
    ws.set_value(0, 1, 2.0);
    ws.set_formula(1, 0, "A1+B1");

    let wb2 = deserialize(&serialize(&wb).unwrap()).unwrap();
    let cell = wb2.sheets[0].cell(1, 0).unwrap();
    assert_eq!(cell.formula.as_deref(), Some("A1+B1"));
}

#[test]
fn test_merge_roundtrip() {
    let mut wb = Workbook::new();
    let ws = wb.create_sheet(None).unwrap();
    ws.set_value(0, 0, "title");
    ws.merge(0, 0, 2, 1);

    let bytes = wb.save_to_bytes().unwrap();
    let sheet_xml = read_part(&bytes, "xl/worksheets/sheet1.xml");
    assert!(sheet_xml.contains("<mergeCell ref=\"A1:B1\"/>"));

    let wb2 = Workbook::load_from_bytes(&bytes).unwrap();
    let cell = wb2.sheets[0].cell(0, 0).unwrap();
    assert_eq!(cell.col_span, Some(2));
    assert_eq!(cell.row_span, Some(1));
}

#[test]
fn test_style_roundtrip() {
    let mut wb = Workbook::new();
    let ws = wb.create_sheet(None).unwrap();
    ws.set_value(0, 0, "styled");
    ws.set_style(
        0,
        0,
        Style::new()
            .with_format("n2")
            .with_font(Font::new().with_name("Arial").with_size(12.0).with_bold(true))
            .with_fill(Fill::solid(Color::rgb("FFCC00")))
            .with_h_align(HorizontalAlignment::Center)
            .with_word_wrap(true),
    );

    let wb2 = deserialize(&serialize(&wb).unwrap()).unwrap();
    let style = wb2.sheets[0].cell(0, 0).unwrap().style.clone().unwrap();

    assert_eq!(style.format.as_deref(), Some("n2"));
    assert_eq!(style.h_align, Some(HorizontalAlignment::Center));
    assert_eq!(style.word_wrap, Some(true));
    let font = style.font.unwrap();
    assert_eq!(font.name.as_deref(), Some("Arial"));
    assert_eq!(font.size, Some(12.0));
    assert_eq!(font.bold, Some(true));
    let fill = style.fill.unwrap();
    assert_eq!(fill.pattern.as_deref(), Some("solid"));
    assert_eq!(fill.fg_color, Some(Color::rgb("FFFFCC00")));
}

#[test]
fn test_style_interning_collapses_duplicates() {
    let mut wb = Workbook::new();
    let ws = wb.create_sheet(None).unwrap();
    let bold = Style::new().with_font(Font::new().with_bold(true));
    let pct = Style::new().with_format("p1");
    for row in 0..50 {
        ws.set_value(row, 0, row as f64);
        ws.set_style(row, 0, if row % 2 == 0 { bold.clone() } else { pct.clone() });
    }

    let bytes = wb.save_to_bytes().unwrap();
    let styles_xml = read_part(&bytes, "xl/styles.xml");
    // Two distinct effective styles plus the required default xf.
    assert!(styles_xml.contains("<cellXfs count=\"3\">"));
}

#[test]
fn test_cascade_applies_row_and_sheet_styles() {
    let mut wb = Workbook::new();
    let ws = wb.create_sheet(None).unwrap();
    ws.style = Some(Style::new().with_font(Font::new().with_name("Courier")));
    ws.set_value(0, 0, 1.0);
    ws.rows.get_mut(&0).unwrap().style = Some(Style::new().with_format("f2"));

    let wb2 = deserialize(&serialize(&wb).unwrap()).unwrap();
    let style = wb2.sheets[0].cell(0, 0).unwrap().style.clone().unwrap();
    // The effective cell style merged the row format and the sheet font.
    assert_eq!(style.format.as_deref(), Some("f2"));
    assert_eq!(style.font.unwrap().name.as_deref(), Some("Courier"));
}

#[test]
fn test_inherited_style_flattens_on_export() {
    let mut wb = Workbook::new();
    let ws = wb.create_sheet(None).unwrap();
    let base = Style::new()
        .with_font(Font::new().with_name("Arial"))
        .with_format("n0");
    ws.set_value(0, 0, 10.0);
    ws.set_style(0, 0, Style::new().with_format("n2").with_based_on(base));

    let wb2 = deserialize(&serialize(&wb).unwrap()).unwrap();
    let style = wb2.sheets[0].cell(0, 0).unwrap().style.clone().unwrap();
    // Child format wins, parent font survives, no parent chain remains.
    assert_eq!(style.format.as_deref(), Some("n2"));
    assert_eq!(style.font.unwrap().name.as_deref(), Some("Arial"));
    assert!(style.based_on.is_none());
}

#[test]
fn test_frozen_pane_roundtrip() {
    let mut wb = Workbook::new();
    let ws = wb.create_sheet(None).unwrap();
    ws.set_value(0, 0, "header");
    ws.freeze(1, 0);

    let bytes = wb.save_to_bytes().unwrap();
    let sheet_xml = read_part(&bytes, "xl/worksheets/sheet1.xml");
    assert!(sheet_xml.contains("ySplit=\"1\""));
    assert!(sheet_xml.contains("topLeftCell=\"A2\""));
    assert!(sheet_xml.contains("activePane=\"bottomLeft\""));

    let wb2 = Workbook::load_from_bytes(&bytes).unwrap();
    let pane = wb2.sheets[0].frozen.unwrap();
    assert_eq!((pane.rows, pane.columns), (1, 0));
}

#[test]
fn test_row_and_column_settings_roundtrip() {
    use sheetpack_core::ColumnWidth;

    let mut wb = Workbook::new();
    let ws = wb.create_sheet(None).unwrap();
    ws.set_value(2, 1, "x");
    ws.set_row_height(2, 30.0);
    ws.set_column_width(1, ColumnWidth::Chars(10.0));
    {
        let row = ws.rows.get_mut(&2).unwrap();
        row.group_level = Some(1);
        row.collapsed = true;
        row.visible = false;
    }

    let wb2 = deserialize(&serialize(&wb).unwrap()).unwrap();
    let ws2 = &wb2.sheets[0];
    let row = ws2.rows.get(&2).unwrap();
    assert_eq!(row.height, Some(30.0));
    assert_eq!(row.group_level, Some(1));
    assert!(row.collapsed);
    assert!(!row.visible);

    // Widths come back in pixels after the documented unit conversions.
    let col = ws2.columns.get(&1).unwrap();
    assert_eq!(col.width, Some(ColumnWidth::Pixels(75.0)));
}

#[test]
fn test_sheet_visibility_and_outline_direction() {
    let mut wb = Workbook::new();
    wb.create_sheet(Some("Shown".to_string())).unwrap();
    {
        let hidden = wb.create_sheet(Some("Hidden".to_string())).unwrap();
        hidden.visible = false;
        hidden.summary_below = false;
        hidden.set_value(0, 0, 1.0);
    }

    let wb2 = deserialize(&serialize(&wb).unwrap()).unwrap();
    assert!(wb2.sheets[0].visible);
    assert!(!wb2.sheets[1].visible);
    assert!(!wb2.sheets[1].summary_below);
    assert!(wb2.sheets[0].summary_below);
}

#[test]
fn test_metadata_roundtrip() {
    let mut wb = Workbook::new();
    wb.create_sheet(None).unwrap();
    wb.create_sheet(None).unwrap();
    wb.metadata.creator = Some("Test Author".to_string());
    wb.metadata.application = Some("sheetpack tests".to_string());
    wb.metadata.company = Some("ACME".to_string());
    wb.metadata.created = NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(3, 4, 5);
    wb.metadata.active_sheet = 1;

    let wb2 = deserialize(&serialize(&wb).unwrap()).unwrap();
    assert_eq!(wb2.metadata.creator.as_deref(), Some("Test Author"));
    assert_eq!(wb2.metadata.application.as_deref(), Some("sheetpack tests"));
    assert_eq!(wb2.metadata.company.as_deref(), Some("ACME"));
    assert_eq!(wb2.metadata.created, wb.metadata.created);
    assert_eq!(wb2.metadata.active_sheet, 1);
}

#[test]
fn test_macro_passthrough_switches_content_type() {
    let mut wb = Workbook::new();
    wb.create_sheet(None).unwrap();
    wb.reserved.macros = Some(vec![0xD0, 0xCF, 0x11, 0xE0, 0x01, 0x02]);

    let bytes = wb.save_to_bytes().unwrap();
    let content_types = read_part(&bytes, "[Content_Types].xml");
    assert!(content_types.contains("macroEnabled"));
    assert!(content_types.contains("vbaProject"));

    let wb2 = Workbook::load_from_bytes(&bytes).unwrap();
    assert_eq!(
        wb2.reserved.macros.as_deref(),
        Some(&[0xD0, 0xCF, 0x11, 0xE0, 0x01, 0x02][..])
    );
}

#[test]
fn test_plain_workbook_has_plain_content_type() {
    let mut wb = Workbook::new();
    wb.create_sheet(None).unwrap();
    let content_types = read_part(&wb.save_to_bytes().unwrap(), "[Content_Types].xml");
    assert!(!content_types.contains("macroEnabled"));
    assert!(content_types.contains("spreadsheetml.sheet.main+xml"));
}

#[test]
fn test_shared_formula_expansion_on_import() {
    // Hand-built package: cell B2 carries the base formula for shared group
    // 0 over B2:B3, B3 references the group without inline text.
    let workbook_xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Calc" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#;
    let sheet_xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<dimension ref="A1:B3"/>
<sheetData>
<row r="2"><c r="B2"><f t="shared" ref="B2:B3" si="0">A1+B1</f><v>3</v></c></row>
<row r="3"><c r="B3"><f t="shared" si="0"/><v>5</v></c><c r="C3"><f t="shared" si="7"/></c></row>
</sheetData>
</worksheet>"#;

    let mut buffer = std::io::Cursor::new(Vec::new());
    {
        use std::io::Write;
        let mut zip = zip::ZipWriter::new(&mut buffer);
        let options: zip::write::FileOptions<'_, zip::write::ExtendedFileOptions> =
            zip::write::FileOptions::default();
        zip.start_file("xl/workbook.xml", options.clone()).unwrap();
        zip.write_all(workbook_xml.as_bytes()).unwrap();
        zip.start_file("xl/worksheets/sheet1.xml", options).unwrap();
        zip.write_all(sheet_xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }

    let wb = Workbook::load_from_bytes(buffer.get_ref()).unwrap();
    let ws = wb.sheet_by_name("Calc").unwrap();
    assert_eq!(ws.cell(1, 1).unwrap().formula.as_deref(), Some("A1+B1"));
    assert_eq!(ws.cell(2, 1).unwrap().formula.as_deref(), Some("A2+B2"));
    // A reference to a group with no template degrades to an empty formula.
    assert_eq!(ws.cell(2, 2).unwrap().formula.as_deref(), Some(""));
}

#[test]
fn test_save_and_load_file() {
    let mut wb = Workbook::new();
    let ws = wb.create_sheet(Some("Disk".to_string())).unwrap();
    ws.set_value(0, 0, "persisted");

    let temp_file = tempfile::Builder::new()
        .prefix("sheetpack")
        .suffix(".xlsx")
        .tempfile()
        .unwrap();
    let temp_path = temp_file.path().to_str().unwrap();
    wb.save(temp_path).unwrap();

    let loaded = Workbook::load(temp_path).unwrap();
    assert_eq!(
        loaded.sheet_by_name("Disk").unwrap().cell(0, 0).unwrap().value,
        CellValue::String("persisted".to_string())
    );
}

#[test]
fn test_save_rejects_bare_extension_name() {
    let mut wb = Workbook::new();
    wb.create_sheet(None).unwrap();
    assert!(wb.save("/tmp/.xlsx").is_err());
}

#[test]
fn test_data_uri_import() {
    let mut wb = Workbook::new();
    let ws = wb.create_sheet(None).unwrap();
    ws.set_value(0, 0, 7.0);

    let payload = serialize(&wb).unwrap();
    let uri = format!(
        "data:application/vnd.openxmlformats-officedocument.spreadsheetml.sheet;base64,{}",
        payload
    );
    let wb2 = deserialize(&uri).unwrap();
    assert_eq!(wb2.sheets[0].cell(0, 0).unwrap().value, CellValue::Number(7.0));
}

#[test]
fn test_json_intermediate_roundtrip() {
    let mut wb = Workbook::new();
    let ws = wb.create_sheet(Some("Data".to_string())).unwrap();
    ws.set_value(0, 0, "x");
    ws.set_value(1, 1, 2.5);
    ws.set_style(0, 0, Style::new().with_format("n2"));
    ws.merge(0, 0, 2, 1);
    wb.metadata.creator = Some("json".to_string());

    let json = serde_json::to_string(&wb).unwrap();
    let back: Workbook = serde_json::from_str(&json).unwrap();

    assert_eq!(back.sheets[0].name, "Data");
    assert_eq!(
        back.sheets[0].cell(0, 0).unwrap().value,
        CellValue::String("x".to_string())
    );
    assert_eq!(back.sheets[0].cell(1, 1).unwrap().value, CellValue::Number(2.5));
    assert_eq!(
        back.sheets[0]
            .cell(0, 0)
            .unwrap()
            .style
            .as_ref()
            .unwrap()
            .format
            .as_deref(),
        Some("n2")
    );
    assert_eq!(back.sheets[0].cell(0, 0).unwrap().col_span, Some(2));
    assert_eq!(back.metadata.creator.as_deref(), Some("json"));
}

#[test]
fn test_empty_cells_are_not_materialized() {
    let mut wb = Workbook::new();
    let ws = wb.create_sheet(None).unwrap();
    ws.set_value(0, 0, "only cell");
    // A styled-but-empty merge anchor must survive.
    *ws.cell_mut(4, 4) = Cell::new(CellValue::Empty).with_span(2, 2);

    let wb2 = deserialize(&serialize(&wb).unwrap()).unwrap();
    let ws2 = &wb2.sheets[0];
    assert!(ws2.cell(1, 1).is_none());
    let anchor = ws2.cell(4, 4).unwrap();
    assert_eq!(anchor.span(), (2, 2));
}
