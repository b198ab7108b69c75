// Builds small .xlsx packages in memory for the integration tests.
#![allow(dead_code)]

use std::io::Cursor;
use std::io::Write;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

#[derive(Clone, Debug)]
pub enum Value {
    Text(&'static str),
    Number(f64),
    /// Number cell with the built-in date format applied
    Date(f64),
    /// Formula error such as `#DIV/0!`
    Error(&'static str),
}

pub use Value::*;

pub struct Sheet {
    pub name: &'static str,
    pub rows: Vec<Vec<Option<Value>>>,
}

pub fn sheet(name: &'static str, rows: Vec<Vec<Option<Value>>>) -> Sheet {
    Sheet { name, rows }
}

fn column_name(col: usize) -> String {
    let mut name = String::new();
    let mut index = col + 1;
    while index > 0 {
        let remainder = (index - 1) % 26;
        name.insert(0, (b'A' + remainder as u8) as char);
        index = (index - 1) / 26;
    }
    name
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Writes `sheets` as an .xlsx package. Text goes to the shared string table;
/// `active_tab` selects the sheet that was active on save.
pub fn workbook(sheets: &[Sheet], active_tab: usize) -> Vec<u8> {
    let mut shared_strings: Vec<&str> = Vec::new();
    let mut worksheets = Vec::new();
    for sheet in sheets {
        let mut xml = String::new();
        for (row, values) in sheet.rows.iter().enumerate() {
            if values.iter().all(Option::is_none) {
                continue;
            }
            xml.push_str(&format!(r#"<row r="{}">"#, row + 1));
            for (col, value) in values.iter().enumerate() {
                let reference = format!("{}{}", column_name(col), row + 1);
                match value {
                    None => (),
                    Some(Text(text)) => {
                        let index = match shared_strings.iter().position(|s| s == text) {
                            Some(index) => index,
                            None => {
                                shared_strings.push(*text);
                                shared_strings.len() - 1
                            }
                        };
                        xml.push_str(&format!(r#"<c r="{}" t="s"><v>{}</v></c>"#, reference, index));
                    }
                    Some(Number(number)) => xml.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, reference, number)),
                    Some(Date(serial)) => {
                        xml.push_str(&format!(r#"<c r="{}" s="1"><v>{}</v></c>"#, reference, serial))
                    }
                    Some(Error(code)) => xml.push_str(&format!(r#"<c r="{}" t="e"><v>{}</v></c>"#, reference, code)),
                }
            }
            xml.push_str("</row>");
        }
        worksheets.push(xml);
    }
    let names: Vec<&str> = sheets.iter().map(|sheet| sheet.name).collect();
    package(&names, &worksheets, &shared_strings, active_tab)
}

/// Writes a one-sheet package whose `<sheetData>` holds `sheet_data` verbatim.
pub fn raw_workbook(sheet_data: &str) -> Vec<u8> {
    package(&["Sheet1"], &[sheet_data.to_owned()], &[], 0)
}

fn package(names: &[&str], worksheets: &[String], shared_strings: &[&str], active_tab: usize) -> Vec<u8> {
    let mut content_types = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
    );
    let mut workbook = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><bookViews><workbookView activeTab="{}"/></bookViews><sheets>"#,
        active_tab
    );
    let mut relationships = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for (index, name) in names.iter().enumerate() {
        let id = index + 1;
        content_types.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
            id
        ));
        workbook.push_str(&format!(r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#, escape(name), id, id));
        relationships.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
            id, id
        ));
    }
    content_types.push_str("</Types>");
    workbook.push_str("</sheets></workbook>");
    relationships.push_str(
        r#"<Relationship Id="rIdStyles" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/><Relationship Id="rIdStrings" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/></Relationships>"#,
    );

    let styles = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="14" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/></cellXfs></styleSheet>"#;

    let mut strings = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{0}" uniqueCount="{0}">"#,
        shared_strings.len()
    );
    for text in shared_strings {
        strings.push_str(&format!(r#"<si><t xml:space="preserve">{}</t></si>"#, escape(text)));
    }
    strings.push_str("</sst>");

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let mut part = |name: &str, content: &str| {
        writer.start_file(name, SimpleFileOptions::default()).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    };
    part("[Content_Types].xml", &content_types);
    part("xl/workbook.xml", &workbook);
    part("xl/_rels/workbook.xml.rels", &relationships);
    part("xl/styles.xml", styles);
    part("xl/sharedStrings.xml", &strings);
    for (index, sheet_data) in worksheets.iter().enumerate() {
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{}</sheetData></worksheet>"#,
            sheet_data
        );
        part(&format!("xl/worksheets/sheet{}.xml", index + 1), &xml);
    }
    writer.finish().unwrap().into_inner()
}

/// Product/Price/Quantity with four priced items.
pub fn simple_sheet() -> Sheet {
    let item = |name, price, quantity| vec![Some(Text(name)), Some(Number(price)), Some(Number(quantity))];
    sheet(
        "Sheet1",
        vec![
            vec![Some(Text("Product")), Some(Text("Price")), Some(Text("Quantity"))],
            item("Laptop", 100.5, 10.0),
            item("Mouse", 200.0, 5.0),
            item("Keyboard", 150.75, 8.0),
            item("Monitor", 75.25, 15.0),
        ],
    )
}

/// Price list whose header sits on row 3, under a title and a blank row.
pub fn price_list_sheet() -> Sheet {
    let item = |id, name, usd, cad, new| {
        vec![
            Some(Text(id)),
            Some(Text(name)),
            Some(Number(usd)),
            Some(Number(cad)),
            Some(Number(new)),
        ]
    };
    sheet(
        "Price List",
        vec![
            vec![Some(Text("*** PRICE LIST 2024 ***"))],
            vec![],
            vec![
                Some(Text("ID")),
                Some(Text("Description")),
                Some(Text(" CURRENT USD")),
                Some(Text(" CURRENT CAD")),
                Some(Text("THIS IS THE NEW PRICE IN USD")),
            ],
            vec![Some(Text("ELECTRONICS SECTION"))],
            item("E001", "Laptop", 1200.0, 1440.0, 1250.0),
            item("E002", "Mouse", 25.5, 30.6, 27.0),
            item("E003", "Keyboard", 85.75, 102.9, 89.0),
            item("E004", "Monitor", 350.0, 420.0, 365.0),
        ],
    )
}
