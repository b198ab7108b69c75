use crate::error::SheetSummaryError;
use crate::helpers::xml::XmlAttributeHelper;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::excel;
use crate::spreadsheet::excel::load_relationships;
use crate::spreadsheet::grid::Grid;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::NaiveTime;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::collections::HashMap;
use std::io::BufRead;
use std::io::Cursor;
use zip::ZipArchive;

// Element names of the workbook, styles, shared strings and worksheet parts
const TAG_CUSTOM_FORMATS: QName = QName(b"numFmts"); // Custom number formats of styles.xml
const TAG_CUSTOM_FORMAT: QName = QName(b"numFmt"); // One custom format: id and format code
const TAG_FORMAT_INDEXES: QName = QName(b"cellXfs"); // Cell styles, indexed by a cell's `s`
const TAG_FORMAT_INDEX: QName = QName(b"xf"); // One cell style and its number format id
const TAG_SHARED_STRING_ITEM: QName = QName(b"si"); // Entry of the shared string table
const TAG_PHONETIC_TEXT: QName = QName(b"rPh"); // Phonetic run, not part of the value
const TAG_TEXT: QName = QName(b"t"); // Text of a string or rich text run
const TAG_WORKBOOK_PROPERTIES: QName = QName(b"workbookPr"); // Carries the date1904 flag
const TAG_WORKBOOK_VIEW: QName = QName(b"workbookView"); // Carries the active tab
const TAG_SHEET: QName = QName(b"sheet"); // Sheet name and relationship id
const TAG_ROW: QName = QName(b"row"); // Worksheet row
const TAG_CELL: QName = QName(b"c"); // Worksheet cell
const TAG_INLINE_STRING: QName = QName(b"is"); // Inline string of an `inlineStr` cell
const TAG_VALUE: QName = QName(b"v"); // Raw cell value

/// Sheet entries of `xl/workbook.xml`, in workbook order.
struct Workbook {
    /// Sheet name and worksheet part; the part is `None` for non-worksheet sheets
    sheets: Vec<(String, Option<String>)>,
    /// Serials count from 1904-01-01 instead of 1899-12-30
    is_1904: bool,
    /// Index into `sheets` of the sheet active on save
    active_tab: usize,
}

/// An Excel 2007+ workbook read from memory.
pub(crate) struct XlsxSpreadsheet {
    /// File name the workbook was uploaded as
    name: String,
    /// The OOXML package
    zip: ZipArchive<Cursor<Vec<u8>>>,
    /// Sheet list and workbook properties
    workbook: Workbook,
    /// Cell type of each style index
    number_formats: Vec<CellType>,
    /// Shared string table, loaded by the first sheet read
    shared_strings: Option<Vec<String>>,
}

impl XlsxSpreadsheet {
    pub(crate) fn open(file_name: &str, reader: Cursor<Vec<u8>>) -> Result<XlsxSpreadsheet, SheetSummaryError> {
        let mut zip = ZipArchive::new(reader)?;
        let workbook = load_workbook(&mut zip)?;
        if workbook.sheets.iter().all(|(_, path)| path.is_none()) {
            Err(SpreadsheetError::SpreadsheetEmptyError(file_name.to_owned()))?
        }
        let number_formats = load_number_formats(&mut zip, workbook.is_1904)?;
        Ok(XlsxSpreadsheet {
            name: file_name.to_owned(),
            zip,
            workbook,
            number_formats,
            shared_strings: None,
        })
    }

    /// Reads the shared string table on first use.
    fn load_shared_strings(&mut self) -> Result<(), SheetSummaryError> {
        if self.shared_strings.is_none() {
            let mut shared_strings = Vec::new();
            if let Some(mut reader) = self.zip.xml_reader("xl/sharedStrings.xml")? {
                match_xml_events!(reader => {
                    Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
                        shared_strings.push(read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?);
                    }
                });
            }
            log::trace!("Loaded {} shared strings", shared_strings.len());
            self.shared_strings = Some(shared_strings);
        }
        Ok(())
    }
}

impl Spreadsheet for XlsxSpreadsheet {
    fn name(&self) -> &str {
        &self.name
    }

    fn sheet_names(&self) -> Vec<String> {
        self.workbook
            .sheets
            .iter()
            .filter(|(_, path)| path.is_some())
            .map(|(name, _)| name.to_owned())
            .collect()
    }

    fn active_sheet(&self) -> Option<String> {
        match self.workbook.sheets.get(self.workbook.active_tab) {
            Some((name, Some(_))) => Some(name.to_owned()),
            _ => None,
        }
    }

    fn read_grid(&mut self, sheet_name: &str, criteria: &Criteria) -> Result<Grid, SheetSummaryError> {
        let zip_path = self
            .workbook
            .sheets
            .iter()
            .find(|(name, _)| name == sheet_name)
            .and_then(|(_, path)| path.to_owned())
            .ok_or_else(|| SpreadsheetError::SheetNotFoundError(sheet_name.to_owned()))?;
        self.load_shared_strings()?;
        let shared_strings = self.shared_strings.as_deref().unwrap_or_default();
        let number_formats = &self.number_formats;

        let mut grid = Grid::new(sheet_name);
        let mut row_count = 0usize;
        let mut col_count = 0usize;
        let mut row = 0usize;
        let mut col = 0usize;
        let mut kind = CellType::default();
        let mut value = String::new();
        let mut reader = self
            .zip
            .xml_reader(&zip_path)?
            .ok_or_else(|| SpreadsheetError::FileError(zip_path.to_owned()))?;
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TAG_ROW => {
                if let Some(number) = event.parse_attribute_value::<usize>("r")? {
                    row_count = number.saturating_sub(1);
                }
                col_count = 0;
            }
            Event::End(event) if event.name() == TAG_ROW => row_count += 1,
            Event::Start(event) if event.name() == TAG_CELL => {
                (row, col) = match event.get_attribute_value("r")? {
                    Some(reference) => match reference_to_index(&reference) {
                        Some((Some(row), col)) => (row, col),
                        Some((None, col)) => (row_count, col),
                        None => Err(SpreadsheetError::CellReferenceError(reference.to_string()))?,
                    },
                    None => (row_count, col_count),
                };
                col_count = col + 1;
                kind = match event.get_attribute_value("t")?.as_deref() {
                    Some("s") => CellType::SharedString,
                    Some("inlineStr") | Some("str") => CellType::InlineString,
                    Some("b") => CellType::Boolean,
                    Some("e") => CellType::Error,
                    Some("d") => CellType::IsoDateTime,
                    _ => match event.parse_attribute_value::<usize>("s")? {
                        Some(index) => number_formats.get(index).copied().unwrap_or_default(),
                        None => CellType::Number,
                    },
                };
                value.clear();
            }
            Event::Start(event) if event.name() == TAG_INLINE_STRING => {
                value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
            }
            Event::Start(event) if event.name() == TAG_VALUE => {
                value = read_string_value(&mut reader, TAG_VALUE, true)?;
            }
            Event::End(event) if event.name() == TAG_CELL => {
                let cell_value = decode_value(&value, kind, shared_strings, criteria)?;
                let cell = Cell { row, col, value: cell_value };
                log::trace!("{}!{} = {:?}", sheet_name, cell.reference(), cell.value);
                grid.push(cell)?;
                value.clear();
            }
        });

        log::debug!(
            "Read sheet '{}': {} rows, {} columns",
            sheet_name,
            grid.max_row(),
            grid.max_column()
        );
        Ok(grid)
    }
}

/// Converts the raw text of one `<c>` element according to its type.
fn decode_value(
    value: &str,
    kind: CellType,
    shared_strings: &[String],
    criteria: &Criteria,
) -> Result<CellValue, SheetSummaryError> {
    if value.is_empty() {
        return Ok(CellValue::Empty);
    }
    Ok(match kind {
        CellType::SharedString => {
            let index = value.trim().parse::<usize>()?;
            shared_strings.get(index).cloned().map(CellValue::Text).unwrap_or_default()
        }
        CellType::InlineString => CellValue::Text(value.to_owned()),
        CellType::IsoDateTime => parse_iso_datetime(value),
        CellType::Boolean => CellValue::Number(if value == "1" || value == "true" { 1.0 } else { 0.0 }),
        CellType::Error if criteria.error_as_empty => CellValue::Empty,
        CellType::Error => CellValue::Text(value.to_owned()),
        CellType::Number | CellType::DateTime1900 | CellType::DateTime1904 => {
            CellValue::from_serial(value.trim().parse::<f64>()?, kind)
        }
    })
}

/// Values of `t="d"` cells: ISO 8601 date, date-time or time.
fn parse_iso_datetime(value: &str) -> CellValue {
    let value = value.trim();
    if value.is_empty() {
        CellValue::Empty
    } else if let Ok(datetime) = NaiveDateTime::parse_from_str(value.trim_end_matches('Z'), "%Y-%m-%dT%H:%M:%S%.f") {
        CellValue::DateTime(datetime)
    } else if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        CellValue::DateTime(date.and_time(NaiveTime::MIN))
    } else if let Ok(time) = NaiveTime::parse_from_str(value, "%H:%M:%S%.f") {
        CellValue::Time(time)
    } else {
        CellValue::Text(value.to_owned())
    }
}

fn load_workbook(zip: &mut ZipArchive<Cursor<Vec<u8>>>) -> Result<Workbook, SheetSummaryError> {
    let relationships = load_relationships(zip, "xl/_rels/workbook.xml.rels")?;
    let mut reader = zip
        .xml_reader("xl/workbook.xml")?
        .ok_or_else(|| SpreadsheetError::FileError("xl/workbook.xml".to_owned()))?;
    let mut workbook = Workbook {
        sheets: Vec::new(),
        is_1904: false,
        active_tab: 0,
    };
    let mut has_view = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let mut name = None;
            let mut id = None;
            for result in event.attributes() {
                let attribute = result?;
                // `r:id` is namespaced; match on the local part only
                match attribute.key.local_name().as_ref() {
                    b"name" => name = Some(attribute.get_value()?.to_string()),
                    b"id" => id = Some(attribute.get_value()?.to_string()),
                    _ => (),
                }
            }
            if let Some(name) = name {
                let path = id.and_then(|id| relationships.get(&id).cloned());
                workbook.sheets.push((name, path));
            }
        }
        Event::Start(event) if event.name() == TAG_WORKBOOK_PROPERTIES => {
            workbook.is_1904 = event
                .get_attribute_value("date1904")?
                .map(|value| value == "1" || value == "true")
                .unwrap_or(false);
        }
        Event::Start(event) if !has_view && event.name() == TAG_WORKBOOK_VIEW => {
            has_view = true;
            workbook.active_tab = event.parse_attribute_value::<usize>("activeTab")?.unwrap_or(0);
        }
    });
    Ok(workbook)
}

/// Cell types indexed by style id, from `cellXfs` and the custom `numFmts` of `xl/styles.xml`.
fn load_number_formats(zip: &mut ZipArchive<Cursor<Vec<u8>>>, is_1904: bool) -> Result<Vec<CellType>, SheetSummaryError> {
    let Some(mut reader) = zip.xml_reader("xl/styles.xml")? else {
        return Ok(Vec::new());
    };

    let mut custom_formats_context = false;
    let mut custom_formats = HashMap::<String, CellType>::new();
    let mut format_indexes_context = false;
    let mut format_indexes = Vec::<String>::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = true,
        Event::End(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = false,
        Event::Start(event) if custom_formats_context && event.name() == TAG_CUSTOM_FORMAT => {
            let id = event.get_attribute_value("numFmtId")?;
            let format = event.get_attribute_value("formatCode")?;
            if let Some((id, format)) = id.zip(format) {
                custom_formats.insert(id.to_string(), CellType::parse_custom_number_format(&format, is_1904));
            }
        }
        Event::Start(event) if event.name() == TAG_FORMAT_INDEXES => format_indexes_context = true,
        Event::End(event) if event.name() == TAG_FORMAT_INDEXES => break,
        Event::Start(event) if format_indexes_context && event.name() == TAG_FORMAT_INDEX => {
            let id = event.get_attribute_value("numFmtId")?;
            format_indexes.push(id.map(|id| id.to_string()).unwrap_or_else(|| "0".to_owned()));
        }
    });

    Ok(excel::load_number_formats(format_indexes, custom_formats, is_1904))
}

/// Collects the text of the element just opened, up to its `end_tag`. Phonetic runs are
/// skipped. With `is_text_content` the element's own text counts, otherwise only `<t>`
/// children do.
fn read_string_value<R: BufRead>(
    reader: &mut XmlReader<R>,
    end_tag: QName,
    is_text_content: bool,
) -> Result<String, SheetSummaryError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.name() == end_tag => break,
        Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.name() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.name() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => text.push_str(&event.xml_content()?),
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}
