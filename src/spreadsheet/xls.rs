use crate::error::ResultOptionChain;
use crate::error::SheetSummaryError;
use crate::helpers::biff8::Biff8Reader;
use crate::helpers::cfb::Cfb;
use crate::match_biff8_record;
use crate::spreadsheet::cell::to_error_value;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::excel::load_number_formats;
use crate::spreadsheet::grid::Grid;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use either::Either;
use std::collections::HashMap;
use thiserror::Error;

// BIFF8 record types
const FORMULA: u16 = 0x0006;
const EOF: u16 = 0x000A;
const DATE1904: u16 = 0x0022;
const FILE_PASS: u16 = 0x002F;
const WINDOW1: u16 = 0x003D;
const CODE_PAGE: u16 = 0x0042;
const BOUND_SHEET8: u16 = 0x0085;
const MUL_RK: u16 = 0x00BD;
const XF: u16 = 0x00E0;
const SST: u16 = 0x00FC;
const LABEL_SST: u16 = 0x00FD;
const NUMBER: u16 = 0x0203;
const LABEL: u16 = 0x0204;
const BOOL_ERR: u16 = 0x0205;
const STRING: u16 = 0x0207;
const RK: u16 = 0x027E;
const FORMAT: u16 = 0x041E;
const BOF: u16 = 0x0809;

/// Code page 1200 marks UTF-16 text; compressed strings then hold Latin-1 code units.
const UTF16_CODE_PAGE: u16 = 1200;

#[derive(Error, Debug)]
pub enum XlsError {
    #[error("Invalid code page '{0}'")]
    CodePageError(u16),

    #[error("Invalid formula value '{0:#018x}'")]
    FormulaValueError(u64),

    #[error("Worksheet '{0}' has no beginning-of-file record")]
    SubstreamError(String),
}

/// A cell's type, either fixed by its record or taken from its XF record.
type CellKind = Either<CellType, usize>;

/// An Excel 97-2003 workbook read from the stream of a compound file.
pub(crate) struct XlsSpreadsheet {
    /// File name the workbook was uploaded as
    name: String,
    /// Reader over the whole workbook stream, globals and sheet substreams
    reader: Biff8Reader,
    /// Shared string table of the SST record
    shared_strings: Vec<String>,
    /// Cell type of each XF index
    number_formats: Vec<CellType>,
    /// Sheet name and substream offset; the offset is `None` for charts and macro sheets
    sheets: Vec<(String, Option<usize>)>,
    active_tab: usize,
}

impl XlsSpreadsheet {
    /// Reads the workbook globals substream of a compound file.
    pub(crate) fn open(file_name: &str, cfb: &Cfb) -> Result<XlsSpreadsheet, SheetSummaryError> {
        let mut reader = cfb
            .read("Workbook")
            .ok_none_else(|| cfb.read("Book"))?
            .map(Biff8Reader::new)
            .ok_or_else(|| SpreadsheetError::FileFormatError(file_name.to_owned()))?;
        let mut is_1904 = false;
        let mut active_tab = 0usize;
        let mut shared_strings = Vec::new();
        let mut custom_formats: HashMap<String, CellType> = HashMap::new();
        let mut format_indexes: Vec<String> = Vec::new();
        let mut sheets: Vec<(String, Option<usize>)> = Vec::new();
        match_biff8_record!(reader => {
            EOF => break,
            FILE_PASS => Err(SpreadsheetError::PasswordProtectedError(file_name.to_owned()))?,
            DATE1904 => is_1904 = reader.read_u16()? == 1,
            WINDOW1 => {
                reader.skip(10)?;
                active_tab = reader.read_u16()? as usize;
            }
            CODE_PAGE => {
                let code_page = reader.read_u16()?;
                if code_page != UTF16_CODE_PAGE {
                    reader.encoding = codepage::to_encoding(code_page).ok_or(XlsError::CodePageError(code_page))?;
                }
            }
            FORMAT => {
                let id = reader.read_u16()?;
                let format = reader.read_xl_unicode_string()?;
                custom_formats.insert(id.to_string(), CellType::parse_custom_number_format(&format, is_1904));
            }
            XF => {
                reader.skip(2)?;
                format_indexes.push(reader.read_u16()?.to_string());
            }
            SST => shared_strings = load_shared_strings(&mut reader)?,
            BOUND_SHEET8 => {
                let pointer = reader.read_usize()?;
                reader.skip(1)?;
                let sheet_type = reader.read_u8()?;
                let sheet_name = reader.read_short_xl_unicode_string()?;
                sheets.push((sheet_name, Some(pointer).filter(|_| sheet_type == 0)));
            }
        });
        if sheets.iter().all(|(_, pointer)| pointer.is_none()) {
            Err(SpreadsheetError::SpreadsheetEmptyError(file_name.to_owned()))?
        }

        // FORMAT records may precede DATE1904, so custom formats are re-typed here
        if is_1904 {
            for kind in custom_formats.values_mut() {
                if *kind == CellType::DateTime1900 {
                    *kind = CellType::DateTime1904;
                }
            }
        }
        let number_formats = load_number_formats(format_indexes, custom_formats, is_1904);
        log::trace!(
            "Workbook globals: {} sheets, {} shared strings, {} formats",
            sheets.len(),
            shared_strings.len(),
            number_formats.len()
        );

        Ok(XlsSpreadsheet {
            name: file_name.to_owned(),
            reader,
            shared_strings,
            number_formats,
            sheets,
            active_tab,
        })
    }

    fn resolve(&self, kind: CellKind) -> CellType {
        match kind {
            Either::Left(kind) => kind,
            Either::Right(index) => self.number_formats.get(index).copied().unwrap_or_default(),
        }
    }
}

impl Spreadsheet for XlsSpreadsheet {
    fn name(&self) -> &str {
        &self.name
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets
            .iter()
            .filter(|(_, pointer)| pointer.is_some())
            .map(|(name, _)| name.to_owned())
            .collect()
    }

    fn active_sheet(&self) -> Option<String> {
        match self.sheets.get(self.active_tab) {
            Some((name, Some(_))) => Some(name.to_owned()),
            _ => None,
        }
    }

    fn read_grid(&mut self, sheet_name: &str, criteria: &Criteria) -> Result<Grid, SheetSummaryError> {
        let pointer = self
            .sheets
            .iter()
            .find(|(name, _)| name == sheet_name)
            .and_then(|(_, pointer)| *pointer)
            .ok_or_else(|| SpreadsheetError::SheetNotFoundError(sheet_name.to_owned()))?;

        self.reader.goto(pointer);
        if self.reader.next()? != Some(BOF) {
            Err(XlsError::SubstreamError(sheet_name.to_owned()))?
        }
        let mut grid = Grid::new(sheet_name);
        // A string formula's result arrives in the STRING record that follows it
        let mut pending_string: Option<(usize, usize)> = None;
        while let Some(tag) = self.reader.next()? {
            let (row, col, kind, value) = match tag {
                BOF | EOF => break,
                MUL_RK => {
                    let row = self.reader.read_u16()? as usize;
                    let first = self.reader.read_u16()? as usize;
                    let count = self.reader.remaining().saturating_sub(2) / 6;
                    for col in first..first + count {
                        let index = self.reader.read_u16()? as usize;
                        let kind = self.resolve(Either::Right(index));
                        let value = CellValue::from_serial(self.reader.read_rk_number()?, kind);
                        grid.push(Cell { row, col, value })?;
                    }
                    continue;
                }
                STRING => match pending_string.take() {
                    Some((row, col)) => {
                        let value = self.reader.read_xl_unicode_string()?;
                        (row, col, Either::Left(CellType::InlineString), Either::Left(value))
                    }
                    None => continue,
                },
                BOOL_ERR | NUMBER | RK | LABEL_SST | LABEL | FORMULA => {
                    let row = self.reader.read_u16()? as usize;
                    let col = self.reader.read_u16()? as usize;
                    let (kind, value) = match tag {
                        BOOL_ERR => read_bool_or_error_cell(&mut self.reader)?,
                        NUMBER => read_number_cell(&mut self.reader)?,
                        RK => read_rk_cell(&mut self.reader)?,
                        LABEL_SST => read_label_sst_cell(&mut self.reader)?,
                        LABEL => read_label_cell(&mut self.reader)?,
                        _ => match read_formula_cell(&mut self.reader)? {
                            Some(cell) => cell,
                            None => {
                                pending_string = Some((row, col));
                                continue;
                            }
                        },
                    };
                    (row, col, kind, value)
                }
                _ => continue,
            };

            let value = match (self.resolve(kind), value) {
                (CellType::SharedString, Either::Right(index)) => {
                    self.shared_strings.get(index as usize).cloned().map(CellValue::Text).unwrap_or_default()
                }
                (CellType::Error, _) if criteria.error_as_empty => CellValue::Empty,
                (_, Either::Left(text)) if text.is_empty() => CellValue::Empty,
                (_, Either::Left(text)) => CellValue::Text(text),
                (CellType::Boolean, Either::Right(number)) => CellValue::Number(number),
                (kind, Either::Right(number)) => CellValue::from_serial(number, kind),
            };
            let cell = Cell { row, col, value };
            log::trace!("{}!{} = {:?}", sheet_name, cell.reference(), cell.value);
            grid.push(cell)?;
        }

        log::debug!(
            "Read sheet '{}': {} rows, {} columns",
            sheet_name,
            grid.max_row(),
            grid.max_column()
        );
        Ok(grid)
    }
}

/// Raw cell content: text, or a number (shared string indexes included).
type RawValue = Either<String, f64>;

fn load_shared_strings(reader: &mut Biff8Reader) -> Result<Vec<String>, SheetSummaryError> {
    reader.skip(4)?;
    let count = reader.read_usize()?;
    let mut shared_strings = Vec::with_capacity(count.min(1 << 16));
    for _ in 0..count {
        shared_strings.push(reader.read_xl_unicode_rich_extended_string()?);
    }
    Ok(shared_strings)
}

fn read_bool_or_error_cell(reader: &mut Biff8Reader) -> Result<(CellKind, RawValue), SheetSummaryError> {
    reader.skip(2)?;
    let value = reader.read_u8()?;
    if reader.read_u8()? == 0 {
        Ok((Either::Left(CellType::Boolean), Either::Right(if value != 0 { 1.0 } else { 0.0 })))
    } else {
        Ok((Either::Left(CellType::Error), Either::Left(to_error_value(value).to_owned())))
    }
}

fn read_number_cell(reader: &mut Biff8Reader) -> Result<(CellKind, RawValue), SheetSummaryError> {
    let index = reader.read_u16()? as usize;
    Ok((Either::Right(index), Either::Right(reader.read_f64()?)))
}

fn read_rk_cell(reader: &mut Biff8Reader) -> Result<(CellKind, RawValue), SheetSummaryError> {
    let index = reader.read_u16()? as usize;
    Ok((Either::Right(index), Either::Right(reader.read_rk_number()?)))
}

fn read_label_sst_cell(reader: &mut Biff8Reader) -> Result<(CellKind, RawValue), SheetSummaryError> {
    reader.skip(2)?;
    let index = reader.read_u32()?;
    Ok((Either::Left(CellType::SharedString), Either::Right(index as f64)))
}

fn read_label_cell(reader: &mut Biff8Reader) -> Result<(CellKind, RawValue), SheetSummaryError> {
    reader.skip(2)?;
    Ok((Either::Left(CellType::InlineString), Either::Left(reader.read_xl_unicode_string()?)))
}

/// Decodes the cached result of a FORMULA record. `None` means the result is a string
/// carried by the next STRING record.
fn read_formula_cell(reader: &mut Biff8Reader) -> Result<Option<(CellKind, RawValue)>, SheetSummaryError> {
    let index = reader.read_u16()? as usize;
    let result = reader.read_u64()?;
    if result & 0xFFFF_0000_0000_0000 != 0xFFFF_0000_0000_0000 {
        return Ok(Some((Either::Right(index), Either::Right(f64::from_bits(result)))));
    }
    let byte = ((result >> 16) & 0xFF) as u8;
    match result & 0xFF {
        0 => Ok(None),
        1 => Ok(Some((Either::Left(CellType::Boolean), Either::Right(if byte != 0 { 1.0 } else { 0.0 })))),
        2 => Ok(Some((Either::Left(CellType::Error), Either::Left(to_error_value(byte).to_owned())))),
        3 => Ok(Some((Either::Left(CellType::InlineString), Either::Left(String::new())))),
        _ => Err(XlsError::FormulaValueError(result))?,
    }
}
