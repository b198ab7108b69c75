//! Workbook decoding.
//!
//! Readers for `.xlsx` (OOXML package) and `.xls` (BIFF8 inside a compound file) expose
//! each worksheet as a [`Grid`]. The format is detected from the leading bytes, never
//! from the file name.

pub(crate) mod cell;
pub(crate) mod criteria;
pub(crate) mod excel;
pub(crate) mod grid;
pub(crate) mod reference;
pub(crate) mod xls;
pub(crate) mod xlsx;

use crate::error::SheetSummaryError;
use crate::helpers::cfb;
use crate::helpers::cfb::Cfb;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::grid::Grid;
use crate::spreadsheet::xls::XlsSpreadsheet;
use crate::spreadsheet::xlsx::XlsxSpreadsheet;
use std::io::Cursor;
use thiserror::Error;

const ZIP_SIGNATURE: &[u8] = b"PK\x03\x04";

#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("Cannot detect file format of '{0}'")]
    FileFormatError(String),

    #[error("The spreadsheet '{0}' is password protected")]
    PasswordProtectedError(String),

    #[error("The spreadsheet '{0}' contains no worksheets")]
    SpreadsheetEmptyError(String),

    #[error("Missing package part '{0}'")]
    FileError(String),

    #[error("Worksheet {0} does not exist.")]
    SheetNotFoundError(String),

    #[error("Invalid cell reference '{0}'")]
    CellReferenceError(String),

    #[error("Cell at row {0}, column {1} is outside the worksheet")]
    CellOutOfRangeError(usize, usize),
}

/// A decoded workbook.
pub trait Spreadsheet {
    /// File name the workbook was uploaded as.
    fn name(&self) -> &str;

    /// Sheet names in workbook order.
    fn sheet_names(&self) -> Vec<String>;

    /// Name of the sheet that was active when the workbook was saved.
    fn active_sheet(&self) -> Option<String>;

    /// Decodes sheet `sheet_name`, which must be one of [`Spreadsheet::sheet_names`].
    fn read_grid(&mut self, sheet_name: &str, criteria: &Criteria) -> Result<Grid, SheetSummaryError>;
}

/// Opens `bytes` as a workbook, choosing the reader from the file signature.
pub fn open_spreadsheet(file_name: &str, bytes: Vec<u8>) -> Result<Box<dyn Spreadsheet>, SheetSummaryError> {
    if bytes.starts_with(ZIP_SIGNATURE) {
        log::debug!("Reading '{}' as an OOXML package", file_name);
        Ok(Box::new(XlsxSpreadsheet::open(file_name, Cursor::new(bytes))?))
    } else if cfb::has_signature(&bytes) {
        let cfb = Cfb::new(&mut Cursor::new(bytes))?;
        if cfb.exists("EncryptedPackage") {
            Err(SpreadsheetError::PasswordProtectedError(file_name.to_owned()))?
        }
        log::debug!("Reading '{}' as a BIFF8 workbook", file_name);
        Ok(Box::new(XlsSpreadsheet::open(file_name, &cfb)?))
    } else {
        Err(SpreadsheetError::FileFormatError(file_name.to_owned()))?
    }
}

/// Reads the sheet chosen by `requested`, the criteria default or the active sheet,
/// in that order. A named sheet that does not exist is an error.
pub fn select_grid(
    spreadsheet: &mut dyn Spreadsheet,
    requested: Option<&str>,
    criteria: &Criteria,
) -> Result<Grid, SheetSummaryError> {
    let sheet_names = spreadsheet.sheet_names();
    let sheet_name = match criteria.select_sheet(requested) {
        Some(name) if sheet_names.iter().any(|sheet_name| sheet_name == name) => name.to_owned(),
        Some(name) => Err(SpreadsheetError::SheetNotFoundError(name.to_owned()))?,
        None => spreadsheet
            .active_sheet()
            .or_else(|| sheet_names.first().cloned())
            .ok_or_else(|| SpreadsheetError::SpreadsheetEmptyError(spreadsheet.name().to_owned()))?,
    };
    log::debug!("Selected sheet '{}' of '{}'", sheet_name, spreadsheet.name());
    spreadsheet.read_grid(&sheet_name, criteria)
}
