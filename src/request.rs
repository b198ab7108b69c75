//! Validated analysis requests and their JSON error shape.

use crate::analysis::analyze_with;
use crate::analysis::AnalysisReport;
use crate::error::ErrorKind;
use crate::error::ResultMessage;
use crate::error::SheetSummaryError;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::open_spreadsheet;
use crate::spreadsheet::select_grid;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

const EXCEL_EXTENSIONS: [&str; 2] = [".xlsx", ".xls"];

#[derive(Error, Debug)]
pub enum InputError {
    #[error("No file was submitted.")]
    MissingFileError,

    #[error("The submitted file is empty.")]
    EmptyFileError,

    #[error("File must be an Excel file (.xlsx or .xls)")]
    FileExtensionError(String),

    #[error("At least one column name must be provided")]
    EmptyColumnsError,

    #[error("All column names must be non-empty strings")]
    BlankColumnError,

    #[error("Columns must be a JSON list of strings: {0}")]
    ColumnsFormatError(String),

    #[error("Invalid input")]
    InvalidRequestError(Vec<InputError>),
}

impl InputError {
    /// Request field the error refers to; `None` for a collection of errors.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::MissingFileError | Self::EmptyFileError | Self::FileExtensionError(_) => Some("file"),
            Self::EmptyColumnsError | Self::BlankColumnError | Self::ColumnsFormatError(_) => Some("columns"),
            Self::InvalidRequestError(_) => None,
        }
    }

    /// Messages grouped by field.
    pub fn details(&self) -> BTreeMap<String, Vec<String>> {
        let mut details: BTreeMap<String, Vec<String>> = BTreeMap::new();
        self.collect_details(&mut details);
        details
    }

    fn collect_details(&self, details: &mut BTreeMap<String, Vec<String>>) {
        match self {
            Self::InvalidRequestError(errors) => errors.iter().for_each(|error| error.collect_details(details)),
            error => {
                let field = error.field().unwrap_or("non_field_errors");
                details.entry(field.to_owned()).or_default().push(error.to_string());
            }
        }
    }

    fn from_errors(mut errors: Vec<InputError>) -> Option<InputError> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Self::InvalidRequestError(errors)),
        }
    }
}

/// An uploaded workbook with the columns to summarize.
#[derive(Debug)]
pub struct AnalysisRequest {
    file_name: String,
    bytes: Vec<u8>,
    columns: Vec<String>,
    sheet_name: Option<String>,
}

impl AnalysisRequest {
    /// Validates the upload and the column list. Column names and the sheet name are
    /// trimmed; an empty sheet name means no sheet was requested. Every failing field is
    /// reported at once.
    pub fn new(
        file_name: &str,
        bytes: Vec<u8>,
        columns: Vec<String>,
        sheet_name: Option<String>,
    ) -> Result<AnalysisRequest, InputError> {
        let file_name = file_name.trim();
        let mut errors = Vec::new();

        if file_name.is_empty() {
            errors.push(InputError::MissingFileError);
        } else if !has_excel_extension(file_name) {
            errors.push(InputError::FileExtensionError(file_name.to_owned()));
        } else if bytes.is_empty() {
            errors.push(InputError::EmptyFileError);
        }

        let columns: Vec<String> = columns.iter().map(|column| column.trim().to_owned()).collect();
        if columns.is_empty() {
            errors.push(InputError::EmptyColumnsError);
        } else if columns.iter().any(|column| column.is_empty()) {
            errors.push(InputError::BlankColumnError);
        }

        if let Some(error) = InputError::from_errors(errors) {
            return Err(error);
        }
        Ok(AnalysisRequest {
            file_name: file_name.to_owned(),
            bytes,
            columns,
            sheet_name: sheet_name
                .map(|name| name.trim().to_owned())
                .filter(|name| !name.is_empty()),
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn sheet_name(&self) -> Option<&str> {
        self.sheet_name.as_deref()
    }
}

fn has_excel_extension(file_name: &str) -> bool {
    let file_name = file_name.to_lowercase();
    EXCEL_EXTENSIONS.iter().any(|extension| file_name.ends_with(extension))
}

/// Reads a `columns` argument: a JSON list of strings when it starts with `[`,
/// otherwise a single column name.
pub fn parse_columns_argument(value: &str) -> Result<Vec<String>, InputError> {
    if value.trim_start().starts_with('[') {
        serde_json::from_str::<Vec<String>>(value).map_err(|e| InputError::ColumnsFormatError(e.to_string()))
    } else {
        Ok(vec![value.to_owned()])
    }
}

/// Decodes the uploaded workbook and summarizes the requested columns of the selected sheet.
pub fn summarize_workbook(request: AnalysisRequest, criteria: &Criteria) -> Result<AnalysisReport, SheetSummaryError> {
    let AnalysisRequest {
        file_name,
        bytes,
        columns,
        sheet_name,
    } = request;
    log::debug!("Analyzing '{}' ({} bytes) for columns {:?}", file_name, bytes.len(), columns);

    let mut spreadsheet = open_spreadsheet(&file_name, bytes)?;
    let grid = select_grid(spreadsheet.as_mut(), sheet_name.as_deref(), criteria).with_prefix(&file_name)?;
    let summary = analyze_with(&grid, &columns, criteria);
    Ok(AnalysisReport { file: file_name, summary })
}

/// JSON body describing a failed request.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<String, Vec<String>>>,
}

impl From<&SheetSummaryError> for ErrorResponse {
    fn from(error: &SheetSummaryError) -> Self {
        match error {
            SheetSummaryError::InputError(input) => ErrorResponse {
                error: "Invalid input".to_owned(),
                details: Some(input.details()),
            },
            _ => ErrorResponse {
                error: format!("Failed to process file: {}", error),
                details: None,
            },
        }
    }
}

impl ErrorResponse {
    /// Process exit code for a failure of `kind`.
    pub fn exit_code(kind: ErrorKind) -> u8 {
        match kind {
            ErrorKind::InvalidInput => 2,
            ErrorKind::WorkbookDecodeError | ErrorKind::SheetNotFound => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn trims_columns_and_sheet() {
        let request =
            AnalysisRequest::new(" prices.XLSX ", vec![1], columns(&[" price ", "qty"]), Some("  ".to_owned())).unwrap();
        assert_eq!(request.file_name(), "prices.XLSX");
        assert_eq!(request.columns(), ["price", "qty"]);
        assert_eq!(request.sheet_name(), None);

        let request = AnalysisRequest::new("old.xls", vec![1], columns(&["price"]), Some(" Data ".to_owned())).unwrap();
        assert_eq!(request.sheet_name(), Some("Data"));
    }

    #[test]
    fn rejects_non_excel_files() {
        let error = AnalysisRequest::new("prices.csv", vec![1], columns(&["price"]), None).unwrap_err();
        assert!(matches!(error, InputError::FileExtensionError(_)));
        assert_eq!(error.field(), Some("file"));
        assert_eq!(error.to_string(), "File must be an Excel file (.xlsx or .xls)");
    }

    #[test]
    fn rejects_missing_and_empty_files() {
        let error = AnalysisRequest::new("", vec![1], columns(&["price"]), None).unwrap_err();
        assert!(matches!(error, InputError::MissingFileError));
        let error = AnalysisRequest::new("prices.xlsx", vec![], columns(&["price"]), None).unwrap_err();
        assert!(matches!(error, InputError::EmptyFileError));
    }

    #[test]
    fn rejects_empty_and_blank_columns() {
        let error = AnalysisRequest::new("prices.xlsx", vec![1], vec![], None).unwrap_err();
        assert!(matches!(error, InputError::EmptyColumnsError));
        let error = AnalysisRequest::new("prices.xlsx", vec![1], columns(&["price", "  "]), None).unwrap_err();
        assert!(matches!(error, InputError::BlankColumnError));
        assert_eq!(error.field(), Some("columns"));
    }

    #[test]
    fn reports_every_failing_field() {
        let error = AnalysisRequest::new("notes.txt", vec![1], vec![], None).unwrap_err();
        let details = error.details();
        assert_eq!(details["file"], vec!["File must be an Excel file (.xlsx or .xls)"]);
        assert_eq!(details["columns"], vec!["At least one column name must be provided"]);
    }

    #[test]
    fn parses_columns_arguments() {
        assert_eq!(parse_columns_argument(r#"["price", "quantity"]"#).unwrap(), columns(&["price", "quantity"]));
        assert_eq!(parse_columns_argument("current usd").unwrap(), columns(&["current usd"]));
        assert!(matches!(
            parse_columns_argument("[price]").unwrap_err(),
            InputError::ColumnsFormatError(_)
        ));
    }

    #[test]
    fn error_responses() {
        let input: SheetSummaryError = InputError::BlankColumnError.into();
        assert_eq!(
            serde_json::to_value(ErrorResponse::from(&input)).unwrap(),
            serde_json::json!({"error": "Invalid input", "details": {"columns": ["All column names must be non-empty strings"]}})
        );

        let decode: SheetSummaryError =
            crate::spreadsheet::SpreadsheetError::SheetNotFoundError("Data".to_owned()).into();
        assert_eq!(
            serde_json::to_value(ErrorResponse::from(&decode)).unwrap(),
            serde_json::json!({"error": "Failed to process file: Worksheet Data does not exist."})
        );
        assert_eq!(ErrorResponse::exit_code(input.kind()), 2);
        assert_eq!(ErrorResponse::exit_code(decode.kind()), 1);
    }

    #[test]
    fn unreadable_bytes_fail_to_process() {
        let request = AnalysisRequest::new("prices.xlsx", b"not a workbook".to_vec(), columns(&["price"]), None).unwrap();
        let error = summarize_workbook(request, &Criteria::default()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::WorkbookDecodeError);
    }
}
