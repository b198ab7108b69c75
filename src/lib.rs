//! # Sheet Summary
//!
//! Summarizes columns of Excel workbooks whose layout is not known in advance. Sheets
//! exported by people tend to carry title banners, blank spacer rows and section labels
//! above the real header, and header labels rarely match the names callers ask for
//! exactly.
//!
//! ## Features
//!
//! - **Workbook formats**: `.xlsx` (OOXML) and `.xls` (BIFF8), detected from the file
//!   signature and read entirely in memory
//! - **Header detection**: the header is the row with the most text cells among the first
//!   rows of the sheet (10 by default)
//! - **Column matching**: a target matches the first header that contains it, ignoring
//!   case and surrounding whitespace
//! - **Numeric extraction**: numbers are taken as-is and numeric text such as `"$1,200.00"`
//!   is parsed; everything else is skipped
//! - **Summaries**: sum and average per matched column, rounded to two decimal places
//!
//! ## Example
//!
//! ```no_run
//! use sheet_summary::request::{summarize_workbook, AnalysisRequest};
//! use sheet_summary::Criteria;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = std::fs::read("prices.xlsx")?;
//! let request = AnalysisRequest::new("prices.xlsx", bytes, vec!["price".to_owned()], None)?;
//! let report = summarize_workbook(request, &Criteria::default())?;
//! println!("{}", serde_json::to_string(&report)?);
//! # Ok(())
//! # }
//! ```

mod error;
mod helpers;
mod spreadsheet;

pub mod analysis;
pub mod request;

pub use crate::analysis::aggregate::ColumnSummary;
pub use crate::analysis::analyze;
pub use crate::analysis::analyze_with;
pub use crate::analysis::AnalysisReport;
pub use crate::error::ErrorKind;
pub use crate::error::SheetSummaryError;
pub use crate::spreadsheet::cell::CellValue;
pub use crate::spreadsheet::criteria::Criteria;
pub use crate::spreadsheet::criteria::DEFAULT_HEADER_SCAN_ROWS;
pub use crate::spreadsheet::grid::Grid;
pub use crate::spreadsheet::open_spreadsheet;
pub use crate::spreadsheet::select_grid;
pub use crate::spreadsheet::xls::XlsError;
pub use crate::spreadsheet::Spreadsheet;
pub use crate::spreadsheet::SpreadsheetError;
