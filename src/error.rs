use thiserror::Error;

/// Main error type for sheet summarization.
/// Aggregates errors from the standard library, the zip and XML crates and internal modules.
#[derive(Error, Debug)]
pub enum SheetSummaryError {
    #[error("{0}")]
    WithContextError(String),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("{0}")]
    ParseFloatError(#[from] std::num::ParseFloatError),

    // Third-party library errors
    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    // Helper module errors
    #[error("{0}")]
    CfbHelperError(#[from] crate::helpers::cfb::CfbError),

    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),

    #[error("{0}")]
    Biff8HelperError(#[from] crate::helpers::biff8::Biff8Error),

    // Spreadsheet module errors
    #[error("{0}")]
    SpreadsheetError(#[from] crate::spreadsheet::SpreadsheetError),

    #[error("{0}")]
    XlsError(#[from] crate::spreadsheet::xls::XlsError),

    // Request validation errors
    #[error("{0}")]
    InputError(#[from] crate::request::InputError),
}

/// Failure classes visible to callers of the analysis.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request was rejected before any workbook was read
    InvalidInput,
    /// The bytes could not be read as a workbook
    WorkbookDecodeError,
    /// The requested sheet does not exist in the workbook
    SheetNotFound,
}

impl SheetSummaryError {
    /// Classifies the error. Everything that is not a validation or sheet lookup
    /// failure happened while decoding the workbook.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InputError(_) => ErrorKind::InvalidInput,
            Self::SpreadsheetError(crate::spreadsheet::SpreadsheetError::SheetNotFoundError(_)) => {
                ErrorKind::SheetNotFound
            }
            _ => ErrorKind::WorkbookDecodeError,
        }
    }
}

pub(crate) trait ResultOptionChain {
    fn ok_none_else<F>(self, f: F) -> Self
    where
        F: FnOnce() -> Self;
}

impl<T, E> ResultOptionChain for Result<Option<T>, E> {
    fn ok_none_else<F>(self, f: F) -> Self
    where
        F: FnOnce() -> Self,
    {
        match self {
            Ok(None) => f(),
            _ => self,
        }
    }
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, SheetSummaryError> {
    /// Prefixes decode failures with `message`; validation and sheet lookup
    /// errors pass through so their kind survives.
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| match e.kind() {
            ErrorKind::WorkbookDecodeError => {
                SheetSummaryError::WithContextError(format!("{}: {}", message, e))
            }
            _ => e,
        })
    }
}
