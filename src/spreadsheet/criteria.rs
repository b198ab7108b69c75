/// Default number of leading rows scanned for the header.
pub const DEFAULT_HEADER_SCAN_ROWS: usize = 10;

/// Options for selecting a sheet, decoding its cells and locating the header.
#[derive(Clone, Debug)]
pub struct Criteria {
    /// Sheet analyzed when the request names none. `None` selects the active sheet.
    pub sheet_name: Option<String>,

    /// Number of leading rows considered when locating the header row.
    pub header_scan_rows: usize,

    /// Decode formula error cells (`#DIV/0!`, `#N/A`, ...) as empty instead of text.
    pub error_as_empty: bool,
}

impl Default for Criteria {
    fn default() -> Self {
        Criteria {
            sheet_name: None,
            header_scan_rows: DEFAULT_HEADER_SCAN_ROWS,
            error_as_empty: false,
        }
    }
}

impl Criteria {
    /// Scan window, never below one row.
    pub fn scan_rows(&self) -> usize {
        self.header_scan_rows.max(1)
    }

    /// The sheet to open: `requested` wins over the configured default.
    /// An empty name counts as absent.
    pub fn select_sheet<'a>(&'a self, requested: Option<&'a str>) -> Option<&'a str> {
        requested
            .filter(|name| !name.is_empty())
            .or(self.sheet_name.as_deref())
            .filter(|name| !name.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_rows_clamps_to_one() {
        let criteria = Criteria { header_scan_rows: 0, ..Criteria::default() };
        assert_eq!(criteria.scan_rows(), 1);
        assert_eq!(Criteria::default().scan_rows(), 10);
    }

    #[test]
    fn select_sheet_precedence() {
        let criteria = Criteria { sheet_name: Some("Config".to_owned()), ..Criteria::default() };
        assert_eq!(criteria.select_sheet(Some("Data")), Some("Data"));
        assert_eq!(criteria.select_sheet(None), Some("Config"));
        assert_eq!(criteria.select_sheet(Some("")), Some("Config"));
        assert_eq!(Criteria::default().select_sheet(Some("")), None);
        assert_eq!(Criteria::default().select_sheet(None), None);
    }
}
