//! Column summaries over a decoded [`Grid`].
//!
//! The header row is guessed from the amount of text in the leading rows. Each target
//! column name is resolved to the first header containing it, and every numeric value
//! below the header is summed and averaged.

pub mod aggregate;
pub mod extract;
pub mod header;
pub mod matcher;

use crate::analysis::aggregate::summarize;
use crate::analysis::aggregate::ColumnSummary;
use crate::analysis::extract::extract_numeric_values;
use crate::analysis::header::header_strings;
use crate::analysis::header::locate_header_row;
use crate::analysis::matcher::match_columns;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::grid::Grid;
use serde::Serialize;

/// Result of one analysis request.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalysisReport {
    /// File name the workbook was uploaded as
    pub file: String,
    pub summary: Vec<ColumnSummary>,
}

/// Summarizes `targets` over `grid` with default options.
pub fn analyze<S: AsRef<str>>(grid: &Grid, targets: &[S]) -> Vec<ColumnSummary> {
    analyze_with(grid, targets, &Criteria::default())
}

/// Summarizes `targets` over `grid`. Summaries follow target order; targets without
/// a matching header or without numeric values are left out.
pub fn analyze_with<S: AsRef<str>>(grid: &Grid, targets: &[S], criteria: &Criteria) -> Vec<ColumnSummary> {
    let header_row = locate_header_row(grid, criteria.scan_rows());
    let headers = header_strings(grid, header_row);
    log::trace!("Headers of sheet '{}': {:?}", grid.name(), headers);

    let matches = match_columns(&headers, targets);
    log::debug!("Matched {} of {} target columns", matches.len(), targets.len());

    matches
        .iter()
        .filter_map(|(target, offset)| {
            let values = extract_numeric_values(grid, header_row, offset);
            summarize(target, &values)
        })
        .collect()
}
