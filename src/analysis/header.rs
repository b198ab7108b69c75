use crate::spreadsheet::grid::Grid;

/// Number of non-empty text cells in `row`.
fn text_cell_count(grid: &Grid, row: usize) -> usize {
    (1..=grid.max_column())
        .filter(|column| grid.value(row, *column).is_text())
        .count()
}

/// Picks the 1-based header row among the first `scan_rows` rows: the row with the most
/// text cells, the earliest such row on ties. Row 1 is returned when no row in the window
/// holds text, including for an empty grid.
pub fn locate_header_row(grid: &Grid, scan_rows: usize) -> usize {
    let window = scan_rows.max(1).min(grid.max_row());
    let mut best_row = 1;
    let mut best_count = 0;
    for row in 1..=window {
        let count = text_cell_count(grid, row);
        if count > best_count {
            best_row = row;
            best_count = count;
        }
    }
    log::debug!("Header row {} with {} text cells", best_row, best_count);
    best_row
}

/// Trimmed display strings of `row` for columns `1..=max_column`; empty cells give `""`.
pub fn header_strings(grid: &Grid, row: usize) -> Vec<String> {
    (1..=grid.max_column())
        .map(|column| grid.value(row, column).to_string().trim().to_owned())
        .collect()
}
