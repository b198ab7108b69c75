use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::grid::Grid;

/// Numeric reading of one cell. Numbers pass through; text is parsed after dropping
/// `,` and `$` and surrounding whitespace. Everything else, and text that does not parse
/// to a finite number, yields `None`.
pub fn coerce_numeric(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Number(number) => Some(*number),
        CellValue::Text(text) => {
            let cleaned: String = text.chars().filter(|c| *c != ',' && *c != '$').collect();
            cleaned.trim().parse::<f64>().ok().filter(|number| number.is_finite())
        }
        _ => None,
    }
}

/// Coercible values of the column at 0-based `column_offset`, for rows below `header_row`.
pub fn extract_numeric_values(grid: &Grid, header_row: usize, column_offset: usize) -> Vec<f64> {
    let column = column_offset + 1;
    grid.column_values(column)
        .filter(|(row, _)| *row > header_row)
        .filter_map(|(row, value)| {
            let number = coerce_numeric(value);
            if number.is_none() {
                log::trace!("Skipped non-numeric cell at row {}, column {}: {:?}", row, column, value);
            }
            number
        })
        .collect()
}
