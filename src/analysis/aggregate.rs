use serde::Serialize;

/// Sum and average of one matched column.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ColumnSummary {
    /// The target name as supplied by the caller
    pub column: String,
    pub sum: f64,
    pub avg: f64,
}

/// Rounds to two decimal places, halves away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Summarizes `values`; `None` when there are none.
pub fn summarize(column: &str, values: &[f64]) -> Option<ColumnSummary> {
    if values.is_empty() {
        log::trace!("Column '{}' has no numeric values", column);
        return None;
    }
    let sum: f64 = values.iter().sum();
    Some(ColumnSummary {
        column: column.to_owned(),
        sum: round2(sum),
        avg: round2(sum / values.len() as f64),
    })
}
