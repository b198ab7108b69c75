//! A1-style cell references.

/// Rows in a worksheet, `1048576`.
pub(crate) const MAX_ROWS: usize = 1 << 20;
/// Columns in a worksheet, `XFD`.
pub(crate) const MAX_COLUMNS: usize = 1 << 14;

/// Converts 0-based `(row, col)` to a reference such as `"B3"`.
pub(crate) fn index_to_reference(row: usize, col: usize) -> String {
    let mut letters = Vec::new();
    let mut col = col + 1;
    while col > 0 {
        col -= 1;
        letters.push(b'A' + (col % 26) as u8);
        col /= 26;
    }
    letters.reverse();
    format!("{}{}", String::from_utf8_lossy(&letters), row + 1)
}

/// Parses a reference such as `"B3"` or `"$B$3"` into 0-based `(row, col)`.
/// A reference without a row part (`"B"`) yields row `None`. References past the last
/// worksheet row or column are rejected.
pub(crate) fn reference_to_index(reference: &str) -> Option<(Option<usize>, usize)> {
    let reference = reference.trim().replace('$', "");
    let split = reference
        .find(|character: char| !character.is_ascii_alphabetic())
        .unwrap_or(reference.len());
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() {
        return None;
    }

    let mut col = 0usize;
    for letter in letters.bytes() {
        col = col
            .checked_mul(26)?
            .checked_add((letter.to_ascii_uppercase() - b'A') as usize + 1)
            .filter(|col| *col <= MAX_COLUMNS)?;
    }
    let row = match digits {
        "" => None,
        digits => Some(digits.parse::<usize>().ok().filter(|row| *row <= MAX_ROWS)?.checked_sub(1)?),
    };
    Some((row, col - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_to_reference_cases() {
        assert_eq!(index_to_reference(0, 0), "A1");
        assert_eq!(index_to_reference(2, 25), "Z3");
        assert_eq!(index_to_reference(9, 26), "AA10");
        assert_eq!(index_to_reference(0, 701), "ZZ1");
        assert_eq!(index_to_reference(0, 702), "AAA1");
    }

    #[test]
    fn reference_to_index_cases() {
        assert_eq!(reference_to_index("A1"), Some((Some(0), 0)));
        assert_eq!(reference_to_index("$AA$10"), Some((Some(9), 26)));
        assert_eq!(reference_to_index("c"), Some((None, 2)));
        assert_eq!(reference_to_index("12"), None);
        assert_eq!(reference_to_index("A0"), None);
        assert_eq!(reference_to_index("A1B"), None);
    }

    #[test]
    fn references_past_worksheet_limits() {
        assert_eq!(reference_to_index("XFD1048576"), Some((Some(1_048_575), 16_383)));
        assert_eq!(reference_to_index("XFE1"), None);
        assert_eq!(reference_to_index("A1048577"), None);
        assert_eq!(reference_to_index("AAAAAAAAAAAAAAA1"), None);
        assert_eq!(reference_to_index("A30000000000000000000000"), None);
    }
}
