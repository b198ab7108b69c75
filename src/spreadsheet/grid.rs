use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::reference::MAX_COLUMNS;
use crate::spreadsheet::reference::MAX_ROWS;
use crate::spreadsheet::SpreadsheetError;
use std::collections::HashMap;

static EMPTY: CellValue = CellValue::Empty;

/// A worksheet as a sparse grid of cell values, addressed by 1-based row and column.
///
/// Bounds follow the cells actually stored: `max_row` and `max_column` are the largest
/// occupied row and column, and both are 0 for a sheet without cells.
#[derive(Clone, Debug, Default)]
pub struct Grid {
    name: String,
    cells: Vec<Cell>,
    indexes: HashMap<(usize, usize), usize>,
    max_row: usize,
    max_column: usize,
}

impl Grid {
    pub(crate) fn new(name: &str) -> Grid {
        Grid {
            name: name.to_owned(),
            ..Grid::default()
        }
    }

    /// Builds a grid from rows of values; row `i` of the input becomes grid row `i + 1`.
    /// Empty values leave no cell behind. Values past the worksheet limits are dropped.
    pub fn from_rows<R, V>(rows: R) -> Grid
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        let mut grid = Grid::default();
        for (row, values) in rows.into_iter().take(MAX_ROWS).enumerate() {
            for (col, value) in values.into_iter().take(MAX_COLUMNS).enumerate() {
                let value = value.into();
                if !value.is_empty() {
                    grid.insert(Cell { row, col, value });
                }
            }
        }
        grid
    }

    /// Name of the sheet this grid was read from; empty for grids built in memory.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_row(&self) -> usize {
        self.max_row
    }

    pub fn max_column(&self) -> usize {
        self.max_column
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Value at 1-based `(row, column)`; out-of-range and missing cells are empty.
    pub fn value(&self, row: usize, column: usize) -> &CellValue {
        if row == 0 || column == 0 {
            return &EMPTY;
        }
        self.indexes
            .get(&(row - 1, column - 1))
            .and_then(|index| self.cells.get(*index))
            .map(|cell| &cell.value)
            .unwrap_or(&EMPTY)
    }

    /// Occupied cells of 1-based `column` as `(row, value)`, in row order.
    pub fn column_values(&self, column: usize) -> impl Iterator<Item = (usize, &CellValue)> + '_ {
        let mut cells: Vec<&Cell> = self
            .cells
            .iter()
            .filter(|cell| column > 0 && cell.col == column - 1)
            .collect();
        cells.sort_by_key(|cell| cell.row);
        cells.into_iter().map(|cell| (cell.row + 1, &cell.value))
    }

    /// Stores a cell at its 0-based position. A later cell at the same position replaces
    /// the earlier one. Cells past the last worksheet row or column are rejected.
    pub(crate) fn push(&mut self, cell: Cell) -> Result<(), SpreadsheetError> {
        if cell.row >= MAX_ROWS || cell.col >= MAX_COLUMNS {
            return Err(SpreadsheetError::CellOutOfRangeError(cell.row + 1, cell.col + 1));
        }
        if !cell.value.is_empty() {
            self.insert(cell);
        }
        Ok(())
    }

    fn insert(&mut self, cell: Cell) {
        self.max_row = self.max_row.max(cell.row + 1);
        self.max_column = self.max_column.max(cell.col + 1);
        match self.indexes.get(&(cell.row, cell.col)) {
            Some(index) => self.cells[*index] = cell,
            None => {
                self.indexes.insert((cell.row, cell.col), self.cells.len());
                self.cells.push(cell);
            }
        }
    }
}
