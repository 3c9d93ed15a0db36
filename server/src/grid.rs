//! Authoritative grid store
//!
//! Holds the canonical GRID_SIZE x GRID_SIZE cell matrix. Mutation is
//! last-write-wins: `set` overwrites unconditionally once the coordinates
//! are in bounds. Character validity is the engine's responsibility.

use shared::{empty_grid, Grid, GridCell, GRID_SIZE};

use crate::engine::EditError;

pub struct GridStore {
    cells: Grid,
}

impl GridStore {
    pub fn new() -> Self {
        Self {
            cells: empty_grid(),
        }
    }

    /// Deep copy of the full matrix, used for registration pushes and
    /// full-state broadcasts.
    pub fn snapshot(&self) -> Grid {
        self.cells.clone()
    }

    /// Writes a cell, returning the previous occupant (None if the cell was
    /// empty). Fails only on out-of-bounds coordinates.
    pub fn set(&mut self, row: usize, col: usize, cell: GridCell) -> Result<Option<GridCell>, EditError> {
        if row >= GRID_SIZE || col >= GRID_SIZE {
            return Err(EditError::OutOfBounds {
                row: row as i32,
                col: col as i32,
            });
        }

        Ok(self.cells[row][col].replace(cell))
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&GridCell> {
        self.cells.get(row)?.get(col)?.as_ref()
    }
}

impl Default for GridStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(ch: char, player_id: u32) -> GridCell {
        GridCell {
            character: ch,
            player_id,
            player_name: format!("player-{}", player_id),
            timestamp: 1000,
        }
    }

    #[test]
    fn test_starts_empty() {
        let store = GridStore::new();
        let snapshot = store.snapshot();

        assert_eq!(snapshot.len(), GRID_SIZE);
        for row in snapshot {
            assert!(row.iter().all(|c| c.is_none()));
        }
    }

    #[test]
    fn test_set_empty_cell_returns_none() {
        let mut store = GridStore::new();

        let previous = store.set(0, 0, cell('X', 1)).unwrap();
        assert!(previous.is_none());

        let stored = store.get(0, 0).unwrap();
        assert_eq!(stored.character, 'X');
        assert_eq!(stored.player_id, 1);
    }

    #[test]
    fn test_set_overwrites_last_write_wins() {
        let mut store = GridStore::new();

        store.set(4, 7, cell('A', 1)).unwrap();
        let previous = store.set(4, 7, cell('B', 2)).unwrap();

        // The old occupant comes back out, and is gone from the store.
        assert_eq!(previous.unwrap().character, 'A');
        let stored = store.get(4, 7).unwrap();
        assert_eq!(stored.character, 'B');
        assert_eq!(stored.player_id, 2);
    }

    #[test]
    fn test_set_out_of_bounds() {
        let mut store = GridStore::new();

        assert!(matches!(
            store.set(GRID_SIZE, 0, cell('X', 1)),
            Err(EditError::OutOfBounds { .. })
        ));
        assert!(matches!(
            store.set(0, GRID_SIZE, cell('X', 1)),
            Err(EditError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_corner_cells_writable() {
        let mut store = GridStore::new();

        store.set(0, 0, cell('a', 1)).unwrap();
        store.set(0, GRID_SIZE - 1, cell('b', 1)).unwrap();
        store.set(GRID_SIZE - 1, 0, cell('c', 1)).unwrap();
        store.set(GRID_SIZE - 1, GRID_SIZE - 1, cell('d', 1)).unwrap();

        assert_eq!(store.get(9, 9).unwrap().character, 'd');
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut store = GridStore::new();
        let snapshot = store.snapshot();

        store.set(1, 1, cell('X', 1)).unwrap();

        assert!(snapshot[1][1].is_none());
        assert!(store.get(1, 1).is_some());
    }
}
