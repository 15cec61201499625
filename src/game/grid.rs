//! Spatial grid with one exclusion lock per cell
//!
//! Every cell's contents live inside that cell's own mutex, so the lock and
//! the data it protects cannot drift apart. There is no board-wide lock:
//! snapshots and resets visit cells one at a time and never hold more than
//! one lock. Two-cell transactions go through [`SpatialGrid::with_cell_pair`],
//! which always locks the lower linear index (`y * width + x`) first.

use parking_lot::Mutex;
use serde::{Serialize, Serializer};

use super::error::{GameError, GameResult};
use super::layout::BoardLayout;

/// Board token for an empty cell
pub const EMPTY_TOKEN: &str = "0";
/// Board token for a wall cell
pub const WALL_TOKEN: &str = "1";

/// Contents of a single board cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Wall,
    Occupied(String),
}

impl Cell {
    /// Wire token: "0" empty, "1" wall, otherwise the occupant id
    pub fn token(&self) -> &str {
        match self {
            Cell::Empty => EMPTY_TOKEN,
            Cell::Wall => WALL_TOKEN,
            Cell::Occupied(id) => id,
        }
    }

    pub fn is_occupied_by(&self, id: &str) -> bool {
        matches!(self, Cell::Occupied(occupant) if occupant == id)
    }

    /// Occupant id, if any
    #[cfg(test)]
    pub fn occupant(&self) -> Option<&str> {
        match self {
            Cell::Occupied(id) => Some(id),
            _ => None,
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.token())
    }
}

/// Point-in-time copy of the grid, rows indexed by `y`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BoardSnapshot {
    rows: Vec<Vec<Cell>>,
}

impl BoardSnapshot {
    #[cfg(test)]
    pub fn cell(&self, x: i32, y: i32) -> Option<&Cell> {
        if x < 0 || y < 0 {
            return None;
        }
        self.rows.get(y as usize)?.get(x as usize)
    }

    /// Grid as string tokens, the persisted and queried representation
    pub fn tokens(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|c| c.token().to_string()).collect())
            .collect()
    }

    /// Coordinates of every occupied cell
    #[cfg(test)]
    pub fn occupants(&self) -> Vec<(i32, i32, &str)> {
        let mut found = Vec::new();
        for (y, row) in self.rows.iter().enumerate() {
            for (x, cell) in row.iter().enumerate() {
                if let Some(id) = cell.occupant() {
                    found.push((x as i32, y as i32, id));
                }
            }
        }
        found
    }
}

/// Fixed-size board of cells, one mutex per cell
pub struct SpatialGrid {
    layout: BoardLayout,
    cells: Box<[Mutex<Cell>]>,
}

impl SpatialGrid {
    pub fn new(layout: BoardLayout) -> Self {
        let cells = (0..layout.height)
            .flat_map(|y| (0..layout.width).map(move |x| (x, y)))
            .map(|(x, y)| {
                let cell = if layout.is_wall(x, y) {
                    Cell::Wall
                } else {
                    Cell::Empty
                };
                Mutex::new(cell)
            })
            .collect();

        Self { layout, cells }
    }

    pub fn width(&self) -> i32 {
        self.layout.width
    }

    pub fn height(&self) -> i32 {
        self.layout.height
    }

    pub fn layout(&self) -> &BoardLayout {
        &self.layout
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.layout.width && y >= 0 && y < self.layout.height
    }

    /// Linear index used for lock ordering. Never clamps.
    pub fn index(&self, x: i32, y: i32) -> GameResult<usize> {
        if !self.contains(x, y) {
            return Err(GameError::OutOfBounds { x, y });
        }
        Ok((y * self.layout.width + x) as usize)
    }

    pub fn occupant(&self, x: i32, y: i32) -> GameResult<Cell> {
        let idx = self.index(x, y)?;
        Ok(self.cells[idx].lock().clone())
    }

    #[cfg(test)]
    pub fn place(&self, id: &str, x: i32, y: i32) -> GameResult<()> {
        let idx = self.index(x, y)?;
        *self.cells[idx].lock() = Cell::Occupied(id.to_string());
        Ok(())
    }

    #[cfg(test)]
    pub fn clear(&self, x: i32, y: i32) -> GameResult<()> {
        let idx = self.index(x, y)?;
        *self.cells[idx].lock() = Cell::Empty;
        Ok(())
    }

    /// Run `f` while holding the lock of cell (x, y). The guard is released on
    /// every exit path, including when `f` returns an error or panics.
    pub fn with_cell_lock<R>(
        &self,
        x: i32,
        y: i32,
        f: impl FnOnce(&mut Cell) -> GameResult<R>,
    ) -> GameResult<R> {
        let idx = self.index(x, y)?;
        let mut guard = self.cells[idx].lock();
        f(&mut guard)
    }

    /// Run `f` while holding the locks of two distinct cells.
    ///
    /// Locks are taken in ascending linear-index order regardless of argument
    /// order; `f` still receives the cells as `(a, b)`.
    pub fn with_cell_pair<R>(
        &self,
        a: (i32, i32),
        b: (i32, i32),
        f: impl FnOnce(&mut Cell, &mut Cell) -> GameResult<R>,
    ) -> GameResult<R> {
        let ia = self.index(a.0, a.1)?;
        let ib = self.index(b.0, b.1)?;
        if ia == ib {
            return Err(GameError::SameCell);
        }

        if ia < ib {
            let mut first = self.cells[ia].lock();
            let mut second = self.cells[ib].lock();
            f(&mut first, &mut second)
        } else {
            let mut first = self.cells[ib].lock();
            let mut second = self.cells[ia].lock();
            f(&mut second, &mut first)
        }
    }

    /// Copy of the whole grid. Cells are read one lock at a time, so the copy
    /// is not a globally consistent cut while moves are in flight.
    pub fn snapshot(&self) -> BoardSnapshot {
        let width = self.layout.width as usize;
        let rows = self
            .cells
            .chunks(width)
            .map(|row| row.iter().map(|cell| cell.lock().clone()).collect())
            .collect();
        BoardSnapshot { rows }
    }

    /// Remove every occupant, restoring the wall layout
    pub fn reset(&self) {
        for (idx, cell) in self.cells.iter().enumerate() {
            let x = idx as i32 % self.layout.width;
            let y = idx as i32 / self.layout.width;
            let mut guard = cell.lock();
            *guard = if self.layout.is_wall(x, y) {
                Cell::Wall
            } else {
                Cell::Empty
            };
        }
    }
}

impl Default for SpatialGrid {
    fn default() -> Self {
        Self::new(BoardLayout::standard())
    }
}
