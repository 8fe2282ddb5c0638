// grid.rs
//
// The city grid: a square matrix of road and building cells laid out with a
// repeating 7x7 block pattern. Topology never changes after construction; only
// the per-cell occupancy and light flags do, each behind its own mutex.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Side length of one city block, including its two border lanes.
pub const BLOCK_SIZE: usize = 7;

/// Default grid width used by the reference city.
pub const DEFAULT_WIDTH: usize = 16;

/// A (row, col) coordinate in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellKind {
    Road,
    Building,
}

/// Allowed travel direction(s) out of a cell.
/// Corner values let a car leave the cell along either of two cardinals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LaneDirection {
    None,
    Left,
    Right,
    Down,
    Up,
    LeftDown,
    RightDown,
    LeftUp,
    RightUp,
}

impl LaneDirection {
    pub fn allows_left(self) -> bool {
        matches!(self, Self::Left | Self::LeftDown | Self::LeftUp)
    }

    pub fn allows_down(self) -> bool {
        matches!(self, Self::Down | Self::LeftDown | Self::RightDown)
    }

    pub fn allows_right(self) -> bool {
        matches!(self, Self::Right | Self::RightDown | Self::RightUp)
    }

    pub fn allows_up(self) -> bool {
        matches!(self, Self::Up | Self::LeftUp | Self::RightUp)
    }

    /// True for straight lanes, which are the only valid route endpoints.
    pub fn is_straight(self) -> bool {
        matches!(self, Self::Left | Self::Right | Self::Down | Self::Up)
    }
}

/// Mutable part of a cell, shared between car and light tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellState {
    /// A car currently stands on this cell.
    pub occupied: bool,
    /// Traffic standing on this cell may leave it.
    pub light_open: bool,
}

impl Default for CellState {
    fn default() -> Self {
        Self {
            occupied: false,
            light_open: true,
        }
    }
}

/// One grid cell ("sector").
#[derive(Debug)]
pub struct Cell {
    pub position: Position,
    pub kind: CellKind,
    pub direction: LaneDirection,
    state: Mutex<CellState>,
}

impl Cell {
    fn new(position: Position) -> Self {
        let x = position.row % BLOCK_SIZE;
        let y = position.col % BLOCK_SIZE;
        let (kind, direction) = if x < 2 || y < 2 {
            let direction = match (x, y) {
                (0, 0) => LaneDirection::LeftDown,
                (1, 0) => LaneDirection::RightDown,
                (0, 1) => LaneDirection::LeftUp,
                (1, 1) => LaneDirection::RightUp,
                (0, _) => LaneDirection::Left,
                (1, _) => LaneDirection::Right,
                (_, 0) => LaneDirection::Down,
                _ => LaneDirection::Up,
            };
            (CellKind::Road, direction)
        } else {
            (CellKind::Building, LaneDirection::None)
        };

        Self {
            position,
            kind,
            direction,
            state: Mutex::new(CellState::default()),
        }
    }

    pub fn is_road(&self) -> bool {
        self.kind == CellKind::Road
    }

    /// Road cell with a straight lane.
    pub fn is_street(&self) -> bool {
        self.is_road() && self.direction.is_straight()
    }

    pub fn state(&self) -> CellState {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, CellState> {
        // Cell state is plain data, a panicking holder cannot leave it torn.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Read-only copy of a cell for renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellView {
    pub position: Position,
    pub kind: CellKind,
    pub direction: LaneDirection,
    pub occupied: bool,
    pub light_open: bool,
}

/// Represents the whole city: a `width x width` matrix stored row-major.
#[derive(Debug)]
pub struct Grid {
    width: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Generates the city layout. The same width always yields the same topology.
    pub fn new(width: usize) -> Self {
        let cells = (0..width)
            .flat_map(|row| (0..width).map(move |col| Cell::new(Position::new(row, col))))
            .collect();
        Self { width, cells }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn contains(&self, position: Position) -> bool {
        position.row < self.width && position.col < self.width
    }

    fn index(&self, position: Position) -> Option<usize> {
        self.contains(position)
            .then(|| position.row * self.width + position.col)
    }

    pub fn cell(&self, position: Position) -> Option<&Cell> {
        self.index(position).map(|index| &self.cells[index])
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    pub fn road_cells(&self) -> Vec<Position> {
        self.cells
            .iter()
            .filter(|cell| cell.is_road())
            .map(|cell| cell.position)
            .collect()
    }

    /// Road cells with a straight lane, in row-major order.
    pub fn street_cells(&self) -> Vec<Position> {
        self.cells
            .iter()
            .filter(|cell| cell.is_street())
            .map(|cell| cell.position)
            .collect()
    }

    /// Cells a car may drive to from `position`, following the lane direction.
    /// Order: left, down, right, up.
    pub fn neighbors(&self, position: Position) -> Vec<Position> {
        let Some(cell) = self.cell(position) else {
            return Vec::new();
        };
        let direction = cell.direction;
        let Position { row, col } = position;

        let candidates = [
            (direction.allows_left() && col > 0).then(|| Position::new(row, col - 1)),
            direction.allows_down().then(|| Position::new(row + 1, col)),
            direction.allows_right().then(|| Position::new(row, col + 1)),
            (direction.allows_up() && row > 0).then(|| Position::new(row - 1, col)),
        ];

        candidates
            .into_iter()
            .flatten()
            .filter(|next| self.cell(*next).is_some_and(Cell::is_road))
            .collect()
    }

    /// Marks a road cell as taken by a newly placed car.
    /// Returns false if the cell is not a road or already occupied.
    pub fn occupy(&self, position: Position) -> bool {
        match self.cell(position) {
            Some(cell) if cell.is_road() => {
                let mut state = cell.lock();
                if state.occupied {
                    false
                } else {
                    state.occupied = true;
                    true
                }
            }
            _ => false,
        }
    }

    pub fn release(&self, position: Position) {
        if let Some(cell) = self.cell(position) {
            cell.lock().occupied = false;
        }
    }

    pub fn set_light(&self, position: Position, open: bool) {
        if let Some(cell) = self.cell(position) {
            cell.lock().light_open = open;
        }
    }

    /// Moves a car from `from` to `to` if the light on `from` is open and `to`
    /// is free. Both cells stay locked for the whole check-and-write, taken in
    /// ascending index order.
    pub fn try_move(&self, from: Position, to: Position) -> bool {
        let (Some(from_index), Some(to_index)) = (self.index(from), self.index(to)) else {
            return false;
        };
        if from_index == to_index || !self.cells[to_index].is_road() {
            return false;
        }

        let (mut here, mut next) = if from_index < to_index {
            let here = self.cells[from_index].lock();
            let next = self.cells[to_index].lock();
            (here, next)
        } else {
            let next = self.cells[to_index].lock();
            let here = self.cells[from_index].lock();
            (here, next)
        };

        if !here.light_open || next.occupied {
            return false;
        }
        here.occupied = false;
        next.occupied = true;
        true
    }

    pub fn snapshot(&self) -> Vec<CellView> {
        self.cells
            .iter()
            .map(|cell| {
                let state = cell.state();
                CellView {
                    position: cell.position,
                    kind: cell.kind,
                    direction: cell.direction,
                    occupied: state.occupied,
                    light_open: state.light_open,
                }
            })
            .collect()
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.state().occupied).count()
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH)
    }
}
