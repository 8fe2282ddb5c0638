use crate::simulation_engine::grid::{Grid, Position, BLOCK_SIZE};
use serde::{Deserialize, Serialize};

/// Identifies an intersection by the block corner it surrounds (row, col).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntersectionId(pub usize, pub usize);

/// Road cells feeding into one block corner. A traffic light may be bound to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intersection {
    pub id: IntersectionId,
    /// Intersection Name
    pub name: String,
    /// Entry cells, in collection order: above, below-left, below-right, right.
    pub cells: Vec<Position>,
}

impl Intersection {
    pub fn new(id: IntersectionId, cells: Vec<Position>) -> Self {
        Self {
            id,
            name: format!("Intersection {:02}{:02}", id.0, id.1),
            cells,
        }
    }
}

/// Collects one intersection per block corner, in row-major corner order.
///
/// Around corner `(i, j)` the candidates are `(i-1, j)`, `(i+1, j-1)`,
/// `(i+2, j+1)` and `(i, j+2)`: the straight lanes that lead into the
/// corner's turn cells. Candidates off the grid or on buildings are skipped.
pub fn create_intersections(grid: &Grid) -> Vec<Intersection> {
    let width = grid.width();
    let mut intersections = Vec::new();

    for i in (0..width).step_by(BLOCK_SIZE) {
        for j in (0..width).step_by(BLOCK_SIZE) {
            let candidates = [
                (i > 0).then(|| Position::new(i - 1, j)),
                (j > 0).then(|| Position::new(i + 1, j - 1)),
                Some(Position::new(i + 2, j + 1)),
                Some(Position::new(i, j + 2)),
            ];

            let cells: Vec<Position> = candidates
                .into_iter()
                .flatten()
                .filter(|position| grid.cell(*position).is_some_and(|cell| cell.is_road()))
                .collect();

            if !cells.is_empty() {
                intersections.push(Intersection::new(IntersectionId(i, j), cells));
            }
        }
    }

    intersections
}
