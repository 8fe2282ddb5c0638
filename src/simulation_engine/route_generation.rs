// route_generation.rs
//
// Shortest routes over the directed road graph. A breadth-first search walks
// the lane directions of each cell; visited cells are stored in an arena of
// search nodes linked to their parent by index, so the route is rebuilt by
// following those indices back from the goal.

use crate::error::RouteError;
use crate::simulation_engine::grid::{Grid, Position};
use std::collections::{HashSet, VecDeque};

/// Arena entry for one visited cell.
#[derive(Debug, Clone, Copy)]
struct SearchNode {
    position: Position,
    parent: Option<usize>,
}

/// Finds the minimum-hop route from `start` to `goal`.
///
/// The returned route excludes `start` and ends with `goal`. Ties between
/// equally short routes go to the neighbour enumerated first (left, down,
/// right, up).
pub fn find_path(grid: &Grid, start: Position, goal: Position) -> Result<Vec<Position>, RouteError> {
    for endpoint in [start, goal] {
        if !grid.cell(endpoint).is_some_and(|cell| cell.is_road()) {
            return Err(RouteError::NotRoad(endpoint));
        }
    }
    if start == goal {
        return Err(RouteError::SameEndpoints(start));
    }

    let mut nodes = vec![SearchNode {
        position: start,
        parent: None,
    }];
    let mut visited = HashSet::from([start]);
    let mut queue = VecDeque::from([0usize]);

    while let Some(current) = queue.pop_front() {
        let position = nodes[current].position;
        if position == goal {
            return Ok(rebuild_route(&nodes, current));
        }

        for next in grid.neighbors(position) {
            if visited.insert(next) {
                nodes.push(SearchNode {
                    position: next,
                    parent: Some(current),
                });
                queue.push_back(nodes.len() - 1);
            }
        }
    }

    Err(RouteError::Unreachable { start, goal })
}

fn rebuild_route(nodes: &[SearchNode], goal_index: usize) -> Vec<Position> {
    let mut route = Vec::new();
    let mut cursor = goal_index;
    // The root node is the start cell and is left out.
    while let Some(parent) = nodes[cursor].parent {
        route.push(nodes[cursor].position);
        cursor = parent;
    }
    route.reverse();
    route
}
