use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    pub fn is_opposite(self, other: Direction) -> bool {
        self.opposite() == other
    }

    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}

/// Translates one cell in the given direction. Never clamps; out-of-bounds
/// results are valid intermediate values for the wall check.
pub fn step(cell: Cell, direction: Direction) -> Cell {
    let (dx, dy) = direction.delta();
    Cell {
        x: cell.x + dx,
        y: cell.y + dy,
    }
}

pub fn in_bounds(cell: Cell, cols: i32, rows: i32) -> bool {
    cell.x >= 0 && cell.x < cols && cell.y >= 0 && cell.y < rows
}
