use super::grid::{Cell, Direction};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoodKind {
  Normal,
  Golden,
  Poison,
}

/// The single live food item. Replaced wholesale on every respawn, never
/// mutated in place.
#[derive(Debug, Clone)]
pub struct Food {
  pub cell: Cell,
  pub kind: FoodKind,
  pub color: String,
  pub score: i64,
  pub expires_at: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct Snake {
  pub id: String,
  pub name: String,
  pub color: String,
  pub spawn_slot: usize,
  /// Head at the front. Always holds at least one cell.
  pub body: VecDeque<Cell>,
  pub heading: Direction,
  pub pending_heading: Direction,
  pub score: i64,
  pub extra_growth: u32,
  pub milestone: i64,
}

pub const DEFAULT_HEADING: Direction = Direction::Right;

impl Snake {
  pub fn new(id: String, name: String, color: String, spawn_slot: usize, spawn: Cell) -> Self {
    Self {
      id,
      name,
      color,
      spawn_slot,
      body: VecDeque::from([spawn]),
      heading: DEFAULT_HEADING,
      pending_heading: DEFAULT_HEADING,
      score: 0,
      extra_growth: 0,
      milestone: 0,
    }
  }

  pub fn head(&self) -> Option<Cell> {
    self.body.front().copied()
  }

  /// Fatal-collision outcome: back to a fresh single-segment body at the
  /// given cell. The snake itself survives and keeps receiving input.
  pub fn reset(&mut self, spawn: Cell) {
    self.body.clear();
    self.body.push_back(spawn);
    self.heading = DEFAULT_HEADING;
    self.pending_heading = DEFAULT_HEADING;
    self.score = 0;
    self.extra_growth = 0;
    self.milestone = 0;
  }
}
