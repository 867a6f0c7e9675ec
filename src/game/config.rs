use super::grid::Cell;
use super::types::FoodKind;
use std::env;

pub const COLOR_POOL: [&str; 8] = [
  "#ff6b6b",
  "#ffd166",
  "#06d6a0",
  "#4dabf7",
  "#f06595",
  "#845ef7",
  "#20c997",
  "#fcc419",
];

/// One row of the food table: everything the spawner and the tick need to
/// know about a food type.
#[derive(Debug, Clone)]
pub struct FoodSpec {
  pub kind: FoodKind,
  pub color: String,
  pub score: i64,
  pub weight: f64,
  pub lifetime_ms: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct GameConfig {
  pub cols: i32,
  pub rows: i32,
  pub cell_size: i32,
  pub start_tick_ms: u64,
  pub min_tick_ms: u64,
  pub speed_step_ms: u64,
  pub milestone_score: i64,
  pub poison_shrink: usize,
  pub golden_extra_growth: u32,
  pub free_cell_attempts: u32,
  pub food_table: Vec<FoodSpec>,
}

impl Default for GameConfig {
  fn default() -> Self {
    Self {
      cols: 20,
      rows: 20,
      cell_size: 20,
      start_tick_ms: 200,
      min_tick_ms: 60,
      speed_step_ms: 10,
      milestone_score: 5,
      poison_shrink: 2,
      golden_extra_growth: 2,
      free_cell_attempts: 2000,
      food_table: vec![
        FoodSpec {
          kind: FoodKind::Normal,
          color: "#e74c3c".to_string(),
          score: 1,
          weight: 0.75,
          lifetime_ms: None,
        },
        FoodSpec {
          kind: FoodKind::Golden,
          color: "#f1c40f".to_string(),
          score: 3,
          weight: 0.10,
          lifetime_ms: Some(5000),
        },
        FoodSpec {
          kind: FoodKind::Poison,
          color: "#8e44ad".to_string(),
          score: -2,
          weight: 0.15,
          lifetime_ms: None,
        },
      ],
    }
  }
}

impl GameConfig {
  pub fn from_env() -> Self {
    let mut config = Self::default();
    config.cols = env_i32("GRID_COLS", config.cols).max(4);
    config.rows = env_i32("GRID_ROWS", config.rows).max(4);
    config.cell_size = env_i32("CELL_SIZE", config.cell_size).max(1);
    config.start_tick_ms = env_u64("TICK_MS", config.start_tick_ms).max(10);
    config.min_tick_ms = env_u64("MIN_TICK_MS", config.min_tick_ms)
      .max(10)
      .min(config.start_tick_ms);
    config.speed_step_ms = env_u64("SPEED_STEP_MS", config.speed_step_ms);
    config
  }

  /// Deterministic spawn placement by join-order slot: the four board
  /// quadrants first, then one column inward per full cycle.
  pub fn spawn_cell(&self, slot: usize) -> Cell {
    let anchors = [
      (1, 1),
      (self.cols - 2, 1),
      (1, self.rows - 2),
      (self.cols - 2, self.rows - 2),
    ];
    let (x, y) = anchors[slot % anchors.len()];
    let ring = (slot / anchors.len()) as i32;
    Cell {
      x: (x + ring).rem_euclid(self.cols),
      y: y.rem_euclid(self.rows),
    }
  }

  pub fn pixel_width(&self) -> i32 {
    self.cols * self.cell_size
  }

  pub fn pixel_height(&self) -> i32 {
    self.rows * self.cell_size
  }
}

fn env_i32(key: &str, default: i32) -> i32 {
  env::var(key)
    .ok()
    .and_then(|value| value.parse().ok())
    .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
  env::var(key)
    .ok()
    .and_then(|value| value.parse().ok())
    .unwrap_or(default)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_food_weights_sum_to_one() {
    let config = GameConfig::default();
    let total: f64 = config.food_table.iter().map(|spec| spec.weight).sum();
    assert!((total - 1.0).abs() < 1e-9);
  }

  #[test]
  fn spawn_cells_stay_in_bounds_and_differ_for_early_slots() {
    let config = GameConfig::default();
    let mut seen = Vec::new();
    for slot in 0..8 {
      let cell = config.spawn_cell(slot);
      assert!(cell.x >= 0 && cell.x < config.cols);
      assert!(cell.y >= 0 && cell.y < config.rows);
      seen.push(cell);
    }
    for i in 0..4 {
      for j in (i + 1)..4 {
        assert_ne!(seen[i], seen[j]);
      }
    }
  }
}
