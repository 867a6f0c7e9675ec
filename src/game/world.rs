use super::config::{FoodSpec, GameConfig, COLOR_POOL};
use super::grid::{self, Cell, Direction};
use super::types::{Food, FoodKind, Snake};
use rand::Rng;
use std::collections::{HashMap, HashSet, VecDeque};

/// The canonical game state: every snake, the obstacle set, the single food
/// item, and the shared tick interval. Owned by one `Room` behind its mutex;
/// sessions only ever hold snake ids into it.
#[derive(Debug)]
pub struct World {
  pub config: GameConfig,
  pub snakes: HashMap<String, Snake>,
  pub obstacles: Vec<Cell>,
  pub food: Option<Food>,
  pub tick_ms: u64,
  next_spawn_slot: usize,
}

impl World {
  pub fn new(config: GameConfig) -> Self {
    let tick_ms = config.start_tick_ms;
    Self {
      config,
      snakes: HashMap::new(),
      obstacles: Vec::new(),
      food: None,
      tick_ms,
      next_spawn_slot: 0,
    }
  }

  pub fn add_snake(&mut self, id: String, now: i64) {
    let slot = self.next_spawn_slot;
    self.next_spawn_slot += 1;
    let spawn = self.config.spawn_cell(slot);
    let color = COLOR_POOL[slot % COLOR_POOL.len()].to_string();
    // Display name defaults to the identity until a rename arrives.
    let snake = Snake::new(id.clone(), id.clone(), color, slot, spawn);
    self.snakes.insert(id, snake);
    if self.food.is_none() {
      self.spawn_food(now);
    }
  }

  pub fn remove_snake(&mut self, id: &str) {
    self.snakes.remove(id);
    if self.snakes.is_empty() {
      self.reset_world();
    }
  }

  /// Full reset between rounds, once the last snake is gone.
  fn reset_world(&mut self) {
    self.obstacles.clear();
    self.food = None;
    self.tick_ms = self.config.start_tick_ms;
    self.next_spawn_slot = 0;
    tracing::info!("world reset after last disconnect");
  }

  pub fn rename_snake(&mut self, id: &str, name: String) {
    if let Some(snake) = self.snakes.get_mut(id) {
      snake.name = name;
    }
  }

  /// Queues a heading for the next tick's direction commit. Input for an
  /// unknown snake is silently ignored; opposite-direction validation also
  /// happens at commit time, not here.
  pub fn queue_heading(&mut self, id: &str, direction: Direction) {
    if let Some(snake) = self.snakes.get_mut(id) {
      snake.pending_heading = direction;
    }
  }

  pub fn occupied_cells(&self) -> HashSet<Cell> {
    let mut occupied: HashSet<Cell> = HashSet::new();
    for snake in self.snakes.values() {
      occupied.extend(snake.body.iter().copied());
    }
    occupied.extend(self.obstacles.iter().copied());
    if let Some(food) = &self.food {
      occupied.insert(food.cell);
    }
    occupied
  }

  /// Bounded random probing for an unoccupied cell. Under extreme crowding
  /// the budget can run out; the origin fallback is an accepted degradation,
  /// not a failure.
  pub fn find_free_cell(&self, rng: &mut impl Rng) -> Cell {
    let occupied = self.occupied_cells();
    for _ in 0..self.config.free_cell_attempts {
      let cell = Cell {
        x: rng.gen_range(0..self.config.cols),
        y: rng.gen_range(0..self.config.rows),
      };
      if !occupied.contains(&cell) {
        return cell;
      }
    }
    Cell { x: 0, y: 0 }
  }

  /// Cumulative-weight selection over the food table; the last entry absorbs
  /// floating-point rounding at the top of the range.
  pub fn food_spec_for_roll(&self, roll: f64) -> Option<&FoodSpec> {
    let mut cumulative = 0.0;
    for spec in &self.config.food_table {
      cumulative += spec.weight;
      if roll < cumulative {
        return Some(spec);
      }
    }
    self.config.food_table.last()
  }

  pub fn spawn_food(&mut self, now: i64) {
    let mut rng = rand::thread_rng();
    let roll = rng.gen::<f64>();
    let Some(spec) = self.food_spec_for_roll(roll).cloned() else { return };
    let cell = self.find_free_cell(&mut rng);
    self.food = Some(Food {
      cell,
      kind: spec.kind,
      color: spec.color,
      score: spec.score,
      expires_at: spec.lifetime_ms.map(|lifetime| now + lifetime),
    });
  }

  pub fn add_obstacle(&mut self) {
    let mut rng = rand::thread_rng();
    let cell = self.find_free_cell(&mut rng);
    self.obstacles.push(cell);
  }

  /// One simulation step. The step order is load-bearing; see the per-step
  /// comments. Returns whether the shared tick interval changed so the
  /// caller can re-arm its timer.
  pub fn tick(&mut self, now: i64) -> bool {
    let previous_tick_ms = self.tick_ms;

    // 1. Expired food vanishes and relocates, no score implications.
    if self
      .food
      .as_ref()
      .is_some_and(|food| food.expires_at.is_some_and(|at| now >= at))
    {
      self.spawn_food(now);
    }

    // 2. Commit pending headings; a reversal is dropped, not an error.
    for snake in self.snakes.values_mut() {
      if !snake.pending_heading.is_opposite(snake.heading) {
        snake.heading = snake.pending_heading;
      }
    }

    // 3. Project every candidate head from the pre-tick positions.
    let mut candidates: Vec<(String, Cell)> = Vec::with_capacity(self.snakes.len());
    for (id, snake) in &self.snakes {
      let Some(head) = snake.head() else { continue };
      candidates.push((id.clone(), grid::step(head, snake.heading)));
    }

    // 4. A candidate cell shared by two or more snakes kills all of them.
    let mut head_counts: HashMap<Cell, u32> = HashMap::new();
    for (_, cell) in &candidates {
      *head_counts.entry(*cell).or_insert(0) += 1;
    }
    let mut doomed: HashSet<String> = HashSet::new();
    for (id, cell) in &candidates {
      if head_counts.get(cell).copied().unwrap_or(0) >= 2 {
        doomed.insert(id.clone());
      }
    }

    // 5. Walls, obstacles, and every pre-move body. The check deliberately
    // includes each tail cell that this same tick will pop.
    let bodies: Vec<VecDeque<Cell>> = self.snakes.values().map(|snake| snake.body.clone()).collect();
    for (id, cell) in &candidates {
      if doomed.contains(id) {
        continue;
      }
      let hits_wall = !grid::in_bounds(*cell, self.config.cols, self.config.rows);
      let hits_obstacle = self.obstacles.contains(cell);
      let hits_body = bodies.iter().any(|body| body.contains(cell));
      if hits_wall || hits_obstacle || hits_body {
        doomed.insert(id.clone());
      }
    }

    // 6. Survivors move: new head goes on unconditionally, the tail is
    // settled in steps 7 and 8.
    for (id, cell) in &candidates {
      if doomed.contains(id) {
        continue;
      }
      if let Some(snake) = self.snakes.get_mut(id) {
        snake.body.push_front(*cell);
      }
    }

    // 7./8. Food consumption for the snake that landed on it; tail
    // truncation for everyone else.
    let golden_extra_growth = self.config.golden_extra_growth;
    let poison_shrink = self.config.poison_shrink;
    for (id, cell) in &candidates {
      if doomed.contains(id) {
        continue;
      }
      let eaten = match &self.food {
        Some(food) if food.cell == *cell => Some((food.kind, food.score)),
        _ => None,
      };
      match eaten {
        Some((kind, score)) => {
          if let Some(snake) = self.snakes.get_mut(id) {
            snake.score = (snake.score + score).max(0);
            match kind {
              FoodKind::Golden => snake.extra_growth += golden_extra_growth,
              FoodKind::Poison => {
                for _ in 0..poison_shrink {
                  if snake.body.len() > 1 {
                    snake.body.pop_back();
                  }
                }
              }
              FoodKind::Normal => {}
            }
          }
          self.spawn_food(now);
        }
        None => {
          if let Some(snake) = self.snakes.get_mut(id) {
            if snake.extra_growth > 0 {
              snake.extra_growth -= 1;
            } else if snake.body.len() > 1 {
              snake.body.pop_back();
            }
          }
        }
      }
    }

    // 9. Milestones: one obstacle and one speed step per newly crossed
    // score threshold, shared interval floored at the minimum.
    let milestone_score = self.config.milestone_score;
    let mut escalations: u32 = 0;
    for (id, _) in &candidates {
      if doomed.contains(id) {
        continue;
      }
      let Some(snake) = self.snakes.get_mut(id) else { continue };
      if snake.score <= 0 {
        continue;
      }
      let reached = snake.score / milestone_score;
      if reached > snake.milestone {
        snake.milestone = reached;
        escalations += 1;
        tracing::debug!(snake_id = id.as_str(), milestone = reached, "milestone reached");
      }
    }
    for _ in 0..escalations {
      self.add_obstacle();
      self.tick_ms = self
        .tick_ms
        .saturating_sub(self.config.speed_step_ms)
        .max(self.config.min_tick_ms);
    }

    // 10. Batch reset. The snakes keep existing and keep receiving input.
    for id in &doomed {
      let slot = match self.snakes.get(id) {
        Some(snake) => snake.spawn_slot,
        None => continue,
      };
      let spawn = self.config.spawn_cell(slot);
      if let Some(snake) = self.snakes.get_mut(id) {
        tracing::debug!(snake_id = id.as_str(), "snake reset after fatal collision");
        snake.reset(spawn);
      }
    }

    self.tick_ms != previous_tick_ms
  }
}
