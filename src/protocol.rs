use crate::game::grid::{Cell, Direction};
use crate::game::types::FoodKind;
use crate::game::world::World;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
  #[serde(rename = "newPlayer")]
  NewPlayer { name: Option<String> },
  #[serde(rename = "move")]
  Move { direction: Direction },
}

/// All wire coordinates are in pixels; clients divide by `cellSize` if they
/// need grid indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PixelPoint {
  pub x: i32,
  pub y: i32,
}

#[derive(Debug, Serialize)]
pub struct FoodPayload {
  pub x: i32,
  pub y: i32,
  #[serde(rename = "type")]
  pub kind: FoodKind,
  pub color: String,
  pub score: i64,
  #[serde(rename = "expiresAt", skip_serializing_if = "Option::is_none")]
  pub expires_at: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SnakePayload {
  pub id: String,
  pub color: String,
  pub body: Vec<PixelPoint>,
  pub score: i64,
  pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
  #[serde(rename = "init")]
  Init {
    id: String,
    width: i32,
    height: i32,
    #[serde(rename = "cellSize")]
    cell_size: i32,
  },
  #[serde(rename = "state")]
  State {
    width: i32,
    height: i32,
    #[serde(rename = "cellSize")]
    cell_size: i32,
    #[serde(rename = "tickIntervalMs")]
    tick_interval_ms: u64,
    food: Option<FoodPayload>,
    obstacles: Vec<PixelPoint>,
    snakes: Vec<SnakePayload>,
  },
}

fn to_pixels(cell: Cell, cell_size: i32) -> PixelPoint {
  PixelPoint {
    x: cell.x * cell_size,
    y: cell.y * cell_size,
  }
}

pub fn init_message(world: &World, snake_id: &str) -> ServerMessage {
  ServerMessage::Init {
    id: snake_id.to_string(),
    width: world.config.pixel_width(),
    height: world.config.pixel_height(),
    cell_size: world.config.cell_size,
  }
}

/// The read-only per-tick projection. Runs after all tick mutations settle
/// and must not touch engine state.
pub fn state_message(world: &World) -> ServerMessage {
  let cell_size = world.config.cell_size;
  let food = world.food.as_ref().map(|food| {
    let point = to_pixels(food.cell, cell_size);
    FoodPayload {
      x: point.x,
      y: point.y,
      kind: food.kind,
      color: food.color.clone(),
      score: food.score,
      expires_at: food.expires_at,
    }
  });
  let obstacles = world
    .obstacles
    .iter()
    .map(|cell| to_pixels(*cell, cell_size))
    .collect();
  let mut snakes: Vec<SnakePayload> = world
    .snakes
    .values()
    .map(|snake| SnakePayload {
      id: snake.id.clone(),
      color: snake.color.clone(),
      body: snake
        .body
        .iter()
        .map(|cell| to_pixels(*cell, cell_size))
        .collect(),
      score: snake.score,
      name: snake.name.clone(),
    })
    .collect();
  snakes.sort_by(|a, b| a.id.cmp(&b.id));

  ServerMessage::State {
    width: world.config.pixel_width(),
    height: world.config.pixel_height(),
    cell_size,
    tick_interval_ms: world.tick_ms,
    food,
    obstacles,
    snakes,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::game::config::GameConfig;
  use crate::game::types::Food;
  use serde_json::json;

  #[test]
  fn decode_new_player_and_move() {
    let message: ClientMessage =
      serde_json::from_str(r#"{"type":"newPlayer","name":"Ada"}"#).expect("message");
    match message {
      ClientMessage::NewPlayer { name } => assert_eq!(name.as_deref(), Some("Ada")),
      _ => panic!("unexpected message"),
    }

    let message: ClientMessage =
      serde_json::from_str(r#"{"type":"move","direction":"LEFT"}"#).expect("message");
    match message {
      ClientMessage::Move { direction } => assert_eq!(direction, Direction::Left),
      _ => panic!("unexpected message"),
    }
  }

  #[test]
  fn unknown_or_malformed_input_fails_to_parse() {
    assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"teleport"}"#).is_err());
    assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"move","direction":"BACK"}"#).is_err());
    assert!(serde_json::from_str::<ClientMessage>("not json").is_err());
  }

  #[test]
  fn state_message_uses_the_wire_field_names() {
    let mut world = World::new(GameConfig::default());
    world.add_snake("snake-1".to_string(), 0);
    world.food = Some(Food {
      cell: Cell { x: 3, y: 2 },
      kind: FoodKind::Golden,
      color: "#f1c40f".to_string(),
      score: 3,
      expires_at: Some(5000),
    });
    world.obstacles.push(Cell { x: 5, y: 5 });

    let value = serde_json::to_value(state_message(&world)).expect("json");
    assert_eq!(value["type"], json!("state"));
    assert_eq!(value["width"], json!(400));
    assert_eq!(value["height"], json!(400));
    assert_eq!(value["cellSize"], json!(20));
    assert_eq!(value["tickIntervalMs"], json!(200));
    assert_eq!(value["food"]["x"], json!(60));
    assert_eq!(value["food"]["y"], json!(40));
    assert_eq!(value["food"]["type"], json!("golden"));
    assert_eq!(value["food"]["expiresAt"], json!(5000));
    assert_eq!(value["obstacles"][0]["x"], json!(100));
    assert_eq!(value["snakes"][0]["id"], json!("snake-1"));
    assert_eq!(value["snakes"][0]["name"], json!("snake-1"));
    assert_eq!(value["snakes"][0]["body"][0]["x"], json!(20));
    assert_eq!(value["snakes"][0]["score"], json!(0));
  }

  #[test]
  fn expiry_is_omitted_for_plain_food() {
    let mut world = World::new(GameConfig::default());
    world.food = Some(Food {
      cell: Cell { x: 1, y: 1 },
      kind: FoodKind::Normal,
      color: "#e74c3c".to_string(),
      score: 1,
      expires_at: None,
    });

    let value = serde_json::to_value(state_message(&world)).expect("json");
    assert!(value["food"].get("expiresAt").is_none());
  }

  #[test]
  fn init_message_carries_board_dimensions() {
    let world = World::new(GameConfig::default());
    let value = serde_json::to_value(init_message(&world, "snake-9")).expect("json");
    assert_eq!(value["type"], json!("init"));
    assert_eq!(value["id"], json!("snake-9"));
    assert_eq!(value["width"], json!(400));
    assert_eq!(value["cellSize"], json!(20));
  }
}
