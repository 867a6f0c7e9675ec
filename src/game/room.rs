use super::config::GameConfig;
use super::world::World;
use crate::protocol::{self, ClientMessage};
use crate::shared::names::sanitize_player_name;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex;
use uuid::Uuid;

/// One shared game. All mutation funnels through the state mutex, so input
/// handlers and the tick task serialize and no partial-tick state is ever
/// observable.
#[derive(Debug)]
pub struct Room {
  state: Mutex<RoomState>,
  running: AtomicBool,
}

#[derive(Debug)]
struct SessionEntry {
  sender: UnboundedSender<String>,
  snake_id: String,
}

#[derive(Debug)]
struct RoomState {
  sessions: HashMap<String, SessionEntry>,
  world: World,
}

impl Room {
  pub fn new(config: GameConfig) -> Self {
    Self {
      state: Mutex::new(RoomState {
        sessions: HashMap::new(),
        world: World::new(config),
      }),
      running: AtomicBool::new(false),
    }
  }

  /// Registers a connection, creates its snake at the next spawn slot, and
  /// sends the one-time init payload. Starts the tick loop if it is parked.
  pub async fn add_session(self: &Arc<Self>, sender: UnboundedSender<String>) -> String {
    let session_id = Uuid::new_v4().to_string();
    {
      let mut state = self.state.lock().await;
      state.handle_connect(&session_id, sender);
    }
    self.ensure_loop();
    session_id
  }

  pub async fn remove_session(&self, session_id: &str) {
    let mut state = self.state.lock().await;
    state.disconnect_session(session_id);
  }

  pub async fn handle_text_message(&self, session_id: &str, text: &str) {
    let Ok(message) = serde_json::from_str::<ClientMessage>(text) else { return };
    let mut state = self.state.lock().await;
    match message {
      ClientMessage::NewPlayer { name } => state.handle_new_player(session_id, name),
      ClientMessage::Move { direction } => state.handle_move(session_id, direction),
    }
  }

  pub async fn session_count(&self) -> usize {
    self.state.lock().await.sessions.len()
  }

  fn ensure_loop(self: &Arc<Self>) {
    if self
      .running
      .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
      .is_err()
    {
      return;
    }

    let room = Arc::clone(self);
    tokio::spawn(async move {
      loop {
        // Read the interval fresh each pass; milestone speed-ups change the
        // schedule from the next tick onward, never mid-tick.
        let sleep_ms = {
          let state = room.state.lock().await;
          if state.sessions.is_empty() {
            room.running.store(false, Ordering::SeqCst);
            break;
          }
          state.world.tick_ms
        };
        tokio::time::sleep(Duration::from_millis(sleep_ms)).await;

        let mut state = room.state.lock().await;
        if state.sessions.is_empty() {
          room.running.store(false, Ordering::SeqCst);
          break;
        }
        if state.world.tick(RoomState::now_millis()) {
          tracing::debug!(tick_ms = state.world.tick_ms, "tick interval rearmed");
        }
        state.broadcast_state();
      }
    });
  }
}

impl RoomState {
  fn now_millis() -> i64 {
    SystemTime::now()
      .duration_since(UNIX_EPOCH)
      .unwrap_or_default()
      .as_millis() as i64
  }

  fn handle_connect(&mut self, session_id: &str, sender: UnboundedSender<String>) {
    let snake_id = Uuid::new_v4().to_string();
    self.world.add_snake(snake_id.clone(), Self::now_millis());
    tracing::info!(snake_id = snake_id.as_str(), "snake joined");

    let init = protocol::init_message(&self.world, &snake_id);
    let entry = SessionEntry { sender, snake_id };
    if let Ok(payload) = serde_json::to_string(&init) {
      let _ = entry.sender.send(payload);
    }
    self.sessions.insert(session_id.to_string(), entry);
  }

  fn disconnect_session(&mut self, session_id: &str) {
    let Some(entry) = self.sessions.remove(session_id) else { return };
    tracing::info!(snake_id = entry.snake_id.as_str(), "snake left");
    self.world.remove_snake(&entry.snake_id);
  }

  /// Rename only; the simulation state of the snake is untouched.
  fn handle_new_player(&mut self, session_id: &str, name: Option<String>) {
    let Some(snake_id) = self.session_snake_id(session_id) else { return };
    let raw_name = name.unwrap_or_else(|| "Player".to_string());
    let sanitized = sanitize_player_name(&raw_name, "Player");
    self.world.rename_snake(&snake_id, sanitized);
  }

  /// Inputs only ever queue; the next tick's direction commit applies and
  /// validates them, so an input burst cannot move a snake twice in a tick.
  fn handle_move(&mut self, session_id: &str, direction: crate::game::grid::Direction) {
    let Some(snake_id) = self.session_snake_id(session_id) else { return };
    self.world.queue_heading(&snake_id, direction);
  }

  fn session_snake_id(&self, session_id: &str) -> Option<String> {
    self
      .sessions
      .get(session_id)
      .map(|entry| entry.snake_id.clone())
  }

  fn broadcast_state(&mut self) {
    let Ok(payload) = serde_json::to_string(&protocol::state_message(&self.world)) else { return };
    let mut stale = Vec::new();
    for (session_id, session) in &self.sessions {
      if session.sender.send(payload.clone()).is_err() {
        stale.push(session_id.clone());
      }
    }
    for session_id in stale {
      self.disconnect_session(&session_id);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::game::grid::Direction;
  use serde_json::Value;
  use tokio::sync::mpsc;

  fn make_state() -> RoomState {
    RoomState {
      sessions: HashMap::new(),
      world: World::new(GameConfig::default()),
    }
  }

  fn connect(state: &mut RoomState, session_id: &str) -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    state.handle_connect(session_id, tx);
    rx
  }

  #[test]
  fn connect_creates_a_snake_and_sends_init() {
    let mut state = make_state();
    let mut rx = connect(&mut state, "session-1");

    assert_eq!(state.world.snakes.len(), 1);
    assert!(state.world.food.is_some());

    let init: Value = serde_json::from_str(&rx.try_recv().expect("init payload")).expect("json");
    assert_eq!(init["type"], "init");
    assert_eq!(init["cellSize"], 20);
    let snake_id = init["id"].as_str().expect("id");
    assert!(state.world.snakes.contains_key(snake_id));
  }

  #[test]
  fn move_queues_a_pending_heading_without_moving() {
    let mut state = make_state();
    let _rx = connect(&mut state, "session-1");
    let snake_id = state.session_snake_id("session-1").expect("snake");
    let head_before = state.world.snakes[snake_id.as_str()].head();

    state.handle_move("session-1", Direction::Down);

    let snake = &state.world.snakes[snake_id.as_str()];
    assert_eq!(snake.pending_heading, Direction::Down);
    assert_eq!(snake.head(), head_before);
  }

  #[test]
  fn new_player_renames_and_leaves_the_simulation_alone() {
    let mut state = make_state();
    let _rx = connect(&mut state, "session-1");
    let snake_id = state.session_snake_id("session-1").expect("snake");
    let body_before: Vec<_> = state.world.snakes[snake_id.as_str()]
      .body
      .iter()
      .copied()
      .collect();

    state.handle_new_player("session-1", Some("  Grace   Hopper  ".to_string()));

    let snake = &state.world.snakes[snake_id.as_str()];
    assert_eq!(snake.name, "Grace Hopper");
    let body_after: Vec<_> = snake.body.iter().copied().collect();
    assert_eq!(body_after, body_before);
  }

  #[test]
  fn input_from_unknown_sessions_is_ignored() {
    let mut state = make_state();
    state.handle_move("ghost", Direction::Up);
    state.handle_new_player("ghost", Some("Ghost".to_string()));
    assert!(state.world.snakes.is_empty());
  }

  #[test]
  fn broadcast_reaches_every_session_and_drops_stale_ones() {
    let mut state = make_state();
    let mut rx1 = connect(&mut state, "session-1");
    let rx2 = connect(&mut state, "session-2");
    let _ = rx1.try_recv();
    drop(rx2);

    state.broadcast_state();

    let payload: Value =
      serde_json::from_str(&rx1.try_recv().expect("state payload")).expect("json");
    assert_eq!(payload["type"], "state");
    assert_eq!(payload["snakes"].as_array().expect("snakes").len(), 2);

    // The dead channel got reaped, and its snake with it.
    assert_eq!(state.sessions.len(), 1);
    assert_eq!(state.world.snakes.len(), 1);
  }

  #[test]
  fn last_disconnect_resets_the_world() {
    let mut state = make_state();
    let _rx1 = connect(&mut state, "session-1");
    let _rx2 = connect(&mut state, "session-2");
    state.world.obstacles.push(crate::game::grid::Cell { x: 9, y: 9 });
    state.world.tick_ms = 120;

    state.disconnect_session("session-1");
    assert_eq!(state.world.snakes.len(), 1);
    assert_eq!(state.world.obstacles.len(), 1);

    state.disconnect_session("session-2");
    assert!(state.world.snakes.is_empty());
    assert!(state.world.obstacles.is_empty());
    assert!(state.world.food.is_none());
    assert_eq!(state.world.tick_ms, state.world.config.start_tick_ms);
  }
}
