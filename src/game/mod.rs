pub mod config;
pub mod grid;
pub mod room;
pub mod types;
pub mod world;
