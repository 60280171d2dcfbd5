pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod messages;
pub mod paths;
pub mod projector;
pub mod results;
pub mod scheduler;
pub mod session;
pub mod task;
pub mod tui;

pub use engine::Engine;
pub use error::EngineError;
