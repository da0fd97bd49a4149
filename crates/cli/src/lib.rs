pub mod logging;
pub mod remote;
pub mod shell;
pub mod state;

pub use shell::Session;
pub use state::{AppConfig, AppState, StateError};
