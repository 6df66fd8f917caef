pub mod config;
pub mod logging;
pub mod state;

pub use config::Config;
pub use state::AppState;
