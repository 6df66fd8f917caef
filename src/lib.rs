pub mod app;
pub mod connectors;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;

pub use error::{ErrorKind, GatewayError};
