pub mod config;
pub mod error;
pub mod mock;
pub mod types;

pub use config::{Cli, ServerConfig};
pub use error::ServerError;
pub use mock::MockOllamaServer;
