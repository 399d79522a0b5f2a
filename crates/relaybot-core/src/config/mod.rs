//! Configuration system — schema, loading, and env var overrides.
//!
//! # Usage
//! ```no_run
//! use relaybot_core::config;
//!
//! let cfg = config::load_config(None);
//! cfg.validate().expect("config is incomplete");
//! println!("Default provider: {}", cfg.relay.default_provider);
//! ```

pub mod loader;
pub mod schema;

// Re-export key types
pub use loader::{get_config_path, load_config, save_config};
pub use schema::{Config, ConfigError, GatesConfig, ProviderConfig, RelayConfig};
