//! Configuration management
//!
//! Serde-backed configuration with per-field defaults, so a partial (or
//! absent) config file always yields a fully-populated `BotConfig`.

mod storage;
pub mod types;

pub use storage::{load_config, save_config};
pub use types::{BotConfig, LoginConfig, OAuthConfig, TwoFactorConfig};
