//! Configuration module for node-core
//!
//! This module provides configuration types and loading utilities.
//!
//! # Example
//!
//! ```no_run
//! use node_core::config::{load_config, CoreConfig};
//!
//! let config = load_config("/etc/node-core/config.json").unwrap();
//! println!("Online window: {}s", config.node.online_window_secs);
//! ```

mod loader;
mod types;

pub use loader::{
    apply_env_overrides, create_default_config, load_config, load_config_str,
    load_config_with_env, ENV_EXPIRING_SOON_DAYS, ENV_LOG_LEVEL, ENV_ONLINE_WINDOW_SECS,
};
pub use types::{CoreConfig, LogConfig, NodePolicy};
