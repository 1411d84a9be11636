//! Application constants
//!
//! Centralized location for magic strings and configuration defaults.

/// Default per-request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of history entries returned by a bounded read
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Display label meaning "no environment selected"
pub const NO_ENVIRONMENT: &str = "(no env)";

/// Name given to imported rows that carry no name
pub const IMPORTED_NAME: &str = "imported";

/// Config directory under the user's home
pub const CONFIG_DIR_NAME: &str = ".courier";

/// Config file inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// SQLite database file inside the config directory
pub const DATABASE_FILE_NAME: &str = "requests.db";

/// Log file written by the binary
pub const LOG_FILE_NAME: &str = "courier.log";

/// Application name
pub const APP_NAME: &str = "courier";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
