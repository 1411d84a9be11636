//! # Courier
//!
//! A manual HTTP request composer and inspector.
//!
//! ## Features
//! - HTTP methods: GET, POST, PUT, PATCH, DELETE, HEAD, OPTIONS
//! - Named environments with `{{NAME}}` substitution
//! - Reusable templates
//! - Collections of saved requests
//! - Append-only request history
//! - JSON import/export of environments and templates
//! - cURL import/export
//!
//! ## Architecture
//! Layered, leaf-first:
//! - Variables (pure expansion)
//! - Storage (SQLite, one shared connection)
//! - Network (one pooled reqwest client)
//! - App (the workbench gluing the three together)

pub mod app;
pub mod config;
pub mod constants;
pub mod curl;
pub mod error;
pub mod models;
pub mod network;
pub mod storage;
pub mod variables;

// Re-export commonly used types
pub use app::{Execution, RequestDraft, Workbench};
pub use config::Config;
pub use curl::{parse_curl, to_curl};
pub use error::{Error, Result};
pub use models::{
    format_body, Collection, Environment, HistoryEntry, HttpMethod, NewRequest, RequestSpec,
    RequestUpdate, ResponseRecord, SavedRequest, Template,
};
pub use network::Dispatcher;
pub use storage::Store;
pub use variables::{expand, EnvironmentSelection};
