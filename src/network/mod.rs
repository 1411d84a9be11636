//! Network layer - HTTP request execution
//!
//! The dispatcher owns the pooled transport and turns a resolved request
//! into a response record or a typed failure.

pub mod client;

pub use client::{create_client, Dispatcher};
