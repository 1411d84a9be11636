//! Variable layer - environment selection and `{{NAME}}` expansion
//!
//! Lookup of the selected environment's stored row lives in the storage
//! layer; everything here is pure.

pub mod environment;
pub mod expand;

pub use environment::{parse_variables, EnvironmentSelection};
pub use expand::{expand, expand_opt, unresolved_tokens};
