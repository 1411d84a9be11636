//! App layer - request orchestration
//!
//! The workbench takes a draft from the presentation layer, expands it with
//! the selected environment, hands it to the network layer, and records the
//! result in history.

pub mod draft;
pub mod workbench;

pub use draft::{parse_headers, RequestDraft};
pub use workbench::{Execution, Workbench};
