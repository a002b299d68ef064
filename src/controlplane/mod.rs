//! Control Plane Module
//!
//! The attach/detach workflow engine that sequences control-plane
//! commands and keeps the name registry consistent with them,
//! including rollback of partially completed attaches.

pub mod orchestrator;

pub use orchestrator::*;
