//! RPC Module
//!
//! Synchronous invocation of the external control-plane command-line
//! tools. Knows nothing about naming or workflows.

pub mod executor;

pub use executor::*;
