//! Name Registry Module
//!
//! Deterministic name derivation plus the durable set of names
//! currently allocated on the control plane. Knows nothing about
//! RPC invocation or attach/detach workflows.

pub mod name_registry;
pub mod names;
pub mod store;

pub use name_registry::*;
pub use names::*;
pub use store::*;
