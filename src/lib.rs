//! Cloud Disk Orchestrator
//!
//! Attaches and detaches network-backed block devices — iSCSI-exposed
//! volumes surfaced to a VM as emulated virtio-blk devices — by driving
//! an external storage control plane through sequenced command
//! invocations.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │               Attach/Detach Orchestrator                │
//! │   connect / disconnect workflows, rollback on failure   │
//! ├────────────────────────────┬────────────────────────────┤
//! │       Name Registry        │      Command Executor      │
//! │  deterministic derivation  │  spawns control-plane RPC  │
//! │  + durable allocated set   │  tools, classifies output  │
//! ├────────────────────────────┴────────────────────────────┤
//! │               External control-plane tools              │
//! │        bdev lifecycle    │    virtio-blk lifecycle      │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`controlplane`]: attach/detach workflow orchestration
//! - [`registry`]: name derivation and the durable allocated-name set
//! - [`rpc`]: external command invocation and outcome classification
//! - [`error`]: error types and handling

pub mod controlplane;
pub mod error;
pub mod registry;
pub mod rpc;

// Re-export commonly used types
pub use controlplane::{
    AttachOrchestrator, ConnectOutcome, DisconnectOutcome, OrchestratorConfig,
    DETACH_QUIESCE_DELAY,
};

pub use registry::{
    derive_name, identity_digest, JsonFileStore, MemoryStore, NameKind, NameRegistry, NameStore,
};

pub use rpc::{CommandRunner, ProcessRunner, RpcOutput};

pub use error::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
