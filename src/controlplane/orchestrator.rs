//! Attach/Detach Orchestrator
//!
//! Sequences control-plane commands to attach an iSCSI-backed volume
//! to a VM as a virtio-blk device, and to detach it again. Names come
//! from the [`NameRegistry`]; each name is recorded only after the
//! corresponding creation command is confirmed successful, and
//! released only after the corresponding deletion command succeeds
//! (or after a best-effort rollback delete).
//!
//! Per logical attachment the state machine is
//! `absent -> bdev_created -> attached`, inferred entirely from name
//! set membership; no explicit state field exists.

use crate::error::{Error, Result};
use crate::registry::{identity_digest, NameKind, NameRegistry};
use crate::rpc::CommandRunner;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

// =============================================================================
// Constants
// =============================================================================

/// Pause between front-end teardown and backing-store teardown, letting
/// the control plane drain in-flight I/O against the front-end device
/// before its backing bdev is removed. Duration inherited from the
/// deployed control plane; not confirmed against its drain semantics.
pub const DETACH_QUIESCE_DELAY: Duration = Duration::from_secs(10);

// =============================================================================
// Orchestrator Configuration
// =============================================================================

/// Configuration for the attach/detach orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Command-line tool managing bdev lifecycle
    pub bdev_rpc_program: String,
    /// Command-line tool managing virtio-blk device lifecycle
    pub device_rpc_program: String,
    /// CPU affinity mask passed to front-end device creation
    pub cpumask: String,
    /// Queue count passed to front-end device creation
    pub num_queues: u32,
    /// ROM index passed to front-end device creation
    pub rom_index: u32,
    /// Quiescence delay applied on detach; fixed per call
    pub quiesce_delay: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            bdev_rpc_program: "nbl_stor_rpc.py".to_string(),
            device_rpc_program: "nbl_rpc.py".to_string(),
            cpumask: "0x2".to_string(),
            num_queues: 1,
            rom_index: 0,
            quiesce_delay: DETACH_QUIESCE_DELAY,
        }
    }
}

// =============================================================================
// Operation Outcomes
// =============================================================================

/// Result of a successful attach
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectOutcome {
    pub result: String,
    pub bdev_name: String,
    pub device_name: String,
}

/// Result of a successful detach
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisconnectOutcome {
    pub result: String,
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Orchestrates attach/detach workflows against the storage control plane
pub struct AttachOrchestrator {
    config: OrchestratorConfig,
    registry: NameRegistry,
    runner: Arc<dyn CommandRunner>,
    /// Serializes workflows per identity so two concurrent connects for
    /// the same volume cannot both pass the collision check. Workflows
    /// for different identities run concurrently. Entries are never
    /// evicted: the table grows with the number of distinct identities
    /// ever seen, which is assumed small over a process lifetime.
    identity_locks: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
}

impl AttachOrchestrator {
    pub fn new(
        config: OrchestratorConfig,
        registry: NameRegistry,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            config,
            registry,
            runner,
            identity_locks: DashMap::new(),
        }
    }

    /// Attach the volume identified by (qualified_name, address):
    /// create the backing iSCSI bdev, then the virtio-blk front-end
    /// device backed by it. A front-end failure rolls the bdev back
    /// and surfaces the original error, never the rollback's own.
    pub async fn connect(&self, qualified_name: &str, address: &str) -> Result<ConnectOutcome> {
        let lock = self.identity_lock(address, qualified_name);
        let _guard = lock.lock().await;

        info!(
            "Connecting cloud disk: address={}, iqn={}",
            address, qualified_name
        );

        let bdev_name = self.create_iscsi_bdev(qualified_name, address).await?;

        let device_name = match self
            .create_blk_device(&bdev_name, qualified_name, address)
            .await
        {
            Ok(name) => name,
            Err(e) => {
                self.rollback_bdev(&bdev_name).await;
                return Err(e);
            }
        };

        info!(
            "Connected cloud disk: bdev={}, device={}",
            bdev_name, device_name
        );

        Ok(ConnectOutcome {
            result: "Cloud disk connected successfully.".to_string(),
            bdev_name,
            device_name,
        })
    }

    /// Detach the volume identified by (qualified_name, address):
    /// delete the front-end device, wait out the quiescence delay,
    /// then delete the backing bdev. No rollback on failure — a retry
    /// resumes from whichever names remain recorded.
    pub async fn disconnect(
        &self,
        qualified_name: &str,
        address: &str,
    ) -> Result<DisconnectOutcome> {
        let lock = self.identity_lock(address, qualified_name);
        let _guard = lock.lock().await;

        info!(
            "Disconnecting cloud disk: address={}, iqn={}",
            address, qualified_name
        );

        let device_name = self.registry.lookup(NameKind::Blk, address, qualified_name);
        let bdev_name = self
            .registry
            .lookup(NameKind::Iscsi, address, qualified_name);

        if device_name.is_none() && bdev_name.is_none() {
            return Err(Error::NameNotFound {
                name: crate::registry::derive_name(NameKind::Blk, address, qualified_name),
            });
        }

        if let Some(device_name) = &device_name {
            self.delete_blk_device(device_name).await?;
        }

        if let Some(bdev_name) = &bdev_name {
            if device_name.is_some() {
                // Mandatory drain window; not cancellable once entered
                tokio::time::sleep(self.config.quiesce_delay).await;
            }
            self.delete_iscsi_bdev(bdev_name).await?;
        }

        info!(
            "Disconnected cloud disk: address={}, iqn={}",
            address, qualified_name
        );

        Ok(DisconnectOutcome {
            result: "Cloud disk disconnected successfully.".to_string(),
        })
    }

    /// Sorted snapshot of every allocated name, for diagnostics
    pub fn list_allocated(&self) -> Vec<String> {
        self.registry.list()
    }

    // =========================================================================
    // Workflow Steps
    // =========================================================================

    async fn create_iscsi_bdev(&self, qualified_name: &str, address: &str) -> Result<String> {
        let name = self
            .registry
            .allocate(NameKind::Iscsi, address, qualified_name)?;

        let args = vec![
            "bdev_iscsi_create".to_string(),
            "-b".to_string(),
            name.clone(),
            "-i".to_string(),
            format!("{}/0", qualified_name),
            "--url".to_string(),
            format!("iscsi://{}/{}/0", address, qualified_name),
        ];

        self.runner.run(&self.config.bdev_rpc_program, &args).await?;
        self.registry.record(&name);
        Ok(name)
    }

    async fn create_blk_device(
        &self,
        bdev_name: &str,
        qualified_name: &str,
        address: &str,
    ) -> Result<String> {
        let name = self
            .registry
            .allocate(NameKind::Blk, address, qualified_name)?;

        let args = vec![
            "emulator_virtio_blk_device_create".to_string(),
            "--name".to_string(),
            name.clone(),
            "--cpumask".to_string(),
            self.config.cpumask.clone(),
            "--num_queues".to_string(),
            self.config.num_queues.to_string(),
            "--bdev_name".to_string(),
            bdev_name.to_string(),
            "--rom_idx".to_string(),
            self.config.rom_index.to_string(),
        ];

        self.runner
            .run(&self.config.device_rpc_program, &args)
            .await?;
        self.registry.record(&name);
        Ok(name)
    }

    async fn delete_blk_device(&self, device_name: &str) -> Result<()> {
        let args = vec![
            "emulator_virtio_blk_device_delete".to_string(),
            "--name".to_string(),
            device_name.to_string(),
        ];

        self.runner
            .run(&self.config.device_rpc_program, &args)
            .await?;
        self.registry.release(device_name);
        Ok(())
    }

    async fn delete_iscsi_bdev(&self, bdev_name: &str) -> Result<()> {
        let args = vec!["bdev_iscsi_delete".to_string(), bdev_name.to_string()];

        self.runner.run(&self.config.bdev_rpc_program, &args).await?;
        self.registry.release(bdev_name);
        Ok(())
    }

    /// Best-effort unwind of a bdev left behind by a failed attach.
    /// The name is released whether or not the delete succeeds; a
    /// rollback failure is logged and never surfaced to the caller.
    async fn rollback_bdev(&self, bdev_name: &str) {
        warn!("Rolling back iSCSI bdev after failed attach: {}", bdev_name);

        let args = vec!["bdev_iscsi_delete".to_string(), bdev_name.to_string()];
        if let Err(e) = self.runner.run(&self.config.bdev_rpc_program, &args).await {
            error!("Rollback delete failed for {}: {}", bdev_name, e);
        }

        self.registry.release(bdev_name);
    }

    fn identity_lock(&self, address: &str, qualified_name: &str) -> Arc<tokio::sync::Mutex<()>> {
        let key = identity_digest(address, qualified_name);
        self.identity_locks
            .entry(key)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}
