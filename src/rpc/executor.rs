//! Control Plane Command Executor
//!
//! Invokes one external control-plane command, captures both output
//! streams in full, and classifies the outcome. The control-plane
//! tools signal failure by writing to stderr even on a zero exit
//! code, so a non-empty error stream is treated as failure regardless
//! of exit status. Output is assumed small (single-line status), so
//! capture is unbounded.
//!
//! No retries and no timeout at this layer: retry policy belongs to
//! the caller, and a hung command hangs the invoking workflow.

use crate::error::{Error, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

// =============================================================================
// RPC Output
// =============================================================================

/// Captured output of one successful command invocation
#[derive(Debug, Clone, Default)]
pub struct RpcOutput {
    pub stdout: String,
    pub stderr: String,
}

// =============================================================================
// Command Runner
// =============================================================================

/// Boundary trait for invoking control-plane commands
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`, blocking the calling workflow until
    /// the process exits
    async fn run(&self, program: &str, args: &[String]) -> Result<RpcOutput>;
}

/// Runner that spawns the real external process
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<RpcOutput> {
        debug!("Executing: {} {}", program, args.join(" "));

        // output() owns the child handle for its full lifetime, so a
        // launch failure cannot leak a process
        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| Error::ControlPlane {
                command: program.to_string(),
                stdout: String::new(),
                stderr: format!("failed to launch {}: {}", program, e),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !stderr.is_empty() {
            return Err(Error::ControlPlane {
                command: program.to_string(),
                stdout,
                stderr,
            });
        }

        if !output.status.success() {
            return Err(Error::ControlPlane {
                command: program.to_string(),
                stdout,
                stderr: format!("exited with {}", output.status),
            });
        }

        info!("{} succeeded: {}", program, stdout.trim());
        Ok(RpcOutput { stdout, stderr })
    }
}
