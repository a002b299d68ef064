//! Error types for the cloud disk orchestrator
//!
//! Provides structured error types for name registry validation,
//! control-plane command execution, and persistence.

use thiserror::Error;

/// Unified error type for the orchestrator
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Name already allocated: {name}")]
    NameCollision { name: String },

    #[error("Name not allocated: {name}")]
    NameNotFound { name: String },

    // =========================================================================
    // Control Plane Errors
    // =========================================================================
    #[error("Control plane command failed: {command}: {stderr}")]
    ControlPlane {
        command: String,
        stdout: String,
        stderr: String,
    },

    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if this error is a caller-side validation failure
    /// (wrong identity state for the requested operation)
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::NameCollision { .. } | Error::NameNotFound { .. }
        )
    }

    /// Check if this error originated from a control-plane command
    pub fn is_control_plane(&self) -> bool {
        matches!(self, Error::ControlPlane { .. })
    }
}

/// Result type alias for the orchestrator
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let collision = Error::NameCollision {
            name: "iscsi0a1b2c3d".into(),
        };
        assert!(collision.is_validation());
        assert!(!collision.is_control_plane());

        let missing = Error::NameNotFound {
            name: "blk0a1b2c3d".into(),
        };
        assert!(missing.is_validation());

        let rpc = Error::ControlPlane {
            command: "bdev_iscsi_create".into(),
            stdout: String::new(),
            stderr: "target unreachable".into(),
        };
        assert!(rpc.is_control_plane());
        assert!(!rpc.is_validation());
    }

    #[test]
    fn test_control_plane_display_carries_stderr() {
        let err = Error::ControlPlane {
            command: "bdev_iscsi_delete".into(),
            stdout: "partial".into(),
            stderr: "no such bdev".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("bdev_iscsi_delete"));
        assert!(msg.contains("no such bdev"));
    }
}
