//! Deterministic Name Derivation
//!
//! Derives collision-free resource names from a target identity
//! (address + qualified name). The same identity always yields the
//! same pair of names, so no mapping from identity to names is ever
//! stored — names are re-derived on demand.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Number of hex characters of the identity digest kept in a name
const DIGEST_PREFIX_LEN: usize = 8;

// =============================================================================
// Name Kind
// =============================================================================

/// The two resource kinds a single attachment allocates names for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameKind {
    /// Backing iSCSI bdev on the control plane
    Iscsi,
    /// Emulated virtio-blk front-end device
    Blk,
}

impl NameKind {
    /// Prefix distinguishing this kind; distinct prefixes guarantee
    /// names of different kinds never collide
    pub fn prefix(&self) -> &'static str {
        match self {
            NameKind::Iscsi => "iscsi",
            NameKind::Blk => "blk",
        }
    }
}

impl std::fmt::Display for NameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.prefix())
    }
}

// =============================================================================
// Derivation
// =============================================================================

/// Compute the 8-hex-char digest identifying one (address, qualified name)
/// pair. Shared by both name kinds of the same attachment; also used as
/// the per-identity lock key.
pub fn identity_digest(address: &str, qualified_name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}_{}", address, qualified_name).as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..DIGEST_PREFIX_LEN].to_string()
}

/// Derive the resource name for one kind of one identity.
/// Pure and deterministic; never fails.
pub fn derive_name(kind: NameKind, address: &str, qualified_name: &str) -> String {
    format!("{}{}", kind.prefix(), identity_digest(address, qualified_name))
}
