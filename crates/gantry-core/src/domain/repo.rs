//! Repository snapshot identity.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Opaque identity of a materialized repository snapshot.
///
/// gantry never clones repositories itself; the caller materializes a file
/// tree and hands over its root plus whatever branch/commit identity it has.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryDescriptor {
    /// Filesystem root of the materialized tree.
    pub root: PathBuf,

    /// Branch name, when known.
    pub branch: Option<String>,

    /// Commit identifier, when known.
    pub commit: Option<String>,
}

impl RepositoryDescriptor {
    /// Descriptor for a local tree with no VCS identity.
    pub fn local(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            branch: None,
            commit: None,
        }
    }
}
