use serde::{Deserialize, Serialize};

use crate::domain::utils::id::FileId;

/// A named unit of data read or written by tasks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataFile {
    pub id: FileId,
    /// Size in bytes.
    pub size: u64,
}

impl DataFile {
    pub fn new(id: impl Into<FileId>, size: u64) -> Self {
        Self { id: id.into(), size }
    }
}
