// crates/distdelta-core/src/provider.rs

//! Interfaces to the package metadata and fetching collaborators.

use std::path::PathBuf;

use crate::error::Result;

/// One source archive declared by a package version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Basename.
    pub name: String,
    pub uri: String,
    /// Declared size, when the metadata carries one.
    pub size: Option<u64>,
}

/// Enumerates package versions and their archives.
pub trait MetadataProvider: Send + Sync {
    /// Versions (CPVs) of `atom`, oldest first.
    fn list_versions(&self, atom: &str) -> Result<Vec<String>>;

    /// Archives of one version, in declaration order.
    fn list_archives(&self, cpv: &str) -> Result<Vec<ArchiveEntry>>;
}

/// Makes archives available on local disk.
pub trait Fetcher: Send + Sync {
    /// Returns the local path of `archive`, fetching it first if needed.
    fn fetch(&self, archive: &ArchiveEntry) -> Result<PathBuf>;

    /// Basenames already present locally.
    fn local_names(&self) -> Result<Vec<String>>;
}
