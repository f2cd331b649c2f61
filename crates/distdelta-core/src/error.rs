// crates/distdelta-core/src/error.rs

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DeltaError>;

#[derive(Debug, Error)]
pub enum DeltaError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed checksum: {0}")]
    MalformedChecksum(String),

    #[error("malformed record #{index}: {reason}")]
    MalformedRecord { index: usize, reason: String },

    #[error("invalid comparison: {0}")]
    InvalidComparison(String),

    #[error("unsupported distfile: {0}")]
    UnsupportedDistfile(String),

    #[error("metadata error: {0}")]
    Metadata(String),

    #[error("delta database write failed: {0}")]
    Database(String),

    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("diff tool failed: {0}")]
    DiffToolFailed(String),

    #[error("patch tool failed: {0}")]
    PatchToolFailed(String),

    #[error("compression failed: {0}")]
    CompressionFailed(String),

    #[error("delta validation failed: {0}")]
    DeltaValidationFailed(String),

    #[error("inconsistent patch format: {0}")]
    InconsistentPatchFormat(String),

    #[error("broken chain: {0}")]
    BrokenChain(String),

    #[error("checksum mismatch for {role}: {file}")]
    ChecksumMismatch { file: String, role: &'static str },

    #[error("reconstructed file has bad checksum: {0}")]
    ReconstructionChecksumMismatch(String),
}

impl DeltaError {
    /// True when the failure is scoped to a single diff pair or reconstruction
    /// and a batch may continue with its next unit.
    pub fn is_unit_failure(&self) -> bool {
        !matches!(
            self,
            DeltaError::MalformedChecksum(_)
                | DeltaError::MalformedRecord { .. }
                | DeltaError::InvalidComparison(_)
                | DeltaError::Database(_)
        )
    }
}
