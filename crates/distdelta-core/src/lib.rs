pub mod error;
pub mod config;

pub mod checksum;
pub mod identity;
pub mod db;
pub mod lineage;
pub mod archive;
pub mod tool;
pub mod provider;
pub mod catalog;
pub mod diff;
pub mod patch;
pub mod batch;

pub use crate::error::{DeltaError, Result};
pub use crate::checksum::{Algorithm, ChecksumSet, ChecksumValue, Form};
pub use crate::identity::FileIdentity;
pub use crate::db::{DeltaDatabase, DeltaRecord};
pub use crate::config::Config;
pub use crate::diff::{DiffGenerator, DiffPair, GenerateOutcome};
pub use crate::patch::{PatchChainResolver, ReconstructOutcome};
pub use crate::batch::Session;
