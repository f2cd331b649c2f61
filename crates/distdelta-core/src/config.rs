// crates/distdelta-core/src/config.rs

use std::path::PathBuf;
use std::time::Duration;

use crate::archive::Compression;
use crate::tool::ToolRunner;

pub const DEFAULT_BINDIR: &str = "/usr/bin";

/// The only format the external tools are driven with today.
pub const DEFAULT_PATCH_FORMAT: &str = "switching";

/// Archives above this declared size are never handed to the differ.
pub const DEFAULT_MAX_ARCHIVE_SIZE: u64 = 256 * 1024 * 1024;

/// Subdirectory (of the patch output directory) receiving reconstructions
/// whose content verified but whose recompressed bytes differ.
pub const QUARANTINE_DIR: &str = "delta-reconstructed";

#[derive(Clone, Debug)]
pub struct Config {
    /// Directory holding `differ` and `patcher`.
    pub bindir: PathBuf,
    pub patch_format: String,
    pub max_archive_size: u64,
    /// Applies to every external process (differ, patcher, compressors).
    pub tool_timeout: Option<Duration>,
    /// `None` leaves generated deltas uncompressed.
    pub delta_compression: Option<Compression>,
    /// Remove the uncompressed working copies once a delta is produced.
    pub clean_sources: bool,
    /// Regenerate deltas that already exist in the output directory.
    pub force: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bindir: PathBuf::from(DEFAULT_BINDIR),
            patch_format: DEFAULT_PATCH_FORMAT.to_string(),
            max_archive_size: DEFAULT_MAX_ARCHIVE_SIZE,
            tool_timeout: None,
            delta_compression: Some(Compression::Xz),
            clean_sources: true,
            force: false,
        }
    }
}

impl Config {
    pub fn runner(&self) -> ToolRunner {
        ToolRunner::new(self.tool_timeout)
    }
}
