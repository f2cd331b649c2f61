// crates/distdelta-cli/src/cmd/mod.rs

pub mod diff;
pub mod inspect;
pub mod patch;

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use distdelta_core::config::{Config, DEFAULT_BINDIR, DEFAULT_MAX_ARCHIVE_SIZE, DEFAULT_PATCH_FORMAT};
use distdelta_core::tool::ExternalDeltaTool;

/// Flags shared by every command that runs the external tools.
#[derive(Args, Clone, Debug)]
pub struct ToolArgs {
    /// Directory containing the `differ` and `patcher` binaries
    #[arg(long, env = "DIFFBALL_BINDIR", default_value = DEFAULT_BINDIR)]
    pub diffball_bindir: PathBuf,

    /// Patch format passed to the differ/patcher
    #[arg(long, default_value = DEFAULT_PATCH_FORMAT)]
    pub patch_format: String,

    /// Kill any external tool running longer than this
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Refuse archives whose declared size is larger (bytes)
    #[arg(long, default_value_t = DEFAULT_MAX_ARCHIVE_SIZE)]
    pub max_archive_size: u64,
}

impl ToolArgs {
    pub fn apply(&self, config: &mut Config) {
        config.bindir = self.diffball_bindir.clone();
        config.patch_format = self.patch_format.clone();
        config.tool_timeout = self.timeout_secs.map(Duration::from_secs);
        config.max_archive_size = self.max_archive_size;
    }
}

pub fn external_tool(config: &Config) -> ExternalDeltaTool {
    ExternalDeltaTool::in_dir(&config.bindir, config.runner())
}
