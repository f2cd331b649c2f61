// crates/distdelta-cli/src/cmd/patch.rs

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use distdelta_core::batch::{PatchOutcome, Session};
use distdelta_core::catalog::{CatalogProvider, DistdirFetcher};
use distdelta_core::{Config, DeltaDatabase, ReconstructOutcome};

use crate::cmd::{external_tool, ToolArgs};

#[derive(Args)]
pub struct PatchArgs {
    /// Package version (category/package-version)
    pub cpv: String,

    /// Delta database file
    #[arg(short = 'd', long)]
    pub db: PathBuf,

    /// Package catalogue (TOML) listing versions and their archives
    #[arg(long)]
    pub catalog: PathBuf,

    /// Local distfiles directory (chain starting points)
    #[arg(long)]
    pub distdir: PathBuf,

    /// Directory holding the delta files
    #[arg(long)]
    pub deltas: PathBuf,

    /// Where reconstructed archives are written
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// Leave reconstructed archives uncompressed
    #[arg(short = 'c', long)]
    pub no_compress: bool,

    #[command(flatten)]
    pub tools: ToolArgs,
}

pub fn run(args: PatchArgs) -> anyhow::Result<bool> {
    let mut config = Config::default();
    args.tools.apply(&mut config);

    let provider = CatalogProvider::load(&args.catalog)
        .with_context(|| format!("load catalog {}", args.catalog.display()))?;
    let fetcher = DistdirFetcher::new(args.distdir.clone(), Vec::new());
    let tool = external_tool(&config);
    let db = DeltaDatabase::load(&args.db)
        .with_context(|| format!("load delta database {}", args.db.display()))?;

    let session = Session {
        config: &config,
        provider: &provider,
        fetcher: &fetcher,
        tool: &tool,
    };
    let reports = session
        .patch_version(&args.cpv, &db, &args.deltas, &args.output, !args.no_compress)
        .with_context(|| format!("patch {}", args.cpv))?;

    let mut clean = true;
    for report in &reports {
        match &report.result {
            Ok(PatchOutcome::AlreadyAvailable(path)) => {
                eprintln!("patch skipped: {} local={}", report.archive, path.display())
            }
            Ok(PatchOutcome::Rebuilt(ReconstructOutcome::Reconstructed(path))) => {
                eprintln!("patch ok: {} out={}", report.archive, path.display())
            }
            Ok(PatchOutcome::Rebuilt(ReconstructOutcome::Quarantined(path))) => {
                eprintln!("patch quarantined: {} out={}", report.archive, path.display())
            }
            Ok(PatchOutcome::NoChain) => {
                clean = false;
                eprintln!("patch failed: {} error=no delta chain", report.archive)
            }
            Err(e) => {
                clean = false;
                eprintln!("patch failed: {} error={}", report.archive, e)
            }
        }
    }

    Ok(clean)
}
