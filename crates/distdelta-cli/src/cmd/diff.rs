// crates/distdelta-cli/src/cmd/diff.rs

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, ValueEnum};
use distdelta_core::archive::Compression;
use distdelta_core::batch::Session;
use distdelta_core::catalog::{CatalogProvider, DistdirFetcher};
use distdelta_core::{Config, DeltaDatabase, GenerateOutcome};

use crate::cmd::{external_tool, ToolArgs};
use crate::io::atoms;

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum DeltaCompression {
    Xz,
    Zstd,
}

impl From<DeltaCompression> for Compression {
    fn from(c: DeltaCompression) -> Self {
        match c {
            DeltaCompression::Xz => Compression::Xz,
            DeltaCompression::Zstd => Compression::Zstd,
        }
    }
}

#[derive(Args)]
pub struct DiffArgs {
    /// Package atoms
    pub packages: Vec<String>,

    /// Delta database file
    #[arg(short = 'd', long)]
    pub db: PathBuf,

    /// Package catalogue (TOML) listing versions and their archives
    #[arg(long)]
    pub catalog: PathBuf,

    /// Local distfiles directory
    #[arg(long)]
    pub distdir: PathBuf,

    /// Extra directories searched for missing archives (repeatable)
    #[arg(long)]
    pub mirror: Vec<PathBuf>,

    /// Output directory for deltas
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// Read line-separated atoms from a file (ignores positional atoms)
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Read line-separated atoms from stdin (ignores positional atoms and --file)
    #[arg(long)]
    pub stdin: bool,

    /// Leave generated deltas uncompressed
    #[arg(short = 'c', long)]
    pub no_compress: bool,

    /// Compressor for generated deltas
    #[arg(long, value_enum, default_value_t = DeltaCompression::Xz)]
    pub delta_compression: DeltaCompression,

    /// Keep the uncompressed sources in the output directory
    #[arg(short, long)]
    pub preserve: bool,

    /// Regenerate deltas that already exist
    #[arg(long)]
    pub force: bool,

    /// Pairs diffed in parallel
    #[arg(short, long, default_value_t = 1)]
    pub jobs: usize,

    #[command(flatten)]
    pub tools: ToolArgs,
}

pub fn run(args: DiffArgs) -> anyhow::Result<bool> {
    let packages = atoms::collect_atoms(&args.packages, args.file.as_deref(), args.stdin)?;
    if packages.is_empty() {
        anyhow::bail!("no package atoms given (positional, --file or --stdin)");
    }

    let mut config = Config::default();
    args.tools.apply(&mut config);
    config.delta_compression = (!args.no_compress).then(|| args.delta_compression.into());
    config.clean_sources = !args.preserve;
    config.force = args.force;

    let provider = CatalogProvider::load(&args.catalog)
        .with_context(|| format!("load catalog {}", args.catalog.display()))?;
    let fetcher = DistdirFetcher::new(args.distdir.clone(), args.mirror.clone());
    let tool = external_tool(&config);
    let mut db = DeltaDatabase::load(&args.db)
        .with_context(|| format!("load delta database {}", args.db.display()))?;

    let session = Session {
        config: &config,
        provider: &provider,
        fetcher: &fetcher,
        tool: &tool,
    };
    let summary = session
        .diff_packages(&packages, &mut db, &args.output, args.jobs)
        .context("diff batch")?;

    for report in &summary.reports {
        match &report.result {
            Ok(GenerateOutcome::Created { path, .. }) => {
                eprintln!("diff ok: {} delta={}", report.label, path.display())
            }
            Ok(GenerateOutcome::AlreadyExists { path }) => {
                eprintln!("diff skipped: {} existing={}", report.label, path.display())
            }
            Err(e) => eprintln!("diff failed: {} error={}", report.label, e),
        }
    }
    eprintln!(
        "diff done: packages={} pairs={} created={} existing={} failed={} db_records={}",
        packages.len(),
        summary.planned,
        summary.created,
        summary.existing,
        summary.failed,
        db.len()
    );

    Ok(summary.is_clean())
}
