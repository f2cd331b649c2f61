// crates/distdelta-cli/src/cmd/inspect.rs

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use distdelta_core::{DeltaDatabase, DeltaRecord};

#[derive(Args)]
pub struct InspectArgs {
    /// Delta database file
    #[arg(short = 'd', long)]
    pub db: PathBuf,

    /// Show the record for this delta file name
    #[arg(long, conflicts_with = "dest")]
    pub delta: Option<String>,

    /// Show every record producing this archive
    #[arg(long)]
    pub dest: Option<String>,
}

pub fn run(args: InspectArgs) -> anyhow::Result<bool> {
    let db = DeltaDatabase::load(&args.db)
        .with_context(|| format!("load delta database {}", args.db.display()))?;

    let records: Vec<&DeltaRecord> = match (&args.delta, &args.dest) {
        (Some(name), _) => db.lookup_by_delta(name).into_iter().collect(),
        (None, Some(name)) => db.lookup_by_destination(name),
        (None, None) => db.records().iter().collect(),
    };

    println!("db_path   = {}", args.db.display());
    println!("records   = {}", db.len());
    println!("matching  = {}", records.len());
    for r in &records {
        let dest = r.destination().stored().size();
        let delta = r.delta().stored().size();
        let ratio = if dest == 0 { 0.0 } else { delta as f64 / dest as f64 };
        println!();
        println!("delta     = {}", r.delta_name());
        println!("  {} -> {}", r.source().name(), r.destination().name());
        println!("  delta_bytes={} dest_bytes={} ratio={:.4}", delta, dest, ratio);
    }

    Ok(args.delta.is_none() && args.dest.is_none() || !records.is_empty())
}
