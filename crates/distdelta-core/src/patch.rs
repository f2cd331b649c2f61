// crates/distdelta-core/src/patch.rs

//! Patch chains: finding a path of recorded deltas from a local archive to a
//! wanted one, and replaying it with verification at every hop.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::archive::{self, compress_to, decompress_in_place, split_compression};
use crate::checksum::Form;
use crate::config::QUARANTINE_DIR;
use crate::db::{DeltaDatabase, DeltaRecord};
use crate::error::{DeltaError, Result};
use crate::tool::{DeltaTool, ToolRunner};

/// Progress of one reconstruction request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Resolving,
    Verifying,
    Reconstructed,
    Quarantined,
    Failed,
}

/// Where the reconstructed archive ended up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconstructOutcome {
    /// Byte-identical to the recorded destination (or left uncompressed).
    Reconstructed(PathBuf),
    /// Uncompressed content verified, recompressed bytes differ from the
    /// recorded archive; kept under the quarantine directory.
    Quarantined(PathBuf),
}

impl ReconstructOutcome {
    pub fn path(&self) -> &Path {
        match self {
            ReconstructOutcome::Reconstructed(p) | ReconstructOutcome::Quarantined(p) => p,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            ReconstructOutcome::Reconstructed(_) => Stage::Reconstructed,
            ReconstructOutcome::Quarantined(_) => Stage::Quarantined,
        }
    }
}

/// The chain's starting file and which of its forms it is.
#[derive(Clone, Debug)]
pub struct ChainSource {
    pub path: PathBuf,
    pub form: Form,
}

#[derive(Clone, Debug)]
pub struct ReconstructRequest {
    pub source: ChainSource,
    /// Directory holding the delta artifacts under their recorded names.
    pub delta_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Recompress the result to match the recorded destination archive.
    pub compress: bool,
}

/// Shortest chain of records ending at `target` whose first source is in
/// `available`. Among equally short chains the one reached first in database
/// order wins. Returns `None` when no recorded path exists.
pub fn find_chain(
    db: &DeltaDatabase,
    target: &str,
    available: &HashSet<String>,
) -> Option<Vec<DeltaRecord>> {
    let mut queue = VecDeque::from([target.to_string()]);
    let mut visited = HashSet::from([target.to_string()]);
    // source name -> record leading from it one hop closer to `target`
    let mut next_hop: HashMap<String, &DeltaRecord> = HashMap::new();

    while let Some(node) = queue.pop_front() {
        for record in db.lookup_by_destination(&node) {
            let src = record.source().name();
            if available.contains(src) {
                let mut chain = vec![record.clone()];
                let mut cur = node.as_str();
                while cur != target {
                    let hop = next_hop.get(cur)?;
                    chain.push((*hop).clone());
                    cur = hop.destination().name();
                }
                debug!(archive = target, hops = chain.len(), start = src, "patch chain found");
                return Some(chain);
            }
            if visited.insert(src.to_string()) {
                next_hop.insert(src.to_string(), record);
                queue.push_back(src.to_string());
            }
        }
    }

    debug!(archive = target, "no patch chain");
    None
}

/// Format tag of a delta file name: the last extension once any compression
/// extension is stripped (`a-b.switching.xz` -> `switching`).
pub fn patch_format(delta_name: &str) -> Option<String> {
    let (plain, _) = split_compression(delta_name);
    let (stem, ext) = plain.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_string())
}

/// Common format of every delta in `chain`.
pub fn chain_format(chain: &[DeltaRecord]) -> Result<String> {
    let mut format: Option<String> = None;
    for record in chain {
        let this = patch_format(record.delta_name()).ok_or_else(|| {
            DeltaError::InconsistentPatchFormat(format!("no format tag in {}", record.delta_name()))
        })?;
        match &format {
            None => format = Some(this),
            Some(f) if *f == this => {}
            Some(f) => {
                return Err(DeltaError::InconsistentPatchFormat(format!(
                    "{} is {this}, chain is {f}",
                    record.delta_name()
                )))
            }
        }
    }
    format.ok_or_else(|| DeltaError::BrokenChain("empty chain".into()))
}

/// Replays patch chains through a [`DeltaTool`].
pub struct PatchChainResolver<'a> {
    tool: &'a dyn DeltaTool,
    runner: ToolRunner,
}

impl<'a> PatchChainResolver<'a> {
    pub fn new(tool: &'a dyn DeltaTool, runner: ToolRunner) -> Self {
        Self { tool, runner }
    }

    pub fn find_chain(
        &self,
        db: &DeltaDatabase,
        target: &str,
        available: &HashSet<String>,
    ) -> Option<Vec<DeltaRecord>> {
        find_chain(db, target, available)
    }

    /// Rebuilds the last record's destination from the first record's source.
    ///
    /// Format consistency and chain continuity are checked before anything
    /// touches the disk. The source, every delta (stored and uncompressed) and
    /// the rebuilt content are verified against the records. Intermediate
    /// files live in a scoped directory under `output_dir`.
    pub fn reconstruct(&self, chain: &[DeltaRecord], req: &ReconstructRequest) -> Result<ReconstructOutcome> {
        let target = chain
            .last()
            .map(|r| r.destination().name().to_string())
            .unwrap_or_default();
        debug!(archive = %target, hops = chain.len(), stage = ?Stage::Resolving);

        match self.reconstruct_inner(chain, req) {
            Ok(outcome) => {
                info!(
                    archive = %target,
                    stage = ?outcome.stage(),
                    path = %outcome.path().display(),
                    "reconstruction finished"
                );
                Ok(outcome)
            }
            Err(e) => {
                warn!(archive = %target, stage = ?Stage::Failed, error = %e, "reconstruction failed");
                Err(e)
            }
        }
    }

    fn reconstruct_inner(&self, chain: &[DeltaRecord], req: &ReconstructRequest) -> Result<ReconstructOutcome> {
        let format = chain_format(chain)?;
        for pair in chain.windows(2) {
            if pair[0].destination().name() != pair[1].source().name() {
                return Err(DeltaError::BrokenChain(format!(
                    "{} produces {}, next hop starts from {}",
                    pair[0].delta_name(),
                    pair[0].destination().name(),
                    pair[1].source().name()
                )));
            }
        }
        let (first, last) = match (chain.first(), chain.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return Err(DeltaError::BrokenChain("empty chain".into())),
        };

        debug!(stage = ?Stage::Verifying, source = %req.source.path.display());
        if !first.source().matches_file(&req.source.path, req.source.form)? {
            return Err(DeltaError::ChecksumMismatch {
                file: first.source().name().to_string(),
                role: "source",
            });
        }

        std::fs::create_dir_all(&req.output_dir)?;
        let work = tempfile::Builder::new()
            .prefix(".distdelta-patch-")
            .tempdir_in(&req.output_dir)?;

        let src = self.stage_source(first, &req.source, &work)?;
        let deltas = self.stage_deltas(chain, &req.delta_dir, &work)?;

        let out_dir = work.path().join("out");
        std::fs::create_dir_all(&out_dir)?;
        let dest_name = last.destination().name();
        let (plain_name, compression) = split_compression(dest_name);
        let rebuilt = out_dir.join(&plain_name);

        self.tool.patch(&src, &format, &deltas, &rebuilt)?;

        if !last.destination().matches_file(&rebuilt, Form::Uncompressed)? {
            return Err(DeltaError::ReconstructionChecksumMismatch(dest_name.to_string()));
        }

        let compression = match compression {
            Some(c) if req.compress => c,
            _ => {
                let published = req.output_dir.join(&plain_name);
                std::fs::rename(&rebuilt, &published)?;
                return Ok(ReconstructOutcome::Reconstructed(published));
            }
        };

        let packed = out_dir.join(dest_name);
        compress_to(&rebuilt, &packed, compression, &self.runner)?;

        if last.destination().matches_file(&packed, Form::Stored)? {
            let published = req.output_dir.join(dest_name);
            std::fs::rename(&packed, &published)?;
            Ok(ReconstructOutcome::Reconstructed(published))
        } else {
            let quarantine = req.output_dir.join(QUARANTINE_DIR);
            std::fs::create_dir_all(&quarantine)?;
            let published = quarantine.join(dest_name);
            std::fs::rename(&packed, &published)?;
            warn!(
                archive = dest_name,
                path = %published.display(),
                "recompressed archive differs from the recorded one, quarantined"
            );
            Ok(ReconstructOutcome::Quarantined(published))
        }
    }

    fn stage_source(&self, first: &DeltaRecord, source: &ChainSource, work: &TempDir) -> Result<PathBuf> {
        let dir = work.path().join("src");
        std::fs::create_dir_all(&dir)?;
        let copy = dir.join(archive::file_name(&source.path)?);
        std::fs::copy(&source.path, &copy)?;

        if source.form == Form::Uncompressed {
            return Ok(copy);
        }
        let plain = decompress_in_place(&copy, &self.runner)?;
        if !first.source().matches_file(&plain, Form::Uncompressed)? {
            return Err(DeltaError::ChecksumMismatch {
                file: first.source().name().to_string(),
                role: "uncompressed source",
            });
        }
        Ok(plain)
    }

    fn stage_deltas(&self, chain: &[DeltaRecord], delta_dir: &Path, work: &TempDir) -> Result<Vec<PathBuf>> {
        let dir = work.path().join("deltas");
        std::fs::create_dir_all(&dir)?;

        let mut out = Vec::with_capacity(chain.len());
        for record in chain {
            let delta = record.delta();
            let on_disk = delta_dir.join(delta.name());
            if !on_disk.is_file() {
                return Err(DeltaError::BrokenChain(format!(
                    "delta {} missing from {}",
                    delta.name(),
                    delta_dir.display()
                )));
            }
            if !delta.matches_file(&on_disk, Form::Stored)? {
                return Err(DeltaError::ChecksumMismatch {
                    file: delta.name().to_string(),
                    role: "delta",
                });
            }

            let copy = dir.join(delta.name());
            std::fs::copy(&on_disk, &copy)?;
            let plain = decompress_in_place(&copy, &self.runner)?;
            if !delta.matches_file(&plain, Form::Uncompressed)? {
                return Err(DeltaError::ChecksumMismatch {
                    file: delta.name().to_string(),
                    role: "uncompressed delta",
                });
            }
            out.push(plain);
        }
        Ok(out)
    }
}
