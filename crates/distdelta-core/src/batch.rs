// crates/distdelta-core/src/batch.rs

//! Batch drivers behind the `diff` and `patch` commands.
//!
//! A unit is one diff pair or one wanted archive. Unit failures are logged
//! and reported without stopping the batch; database write failures and
//! structural errors abort it.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::checksum::Form;
use crate::config::Config;
use crate::db::DeltaDatabase;
use crate::diff::{DiffGenerator, DiffPair, GenerateOutcome};
use crate::error::{DeltaError, Result};
use crate::lineage::match_history;
use crate::patch::{find_chain, ChainSource, PatchChainResolver, ReconstructOutcome, ReconstructRequest};
use crate::provider::{ArchiveEntry, Fetcher, MetadataProvider};
use crate::tool::DeltaTool;

/// The collaborators every operation needs, passed explicitly.
#[derive(Clone, Copy)]
pub struct Session<'a> {
    pub config: &'a Config,
    pub provider: &'a dyn MetadataProvider,
    pub fetcher: &'a dyn Fetcher,
    pub tool: &'a dyn DeltaTool,
}

/// A diff pair found by lineage identification.
#[derive(Clone, Debug)]
pub struct DiffUnit {
    pub from_cpv: String,
    pub to_cpv: String,
    pub pair: DiffPair,
    pub score: f64,
}

#[derive(Debug)]
pub struct UnitReport {
    pub label: String,
    pub result: Result<GenerateOutcome>,
}

#[derive(Debug, Default)]
pub struct DiffSummary {
    pub planned: usize,
    pub created: usize,
    pub existing: usize,
    pub failed: usize,
    pub reports: Vec<UnitReport>,
}

impl DiffSummary {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatchOutcome {
    /// Already in the local distfiles directory.
    AlreadyAvailable(PathBuf),
    /// The database records no path from any local archive.
    NoChain,
    Rebuilt(ReconstructOutcome),
}

#[derive(Debug)]
pub struct PatchReport {
    pub archive: String,
    pub result: Result<PatchOutcome>,
}

impl<'a> Session<'a> {
    /// Lineage-matched diff pairs across the whole version history of `atom`.
    pub fn plan_package(&self, atom: &str) -> Result<Vec<DiffUnit>> {
        let cpvs = self.provider.list_versions(atom)?;
        let mut archives: Vec<Vec<ArchiveEntry>> = Vec::with_capacity(cpvs.len());
        for cpv in &cpvs {
            archives.push(self.provider.list_archives(cpv)?);
        }

        let names: Vec<Vec<String>> = archives
            .iter()
            .map(|list| list.iter().map(|a| a.name.clone()).collect())
            .collect();

        let mut units = Vec::new();
        for (i, m) in match_history(&names) {
            let find = |list: &[ArchiveEntry], name: &str| list.iter().find(|a| a.name == name).cloned();
            let (Some(source), Some(destination)) =
                (find(&archives[i], &m.source), find(&archives[i + 1], &m.destination))
            else {
                continue;
            };
            units.push(DiffUnit {
                from_cpv: cpvs[i].clone(),
                to_cpv: cpvs[i + 1].clone(),
                pair: DiffPair { source, destination },
                score: m.score,
            });
        }

        info!(atom, versions = cpvs.len(), pairs = units.len(), "lineage planned");
        Ok(units)
    }

    /// Plans and generates deltas for every atom, upserting each verified
    /// record. Up to `jobs` pairs run at once; upserts are serialized.
    pub fn diff_packages(
        &self,
        atoms: &[String],
        db: &mut DeltaDatabase,
        output_dir: &Path,
        jobs: usize,
    ) -> Result<DiffSummary> {
        let mut summary = DiffSummary::default();
        let mut units = Vec::new();
        for atom in atoms {
            match self.plan_package(atom) {
                Ok(planned) => units.extend(planned),
                Err(e) if e.is_unit_failure() => {
                    warn!(atom = %atom, error = %e, "package skipped");
                    summary.failed += 1;
                    summary.reports.push(UnitReport {
                        label: atom.clone(),
                        result: Err(e),
                    });
                }
                Err(e) => return Err(e),
            }
        }
        summary.planned = units.len();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs.max(1))
            .build()
            .map_err(|e| DeltaError::Io(std::io::Error::other(e.to_string())))?;

        let generator = DiffGenerator::new(self.config, self.tool, self.fetcher);
        let shared = Mutex::new(db);
        // Set on the first failed database write; units not yet started are skipped.
        let halted = AtomicBool::new(false);
        let reports: Vec<Option<UnitReport>> = pool.install(|| {
            units
                .par_iter()
                .map(|unit| {
                    if halted.load(Ordering::SeqCst) {
                        return None;
                    }
                    let label = format!("{} -> {}", unit.pair.source.name, unit.pair.destination.name);
                    let result = generator
                        .generate(&unit.pair, output_dir)
                        .and_then(|outcome| self.record(&shared, outcome));
                    if let Err(e) = &result {
                        if !e.is_unit_failure() {
                            halted.store(true, Ordering::SeqCst);
                        }
                        warn!(unit = %label, error = %e, "diff failed");
                    }
                    Some(UnitReport { label, result })
                })
                .collect()
        });

        for report in reports.into_iter().flatten() {
            match report.result {
                Err(e) if !e.is_unit_failure() => return Err(e),
                _ => {}
            }
            match &report.result {
                Ok(GenerateOutcome::Created { .. }) => summary.created += 1,
                Ok(GenerateOutcome::AlreadyExists { .. }) => summary.existing += 1,
                Err(_) => summary.failed += 1,
            }
            summary.reports.push(report);
        }

        info!(
            planned = summary.planned,
            created = summary.created,
            existing = summary.existing,
            failed = summary.failed,
            "diff batch finished"
        );
        Ok(summary)
    }

    /// Upserts a freshly created delta. A delta that cannot be recorded is
    /// removed again so no later run mistakes it for an existing one.
    fn record(&self, db: &Mutex<&mut DeltaDatabase>, outcome: GenerateOutcome) -> Result<GenerateOutcome> {
        let GenerateOutcome::Created { record, path } = &outcome else {
            return Ok(outcome);
        };
        let mut db = db.lock().unwrap_or_else(|p| p.into_inner());
        if let Err(e) = db.upsert(record.clone()) {
            if let Err(rm) = std::fs::remove_file(path) {
                warn!(path = %path.display(), error = %rm, "could not remove unrecorded delta");
            }
            return Err(e);
        }
        Ok(outcome)
    }

    /// Rebuilds every archive of `cpv` that is not already local, from the
    /// deltas in `delta_dir`, into `output_dir`.
    pub fn patch_version(
        &self,
        cpv: &str,
        db: &DeltaDatabase,
        delta_dir: &Path,
        output_dir: &Path,
        compress: bool,
    ) -> Result<Vec<PatchReport>> {
        let archives = self.provider.list_archives(cpv)?;
        let local: HashSet<String> = self.fetcher.local_names()?.into_iter().collect();
        let resolver = PatchChainResolver::new(self.tool, self.config.runner());

        let mut reports = Vec::with_capacity(archives.len());
        for archive in archives {
            let result = self.patch_one(&archive, db, &local, &resolver, delta_dir, output_dir, compress);
            match result {
                Err(e) if !e.is_unit_failure() => return Err(e),
                _ => {}
            }
            match &result {
                Err(e) => warn!(archive = %archive.name, error = %e, "patch failed"),
                Ok(PatchOutcome::NoChain) => warn!(archive = %archive.name, "no delta chain"),
                Ok(_) => {}
            }
            reports.push(PatchReport {
                archive: archive.name,
                result,
            });
        }
        Ok(reports)
    }

    #[allow(clippy::too_many_arguments)]
    fn patch_one(
        &self,
        archive: &ArchiveEntry,
        db: &DeltaDatabase,
        local: &HashSet<String>,
        resolver: &PatchChainResolver<'_>,
        delta_dir: &Path,
        output_dir: &Path,
        compress: bool,
    ) -> Result<PatchOutcome> {
        if local.contains(&archive.name) {
            return Ok(PatchOutcome::AlreadyAvailable(self.fetcher.fetch(archive)?));
        }
        let Some(chain) = find_chain(db, &archive.name, local) else {
            return Ok(PatchOutcome::NoChain);
        };

        let start = chain[0].source();
        let source = self.fetcher.fetch(&ArchiveEntry {
            name: start.name().to_string(),
            uri: String::new(),
            size: Some(start.stored().size()),
        })?;

        let req = ReconstructRequest {
            source: ChainSource {
                path: source,
                form: Form::Stored,
            },
            delta_dir: delta_dir.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            compress,
        };
        Ok(PatchOutcome::Rebuilt(resolver.reconstruct(&chain, &req)?))
    }
}
