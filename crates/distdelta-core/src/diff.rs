// crates/distdelta-core/src/diff.rs

//! Delta generation for one (source archive, destination archive) pair:
//! fetch, uncompress, diff, verify by reconstruction, compress, record.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::archive::{self, compress_in_place, decompress_in_place, validate_distfile, Compression};
use crate::checksum::{ChecksumSet, Form};
use crate::config::Config;
use crate::db::DeltaRecord;
use crate::error::{DeltaError, Result};
use crate::identity::FileIdentity;
use crate::patch::{ChainSource, PatchChainResolver, ReconstructRequest};
use crate::provider::{ArchiveEntry, Fetcher};
use crate::tool::DeltaTool;

const ALL_COMPRESSIONS: [Compression; 5] = [
    Compression::Xz,
    Compression::Zstd,
    Compression::Gzip,
    Compression::Bzip2,
    Compression::Lzma,
];

/// A matched pair of archives to diff.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffPair {
    pub source: ArchiveEntry,
    pub destination: ArchiveEntry,
}

#[derive(Clone, Debug)]
pub enum GenerateOutcome {
    /// A verified delta was written to `path`; `record` is ready to upsert.
    Created { record: DeltaRecord, path: PathBuf },
    /// A delta for this pair is already in the output directory.
    AlreadyExists { path: PathBuf },
}

pub struct DiffGenerator<'a> {
    config: &'a Config,
    tool: &'a dyn DeltaTool,
    fetcher: &'a dyn Fetcher,
}

impl<'a> DiffGenerator<'a> {
    pub fn new(config: &'a Config, tool: &'a dyn DeltaTool, fetcher: &'a dyn Fetcher) -> Self {
        Self {
            config,
            tool,
            fetcher,
        }
    }

    /// `{source}-{destination}.{format}`, before delta compression.
    pub fn delta_name(&self, pair: &DiffPair) -> String {
        format!(
            "{}-{}.{}",
            pair.source.name, pair.destination.name, self.config.patch_format
        )
    }

    /// Existing artifact for `plain_name` in `output_dir`, compressed or not.
    fn existing_delta(output_dir: &Path, plain_name: &str) -> Option<PathBuf> {
        std::iter::once(plain_name.to_string())
            .chain(
                ALL_COMPRESSIONS
                    .iter()
                    .map(|c| format!("{plain_name}{}", c.extension())),
            )
            .map(|n| output_dir.join(n))
            .find(|p| p.exists())
    }

    pub fn generate(&self, pair: &DiffPair, output_dir: &Path) -> Result<GenerateOutcome> {
        let max = self.config.max_archive_size;
        validate_distfile(&pair.source.name, pair.source.size, max)?;
        validate_distfile(&pair.destination.name, pair.destination.size, max)?;

        std::fs::create_dir_all(output_dir)?;

        let plain_name = self.delta_name(pair);
        if let Some(path) = Self::existing_delta(output_dir, &plain_name) {
            if !self.config.force {
                debug!(delta = %plain_name, path = %path.display(), "delta already exists");
                return Ok(GenerateOutcome::AlreadyExists { path });
            }
        }

        let src_archive = self.fetcher.fetch(&pair.source)?;
        let dest_archive = self.fetcher.fetch(&pair.destination)?;

        // Everything below lives in `work` until published; dropping it
        // removes every intermediate file on every exit path.
        let work = tempfile::Builder::new()
            .prefix(".distdelta-diff-")
            .tempdir_in(output_dir)?;
        let runner = self.config.runner();

        let usrc = unpack_copy(&src_archive, &work.path().join("src"), &runner)?;
        let udest = unpack_copy(&dest_archive, &work.path().join("dest"), &runner)?;

        let source = FileIdentity::compute(&pair.source.name, &src_archive, &usrc)?;
        let destination = FileIdentity::compute(&pair.destination.name, &dest_archive, &udest)?;

        let delta_path = work.path().join(&plain_name);
        info!(source = %pair.source.name, destination = %pair.destination.name, "diffing");
        self.tool
            .diff(&usrc, &udest, &self.config.patch_format, &delta_path)?;

        let delta_plain = ChecksumSet::compute(&delta_path)?;
        self.verify(&source, &destination, &usrc, &delta_path, &delta_plain, work.path())?;

        let (artifact, delta_stored) = match self.config.delta_compression {
            Some(c) => {
                let packed = compress_in_place(&delta_path, c, &runner)?;
                let sums = ChecksumSet::compute(&packed)?;
                (packed, sums)
            }
            None => (delta_path, delta_plain.clone()),
        };
        let artifact_name = archive::file_name(&artifact)?;
        let delta = FileIdentity::new(&artifact_name, delta_stored, delta_plain)?;

        if self.config.force {
            while let Some(stale) = Self::existing_delta(output_dir, &plain_name) {
                std::fs::remove_file(&stale)?;
            }
        }
        let published = output_dir.join(&artifact_name);
        std::fs::rename(&artifact, &published)?;

        if !self.config.clean_sources {
            for kept in [&usrc, &udest] {
                std::fs::rename(kept, output_dir.join(archive::file_name(kept)?))?;
            }
        }

        info!(
            delta = %artifact_name,
            delta_size = delta.stored().size(),
            destination_size = destination.stored().size(),
            "delta generated"
        );
        Ok(GenerateOutcome::Created {
            record: DeltaRecord::new(source, destination, delta),
            path: published,
        })
    }

    /// Rebuilds the destination from the uncompressed source and the fresh
    /// delta in an isolated directory and compares it with the real one.
    fn verify(
        &self,
        source: &FileIdentity,
        destination: &FileIdentity,
        usrc: &Path,
        delta_path: &Path,
        delta_plain: &ChecksumSet,
        work: &Path,
    ) -> Result<()> {
        let scratch = tempfile::Builder::new().prefix("verify-").tempdir_in(work)?;

        let src_copy = scratch.path().join(archive::file_name(usrc)?);
        std::fs::copy(usrc, &src_copy)?;
        let delta_name = archive::file_name(delta_path)?;
        std::fs::copy(delta_path, scratch.path().join(&delta_name))?;

        let trial = DeltaRecord::new(
            source.clone(),
            destination.clone(),
            FileIdentity::new(&delta_name, delta_plain.clone(), delta_plain.clone())?,
        );
        let req = ReconstructRequest {
            source: ChainSource {
                path: src_copy,
                form: Form::Uncompressed,
            },
            delta_dir: scratch.path().to_path_buf(),
            output_dir: scratch.path().join("out"),
            compress: false,
        };

        let resolver = PatchChainResolver::new(self.tool, self.config.runner());
        let rebuilt = resolver
            .reconstruct(std::slice::from_ref(&trial), &req)
            .map_err(|e| DeltaError::DeltaValidationFailed(format!("{delta_name}: {e}")))?;

        let actual = ChecksumSet::compute(rebuilt.path())?;
        if !destination.uncompressed().try_eq(&actual)? {
            return Err(DeltaError::DeltaValidationFailed(format!(
                "{delta_name}: rebuilt {} differs",
                destination.name()
            )));
        }
        debug!(delta = %delta_name, "delta verified");
        Ok(())
    }
}

/// Copies `archive` into `dir` and uncompresses the copy.
fn unpack_copy(archive: &Path, dir: &Path, runner: &crate::tool::ToolRunner) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let copy = dir.join(archive::file_name(archive)?);
    std::fs::copy(archive, &copy)?;
    decompress_in_place(&copy, runner)
}
