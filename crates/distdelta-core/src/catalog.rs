// crates/distdelta-core/src/catalog.rs

//! Local implementations of the metadata and fetch collaborators: a TOML
//! package catalogue and a distfiles directory fed from mirror directories.
//!
//! ```toml
//! [[package]]
//! atom = "dev-python/gunicorn"
//!
//! [[package.version]]
//! cpv = "dev-python/gunicorn-0.12.0"
//!
//! [[package.version.archive]]
//! name = "gunicorn-0.12.0.tar.gz"
//! uri = "mirror://pypi/g/gunicorn/gunicorn-0.12.0.tar.gz"
//! size = 186021
//! ```

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{DeltaError, Result};
use crate::provider::{ArchiveEntry, Fetcher, MetadataProvider};

#[derive(Clone, Debug, Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "package")]
    packages: Vec<PackageDecl>,
}

#[derive(Clone, Debug, Deserialize)]
struct PackageDecl {
    atom: String,
    #[serde(default, rename = "version")]
    versions: Vec<VersionDecl>,
}

#[derive(Clone, Debug, Deserialize)]
struct VersionDecl {
    cpv: String,
    #[serde(default, rename = "archive")]
    archives: Vec<ArchiveDecl>,
}

#[derive(Clone, Debug, Deserialize)]
struct ArchiveDecl {
    name: String,
    uri: String,
    size: Option<u64>,
}

/// [`MetadataProvider`] backed by a TOML catalogue.
#[derive(Clone, Debug)]
pub struct CatalogProvider {
    packages: Vec<PackageDecl>,
}

impl CatalogProvider {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let provider = Self::parse(&text)
            .map_err(|e| DeltaError::Catalog(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), packages = provider.packages.len(), "catalog loaded");
        Ok(provider)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let file: CatalogFile =
            toml::from_str(text).map_err(|e| DeltaError::Catalog(e.to_string()))?;
        Ok(Self {
            packages: file.packages,
        })
    }

    fn version(&self, cpv: &str) -> Option<&VersionDecl> {
        self.packages
            .iter()
            .flat_map(|p| p.versions.iter())
            .find(|v| v.cpv == cpv)
    }
}

impl MetadataProvider for CatalogProvider {
    fn list_versions(&self, atom: &str) -> Result<Vec<String>> {
        let pkg = self
            .packages
            .iter()
            .find(|p| p.atom == atom)
            .ok_or_else(|| DeltaError::Metadata(format!("unknown package: {atom}")))?;
        Ok(pkg.versions.iter().map(|v| v.cpv.clone()).collect())
    }

    fn list_archives(&self, cpv: &str) -> Result<Vec<ArchiveEntry>> {
        let version = self
            .version(cpv)
            .ok_or_else(|| DeltaError::Metadata(format!("unknown version: {cpv}")))?;
        Ok(version
            .archives
            .iter()
            .map(|a| ArchiveEntry {
                name: a.name.clone(),
                uri: a.uri.clone(),
                size: a.size,
            })
            .collect())
    }
}

/// [`Fetcher`] over a local distfiles directory.
///
/// Missing archives are copied in from the mirror directories (by basename)
/// or from a `file://` / absolute-path URI. Network URIs are not handled.
/// Safe to share between threads: concurrent fetches of one archive each copy
/// privately and the first to publish wins.
#[derive(Clone, Debug)]
pub struct DistdirFetcher {
    distdir: PathBuf,
    mirrors: Vec<PathBuf>,
}

impl DistdirFetcher {
    pub fn new(distdir: PathBuf, mirrors: Vec<PathBuf>) -> Self {
        Self { distdir, mirrors }
    }

    pub fn distdir(&self) -> &Path {
        &self.distdir
    }

    fn candidates(&self, archive: &ArchiveEntry) -> Vec<PathBuf> {
        let mut out: Vec<PathBuf> = self.mirrors.iter().map(|m| m.join(&archive.name)).collect();
        if let Some(local) = archive.uri.strip_prefix("file://") {
            out.push(PathBuf::from(local));
        } else if Path::new(&archive.uri).is_absolute() {
            out.push(PathBuf::from(&archive.uri));
        }
        out
    }

    fn check_size(archive: &ArchiveEntry, path: &Path) -> Result<()> {
        let Some(expected) = archive.size else {
            return Ok(());
        };
        let actual = std::fs::metadata(path)?.len();
        if actual != expected {
            return Err(DeltaError::Fetch(format!(
                "{}: size {actual} does not match declared {expected}",
                archive.name
            )));
        }
        Ok(())
    }
}

impl Fetcher for DistdirFetcher {
    fn fetch(&self, archive: &ArchiveEntry) -> Result<PathBuf> {
        let target = self.distdir.join(&archive.name);
        if target.is_file() {
            Self::check_size(archive, &target)?;
            return Ok(target);
        }

        std::fs::create_dir_all(&self.distdir)?;
        for candidate in self.candidates(archive) {
            if !candidate.is_file() {
                continue;
            }
            // Each caller copies into its own hidden temp file; `target` only
            // ever appears complete.
            let mut partial = tempfile::Builder::new()
                .prefix(&format!(".{}.", archive.name))
                .suffix(".partial")
                .tempfile_in(&self.distdir)?;
            let mut from = File::open(&candidate)?;
            std::io::copy(&mut from, partial.as_file_mut())?;
            partial.as_file().sync_all()?;
            Self::check_size(archive, partial.path())?;

            match partial.persist_noclobber(&target) {
                Ok(_) => {
                    info!(archive = %archive.name, from = %candidate.display(), "fetched");
                }
                Err(_) if target.is_file() => {
                    Self::check_size(archive, &target)?;
                    debug!(archive = %archive.name, "fetched concurrently by another caller");
                }
                Err(e) => return Err(e.error.into()),
            }
            return Ok(target);
        }

        Err(DeltaError::Fetch(format!(
            "{} not found locally (uri {})",
            archive.name, archive.uri
        )))
    }

    fn local_names(&self) -> Result<Vec<String>> {
        if !self.distdir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.distdir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
