// crates/distdelta-core/src/identity.rs

use std::any::Any;
use std::path::Path;

use crate::checksum::{ChecksumSet, Form};
use crate::error::{DeltaError, Result};

/// A file's basename plus checksums of both its stored and uncompressed forms.
///
/// Names are always basenames; where a file lives is the caller's concern.
/// Files without compression still carry both sets (they coincide).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FileIdentity {
    name: String,
    stored: ChecksumSet,
    uncompressed: ChecksumSet,
}

impl FileIdentity {
    pub fn new(name: &str, stored: ChecksumSet, uncompressed: ChecksumSet) -> Result<Self> {
        Ok(Self {
            name: basename(name)?,
            stored,
            uncompressed,
        })
    }

    /// Computes both sets from disk. `uncompressed` may equal `stored` when
    /// the file has no compression.
    pub fn compute(name: &str, stored: &Path, uncompressed: &Path) -> Result<Self> {
        let stored_set = ChecksumSet::compute(stored)?;
        let uncompressed_set = if stored == uncompressed {
            stored_set.clone()
        } else {
            ChecksumSet::compute(uncompressed)?
        };
        Self::new(name, stored_set, uncompressed_set)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stored(&self) -> &ChecksumSet {
        &self.stored
    }

    pub fn uncompressed(&self) -> &ChecksumSet {
        &self.uncompressed
    }

    pub fn checksums(&self, form: Form) -> &ChecksumSet {
        match form {
            Form::Stored => &self.stored,
            Form::Uncompressed => &self.uncompressed,
        }
    }

    /// Checks the file at `path` against the recorded set for `form`.
    pub fn matches_file(&self, path: &Path, form: Form) -> Result<bool> {
        let actual = ChecksumSet::compute(path)?;
        self.checksums(form).try_eq(&actual)
    }

    /// Identity comparison with the same contract as [`ChecksumSet::try_eq`].
    pub fn try_eq(&self, other: &dyn Any) -> Result<bool> {
        let other = other.downcast_ref::<FileIdentity>().ok_or_else(|| {
            DeltaError::InvalidComparison(format!(
                "file identity {} compared against a foreign operand",
                self.name
            ))
        })?;
        Ok(self.name == other.name
            && self.stored.try_eq(&other.stored)?
            && self.uncompressed.try_eq(&other.uncompressed)?)
    }

    /// Database checksum line: `ALG stored UALG uncompressed` per algorithm.
    pub fn checksum_line(&self) -> String {
        self.stored
            .iter()
            .zip(self.uncompressed.iter())
            .map(|(c, u)| {
                let label = c.algorithm().label();
                format!("{label} {c} {}{label} {u}", Form::Uncompressed.prefix())
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn basename(name: &str) -> Result<String> {
    let base = Path::new(name)
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| DeltaError::UnsupportedDistfile(format!("not a file name: {name:?}")))?;
    Ok(base.to_string())
}
