// crates/distdelta-core/src/checksum/algorithm.rs

use crate::error::{DeltaError, Result};

/// The fixed set of checksums tracked for every file.
/// Declaration order is the order used in the database format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Algorithm {
    Md5,
    Sha1,
    Sha256,
    Rmd160,
    Size,
}

impl Algorithm {
    pub const COUNT: usize = 5;

    pub const ALL: [Algorithm; Algorithm::COUNT] = [
        Algorithm::Md5,
        Algorithm::Sha1,
        Algorithm::Sha256,
        Algorithm::Rmd160,
        Algorithm::Size,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Lowercase name, as used in catalogues and logs.
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Md5 => "md5",
            Algorithm::Sha1 => "sha1",
            Algorithm::Sha256 => "sha256",
            Algorithm::Rmd160 => "rmd160",
            Algorithm::Size => "size",
        }
    }

    /// Uppercase label written to the database.
    pub fn label(self) -> &'static str {
        match self {
            Algorithm::Md5 => "MD5",
            Algorithm::Sha1 => "SHA1",
            Algorithm::Sha256 => "SHA256",
            Algorithm::Rmd160 => "RMD160",
            Algorithm::Size => "SIZE",
        }
    }

    /// Digest width in bytes. `None` for the size pseudo-checksum.
    pub fn digest_len(self) -> Option<usize> {
        match self {
            Algorithm::Md5 => Some(16),
            Algorithm::Sha1 => Some(20),
            Algorithm::Sha256 => Some(32),
            Algorithm::Rmd160 => Some(20),
            Algorithm::Size => None,
        }
    }

    /// Case-insensitive lookup by name.
    pub fn parse(name: &str) -> Result<Algorithm> {
        Algorithm::ALL
            .iter()
            .copied()
            .find(|a| a.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| DeltaError::MalformedChecksum(format!("unknown algorithm: {name}")))
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
