// crates/distdelta-core/src/checksum/set.rs

use std::any::Any;
use std::fmt;

use crate::checksum::algorithm::Algorithm;
use crate::error::{DeltaError, Result};

/// Which view of a file a checksum describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Form {
    /// The file as stored (possibly compressed).
    Stored,
    /// The canonically uncompressed content.
    Uncompressed,
}

impl Form {
    /// Label prefix used in the database (`UMD5` vs `MD5`).
    pub fn prefix(self) -> &'static str {
        match self {
            Form::Stored => "",
            Form::Uncompressed => "U",
        }
    }
}

/// One checksum value.
///
/// Values arrive either as raw digest bytes (computed) or as text (hex digest,
/// decimal size) read from a database. Both are normalized to a big-endian
/// number without leading zero bytes, so `00ff` and `ff` compare equal.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ChecksumValue {
    algorithm: Algorithm,
    numeric: Vec<u8>,
}

impl ChecksumValue {
    pub fn from_raw(algorithm: Algorithm, bytes: &[u8]) -> Result<Self> {
        let width = algorithm.digest_len().unwrap_or(8);
        let numeric = strip_leading_zeros(bytes);
        if numeric.len() > width {
            return Err(DeltaError::MalformedChecksum(format!(
                "{} value wider than {} bytes",
                algorithm.name(),
                width
            )));
        }
        Ok(Self { algorithm, numeric })
    }

    pub fn from_size(size: u64) -> Self {
        Self {
            algorithm: Algorithm::Size,
            numeric: strip_leading_zeros(&size.to_be_bytes()),
        }
    }

    pub fn from_text(algorithm: Algorithm, text: &str) -> Result<Self> {
        let text = text.trim();
        match algorithm.digest_len() {
            None => {
                let size: u64 = text.parse().map_err(|_| {
                    DeltaError::MalformedChecksum(format!("bad size value: {text:?}"))
                })?;
                Ok(Self::from_size(size))
            }
            Some(_) => {
                let padded;
                let even = if text.len() % 2 == 1 {
                    padded = format!("0{text}");
                    padded.as_str()
                } else {
                    text
                };
                let bytes = hex::decode(even).map_err(|_| {
                    DeltaError::MalformedChecksum(format!(
                        "bad {} value: {text:?}",
                        algorithm.name()
                    ))
                })?;
                Self::from_raw(algorithm, &bytes)
            }
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Raw digest bytes, left-padded to the algorithm's width
    /// (8 bytes big-endian for size).
    pub fn to_raw(&self) -> Vec<u8> {
        let width = self.algorithm.digest_len().unwrap_or(8);
        let mut out = vec![0u8; width - self.numeric.len()];
        out.extend_from_slice(&self.numeric);
        out
    }

    /// Textual form: zero-padded lowercase hex for digests, decimal for size.
    pub fn to_text(&self) -> String {
        match self.algorithm {
            Algorithm::Size => self.as_u64().to_string(),
            _ => hex::encode(self.to_raw()),
        }
    }

    fn as_u64(&self) -> u64 {
        self.numeric.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b))
    }

    /// Compares against an arbitrary operand. Anything other than a
    /// `ChecksumValue` of the same algorithm is a contract violation.
    pub fn try_eq(&self, other: &dyn Any) -> Result<bool> {
        let other = other.downcast_ref::<ChecksumValue>().ok_or_else(|| {
            DeltaError::InvalidComparison(format!(
                "{} checksum compared against a non-checksum operand",
                self.algorithm.name()
            ))
        })?;
        if other.algorithm != self.algorithm {
            return Err(DeltaError::InvalidComparison(format!(
                "{} checksum compared against {} checksum",
                self.algorithm.name(),
                other.algorithm.name()
            )));
        }
        Ok(self.numeric == other.numeric)
    }
}

impl fmt::Display for ChecksumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl fmt::Debug for ChecksumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm.name(), self.to_text())
    }
}

/// A complete set of checksums (every [`Algorithm`]) for one file view.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ChecksumSet {
    values: [ChecksumValue; Algorithm::COUNT],
}

impl ChecksumSet {
    /// Builds a set from textual `(algorithm, value)` pairs.
    /// The pairs must name every algorithm exactly once.
    pub fn from_values<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut values = Vec::new();
        for (k, v) in pairs {
            let algorithm = Algorithm::parse(k.as_ref())?;
            values.push(ChecksumValue::from_text(algorithm, v.as_ref())?);
        }
        Self::from_checksums(values)
    }

    /// Builds a set from already-typed values.
    pub fn from_checksums<I>(checksums: I) -> Result<Self>
    where
        I: IntoIterator<Item = ChecksumValue>,
    {
        let mut slots: [Option<ChecksumValue>; Algorithm::COUNT] = Default::default();
        for value in checksums {
            let slot = &mut slots[value.algorithm.index()];
            if slot.is_some() {
                return Err(DeltaError::MalformedChecksum(format!(
                    "duplicate checksum: {}",
                    value.algorithm.name()
                )));
            }
            *slot = Some(value);
        }

        let missing: Vec<&str> = Algorithm::ALL
            .iter()
            .filter(|a| slots[a.index()].is_none())
            .map(|a| a.name())
            .collect();
        if !missing.is_empty() {
            return Err(DeltaError::MalformedChecksum(format!(
                "missing checksums: {}",
                missing.join(", ")
            )));
        }

        let [md5, sha1, sha256, rmd160, size] = slots;
        match (md5, sha1, sha256, rmd160, size) {
            (Some(md5), Some(sha1), Some(sha256), Some(rmd160), Some(size)) => Ok(Self {
                values: [md5, sha1, sha256, rmd160, size],
            }),
            _ => Err(DeltaError::MalformedChecksum("incomplete checksum set".into())),
        }
    }

    pub fn get(&self, algorithm: Algorithm) -> &ChecksumValue {
        &self.values[algorithm.index()]
    }

    pub fn size(&self) -> u64 {
        self.values[Algorithm::Size.index()].as_u64()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChecksumValue> {
        self.values.iter()
    }

    /// Compares against an arbitrary operand; fails on anything that is not
    /// a `ChecksumSet` rather than reporting a silent mismatch.
    pub fn try_eq(&self, other: &dyn Any) -> Result<bool> {
        let other = other.downcast_ref::<ChecksumSet>().ok_or_else(|| {
            DeltaError::InvalidComparison("checksum set compared against a foreign operand".into())
        })?;
        for (a, b) in self.values.iter().zip(other.values.iter()) {
            if !a.try_eq(b)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// `MD5 <v> SHA1 <v> ...`, with a `U` prefix on every label for the
    /// uncompressed form.
    pub fn render(&self, form: Form) -> String {
        self.values
            .iter()
            .map(|v| format!("{}{} {}", form.prefix(), v.algorithm.label(), v.to_text()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Debug for ChecksumSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.values.iter()).finish()
    }
}

fn strip_leading_zeros(bytes: &[u8]) -> Vec<u8> {
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    bytes[first..].to_vec()
}
