// crates/distdelta-core/src/checksum/mod.rs

pub mod algorithm;
pub mod set;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use digest::Digest;
use md5::Md5;
use ripemd::Ripemd160;
use sha1::Sha1;
use sha2::Sha256;

pub use algorithm::Algorithm;
pub use set::{ChecksumSet, ChecksumValue, Form};

const READ_BUF: usize = 64 * 1024;

impl ChecksumSet {
    /// Reads `path` once and computes every tracked checksum.
    pub fn compute(path: &Path) -> crate::Result<ChecksumSet> {
        let mut file = File::open(path)?;
        let mut buf = vec![0u8; READ_BUF];

        let mut md5 = Md5::new();
        let mut sha1 = Sha1::new();
        let mut sha256 = Sha256::new();
        let mut rmd160 = Ripemd160::new();
        let mut size = 0u64;

        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            let chunk = &buf[..n];
            md5.update(chunk);
            sha1.update(chunk);
            sha256.update(chunk);
            rmd160.update(chunk);
            size += n as u64;
        }

        ChecksumSet::from_checksums([
            ChecksumValue::from_raw(Algorithm::Md5, &md5.finalize())?,
            ChecksumValue::from_raw(Algorithm::Sha1, &sha1.finalize())?,
            ChecksumValue::from_raw(Algorithm::Sha256, &sha256.finalize())?,
            ChecksumValue::from_raw(Algorithm::Rmd160, &rmd160.finalize())?,
            ChecksumValue::from_size(size),
        ])
    }
}
