#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use distdelta_core::tool::DeltaTool;
use distdelta_core::{ChecksumSet, DeltaRecord, FileIdentity, Result};

const MAGIC: &[u8] = b"FAKEDELTA\n";

/// In-process stand-in for differ/patcher: a delta is a header plus the full
/// destination bytes, and patching emits the last delta's payload.
#[derive(Default)]
pub struct FakeTool {
    pub diffs: AtomicUsize,
    pub patches: AtomicUsize,
    /// Append a stray byte to every patch result.
    pub corrupt: bool,
}

impl FakeTool {
    pub fn corrupting() -> Self {
        Self {
            corrupt: true,
            ..Self::default()
        }
    }

    pub fn diff_calls(&self) -> usize {
        self.diffs.load(Ordering::SeqCst)
    }

    pub fn patch_calls(&self) -> usize {
        self.patches.load(Ordering::SeqCst)
    }
}

impl DeltaTool for FakeTool {
    fn diff(&self, _src: &Path, dest: &Path, _format: &str, out: &Path) -> Result<()> {
        self.diffs.fetch_add(1, Ordering::SeqCst);
        let mut bytes = MAGIC.to_vec();
        bytes.extend(fs::read(dest)?);
        fs::write(out, bytes)?;
        Ok(())
    }

    fn patch(&self, _src: &Path, _format: &str, deltas: &[PathBuf], out: &Path) -> Result<()> {
        self.patches.fetch_add(1, Ordering::SeqCst);
        let last = deltas.last().expect("patch called without deltas");
        let bytes = fs::read(last)?;
        let mut payload = bytes[MAGIC.len()..].to_vec();
        if self.corrupt {
            payload.push(0);
        }
        fs::write(out, payload)?;
        Ok(())
    }
}

/// A tarball-looking payload that differs per `seed`.
pub fn tar_bytes(seed: &str) -> Vec<u8> {
    let mut out = Vec::new();
    for i in 0..512 {
        out.extend_from_slice(format!("{seed}:{i:04}\n").as_bytes());
    }
    out
}

/// Stream-compressed the way reconstruction recompresses `.zst`.
pub fn zst_canonical(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    zstd::stream::copy_encode(data, &mut out, 19).expect("zstd encode");
    out
}

/// Same content as [`zst_canonical`] but split over two frames, so the
/// recompressed bytes never match.
pub fn zst_two_frames(data: &[u8]) -> Vec<u8> {
    let (a, b) = data.split_at(data.len() / 2);
    let mut out = zstd::bulk::compress(a, 3).expect("zstd frame a");
    out.extend(zstd::bulk::compress(b, 3).expect("zstd frame b"));
    out
}

pub fn write(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let p = dir.join(name);
    fs::write(&p, bytes).expect("write fixture");
    p
}

/// Deterministic checksum set; not the digest of any real file.
pub fn fake_sums(seed: u8, size: u64) -> ChecksumSet {
    let hex = |n: usize| format!("{seed:02x}").repeat(n);
    ChecksumSet::from_values([
        ("md5", hex(16)),
        ("sha1", hex(20)),
        ("sha256", hex(32)),
        ("rmd160", hex(20)),
        ("size", size.to_string()),
    ])
    .expect("valid fake sums")
}

pub fn fake_identity(name: &str, seed: u8) -> FileIdentity {
    FileIdentity::new(name, fake_sums(seed, 1000 + seed as u64), fake_sums(seed ^ 0xff, 4000))
        .expect("valid identity")
}

/// A record `src -> dest` whose delta is named `{src}-{dest}.{format}`.
pub fn fake_record(src: &str, dest: &str, format: &str, seed: u8) -> DeltaRecord {
    DeltaRecord::new(
        fake_identity(src, seed),
        fake_identity(dest, seed.wrapping_add(1)),
        fake_identity(&format!("{src}-{dest}.{format}"), seed.wrapping_add(2)),
    )
}
