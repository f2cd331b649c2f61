// crates/distdelta-core/src/archive.rs

//! Archive naming and the compression table.
//!
//! `.gz`, `.bz2`, `.xz` and `.lzma` go through the matching external program;
//! `.zst` is handled in-process. `.tgz` and `.tbz2` decompress to `.tar`.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::{DeltaError, Result};
use crate::tool::ToolRunner;

const ZSTD_LEVEL: i32 = 19;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Compression {
    Gzip,
    Bzip2,
    Xz,
    Lzma,
    Zstd,
}

impl Compression {
    /// Canonical extension, including the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Compression::Gzip => ".gz",
            Compression::Bzip2 => ".bz2",
            Compression::Xz => ".xz",
            Compression::Lzma => ".lzma",
            Compression::Zstd => ".zst",
        }
    }

    /// External program, or `None` when handled in-process.
    pub fn program(self) -> Option<&'static str> {
        match self {
            Compression::Gzip => Some("gzip"),
            Compression::Bzip2 => Some("bzip2"),
            Compression::Xz => Some("xz"),
            Compression::Lzma => Some("lzma"),
            Compression::Zstd => None,
        }
    }

    pub fn parse(name: &str) -> Option<Compression> {
        match name.to_ascii_lowercase().as_str() {
            "gz" | "gzip" => Some(Compression::Gzip),
            "bz2" | "bzip2" => Some(Compression::Bzip2),
            "xz" => Some(Compression::Xz),
            "lzma" => Some(Compression::Lzma),
            "zst" | "zstd" => Some(Compression::Zstd),
            _ => None,
        }
    }
}

// (extension, compression, suffix replacing the extension once uncompressed)
const TABLE: &[(&str, Compression, &str)] = &[
    (".gz", Compression::Gzip, ""),
    (".bz2", Compression::Bzip2, ""),
    (".xz", Compression::Xz, ""),
    (".lzma", Compression::Lzma, ""),
    (".zst", Compression::Zstd, ""),
    (".tgz", Compression::Gzip, ".tar"),
    (".tbz2", Compression::Bzip2, ".tar"),
];

/// Uncompressed name and compression for `name`. Names without a known
/// compression extension are returned unchanged with `None`.
pub fn split_compression(name: &str) -> (String, Option<Compression>) {
    let lower = name.to_ascii_lowercase();
    for (ext, compression, replacement) in TABLE {
        if lower.ends_with(ext) && lower.len() > ext.len() {
            let stem = &name[..name.len() - ext.len()];
            return (format!("{stem}{replacement}"), Some(*compression));
        }
    }
    (name.to_string(), None)
}

/// Archives the differ accepts: compressed with a known compressor or a
/// plain `.tar`.
pub fn is_supported(name: &str) -> bool {
    let (plain, compression) = split_compression(name);
    compression.is_some() || plain.to_ascii_lowercase().ends_with(".tar")
}

/// Checks the name against [`is_supported`] and the size against `ceiling`.
pub fn validate_distfile(name: &str, size: Option<u64>, ceiling: u64) -> Result<()> {
    if !is_supported(name) {
        return Err(DeltaError::UnsupportedDistfile(format!("unknown archive format: {name}")));
    }
    if let Some(size) = size {
        if size > ceiling {
            return Err(DeltaError::UnsupportedDistfile(format!(
                "{name} is {size} bytes, above the {ceiling} byte ceiling"
            )));
        }
    }
    Ok(())
}

/// Decompresses `path` next to itself, removing the compressed file.
/// Returns the uncompressed path (`path` itself when not compressed).
pub fn decompress_in_place(path: &Path, runner: &ToolRunner) -> Result<PathBuf> {
    let name = file_name(path)?;
    let (plain, compression) = split_compression(&name);
    let Some(compression) = compression else {
        return Ok(path.to_path_buf());
    };

    let out = path.with_file_name(&plain);
    transcode(path, &out, compression, Direction::Decompress, runner)?;
    std::fs::remove_file(path)?;
    debug!(from = %path.display(), to = %out.display(), "decompressed");
    Ok(out)
}

/// Compresses `path` into `out` with `compression`, removing `path`.
pub fn compress_to(path: &Path, out: &Path, compression: Compression, runner: &ToolRunner) -> Result<()> {
    transcode(path, out, compression, Direction::Compress, runner)?;
    std::fs::remove_file(path)?;
    debug!(from = %path.display(), to = %out.display(), "compressed");
    Ok(())
}

/// Compresses `path` in place by appending the compression extension.
pub fn compress_in_place(path: &Path, compression: Compression, runner: &ToolRunner) -> Result<PathBuf> {
    let name = file_name(path)?;
    let out = path.with_file_name(format!("{name}{}", compression.extension()));
    compress_to(path, &out, compression, runner)?;
    Ok(out)
}

#[derive(Clone, Copy, Debug)]
enum Direction {
    Compress,
    Decompress,
}

fn transcode(
    input: &Path,
    output: &Path,
    compression: Compression,
    direction: Direction,
    runner: &ToolRunner,
) -> Result<()> {
    let result = match compression.program() {
        Some(program) => run_program(program, input, output, direction, runner),
        None => zstd_transcode(input, output, direction),
    };
    if result.is_err() {
        let _ = std::fs::remove_file(output);
    }
    result
}

fn run_program(
    program: &str,
    input: &Path,
    output: &Path,
    direction: Direction,
    runner: &ToolRunner,
) -> Result<()> {
    let sink = File::create(output)?;
    let mut cmd = Command::new(program);
    if let Direction::Decompress = direction {
        cmd.arg("-d");
    }
    cmd.arg("-c").arg(input).stdout(Stdio::from(sink));

    let exit = runner
        .run(&mut cmd)
        .map_err(|e| DeltaError::CompressionFailed(format!("{program}: {e}")))?;
    if !exit.is_success() {
        return Err(DeltaError::CompressionFailed(format!(
            "{program} ({exit}) on {}",
            input.display()
        )));
    }
    Ok(())
}

fn zstd_transcode(input: &Path, output: &Path, direction: Direction) -> Result<()> {
    let src = File::open(input)?;
    let dst = File::create(output)?;
    let res = match direction {
        Direction::Compress => zstd::stream::copy_encode(src, dst, ZSTD_LEVEL),
        Direction::Decompress => zstd::stream::copy_decode(src, dst),
    };
    res.map_err(|e| DeltaError::CompressionFailed(format!("zstd on {}: {e}", input.display())))
}

pub(crate) fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| DeltaError::UnsupportedDistfile(format!("not a file name: {}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_table() {
        assert_eq!(
            split_compression("foo-1.0.tar.gz"),
            ("foo-1.0.tar".to_string(), Some(Compression::Gzip))
        );
        assert_eq!(
            split_compression("foo-1.0.tgz"),
            ("foo-1.0.tar".to_string(), Some(Compression::Gzip))
        );
        assert_eq!(
            split_compression("foo.tbz2"),
            ("foo.tar".to_string(), Some(Compression::Bzip2))
        );
        assert_eq!(split_compression("foo.tar"), ("foo.tar".to_string(), None));
        assert_eq!(split_compression("README"), ("README".to_string(), None));
    }

    #[test]
    fn unsupported_names_and_sizes_are_rejected() {
        assert!(validate_distfile("foo.tar.xz", Some(10), 100).is_ok());
        assert!(validate_distfile("foo.tar", None, 100).is_ok());
        assert!(matches!(
            validate_distfile("foo.zip", Some(10), 100),
            Err(DeltaError::UnsupportedDistfile(_))
        ));
        assert!(matches!(
            validate_distfile("foo.tar.bz2", Some(101), 100),
            Err(DeltaError::UnsupportedDistfile(_))
        ));
    }
}
