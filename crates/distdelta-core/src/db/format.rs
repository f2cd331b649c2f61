// crates/distdelta-core/src/db/format.rs

use crate::checksum::{Algorithm, ChecksumSet, ChecksumValue, Form};
use crate::db::record::DeltaRecord;
use crate::error::{DeltaError, Result};
use crate::identity::FileIdentity;

/// Line separating two records.
pub const SEPARATOR: &str = "--";

/// Text layout (UTF-8, one record per block):
///
/// ```text
/// <delta basename>
/// <source basename>\t<destination basename>
/// MD5 <c> UMD5 <u> SHA1 <c> USHA1 <u> ... SIZE <c> USIZE <u>   (source)
/// ...                                                        (destination)
/// ...                                                        (delta)
/// --
/// <next record>
/// ```
///
/// Blocks are joined with `\n--\n`; there is no trailing newline.
pub fn encode(records: &[DeltaRecord]) -> String {
    records
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(&format!("\n{SEPARATOR}\n"))
}

/// Parses a whole database. Blank input is an empty database; any block that
/// is not exactly five lines of the documented shape fails the whole parse.
pub fn decode(text: &str) -> Result<Vec<DeltaRecord>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut blocks: Vec<Vec<&str>> = vec![Vec::new()];
    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim() == SEPARATOR {
            blocks.push(Vec::new());
            continue;
        }
        if let Some(block) = blocks.last_mut() {
            block.push(line);
        }
    }

    blocks
        .into_iter()
        .enumerate()
        .map(|(i, block)| decode_block(i + 1, &block))
        .collect()
}

fn decode_block(index: usize, lines: &[&str]) -> Result<DeltaRecord> {
    let malformed = |reason: String| DeltaError::MalformedRecord { index, reason };

    let lines: Vec<&str> = trim_blank(lines);
    if lines.len() != 5 {
        return Err(malformed(format!("expected 5 lines, found {}", lines.len())));
    }

    let delta_name = lines[0].trim();
    if delta_name.is_empty() {
        return Err(malformed("empty delta name".into()));
    }

    let names: Vec<&str> = lines[1].split('\t').map(str::trim).collect();
    let (src_name, dest_name) = match names.as_slice() {
        [s, d] if !s.is_empty() && !d.is_empty() => (*s, *d),
        _ => return Err(malformed("expected `source<TAB>destination`".into())),
    };

    let identity = |name: &str, line: &str, role: &str| -> Result<FileIdentity> {
        let (stored, uncompressed) = decode_checksum_line(line)
            .map_err(|e| malformed(format!("{role} checksums: {e}")))?;
        FileIdentity::new(name, stored, uncompressed)
            .map_err(|e| malformed(format!("{role} name: {e}")))
    };

    Ok(DeltaRecord::new(
        identity(src_name, lines[2], "source")?,
        identity(dest_name, lines[3], "destination")?,
        identity(delta_name, lines[4], "delta")?,
    ))
}

/// Splits `ALG value UALG value ...` into (stored, uncompressed) sets.
pub fn decode_checksum_line(line: &str) -> Result<(ChecksumSet, ChecksumSet)> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() % 2 != 0 {
        return Err(DeltaError::MalformedChecksum(format!(
            "odd number of tokens ({})",
            tokens.len()
        )));
    }

    let mut stored = Vec::with_capacity(Algorithm::COUNT);
    let mut uncompressed = Vec::with_capacity(Algorithm::COUNT);
    for pair in tokens.chunks_exact(2) {
        let (key, value) = (pair[0], pair[1]);
        let (form, name) = split_form(key);
        let value = ChecksumValue::from_text(Algorithm::parse(name)?, value)?;
        match form {
            Form::Stored => stored.push(value),
            Form::Uncompressed => uncompressed.push(value),
        }
    }

    Ok((
        ChecksumSet::from_checksums(stored)?,
        ChecksumSet::from_checksums(uncompressed)?,
    ))
}

fn split_form(key: &str) -> (Form, &str) {
    if Algorithm::parse(key).is_ok() {
        return (Form::Stored, key);
    }
    match key.strip_prefix('U').or_else(|| key.strip_prefix('u')) {
        Some(rest) => (Form::Uncompressed, rest),
        None => (Form::Stored, key),
    }
}

fn trim_blank<'a>(lines: &[&'a str]) -> Vec<&'a str> {
    let start = lines.iter().position(|l| !l.trim().is_empty());
    let end = lines.iter().rposition(|l| !l.trim().is_empty());
    match (start, end) {
        (Some(s), Some(e)) => lines[s..=e].to_vec(),
        _ => Vec::new(),
    }
}
