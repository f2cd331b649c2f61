// crates/distdelta-cli/src/io/atoms.rs

use std::io::BufRead;
use std::path::Path;

use anyhow::{Context, Result};

/// Package atoms for a batch. Precedence: stdin, then `file`, then `args`.
/// Blank lines and surrounding whitespace are dropped.
pub fn collect_atoms(args: &[String], file: Option<&Path>, stdin: bool) -> Result<Vec<String>> {
    if stdin {
        let lines = std::io::stdin()
            .lock()
            .lines()
            .collect::<std::io::Result<Vec<_>>>()
            .context("read atoms from stdin")?;
        return Ok(clean(lines));
    }

    if let Some(path) = file {
        let text = std::fs::read_to_string(path).with_context(|| format!("read atoms file {}", path.display()))?;
        return Ok(clean(text.lines().map(str::to_string)));
    }

    Ok(clean(args.iter().cloned()))
}

fn clean<I: IntoIterator<Item = String>>(lines: I) -> Vec<String> {
    lines
        .into_iter()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}
