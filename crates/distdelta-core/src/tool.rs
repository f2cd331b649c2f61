// crates/distdelta-core/src/tool.rs

//! External differ/patcher and the timeout-aware process runner shared by
//! every subprocess this crate spawns.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{DeltaError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How a subprocess ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolExit {
    Success,
    Failed(Option<i32>),
    TimedOut,
}

impl ToolExit {
    pub fn is_success(self) -> bool {
        matches!(self, ToolExit::Success)
    }

    fn from_status(status: ExitStatus) -> Self {
        if status.success() {
            ToolExit::Success
        } else {
            ToolExit::Failed(status.code())
        }
    }
}

impl std::fmt::Display for ToolExit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolExit::Success => f.write_str("exit 0"),
            ToolExit::Failed(Some(code)) => write!(f, "exit {code}"),
            ToolExit::Failed(None) => f.write_str("killed by signal"),
            ToolExit::TimedOut => f.write_str("timed out"),
        }
    }
}

/// Runs commands to completion, killing them once `timeout` elapses.
#[derive(Clone, Copy, Debug, Default)]
pub struct ToolRunner {
    pub timeout: Option<Duration>,
}

impl ToolRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    pub fn run(&self, cmd: &mut Command) -> io::Result<ToolExit> {
        debug!(command = ?cmd, "spawning");
        let mut child = cmd.spawn()?;

        let Some(timeout) = self.timeout else {
            return Ok(ToolExit::from_status(child.wait()?));
        };

        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(ToolExit::from_status(status));
            }
            if Instant::now() >= deadline {
                warn!(command = ?cmd, timeout_secs = timeout.as_secs_f64(), "killing tool after timeout");
                let _ = child.kill();
                let _ = child.wait();
                return Ok(ToolExit::TimedOut);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

/// The black-box binary differ/patcher pair.
pub trait DeltaTool: Send + Sync {
    /// Writes a delta turning `src` into `dest` at `out`.
    fn diff(&self, src: &Path, dest: &Path, format: &str, out: &Path) -> Result<()>;

    /// Applies `deltas` in order to `src`, writing the result at `out`.
    fn patch(&self, src: &Path, format: &str, deltas: &[PathBuf], out: &Path) -> Result<()>;
}

/// `differ`/`patcher` executables invoked as
/// `differ SRC DEST --patch-format FMT OUT` and
/// `patcher SRC --patch-format FMT DELTA... OUT`.
#[derive(Clone, Debug)]
pub struct ExternalDeltaTool {
    pub differ: PathBuf,
    pub patcher: PathBuf,
    pub runner: ToolRunner,
}

impl ExternalDeltaTool {
    pub fn new(differ: PathBuf, patcher: PathBuf, runner: ToolRunner) -> Self {
        Self {
            differ,
            patcher,
            runner,
        }
    }

    /// Locates `differ` and `patcher` inside one directory.
    pub fn in_dir(bindir: &Path, runner: ToolRunner) -> Self {
        Self::new(bindir.join("differ"), bindir.join("patcher"), runner)
    }
}

impl DeltaTool for ExternalDeltaTool {
    fn diff(&self, src: &Path, dest: &Path, format: &str, out: &Path) -> Result<()> {
        let mut cmd = Command::new(&self.differ);
        cmd.arg(src).arg(dest).arg("--patch-format").arg(format).arg(out);

        let exit = self
            .runner
            .run(&mut cmd)
            .map_err(|e| DeltaError::DiffToolFailed(format!("{}: {e}", self.differ.display())))?;
        if !exit.is_success() {
            return Err(DeltaError::DiffToolFailed(format!(
                "{} ({exit}) for {}",
                self.differ.display(),
                out.display()
            )));
        }
        Ok(())
    }

    fn patch(&self, src: &Path, format: &str, deltas: &[PathBuf], out: &Path) -> Result<()> {
        let mut cmd = Command::new(&self.patcher);
        cmd.arg(src).arg("--patch-format").arg(format);
        cmd.args(deltas);
        cmd.arg(out);

        let exit = self
            .runner
            .run(&mut cmd)
            .map_err(|e| DeltaError::PatchToolFailed(format!("{}: {e}", self.patcher.display())))?;
        if !exit.is_success() {
            return Err(DeltaError::PatchToolFailed(format!(
                "{} ({exit}) for {}",
                self.patcher.display(),
                out.display()
            )));
        }
        Ok(())
    }
}
