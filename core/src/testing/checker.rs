use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use anyhow::Context as _;
use async_trait::async_trait;
use fsutil::LockWait;
use tokio::process::Command;

use super::{compare, verdict::Verdict};

/// Judges the output of a run that finished in time with exit code 0.
#[async_trait]
pub trait OutputChecker: Send + Sync {
    /// Returns one of `OK`, `WA`, `PE` or `FAIL`.
    async fn check(&self, input: &Path, answer: &Path, output: &Path) -> anyhow::Result<Verdict>;
}

/// Built-in line comparator.
#[derive(Debug, Clone)]
pub struct StandardChecker {
    pub exact: bool,
    pub lock_wait: LockWait,
}

impl StandardChecker {
    pub fn new(exact: bool) -> Self {
        Self {
            exact,
            lock_wait: LockWait::default(),
        }
    }
}

#[async_trait]
impl OutputChecker for StandardChecker {
    async fn check(&self, _input: &Path, answer: &Path, output: &Path) -> anyhow::Result<Verdict> {
        fsutil::wait_for_file(answer, self.lock_wait)?;
        // A solution that wrote nothing gets an empty output file.
        fsutil::wait_for_file(output, self.lock_wait)?;

        let same = compare::compare_files(answer, output, self.exact)?;
        Ok(if same { Verdict::OK } else { Verdict::WA })
    }
}

/// Checker program invoked as `<checker> <input> <answer> <output>` that reports
/// the verdict ordinal as its exit code.
#[derive(Debug, Clone)]
pub struct ExternalChecker {
    program: PathBuf,
    cwd: PathBuf,
}

impl ExternalChecker {
    pub fn new(program: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            cwd: cwd.into(),
        }
    }
}

/// Maps a checker exit code to a verdict. Codes outside `0..=5`, and a checker
/// killed by a signal (`None`), are treated as `FAIL`.
pub fn verdict_from_checker_exit(code: Option<i32>) -> Verdict {
    match code.and_then(Verdict::from_ordinal) {
        Some(verdict) => verdict,
        None => {
            match code {
                Some(code) => log::warn!("Checker exited with unknown code {}; judged as FAIL", code),
                None => log::warn!("Checker was terminated by a signal; judged as FAIL"),
            }
            Verdict::FAIL
        }
    }
}

#[async_trait]
impl OutputChecker for ExternalChecker {
    async fn check(&self, input: &Path, answer: &Path, output: &Path) -> anyhow::Result<Verdict> {
        log::debug!(
            "Running checker: {:?} {:?} {:?} {:?}",
            self.program,
            input,
            answer,
            output
        );
        let status = Command::new(&self.program)
            .args([input, answer, output])
            .current_dir(&self.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .with_context(|| format!("Failed to spawn checker '{}'", self.program.display()))?;

        Ok(verdict_from_checker_exit(status.code()))
    }
}
