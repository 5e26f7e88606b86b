pub mod error {
    #[allow(unused_imports)]
    pub(crate) use anyhow::{anyhow, bail, ensure, Context as _};
    pub use anyhow::{Error, Result};
}
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use colored::Colorize;
use error::*;
use fsutil::LockWait;

use crate::config::Config;
use crate::interactive::{status_spinner, util::ask_yes_no};
use crate::locale::Messages;
use crate::style;
use crate::testing::{
    runner, AnswerSuffixFinder, ExecutionResult, FsTestcase, SessionStats, TestRunner, Verdict,
};
use crate::update::{self, UpdateCheck};

/// Writes the example config into `dir`.
pub fn init_config(dir: impl AsRef<Path>) -> Result<PathBuf> {
    Config::write_example(dir).context("Failed to create config file")
}

/// Reports every missing file the run depends on, then fails if there was any.
pub fn check_files(cfg: &Config, msgs: &Messages) -> Result<()> {
    let mut problems = Vec::new();

    if !cfg.solution.precompiled && fsutil::find_executable(&cfg.solution.compiler).is_none() {
        problems.push(format!(
            "{} {}",
            msgs.compiler_not_found(),
            cfg.solution.compiler.display()
        ));
    }
    if !cfg.solution.source.is_file() {
        problems.push(format!(
            "{} {}",
            msgs.not_exists(),
            cfg.solution.source.display()
        ));
    }
    if !cfg.checker.standard {
        if !cfg.checker.precompiled && fsutil::find_executable(&cfg.checker.compiler).is_none() {
            problems.push(format!(
                "{} {}",
                msgs.compiler_not_found(),
                cfg.checker.compiler.display()
            ));
        }
        if !cfg.checker.source.is_file() {
            problems.push(format!(
                "{} {}",
                msgs.not_exists(),
                cfg.checker.source.display()
            ));
        }
    }
    if !cfg.solution.tests_dir.is_dir() {
        problems.push(format!(
            "{} {}",
            msgs.not_exists(),
            cfg.solution.tests_dir.display()
        ));
    }

    if problems.is_empty() {
        println!("{}", msgs.all_found());
        return Ok(());
    }
    for p in &problems {
        style::print_error(p);
    }
    bail!("{} required file(s) missing", problems.len())
}

/// Creates the work dir and empties it, including leftovers of an earlier run.
pub fn clean_before(work_dir: &Path, lock_wait: LockWait) -> Result<()> {
    fsutil::mkdir_all(work_dir)?;
    let (files, dirs) = fsutil::list_dir(work_dir)?;
    for f in &files {
        fsutil::remove_file_when_released(f, lock_wait)?;
    }
    for d in &dirs {
        fsutil::remove_dir_all(d)?;
    }
    Ok(())
}

/// Removes scratch files and empty subdirs, keeping the filed tests.
pub fn clean_after(work_dir: &Path, lock_wait: LockWait, msgs: &Messages) -> Result<()> {
    println!("{}", msgs.removing_temp());
    let (files, dirs) = fsutil::list_dir(work_dir)?;
    for f in &files {
        fsutil::remove_file_when_released(f, lock_wait)?;
    }
    for d in &dirs {
        if fsutil::read_dir(d)?.next().is_none() {
            fsutil::remove_dir(d)?;
        }
    }
    Ok(())
}

/// Builds `dest` from `source`, or copies it as-is when `precompiled`.
async fn build(
    compiler: &Path,
    options: &str,
    source: &Path,
    precompiled: bool,
    dest: &Path,
    msgs: &Messages,
) -> Result<()> {
    let file_name = source
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    if precompiled {
        if !fsutil::is_same_file(source, dest) {
            fsutil::copy_file(source, dest)?;
        }
        return Ok(());
    }

    let line = format!("{} '{}'...", msgs.compiling(), file_name);
    let spinner = status_spinner(line.clone());
    let res = runner::compile(compiler, options, source, dest).await;
    spinner.lock().await.finish_and_clear();

    match res {
        Ok(()) => {
            println!("{} {}", line, style::ok_tag());
            Ok(())
        }
        Err(e) => {
            println!("{} {}", line, style::error_tag(msgs));
            Err(e).with_context(|| format!("Failed to compile '{}'", source.display()))
        }
    }
}

pub async fn prepare_solution(cfg: &Config, runner: &TestRunner, msgs: &Messages) -> Result<()> {
    let s = &cfg.solution;
    build(
        &s.compiler,
        &s.compile_options,
        &s.source,
        s.precompiled,
        &runner.solution_exec(),
        msgs,
    )
    .await
}

/// No-op in standard mode.
pub async fn prepare_checker(cfg: &Config, runner: &TestRunner, msgs: &Messages) -> Result<()> {
    let c = &cfg.checker;
    if c.standard {
        return Ok(());
    }
    build(
        &c.compiler,
        &c.compile_options,
        &c.source,
        c.precompiled,
        &runner.checker_exec(),
        msgs,
    )
    .await
}

pub fn find_tests(tests_dir: &Path, msgs: &Messages) -> Result<Vec<FsTestcase>> {
    print!("{} ", msgs.looking_for_tests());
    let _ = io::stdout().flush();
    let testcases = FsTestcase::enumerate(tests_dir, &AnswerSuffixFinder)
        .with_context(|| format!("Failed to find tests in {}", tests_dir.display()))?;
    println!("[{}]", testcases.len().to_string().bold());
    Ok(testcases)
}

/// Copies the test files into the bucket of `verdict`.
pub fn file_testcase(work_dir: &Path, testcase: &FsTestcase, verdict: Verdict) -> Result<()> {
    let bucket = work_dir.join(verdict.bucket_name());
    fsutil::mkdir_all(&bucket)?;
    for src in [testcase.input_path(), testcase.answer_path()] {
        let Some(name) = src.file_name() else {
            bail!("Invalid test file path: {}", src.display())
        };
        fsutil::copy_file(src, bucket.join(name))?;
    }
    Ok(())
}

async fn judge_one(runner: &TestRunner, testcase: &FsTestcase) -> Result<ExecutionResult> {
    let res = runner.run(testcase).await?;
    file_testcase(runner.work_dir(), testcase, res.verdict)?;
    Ok(res)
}

/// Runs every testcase in order. A test that fails to run is reported and counted,
/// and the batch goes on.
pub async fn perform_testing(
    runner: &TestRunner,
    testcases: &[FsTestcase],
    msgs: &Messages,
) -> SessionStats {
    let limit = runner.time_limit();
    let mut stats = SessionStats::default();

    println!("{}", msgs.testing());
    for t in testcases {
        print!("{} '{}': ", msgs.test(), t.name());
        let _ = io::stdout().flush();
        match judge_one(runner, t).await {
            Ok(res) => {
                println!("{}", style::verdict_tag(&res, limit));
                stats.record(&res);
            }
            Err(e) => {
                println!("{}", style::error_tag(msgs));
                style::print_error(format!("{:#}", e));
                stats.record_failure();
            }
        }
    }
    stats
}

/// Full judging session: checks, builds, runs every test and prints the summary.
pub async fn judge(cfg: &Config, msgs: &Messages) -> Result<SessionStats> {
    self::check_files(cfg, msgs)?;

    let work_dir = &cfg.settings.work_dir;
    let lock_wait = LockWait::default();
    self::clean_before(work_dir, lock_wait)
        .with_context(|| format!("{} {}", msgs.no_access(), work_dir.display()))?;

    let runner = TestRunner::new(cfg, work_dir).lock_wait(lock_wait);
    self::prepare_checker(cfg, &runner, msgs).await?;
    self::prepare_solution(cfg, &runner, msgs).await?;

    let testcases = self::find_tests(&cfg.solution.tests_dir, msgs)?;
    let stats = self::perform_testing(&runner, &testcases, msgs).await;

    if let Err(e) = self::clean_after(work_dir, lock_wait, msgs) {
        log::warn!("Failed to clean work dir: {:#}", e);
    }
    style::print_summary(&stats, runner.time_limit(), msgs);
    Ok(stats)
}

/// Offers a pending update found by `check`, then stops the check.
pub async fn offer_update(mut check: UpdateCheck, cfg: &Config, msgs: &Messages) {
    let notice = check.try_take();
    check.cancel();
    let Some(notice) = notice else {
        return;
    };
    log::debug!("{:?}", notice);

    let prompt = format!("{} ({})", msgs.new_version_available(), notice.latest);
    let url = cfg.update.download_url.trim();
    if url.is_empty() {
        println!("{}", prompt.yellow());
        return;
    }
    match ask_yes_no(&prompt) {
        Ok(true) => {}
        Ok(false) => return,
        Err(e) => {
            log::debug!("Prompt failed: {}", e);
            return;
        }
    }

    let dest_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    match update::download(url, &dest_dir).await {
        Ok(path) => {
            log::debug!("Saved {}", path.display());
            println!("{}", msgs.downloaded().green());
        }
        Err(e) => log::debug!("Download failed: {:#}", e),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    #[test]
    fn clean_before_empties_work_dir() {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("work");
        fs::create_dir_all(work.join("OK/nested")).unwrap();
        fs::write(work.join("OK/01"), "x").unwrap();
        fs::write(work.join("sol.out"), "x").unwrap();

        clean_before(&work, LockWait::default()).unwrap();
        assert_eq!(fs::read_dir(&work).unwrap().count(), 0);

        clean_before(&dir.path().join("fresh"), LockWait::default()).unwrap();
        assert!(dir.path().join("fresh").is_dir());
    }

    #[test]
    fn clean_after_keeps_filed_tests() {
        let work = tempfile::tempdir().unwrap();
        let w = work.path();
        fs::create_dir(w.join("OK")).unwrap();
        fs::create_dir(w.join("WA")).unwrap();
        fs::write(w.join("OK/01"), "x").unwrap();
        fs::write(w.join("sol.in"), "x").unwrap();
        fs::write(w.join(TestRunner::SOLUTION_EXEC), "x").unwrap();

        clean_after(w, LockWait::default(), &Messages::default()).unwrap();
        assert!(w.join("OK/01").is_file());
        assert!(!w.join("WA").exists());
        assert!(!w.join("sol.in").exists());
        assert!(!w.join(TestRunner::SOLUTION_EXEC).exists());
    }

    #[test]
    fn file_testcase_copies_into_bucket() {
        let tests = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        fs::write(tests.path().join("03"), "in").unwrap();
        fs::write(tests.path().join("03.a"), "ans").unwrap();
        let t = FsTestcase::new("03", tests.path().join("03"), tests.path().join("03.a"));

        file_testcase(work.path(), &t, Verdict::FAIL).unwrap();
        assert_eq!(fs::read_to_string(work.path().join("FL/03")).unwrap(), "in");
        assert_eq!(fs::read_to_string(work.path().join("FL/03.a")).unwrap(), "ans");
    }

    #[test]
    fn check_files_reports_missing_sources() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = Config::from_toml(&Config::example_toml().unwrap()).unwrap();
        cfg.solution.precompiled = true;
        cfg.checker.standard = false;
        cfg.checker.precompiled = true;
        cfg.solution.source = dir.path().join("missing.cpp");
        cfg.checker.source = dir.path().join("checker.cpp");
        cfg.solution.tests_dir = dir.path().to_owned();

        assert!(check_files(&cfg, &Messages::default()).is_err());

        fs::write(&cfg.solution.source, "").unwrap();
        fs::write(&cfg.checker.source, "").unwrap();
        check_files(&cfg, &Messages::default()).unwrap();
    }
}
