use std::{
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use anyhow::{bail, Context};
use fsutil::LockWait;
use tokio::process::Command;

use super::{
    checker::{ExternalChecker, OutputChecker, StandardChecker},
    monitor::{MonitorOutcome, TimeLimitMonitor},
    process::{ChildProcess, SpawnOptions},
    result::ExecutionResult,
    testcase::FsTestcase,
    verdict,
};
use crate::config::Config;

/// Runs `<compiler> <options...> <source> -o <output>`.
pub async fn compile(
    compiler: &Path,
    options: &str,
    source: &Path,
    output: &Path,
) -> anyhow::Result<()> {
    log::debug!(
        "{} {} {:?} -o {:?}",
        compiler.display(),
        options,
        source,
        output
    );
    let out = Command::new(compiler)
        .args(options.split_whitespace())
        .arg(source)
        .arg("-o")
        .arg(output)
        .stdin(Stdio::null())
        .output()
        .await
        .with_context(|| format!("Failed to spawn '{}'", compiler.display()))?;

    match out.status.code() {
        Some(0) => Ok(()),
        Some(code) => bail!(
            "Compile error: exitcode={}\n{}",
            code,
            String::from_utf8_lossy(&out.stderr).trim_end()
        ),
        None => bail!("Failed to compile: process terminated by signal"),
    }
}

/// Runs the prepared solution against one testcase at a time inside the work dir.
pub struct TestRunner {
    work_dir: PathBuf,
    input_name: String,
    output_name: String,
    monitor: TimeLimitMonitor,
    checker: Box<dyn OutputChecker>,
    lock_wait: LockWait,
}

impl TestRunner {
    pub const SOLUTION_EXEC: &str = "olymp-solution";
    pub const CHECKER_EXEC: &str = "olymp-checker";
    pub const SCRATCH_ANSWER: &str = "correct.out";

    pub fn new(cfg: &Config, work_dir: impl Into<PathBuf>) -> Self {
        let work_dir = work_dir.into();
        let checker: Box<dyn OutputChecker> = if cfg.checker.standard {
            Box::new(StandardChecker::new(cfg.checker.exact))
        } else {
            Box::new(ExternalChecker::new(
                work_dir.join(Self::CHECKER_EXEC),
                &work_dir,
            ))
        };
        Self {
            input_name: cfg.solution.input_file_name(),
            output_name: cfg.solution.output_file_name(),
            monitor: TimeLimitMonitor::new(cfg.solution.time_limit()),
            checker,
            lock_wait: LockWait::default(),
            work_dir,
        }
    }

    pub fn lock_wait(mut self, policy: LockWait) -> Self {
        self.lock_wait = policy;
        self
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn time_limit(&self) -> Duration {
        self.monitor.limit()
    }

    pub fn solution_exec(&self) -> PathBuf {
        self.work_dir.join(Self::SOLUTION_EXEC)
    }

    pub fn checker_exec(&self) -> PathBuf {
        self.work_dir.join(Self::CHECKER_EXEC)
    }

    /// Replaces the scratch files of the previous test with the files of `testcase`.
    pub fn prepare(&self, testcase: &FsTestcase) -> anyhow::Result<()> {
        let input = self.work_dir.join(&self.input_name);
        let output = self.work_dir.join(&self.output_name);
        let answer = self.work_dir.join(Self::SCRATCH_ANSWER);

        for stale in [&input, &output, &answer] {
            fsutil::remove_file_when_released(stale, self.lock_wait)?;
        }
        fsutil::copy_file(testcase.input_path(), &input)?;
        fsutil::copy_file(testcase.answer_path(), &answer)?;
        Ok(())
    }

    /// Starts the solution and waits until it exits or is killed for exceeding the limit.
    pub async fn execute(&self) -> anyhow::Result<MonitorOutcome> {
        let mut proc = ChildProcess::spawn(
            self.solution_exec(),
            std::iter::empty::<&str>(),
            &self.work_dir,
            SpawnOptions::for_solution(),
        )?;
        Ok(self.monitor.watch(&mut proc).await?)
    }

    pub async fn run(&self, testcase: &FsTestcase) -> anyhow::Result<ExecutionResult> {
        self.prepare(testcase)
            .with_context(|| format!("Failed to prepare testcase '{}'", testcase.name()))?;

        let outcome = self.execute().await?;
        let limit = self.monitor.limit();
        let verdict = match verdict::classify(outcome.cpu_time, limit, outcome.exit_code) {
            Some(verdict) => verdict,
            None => self
                .checker
                .check(
                    &self.work_dir.join(&self.input_name),
                    &self.work_dir.join(Self::SCRATCH_ANSWER),
                    &self.work_dir.join(&self.output_name),
                )
                .await
                .context("Failed to check output")?,
        };

        Ok(ExecutionResult {
            verdict,
            execution_time: outcome.cpu_time,
            exit_code: outcome.exit_code,
            timed_out: outcome.killed || outcome.cpu_time > limit,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::Verdict;
    use std::{fs, os::unix::fs::PermissionsExt};

    struct X {
        input: &'static str,
        answer: &'static str,
        script: &'static str,
        exact: bool,
        want_verdict: Verdict,
        want_exit_code: i32,
    }

    fn config(exact: bool) -> Config {
        let mut cfg = Config::from_toml(&Config::example_toml().unwrap()).unwrap();
        cfg.solution.source = PathBuf::from("sum.sh");
        cfg.solution.time_limit = 300;
        cfg.checker.exact = exact;
        cfg
    }

    async fn run_test(x: X) -> ExecutionResult {
        let tests = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        fs::write(tests.path().join("01"), x.input).unwrap();
        fs::write(tests.path().join("01.a"), x.answer).unwrap();

        let runner = TestRunner::new(&config(x.exact), work.path());
        let exec = runner.solution_exec();
        fs::write(&exec, format!("#!/bin/sh\n{}\n", x.script)).unwrap();
        fs::set_permissions(&exec, fs::Permissions::from_mode(0o755)).unwrap();

        let t = FsTestcase::new("01", tests.path().join("01"), tests.path().join("01.a"));
        let res = dbg!(runner.run(&t).await).unwrap();
        assert_eq!(res.verdict, x.want_verdict);
        assert_eq!(res.exit_code, x.want_exit_code);
        res
    }

    #[tokio::test]
    async fn should_be_ok() {
        run_test(X {
            input: "1 2\n",
            answer: "3\n",
            script: "read a b < sum.in; echo $((a + b)) > sum.out",
            exact: true,
            want_verdict: Verdict::OK,
            want_exit_code: 0,
        })
        .await;
    }

    #[tokio::test]
    async fn should_be_ok_with_loose_spacing() {
        run_test(X {
            input: "1 2\n",
            answer: "1 2\n",
            script: "echo '  1   2 ' > sum.out",
            exact: false,
            want_verdict: Verdict::OK,
            want_exit_code: 0,
        })
        .await;
    }

    #[tokio::test]
    async fn should_be_wa() {
        run_test(X {
            input: "1 2\n",
            answer: "3\n",
            script: "echo 4 > sum.out",
            exact: false,
            want_verdict: Verdict::WA,
            want_exit_code: 0,
        })
        .await;
    }

    #[tokio::test]
    async fn should_be_wa_if_nothing_is_written() {
        run_test(X {
            input: "1 2\n",
            answer: "3\n",
            script: "exit 0",
            exact: false,
            want_verdict: Verdict::WA,
            want_exit_code: 0,
        })
        .await;
    }

    #[tokio::test]
    async fn should_be_re_even_if_output_is_correct() {
        run_test(X {
            input: "1 2\n",
            answer: "3\n",
            script: "echo 3 > sum.out; exit 42",
            exact: false,
            want_verdict: Verdict::RE,
            want_exit_code: 42,
        })
        .await;
    }

    #[tokio::test]
    async fn should_be_tl() {
        let res = run_test(X {
            input: "1 2\n",
            answer: "3\n",
            script: "echo 3 > sum.out; while :; do :; done",
            exact: false,
            want_verdict: Verdict::TL,
            want_exit_code: -9,
        })
        .await;
        assert!(res.execution_time > Duration::from_millis(300));
        assert!(res.timed_out);
        assert_eq!(res.measured_time(), None);
    }

    #[tokio::test]
    async fn checker_reported_tl_keeps_measured_time() {
        let tests = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        fs::write(tests.path().join("01"), "1 2\n").unwrap();
        fs::write(tests.path().join("01.a"), "3\n").unwrap();

        let mut cfg = config(false);
        cfg.checker.standard = false;
        let runner = TestRunner::new(&cfg, work.path());
        for (exec, body) in [
            (runner.solution_exec(), "echo 3 > sum.out"),
            (runner.checker_exec(), "exit 5"),
        ] {
            fs::write(&exec, format!("#!/bin/sh\n{}\n", body)).unwrap();
            fs::set_permissions(&exec, fs::Permissions::from_mode(0o755)).unwrap();
        }

        let t = FsTestcase::new("01", tests.path().join("01"), tests.path().join("01.a"));
        let res = runner.run(&t).await.unwrap();
        assert_eq!(res.verdict, Verdict::TL);
        assert!(!res.timed_out);
        assert_eq!(res.measured_time(), Some(res.execution_time));
    }

    #[tokio::test]
    async fn prepare_replaces_stale_files() {
        let tests = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        fs::write(tests.path().join("07"), "new input\n").unwrap();
        fs::write(tests.path().join("07.a"), "new answer\n").unwrap();
        for name in ["sum.in", "sum.out", TestRunner::SCRATCH_ANSWER] {
            fs::write(work.path().join(name), "stale").unwrap();
        }

        let runner = TestRunner::new(&config(false), work.path());
        let t = FsTestcase::new("07", tests.path().join("07"), tests.path().join("07.a"));
        runner.prepare(&t).unwrap();

        let read = |name: &str| fs::read_to_string(work.path().join(name)).unwrap();
        assert_eq!(read("sum.in"), "new input\n");
        assert_eq!(read(TestRunner::SCRATCH_ANSWER), "new answer\n");
        assert!(!work.path().join("sum.out").exists());
    }

    #[tokio::test]
    async fn compile_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("a.out");
        let err = compile(Path::new("/bin/false"), "-O2", Path::new("x.cpp"), &out)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("exitcode=1"), "{:#}", err);

        compile(Path::new("/bin/true"), "", Path::new("x.cpp"), &out)
            .await
            .unwrap();
    }
}
