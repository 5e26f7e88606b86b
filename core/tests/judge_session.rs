use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    time::Duration,
};

use olympcheck_core::{action, locale::Messages, Config};

/// Echoes the input back, except for the input `spin` which burns CPU forever.
const ECHO_SOLUTION: &str = r#"#!/bin/sh
read x < sol.in
if [ "$x" = spin ]; then
  while :; do :; done
fi
echo "$x" > sol.out
"#;

struct Fixture {
    dir: tempfile::TempDir,
}

impl Fixture {
    fn new(time_limit_ms: u64, tests: &[(&str, &str)]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        let solution = root.join("sol.sh");
        fs::write(&solution, ECHO_SOLUTION).unwrap();
        fs::set_permissions(&solution, fs::Permissions::from_mode(0o755)).unwrap();

        fs::create_dir(root.join("tests")).unwrap();
        for (name, data) in tests {
            fs::write(root.join("tests").join(name), format!("{}\n", data)).unwrap();
            fs::write(root.join("tests").join(format!("{}.a", name)), format!("{}\n", data)).unwrap();
        }

        let toml = format!(
            r#"
[settings]
lang = "en"
work_dir = "work"

[solution]
file_name = "sol"
precompiled = true
compiler = "g++"
compile_options = ""
source = "sol.sh"
tests_dir = "tests"
time_limit = {}

[checker]
standard = true
exact = false
precompiled = false
compiler = "g++"
compile_options = ""
"#,
            time_limit_ms
        );
        fs::write(root.join(Config::FILENAME), toml).unwrap();
        Self { dir }
    }

    fn config(&self) -> Config {
        Config::from_toml_file(self.dir.path().join(Config::FILENAME)).unwrap()
    }

    fn work(&self, rel: &str) -> PathBuf {
        self.dir.path().join("work").join(rel)
    }
}

fn names_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn all_tests_pass_and_are_filed_as_ok() {
    let fx = Fixture::new(1000, &[("01", "1 2"), ("02", "hello"), ("03", "42")]);
    let cfg = fx.config();

    let stats = action::judge(&cfg, &Messages::default()).await.unwrap();
    assert_eq!(stats.score_line(), "3/3 (100/100)");
    assert!(stats.max_time < Duration::from_millis(1000));

    assert_eq!(
        names_in(&fx.work("OK")),
        ["01", "01.a", "02", "02.a", "03", "03.a"]
    );
    // scratch files are gone, only the bucket is left
    assert_eq!(names_in(&fx.work("")), ["OK"]);
}

#[tokio::test]
async fn cpu_burner_is_tl_and_excluded_from_max_time() {
    let fx = Fixture::new(1000, &[("01", "7"), ("02", "spin")]);
    let cfg = fx.config();

    let stats = action::judge(&cfg, &Messages::default()).await.unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.passed, 1);
    assert!(stats.max_time < Duration::from_millis(1000));

    assert_eq!(names_in(&fx.work("TL")), ["02", "02.a"]);
    assert_eq!(names_in(&fx.work("OK")), ["01", "01.a"]);
}

#[tokio::test]
async fn missing_tests_dir_aborts_before_running() {
    let fx = Fixture::new(1000, &[]);
    fs::remove_dir(fx.dir.path().join("tests")).unwrap();
    let cfg = fx.config();

    assert!(action::judge(&cfg, &Messages::default()).await.is_err());
    assert!(!fx.work("").exists());
}

#[tokio::test]
async fn empty_tests_dir_scores_zero() {
    let fx = Fixture::new(1000, &[]);
    let stats = action::judge(&fx.config(), &Messages::default())
        .await
        .unwrap();
    assert_eq!(stats.score_line(), "0/0 (0/100)");
}
