use std::path::{Path, PathBuf};
use std::result::Result as StdResult;
use std::time::Duration;

use anyhow::{ensure, Context as _};
use rust_embed::RustEmbed;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    #[serde(skip)]
    pub source_config_file: Option<PathBuf>,
    pub settings: Settings,
    #[serde(default)]
    pub update: UpdateConfig,
    pub solution: SolutionConfig,
    pub checker: CheckerConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub lang: String,
    #[serde(default = "Settings::default_work_dir")]
    pub work_dir: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UpdateConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub version_url: String,
    #[serde(default)]
    pub download_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SolutionConfig {
    /// I/O file name pattern; `*` is substituted with `in`/`out`.
    #[serde(default)]
    pub file_name: String,
    pub precompiled: bool,
    pub compiler: PathBuf,
    pub compile_options: String,
    pub source: PathBuf,
    pub tests_dir: PathBuf,
    /// CPU time limit per test in milliseconds.
    pub time_limit: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckerConfig {
    pub standard: bool,
    pub exact: bool,
    pub precompiled: bool,
    pub compiler: PathBuf,
    pub compile_options: String,
    #[serde(default)]
    pub source: PathBuf,
}

#[derive(RustEmbed)]
#[folder = "assets/"]
pub(crate) struct Asset;

impl Asset {
    pub(crate) fn get_str(name: &str) -> anyhow::Result<String> {
        let file = Self::get(name).with_context(|| format!("Missing embedded asset '{}'", name))?;
        Ok(String::from_utf8_lossy(file.data.as_ref()).into_owned())
    }
}

impl Config {
    pub const FILENAME: &str = "olympcheck.toml";

    pub fn example_toml() -> anyhow::Result<String> {
        Asset::get_str(Self::FILENAME)
    }

    /// Writes the example config into `dir` and returns its path.
    pub fn write_example(dir: impl AsRef<Path>) -> anyhow::Result<PathBuf> {
        let path = dir.as_ref().join(Self::FILENAME);
        ensure!(!path.exists(), "'{}' already exists", path.display());
        fsutil::write_with_mkdir(&path, Self::example_toml()?)?;
        Ok(path)
    }

    pub fn from_toml(s: &str) -> StdResult<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn from_toml_file(filepath: PathBuf) -> anyhow::Result<Self> {
        let toml = fsutil::read_to_string(&filepath).context("Cannot read a file")?;
        let mut cfg = Self::from_toml(&toml)
            .with_context(|| format!("Invalid config TOML: {:?}", filepath))?;
        cfg.validate()
            .with_context(|| format!("Invalid config TOML: {:?}", filepath))?;

        let parent = match filepath.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let base_dir = fsutil::canonicalize_path(parent)?;
        cfg.resolve_paths(&base_dir);
        cfg.check_work_dir(&base_dir)
            .with_context(|| format!("Invalid config TOML: {:?}", filepath))?;
        cfg.source_config_file = Some(filepath);
        Ok(cfg)
    }

    /// Find config file ancestor dirs, including current dir.
    pub fn find_file_in_ancestors(cur_dir: impl AsRef<Path>) -> Option<PathBuf> {
        cur_dir
            .as_ref()
            .ancestors()
            .map(|dir| dir.join(Self::FILENAME))
            .find(|path| path.is_file())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.solution.time_limit > 0,
            "'solution.time_limit' must be a positive number of milliseconds"
        );
        ensure!(
            !self.settings.work_dir.as_os_str().is_empty(),
            "'settings.work_dir' must not be empty"
        );
        Ok(())
    }

    /// The work dir is wiped before every run, so it must not hold anything of the user's.
    pub fn check_work_dir(&self, config_dir: &Path) -> anyhow::Result<()> {
        let work_dir = &self.settings.work_dir;
        let protected = [
            ("config dir", config_dir),
            ("solution.source", self.solution.source.as_path()),
            ("solution.tests_dir", self.solution.tests_dir.as_path()),
            ("checker.source", self.checker.source.as_path()),
        ];
        for (what, path) in protected {
            if path.as_os_str().is_empty() {
                continue;
            }
            ensure!(
                !path.starts_with(work_dir),
                "'settings.work_dir' ({}) must not contain the {} ({})",
                work_dir.display(),
                what,
                path.display()
            );
        }
        Ok(())
    }

    /// Makes every relative path absolute with respect to `base_dir`.
    /// Bare compiler names (no separator) are left for `$PATH` lookup.
    pub fn resolve_paths(&mut self, base_dir: &Path) {
        fn resolve(path: &mut PathBuf, base_dir: &Path) {
            if !path.as_os_str().is_empty() && path.is_relative() {
                *path = fsutil::normalize_path(base_dir.join(&*path));
            }
        }
        fn resolve_program(path: &mut PathBuf, base_dir: &Path) {
            if path.components().count() > 1 {
                resolve(path, base_dir);
            }
        }

        resolve(&mut self.settings.work_dir, base_dir);
        resolve_program(&mut self.solution.compiler, base_dir);
        resolve(&mut self.solution.source, base_dir);
        resolve(&mut self.solution.tests_dir, base_dir);
        resolve_program(&mut self.checker.compiler, base_dir);
        resolve(&mut self.checker.source, base_dir);
    }

    pub fn source_config_dir(&self) -> Option<&Path> {
        self.source_config_file.as_deref().and_then(Path::parent)
    }
}

impl Settings {
    fn default_work_dir() -> PathBuf {
        PathBuf::from("work")
    }
}

impl SolutionConfig {
    pub fn time_limit(&self) -> Duration {
        Duration::from_millis(self.time_limit)
    }

    fn io_pattern(&self) -> String {
        let name = self.file_name.trim();
        if !name.is_empty() {
            return name.to_owned();
        }
        self.source
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn io_file_name(&self, ext: &str) -> String {
        let pattern = self.io_pattern();
        if pattern.contains('*') {
            pattern.replace('*', ext)
        } else {
            format!("{}.{}", pattern, ext)
        }
    }

    /// Name of the file the solution reads its input from.
    pub fn input_file_name(&self) -> String {
        self.io_file_name("in")
    }

    /// Name of the file the solution writes its output to.
    pub fn output_file_name(&self) -> String {
        self.io_file_name("out")
    }
}
