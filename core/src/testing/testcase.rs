use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

/// An input file paired with its expected answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsTestcase {
    name: String,
    input_data_path: PathBuf,
    answer_data_path: PathBuf,
}

pub trait FsTestcaseFinder {
    fn find_by_input_file_path(&self, path: impl AsRef<Path>) -> Option<FsTestcase>;
}

/// Accepts `name` (no extension) when a sibling `name.a` exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnswerSuffixFinder;

impl AnswerSuffixFinder {
    pub const ANSWER_SUFFIX: &str = ".a";
}

impl FsTestcaseFinder for AnswerSuffixFinder {
    fn find_by_input_file_path(&self, path: impl AsRef<Path>) -> Option<FsTestcase> {
        let path = path.as_ref();
        let name = path.file_name()?.to_str()?;
        if name.contains('.') {
            return None;
        }

        let mut answer: OsString = path.as_os_str().to_owned();
        answer.push(Self::ANSWER_SUFFIX);
        let answer = PathBuf::from(answer);
        if !answer.is_file() {
            return None;
        }
        Some(FsTestcase::new(name, path, answer))
    }
}

impl FsTestcase {
    pub fn new(
        name: impl Into<String>,
        input: impl Into<PathBuf>,
        answer: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            input_data_path: input.into(),
            answer_data_path: answer.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input_path(&self) -> &Path {
        &self.input_data_path
    }

    pub fn answer_path(&self) -> &Path {
        &self.answer_data_path
    }

    /// Lists the testcases in `dir` in lexicographic order of their names.
    pub fn enumerate(
        dir: impl AsRef<Path>,
        finder: &impl FsTestcaseFinder,
    ) -> fsutil::Result<Vec<Self>> {
        let (files, _) = fsutil::list_dir(&dir)?;
        let mut res: Vec<_> = files
            .iter()
            .filter_map(|f| finder.find_by_input_file_path(f))
            .collect();
        res.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(res)
    }
}
