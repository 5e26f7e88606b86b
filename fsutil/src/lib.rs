use std::{
    fs::{self, OpenOptions, ReadDir},
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

pub mod error {
    use std::{io, path::PathBuf};

    pub type Result<T> = std::result::Result<T, self::Error>;

    type Msg = &'static str;

    #[derive(Debug, thiserror::Error)]
    pub enum Error {
        #[error("{0} ({1}): {2}")]
        SingleIO(Msg, PathBuf, #[source] io::Error),

        #[error("{0} (from='{1}', to='{2}): {3}")]
        FromToIO(Msg, PathBuf, PathBuf, #[source] io::Error),

        #[error("Failed to canonicalize path '{0}': {1}")]
        CanonicalizePath(PathBuf, #[source] io::Error),

        #[error("No access to '{0}' (still locked after {1} attempts)")]
        NoAccess(PathBuf, u32),
    }
}
pub use error::{Error, Result};

/// Retry policy of [`wait_for_file`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockWait {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for LockWait {
    fn default() -> Self {
        Self {
            attempts: 100,
            interval: Duration::from_millis(20),
        }
    }
}

#[must_use]
pub fn mkdir_all(path: impl AsRef<Path>) -> Result<()> {
    let dir = path.as_ref();
    fs::create_dir_all(dir).map_err(|e| Error::SingleIO("Cannot create dir", dir.to_owned(), e))
}

#[must_use]
pub fn write<P, C>(filepath: P, contents: C) -> Result<()>
where
    P: AsRef<Path>,
    C: AsRef<[u8]>,
{
    fs::write(&filepath, contents)
        .map_err(|e| Error::SingleIO("Cannot write file", filepath.as_ref().to_owned(), e))
}

#[must_use]
pub fn write_with_mkdir<P, C>(filepath: P, contents: C) -> Result<()>
where
    P: AsRef<Path>,
    C: AsRef<[u8]>,
{
    if let Some(dir) = filepath.as_ref().parent() {
        self::mkdir_all(dir)?;
    }
    self::write(filepath, contents)
}

#[must_use]
pub fn read_to_string(filepath: impl AsRef<Path>) -> Result<String> {
    fs::read_to_string(&filepath)
        .map_err(|e| Error::SingleIO("Cannot read file", filepath.as_ref().to_owned(), e))
}

#[must_use]
pub fn remove_file(filepath: impl AsRef<Path>) -> Result<()> {
    fs::remove_file(&filepath)
        .map_err(|e| Error::SingleIO("Cannot remove file", filepath.as_ref().to_owned(), e))
}

#[must_use]
pub fn remove_dir(dir: impl AsRef<Path>) -> Result<()> {
    fs::remove_dir(&dir)
        .map_err(|e| Error::SingleIO("Cannot remove dir", dir.as_ref().to_owned(), e))
}

#[must_use]
pub fn remove_dir_all(dir: impl AsRef<Path>) -> Result<()> {
    fs::remove_dir_all(&dir)
        .map_err(|e| Error::SingleIO("Cannot remove dir", dir.as_ref().to_owned(), e))
}

#[must_use]
pub fn copy_file(from: impl AsRef<Path>, to: impl AsRef<Path>) -> Result<u64> {
    fs::copy(&from, &to).map_err(|e| {
        Error::FromToIO(
            "Cannot copy file",
            from.as_ref().to_owned(),
            to.as_ref().to_owned(),
            e,
        )
    })
}

#[must_use]
pub fn read_dir(dir: impl AsRef<Path>) -> Result<ReadDir> {
    fs::read_dir(&dir).map_err(|e| Error::SingleIO("Cannot read dir", dir.as_ref().to_owned(), e))
}

/// Lists regular files and directories directly under `dir`, each sorted by path.
pub fn list_dir(dir: impl AsRef<Path>) -> Result<(Vec<PathBuf>, Vec<PathBuf>)> {
    let mut files = Vec::new();
    let mut dirs = Vec::new();
    for entry in self::read_dir(&dir)?.filter_map(std::result::Result::ok) {
        let Ok(ft) = entry.file_type() else {
            continue
        };
        if ft.is_dir() {
            dirs.push(entry.path());
        } else {
            files.push(entry.path());
        }
    }
    files.sort();
    dirs.sort();
    Ok((files, dirs))
}

pub fn canonicalize_path(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    path.canonicalize()
        .map_err(|e| Error::CanonicalizePath(path.to_owned(), e))
}

/// Returns true if both paths exist and point to the same file.
pub fn is_same_file(a: impl AsRef<Path>, b: impl AsRef<Path>) -> bool {
    match (canonicalize_path(a), canonicalize_path(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Normalize the path
/// ```
/// use fsutil::normalize_path;
/// use std::path::Path;
///
/// assert_eq!(normalize_path("./hoge/.config/././foo"), Path::new("hoge/.config/foo"));
/// assert_eq!(normalize_path("hoge/.config/../../bar/."), Path::new("bar"));
/// assert_eq!(normalize_path("../foo/../hello"), Path::new("../hello"));
/// assert_eq!(normalize_path("/"), Path::new("/"));
/// assert_eq!(normalize_path("/foo/"), Path::new("/foo"));
/// assert_eq!(normalize_path("./foo/"), Path::new("foo"));
/// assert_eq!(normalize_path("."), Path::new("."));
/// ```
pub fn normalize_path(path: impl AsRef<Path>) -> PathBuf {
    use ::std::path::Component;
    let components = path.as_ref().components();
    let mut stack = Vec::with_capacity(components.size_hint().1.unwrap_or(4));
    for c in components {
        match c {
            Component::CurDir => (),
            Component::ParentDir if matches!(stack.last(), Some(Component::Normal(_))) => {
                stack.pop();
            }
            _ => {
                stack.push(c);
            }
        }
    }
    if stack.is_empty() {
        stack.push(Component::CurDir);
    }
    stack.iter().collect()
}

/// Resolves a program the way a shell would: paths containing a separator are
/// taken as-is, bare names are searched in `$PATH`.
pub fn find_executable(program: impl AsRef<Path>) -> Option<PathBuf> {
    which::which(program.as_ref()).ok()
}

/// A file is available when it exists and can be opened for both reading and writing.
pub fn is_file_available(filepath: impl AsRef<Path>) -> bool {
    let filepath = filepath.as_ref();
    filepath.is_file()
        && OpenOptions::new()
            .read(true)
            .write(true)
            .open(filepath)
            .is_ok()
}

/// Blocks until `filepath` can be opened for read/write, polling according to `policy`.
///
/// A missing file is created empty first, so callers may rely on the file existing
/// once this returns `Ok`.
pub fn wait_for_file(filepath: impl AsRef<Path>, policy: LockWait) -> Result<()> {
    let filepath = filepath.as_ref();
    if !filepath.exists() {
        OpenOptions::new()
            .write(true)
            .create(true)
            .open(filepath)
            .map_err(|e| Error::SingleIO("Cannot create file", filepath.to_owned(), e))?;
    }

    let mut remaining = policy.attempts;
    while !is_file_available(filepath) && remaining > 0 {
        log::debug!("Waiting for '{}' to be released", filepath.display());
        thread::sleep(policy.interval);
        remaining -= 1;
    }
    if is_file_available(filepath) {
        Ok(())
    } else {
        Err(Error::NoAccess(filepath.to_owned(), policy.attempts))
    }
}

/// Removes `filepath` if it exists, waiting for the lock to be released first.
pub fn remove_file_when_released(filepath: impl AsRef<Path>, policy: LockWait) -> Result<()> {
    let filepath = filepath.as_ref();
    if !filepath.exists() {
        return Ok(());
    }
    self::wait_for_file(filepath, policy)?;
    self::remove_file(filepath)
}
