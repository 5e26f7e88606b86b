//! Child processes whose user CPU time can be observed while they run.
//!
//! The process is reaped with `wait4(2)` so that the final CPU time is taken
//! from the kernel's resource usage record; while it is still running the
//! time is read from `/proc/<pid>/stat`.

use std::{
    ffi::OsStr,
    fs, io,
    mem::MaybeUninit,
    path::{Path, PathBuf},
    process::{Command, Stdio},
    time::Duration,
};

use nix::{
    sched::{sched_setaffinity, CpuSet},
    sys::signal::{kill, Signal},
    unistd::{sysconf, Pid, SysconfVar},
};
use once_cell::sync::Lazy;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to spawn '{0}': {1}")]
    Spawn(PathBuf, #[source] io::Error),

    #[error("Failed to wait for process {0}: {1}")]
    Wait(Pid, #[source] io::Error),

    #[error("Failed to kill process {0}: {1}")]
    Kill(Pid, #[source] nix::Error),

    #[error("Cannot read CPU time of process {0}: {1}")]
    ReadStat(Pid, #[source] io::Error),

    #[error("Malformed /proc stat of process {0}")]
    MalformedStat(Pid),
}

static CLOCK_TICKS_PER_SEC: Lazy<u64> = Lazy::new(|| match sysconf(SysconfVar::CLK_TCK) {
    Ok(Some(ticks)) if ticks > 0 => ticks as u64,
    _ => 100,
});

/// Scheduling tweaks applied right after the process has started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpawnOptions {
    /// Restrict the process to logical CPU 0.
    pub single_core: bool,
    /// Ask for the highest scheduling priority (needs `CAP_SYS_NICE`).
    pub high_priority: bool,
}

impl SpawnOptions {
    /// Settings used for the judged solution.
    pub fn for_solution() -> Self {
        Self {
            single_core: true,
            high_priority: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Exit {
    code: i32,
    user_time: Duration,
}

/// A running (or finished but not yet dropped) child process.
///
/// Dropping a process that is still running kills it.
#[derive(Debug)]
pub struct ChildProcess {
    pid: Pid,
    program: PathBuf,
    exit: Option<Exit>,
}

impl ChildProcess {
    /// Starts `program` in `cwd` with no terminal I/O attached.
    pub fn spawn<I, S>(
        program: impl AsRef<Path>,
        args: I,
        cwd: impl AsRef<Path>,
        opts: SpawnOptions,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let program = program.as_ref();
        let child = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::Spawn(program.to_owned(), e))?;

        // `std::process::Child` neither waits nor kills on drop; reaping is ours.
        let proc = Self {
            pid: Pid::from_raw(child.id() as i32),
            program: program.to_owned(),
            exit: None,
        };
        log::debug!("Spawned {:?} (pid={})", proc.program, proc.pid);

        if opts.single_core {
            proc.pin_to_first_core();
        }
        if opts.high_priority {
            proc.raise_priority();
        }
        Ok(proc)
    }

    fn pin_to_first_core(&self) {
        let mut set = CpuSet::new();
        let res = set.set(0).and_then(|_| sched_setaffinity(self.pid, &set));
        if let Err(e) = res {
            log::warn!("Cannot pin pid={} to CPU 0: {}", self.pid, e);
        }
    }

    fn raise_priority(&self) {
        let ret = unsafe { libc::setpriority(libc::PRIO_PROCESS, self.pid.as_raw() as libc::id_t, -20) };
        if ret != 0 {
            log::debug!(
                "Cannot raise priority of pid={}: {}",
                self.pid,
                io::Error::last_os_error()
            );
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Non-blocking check whether the process has terminated.
    pub fn has_exited(&mut self) -> Result<bool> {
        if self.exit.is_none() {
            self.exit = wait4(self.pid, true)?;
        }
        Ok(self.exit.is_some())
    }

    /// Exit status, or `-signal` when terminated by a signal. `None` while running.
    pub fn exit_code(&self) -> Option<i32> {
        self.exit.map(|e| e.code)
    }

    /// User-mode CPU time consumed so far.
    pub fn user_cpu_time(&self) -> Result<Duration> {
        match self.exit {
            Some(exit) => Ok(exit.user_time),
            None => read_proc_user_time(self.pid),
        }
    }

    /// Blocks until the process terminates.
    pub fn wait(&mut self) -> Result<i32> {
        if self.exit.is_none() {
            self.exit = wait4(self.pid, false)?;
        }
        Ok(self.exit_code().unwrap_or(-1))
    }

    /// Sends SIGKILL and waits until the process is gone.
    pub fn kill_and_wait(&mut self) -> Result<()> {
        if self.exit.is_some() {
            return Ok(());
        }
        match kill(self.pid, Signal::SIGKILL) {
            Ok(()) | Err(nix::Error::ESRCH) => {}
            Err(e) => return Err(Error::Kill(self.pid, e)),
        }
        self.wait().map(|_| ())
    }
}

impl Drop for ChildProcess {
    fn drop(&mut self) {
        if self.exit.is_none() {
            self.kill_and_wait()
                .unwrap_or_else(|e| log::warn!("Failed to clean up child process: {}", e));
        }
    }
}

fn wait4(pid: Pid, nohang: bool) -> Result<Option<Exit>> {
    let flags = if nohang { libc::WNOHANG } else { 0 };
    let mut status: libc::c_int = 0;
    let mut usage = MaybeUninit::<libc::rusage>::zeroed();

    let ret = loop {
        let ret = unsafe { libc::wait4(pid.as_raw(), &mut status, flags, usage.as_mut_ptr()) };
        if ret != -1 {
            break ret;
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(Error::Wait(pid, err));
        }
    };
    if ret == 0 {
        return Ok(None);
    }

    let usage = unsafe { usage.assume_init() };
    let code = if libc::WIFEXITED(status) {
        libc::WEXITSTATUS(status)
    } else if libc::WIFSIGNALED(status) {
        -libc::WTERMSIG(status)
    } else {
        -1
    };
    Ok(Some(Exit {
        code,
        user_time: timeval_to_duration(usage.ru_utime),
    }))
}

fn timeval_to_duration(tv: libc::timeval) -> Duration {
    Duration::from_secs(tv.tv_sec.max(0) as u64) + Duration::from_micros(tv.tv_usec.max(0) as u64)
}

fn read_proc_user_time(pid: Pid) -> Result<Duration> {
    let stat = fs::read_to_string(format!("/proc/{}/stat", pid))
        .map_err(|e| Error::ReadStat(pid, e))?;
    let ticks = parse_utime_ticks(&stat).ok_or(Error::MalformedStat(pid))?;
    Ok(Duration::from_millis(ticks * 1000 / *CLOCK_TICKS_PER_SEC))
}

/// Extracts `utime` (field 14) from the contents of `/proc/<pid>/stat`.
fn parse_utime_ticks(stat: &str) -> Option<u64> {
    // `comm` may contain spaces and parentheses, so count from the last ')'.
    let rest = &stat[stat.rfind(')')? + 1..];
    rest.split_whitespace().nth(11)?.parse().ok()
}
