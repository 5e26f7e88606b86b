use std::time::Duration;

use super::process::{self, ChildProcess};

/// How a watched process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorOutcome {
    /// Final user CPU time. Only meaningful as a statistic when `!killed`.
    pub cpu_time: Duration,
    pub exit_code: i32,
    /// The monitor had to kill the process because it ran over the limit.
    pub killed: bool,
}

/// Enforces a CPU time limit by polling.
///
/// The process may overrun the limit by up to one poll interval plus
/// scheduling latency before it is killed.
#[derive(Debug, Clone)]
pub struct TimeLimitMonitor {
    limit: Duration,
    poll_interval: Duration,
}

impl TimeLimitMonitor {
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(20);

    pub fn new(limit: Duration) -> Self {
        Self {
            limit,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    pub async fn watch(&self, proc: &mut ChildProcess) -> process::Result<MonitorOutcome> {
        while !proc.has_exited()? && proc.user_cpu_time()? <= self.limit {
            tokio::time::sleep(self.poll_interval).await;
        }

        let killed = if proc.has_exited()? {
            false
        } else {
            log::debug!("Killing pid={}: CPU time limit exceeded", proc.pid());
            proc.kill_and_wait()?;
            true
        };

        Ok(MonitorOutcome {
            cpu_time: proc.user_cpu_time()?,
            exit_code: proc.exit_code().unwrap_or(-1),
            killed,
        })
    }
}
