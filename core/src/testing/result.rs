use std::time::Duration;

use super::verdict::Verdict;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionResult {
    pub verdict: Verdict,
    /// CPU time of the run; not meaningful when `timed_out`.
    pub execution_time: Duration,
    pub exit_code: i32,
    /// The run used more CPU time than the limit. A checker may still report
    /// TL for a run that finished in time.
    pub timed_out: bool,
}

impl ExecutionResult {
    /// Execution time, unless the run hit the time limit.
    pub fn measured_time(&self) -> Option<Duration> {
        (!self.timed_out).then_some(self.execution_time)
    }
}

/// Counters accumulated over one judging session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub total: usize,
    pub passed: usize,
    pub max_time: Duration,
}

impl SessionStats {
    /// Records a test whose run could not be completed.
    pub fn record_failure(&mut self) {
        self.total += 1;
    }

    pub fn record(&mut self, res: &ExecutionResult) {
        self.total += 1;
        if res.verdict == Verdict::OK {
            self.passed += 1;
        }
        if let Some(t) = res.measured_time() {
            self.max_time = self.max_time.max(t);
        }
    }

    /// Percentage of passed tests, rounded down. Zero when nothing was run.
    pub fn score(&self) -> usize {
        if self.total == 0 {
            0
        } else {
            100 * self.passed / self.total
        }
    }

    /// `passed/total (score/100)`
    pub fn score_line(&self) -> String {
        format!("{}/{} ({}/100)", self.passed, self.total, self.score())
    }

    /// The slowest run stayed within three quarters of the limit.
    pub fn is_time_comfortable(&self, limit: Duration) -> bool {
        self.max_time <= limit * 3 / 4
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn res(verdict: Verdict, ms: u64) -> ExecutionResult {
        ExecutionResult {
            verdict,
            execution_time: Duration::from_millis(ms),
            exit_code: 0,
            timed_out: ms > 1000,
        }
    }

    #[test]
    fn stats_count_passed_and_max_time() {
        let mut stats = SessionStats::default();
        stats.record(&res(Verdict::OK, 30));
        stats.record(&res(Verdict::WA, 120));
        stats.record(&res(Verdict::TL, 1500));
        stats.record(&res(Verdict::OK, 80));
        stats.record_failure();

        assert_eq!(stats.total, 5);
        assert_eq!(stats.passed, 2);
        assert_eq!(stats.max_time, Duration::from_millis(120));
        assert_eq!(stats.score_line(), "2/5 (40/100)");
    }

    #[test]
    fn checker_reported_tl_still_counts_for_max_time() {
        let mut stats = SessionStats::default();
        stats.record(&res(Verdict::TL, 43));
        assert_eq!(stats.max_time, Duration::from_millis(43));
        assert_eq!(stats.passed, 0);
    }

    #[test]
    fn score_rounds_down_and_handles_empty_session() {
        let stats = SessionStats {
            total: 3,
            passed: 2,
            max_time: Duration::ZERO,
        };
        assert_eq!(stats.score(), 66);
        assert_eq!(SessionStats::default().score_line(), "0/0 (0/100)");
    }

    #[test]
    fn time_health_threshold_is_three_quarters() {
        let limit = Duration::from_millis(1000);
        let mut stats = SessionStats::default();
        stats.max_time = Duration::from_millis(750);
        assert!(stats.is_time_comfortable(limit));
        stats.max_time = Duration::from_millis(751);
        assert!(!stats.is_time_comfortable(limit));
    }
}
