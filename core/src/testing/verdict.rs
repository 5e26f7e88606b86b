use std::time::Duration;

/// Outcome of a single test.
///
/// The discriminants are a wire contract: external checkers report their
/// verdict as a process exit code equal to the ordinal.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::Display,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[repr(u8)]
pub enum Verdict {
    OK = 0,
    WA = 1,
    PE = 2,
    FAIL = 3,
    RE = 4,
    TL = 5,
}

impl Verdict {
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn from_ordinal(code: i32) -> Option<Self> {
        use Verdict::*;
        match code {
            0 => Some(OK),
            1 => Some(WA),
            2 => Some(PE),
            3 => Some(FAIL),
            4 => Some(RE),
            5 => Some(TL),
            _ => None,
        }
    }

    /// Name of the directory the test is filed into.
    pub fn bucket_name(self) -> &'static str {
        use Verdict::*;
        match self {
            OK => "OK",
            WA => "WA",
            PE => "PE",
            FAIL => "FL",
            RE => "RE",
            TL => "TL",
        }
    }
}

/// Decides the verdict from what is known without looking at the output.
///
/// Returns `None` when the run finished in time with exit code 0, in which
/// case the output has to be checked. Exceeding the limit wins over any exit
/// code, since a killed process never exits cleanly.
pub fn classify(cpu_time: Duration, limit: Duration, exit_code: i32) -> Option<Verdict> {
    if cpu_time > limit {
        Some(Verdict::TL)
    } else if exit_code != 0 {
        Some(Verdict::RE)
    } else {
        None
    }
}
