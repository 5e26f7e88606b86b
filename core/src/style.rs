use std::time::Duration;

use colored::{Color, ColoredString, Colorize};
use crossterm::terminal;

use crate::{
    locale::Messages,
    testing::{ExecutionResult, SessionStats, Verdict},
};

#[macro_export]
macro_rules! print_success {
    ($fmt:literal, $($e:tt)*) => {
        use ::colored::Colorize as _;
        println!("{}", format!($fmt, $($e)*).green())
    }
}

pub fn is_truecolor_supported() -> bool {
    let Ok(v) = std::env::var("COLORTERM") else {
        return false
    };
    matches!(v.as_str(), "truecolor" | "24bit")
}

pub trait ColorTheme {
    fn color(&self) -> Color;
}

impl ColorTheme for log::Level {
    fn color(&self) -> Color {
        use log::Level::*;
        match self {
            Error => Color::BrightRed,
            Warn => Color::BrightYellow,
            Info => Color::Cyan,
            Debug => Color::Magenta,
            Trace => Color::Blue,
        }
    }
}

impl ColorTheme for Verdict {
    fn color(&self) -> Color {
        use Verdict::*;
        if !self::is_truecolor_supported() {
            return match self {
                OK => Color::Green,
                WA | PE => Color::Red,
                FAIL => Color::Magenta,
                RE => Color::Magenta,
                TL => Color::Red,
            };
        }

        match self {
            OK => Color::TrueColor {
                r: 30,
                g: 180,
                b: 40,
            },
            WA | PE => Color::TrueColor {
                r: 210,
                g: 60,
                b: 40,
            },
            FAIL => Color::TrueColor {
                r: 120,
                g: 120,
                b: 200,
            },
            RE => Color::TrueColor {
                r: 171,
                g: 40,
                b: 200,
            },
            TL => Color::TrueColor {
                r: 220,
                g: 42,
                b: 42,
            },
        }
    }
}

/// `[OK - 15 ms]`, or `[TL - >1000 ms]` for a run that hit the limit.
pub fn verdict_tag(res: &ExecutionResult, limit: Duration) -> ColoredString {
    let text = match res.measured_time() {
        Some(t) => format!("[{} - {} ms]", res.verdict, t.as_millis()),
        None => format!("[{} - >{} ms]", res.verdict, limit.as_millis()),
    };
    text.color(res.verdict.color()).bold()
}

pub fn ok_tag() -> ColoredString {
    "[OK]".green()
}

pub fn error_tag(msgs: &Messages) -> ColoredString {
    format!("[{}]", msgs.error()).bright_red()
}

pub fn print_error(msg: impl AsRef<str>) {
    println!("{}", msg.as_ref().bright_red());
}

pub fn print_banner(name: &str, version: &str) {
    println!("{}\n", format!("{} v{}", name, version).cyan().bold());
}

fn score_color(stats: &SessionStats) -> Color {
    match stats.score() {
        100 => Color::Green,
        0 => Color::Red,
        _ => Color::Yellow,
    }
}

pub fn print_summary(stats: &SessionStats, limit: Duration, msgs: &Messages) {
    let (cols, _) = terminal::size().unwrap_or((40, 40));
    let bar = "─".repeat((cols as usize).min(60)).bright_black();

    println!("\n{}", bar);
    println!(
        "{} {}",
        msgs.testing_complete(),
        stats.score_line().color(score_color(stats)).bold()
    );

    let time_color = if stats.is_time_comfortable(limit) {
        Color::Green
    } else {
        Color::Yellow
    };
    println!(
        "{} {}",
        msgs.max_time(),
        format!("{} ms", stats.max_time.as_millis()).color(time_color)
    );
    println!("{}", bar);
}
