//! Line based comparison of an expected answer with the produced output.

use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

use anyhow::Context as _;
use lazy_regex::regex_replace_all;

/// Collapses runs of spaces to one space and trims the line.
pub fn normalize_line(line: &str) -> String {
    regex_replace_all!(r" {2,}", line, |_| " ").trim().to_owned()
}

fn read_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<Option<String>> {
    buf.clear();
    if reader.read_until(b'\n', buf)? == 0 {
        return Ok(None);
    }
    if buf.ends_with(b"\n") {
        buf.pop();
        if buf.ends_with(b"\r") {
            buf.pop();
        }
    }
    Ok(Some(String::from_utf8_lossy(buf).into_owned()))
}

/// Compares `answer` with `output` line by line.
///
/// Only as many lines as the answer has are inspected: surplus output lines are
/// ignored, and output lines missing at the end count as empty lines.
pub fn compare<A, O>(mut answer: A, mut output: O, exact: bool) -> io::Result<bool>
where
    A: BufRead,
    O: BufRead,
{
    let (mut ans_buf, mut out_buf) = (Vec::new(), Vec::new());

    while let Some(ans_line) = read_line(&mut answer, &mut ans_buf)? {
        let out_line = read_line(&mut output, &mut out_buf)?.unwrap_or_default();

        let same = if exact {
            ans_line == out_line
        } else {
            normalize_line(&ans_line) == normalize_line(&out_line)
        };
        if !same {
            return Ok(false);
        }
    }
    Ok(true)
}

pub fn compare_files(
    answer_file: impl AsRef<Path>,
    output_file: impl AsRef<Path>,
    exact: bool,
) -> anyhow::Result<bool> {
    let open = |path: &Path| {
        File::open(path)
            .map(BufReader::new)
            .with_context(|| format!("Cannot open '{}'", path.display()))
    };
    let answer = open(answer_file.as_ref())?;
    let output = open(output_file.as_ref())?;
    compare(answer, output, exact).context("Failed to compare output with answer")
}
