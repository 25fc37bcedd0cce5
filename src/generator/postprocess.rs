//! Response normalization for email-kind completions.
//!
//! The pipeline is idempotent: applying it twice yields the same text as
//! once. Per-line trimming runs before blank-line collapsing so that
//! space-padded blank lines cannot reintroduce collapsible runs on a second
//! pass.

use crate::extract::html_to_plain_text;

/// Normalize a raw completion into a clean email body: reduce markup to
/// plain text, drop leading `Subject:` lines, unify line endings, trim
/// per-line trailing whitespace, and collapse runs of blank lines.
pub fn postprocess(content: &str) -> String {
    let plain = html_to_plain_text(content);
    let without_subject = strip_subject_lines(&plain);
    normalize_whitespace(&without_subject)
}

fn is_subject_line(line: &str) -> bool {
    let lowered = line.trim_start().to_lowercase();
    lowered.starts_with("subject:") || lowered.starts_with("**subject:")
}

/// Drop leading `Subject:`-style lines, plain or emphasized. Repeats so
/// stacked subject lines cannot survive a single pass.
fn strip_subject_lines(text: &str) -> String {
    let mut rest = text.trim_start();
    loop {
        let first_line = rest.lines().next().unwrap_or("");
        if first_line.is_empty() || !is_subject_line(first_line) {
            break;
        }
        rest = match rest.split_once('\n') {
            Some((_, tail)) => tail.trim_start(),
            None => "",
        };
    }
    rest.to_string()
}

fn normalize_whitespace(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");

    let trimmed: String = unified
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");

    // Three or more consecutive newlines collapse to exactly one blank line.
    let mut out = String::with_capacity(trimmed.len());
    let mut newline_run = 0usize;
    for ch in trimmed.chars() {
        if ch == '\n' {
            newline_run += 1;
            continue;
        }
        if newline_run > 0 {
            for _ in 0..newline_run.min(2) {
                out.push('\n');
            }
            newline_run = 0;
        }
        out.push(ch);
    }

    out.trim().to_string()
}
