use std::{cmp::min, collections::BTreeSet, sync::OnceLock};

use regex::{Regex, RegexSet};

/// Maximum number of lines in an extracted excerpt, to avoid huge comments.
const TARGET_LINE_COUNT: usize = 50;
/// Lines of context included before and after each matched error line.
const CONTEXT_LINES: usize = 3;
/// Tail length returned when no error patterns match at all.
const FALLBACK_TAIL_LINES: usize = 30;

/// Strip ANSI escape codes from text. These codes are used for terminal
/// coloring but appear as garbled characters in PR comments.
pub fn strip_ansi_codes(text: &str) -> String {
    // ESC [ followed by any number of parameter/intermediate bytes and a
    // final byte. Covers color codes, cursor movement, and other CSI
    // control sequences.
    static REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = REGEX.get_or_init(|| Regex::new(r"\x1B\[[0-?]*[ -/]*[@-~]").unwrap());
    regex.replace_all(text, "").into_owned()
}

fn error_patterns() -> &'static RegexSet {
    // Ordered from most to least specific. The order documents intended
    // priority, but selection only checks membership: a line matching any
    // pattern is flagged.
    static PATTERNS: OnceLock<RegexSet> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        RegexSet::new([
            // Compiler errors like error[E0433]
            r"(?i)error\[E\d+\]",
            r"(?i)panicked at",
            r"(?i)thread .+ panicked",
            // Lines starting with "error:" or "error "
            r"(?i)^error:",
            r"(?i)^error\s",
            // "file.rs: error:" style
            r"(?i):\s*error:",
            r"(?i)FAILED",
            r"(?i)FAILURE",
            // Generic fallbacks
            r"(?i)error",
            r"(?i)failed",
            r"(?i)exception",
            r"(?i)panic",
        ])
        .unwrap()
    })
}

/// Extract the most relevant error lines from job logs.
///
/// Errors near the end of the log are prioritized, as those are typically the
/// actual failure causes: the log is scanned from the end, each flagged line
/// pulls in surrounding context, and collection stops once the excerpt is
/// full. Selected lines are emitted in their original order.
pub fn extract_error_lines(logs: &str) -> String {
    let clean = strip_ansi_codes(logs);
    let lines: Vec<&str> = clean.split('\n').collect();

    let patterns = error_patterns();
    let mut error_indices = Vec::new();
    for (idx, line) in lines.iter().enumerate().rev() {
        if patterns.is_match(line) {
            error_indices.push(idx);
        }
    }

    // No errors found, return the tail of the log
    if error_indices.is_empty() {
        let start = lines.len().saturating_sub(FALLBACK_TAIL_LINES);
        return lines[start..].join("\n");
    }

    // Build error blocks with context, starting from the end of the log.
    // The set keeps indices unique and restores chronological order.
    let mut included = BTreeSet::new();
    for &idx in &error_indices {
        if included.len() >= TARGET_LINE_COUNT {
            break;
        }
        let start = idx.saturating_sub(CONTEXT_LINES);
        let end = min(lines.len(), idx + CONTEXT_LINES + 1);
        included.extend(start..end);
    }

    included.iter().take(TARGET_LINE_COUNT).map(|&i| lines[i]).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_ansi_codes() {
        let cases: &[(&str, &str)] = &[
            ("\x1b[31merror\x1b[0m: boom", "error: boom"),
            ("\x1b[1;32mok\x1b[0m", "ok"),
            ("plain text", "plain text"),
            ("\x1b[2K\x1b[1Gprogress 50%", "progress 50%"),
            ("", ""),
        ];
        for &(input, expected) in cases {
            assert_eq!(strip_ansi_codes(input), expected);
        }
    }

    #[test]
    fn test_strip_ansi_codes_idempotent() {
        let input = "\x1b[31m\x1b[1merror\x1b[0m: linker \x1b[33mwarning\x1b[0m";
        let once = strip_ansi_codes(input);
        assert_eq!(strip_ansi_codes(&once), once);
    }

    #[test]
    fn test_extract_empty_input() {
        assert_eq!(extract_error_lines(""), "");
    }

    #[test]
    fn test_extract_no_match_returns_tail() {
        let log = (1..=100).map(|i| format!("step {i} ok")).collect::<Vec<_>>().join("\n");
        let excerpt = extract_error_lines(&log);
        let lines: Vec<&str> = excerpt.split('\n').collect();
        assert_eq!(lines.len(), 30);
        assert_eq!(lines[0], "step 71 ok");
        assert_eq!(lines[29], "step 100 ok");
    }

    #[test]
    fn test_extract_no_match_short_log() {
        let log = "step 1 ok\nstep 2 ok";
        assert_eq!(extract_error_lines(log), log);
    }

    #[test]
    fn test_extract_single_error_at_end() {
        // 39 clean lines plus a final error line: the excerpt is the error
        // line and its 3 preceding context lines (nothing follows it).
        let mut lines = (1..=39).map(|i| format!("step {i} ok")).collect::<Vec<_>>();
        lines.push("error: linking failed".to_string());
        let excerpt = extract_error_lines(&lines.join("\n"));
        assert_eq!(excerpt, "step 37 ok\nstep 38 ok\nstep 39 ok\nerror: linking failed");
    }

    #[test]
    fn test_extract_preserves_line_order() {
        let mut lines = (1..=40).map(|i| format!("step {i} ok")).collect::<Vec<_>>();
        lines[9] = "error: first problem".to_string();
        lines[29] = "error: second problem".to_string();
        let excerpt = extract_error_lines(&lines.join("\n"));
        let first = excerpt.find("error: first problem").unwrap();
        let second = excerpt.find("error: second problem").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_extract_output_bounded() {
        let log = (1..=200).map(|i| format!("error: problem {i}")).collect::<Vec<_>>().join("\n");
        let excerpt = extract_error_lines(&log);
        assert_eq!(excerpt.split('\n').count(), TARGET_LINE_COUNT);
    }

    #[test]
    fn test_extract_strips_ansi_before_matching() {
        let mut lines = (1..=10).map(|i| format!("step {i} ok")).collect::<Vec<_>>();
        lines.push("\x1b[31merror\x1b[0m: colored failure".to_string());
        let excerpt = extract_error_lines(&lines.join("\n"));
        assert!(excerpt.contains("error: colored failure"));
        assert!(!excerpt.contains('\x1b'));
    }
}
