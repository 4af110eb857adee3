use std::{collections::HashMap, sync::OnceLock};

use ci_feedback_core::models::JobSummary;
use regex::Regex;

/// Marker embedded in every generated comment body. Later invocations filter
/// on this exact byte sequence to recount failure history, so it must stay
/// stable across versions.
pub const FEEDBACK_MARKER: &str = "<!-- CI-FEEDBACK-BOT -->";

/// Maximum number of feedback comments per job name before automated
/// feedback is suppressed for that job.
pub const MAX_FEEDBACK_ATTEMPTS: usize = 3;

const JOB_HEADING_PREFIX: &str = "### ❌ Job: ";

/// Heading line for a single job block. The history parser's regex is derived
/// from the same template, so the two sides cannot drift independently.
pub fn job_heading(name: &str) -> String {
    format!("{JOB_HEADING_PREFIX}`{name}`")
}

fn job_heading_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(&format!("{}`([^`]+)`", regex::escape(JOB_HEADING_PREFIX))).unwrap()
    })
}

/// Count previously posted feedback comments per job name.
///
/// Presence of the marker is the sole discriminator, not author identity:
/// comments posted via a user PAT have author type "User", not "Bot", so
/// filtering by author type is unreliable. A single comment reporting
/// multiple jobs contributes one count per job heading found.
pub fn count_previous_failures<'a>(
    bodies: impl IntoIterator<Item = &'a str>,
) -> HashMap<String, usize> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for body in bodies {
        if !body.contains(FEEDBACK_MARKER) {
            continue;
        }
        for caps in job_heading_regex().captures_iter(body) {
            *counts.entry(caps[1].to_string()).or_insert(0) += 1;
        }
    }
    counts
}

/// Build the comment body for a CI failure report.
pub fn build_comment_body(
    run_id: u64,
    workflow_run_url: &str,
    head_sha: &str,
    jobs_to_report: &[JobSummary],
    skipped_jobs: &[JobSummary],
    failure_counts: &HashMap<String, usize>,
) -> String {
    let short_sha = head_sha.get(..7).unwrap_or(head_sha);
    let mut body = format!("{FEEDBACK_MARKER}\n## 🚨 CI Failure Report\n\n");
    body.push_str(&format!("**Workflow Run:** [#{run_id}]({workflow_run_url})\n"));
    body.push_str(&format!("**Commit:** `{short_sha}`\n\n"));
    body.push_str("The following CI jobs have failed:\n\n");

    for summary in jobs_to_report {
        let attempt = failure_counts.get(&summary.name).copied().unwrap_or(0) + 1;
        body.push_str(&format!("{}\n\n", job_heading(&summary.name)));
        body.push_str(&format!(
            "**Attempt {attempt} of {MAX_FEEDBACK_ATTEMPTS}** | [View Full Logs]({})\n\n",
            summary.url
        ));
        body.push_str("<details>\n<summary>Error Summary</summary>\n\n");
        body.push_str(&format!("```\n{}\n```\n\n", summary.logs));
        body.push_str("</details>\n\n");
    }

    if !skipped_jobs.is_empty() {
        body.push_str("---\n\n");
        body.push_str(
            "⚠️ **Note:** The following jobs have failed 3+ times and will no longer trigger auto-feedback:\n",
        );
        for job in skipped_jobs {
            body.push_str(&format!("- `{}`\n", job.name));
        }
        body.push('\n');
    }

    body.push_str("---\n\n");
    body.push_str(
        "@copilot Please analyze these CI failures and suggest fixes based on the error logs above.\n",
    );
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(name: &str) -> JobSummary {
        JobSummary {
            name: name.to_string(),
            url: format!("https://github.com/owner/repo/actions/runs/42/job/{name}"),
            logs: "error: something broke".to_string(),
        }
    }

    #[test]
    fn test_job_heading_round_trip() {
        let heading = job_heading("build-linux");
        let caps = job_heading_regex().captures(&heading).unwrap();
        assert_eq!(&caps[1], "build-linux");
    }

    #[test]
    fn test_count_requires_marker() {
        // Headings without the marker are ignored, including bot-authored
        // comments and human comments that happen to mention a job.
        let bodies = ["### ❌ Job: `build-linux`", "Job: `build-linux` failed again"];
        assert!(count_previous_failures(bodies).is_empty());
    }

    #[test]
    fn test_count_multiple_jobs_per_comment() {
        let body = format!(
            "{FEEDBACK_MARKER}\n{}\n{}\n{}",
            job_heading("build-linux"),
            job_heading("test-wasm"),
            job_heading("build-linux"),
        );
        let counts = count_previous_failures([body.as_str()]);
        assert_eq!(counts.get("build-linux"), Some(&2));
        assert_eq!(counts.get("test-wasm"), Some(&1));
    }

    #[test]
    fn test_comment_round_trip() {
        let prior = HashMap::from([("build-linux".to_string(), 1)]);
        let body = build_comment_body(
            42,
            "https://github.com/owner/repo/actions/runs/42",
            "0123456789abcdef",
            &[summary("build-linux")],
            &[],
            &prior,
        );
        assert!(body.starts_with(FEEDBACK_MARKER));
        assert!(body.contains("**Attempt 2 of 3**"));
        assert!(body.contains("`0123456`"));
        let parsed = count_previous_failures([body.as_str()]);
        assert_eq!(parsed, HashMap::from([("build-linux".to_string(), 1)]));
    }

    #[test]
    fn test_comment_multiple_jobs_and_skipped_section() {
        let body = build_comment_body(
            7,
            "https://github.com/owner/repo/actions/runs/7",
            "abcdef0",
            &[summary("build-linux"), summary("test-wasm")],
            &[summary("lint")],
            &HashMap::new(),
        );
        let parsed = count_previous_failures([body.as_str()]);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.get("build-linux"), Some(&1));
        assert_eq!(parsed.get("test-wasm"), Some(&1));
        // Skipped jobs are listed but not counted as headings
        assert!(parsed.get("lint").is_none());
        assert!(body.contains("- `lint`"));
        assert!(body.contains("will no longer trigger auto-feedback"));
    }

    #[test]
    fn test_comment_skipped_section_absent() {
        let body = build_comment_body(
            7,
            "https://github.com/owner/repo/actions/runs/7",
            "abcdef0",
            &[summary("build-linux")],
            &[],
            &HashMap::new(),
        );
        assert!(!body.contains("will no longer trigger auto-feedback"));
    }

    #[test]
    fn test_short_sha_not_truncated_when_short() {
        let body = build_comment_body(
            7,
            "https://github.com/owner/repo/actions/runs/7",
            "abc",
            &[summary("build-linux")],
            &[],
            &HashMap::new(),
        );
        assert!(body.contains("**Commit:** `abc`"));
    }
}
