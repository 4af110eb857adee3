use std::collections::HashMap;

use anyhow::{Context, Result};
use ci_feedback_core::{config::FeedbackConfig, models::JobSummary};
use octocrab::models::RunId;

use crate::{
    GitHub,
    comment::{MAX_FEEDBACK_ATTEMPTS, build_comment_body, count_previous_failures},
    logs::extract_error_lines,
};

/// Substituted for the excerpt when log retrieval fails: the feedback flow
/// degrades to a comment without logs rather than aborting.
const LOGS_UNAVAILABLE: &str = "Unable to retrieve logs";

/// Terminal state of one feedback invocation. Only `Posted` has an externally
/// visible side effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackOutcome {
    /// Draft PR from a non-automated author; no comment posted.
    SkippedDraft,
    /// The named job was not part of the workflow run. Treated as a no-op:
    /// the caller's job name may legitimately race with job completion.
    JobNotFound,
    /// The job already received the maximum number of feedback comments.
    RetryExceeded { attempts: usize },
    /// A feedback comment was created.
    Posted,
}

/// Whether the PR author is the automated author. Its PRs receive feedback
/// even while in draft.
pub fn is_automated_author(author: Option<&str>) -> bool {
    author.is_some_and(|a| {
        a.eq_ignore_ascii_case("copilot") || a.eq_ignore_ascii_case("copilot[bot]")
    })
}

/// Draft PRs only receive feedback when opened by the automated author.
pub fn should_skip_draft(author: Option<&str>, is_draft: bool) -> bool {
    is_draft && !is_automated_author(author)
}

/// Whether feedback for this job is suppressed by the retry ceiling.
pub fn feedback_suppressed(failure_counts: &HashMap<String, usize>, job_name: &str) -> bool {
    failure_counts.get(job_name).copied().unwrap_or(0) >= MAX_FEEDBACK_ATTEMPTS
}

/// Run the post-job feedback flow for a single failed job.
///
/// API calls are awaited strictly in sequence: job listing, log download,
/// comment listing, comment creation. Failure counts are recomputed from the
/// comment thread on every invocation; the thread is the durable store, so no
/// state persists between runs.
pub async fn run_post_job_feedback(
    github: &GitHub,
    config: &FeedbackConfig,
) -> Result<FeedbackOutcome> {
    if should_skip_draft(config.pr_author.as_deref(), config.pr_is_draft) {
        tracing::info!(
            "Skipping feedback for draft PR #{} (author: {}). Only non-draft PRs or automated PRs receive feedback.",
            config.pr_number,
            config.pr_author.as_deref().unwrap_or("<unknown>"),
        );
        return Ok(FeedbackOutcome::SkippedDraft);
    }

    tracing::info!(
        "Processing feedback for job \"{}\" on PR #{}",
        config.job_name,
        config.pr_number
    );

    let jobs = github
        .list_run_jobs(&config.owner, &config.repo, RunId(config.run_id))
        .await
        .context("Failed to list workflow run jobs")?;
    let Some(job) = jobs.iter().find(|j| j.name == config.job_name) else {
        let available = jobs.iter().map(|j| j.name.as_str()).collect::<Vec<_>>().join(", ");
        tracing::warn!(
            "Job \"{}\" not found in workflow run {}. Available jobs: {}",
            config.job_name,
            config.run_id,
            available
        );
        return Ok(FeedbackOutcome::JobNotFound);
    };

    let logs = match github.download_job_logs(&config.owner, &config.repo, job.id).await {
        Ok(raw) => extract_error_lines(&raw),
        Err(e) => {
            tracing::warn!("Failed to get logs for job {}: {:?}", config.job_name, e);
            LOGS_UNAVAILABLE.to_string()
        }
    };
    let summary =
        JobSummary { name: config.job_name.clone(), url: job.html_url.to_string(), logs };

    let comments = github
        .list_pr_comments(&config.owner, &config.repo, config.pr_number)
        .await
        .context("Failed to list PR comments")?;
    let failure_counts = count_previous_failures(comments.iter().filter_map(|c| c.body.as_deref()));
    if feedback_suppressed(&failure_counts, &config.job_name) {
        let attempts = failure_counts.get(&config.job_name).copied().unwrap_or(0);
        tracing::info!(
            "Job \"{}\" has already failed {} times. Skipping feedback.",
            config.job_name,
            attempts
        );
        return Ok(FeedbackOutcome::RetryExceeded { attempts });
    }

    let body = build_comment_body(
        config.run_id,
        &config.workflow_run_url,
        &config.head_sha,
        std::slice::from_ref(&summary),
        &[],
        &failure_counts,
    );
    github
        .create_pr_comment(&config.owner, &config.repo, config.pr_number, &body)
        .await
        .context("Failed to post feedback comment")?;
    tracing::info!(
        "Posted CI feedback comment for job \"{}\" on PR #{}",
        config.job_name,
        config.pr_number
    );
    Ok(FeedbackOutcome::Posted)
}
