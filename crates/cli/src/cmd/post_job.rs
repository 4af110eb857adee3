use std::env;

use anyhow::{Context, Result, bail};
use argp::FromArgs;
use ci_feedback_core::config::FeedbackConfig;
use ci_feedback_github::{GitHub, feedback::run_post_job_feedback};

#[derive(FromArgs, PartialEq, Eq, Debug)]
/// Post failure feedback for one failed job to its pull request.
///
/// Context is read from the GitHub Actions environment: GITHUB_TOKEN,
/// GITHUB_REPOSITORY_OWNER, GITHUB_REPOSITORY, PR_NUMBER, JOB_NAME, RUN_ID,
/// HEAD_SHA, WORKFLOW_RUN_URL, PR_AUTHOR, PR_IS_DRAFT.
#[argp(subcommand, name = "post-job")]
pub struct Args {}

pub async fn run(_args: Args) -> Result<()> {
    let Some(config) = load_config()? else {
        return Ok(());
    };
    let github = GitHub::new(&config.token).await?;
    run_post_job_feedback(&github, &config).await?;
    Ok(())
}

fn env_non_empty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

/// Read the feedback context from the CI environment.
///
/// Returns `None` when PR_NUMBER is absent: the workflow was not triggered by
/// a pull request, which is a normal non-applicable invocation.
fn load_config() -> Result<Option<FeedbackConfig>> {
    let Some(token) = env_non_empty("GITHUB_TOKEN") else {
        bail!(
            "GITHUB_TOKEN is required but was not provided or is empty. \
             Create a Personal Access Token with 'pull-requests: write' permission \
             and add it to the repository as the COPILOT_INVOKER_TOKEN secret."
        );
    };
    let Some(owner) = env_non_empty("GITHUB_REPOSITORY_OWNER") else {
        bail!("GITHUB_REPOSITORY_OWNER is required");
    };
    let repo = match env_non_empty("GITHUB_REPOSITORY") {
        Some(full) => match full.split_once('/') {
            Some((_, repo)) if !repo.is_empty() => repo.to_string(),
            _ => bail!("GITHUB_REPOSITORY is required and must be in format 'owner/repo'"),
        },
        None => bail!("GITHUB_REPOSITORY is required and must be in format 'owner/repo'"),
    };
    let Some(pr_number) = env_non_empty("PR_NUMBER") else {
        tracing::info!("PR_NUMBER not set - not a pull request event, skipping");
        return Ok(None);
    };
    let pr_number = pr_number.parse::<u64>().context("PR_NUMBER must be a valid number")?;
    let Some(job_name) = env_non_empty("JOB_NAME") else {
        bail!("JOB_NAME is required");
    };
    let Some(run_id) = env_non_empty("RUN_ID") else {
        bail!("RUN_ID is required");
    };
    let run_id = run_id.parse::<u64>().context("RUN_ID must be a valid number")?;
    let Some(head_sha) = env_non_empty("HEAD_SHA") else {
        bail!("HEAD_SHA is required");
    };
    let Some(workflow_run_url) = env_non_empty("WORKFLOW_RUN_URL") else {
        bail!("WORKFLOW_RUN_URL is required");
    };
    let pr_author = env_non_empty("PR_AUTHOR");
    // GitHub Actions passes "true" or "false" as strings
    let pr_is_draft = env_non_empty("PR_IS_DRAFT").is_some_and(|value| value == "true");

    Ok(Some(FeedbackConfig {
        token,
        owner,
        repo,
        pr_number,
        job_name,
        run_id,
        head_sha,
        workflow_run_url,
        pr_author,
        pr_is_draft,
    }))
}
