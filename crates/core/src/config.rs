use serde::{Deserialize, Serialize};

/// Context for one post-job feedback invocation.
///
/// Constructed once at the process boundary (the CLI reads the GitHub Actions
/// environment) and passed by reference into the orchestrator, which never
/// reads ambient state itself.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeedbackConfig {
    pub token: String,
    pub owner: String,
    pub repo: String,
    pub pr_number: u64,
    pub job_name: String,
    pub run_id: u64,
    pub head_sha: String,
    pub workflow_run_url: String,
    pub pr_author: Option<String>,
    pub pr_is_draft: bool,
}
