pub mod comment;
pub mod feedback;
pub mod logs;

use anyhow::{Context, Result};
use octocrab::{
    Octocrab,
    models::{JobId, RunId, issues::Comment, workflows::Job},
};

#[derive(Clone)]
pub struct GitHub {
    pub client: Octocrab,
}

impl GitHub {
    pub async fn new(token: &str) -> Result<Self> {
        let client = Octocrab::builder()
            .personal_token(token.to_owned())
            .build()
            .context("Failed to create GitHub client")?;
        let profile = client.current().user().await.context("Failed to fetch current user")?;
        tracing::info!("Logged in as {}", profile.login);
        Ok(Self { client })
    }

    pub async fn list_run_jobs(&self, owner: &str, repo: &str, run_id: RunId) -> Result<Vec<Job>> {
        let jobs = self
            .client
            .all_pages(
                self.client
                    .workflows(owner, repo)
                    .list_jobs(run_id)
                    .per_page(100)
                    .send()
                    .await
                    .context("Failed to fetch workflow run jobs")?,
            )
            .await?;
        tracing::debug!("Run {} (jobs {})", run_id, jobs.len());
        Ok(jobs)
    }

    /// Download the raw log text for a single job. The logs endpoint redirects
    /// to a short-lived download URL, so follow the redirect to the data.
    pub async fn download_job_logs(
        &self,
        owner: &str,
        repo: &str,
        job_id: JobId,
    ) -> Result<String> {
        let response = self
            .client
            ._get(format!("/repos/{owner}/{repo}/actions/jobs/{job_id}/logs"))
            .await
            .context("Failed to request job logs")?;
        let response = self
            .client
            .follow_location_to_data(response)
            .await
            .context("Failed to download job logs")?;
        let bytes = http_body_util::BodyExt::collect(response.into_body())
            .await
            .context("Failed to read job logs body")?
            .to_bytes();
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub async fn list_pr_comments(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
    ) -> Result<Vec<Comment>> {
        let comments = self
            .client
            .all_pages(
                self.client
                    .issues(owner, repo)
                    .list_comments(pr_number)
                    .per_page(100)
                    .send()
                    .await
                    .context("Failed to fetch PR comments")?,
            )
            .await?;
        tracing::debug!("PR #{} (comments {})", pr_number, comments.len());
        Ok(comments)
    }

    pub async fn create_pr_comment(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
        body: &str,
    ) -> Result<()> {
        self.client
            .issues(owner, repo)
            .create_comment(pr_number, body)
            .await
            .context("Failed to create comment")?;
        Ok(())
    }
}
