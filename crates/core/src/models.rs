use serde::Serialize;

/// Summary of one failed job: its name, a link to the full logs, and the
/// bounded error excerpt extracted from them.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct JobSummary {
    pub name: String,
    pub url: String,
    pub logs: String,
}
