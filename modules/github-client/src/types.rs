use serde::{Deserialize, Serialize};

/// Payload for `POST /repos/{owner}/{repo}/issues`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewIssue {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
    pub assignees: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct NewComment<'a> {
    pub body: &'a str,
}

/// The subset of issue metadata the pipeline reports on.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Issue {
    pub id: u64,
    pub number: u64,
    pub html_url: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IssueComment {
    pub id: u64,
    pub html_url: String,
}
