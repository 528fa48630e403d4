use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tracing::info;

use github_client::{Issue, IssueComment, NewIssue};

use crate::traits::IssueTracker;

/// Tracker that only logs what it would post. Used with `--dry-run` or when
/// no GitHub credentials are configured.
#[derive(Debug, Default)]
pub struct DryRunTracker {
    next_id: AtomicU64,
}

impl DryRunTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[async_trait]
impl IssueTracker for DryRunTracker {
    async fn create_issue(&self, issue: &NewIssue) -> anyhow::Result<Issue> {
        let number = self.next();
        info!(
            title = %issue.title,
            labels = ?issue.labels,
            assignees = ?issue.assignees,
            "[dry run] Would create issue"
        );
        info!("[dry run] Issue body:\n{}", issue.body);
        Ok(Issue {
            id: number,
            number,
            html_url: format!("dry-run://issues/{number}"),
            title: issue.title.clone(),
        })
    }

    async fn create_comment(&self, issue_number: u64, body: &str) -> anyhow::Result<IssueComment> {
        let id = self.next();
        info!(issue_number, "[dry run] Would comment on issue");
        info!("[dry run] Comment body:\n{body}");
        Ok(IssueComment {
            id,
            html_url: format!("dry-run://issues/{issue_number}#comment-{id}"),
        })
    }
}
