//! Digest delivery to the issue tracker.
//!
//! Either a new issue per topic or a comment on one long-running issue. A
//! failed delivery is logged and the run moves on.

mod dry_run;

pub use dry_run::DryRunTracker;

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use github_client::{Issue, IssueComment, NewIssue};

use crate::traits::IssueTracker;

pub fn default_labels() -> Vec<String> {
    vec!["news-summary".to_string(), "automated".to_string()]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PublishTarget {
    /// One new issue per topic per run.
    #[default]
    NewIssue,
    /// Append every digest to an existing issue.
    Comment { issue_number: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOptions {
    pub labels: Vec<String>,
    pub assignees: Vec<String>,
    pub mention_users: Vec<String>,
    pub target: PublishTarget,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            labels: default_labels(),
            assignees: Vec::new(),
            mention_users: Vec::new(),
            target: PublishTarget::NewIssue,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Published {
    Issue(Issue),
    Comment {
        issue_number: u64,
        comment: IssueComment,
    },
}

impl Published {
    pub fn url(&self) -> &str {
        match self {
            Self::Issue(issue) => &issue.html_url,
            Self::Comment { comment, .. } => &comment.html_url,
        }
    }
}

pub struct Publisher {
    tracker: Arc<dyn IssueTracker>,
    options: PublishOptions,
}

impl Publisher {
    pub fn new(tracker: Arc<dyn IssueTracker>, options: PublishOptions) -> Self {
        Self { tracker, options }
    }

    pub fn options(&self) -> &PublishOptions {
        &self.options
    }

    /// Create a tracked issue.
    pub async fn publish_new(
        &self,
        title: &str,
        body: &str,
        labels: &[String],
        assignees: &[String],
    ) -> Result<Issue> {
        let issue = NewIssue {
            title: title.to_string(),
            body: body.to_string(),
            labels: labels.to_vec(),
            assignees: assignees.to_vec(),
        };
        let created = self.tracker.create_issue(&issue).await?;
        info!(number = created.number, url = %created.html_url, "Issue created");
        Ok(created)
    }

    /// Comment on an existing issue, `@`-mentioning `mention_users` first.
    pub async fn publish_comment(
        &self,
        issue_number: u64,
        body: &str,
        mention_users: &[String],
    ) -> Result<IssueComment> {
        let body = match mention_line(mention_users) {
            Some(mentions) => format!("{mentions}\n\n{body}"),
            None => body.to_string(),
        };
        let comment = self.tracker.create_comment(issue_number, &body).await?;
        info!(issue_number, url = %comment.html_url, "Comment added");
        Ok(comment)
    }

    /// Render and deliver one topic's digest per the configured target.
    /// Returns `None` when delivery failed; the failure is logged.
    pub async fn publish_digest(
        &self,
        topic: &str,
        digest: &str,
        now: DateTime<Utc>,
    ) -> Option<Published> {
        let opts = &self.options;
        let result = match opts.target {
            PublishTarget::NewIssue => {
                let title = issue_title(topic, now);
                let body = render_document(topic, digest, &opts.mention_users, now);
                self.publish_new(&title, &body, &opts.labels, &opts.assignees)
                    .await
                    .map(Published::Issue)
            }
            PublishTarget::Comment { issue_number } => {
                // publish_comment adds the mentions itself.
                let body = render_document(topic, digest, &[], now);
                self.publish_comment(issue_number, &body, &opts.mention_users)
                    .await
                    .map(|comment| Published::Comment {
                        issue_number,
                        comment,
                    })
            }
        };

        match result {
            Ok(published) => Some(published),
            Err(e) => {
                warn!(topic, target = ?opts.target, error = %e, "Failed to publish digest");
                None
            }
        }
    }
}

fn mention_line(users: &[String]) -> Option<String> {
    let mentions: Vec<String> = users
        .iter()
        .map(|u| u.trim().trim_start_matches('@'))
        .filter(|u| !u.is_empty())
        .map(|u| format!("@{u}"))
        .collect();
    (!mentions.is_empty()).then(|| mentions.join(" "))
}

/// Uppercase the first letter of every whitespace-separated word.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if at_word_start {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = c.is_whitespace();
    }
    out
}

pub fn issue_title(topic: &str, now: DateTime<Utc>) -> String {
    format!("📰 {} - {}", title_case(topic), now.format("%Y-%m-%d"))
}

/// Full markdown document for one digest.
pub fn render_document(
    topic: &str,
    digest: &str,
    mention_users: &[String],
    now: DateTime<Utc>,
) -> String {
    let mentions = mention_line(mention_users)
        .map(|m| format!("{m}\n\n"))
        .unwrap_or_default();
    format!(
        "{mentions}## 📰 Daily News Intelligence: {title}\n\n\
         **Generated:** {generated}\n\n\
         ---\n\n\
         {digest}\n\n\
         ---\n\n\
         <details>\n\
         <summary>ℹ️ About this report</summary>\n\n\
         This summary was automatically generated using:\n\
         - **Claude** for query planning and synthesis\n\
         - **NewsAPI** for content aggregation\n\
         - **GitHub Issues** for delivery and notifications\n\n\
         To change the topics, edit the `topics` list in the run config.\n\
         </details>\n",
        title = title_case(topic),
        generated = now.format("%B %d, %Y at %I:%M %p UTC"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingTracker;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 7, 14, 5, 0).unwrap()
    }

    #[test]
    fn title_case_keeps_acronyms() {
        assert_eq!(title_case("chicago bears and the NFL"), "Chicago Bears And The NFL");
        assert_eq!(
            title_case("gaming, xbox, and electronics"),
            "Gaming, Xbox, And Electronics"
        );
    }

    #[test]
    fn issue_title_has_date() {
        assert_eq!(issue_title("ufc news", at()), "📰 Ufc News - 2025-03-07");
    }

    #[test]
    fn document_layout() {
        let doc = render_document("ufc", "**Headline**\nText.", &["alice".into()], at());
        assert!(doc.starts_with("@alice\n\n## 📰 Daily News Intelligence: Ufc\n\n"));
        assert!(doc.contains("**Generated:** March 07, 2025 at 02:05 PM UTC"));
        assert!(doc.contains("---\n\n**Headline**\nText.\n\n---"));
        assert!(doc.contains("<details>"));
        assert!(doc.trim_end().ends_with("</details>"));

        let plain = render_document("ufc", "x", &[], at());
        assert!(plain.starts_with("## 📰"));
    }

    #[tokio::test]
    async fn new_issue_carries_labels_and_assignees() {
        let tracker = RecordingTracker::new();
        let publisher = Publisher::new(
            Arc::new(tracker.clone()),
            PublishOptions {
                assignees: vec!["bob".into()],
                mention_users: vec!["alice".into()],
                ..Default::default()
            },
        );

        let published = publisher.publish_digest("ufc", "digest", at()).await.unwrap();
        assert!(published.url().contains("/issues/1"));

        let issues = tracker.issues();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].title, "📰 Ufc - 2025-03-07");
        assert_eq!(issues[0].labels, default_labels());
        assert_eq!(issues[0].assignees, vec!["bob"]);
        assert!(issues[0].body.starts_with("@alice\n\n"));
    }

    #[tokio::test]
    async fn comment_mode_mentions_once() {
        let tracker = RecordingTracker::new();
        let publisher = Publisher::new(
            Arc::new(tracker.clone()),
            PublishOptions {
                mention_users: vec!["alice".into(), "@carol".into()],
                target: PublishTarget::Comment { issue_number: 42 },
                ..Default::default()
            },
        );

        publisher.publish_digest("nfl", "digest", at()).await.unwrap();

        let comments = tracker.comments();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].0, 42);
        assert!(comments[0].1.starts_with("@alice @carol\n\n## 📰"));
        assert_eq!(comments[0].1.matches("@alice").count(), 1);
        assert!(tracker.issues().is_empty());
    }

    #[tokio::test]
    async fn failure_is_swallowed() {
        let tracker = RecordingTracker::failing();
        let publisher = Publisher::new(Arc::new(tracker), PublishOptions::default());
        assert!(publisher.publish_digest("nfl", "digest", at()).await.is_none());
    }
}
