pub mod error;
pub mod types;

pub use error::{GitHubError, Result};
pub use types::{Issue, IssueComment, NewIssue};

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;

use types::NewComment;

const BASE_URL: &str = "https://api.github.com";
const ACCEPT: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = "newsdigest";

pub struct GitHubClient {
    client: reqwest::Client,
    token: String,
    /// "owner/name"
    repo: String,
    base_url: String,
}

impl GitHubClient {
    pub fn new(token: impl Into<String>, repo: impl Into<String>) -> Result<Self> {
        let repo = repo.into();
        if repo.split('/').filter(|part| !part.is_empty()).count() != 2 {
            return Err(GitHubError::Config(format!(
                "repository must look like owner/name, got {repo:?}"
            )));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            token: token.into(),
            repo,
            base_url: BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("token {}", self.token))
            .map_err(|e| GitHubError::Config(format!("invalid token header: {e}")))?;
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT));
        headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
        Ok(headers)
    }

    /// Open a new issue. GitHub notifies watchers, assignees and @mentioned users.
    pub async fn create_issue(&self, issue: &NewIssue) -> Result<Issue> {
        let url = format!("{}/repos/{}/issues", self.base_url, self.repo);
        tracing::debug!(repo = %self.repo, title = %issue.title, "Creating GitHub issue");
        self.post_created(&url, issue).await
    }

    /// Append a comment to an existing issue.
    pub async fn create_comment(&self, issue_number: u64, body: &str) -> Result<IssueComment> {
        let url = format!(
            "{}/repos/{}/issues/{}/comments",
            self.base_url, self.repo, issue_number
        );
        tracing::debug!(repo = %self.repo, issue_number, "Creating GitHub issue comment");
        self.post_created(&url, &NewComment { body }).await
    }

    async fn post_created<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T> {
        let resp = self
            .client
            .post(url)
            .headers(self.headers()?)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if status != StatusCode::CREATED {
            let message = resp.text().await.unwrap_or_default();
            return Err(GitHubError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let text = resp.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn rejects_malformed_repo() {
        assert!(matches!(
            GitHubClient::new("t", "no-slash"),
            Err(GitHubError::Config(_))
        ));
        assert!(GitHubClient::new("t", "owner/name").is_ok());
    }

    #[tokio::test]
    async fn create_issue_posts_payload_and_parses_201() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/repos/acme/news/issues")
            .match_header("authorization", "token gh-token")
            .match_header("accept", ACCEPT)
            .match_body(Matcher::PartialJson(serde_json::json!({
                "title": "Daily",
                "labels": ["news-summary", "automated"],
                "assignees": ["octocat"],
            })))
            .with_status(201)
            .with_body(r#"{"id": 9, "number": 42, "html_url": "https://github.com/acme/news/issues/42", "title": "Daily"}"#)
            .create_async()
            .await;

        let client = GitHubClient::new("gh-token", "acme/news")
            .unwrap()
            .with_base_url(server.url());
        let issue = client
            .create_issue(&NewIssue {
                title: "Daily".into(),
                body: "body".into(),
                labels: vec!["news-summary".into(), "automated".into()],
                assignees: vec!["octocat".into()],
            })
            .await
            .unwrap();

        assert_eq!(issue.number, 42);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn comment_requires_created_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/repos/acme/news/issues/7/comments")
            .with_status(404)
            .with_body("Not Found")
            .create_async()
            .await;

        let client = GitHubClient::new("gh-token", "acme/news")
            .unwrap()
            .with_base_url(server.url());
        let err = client.create_comment(7, "hi").await.unwrap_err();
        assert!(matches!(err, GitHubError::Api { status: 404, .. }));
    }
}
