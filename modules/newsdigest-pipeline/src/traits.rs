// Collaborator seams for the digest pipeline.
//
// LanguageModel: text completion (Claude).
// NewsSearch: article search (NewsAPI /everything).
// IssueTracker: tracked posts and comments (GitHub issues).
//
// The pipeline only ever talks to these traits, so every stage runs against
// the mocks in `testing` with no network.

use anyhow::Result;
use async_trait::async_trait;

use github_client::{Issue, IssueComment, NewIssue};
use newsapi_client::{EverythingRequest, EverythingResponse};

// ---------------------------------------------------------------------------
// LanguageModel
// ---------------------------------------------------------------------------

/// One single-turn completion. No streaming.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Return the model's free-text answer.
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}

#[async_trait]
impl LanguageModel for ai_client::Claude {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        Ok(self
            .complete_with(
                request.system,
                request.prompt,
                request.max_tokens,
                request.temperature,
            )
            .await?)
    }
}

// ---------------------------------------------------------------------------
// NewsSearch
// ---------------------------------------------------------------------------

#[async_trait]
pub trait NewsSearch: Send + Sync {
    /// Run one search. Non-200 answers come back as `newsapi_client::NewsApiError`.
    async fn everything(&self, request: &EverythingRequest) -> Result<EverythingResponse>;
}

#[async_trait]
impl NewsSearch for newsapi_client::NewsApiClient {
    async fn everything(&self, request: &EverythingRequest) -> Result<EverythingResponse> {
        Ok(newsapi_client::NewsApiClient::everything(self, request).await?)
    }
}

// ---------------------------------------------------------------------------
// IssueTracker
// ---------------------------------------------------------------------------

#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn create_issue(&self, issue: &NewIssue) -> Result<Issue>;

    async fn create_comment(&self, issue_number: u64, body: &str) -> Result<IssueComment>;
}

#[async_trait]
impl IssueTracker for github_client::GitHubClient {
    async fn create_issue(&self, issue: &NewIssue) -> Result<Issue> {
        Ok(github_client::GitHubClient::create_issue(self, issue).await?)
    }

    async fn create_comment(&self, issue_number: u64, body: &str) -> Result<IssueComment> {
        Ok(github_client::GitHubClient::create_comment(self, issue_number, body).await?)
    }
}
