// Test mocks for the digest pipeline.
//
// Three mocks matching the three collaborator traits:
// - MockLanguageModel (LanguageModel): scripted queue of answers/failures
// - MockNewsSearch (NewsSearch): query→articles map, per-query failures
// - RecordingTracker (IssueTracker): captures issues and comments
//
// Every mock is a cheap handle over shared state, so a test keeps a clone to
// inspect what the pipeline sent after handing one to the code under test.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use github_client::{Issue, IssueComment, NewIssue};
use newsapi_client::{
    ArticleSource, EverythingRequest, EverythingResponse, NewsApiError, NewsArticle,
};
use newsdigest_common::Article;

use crate::traits::{CompletionRequest, IssueTracker, LanguageModel, NewsSearch};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Pipeline article with the given url and title.
pub fn article(url: &str, title: &str) -> Article {
    Article {
        url: url.to_string(),
        title: title.to_string(),
        description: format!("About {title}"),
        content_preview: String::new(),
        source_name: "Test Wire".to_string(),
        published_at: "2025-03-07T12:00:00Z".to_string(),
        search_query: "test".to_string(),
    }
}

/// Wire article as NewsAPI would return it.
pub fn news_article(url: &str, title: &str) -> NewsArticle {
    NewsArticle {
        source: Some(ArticleSource {
            id: None,
            name: Some("Test Wire".to_string()),
        }),
        author: None,
        title: Some(title.to_string()),
        description: Some(format!("About {title}")),
        url: Some(url.to_string()),
        published_at: Some("2025-03-07T12:00:00Z".to_string()),
        content: Some(format!("{title} body text")),
    }
}

// ---------------------------------------------------------------------------
// MockLanguageModel
// ---------------------------------------------------------------------------

#[derive(Default)]
struct LlmState {
    script: VecDeque<Result<String, String>>,
    requests: Vec<CompletionRequest>,
}

/// Answers from a script, in order. An exhausted script is an error.
#[derive(Clone, Default)]
pub struct MockLanguageModel {
    state: Arc<Mutex<LlmState>>,
}

impl MockLanguageModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, text: &str) -> Self {
        self.push(Ok(text.to_string()));
        self
    }

    pub fn with_failure(self, message: &str) -> Self {
        self.push(Err(message.to_string()));
        self
    }

    fn push(&self, item: Result<String, String>) {
        self.state.lock().unwrap().script.push_back(item);
    }

    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.state.lock().unwrap().requests.clone()
    }
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.requests.push(request);
        match state.script.pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("MockLanguageModel: script exhausted")),
        }
    }
}

// ---------------------------------------------------------------------------
// MockNewsSearch
// ---------------------------------------------------------------------------

#[derive(Default)]
struct SearchState {
    articles: HashMap<String, Vec<NewsArticle>>,
    failures: HashMap<String, u16>,
    requests: Vec<EverythingRequest>,
}

/// Query-keyed search results. Unregistered queries return no articles.
#[derive(Clone, Default)]
pub struct MockNewsSearch {
    state: Arc<Mutex<SearchState>>,
}

impl MockNewsSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_articles(self, query: &str, articles: Vec<NewsArticle>) -> Self {
        self.state
            .lock()
            .unwrap()
            .articles
            .insert(query.to_string(), articles);
        self
    }

    /// Make `query` fail with the given HTTP status.
    pub fn with_failure(self, query: &str, status: u16) -> Self {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(query.to_string(), status);
        self
    }

    pub fn requests(&self) -> Vec<EverythingRequest> {
        self.state.lock().unwrap().requests.clone()
    }
}

#[async_trait]
impl NewsSearch for MockNewsSearch {
    async fn everything(&self, request: &EverythingRequest) -> Result<EverythingResponse> {
        let mut state = self.state.lock().unwrap();
        state.requests.push(request.clone());

        if let Some(status) = state.failures.get(&request.query) {
            let err = match *status {
                401 => NewsApiError::Unauthorized,
                429 => NewsApiError::RateLimited,
                status => NewsApiError::Api {
                    status,
                    message: "mock failure".to_string(),
                },
            };
            return Err(err.into());
        }

        let articles = state
            .articles
            .get(&request.query)
            .cloned()
            .unwrap_or_default();
        Ok(EverythingResponse {
            status: "ok".to_string(),
            total_results: articles.len() as u64,
            articles,
        })
    }
}

// ---------------------------------------------------------------------------
// RecordingTracker
// ---------------------------------------------------------------------------

#[derive(Default)]
struct TrackerState {
    issues: Vec<NewIssue>,
    comments: Vec<(u64, String)>,
}

/// Captures everything posted. `failing()` rejects every call.
#[derive(Clone, Default)]
pub struct RecordingTracker {
    state: Arc<Mutex<TrackerState>>,
    fail: bool,
}

impl RecordingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn issues(&self) -> Vec<NewIssue> {
        self.state.lock().unwrap().issues.clone()
    }

    pub fn comments(&self) -> Vec<(u64, String)> {
        self.state.lock().unwrap().comments.clone()
    }
}

#[async_trait]
impl IssueTracker for RecordingTracker {
    async fn create_issue(&self, issue: &NewIssue) -> Result<Issue> {
        if self.fail {
            return Err(anyhow!("RecordingTracker: create_issue rejected"));
        }
        let mut state = self.state.lock().unwrap();
        state.issues.push(issue.clone());
        let number = state.issues.len() as u64;
        Ok(Issue {
            id: 1000 + number,
            number,
            html_url: format!("https://github.example/acme/news/issues/{number}"),
            title: issue.title.clone(),
        })
    }

    async fn create_comment(&self, issue_number: u64, body: &str) -> Result<IssueComment> {
        if self.fail {
            return Err(anyhow!("RecordingTracker: create_comment rejected"));
        }
        let mut state = self.state.lock().unwrap();
        state.comments.push((issue_number, body.to_string()));
        let id = state.comments.len() as u64;
        Ok(IssueComment {
            id,
            html_url: format!(
                "https://github.example/acme/news/issues/{issue_number}#issuecomment-{id}"
            ),
        })
    }
}
