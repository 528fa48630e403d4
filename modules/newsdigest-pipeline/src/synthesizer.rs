//! Articles → headline digest via the language model.

use std::fmt::Write as _;
use std::sync::Arc;

use tracing::{info, warn};

use newsdigest_common::Article;

use crate::links::linkify;
use crate::traits::{CompletionRequest, LanguageModel};

pub const NO_ARTICLES_MESSAGE: &str = "No recent news articles found for your query.";
pub const SYNTHESIS_ERROR_MESSAGE: &str = "Error processing news articles.";

pub const SYNTHESIS_MAX_TOKENS: u32 = 2000;
pub const SYNTHESIS_TEMPERATURE: f32 = 0.3;
/// Articles beyond this are not shown to the model.
pub const MAX_CONTEXT_ARTICLES: usize = 25;
const CONTENT_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestStatus {
    Synthesized,
    /// Sentinel: nothing to summarize, model not called.
    NoArticles,
    /// Sentinel: the model call failed.
    ModelFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub text: String,
    pub status: DigestStatus,
}

impl Digest {
    fn sentinel(status: DigestStatus) -> Self {
        let text = match status {
            DigestStatus::ModelFailed => SYNTHESIS_ERROR_MESSAGE,
            _ => NO_ARTICLES_MESSAGE,
        };
        Self {
            text: text.to_string(),
            status,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.status != DigestStatus::Synthesized
    }
}

fn synthesis_system(max_headlines: usize) -> String {
    format!(
        "You are a news analyst. Synthesize the provided articles into a clean summary.\n\n\
         Requirements:\n\
         - Return the top {max_headlines} most important/relevant headlines\n\
         - For each headline, provide exactly 2 sentences of summary\n\
         - Include specific numbers, percentages, dollar amounts when mentioned\n\
         - Focus on the most newsworthy and recent information\n\
         - End each item with the URL of the article it came from\n\
         - Use this format:\n\n\
         **[Headline]**\n\
         [2-sentence summary with numbers if available]\n\
         Link: [article URL]\n\n\
         **[Next Headline]**\n\
         [2-sentence summary with numbers if available]\n\
         Link: [article URL]\n\n\
         Do not include any other text, explanations, or meta-commentary."
    )
}

/// Numbered article blocks for the prompt, at most [`MAX_CONTEXT_ARTICLES`].
pub fn article_context(articles: &[Article]) -> String {
    let mut blocks = Vec::new();
    for (i, a) in articles.iter().take(MAX_CONTEXT_ARTICLES).enumerate() {
        let preview: String = a.content_preview.chars().take(CONTENT_PREVIEW_CHARS).collect();
        let mut block = String::new();
        let _ = write!(
            block,
            "Article {}:\nHeadline: {}\nURL: {}\nDescription: {}\nSource: {}\nPublished: {}\nContent Preview: {}",
            i + 1,
            a.title,
            a.url,
            a.description,
            a.source_name,
            a.published_at,
            preview,
        );
        blocks.push(block);
    }
    blocks.join("\n\n")
}

fn synthesis_prompt(topic: &str, articles: &[Article], max_headlines: usize) -> String {
    format!(
        "Original request: \"{topic}\"\n\n\
         Here are the news articles to synthesize:\n\n\
         {}\n\n\
         Please provide the top {max_headlines} headlines with summaries as specified.",
        article_context(articles)
    )
}

pub struct Synthesizer {
    llm: Arc<dyn LanguageModel>,
}

impl Synthesizer {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// Summarize `articles` into at most `max_headlines` items with clickable links.
    ///
    /// Never fails: an empty article set or a failed model call yields a
    /// sentinel digest.
    pub async fn synthesize(
        &self,
        articles: &[Article],
        topic: &str,
        max_headlines: usize,
    ) -> Digest {
        if articles.is_empty() {
            return Digest::sentinel(DigestStatus::NoArticles);
        }

        let request = CompletionRequest {
            system: synthesis_system(max_headlines),
            prompt: synthesis_prompt(topic, articles, max_headlines),
            max_tokens: SYNTHESIS_MAX_TOKENS,
            temperature: SYNTHESIS_TEMPERATURE,
        };

        match self.llm.complete(request).await {
            Ok(raw) => {
                let headline_articles = &articles[..articles.len().min(max_headlines)];
                let text = linkify(raw.trim(), headline_articles);
                info!(topic, chars = text.len(), "Synthesized digest");
                Digest {
                    text,
                    status: DigestStatus::Synthesized,
                }
            }
            Err(e) => {
                warn!(topic, error = %e, "Synthesis failed");
                Digest::sentinel(DigestStatus::ModelFailed)
            }
        }
    }
}
