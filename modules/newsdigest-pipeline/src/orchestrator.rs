//! Per-topic pipeline driver.
//!
//! `Start → GenerateQueries → SearchArticles → {empty: skip} → Synthesize → Publish → Done`
//!
//! Topics run one after another. Nothing a single topic does can stop the
//! batch; every failure ends as a log line and an outcome in the report.

use std::fmt;

use chrono::Utc;
use tracing::{info, warn};

use newsdigest_common::FileConfig;

use crate::publisher::Publisher;
use crate::search::ArticleSearch;
use crate::strategist::QueryStrategist;
use crate::synthesizer::Synthesizer;

/// Run parameters handed in by the caller. The pipeline reads nothing from
/// the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub days_back: u32,
    pub max_headlines: usize,
    pub max_queries: usize,
    pub language: String,
    /// Comma-separated NewsAPI source ids.
    pub sources: Option<String>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self::from(&FileConfig::default())
    }
}

impl From<&FileConfig> for RunSettings {
    fn from(config: &FileConfig) -> Self {
        Self {
            days_back: config.days_back,
            max_headlines: config.max_headlines,
            max_queries: config.max_queries,
            language: config.language.clone(),
            sources: config.sources.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicOutcome {
    Published { url: String, degraded: bool },
    NoArticles,
    PublishFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicReport {
    pub topic: String,
    pub queries: Vec<String>,
    pub articles: usize,
    pub outcome: TopicOutcome,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub topics: u64,
    pub published: u64,
    pub skipped_empty: u64,
    pub publish_failed: u64,
    pub degraded: u64,
    pub articles: u64,
    pub reports: Vec<TopicReport>,
}

impl RunStats {
    fn record(&mut self, report: TopicReport) {
        self.topics += 1;
        self.articles += report.articles as u64;
        match &report.outcome {
            TopicOutcome::Published { degraded, .. } => {
                self.published += 1;
                if *degraded {
                    self.degraded += 1;
                }
            }
            TopicOutcome::NoArticles => self.skipped_empty += 1,
            TopicOutcome::PublishFailed => self.publish_failed += 1,
        }
        self.reports.push(report);
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "topics={} published={} skipped_empty={} publish_failed={} articles={} degraded={}",
            self.topics,
            self.published,
            self.skipped_empty,
            self.publish_failed,
            self.articles,
            self.degraded,
        )
    }
}

pub struct Orchestrator {
    settings: RunSettings,
    strategist: QueryStrategist,
    search: ArticleSearch,
    synthesizer: Synthesizer,
    publisher: Publisher,
}

impl Orchestrator {
    pub fn new(
        settings: RunSettings,
        strategist: QueryStrategist,
        search: ArticleSearch,
        synthesizer: Synthesizer,
        publisher: Publisher,
    ) -> Self {
        Self {
            settings,
            strategist,
            search,
            synthesizer,
            publisher,
        }
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    pub fn strategist(&self) -> &QueryStrategist {
        &self.strategist
    }

    /// Process every topic in order.
    pub async fn run(&mut self, topics: &[String]) -> RunStats {
        let mut stats = RunStats::default();
        for topic in topics {
            let report = self.process_topic(topic).await;
            stats.record(report);
        }
        info!("Run complete. {stats}");
        stats
    }

    pub async fn process_topic(&mut self, topic: &str) -> TopicReport {
        let settings = &self.settings;
        info!(
            topic,
            days_back = settings.days_back,
            max_headlines = settings.max_headlines,
            "Starting topic"
        );

        let queries = self.strategist.generate(topic, settings.max_queries).await;
        info!(topic, queries = ?queries, "Search queries");

        let articles = self
            .search
            .search(
                &queries,
                settings.days_back,
                settings.sources.as_deref(),
                &settings.language,
            )
            .await;
        info!(topic, articles = articles.len(), "Found unique articles");

        if articles.is_empty() {
            warn!(topic, "No articles found, skipping synthesis and publishing");
            log_troubleshooting(settings.sources.is_some());
            return TopicReport {
                topic: topic.to_string(),
                queries,
                articles: 0,
                outcome: TopicOutcome::NoArticles,
            };
        }

        let digest = self
            .synthesizer
            .synthesize(&articles, topic, settings.max_headlines)
            .await;
        if digest.is_degraded() {
            warn!(topic, status = ?digest.status, "Publishing degraded digest");
        }

        let outcome = match self
            .publisher
            .publish_digest(topic, &digest.text, Utc::now())
            .await
        {
            Some(published) => TopicOutcome::Published {
                url: published.url().to_string(),
                degraded: digest.is_degraded(),
            },
            None => TopicOutcome::PublishFailed,
        };
        info!(topic, outcome = ?outcome, "Topic done");

        TopicReport {
            topic: topic.to_string(),
            queries,
            articles: articles.len(),
            outcome,
        }
    }
}

fn log_troubleshooting(has_sources: bool) {
    info!("Troubleshooting tips:");
    info!("  - Check your NewsAPI key is valid");
    info!("  - Try increasing days_back to 3-7 days");
    if has_sources {
        info!("  - Remove the sources restriction");
    }
    info!("  - Try broader search terms");
}
