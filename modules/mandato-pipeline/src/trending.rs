//! Trending topics, one collector per category:
//!
//! - politics: named-entity frequency over fresh political news
//! - twitter: trends24.in snapshot
//! - google: daily trending-searches feed
//! - general: top national headlines
//!
//! A category's rows are replaced atomically; a source that comes back with
//! fewer than the minimum entries leaves the previous rows in place.

use std::collections::HashMap;

use regex::Regex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use mandato_collectors::types::{RawNews, TrendingEntry};
use mandato_collectors::{GoogleNewsClient, GoogleTrendsClient, Trends24Client};
use mandato_common::text::normalize;
use mandato_common::{TrendCategory, TrendingTopic};
use mandato_store::Store;

/// A source must return at least this many entries to replace a category.
const MIN_RESULTS: usize = 3;

const MAX_TOPICS: usize = 10;

/// An entity must appear in at least this many headlines to trend.
const MIN_ENTITY_COUNT: usize = 2;

#[derive(Debug, Default, Clone, Copy)]
pub struct TrendingRunStats {
    pub politics: u64,
    pub twitter: u64,
    pub google: u64,
    pub general: u64,
    pub errors: u64,
}

impl TrendingRunStats {
    pub fn total(&self) -> u64 {
        self.politics + self.twitter + self.google + self.general
    }
}

pub struct TrendingPipeline {
    google_news: GoogleNewsClient,
    trends: GoogleTrendsClient,
    trends24: Trends24Client,
    store: Store,
}

impl TrendingPipeline {
    pub fn new(
        google_news: GoogleNewsClient,
        trends: GoogleTrendsClient,
        trends24: Trends24Client,
        store: Store,
    ) -> Self {
        Self {
            google_news,
            trends,
            trends24,
            store,
        }
    }

    /// Collect one category and replace its rows. Returns the rows written
    /// (0 when the source came back short and the old rows were kept).
    pub async fn collect_category(
        &self,
        category: TrendCategory,
        cancel: &CancellationToken,
    ) -> anyhow::Result<u64> {
        let entries = match category {
            TrendCategory::Politics => {
                let news = self.google_news.search_national(cancel).await;
                political_trending(&news, MAX_TOPICS)
            }
            TrendCategory::Twitter => self.trends24.trending(MAX_TOPICS, cancel).await,
            TrendCategory::Google => self.trends.daily_trending(MAX_TOPICS, cancel).await,
            TrendCategory::General => {
                let news = self.google_news.search("notícias Brasil", cancel).await;
                headline_trending(&news, MAX_TOPICS)
            }
        };

        if entries.len() < MIN_RESULTS {
            warn!(
                %category,
                count = entries.len(),
                "Too few trending entries, keeping previous rows"
            );
            return Ok(0);
        }

        let topics: Vec<TrendingTopic> = entries
            .into_iter()
            .map(|entry| TrendingTopic {
                category,
                rank: entry.rank,
                title: entry.title,
                subtitle: entry.subtitle,
            })
            .collect();

        let written = self.store.replace_trending_topics(category, &topics).await?;
        info!(%category, written, "Trending category updated");
        Ok(written)
    }

    /// All categories in sequence.
    pub async fn run_all(&self, cancel: &CancellationToken) -> TrendingRunStats {
        let mut stats = TrendingRunStats::default();

        for category in TrendCategory::ALL {
            if cancel.is_cancelled() {
                warn!("Trending run cancelled");
                break;
            }
            match self.collect_category(category, cancel).await {
                Ok(written) => match category {
                    TrendCategory::Politics => stats.politics = written,
                    TrendCategory::Twitter => stats.twitter = written,
                    TrendCategory::Google => stats.google = written,
                    TrendCategory::General => stats.general = written,
                },
                Err(e) => {
                    error!(%category, error = %e, "Trending category failed");
                    stats.errors += 1;
                }
            }
        }

        stats
    }
}

/// Capitalized-sequence named entities: at least two words, or a single word
/// longer than five characters.
pub fn extract_entities(text: &str) -> Vec<String> {
    let pattern = Regex::new(
        r"\b([A-ZÁÀÂÃÉÈÊÍÌÎÓÒÔÕÚÙÛÇ][a-záàâãéèêíìîóòôõúùûç]+(?:\s+[A-ZÁÀÂÃÉÈÊÍÌÎÓÒÔÕÚÙÛÇ][a-záàâãéèêíìîóòôõúùûç]+)*)",
    )
    .expect("entity regex is valid");

    pattern
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .filter(|entity| {
            let words: Vec<&str> = entity.split_whitespace().collect();
            words.len() >= 2 || words[0].chars().count() > 5
        })
        .collect()
}

/// Rank entities by how many headlines mention them; the subtitle is the
/// longest related headline.
pub fn political_trending(news: &[RawNews], max_topics: usize) -> Vec<TrendingEntry> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut headlines: HashMap<String, Vec<&str>> = HashMap::new();

    for item in news {
        let text = match &item.description {
            Some(description) => format!("{} {}", item.title, description),
            None => item.title.clone(),
        };
        for entity in extract_entities(&text) {
            *counts.entry(entity.clone()).or_default() += 1;
            headlines.entry(entity).or_default().push(&item.title);
        }
    }

    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .filter(|(_, count)| *count >= MIN_ENTITY_COUNT)
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    ranked
        .into_iter()
        .take(max_topics)
        .enumerate()
        .map(|(i, (entity, _))| {
            let subtitle = context_subtitle(&entity, headlines.get(&entity));
            TrendingEntry {
                rank: i as i32 + 1,
                title: entity,
                subtitle: Some(subtitle),
            }
        })
        .collect()
}

/// The longest headline mentioning the entity, source suffix stripped and
/// truncated; a generic line when nothing matches.
fn context_subtitle(entity: &str, related: Option<&Vec<&str>>) -> String {
    let entity_norm = normalize(entity);
    let mut candidates: Vec<String> = related
        .map(|titles| {
            titles
                .iter()
                .filter(|t| normalize(t).contains(&entity_norm))
                .map(|t| t.split(" - ").next().unwrap_or(t).trim().to_string())
                .filter(|t| t.chars().count() > 20)
                .collect()
        })
        .unwrap_or_default();

    candidates.sort_by_key(|t| std::cmp::Reverse(t.chars().count()));
    match candidates.into_iter().next() {
        Some(headline) => {
            if headline.chars().count() > 120 {
                let truncated: String = headline.chars().take(117).collect();
                format!("{truncated}...")
            } else {
                headline
            }
        }
        None => "Assunto em destaque nas notícias políticas".to_string(),
    }
}

/// Fresh headlines as general trending entries, subtitled by their portal.
pub fn headline_trending(news: &[RawNews], max_topics: usize) -> Vec<TrendingEntry> {
    news.iter()
        .filter(|item| !item.title.trim().is_empty())
        .take(max_topics)
        .enumerate()
        .map(|(i, item)| TrendingEntry {
            rank: i as i32 + 1,
            title: item.title.clone(),
            subtitle: item
                .source_name
                .clone()
                .map(|source| format!("Destaque em {source}"))
                .or_else(|| Some("Destaque no Brasil".to_string())),
        })
        .collect()
}
