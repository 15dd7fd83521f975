//! Twitter/X trending topics for Brazil, scraped from trends24.in. The page
//! groups trend lists by hour; the first list is the most recent snapshot.

use scraper::{Html, Selector};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::http::Fetcher;
use crate::types::TrendingEntry;

const TRENDS_URL: &str = "https://trends24.in/brazil/";

const SUBTITLE: &str = "Em alta no Twitter/X Brasil";

pub struct Trends24Client {
    fetcher: Fetcher,
    base_url: String,
}

impl Trends24Client {
    pub fn new(fetcher: Fetcher) -> Self {
        Self {
            fetcher,
            base_url: TRENDS_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    pub async fn trending(
        &self,
        max_topics: usize,
        cancel: &CancellationToken,
    ) -> Vec<TrendingEntry> {
        let html = match self.fetcher.get_text(&self.base_url, cancel).await {
            Ok(html) => html,
            Err(e) => {
                warn!(error = %e, "trends24 fetch failed");
                return Vec::new();
            }
        };

        let entries = parse_trends(&html, max_topics);
        info!(count = entries.len(), "Twitter trending entries");
        entries
    }
}

/// Extract ranked trends from the page. Primary path: the newest
/// `trend-card__list`. Fallback: any anchor pointing at a Twitter search.
pub fn parse_trends(html: &str, max_topics: usize) -> Vec<TrendingEntry> {
    let document = Html::parse_document(html);

    let list_selector = Selector::parse("ol.trend-card__list").unwrap();
    let item_selector = Selector::parse("li a").unwrap();

    let mut titles: Vec<String> = Vec::new();

    if let Some(first_list) = document.select(&list_selector).next() {
        titles = first_list
            .select(&item_selector)
            .map(|a| a.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
    }

    if titles.is_empty() {
        let anchor_selector = Selector::parse("a[href]").unwrap();
        let mut seen = std::collections::HashSet::new();
        for anchor in document.select(&anchor_selector) {
            let href = anchor.value().attr("href").unwrap_or_default();
            if !href.contains("twitter.com/search") {
                continue;
            }
            let title = anchor.text().collect::<String>().trim().to_string();
            if title.len() > 1 && seen.insert(title.clone()) {
                titles.push(title);
            }
        }
    }

    titles
        .into_iter()
        .take(max_topics)
        .enumerate()
        .map(|(i, title)| TrendingEntry {
            rank: i as i32 + 1,
            title,
            subtitle: Some(SUBTITLE.to_string()),
        })
        .collect()
}
