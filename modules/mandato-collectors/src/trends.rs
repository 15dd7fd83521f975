//! Google Trends adapter.
//!
//! The daily trending-searches RSS is the only stable public surface, so both
//! the "google" trending category and the per-politician search-interest
//! mention are derived from it. The feed carries extension elements
//! (`ht:approx_traffic`, `ht:news_item_title`) that feed-rs drops, hence the
//! small quick-xml pull parser.

use chrono::Utc;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use mandato_common::text::{name_variants, normalize};
use mandato_common::SocialPlatform;

use crate::http::Fetcher;
use crate::types::{RawMention, TrendingEntry};

const DAILY_RSS_URL: &str = "https://trends.google.com.br/trends/trendingsearches/daily/rss?geo=BR";

/// One trending search parsed from the daily feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyTrend {
    pub title: String,
    /// Approximate search volume as published (e.g. "200.000+").
    pub approx_traffic: Option<String>,
    pub news_titles: Vec<String>,
}

pub struct GoogleTrendsClient {
    fetcher: Fetcher,
    base_url: String,
}

impl GoogleTrendsClient {
    pub fn new(fetcher: Fetcher) -> Self {
        Self {
            fetcher,
            base_url: DAILY_RSS_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    async fn fetch_daily(&self, cancel: &CancellationToken) -> Vec<DailyTrend> {
        match self.fetcher.get_text(&self.base_url, cancel).await {
            Ok(xml) => parse_daily_rss(&xml),
            Err(e) => {
                warn!(error = %e, "Google Trends RSS fetch failed");
                Vec::new()
            }
        }
    }

    /// Ranked trending searches for the "google" category.
    pub async fn daily_trending(
        &self,
        max_topics: usize,
        cancel: &CancellationToken,
    ) -> Vec<TrendingEntry> {
        let trends = self.fetch_daily(cancel).await;
        let entries: Vec<TrendingEntry> = trends
            .into_iter()
            .take(max_topics)
            .enumerate()
            .map(|(i, trend)| TrendingEntry {
                rank: i as i32 + 1,
                title: trend.title,
                subtitle: Some(match trend.approx_traffic {
                    Some(traffic) => format!("Pesquisa em alta - {traffic} buscas"),
                    None => "Pesquisa em alta no Google Brasil".to_string(),
                }),
            })
            .collect();
        info!(count = entries.len(), "Google trending entries");
        entries
    }

    /// Search interest for a politician, as a synthetic mention. Emitted only
    /// when the politician surfaces in today's trending searches; one mention
    /// per day (the mention id embeds the date and uniqueness is scoped per
    /// politician downstream).
    pub async fn search_interest(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Option<RawMention> {
        let trends = self.fetch_daily(cancel).await;
        interest_mention(name, &trends)
    }
}

/// Build the interest mention from the daily trends, if the name appears.
pub fn interest_mention(name: &str, trends: &[DailyTrend]) -> Option<RawMention> {
    let variants = name_variants(name);
    if variants.is_empty() {
        return None;
    }

    let matched: Vec<&DailyTrend> = trends
        .iter()
        .filter(|t| {
            let title = normalize(&t.title);
            variants.iter().any(|v| title.contains(v.as_str()))
        })
        .collect();
    let best = matched.first()?;

    let traffic = best
        .approx_traffic
        .as_deref()
        .map(parse_traffic)
        .unwrap_or(0);
    let related: Vec<&str> = best.news_titles.iter().map(String::as_str).take(5).collect();
    let related_text = if related.is_empty() {
        "N/A".to_string()
    } else {
        related.join(", ")
    };

    let today = Utc::now().format("%Y-%m-%d").to_string();
    let content = format!(
        "Interesse de busca no Google para '{name}': em alta hoje com {} buscas aproximadas. \
         Manchetes relacionadas: {related_text}",
        best.approx_traffic.as_deref().unwrap_or("volume desconhecido"),
    );

    Some(RawMention {
        platform: SocialPlatform::GoogleTrends,
        mention_id: format!("trends_{today}"),
        author: Some("Google Trends".to_string()),
        author_handle: Some("google_trends".to_string()),
        content,
        url: Some(format!(
            "https://trends.google.com.br/trends/explore?geo=BR&q={}",
            urlencoding::encode(name)
        )),
        likes: 0,
        replies: 0,
        reposts: 0,
        // Scale raw search volume into the same rough band as social scores.
        engagement_score: (traffic as f64 / 1000.0).min(100.0),
        posted_at: Some(Utc::now()),
        metadata: json!({
            "trend_title": &best.title,
            "approx_traffic": &best.approx_traffic,
            "related_news": &best.news_titles,
            "matched_trends": matched.len(),
        }),
    })
}

/// Parse the daily trending RSS, keeping the `ht:` extension fields.
pub fn parse_daily_rss(xml: &str) -> Vec<DailyTrend> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut trends = Vec::new();
    let mut current: Option<DailyTrend> = None;
    let mut path: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if tag == "item" {
                    current = Some(DailyTrend {
                        title: String::new(),
                        approx_traffic: None,
                        news_titles: Vec::new(),
                    });
                }
                path.push(tag);
            }
            Ok(Event::End(e)) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if tag == "item" {
                    if let Some(trend) = current.take() {
                        if !trend.title.is_empty() {
                            trends.push(trend);
                        }
                    }
                }
                path.pop();
            }
            Ok(Event::Text(text)) => {
                let value = match text.unescape() {
                    Ok(v) => v.to_string(),
                    Err(_) => continue,
                };
                let Some(trend) = current.as_mut() else { continue };
                match path.last().map(String::as_str) {
                    Some("title") if path.iter().any(|p| p == "item") => {
                        trend.title = value;
                    }
                    Some("ht:approx_traffic") => trend.approx_traffic = Some(value),
                    Some("ht:news_item_title") => trend.news_titles.push(value),
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!(error = %e, "Failed to parse trends RSS");
                break;
            }
            _ => {}
        }
    }

    trends
}

/// "200.000+" / "200,000+" → 200000.
fn parse_traffic(raw: &str) -> u64 {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}
