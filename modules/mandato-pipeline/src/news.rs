//! News aggregation: fan out to the news adapters, dedupe, score, filter and
//! persist, per scope. The full-run driver walks the active roster applying
//! the office scope routing and regional dedupe.

use std::collections::HashSet;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use mandato_collectors::types::RawNews;
use mandato_collectors::{GoogleNewsClient, NewsApiClient};
use mandato_common::{scope_for_office, NewsItem, NewsScope, Politician};
use mandato_relevance::{EngagementCounters, RelevanceEngine};
use mandato_store::{ImageStore, Store};

use crate::dedup;
use crate::regions::state_capital;

/// Regional scopes keep at most this many fresh items per run.
const REGION_LIMIT: usize = 5;

#[derive(Debug, Default, Clone, Copy)]
pub struct NewsRunStats {
    pub politicians: u64,
    pub competitors: u64,
    pub cities: u64,
    pub states: u64,
    pub national: u64,
    pub errors: u64,
}

impl NewsRunStats {
    pub fn total(&self) -> u64 {
        self.politicians + self.competitors + self.cities + self.states + self.national
    }
}

pub struct NewsAggregator {
    google: GoogleNewsClient,
    newsapi: NewsApiClient,
    engine: RelevanceEngine,
    store: Store,
    images: ImageStore,
    inter_politician_delay: Duration,
}

impl NewsAggregator {
    pub fn new(
        google: GoogleNewsClient,
        newsapi: NewsApiClient,
        engine: RelevanceEngine,
        store: Store,
        images: ImageStore,
        inter_politician_delay: Duration,
    ) -> Self {
        Self {
            google,
            newsapi,
            engine,
            store,
            images,
            inter_politician_delay,
        }
    }

    /// Collect, score and filter news for one politician. Output is sorted
    /// by composite relevance descending.
    pub async fn collect_for_politician(
        &self,
        politician_id: i64,
        name: &str,
        city: Option<&str>,
        scope: NewsScope,
        cancel: &CancellationToken,
    ) -> Vec<NewsItem> {
        info!(name, %scope, "Collecting politician news");

        let (from_google, from_newsapi) = tokio::join!(
            self.google.search_politician(name, city, cancel),
            self.newsapi.search_politician(name, city, cancel),
        );

        let mut merged = from_google;
        merged.extend(from_newsapi);
        let unique = dedup::dedupe(merged);

        let mut items: Vec<NewsItem> = unique
            .into_iter()
            .filter_map(|raw| {
                let item = self.score_item(raw, Some(name), scope, None, None, Some(politician_id));
                item.filter(|i| {
                    i.mention_title || i.mention_body > 0 || i.score_mention > 20.0
                })
            })
            .collect();

        items.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        info!(name, kept = items.len(), "Politician news scored and filtered");
        items
    }

    /// City-scope collection: score without a name, keep the freshest item
    /// per portal, then enrich the final selection.
    pub async fn collect_city(
        &self,
        city: &str,
        state: Option<&str>,
        cancel: &CancellationToken,
    ) -> Vec<NewsItem> {
        info!(city, "Collecting city news");
        let (from_google, from_newsapi) = tokio::join!(
            self.google.search_city(city, state, cancel),
            self.newsapi.search_city(city, state, cancel),
        );

        self.finish_region(
            from_google,
            from_newsapi,
            NewsScope::City,
            Some(city.to_string()),
            state.map(str::to_string),
            cancel,
        )
        .await
    }

    pub async fn collect_state(&self, state: &str, cancel: &CancellationToken) -> Vec<NewsItem> {
        info!(state, "Collecting state news");
        let (from_google, from_newsapi) = tokio::join!(
            self.google.search_state(state, cancel),
            self.newsapi.search_state(state, cancel),
        );

        self.finish_region(
            from_google,
            from_newsapi,
            NewsScope::State,
            None,
            Some(state.to_string()),
            cancel,
        )
        .await
    }

    pub async fn collect_national(&self, cancel: &CancellationToken) -> Vec<NewsItem> {
        info!("Collecting national political news");
        let (from_google, from_newsapi) = tokio::join!(
            self.google.search_national(cancel),
            self.newsapi.search_national(cancel),
        );

        self.finish_region(from_google, from_newsapi, NewsScope::National, None, None, cancel)
            .await
    }

    async fn finish_region(
        &self,
        from_google: Vec<RawNews>,
        from_newsapi: Vec<RawNews>,
        scope: NewsScope,
        city: Option<String>,
        state: Option<String>,
        cancel: &CancellationToken,
    ) -> Vec<NewsItem> {
        let mut merged = from_google;
        merged.extend(from_newsapi);
        let unique = dedup::dedupe(merged);

        let scored: Vec<NewsItem> = unique
            .into_iter()
            .filter_map(|raw| {
                self.score_item(raw, None, scope, city.clone(), state.clone(), None)
            })
            .collect();

        let mut selected = dedup::select_latest_unique_portals(scored, REGION_LIMIT);
        dedup::enrich_selected(&mut selected, &self.google, &self.images, cancel).await;

        info!(%scope, selected = selected.len(), "Region news selected");
        selected
    }

    fn score_item(
        &self,
        raw: RawNews,
        name: Option<&str>,
        scope: NewsScope,
        city: Option<String>,
        state: Option<String>,
        politician_id: Option<i64>,
    ) -> Option<NewsItem> {
        if raw.url.trim().is_empty() || raw.title.trim().is_empty() {
            return None;
        }

        let now = Utc::now();
        let body = raw
            .full_text
            .as_deref()
            .or(raw.description.as_deref())
            .unwrap_or("");
        let breakdown = self.engine.score(
            &raw.title,
            body,
            &raw.url,
            raw.published_at,
            EngagementCounters {
                shares: raw.shares,
                comments: raw.comments,
                likes: raw.likes,
            },
            name,
            now,
        );

        Some(NewsItem {
            title: raw.title,
            description: raw.description,
            full_text: raw.full_text,
            url: raw.url,
            source_name: breakdown.source_name.or(raw.source_name),
            source_id: breakdown.source_id,
            image_url: raw.image_url,
            published_at: raw.published_at,
            scope,
            city,
            state,
            politician_id,
            collected_at: now,
            score_recency: breakdown.score_recency,
            score_mention: breakdown.score_mention,
            score_source: breakdown.score_source,
            score_engagement: breakdown.score_engagement,
            relevance: breakdown.relevance,
            mention_title: breakdown.mention_title,
            mention_body: breakdown.mention_body as i64,
        })
    }

    /// Competitor sub-flow: the politician flow per competitor, tagged
    /// scope=competitor, with a small delay between competitors.
    pub async fn collect_competitors(
        &self,
        competitors: &[Politician],
        cancel: &CancellationToken,
    ) -> Vec<NewsItem> {
        let mut all = Vec::new();
        for competitor in competitors {
            if cancel.is_cancelled() {
                break;
            }
            let items = self
                .collect_for_politician(
                    competitor.id,
                    &competitor.name,
                    competitor.city.as_deref(),
                    NewsScope::Competitor,
                    cancel,
                )
                .await;
            all.extend(items);
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        all
    }

    /// Full run over the active roster. Each politician's failures are
    /// isolated; each state and capital is fetched at most once per run.
    pub async fn run_full(&self, cancel: &CancellationToken) -> NewsRunStats {
        let mut stats = NewsRunStats::default();

        let politicians = match self.store.get_active_politicians().await {
            Ok(politicians) => politicians,
            Err(e) => {
                error!(error = %e, "Failed to load active politicians");
                stats.errors += 1;
                return stats;
            }
        };
        info!(count = politicians.len(), "Starting full news run");

        let mut cities_done: HashSet<String> = HashSet::new();
        let mut states_done: HashSet<String> = HashSet::new();
        let mut national_needed = false;

        for politician in &politicians {
            if cancel.is_cancelled() {
                warn!("News run cancelled, stopping with partial results");
                break;
            }
            if let Err(e) = self
                .run_for_politician(politician, &mut cities_done, &mut states_done, &mut stats, cancel)
                .await
            {
                error!(name = %politician.name, error = %e, "Politician collection failed");
                stats.errors += 1;
            }

            let scope = scope_for_office(politician.office.as_deref());
            if scope.national {
                national_needed = true;
            }

            tokio::time::sleep(self.inter_politician_delay).await;
        }

        if national_needed && !cancel.is_cancelled() {
            let items = self.collect_national(cancel).await;
            match self.store.upsert_news_batch(&items).await {
                Ok(written) => stats.national += written,
                Err(e) => {
                    error!(error = %e, "Failed to persist national news");
                    stats.errors += 1;
                }
            }
        }

        info!(
            politicians = stats.politicians,
            competitors = stats.competitors,
            cities = stats.cities,
            states = stats.states,
            national = stats.national,
            errors = stats.errors,
            "Full news run finished"
        );
        stats
    }

    async fn run_for_politician(
        &self,
        politician: &Politician,
        cities_done: &mut HashSet<String>,
        states_done: &mut HashSet<String>,
        stats: &mut NewsRunStats,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        let scope = scope_for_office(politician.office.as_deref());

        // Missing city falls back to the state capital.
        let city = politician.city.clone().or_else(|| {
            politician
                .state
                .as_deref()
                .and_then(state_capital)
                .map(str::to_string)
        });

        let items = self
            .collect_for_politician(
                politician.id,
                &politician.name,
                city.as_deref(),
                NewsScope::Politician,
                cancel,
            )
            .await;
        if !items.is_empty() {
            stats.politicians += self.store.upsert_news_batch(&items).await?;
        }

        let competitors = self.store.get_competitors(politician.id).await?;
        if !competitors.is_empty() {
            let items = self.collect_competitors(&competitors, cancel).await;
            if !items.is_empty() {
                stats.competitors += self.store.upsert_news_batch(&items).await?;
            }
        }

        if scope.state {
            if let Some(state) = politician.state.as_deref() {
                let state_key = state.to_uppercase();
                if states_done.insert(state_key) {
                    let items = self.collect_state(state, cancel).await;
                    if !items.is_empty() {
                        stats.states += self.store.upsert_news_batch(&items).await?;
                    }
                }
            }
        }

        if scope.city {
            // Regional city coverage always targets the capital.
            let capital = politician
                .state
                .as_deref()
                .and_then(state_capital)
                .map(str::to_string)
                .or(city);
            if let Some(capital) = capital {
                if cities_done.insert(capital.clone()) {
                    let items = self
                        .collect_city(&capital, politician.state.as_deref(), cancel)
                        .await;
                    if !items.is_empty() {
                        stats.cities += self.store.upsert_news_batch(&items).await?;
                    }
                }
            }
        }

        Ok(())
    }
}
