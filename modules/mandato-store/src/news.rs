use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use mandato_common::{NewsItem, NewsScope};

use crate::{Store, BATCH_CHUNK};

#[derive(sqlx::FromRow)]
struct NewsRow {
    url: String,
    title: String,
    description: Option<String>,
    full_text: Option<String>,
    source_name: Option<String>,
    source_id: Option<String>,
    image_url: Option<String>,
    published_at: Option<DateTime<Utc>>,
    scope: String,
    city: Option<String>,
    state: Option<String>,
    politician_id: Option<i64>,
    collected_at: DateTime<Utc>,
    score_recency: f64,
    score_mention: f64,
    score_source: f64,
    score_engagement: f64,
    relevance: f64,
    mention_title: bool,
    mention_body: i64,
}

const NEWS_COLUMNS: &str = "url, title, description, full_text, source_name, source_id, \
     image_url, published_at, scope, city, state, politician_id, collected_at, \
     score_recency, score_mention, score_source, score_engagement, relevance, \
     mention_title, mention_body";

impl Store {
    /// Upsert a batch of news items. Conflict key is the canonical URL; a
    /// duplicate only replaces the stored row when it carries a strictly
    /// longer full text (ties keep the earliest-seen row). Returns the number
    /// of rows written.
    pub async fn upsert_news_batch(&self, items: &[NewsItem]) -> Result<u64> {
        let mut written = 0u64;
        for chunk in items.chunks(BATCH_CHUNK) {
            let mut tx = self.pool().begin().await?;
            for item in chunk {
                let result = sqlx::query(
                    r#"
                    INSERT INTO news (id, url, title, description, full_text, source_name,
                        source_id, image_url, published_at, scope, city, state, politician_id,
                        collected_at, score_recency, score_mention, score_source,
                        score_engagement, relevance, mention_title, mention_body)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                        $15, $16, $17, $18, $19, $20, $21)
                    ON CONFLICT (url) DO UPDATE SET
                        title = EXCLUDED.title,
                        description = EXCLUDED.description,
                        full_text = EXCLUDED.full_text,
                        source_name = EXCLUDED.source_name,
                        source_id = EXCLUDED.source_id,
                        image_url = COALESCE(EXCLUDED.image_url, news.image_url),
                        published_at = COALESCE(EXCLUDED.published_at, news.published_at),
                        collected_at = EXCLUDED.collected_at,
                        score_recency = EXCLUDED.score_recency,
                        score_mention = EXCLUDED.score_mention,
                        score_source = EXCLUDED.score_source,
                        score_engagement = EXCLUDED.score_engagement,
                        relevance = EXCLUDED.relevance,
                        mention_title = EXCLUDED.mention_title,
                        mention_body = EXCLUDED.mention_body
                    WHERE COALESCE(length(EXCLUDED.full_text), 0)
                        > COALESCE(length(news.full_text), 0)
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(&item.url)
                .bind(&item.title)
                .bind(&item.description)
                .bind(&item.full_text)
                .bind(&item.source_name)
                .bind(&item.source_id)
                .bind(&item.image_url)
                .bind(item.published_at)
                .bind(item.scope.to_string())
                .bind(&item.city)
                .bind(&item.state)
                .bind(item.politician_id)
                .bind(item.collected_at)
                .bind(item.score_recency)
                .bind(item.score_mention)
                .bind(item.score_source)
                .bind(item.score_engagement)
                .bind(item.relevance)
                .bind(item.mention_title)
                .bind(item.mention_body)
                .execute(&mut *tx)
                .await?;
                written += result.rows_affected();
            }
            tx.commit().await?;
        }
        debug!(total = items.len(), written, "News batch upserted");
        Ok(written)
    }

    /// News for a politician ordered by relevance. With `diversify` the
    /// query over-fetches five times the limit and round-robins across
    /// sources so a single portal cannot dominate the page.
    pub async fn get_news_for_politician(
        &self,
        politician_id: i64,
        limit: i64,
        min_score: f64,
        diversify: bool,
    ) -> Result<Vec<NewsItem>> {
        let fetch_limit = if diversify { limit * 5 } else { limit };
        let query = format!(
            "SELECT {NEWS_COLUMNS} FROM news \
             WHERE politician_id = $1 AND relevance >= $2 \
             ORDER BY relevance DESC LIMIT $3"
        );
        let rows = sqlx::query_as::<_, NewsRow>(&query)
            .bind(politician_id)
            .bind(min_score)
            .bind(fetch_limit)
            .fetch_all(self.pool())
            .await?;

        let items: Vec<NewsItem> = rows.into_iter().filter_map(row_to_news).collect();
        if !diversify || items.len() as i64 <= limit {
            return Ok(items.into_iter().take(limit as usize).collect());
        }
        Ok(diversify_by_source(items, limit as usize))
    }

    pub async fn count_news_for_politician(
        &self,
        politician_id: i64,
        min_score: f64,
    ) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM news WHERE politician_id = $1 AND relevance >= $2",
        )
        .bind(politician_id)
        .bind(min_score)
        .fetch_one(self.pool())
        .await?;
        Ok(count)
    }
}

/// Round-robin across sources, sources ordered by the best score within
/// each, admitting up to `limit` distinct URLs. Items within one source keep
/// their relevance order.
pub fn diversify_by_source(items: Vec<NewsItem>, limit: usize) -> Vec<NewsItem> {
    if items.is_empty() {
        return items;
    }

    let mut by_source: Vec<(String, Vec<NewsItem>)> = Vec::new();
    for item in items {
        let source = item
            .source_name
            .clone()
            .or_else(|| item.source_id.clone())
            .unwrap_or_else(|| "unknown".to_string());
        match by_source.iter_mut().find(|(name, _)| *name == source) {
            Some((_, list)) => list.push(item),
            None => by_source.push((source, vec![item])),
        }
    }

    if by_source.len() <= 1 {
        let (_, list) = by_source.remove(0);
        return list.into_iter().take(limit).collect();
    }

    // Sources ordered by the top score within each.
    by_source.sort_by(|(_, a), (_, b)| {
        let best_a = a.iter().map(|n| n.relevance).fold(f64::MIN, f64::max);
        let best_b = b.iter().map(|n| n.relevance).fold(f64::MIN, f64::max);
        best_b.partial_cmp(&best_a).unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut result = Vec::with_capacity(limit);
    let mut seen_urls = std::collections::HashSet::new();
    let mut cursors = vec![0usize; by_source.len()];

    while result.len() < limit {
        let mut admitted_any = false;
        for (source_idx, (_, list)) in by_source.iter().enumerate() {
            if result.len() >= limit {
                break;
            }
            let mut idx = cursors[source_idx];
            while idx < list.len() {
                let item = &list[idx];
                idx += 1;
                if seen_urls.insert(item.url.clone()) {
                    result.push(item.clone());
                    admitted_any = true;
                    break;
                }
            }
            cursors[source_idx] = idx;
        }
        if !admitted_any {
            break;
        }
    }

    result
}

fn row_to_news(r: NewsRow) -> Option<NewsItem> {
    let scope: NewsScope = r.scope.parse().ok()?;
    Some(NewsItem {
        url: r.url,
        title: r.title,
        description: r.description,
        full_text: r.full_text,
        source_name: r.source_name,
        source_id: r.source_id,
        image_url: r.image_url,
        published_at: r.published_at,
        scope,
        city: r.city,
        state: r.state,
        politician_id: r.politician_id,
        collected_at: r.collected_at,
        score_recency: r.score_recency,
        score_mention: r.score_mention,
        score_source: r.score_source,
        score_engagement: r.score_engagement,
        relevance: r.relevance,
        mention_title: r.mention_title,
        mention_body: r.mention_body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(url: &str, source: &str, relevance: f64) -> NewsItem {
        NewsItem {
            title: format!("title {url}"),
            description: None,
            full_text: None,
            url: url.to_string(),
            source_name: Some(source.to_string()),
            source_id: None,
            image_url: None,
            published_at: None,
            scope: NewsScope::Politician,
            city: None,
            state: None,
            politician_id: Some(1),
            collected_at: Utc::now(),
            score_recency: 0.0,
            score_mention: 0.0,
            score_source: 0.0,
            score_engagement: 0.0,
            relevance,
            mention_title: false,
            mention_body: 0,
        }
    }

    #[test]
    fn round_robin_covers_all_sources() {
        let pool = vec![
            item("a1", "A", 90.0),
            item("a2", "A", 85.0),
            item("a3", "A", 80.0),
            item("b1", "B", 70.0),
            item("b2", "B", 60.0),
            item("c1", "C", 50.0),
        ];
        let picked = diversify_by_source(pool, 3);
        assert_eq!(picked.len(), 3);
        let sources: std::collections::HashSet<_> =
            picked.iter().filter_map(|n| n.source_name.clone()).collect();
        assert_eq!(sources.len(), 3, "limit=3 with 3 sources must hit all of them");
        // First pick comes from the best-scoring source.
        assert_eq!(picked[0].url, "a1");
    }

    #[test]
    fn round_robin_wraps_when_fewer_sources_than_limit() {
        let pool = vec![
            item("a1", "A", 90.0),
            item("a2", "A", 85.0),
            item("b1", "B", 70.0),
        ];
        let picked = diversify_by_source(pool, 3);
        assert_eq!(picked.len(), 3);
        assert_eq!(picked[0].url, "a1");
        assert_eq!(picked[1].url, "b1");
        assert_eq!(picked[2].url, "a2");
    }

    #[test]
    fn duplicate_urls_admitted_once() {
        let pool = vec![
            item("same", "A", 90.0),
            item("same", "B", 70.0),
            item("b2", "B", 60.0),
        ];
        let picked = diversify_by_source(pool, 3);
        let urls: Vec<_> = picked.iter().map(|n| n.url.as_str()).collect();
        assert_eq!(urls.iter().filter(|u| **u == "same").count(), 1);
    }

    #[test]
    fn single_source_returns_by_relevance() {
        let pool = vec![item("a1", "A", 90.0), item("a2", "A", 85.0)];
        let picked = diversify_by_source(pool, 5);
        assert_eq!(picked.len(), 2);
        assert_eq!(picked[0].url, "a1");
    }

    #[test]
    fn empty_pool_stays_empty() {
        assert!(diversify_by_source(Vec::new(), 5).is_empty());
    }
}
