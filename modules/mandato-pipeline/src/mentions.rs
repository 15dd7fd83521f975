//! Social-mention aggregation: Bluesky search plus the Google Trends
//! interest signal, classified by subject and rolled up per politician.

use std::collections::HashSet;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use mandato_classifier::TopicClassifier;
use mandato_collectors::types::RawMention;
use mandato_collectors::{BlueskyClient, GoogleTrendsClient};
use mandato_common::SocialMention;
use mandato_store::Store;

use crate::rollup;

/// Bluesky results requested per politician.
const MENTION_SEARCH_LIMIT: u32 = 50;

/// Roll-up window length.
const ROLLUP_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Default, Clone, Copy)]
pub struct MentionRunStats {
    pub politicians_processed: u64,
    pub mentions_collected: u64,
    pub mentions_inserted: u64,
    pub topics_rolled_up: u64,
    pub errors: u64,
}

pub struct MentionsAggregator {
    bluesky: BlueskyClient,
    trends: GoogleTrendsClient,
    classifier: TopicClassifier,
    store: Store,
    inter_politician_delay: Duration,
}

impl MentionsAggregator {
    pub fn new(
        bluesky: BlueskyClient,
        trends: GoogleTrendsClient,
        classifier: TopicClassifier,
        store: Store,
        inter_politician_delay: Duration,
    ) -> Self {
        Self {
            bluesky,
            trends,
            classifier,
            store,
            inter_politician_delay,
        }
    }

    /// Collect and classify mentions for one politician.
    pub async fn collect_for_politician(
        &self,
        politician_id: i64,
        name: &str,
        cancel: &CancellationToken,
    ) -> Vec<SocialMention> {
        info!(name, "Collecting social mentions");

        let (from_bluesky, from_trends) = tokio::join!(
            self.bluesky.search_mentions(name, MENTION_SEARCH_LIMIT, cancel),
            self.trends.search_interest(name, cancel),
        );

        let mut raw: Vec<RawMention> = from_bluesky;
        raw.extend(from_trends);

        // Dedupe on (platform, provider id).
        let mut seen = HashSet::new();
        raw.retain(|m| seen.insert((m.platform, m.mention_id.clone())));

        let mut mentions: Vec<SocialMention> = raw
            .into_iter()
            .map(|m| to_mention(m, politician_id))
            .collect();

        let texts: Vec<String> = mentions.iter().map(|m| m.content.clone()).collect();
        let classifications = self.classifier.classify_batch(&texts, name).await;
        for (mention, classification) in mentions.iter_mut().zip(classifications) {
            mention.subject = Some(classification.subject);
            mention.subject_detail = (!classification.subject_detail.is_empty())
                .then_some(classification.subject_detail);
            mention.sentiment = Some(classification.sentiment);
        }

        info!(name, count = mentions.len(), "Social mentions ready");
        mentions
    }

    /// Full run over the featured roster: collect, persist, then roll up the
    /// 7-day topic window per politician.
    pub async fn run_full(&self, cancel: &CancellationToken) -> MentionRunStats {
        let mut stats = MentionRunStats::default();

        let politicians = match self.store.get_featured_politicians().await {
            Ok(politicians) => politicians,
            Err(e) => {
                error!(error = %e, "Failed to load featured politicians");
                stats.errors += 1;
                return stats;
            }
        };
        info!(count = politicians.len(), "Starting mention run");

        for politician in &politicians {
            if cancel.is_cancelled() {
                warn!("Mention run cancelled, stopping with partial results");
                break;
            }

            let mentions = self
                .collect_for_politician(politician.id, &politician.name, cancel)
                .await;
            stats.politicians_processed += 1;
            stats.mentions_collected += mentions.len() as u64;

            if !mentions.is_empty() {
                match self.store.upsert_social_mentions_batch(&mentions).await {
                    Ok(written) => stats.mentions_inserted += written,
                    Err(e) => {
                        error!(name = %politician.name, error = %e, "Mention persist failed");
                        stats.errors += 1;
                        continue;
                    }
                }
            }

            let end = Utc::now();
            let start = end - chrono::Duration::days(ROLLUP_WINDOW_DAYS);
            match rollup::roll_up(&self.store, politician.id, start, end).await {
                Ok(count) => stats.topics_rolled_up += count as u64,
                Err(e) => {
                    error!(name = %politician.name, error = %e, "Topic roll-up failed");
                    stats.errors += 1;
                }
            }

            tokio::time::sleep(self.inter_politician_delay).await;
        }

        info!(
            politicians = stats.politicians_processed,
            collected = stats.mentions_collected,
            inserted = stats.mentions_inserted,
            topics = stats.topics_rolled_up,
            errors = stats.errors,
            "Mention run finished"
        );
        stats
    }
}

fn to_mention(raw: RawMention, politician_id: i64) -> SocialMention {
    SocialMention {
        politician_id,
        platform: raw.platform,
        mention_id: raw.mention_id,
        author: raw.author,
        author_handle: raw.author_handle,
        content: raw.content,
        url: raw.url,
        subject: None,
        subject_detail: None,
        sentiment: None,
        likes: raw.likes,
        replies: raw.replies,
        reposts: raw.reposts,
        engagement_score: raw.engagement_score,
        posted_at: raw.posted_at,
        collected_at: Utc::now(),
        metadata: raw.metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mandato_common::SocialPlatform;
    use serde_json::json;

    fn raw(platform: SocialPlatform, id: &str) -> RawMention {
        RawMention {
            platform,
            mention_id: id.to_string(),
            author: None,
            author_handle: None,
            content: "texto".to_string(),
            url: None,
            likes: 1,
            replies: 0,
            reposts: 0,
            engagement_score: 1.0,
            posted_at: None,
            metadata: json!({}),
        }
    }

    #[test]
    fn conversion_attaches_politician_and_collection_time() {
        let mention = to_mention(raw(SocialPlatform::Bluesky, "abc"), 42);
        assert_eq!(mention.politician_id, 42);
        assert_eq!(mention.platform, SocialPlatform::Bluesky);
        assert!(mention.subject.is_none());
        assert!(mention.collected_at <= Utc::now());
    }

    #[test]
    fn dedupe_key_is_platform_plus_id() {
        let mut seen = HashSet::new();
        let mentions = vec![
            raw(SocialPlatform::Bluesky, "a"),
            raw(SocialPlatform::Bluesky, "a"),
            raw(SocialPlatform::GoogleTrends, "a"),
        ];
        let unique: Vec<_> = mentions
            .into_iter()
            .filter(|m| seen.insert((m.platform, m.mention_id.clone())))
            .collect();
        assert_eq!(unique.len(), 2);
    }
}
