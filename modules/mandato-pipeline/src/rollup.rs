//! Per-subject roll-up of classified mentions over a time window.
//! Running the same window twice produces identical rows (modulo
//! `updated_at`).

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::info;

use mandato_common::{MentionTopic, Sentiment, SocialMention, Subject};
use mandato_store::Store;

/// Fold mentions into one topic row per subject. Unclassified mentions land
/// in `Other`/neutral. Output is ordered by subject label so repeated runs
/// upsert in a stable order.
pub fn fold_mentions(
    mentions: &[SocialMention],
    politician_id: i64,
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Vec<MentionTopic> {
    let mut groups: BTreeMap<&'static str, MentionTopic> = BTreeMap::new();

    for mention in mentions {
        let subject = mention.subject.unwrap_or(Subject::Other);
        let entry = groups.entry(subject.label()).or_insert_with(|| MentionTopic {
            politician_id,
            subject,
            total: 0,
            positive: 0,
            negative: 0,
            neutral: 0,
            engagement_total: 0.0,
            last_mention_at: None,
            period_start,
            period_end,
            updated_at: now,
        });

        entry.total += 1;
        entry.engagement_total += mention.engagement_score;
        match mention.sentiment.unwrap_or(Sentiment::Neutral) {
            Sentiment::Positive => entry.positive += 1,
            Sentiment::Negative => entry.negative += 1,
            Sentiment::Neutral => entry.neutral += 1,
        }
        if let Some(posted_at) = mention.posted_at {
            entry.last_mention_at = match entry.last_mention_at {
                Some(current) if current >= posted_at => Some(current),
                _ => Some(posted_at),
            };
        }
    }

    groups.into_values().collect()
}

/// Roll up one politician's mentions collected inside [start, end) and
/// upsert the per-subject rows. Returns the number of subjects written.
pub async fn roll_up(
    store: &Store,
    politician_id: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<usize> {
    let mentions = store.get_mentions_in_window(politician_id, start, end).await?;
    if mentions.is_empty() {
        return Ok(0);
    }

    let topics = fold_mentions(&mentions, politician_id, start, end, Utc::now());
    for topic in &topics {
        store.upsert_mention_topic(topic).await?;
    }

    info!(politician_id, subjects = topics.len(), "Mention topics rolled up");
    Ok(topics.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn mention(
        subject: Option<Subject>,
        sentiment: Option<Sentiment>,
        engagement: f64,
        posted_hours_ago: i64,
    ) -> SocialMention {
        SocialMention {
            politician_id: 1,
            platform: mandato_common::SocialPlatform::Bluesky,
            mention_id: format!("m-{engagement}-{posted_hours_ago}"),
            author: None,
            author_handle: None,
            content: "conteúdo".to_string(),
            url: None,
            subject,
            subject_detail: None,
            sentiment,
            likes: 0,
            replies: 0,
            reposts: 0,
            engagement_score: engagement,
            posted_at: Some(Utc::now() - Duration::hours(posted_hours_ago)),
            collected_at: Utc::now(),
            metadata: json!({}),
        }
    }

    #[test]
    fn folds_by_subject_with_sentiment_tallies() {
        let start = Utc::now() - Duration::days(7);
        let end = Utc::now();
        let now = Utc::now();

        let mentions = vec![
            mention(Some(Subject::Economy), Some(Sentiment::Positive), 10.0, 5),
            mention(Some(Subject::Economy), Some(Sentiment::Negative), 20.0, 3),
            mention(Some(Subject::Health), Some(Sentiment::Neutral), 5.0, 1),
        ];

        let topics = fold_mentions(&mentions, 1, start, end, now);
        assert_eq!(topics.len(), 2);

        let economy = topics.iter().find(|t| t.subject == Subject::Economy).unwrap();
        assert_eq!(economy.total, 2);
        assert_eq!(economy.positive, 1);
        assert_eq!(economy.negative, 1);
        assert_eq!(economy.neutral, 0);
        assert_eq!(economy.engagement_total, 30.0);

        let health = topics.iter().find(|t| t.subject == Subject::Health).unwrap();
        assert_eq!(health.total, 1);
        assert_eq!(health.neutral, 1);
        assert_eq!(health.engagement_total, 5.0);
    }

    #[test]
    fn unclassified_mentions_fold_into_other() {
        let start = Utc::now() - Duration::days(7);
        let end = Utc::now();
        let topics = fold_mentions(
            &[mention(None, None, 1.0, 1)],
            1,
            start,
            end,
            Utc::now(),
        );
        assert_eq!(topics.len(), 1);
        assert_eq!(topics[0].subject, Subject::Other);
        assert_eq!(topics[0].neutral, 1);
    }

    #[test]
    fn last_mention_is_the_newest() {
        let start = Utc::now() - Duration::days(7);
        let end = Utc::now();
        let mentions = vec![
            mention(Some(Subject::Politics), None, 1.0, 48),
            mention(Some(Subject::Politics), None, 1.0, 2),
            mention(Some(Subject::Politics), None, 1.0, 24),
        ];
        let topics = fold_mentions(&mentions, 1, start, end, Utc::now());
        let newest = topics[0].last_mention_at.unwrap();
        assert!(newest > Utc::now() - Duration::hours(3));
    }

    #[test]
    fn fold_is_deterministic_across_runs() {
        let start = Utc::now() - Duration::days(7);
        let end = Utc::now();
        let now = Utc::now();
        let mentions = vec![
            mention(Some(Subject::Economy), Some(Sentiment::Positive), 10.0, 5),
            mention(Some(Subject::Health), Some(Sentiment::Neutral), 5.0, 1),
            mention(Some(Subject::Economy), Some(Sentiment::Negative), 20.0, 3),
        ];

        let first = fold_mentions(&mentions, 1, start, end, now);
        let second = fold_mentions(&mentions, 1, start, end, now);

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.subject, b.subject);
            assert_eq!(a.total, b.total);
            assert_eq!(a.positive, b.positive);
            assert_eq!(a.negative, b.negative);
            assert_eq!(a.neutral, b.neutral);
            assert_eq!(a.engagement_total, b.engagement_total);
            assert_eq!(a.last_mention_at, b.last_mention_at);
        }
    }
}
