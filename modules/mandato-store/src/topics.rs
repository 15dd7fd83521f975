use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use mandato_common::{MentionTopic, Subject, TrendCategory, TrendingTopic};

use crate::Store;

impl Store {
    /// Idempotent upsert keyed by (politician, subject, period start).
    pub async fn upsert_mention_topic(&self, topic: &MentionTopic) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO mention_topic (id, politician_id, subject, total, positive,
                negative, neutral, engagement_total, last_mention_at, period_start,
                period_end, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (politician_id, subject, period_start) DO UPDATE SET
                total = EXCLUDED.total,
                positive = EXCLUDED.positive,
                negative = EXCLUDED.negative,
                neutral = EXCLUDED.neutral,
                engagement_total = EXCLUDED.engagement_total,
                last_mention_at = EXCLUDED.last_mention_at,
                period_end = EXCLUDED.period_end,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(topic.politician_id)
        .bind(topic.subject.to_string())
        .bind(topic.total)
        .bind(topic.positive)
        .bind(topic.negative)
        .bind(topic.neutral)
        .bind(topic.engagement_total)
        .bind(topic.last_mention_at)
        .bind(topic.period_start)
        .bind(topic.period_end)
        .bind(topic.updated_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Replace a category's trending rows in one transaction, so readers
    /// never observe a half-written category.
    pub async fn replace_trending_topics(
        &self,
        category: TrendCategory,
        topics: &[TrendingTopic],
    ) -> Result<u64> {
        let mut tx = self.pool().begin().await?;
        sqlx::query("DELETE FROM trending_topic WHERE category = $1")
            .bind(category.to_string())
            .execute(&mut *tx)
            .await?;

        let mut inserted = 0u64;
        for topic in topics {
            let result = sqlx::query(
                r#"
                INSERT INTO trending_topic (id, category, rank, title, subtitle, updated_at)
                VALUES ($1, $2, $3, $4, $5, now())
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(category.to_string())
            .bind(topic.rank)
            .bind(&topic.title)
            .bind(&topic.subtitle)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }
        tx.commit().await?;

        debug!(category = %category, inserted, "Trending topics replaced");
        Ok(inserted)
    }

    pub async fn get_trending(&self, category: TrendCategory) -> Result<Vec<TrendingTopic>> {
        let rows = sqlx::query_as::<_, (String, i32, String, Option<String>)>(
            "SELECT category, rank, title, subtitle FROM trending_topic \
             WHERE category = $1 ORDER BY rank",
        )
        .bind(category.to_string())
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(category, rank, title, subtitle)| {
                Some(TrendingTopic {
                    category: category.parse().ok()?,
                    rank,
                    title,
                    subtitle,
                })
            })
            .collect())
    }

    /// Top subjects for a politician over the most recent roll-up windows.
    pub async fn get_top_subjects(
        &self,
        politician_id: i64,
        limit: i64,
    ) -> Result<Vec<MentionTopic>> {
        let rows = sqlx::query_as::<_, TopicRow>(
            r#"
            SELECT politician_id, subject, total, positive, negative, neutral,
                engagement_total, last_mention_at, period_start, period_end, updated_at
            FROM mention_topic
            WHERE politician_id = $1
            ORDER BY period_start DESC, total DESC
            LIMIT $2
            "#,
        )
        .bind(politician_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(row_to_topic).collect())
    }
}

#[derive(sqlx::FromRow)]
struct TopicRow {
    politician_id: i64,
    subject: String,
    total: i64,
    positive: i64,
    negative: i64,
    neutral: i64,
    engagement_total: f64,
    last_mention_at: Option<DateTime<Utc>>,
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn row_to_topic(r: TopicRow) -> MentionTopic {
    MentionTopic {
        politician_id: r.politician_id,
        subject: Subject::parse_lossy(&r.subject),
        total: r.total,
        positive: r.positive,
        negative: r.negative,
        neutral: r.neutral,
        engagement_total: r.engagement_total,
        last_mention_at: r.last_mention_at,
        period_start: r.period_start,
        period_end: r.period_end,
        updated_at: r.updated_at,
    }
}
