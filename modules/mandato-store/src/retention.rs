use anyhow::Result;
use chrono::{Duration, Utc};
use tracing::info;

use crate::Store;

impl Store {
    pub async fn delete_news_older_than(&self, days: i64) -> Result<u64> {
        self.delete_older_than("news", "collected_at", days).await
    }

    pub async fn delete_social_posts_older_than(&self, days: i64) -> Result<u64> {
        self.delete_older_than("social_post", "collected_at", days).await
    }

    pub async fn delete_social_mentions_older_than(&self, days: i64) -> Result<u64> {
        self.delete_older_than("social_mention", "collected_at", days).await
    }

    pub async fn delete_mention_topics_older_than(&self, days: i64) -> Result<u64> {
        self.delete_older_than("mention_topic", "period_end", days).await
    }

    async fn delete_older_than(&self, table: &str, column: &str, days: i64) -> Result<u64> {
        let cutoff = Utc::now() - Duration::days(days);
        // Table and column names come from the fixed call sites above, never
        // from user input.
        let query = format!("DELETE FROM {table} WHERE {column} < $1");
        let deleted = sqlx::query(&query)
            .bind(cutoff)
            .execute(self.pool())
            .await?
            .rows_affected();

        info!(table, days, deleted, "Retention sweep");
        Ok(deleted)
    }
}
