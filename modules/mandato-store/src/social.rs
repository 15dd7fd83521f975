use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use mandato_common::{Sentiment, SocialMention, SocialPlatform, SocialPost, Subject};

use crate::{Store, BATCH_CHUNK};

#[derive(sqlx::FromRow)]
struct MentionRow {
    politician_id: i64,
    platform: String,
    mention_id: String,
    author: Option<String>,
    author_handle: Option<String>,
    content: String,
    url: Option<String>,
    subject: Option<String>,
    subject_detail: Option<String>,
    sentiment: Option<String>,
    likes: i64,
    replies: i64,
    reposts: i64,
    engagement_score: f64,
    posted_at: Option<DateTime<Utc>>,
    collected_at: DateTime<Utc>,
    metadata: serde_json::Value,
}

impl Store {
    /// Upsert social posts; conflict key (politician, platform, post id)
    /// refreshes the engagement counters.
    pub async fn upsert_social_posts_batch(&self, posts: &[SocialPost]) -> Result<u64> {
        let mut written = 0u64;
        for chunk in posts.chunks(BATCH_CHUNK) {
            let mut tx = self.pool().begin().await?;
            for post in chunk {
                let result = sqlx::query(
                    r#"
                    INSERT INTO social_post (id, politician_id, platform, post_id, url,
                        content, likes, comments, shares, views, engagement_score,
                        media_type, media_url, posted_at, metadata)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
                    ON CONFLICT (politician_id, platform, post_id) DO UPDATE SET
                        content = EXCLUDED.content,
                        likes = EXCLUDED.likes,
                        comments = EXCLUDED.comments,
                        shares = EXCLUDED.shares,
                        views = EXCLUDED.views,
                        engagement_score = EXCLUDED.engagement_score,
                        media_url = EXCLUDED.media_url,
                        metadata = EXCLUDED.metadata
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(post.politician_id)
                .bind(post.platform.to_string())
                .bind(&post.post_id)
                .bind(&post.url)
                .bind(&post.content)
                .bind(post.likes)
                .bind(post.comments)
                .bind(post.shares)
                .bind(post.views)
                .bind(post.engagement_score)
                .bind(post.media_type.to_string())
                .bind(&post.media_url)
                .bind(post.posted_at)
                .bind(&post.metadata)
                .execute(&mut *tx)
                .await?;
                written += result.rows_affected();
            }
            tx.commit().await?;
        }
        debug!(total = posts.len(), written, "Social post batch upserted");
        Ok(written)
    }

    pub async fn count_social_posts_for_politician(&self, politician_id: i64) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM social_post WHERE politician_id = $1")
                .bind(politician_id)
                .fetch_one(self.pool())
                .await?;
        Ok(count)
    }

    /// Upsert social mentions; conflict key (politician, platform,
    /// mention id).
    pub async fn upsert_social_mentions_batch(&self, mentions: &[SocialMention]) -> Result<u64> {
        let mut written = 0u64;
        for chunk in mentions.chunks(BATCH_CHUNK) {
            let mut tx = self.pool().begin().await?;
            for mention in chunk {
                let result = sqlx::query(
                    r#"
                    INSERT INTO social_mention (id, politician_id, platform, mention_id,
                        author, author_handle, content, url, subject, subject_detail,
                        sentiment, likes, replies, reposts, engagement_score, posted_at,
                        collected_at, metadata)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                        $15, $16, $17, $18)
                    ON CONFLICT (politician_id, platform, mention_id) DO UPDATE SET
                        likes = EXCLUDED.likes,
                        replies = EXCLUDED.replies,
                        reposts = EXCLUDED.reposts,
                        engagement_score = EXCLUDED.engagement_score,
                        subject = COALESCE(EXCLUDED.subject, social_mention.subject),
                        subject_detail =
                            COALESCE(EXCLUDED.subject_detail, social_mention.subject_detail),
                        sentiment = COALESCE(EXCLUDED.sentiment, social_mention.sentiment),
                        metadata = EXCLUDED.metadata
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(mention.politician_id)
                .bind(mention.platform.to_string())
                .bind(&mention.mention_id)
                .bind(&mention.author)
                .bind(&mention.author_handle)
                .bind(&mention.content)
                .bind(&mention.url)
                .bind(mention.subject.map(|s| s.to_string()))
                .bind(&mention.subject_detail)
                .bind(mention.sentiment.map(|s| s.to_string()))
                .bind(mention.likes)
                .bind(mention.replies)
                .bind(mention.reposts)
                .bind(mention.engagement_score)
                .bind(mention.posted_at)
                .bind(mention.collected_at)
                .bind(&mention.metadata)
                .execute(&mut *tx)
                .await?;
                written += result.rows_affected();
            }
            tx.commit().await?;
        }
        debug!(total = mentions.len(), written, "Social mention batch upserted");
        Ok(written)
    }

    pub async fn count_social_mentions_for_politician(&self, politician_id: i64) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM social_mention WHERE politician_id = $1")
                .bind(politician_id)
                .fetch_one(self.pool())
                .await?;
        Ok(count)
    }

    /// Mentions collected inside [start, end), oldest first. Feeds the topic
    /// roll-up.
    pub async fn get_mentions_in_window(
        &self,
        politician_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SocialMention>> {
        let rows = sqlx::query_as::<_, MentionRow>(
            r#"
            SELECT politician_id, platform, mention_id, author, author_handle, content,
                url, subject, subject_detail, sentiment, likes, replies, reposts,
                engagement_score, posted_at, collected_at, metadata
            FROM social_mention
            WHERE politician_id = $1 AND collected_at >= $2 AND collected_at < $3
            ORDER BY collected_at
            "#,
        )
        .bind(politician_id)
        .bind(start)
        .bind(end)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().filter_map(row_to_mention).collect())
    }
}

fn row_to_mention(r: MentionRow) -> Option<SocialMention> {
    let platform: SocialPlatform = r.platform.parse().ok()?;
    Some(SocialMention {
        politician_id: r.politician_id,
        platform,
        mention_id: r.mention_id,
        author: r.author,
        author_handle: r.author_handle,
        content: r.content,
        url: r.url,
        subject: r.subject.as_deref().map(Subject::parse_lossy),
        subject_detail: r.subject_detail,
        sentiment: r.sentiment.as_deref().map(Sentiment::parse_lossy),
        likes: r.likes,
        replies: r.replies,
        reposts: r.reposts,
        engagement_score: r.engagement_score,
        posted_at: r.posted_at,
        collected_at: r.collected_at,
        metadata: r.metadata,
    })
}
