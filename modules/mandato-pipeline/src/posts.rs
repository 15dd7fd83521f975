//! Own-account social posts for the featured roster (Instagram).

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use mandato_collectors::types::RawPost;
use mandato_collectors::InstagramClient;
use mandato_common::SocialPost;
use mandato_store::{ImageStore, Store};

#[derive(Debug, Default, Clone, Copy)]
pub struct PostRunStats {
    pub politicians_processed: u64,
    pub posts_collected: u64,
    pub errors: u64,
}

pub struct PostsAggregator {
    instagram: InstagramClient,
    images: ImageStore,
    store: Store,
    max_posts: usize,
    inter_profile_delay: Duration,
}

impl PostsAggregator {
    pub fn new(
        instagram: InstagramClient,
        images: ImageStore,
        store: Store,
        max_posts: usize,
        inter_profile_delay: Duration,
    ) -> Self {
        Self {
            instagram,
            images,
            store,
            max_posts,
            inter_profile_delay,
        }
    }

    /// Full run over featured politicians with an Instagram handle.
    pub async fn run_full(&self, cancel: &CancellationToken) -> PostRunStats {
        let mut stats = PostRunStats::default();

        if !self.instagram.is_available() {
            info!("Instagram adapter disabled, skipping post collection");
            return stats;
        }

        let politicians = match self.store.get_featured_politicians().await {
            Ok(politicians) => politicians,
            Err(e) => {
                error!(error = %e, "Failed to load featured politicians");
                stats.errors += 1;
                return stats;
            }
        };

        for politician in &politicians {
            if cancel.is_cancelled() {
                warn!("Post run cancelled, stopping with partial results");
                break;
            }
            let handle = match politician.instagram_handle.as_deref() {
                Some(handle) if !handle.is_empty() => handle,
                _ => continue,
            };

            let raw_posts = self
                .instagram
                .fetch_profile_posts(handle, self.max_posts, cancel)
                .await;
            stats.politicians_processed += 1;
            if raw_posts.is_empty() {
                continue;
            }

            let mut posts = Vec::with_capacity(raw_posts.len());
            for raw in raw_posts {
                posts.push(self.to_post(raw, politician.id).await);
            }

            match self.store.upsert_social_posts_batch(&posts).await {
                Ok(written) => stats.posts_collected += written,
                Err(e) => {
                    error!(name = %politician.name, error = %e, "Post persist failed");
                    stats.errors += 1;
                }
            }

            tokio::time::sleep(self.inter_profile_delay).await;
        }

        info!(
            politicians = stats.politicians_processed,
            posts = stats.posts_collected,
            errors = stats.errors,
            "Post run finished"
        );
        stats
    }

    async fn to_post(&self, raw: RawPost, politician_id: i64) -> SocialPost {
        // Thumbnails expire on the provider CDN, so re-host when possible.
        let media_url = match raw.media_url {
            Some(url) => Some(self.images.upload_from_url(&url, "social").await),
            None => None,
        };

        SocialPost {
            politician_id,
            platform: raw.platform,
            post_id: raw.post_id,
            url: raw.url,
            content: raw.content,
            likes: raw.likes,
            comments: raw.comments,
            shares: 0,
            views: 0,
            engagement_score: raw.engagement_score,
            media_type: raw.media_type,
            media_url,
            posted_at: raw.posted_at,
            metadata: serde_json::json!({ "source": "web_profile_info" }),
        }
    }
}
