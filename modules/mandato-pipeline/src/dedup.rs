//! Cross-source deduplication, region selection and selective enrichment.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use mandato_collectors::types::RawNews;
use mandato_collectors::GoogleNewsClient;
use mandato_common::{canonical_url, extract_domain, NewsItem};
use mandato_store::ImageStore;

/// Concurrent article fetches during enrichment.
const ENRICH_CONCURRENCY: usize = 4;

/// Fold candidates by canonical URL. On collision the record with the longer
/// full text wins; ties keep the earliest-seen record. First-seen order is
/// preserved.
pub fn dedupe(items: Vec<RawNews>) -> Vec<RawNews> {
    let mut order: Vec<String> = Vec::new();
    let mut by_key: HashMap<String, RawNews> = HashMap::new();

    for item in items {
        let key = canonical_url(&item.url);
        if key.is_empty() {
            continue;
        }
        match by_key.get_mut(&key) {
            None => {
                order.push(key.clone());
                by_key.insert(key, item);
            }
            Some(existing) => {
                let existing_len = existing.full_text.as_deref().map_or(0, str::len);
                let new_len = item.full_text.as_deref().map_or(0, str::len);
                if new_len > existing_len {
                    *existing = item;
                }
            }
        }
    }

    order.into_iter().filter_map(|key| by_key.remove(&key)).collect()
}

/// Pick at most `limit` items for region scopes: newest first, at most one
/// per portal, no canonical duplicates. When there are fewer portals than
/// slots, remaining slots are backfilled with the next-freshest unseen
/// items, so a portal only repeats when it has to.
pub fn select_latest_unique_portals(items: Vec<NewsItem>, limit: usize) -> Vec<NewsItem> {
    let mut ordered = items;
    ordered.sort_by_key(|n| {
        std::cmp::Reverse(n.published_at.unwrap_or(DateTime::<Utc>::MIN_UTC))
    });

    let mut selected = Vec::with_capacity(limit);
    let mut passed_over: Vec<NewsItem> = Vec::new();
    let mut seen_domains: HashSet<String> = HashSet::new();
    let mut seen_urls: HashSet<String> = HashSet::new();

    for item in ordered {
        if selected.len() >= limit {
            break;
        }
        if item.url.trim().is_empty() {
            continue;
        }
        let key = canonical_url(&item.url);
        if !seen_urls.insert(key) {
            continue;
        }
        let domain = extract_domain(&item.url);
        if !domain.is_empty() && !seen_domains.insert(domain) {
            passed_over.push(item);
            continue;
        }

        selected.push(item);
    }

    // Backfill from repeat portals, still newest first.
    let mut backfill = passed_over.into_iter();
    while selected.len() < limit {
        match backfill.next() {
            Some(item) => selected.push(item),
            None => break,
        }
    }

    selected
}

/// For selected items without full text, fetch the article and fill ONLY the
/// missing fields. Fetched hero images are re-hosted through the object
/// store, falling back to the provider URL.
pub async fn enrich_selected(
    items: &mut [NewsItem],
    google: &GoogleNewsClient,
    images: &ImageStore,
    cancel: &CancellationToken,
) {
    let to_fetch: Vec<(usize, String)> = items
        .iter()
        .enumerate()
        .filter(|(_, item)| item.full_text.as_deref().unwrap_or("").trim().is_empty())
        .map(|(idx, item)| (idx, item.url.clone()))
        .collect();

    if to_fetch.is_empty() {
        return;
    }
    debug!(count = to_fetch.len(), "Enriching selected items with article content");

    let fetched: Vec<_> = stream::iter(to_fetch)
        .map(|(idx, url)| async move { (idx, google.fetch_article(&url, cancel).await) })
        .buffer_unordered(ENRICH_CONCURRENCY)
        .collect()
        .await;

    for (idx, content) in fetched {
        if content.is_empty() {
            continue;
        }
        let item = &mut items[idx];

        if item.full_text.as_deref().unwrap_or("").trim().is_empty() {
            item.full_text = content.full_text;
        }
        if item.published_at.is_none() {
            item.published_at = content.published_at;
        }
        if item.title.trim().is_empty() {
            if let Some(title) = content.title {
                item.title = title;
            }
        }
        if item.description.as_deref().unwrap_or("").trim().is_empty() {
            item.description = content.description;
        }
        if item.image_url.is_none() {
            if let Some(image) = content.image_url {
                item.image_url = Some(images.upload_from_url(&image, "news").await);
            }
        }
    }
}
