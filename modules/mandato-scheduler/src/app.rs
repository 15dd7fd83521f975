//! Process-wide application state: configuration, store, registry and the
//! aggregators, constructed once at startup and injected into jobs.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use mandato_classifier::TopicClassifier;
use mandato_collectors::{
    BlueskyClient, Fetcher, GoogleNewsClient, GoogleTrendsClient, InstagramClient, Trends24Client,
    WikidataClient,
};
use mandato_common::Config;
use mandato_pipeline::{
    HandleEnricher, MentionsAggregator, NewsAggregator, PostsAggregator, TrendingPipeline,
};
use mandato_relevance::{RelevanceEngine, RelevanceWeights, SourceRegistry};
use mandato_store::{ImageStore, Store};

/// HTTP timeout for news and social providers.
const PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

/// Scraped pages (article bodies, trends24) can be slow.
const SCRAPE_TIMEOUT: Duration = Duration::from_secs(60);

pub struct App {
    pub config: Config,
    pub store: Store,
    pub registry: Arc<SourceRegistry>,
    pub news: NewsAggregator,
    pub mentions: MentionsAggregator,
    pub posts: PostsAggregator,
    pub trending: TrendingPipeline,
    pub socials: HandleEnricher,
}

impl App {
    /// Wire the whole pipeline from configuration. Connects to the store,
    /// applies migrations and loads the source registry.
    pub async fn init(config: Config) -> Result<Arc<App>> {
        let store = Store::connect(&config.database_url, config.store_max_connections).await?;
        store.migrate().await?;

        let sources = store.get_active_sources().await?;
        info!(count = sources.len(), "Loaded news sources into the registry");
        let registry = Arc::new(SourceRegistry::from_entries(sources));

        let weights = match RelevanceWeights::preset(&config.relevance_preset) {
            Some(weights) => weights,
            None => {
                warn!(preset = %config.relevance_preset, "Unknown relevance preset, using default");
                RelevanceWeights::DEFAULT
            }
        };
        weights.validate()?;
        let engine = RelevanceEngine::new(weights, registry.clone());

        let images = ImageStore::new(config.storage_url.clone(), config.storage_key.clone());

        let request_delay = Duration::from_secs_f64(config.delay_between_requests);
        let news_fetcher = Fetcher::new(PROVIDER_TIMEOUT, request_delay);
        let scrape_fetcher = Fetcher::new(SCRAPE_TIMEOUT, request_delay);
        let instagram_fetcher = Fetcher::new(
            PROVIDER_TIMEOUT,
            Duration::from_secs_f64(config.delay_instagram),
        );

        let google_news = || {
            GoogleNewsClient::new(
                news_fetcher.clone(),
                config.max_news_per_politician as usize,
            )
        };
        let newsapi = mandato_collectors::NewsApiClient::new(
            news_fetcher.clone(),
            config.newsapi_key.clone(),
            config.max_news_per_politician,
        );
        let bluesky = BlueskyClient::new(news_fetcher.clone());
        let trends = || GoogleTrendsClient::new(news_fetcher.clone());
        let trends24 = Trends24Client::new(scrape_fetcher.clone());
        let instagram = InstagramClient::new(
            instagram_fetcher,
            config.instagram_username.clone(),
            config.instagram_password.clone(),
        );
        let classifier =
            TopicClassifier::new(config.llm_api_key.clone(), config.llm_model.clone());

        let inter_politician_delay = Duration::from_secs(2);

        let news = NewsAggregator::new(
            google_news(),
            newsapi,
            engine,
            store.clone(),
            images.clone(),
            inter_politician_delay,
        );
        let mentions = MentionsAggregator::new(
            bluesky,
            trends(),
            classifier,
            store.clone(),
            inter_politician_delay,
        );
        let posts = PostsAggregator::new(
            instagram,
            images.clone(),
            store.clone(),
            config.max_posts_per_politician as usize,
            Duration::from_secs_f64(config.delay_instagram),
        );
        let trending = TrendingPipeline::new(google_news(), trends(), trends24, store.clone());
        let socials = HandleEnricher::new(
            WikidataClient::new(news_fetcher.clone()),
            store.clone(),
            config.handle_mapping_path.clone().into(),
            config.logs_dir.clone().into(),
        );

        Ok(Arc::new(App {
            config,
            store,
            registry,
            news,
            mentions,
            posts,
            trending,
            socials,
        }))
    }

    /// Admin operation: update a source's trust weight in memory and in the
    /// store.
    pub async fn set_source_weight(&self, domain: &str, weight: f64) -> Result<()> {
        let entry = self.registry.set_weight(domain, weight);
        self.store.set_source_weight(&entry.domain, entry.trust_weight).await
    }
}
