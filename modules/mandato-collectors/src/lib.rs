pub mod bluesky;
pub mod esaj;
pub mod google_news;
pub mod http;
pub mod instagram;
pub mod news_api;
pub mod trends;
pub mod trends24;
pub mod types;
pub mod wikidata;

pub use bluesky::BlueskyClient;
pub use esaj::EsajClient;
pub use google_news::GoogleNewsClient;
pub use http::Fetcher;
pub use instagram::InstagramClient;
pub use news_api::NewsApiClient;
pub use trends::GoogleTrendsClient;
pub use trends24::Trends24Client;
pub use types::{ArticleContent, RawMention, RawNews, RawPost, TrendingEntry};
pub use wikidata::WikidataClient;
