use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres (the external store)
    pub database_url: String,
    pub store_max_connections: u32,

    // Object storage for re-hosted images; pass-through when unset
    pub storage_url: Option<String>,
    pub storage_key: Option<String>,

    // Third-party credentials; absence disables the feature
    pub newsapi_key: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_model: String,
    pub instagram_username: Option<String>,
    pub instagram_password: Option<String>,

    // Collection schedule
    pub collect_hour: u32,
    pub collect_minute: u32,
    pub collect_timezone: String,

    // Limits
    pub max_news_per_politician: u32,
    pub max_posts_per_politician: u32,
    pub retention_news_days: i64,
    pub retention_posts_days: i64,
    pub retention_mentions_days: i64,

    // Rate limiting (seconds)
    pub delay_between_requests: f64,
    pub delay_instagram: f64,

    // Relevance weight preset: "default", "breaking_news", "verified_source"
    pub relevance_preset: String,

    // Handle enrichment inputs
    pub handle_mapping_path: String,
    pub logs_dir: String,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        let (collect_hour, collect_minute) = parse_collect_time(
            &env::var("COLLECT_TIME").unwrap_or_else(|_| "06:00".to_string()),
        );

        Self {
            database_url: required_env("DATABASE_URL"),
            store_max_connections: optional_parsed("STORE_MAX_CONNECTIONS", 5),
            storage_url: env::var("STORAGE_URL").ok().filter(|v| !v.is_empty()),
            storage_key: env::var("STORAGE_KEY").ok().filter(|v| !v.is_empty()),
            newsapi_key: env::var("NEWSAPI_KEY").ok().filter(|v| !v.is_empty()),
            llm_api_key: env::var("LLM_API_KEY").ok().filter(|v| !v.is_empty()),
            llm_model: env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            instagram_username: env::var("INSTAGRAM_USERNAME").ok().filter(|v| !v.is_empty()),
            instagram_password: env::var("INSTAGRAM_PASSWORD").ok().filter(|v| !v.is_empty()),
            collect_hour,
            collect_minute,
            collect_timezone: env::var("COLLECT_TIMEZONE")
                .unwrap_or_else(|_| "America/Sao_Paulo".to_string()),
            max_news_per_politician: optional_parsed("MAX_NEWS_PER_POLITICIAN", 20),
            max_posts_per_politician: optional_parsed("MAX_POSTS_PER_POLITICIAN", 10),
            retention_news_days: optional_parsed("RETENTION_NEWS_DAYS", 7),
            retention_posts_days: optional_parsed("RETENTION_POSTS_DAYS", 30),
            retention_mentions_days: optional_parsed("RETENTION_MENTIONS_DAYS", 30),
            delay_between_requests: optional_parsed("DELAY_BETWEEN_REQUESTS", 2.0),
            delay_instagram: optional_parsed("DELAY_INSTAGRAM", 5.0),
            relevance_preset: env::var("RELEVANCE_PRESET")
                .unwrap_or_else(|_| "default".to_string()),
            handle_mapping_path: env::var("HANDLE_MAPPING_PATH")
                .unwrap_or_else(|_| "data/politicos_fontes.csv".to_string()),
            logs_dir: env::var("LOGS_DIR").unwrap_or_else(|_| "logs".to_string()),
        }
    }

    /// Log which optional features are enabled without leaking secrets.
    pub fn log_redacted(&self) {
        let vars = [
            ("DATABASE_URL", Some(self.database_url.as_str())),
            ("STORAGE_URL", self.storage_url.as_deref()),
            ("STORAGE_KEY", self.storage_key.as_deref()),
            ("NEWSAPI_KEY", self.newsapi_key.as_deref()),
            ("LLM_API_KEY", self.llm_api_key.as_deref()),
            ("INSTAGRAM_USERNAME", self.instagram_username.as_deref()),
        ];
        for (name, value) in vars {
            match value {
                Some(v) => tracing::info!("{name} = ({} chars)", v.len()),
                None => tracing::info!("{name} = (unset, feature disabled)"),
            }
        }
        tracing::info!(
            hour = self.collect_hour,
            minute = self.collect_minute,
            timezone = %self.collect_timezone,
            "Collection schedule"
        );
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn optional_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Parse "HH:MM" into (hour, minute). Malformed input falls back to 06:00.
fn parse_collect_time(value: &str) -> (u32, u32) {
    let mut parts = value.splitn(2, ':');
    let hour = parts.next().and_then(|h| h.trim().parse().ok());
    let minute = parts.next().and_then(|m| m.trim().parse().ok());
    match (hour, minute) {
        (Some(h), Some(m)) if h < 24 && m < 60 => (h, m),
        _ => (6, 0),
    }
}
