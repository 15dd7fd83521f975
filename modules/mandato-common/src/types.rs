use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Scope / platform tags ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewsScope {
    Politician,
    Competitor,
    City,
    State,
    National,
}

impl std::fmt::Display for NewsScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NewsScope::Politician => write!(f, "politician"),
            NewsScope::Competitor => write!(f, "competitor"),
            NewsScope::City => write!(f, "city"),
            NewsScope::State => write!(f, "state"),
            NewsScope::National => write!(f, "national"),
        }
    }
}

impl std::str::FromStr for NewsScope {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "politician" => Ok(Self::Politician),
            "competitor" => Ok(Self::Competitor),
            "city" => Ok(Self::City),
            "state" => Ok(Self::State),
            "national" => Ok(Self::National),
            other => Err(format!("unknown NewsScope: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocialPlatform {
    Instagram,
    Bluesky,
    GoogleTrends,
    X,
}

impl std::fmt::Display for SocialPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SocialPlatform::Instagram => write!(f, "instagram"),
            SocialPlatform::Bluesky => write!(f, "bluesky"),
            SocialPlatform::GoogleTrends => write!(f, "google_trends"),
            SocialPlatform::X => write!(f, "x"),
        }
    }
}

impl std::str::FromStr for SocialPlatform {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "instagram" => Ok(Self::Instagram),
            "bluesky" => Ok(Self::Bluesky),
            "google_trends" => Ok(Self::GoogleTrends),
            "x" => Ok(Self::X),
            other => Err(format!("unknown SocialPlatform: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    #[default]
    Image,
    Video,
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaType::Image => write!(f, "image"),
            MediaType::Video => write!(f, "video"),
        }
    }
}

impl std::str::FromStr for MediaType {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            other => Err(format!("unknown MediaType: {other}")),
        }
    }
}

// --- Classification ---

/// Closed subject taxonomy for classified mentions. Anything the classifier
/// returns outside this set collapses to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    Health,
    Education,
    Security,
    Economy,
    Infrastructure,
    Environment,
    Corruption,
    Politics,
    Social,
    Culture,
    Technology,
    Agribusiness,
    Other,
}

impl Subject {
    pub const ALL: [Subject; 13] = [
        Subject::Health,
        Subject::Education,
        Subject::Security,
        Subject::Economy,
        Subject::Infrastructure,
        Subject::Environment,
        Subject::Corruption,
        Subject::Politics,
        Subject::Social,
        Subject::Culture,
        Subject::Technology,
        Subject::Agribusiness,
        Subject::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Subject::Health => "Health",
            Subject::Education => "Education",
            Subject::Security => "Security",
            Subject::Economy => "Economy",
            Subject::Infrastructure => "Infrastructure",
            Subject::Environment => "Environment",
            Subject::Corruption => "Corruption",
            Subject::Politics => "Politics",
            Subject::Social => "Social",
            Subject::Culture => "Culture",
            Subject::Technology => "Technology",
            Subject::Agribusiness => "Agribusiness",
            Subject::Other => "Other",
        }
    }

    /// Parse a classifier label, collapsing anything unknown to `Other`.
    pub fn parse_lossy(value: &str) -> Subject {
        let trimmed = value.trim();
        Subject::ALL
            .into_iter()
            .find(|s| s.label().eq_ignore_ascii_case(trimmed))
            .unwrap_or(Subject::Other)
    }
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for Subject {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Subject::ALL
            .into_iter()
            .find(|sub| sub.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown Subject: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl Sentiment {
    /// Parse a classifier label, collapsing anything unknown to `Neutral`.
    pub fn parse_lossy(value: &str) -> Sentiment {
        match value.trim().to_lowercase().as_str() {
            "positive" => Sentiment::Positive,
            "negative" => Sentiment::Negative,
            _ => Sentiment::Neutral,
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sentiment::Positive => write!(f, "positive"),
            Sentiment::Neutral => write!(f, "neutral"),
            Sentiment::Negative => write!(f, "negative"),
        }
    }
}

impl std::str::FromStr for Sentiment {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "positive" => Ok(Self::Positive),
            "neutral" => Ok(Self::Neutral),
            "negative" => Ok(Self::Negative),
            other => Err(format!("unknown Sentiment: {other}")),
        }
    }
}

// --- Politicians ---

/// A tracked politician. Created and maintained externally; this pipeline
/// only reads the roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Politician {
    pub id: i64,
    pub uuid: String,
    pub name: String,
    pub city: Option<String>,
    /// Two-letter state code (e.g. "SP").
    pub state: Option<String>,
    /// Free-form office title as stored (e.g. "Deputada Federal").
    pub office: Option<String>,
    pub active: bool,
    /// Secondary subset flag used by the social-post and mention jobs.
    pub featured: bool,
    pub instagram_handle: Option<String>,
    pub x_handle: Option<String>,
    /// Tax id, when known. Drives the weekly judicial consultation sweep.
    pub cpf: Option<String>,
}

/// Which news scopes a given office should collect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeFlags {
    pub national: bool,
    pub state: bool,
    pub city: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Office {
    President,
    Senator,
    FederalDeputy,
    Governor,
    ViceGovernor,
    StateDeputy,
    Mayor,
    Councilor,
}

impl Office {
    /// Parse the office titles found in the store. Accepts the masculine and
    /// feminine Portuguese forms.
    pub fn parse(title: &str) -> Option<Office> {
        let normalized = title.trim().to_lowercase();
        match normalized.as_str() {
            "presidente" => Some(Office::President),
            "senador" | "senadora" => Some(Office::Senator),
            "deputado federal" | "deputada federal" => Some(Office::FederalDeputy),
            "governador" | "governadora" => Some(Office::Governor),
            "vice governador" | "vice-governador" | "vice governadora" | "vice-governadora" => {
                Some(Office::ViceGovernor)
            }
            "deputado estadual" | "deputada estadual" => Some(Office::StateDeputy),
            "prefeito" | "prefeita" => Some(Office::Mayor),
            "vereador" | "vereadora" => Some(Office::Councilor),
            _ => None,
        }
    }

    pub fn scope(&self) -> ScopeFlags {
        match self {
            Office::President | Office::Senator | Office::FederalDeputy => ScopeFlags {
                national: true,
                state: true,
                city: true,
            },
            Office::Governor
            | Office::ViceGovernor
            | Office::StateDeputy
            | Office::Mayor
            | Office::Councilor => ScopeFlags {
                national: false,
                state: true,
                city: true,
            },
        }
    }
}

/// Scope routing for a possibly-missing or unrecognized office title.
/// Unknown offices stay local: city news only.
pub fn scope_for_office(office: Option<&str>) -> ScopeFlags {
    office
        .and_then(Office::parse)
        .map(|o| o.scope())
        .unwrap_or(ScopeFlags {
            national: false,
            state: false,
            city: true,
        })
}

// --- News ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub description: Option<String>,
    pub full_text: Option<String>,
    /// Canonical unique key after URL normalization.
    pub url: String,
    pub source_name: Option<String>,
    pub source_id: Option<String>,
    pub image_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub scope: NewsScope,
    pub city: Option<String>,
    pub state: Option<String>,
    pub politician_id: Option<i64>,
    pub collected_at: DateTime<Utc>,
    pub score_recency: f64,
    pub score_mention: f64,
    pub score_source: f64,
    pub score_engagement: f64,
    /// Weighted composite of the four subscores.
    pub relevance: f64,
    pub mention_title: bool,
    pub mention_body: i64,
}

// --- Social posts and mentions ---

/// A post authored by the tracked politician on their own account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialPost {
    pub politician_id: i64,
    pub platform: SocialPlatform,
    /// Provider-native post id (shortcode for Instagram).
    pub post_id: String,
    pub url: Option<String>,
    pub content: Option<String>,
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
    pub views: i64,
    pub engagement_score: f64,
    pub media_type: MediaType,
    pub media_url: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    pub metadata: serde_json::Value,
}

/// A public post by a third party referring to a tracked politician.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialMention {
    pub politician_id: i64,
    pub platform: SocialPlatform,
    pub mention_id: String,
    pub author: Option<String>,
    pub author_handle: Option<String>,
    pub content: String,
    pub url: Option<String>,
    pub subject: Option<Subject>,
    pub subject_detail: Option<String>,
    pub sentiment: Option<Sentiment>,
    pub likes: i64,
    pub replies: i64,
    pub reposts: i64,
    pub engagement_score: f64,
    pub posted_at: Option<DateTime<Utc>>,
    pub collected_at: DateTime<Utc>,
    pub metadata: serde_json::Value,
}

/// Per-subject roll-up of classified mentions over a window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentionTopic {
    pub politician_id: i64,
    pub subject: Subject,
    pub total: i64,
    pub positive: i64,
    pub negative: i64,
    pub neutral: i64,
    pub engagement_total: f64,
    pub last_mention_at: Option<DateTime<Utc>>,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Trending ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendCategory {
    Politics,
    Twitter,
    Google,
    General,
}

impl TrendCategory {
    pub const ALL: [TrendCategory; 4] = [
        TrendCategory::Politics,
        TrendCategory::Twitter,
        TrendCategory::Google,
        TrendCategory::General,
    ];
}

impl std::fmt::Display for TrendCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendCategory::Politics => write!(f, "politics"),
            TrendCategory::Twitter => write!(f, "twitter"),
            TrendCategory::Google => write!(f, "google"),
            TrendCategory::General => write!(f, "general"),
        }
    }
}

impl std::str::FromStr for TrendCategory {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "politics" => Ok(Self::Politics),
            "twitter" => Ok(Self::Twitter),
            "google" => Ok(Self::Google),
            "general" => Ok(Self::General),
            other => Err(format!("unknown TrendCategory: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendingTopic {
    pub category: TrendCategory,
    pub rank: i32,
    pub title: String,
    pub subtitle: Option<String>,
}

// --- News sources ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceCategory {
    National,
    Regional,
    Local,
    Social,
}

impl std::fmt::Display for SourceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceCategory::National => write!(f, "national"),
            SourceCategory::Regional => write!(f, "regional"),
            SourceCategory::Local => write!(f, "local"),
            SourceCategory::Social => write!(f, "social"),
        }
    }
}

impl std::str::FromStr for SourceCategory {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "national" => Ok(Self::National),
            "regional" => Ok(Self::Regional),
            "local" => Ok(Self::Local),
            "social" => Ok(Self::Social),
            other => Err(format!("unknown SourceCategory: {other}")),
        }
    }
}

/// A known news portal with its trust weight. Loaded at startup and
/// hot-reloadable through the admin weight update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEntry {
    pub id: Option<String>,
    pub domain: String,
    pub name: String,
    pub category: SourceCategory,
    /// Trust multiplier in [0, 2]. 1.0 = unknown/neutral source.
    pub trust_weight: f64,
    pub active: bool,
}

// --- Job logging ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Started,
    Ok,
    Partial,
    Error,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Started => write!(f, "started"),
            JobStatus::Ok => write!(f, "ok"),
            JobStatus::Partial => write!(f, "partial"),
            JobStatus::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "started" => Ok(Self::Started),
            "ok" => Ok(Self::Ok),
            "partial" => Ok(Self::Partial),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown JobStatus: {other}")),
        }
    }
}

// --- Judicial consultations (CAPTCHA-degraded collectors) ---

/// A prepared consultation the CAPTCHA-gated court collectors hand back
/// instead of structured records: the query URL plus instructions for the
/// human step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultationStub {
    pub politician_id: i64,
    pub court: String,
    pub url: String,
    pub instructions: String,
    pub created_at: DateTime<Utc>,
}

/// A court case extracted from human-fetched result HTML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourtCase {
    pub politician_id: Option<i64>,
    pub court: String,
    pub case_number: String,
    pub case_class: Option<String>,
    pub subject: Option<String>,
    pub filed_at: Option<DateTime<Utc>>,
}
