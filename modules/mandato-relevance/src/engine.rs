use std::sync::Arc;

use chrono::{DateTime, Utc};

use mandato_common::text::{self, DEFAULT_SIMILARITY_THRESHOLD};
use mandato_common::{extract_domain, round2};

use crate::registry::SourceRegistry;
use crate::weights::RelevanceWeights;

/// Engagement counters a candidate arrives with, when the provider exposes
/// any.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngagementCounters {
    pub shares: i64,
    pub comments: i64,
    pub likes: i64,
}

/// The four subscores plus composite for one candidate, all in [0, 100] and
/// rounded to two decimals.
#[derive(Debug, Clone)]
pub struct RelevanceBreakdown {
    pub score_recency: f64,
    pub score_mention: f64,
    pub score_source: f64,
    pub score_engagement: f64,
    pub relevance: f64,
    pub mention_title: bool,
    pub mention_body: u32,
    pub source_id: Option<String>,
    pub source_name: Option<String>,
}

/// Composite relevance scoring: recency, direct mention, source trust and
/// engagement, combined with configurable weights.
pub struct RelevanceEngine {
    weights: RelevanceWeights,
    registry: Arc<SourceRegistry>,
}

impl RelevanceEngine {
    pub fn new(weights: RelevanceWeights, registry: Arc<SourceRegistry>) -> Self {
        Self { weights, registry }
    }

    pub fn weights(&self) -> RelevanceWeights {
        self.weights
    }

    /// Recency decays 2 points per hour since publication; anything older
    /// than 50 hours scores 0. Missing timestamps get the neutral 50.
    pub fn recency_score(&self, published_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
        let published = match published_at {
            Some(p) => p,
            None => return 50.0,
        };
        let hours = (now - published).num_seconds() as f64 / 3600.0;
        round2((100.0 - 2.0 * hours).clamp(0.0, 100.0))
    }

    /// Title mention is worth 50 points; each body mention adds 10, capped
    /// at 50. Returns (score, title_hit, body_count).
    pub fn mention_score(&self, title: &str, body: &str, name: &str) -> (f64, bool, u32) {
        if name.trim().is_empty() {
            return (0.0, false, 0);
        }
        let analysis = text::analyze_mentions(title, body, name, DEFAULT_SIMILARITY_THRESHOLD);
        let mut score = 0.0;
        if analysis.title_hit {
            score += 50.0;
        }
        score += (10.0 * analysis.body_count as f64).min(50.0);
        (round2(score), analysis.title_hit, analysis.body_count)
    }

    /// Source trust weight (0-2) mapped onto 0-100.
    pub fn source_score(&self, url: &str) -> f64 {
        let weight = self.registry.weight_for(&extract_domain(url));
        round2((weight * 50.0).min(100.0))
    }

    /// Shares count triple, comments double; 1000 weighted interactions
    /// saturate the score.
    pub fn engagement_score(&self, engagement: EngagementCounters) -> f64 {
        let total = 3 * engagement.shares + 2 * engagement.comments + engagement.likes;
        round2((total as f64 / 10.0).min(100.0))
    }

    /// Score one candidate. `name` is empty for region-scoped aggregations,
    /// which zeroes the mention subscore.
    pub fn score(
        &self,
        title: &str,
        body: &str,
        url: &str,
        published_at: Option<DateTime<Utc>>,
        engagement: EngagementCounters,
        name: Option<&str>,
        now: DateTime<Utc>,
    ) -> RelevanceBreakdown {
        let score_recency = self.recency_score(published_at, now);
        let (score_mention, mention_title, mention_body) =
            self.mention_score(title, body, name.unwrap_or(""));
        let score_source = self.source_score(url);
        let score_engagement = self.engagement_score(engagement);

        let relevance = round2(
            score_recency * self.weights.recency
                + score_mention * self.weights.mention
                + score_source * self.weights.source
                + score_engagement * self.weights.engagement,
        );

        let source_entry = self.registry.entry_for(&extract_domain(url));

        RelevanceBreakdown {
            score_recency,
            score_mention,
            score_source,
            score_engagement,
            relevance,
            mention_title,
            mention_body,
            source_id: source_entry.as_ref().and_then(|e| e.id.clone()),
            source_name: source_entry.map(|e| e.name),
        }
    }

    /// Keep an item attached to a politician only when it actually mentions
    /// them: title hit, at least one body mention, or mention score above 20.
    pub fn passes_mention_filter(&self, breakdown: &RelevanceBreakdown) -> bool {
        breakdown.mention_title || breakdown.mention_body > 0 || breakdown.score_mention > 20.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use mandato_common::{SourceCategory, SourceEntry};

    fn engine_with(domain: &str, weight: f64) -> RelevanceEngine {
        let registry = Arc::new(SourceRegistry::from_entries(vec![SourceEntry {
            id: None,
            domain: domain.to_string(),
            name: domain.to_string(),
            category: SourceCategory::National,
            trust_weight: weight,
            active: true,
        }]));
        RelevanceEngine::new(RelevanceWeights::DEFAULT, registry)
    }

    #[test]
    fn recency_decays_two_points_per_hour() {
        let engine = engine_with("g1.globo.com", 1.0);
        let now = Utc::now();
        assert_eq!(engine.recency_score(Some(now - Duration::hours(2)), now), 96.0);
        assert_eq!(engine.recency_score(Some(now - Duration::hours(60)), now), 0.0);
        assert_eq!(engine.recency_score(None, now), 50.0);
    }

    #[test]
    fn future_timestamps_clamp_at_100() {
        let engine = engine_with("g1.globo.com", 1.0);
        let now = Utc::now();
        assert_eq!(engine.recency_score(Some(now + Duration::hours(3)), now), 100.0);
    }

    #[test]
    fn mention_score_caps_body_at_50() {
        let engine = engine_with("g1.globo.com", 1.0);
        let body = "Pereira. ".repeat(20);
        let (score, title_hit, count) = engine.mention_score("Sem relação", &body, "Ana Pereira");
        assert!(!title_hit);
        assert!(count >= 5);
        assert_eq!(score, 50.0);
    }

    #[test]
    fn source_score_maps_weight_to_points() {
        let engine = engine_with("g1.globo.com", 1.5);
        assert_eq!(engine.source_score("https://g1.globo.com/politica/x"), 75.0);
        assert_eq!(engine.source_score("https://desconhecido.com/x"), 50.0);
    }

    #[test]
    fn engagement_saturates_at_100() {
        let engine = engine_with("g1.globo.com", 1.0);
        let score = engine.engagement_score(EngagementCounters {
            shares: 1000,
            comments: 0,
            likes: 0,
        });
        assert_eq!(score, 100.0);
        assert_eq!(engine.engagement_score(EngagementCounters::default()), 0.0);
    }

    // 2h-old G1 article with a title hit and no engagement:
    // 0.25*96 + 0.35*50 + 0.25*75 + 0.15*0 = 60.25.
    #[test]
    fn composite_for_title_hit_article() {
        let engine = engine_with("g1.globo.com", 1.5);
        let now = Utc::now();
        let breakdown = engine.score(
            "João Silva visita obra",
            "",
            "https://g1.globo.com/politica/visita",
            Some(now - Duration::hours(2)),
            EngagementCounters::default(),
            Some("João da Silva Neto"),
            now,
        );

        assert_eq!(breakdown.score_recency, 96.0);
        assert_eq!(breakdown.score_mention, 50.0);
        assert_eq!(breakdown.score_source, 75.0);
        assert_eq!(breakdown.score_engagement, 0.0);
        assert_eq!(breakdown.relevance, 60.25);
        assert!(breakdown.mention_title);
        assert!(engine.passes_mention_filter(&breakdown));
    }

    #[test]
    fn composite_stays_in_bounds_and_matches_weighted_sum() {
        let engine = engine_with("g1.globo.com", 2.0);
        let now = Utc::now();
        let breakdown = engine.score(
            "João Silva aprova projeto",
            "João Silva comentou o projeto. Silva afirmou que vota amanhã.",
            "https://g1.globo.com/x",
            Some(now),
            EngagementCounters {
                shares: 500,
                comments: 300,
                likes: 100,
            },
            Some("João Silva"),
            now,
        );

        for score in [
            breakdown.score_recency,
            breakdown.score_mention,
            breakdown.score_source,
            breakdown.score_engagement,
            breakdown.relevance,
        ] {
            assert!((0.0..=100.0).contains(&score), "out of bounds: {score}");
        }

        let weights = engine.weights();
        let expected = breakdown.score_recency * weights.recency
            + breakdown.score_mention * weights.mention
            + breakdown.score_source * weights.source
            + breakdown.score_engagement * weights.engagement;
        assert!((breakdown.relevance - expected).abs() < 0.01);
    }

    #[test]
    fn region_scoped_scoring_zeroes_mention() {
        let engine = engine_with("g1.globo.com", 1.0);
        let now = Utc::now();
        let breakdown = engine.score(
            "Obras na capital",
            "Texto qualquer",
            "https://g1.globo.com/x",
            Some(now),
            EngagementCounters::default(),
            None,
            now,
        );
        assert_eq!(breakdown.score_mention, 0.0);
        assert!(!breakdown.mention_title);
        assert!(!engine.passes_mention_filter(&breakdown));
    }
}
