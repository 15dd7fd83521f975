use mandato_common::MandatoError;

/// Weights for the composite relevance score. Must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelevanceWeights {
    pub recency: f64,
    /// Direct mention carries the most weight.
    pub mention: f64,
    pub source: f64,
    pub engagement: f64,
}

impl RelevanceWeights {
    pub const DEFAULT: RelevanceWeights = RelevanceWeights {
        recency: 0.25,
        mention: 0.35,
        source: 0.25,
        engagement: 0.15,
    };

    /// More weight on recency for breaking-news portals.
    pub const BREAKING_NEWS: RelevanceWeights = RelevanceWeights {
        recency: 0.40,
        mention: 0.30,
        source: 0.20,
        engagement: 0.10,
    };

    /// More weight on trusted sources.
    pub const VERIFIED_SOURCE: RelevanceWeights = RelevanceWeights {
        recency: 0.20,
        mention: 0.30,
        source: 0.40,
        engagement: 0.10,
    };

    /// Resolve a configuration preset name.
    pub fn preset(name: &str) -> Option<RelevanceWeights> {
        match name {
            "default" => Some(Self::DEFAULT),
            "breaking_news" => Some(Self::BREAKING_NEWS),
            "verified_source" => Some(Self::VERIFIED_SOURCE),
            _ => None,
        }
    }

    /// Weights must sum to 1.0 within 0.01.
    pub fn validate(&self) -> Result<(), MandatoError> {
        let total = self.recency + self.mention + self.source + self.engagement;
        if (total - 1.0).abs() > 0.01 {
            return Err(MandatoError::Validation(format!(
                "relevance weights must sum to 1.0, got {total}"
            )));
        }
        Ok(())
    }
}

impl Default for RelevanceWeights {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_presets_sum_to_one() {
        for preset in ["default", "breaking_news", "verified_source"] {
            RelevanceWeights::preset(preset).unwrap().validate().unwrap();
        }
    }

    #[test]
    fn unknown_preset_is_none() {
        assert!(RelevanceWeights::preset("viral").is_none());
    }

    #[test]
    fn unbalanced_weights_rejected() {
        let bad = RelevanceWeights {
            recency: 0.5,
            mention: 0.5,
            source: 0.5,
            engagement: 0.5,
        };
        assert!(bad.validate().is_err());
    }
}
