//! Mention detection over normalized text.
//!
//! Pure and stateless: safe to call from any number of workers. All matching
//! happens on accent-stripped lowercase text so that "João" and "Joao" are
//! the same token.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Default minimum partial-ratio similarity for a fuzzy title hit.
pub const DEFAULT_SIMILARITY_THRESHOLD: u32 = 85;

/// Connector words dropped when extracting significant name tokens.
const CONNECTORS: [&str; 6] = ["da", "de", "do", "das", "dos", "e"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MentionAnalysis {
    pub title_hit: bool,
    pub body_count: u32,
    /// Best similarity found across all variants, in [0, 100].
    pub best_similarity: u32,
}

/// Normalize text for matching: NFKD-decompose, strip accents and anything
/// non-ASCII, lowercase, collapse whitespace.
///
/// ```
/// assert_eq!(mandato_common::text::normalize("João  da Silva"), "joao da silva");
/// assert_eq!(mandato_common::text::normalize("  SÃO PAULO "), "sao paulo");
/// ```
pub fn normalize(text: &str) -> String {
    let stripped: String = text
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| c.is_ascii())
        .collect::<String>()
        .to_lowercase();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract the normalized search variants of a full name.
///
/// Always yields the full normalized name. When the name has at least two
/// significant tokens (connectors and tokens of one or two letters dropped)
/// it also yields "first last", the last token alone, and the first token
/// alone.
pub fn name_variants(full_name: &str) -> Vec<String> {
    let normalized = normalize(full_name);
    if normalized.is_empty() {
        return Vec::new();
    }

    let significant: Vec<&str> = normalized
        .split_whitespace()
        .filter(|t| !CONNECTORS.contains(t) && t.len() > 2)
        .collect();

    let mut variants = vec![normalized.clone()];
    if significant.len() >= 2 {
        variants.push(format!("{} {}", significant[0], significant[significant.len() - 1]));
        variants.push(significant[significant.len() - 1].to_string());
    }
    if let Some(first) = significant.first() {
        variants.push(first.to_string());
    }

    let mut seen = std::collections::HashSet::new();
    variants.retain(|v| seen.insert(v.clone()));
    variants
}

/// Detect mentions of a politician in a title and body.
///
/// An exact substring match of any variant counts as similarity 100. When no
/// variant matches the title exactly, a partial fuzzy ratio decides the title
/// hit against `threshold`. Body occurrences are counted by exact substring
/// only, summed across variants.
pub fn analyze_mentions(title: &str, body: &str, name: &str, threshold: u32) -> MentionAnalysis {
    let variants = name_variants(name);
    if variants.is_empty() {
        return MentionAnalysis::default();
    }

    let title_norm = normalize(title);
    let body_norm = normalize(body);

    let mut analysis = MentionAnalysis::default();

    for variant in &variants {
        if title_norm.contains(variant.as_str()) {
            analysis.title_hit = true;
            analysis.best_similarity = 100;
        } else {
            let similarity = partial_ratio(variant, &title_norm);
            if similarity >= threshold {
                analysis.title_hit = true;
                analysis.best_similarity = analysis.best_similarity.max(similarity);
            }
        }

        if !body_norm.is_empty() {
            let count = body_norm.matches(variant.as_str()).count() as u32;
            analysis.body_count += count;
            if count > 0 {
                analysis.best_similarity = 100;
            }
        }
    }

    analysis
}

/// Best Levenshtein similarity (0-100) of `needle` against any
/// needle-sized window of `haystack`.
pub fn partial_ratio(needle: &str, haystack: &str) -> u32 {
    if needle.is_empty() || haystack.is_empty() {
        return 0;
    }

    let needle_chars: Vec<char> = needle.chars().collect();
    let haystack_chars: Vec<char> = haystack.chars().collect();

    if needle_chars.len() >= haystack_chars.len() {
        return (strsim::normalized_levenshtein(needle, haystack) * 100.0).round() as u32;
    }

    let window = needle_chars.len();
    let mut best = 0.0f64;
    for start in 0..=(haystack_chars.len() - window) {
        let slice: String = haystack_chars[start..start + window].iter().collect();
        let score = strsim::normalized_levenshtein(needle, &slice);
        if score > best {
            best = score;
            if best >= 1.0 {
                break;
            }
        }
    }
    (best * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_accents_and_case() {
        assert_eq!(normalize("João da Silva"), "joao da silva");
        assert_eq!(normalize("ELEIÇÃO"), "eleicao");
        assert_eq!(normalize("Brasília\t é  linda"), "brasilia e linda");
    }

    #[test]
    fn variants_include_full_name_and_last_token() {
        let variants = name_variants("João da Silva Neto");
        assert_eq!(variants[0], "joao da silva neto");
        assert!(variants.contains(&"joao neto".to_string()));
        assert!(variants.contains(&"neto".to_string()));
        assert!(variants.contains(&"joao".to_string()));
    }

    #[test]
    fn variants_drop_connectors_and_short_tokens() {
        let variants = name_variants("Maria de Sá Couto");
        // "de" is a connector, "sa" is too short to stand alone
        assert!(variants.contains(&"maria couto".to_string()));
        assert!(!variants.contains(&"de".to_string()));
        assert!(!variants.contains(&"sa".to_string()));
    }

    #[test]
    fn variants_single_token_name() {
        let variants = name_variants("Lula");
        assert_eq!(variants, vec!["lula".to_string()]);
    }

    #[test]
    fn variants_empty_name() {
        assert!(name_variants("").is_empty());
        assert!(name_variants("   ").is_empty());
    }

    #[test]
    fn title_hit_via_exact_variant() {
        let analysis = analyze_mentions(
            "João Silva visita obra",
            "",
            "João da Silva Neto",
            DEFAULT_SIMILARITY_THRESHOLD,
        );
        assert!(analysis.title_hit);
        assert_eq!(analysis.body_count, 0);
        assert_eq!(analysis.best_similarity, 100);
    }

    #[test]
    fn no_hit_for_unrelated_title() {
        let analysis = analyze_mentions(
            "Previsão do tempo para o fim de semana",
            "",
            "Carlos Alberto Pereira",
            DEFAULT_SIMILARITY_THRESHOLD,
        );
        assert!(!analysis.title_hit);
        assert_eq!(analysis.body_count, 0);
    }

    #[test]
    fn body_mentions_counted_by_substring() {
        let body = "Pereira anunciou o plano. Segundo Pereira, as obras começam em março.";
        let analysis = analyze_mentions(
            "Plano de obras anunciado",
            body,
            "Carlos Pereira",
            DEFAULT_SIMILARITY_THRESHOLD,
        );
        assert!(!analysis.title_hit);
        assert!(analysis.body_count >= 2);
        assert_eq!(analysis.best_similarity, 100);
    }

    #[test]
    fn fuzzy_title_hit_survives_small_typo() {
        // Missing one letter in the surname still clears the 85 threshold.
        let analysis = analyze_mentions(
            "Fernanda Albuquerqe promete nova escola",
            "",
            "Fernanda Albuquerque",
            DEFAULT_SIMILARITY_THRESHOLD,
        );
        assert!(analysis.title_hit);
        assert!(analysis.best_similarity >= 85);
    }

    #[test]
    fn partial_ratio_exact_substring_is_100() {
        assert_eq!(partial_ratio("silva", "a silva b"), 100);
    }

    #[test]
    fn partial_ratio_empty_inputs() {
        assert_eq!(partial_ratio("", "anything"), 0);
        assert_eq!(partial_ratio("anything", ""), 0);
    }
}
