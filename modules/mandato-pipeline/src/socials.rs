//! Social-handle enrichment from official sources.
//!
//! A CSV file maps politician ids to official identity keys (Wikidata QID,
//! chamber ids). For mapped politicians the Wikidata handles are fetched,
//! normalized and validated; existing valid handles are never overwritten.
//! Every planned change is appended to a JSONL audit log, and dry runs stop
//! before touching the store.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use mandato_collectors::WikidataClient;
use mandato_store::Store;

#[derive(Debug, Default, Clone, Copy)]
pub struct SocialsRunStats {
    pub active_politicians: u64,
    pub with_mapping: u64,
    pub wikidata_queries: u64,
    pub updates_planned: u64,
    pub updates_applied: u64,
    pub skipped_no_mapping: u64,
    pub skipped_no_data: u64,
    pub skipped_no_change: u64,
    pub errors: u64,
}

/// One row of the identity-mapping CSV. Rows starting with `#` are comments.
#[derive(Debug, Clone, Deserialize)]
pub struct HandleMapping {
    pub politician_id: i64,
    #[serde(default)]
    pub wikidata_qid: Option<String>,
    #[serde(default)]
    pub camara_id: Option<String>,
    #[serde(default)]
    pub senado_id: Option<String>,
}

pub struct HandleEnricher {
    wikidata: WikidataClient,
    store: Store,
    mapping_path: PathBuf,
    logs_dir: PathBuf,
}

impl HandleEnricher {
    pub fn new(
        wikidata: WikidataClient,
        store: Store,
        mapping_path: PathBuf,
        logs_dir: PathBuf,
    ) -> Self {
        Self {
            wikidata,
            store,
            mapping_path,
            logs_dir,
        }
    }

    /// Run the enrichment over active politicians. With `dry_run` nothing is
    /// written to the store; the audit log is produced either way.
    pub async fn run(&self, dry_run: bool, cancel: &CancellationToken) -> SocialsRunStats {
        let mut stats = SocialsRunStats::default();

        let mappings = match load_mapping(&self.mapping_path) {
            Ok(mappings) => mappings,
            Err(e) => {
                warn!(path = %self.mapping_path.display(), error = %e, "No usable handle mapping");
                return stats;
            }
        };

        let politicians = match self.store.get_active_politicians().await {
            Ok(politicians) => politicians,
            Err(e) => {
                error!(error = %e, "Failed to load active politicians");
                stats.errors += 1;
                return stats;
            }
        };
        stats.active_politicians = politicians.len() as u64;

        let audit_path = self
            .logs_dir
            .join(format!("social_fill_{}.jsonl", Utc::now().format("%Y%m%d")));

        for politician in &politicians {
            if cancel.is_cancelled() {
                warn!("Handle enrichment cancelled");
                break;
            }

            let mapping = match mappings.get(&politician.id) {
                Some(mapping) => mapping,
                None => {
                    stats.skipped_no_mapping += 1;
                    continue;
                }
            };
            stats.with_mapping += 1;

            let qid = match mapping.wikidata_qid.as_deref().and_then(normalize_qid) {
                Some(qid) => qid,
                None => {
                    stats.skipped_no_data += 1;
                    continue;
                }
            };

            stats.wikidata_queries += 1;
            let handles = self.wikidata.social_handles(&qid, cancel).await;

            let new_instagram = handles.instagram.as_deref().and_then(normalize_instagram);
            let new_x = handles.x.as_deref().and_then(normalize_x);
            if new_instagram.is_none() && new_x.is_none() {
                stats.skipped_no_data += 1;
                continue;
            }

            let apply_instagram = should_update(
                politician.instagram_handle.as_deref(),
                new_instagram.as_deref(),
                normalize_instagram,
            );
            let apply_x =
                should_update(politician.x_handle.as_deref(), new_x.as_deref(), normalize_x);
            if !apply_instagram && !apply_x {
                stats.skipped_no_change += 1;
                continue;
            }

            stats.updates_planned += apply_instagram as u64 + apply_x as u64;

            let next_instagram = if apply_instagram {
                new_instagram.clone()
            } else {
                politician.instagram_handle.clone()
            };
            let next_x = if apply_x { new_x.clone() } else { politician.x_handle.clone() };
            let audit = json!({
                "politician_id": politician.id,
                "source": "wikidata",
                "qid": qid,
                "dry_run": dry_run,
                "old": {
                    "instagram_handle": &politician.instagram_handle,
                    "x_handle": &politician.x_handle,
                },
                "new": {
                    "instagram_handle": next_instagram,
                    "x_handle": next_x,
                },
                "ts": Utc::now().to_rfc3339(),
            });
            if let Err(e) = append_jsonl(&audit_path, &audit) {
                warn!(path = %audit_path.display(), error = %e, "Failed to write audit line");
            }

            if dry_run {
                continue;
            }

            let result = self
                .store
                .update_politician_socials(
                    politician.id,
                    apply_instagram.then_some(new_instagram.as_deref()).flatten(),
                    apply_x.then_some(new_x.as_deref()).flatten(),
                )
                .await;
            match result {
                Ok(true) => {
                    stats.updates_applied += apply_instagram as u64 + apply_x as u64;
                }
                Ok(false) => {}
                Err(e) => {
                    error!(politician_id = politician.id, error = %e, "Handle update failed");
                    stats.errors += 1;
                }
            }
        }

        info!(
            with_mapping = stats.with_mapping,
            planned = stats.updates_planned,
            applied = stats.updates_applied,
            errors = stats.errors,
            dry_run,
            "Handle enrichment finished"
        );
        stats
    }
}

/// Load the identity mapping, skipping comment and blank lines.
pub fn load_mapping(path: &Path) -> anyhow::Result<HashMap<i64, HandleMapping>> {
    let raw = std::fs::read_to_string(path)?;
    let filtered: String = raw
        .lines()
        .filter(|line| !line.trim_start().starts_with('#') && !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    let mut reader = csv::Reader::from_reader(filtered.as_bytes());
    let mut out = HashMap::new();
    for row in reader.deserialize::<HandleMapping>() {
        match row {
            Ok(mapping) => {
                out.insert(mapping.politician_id, mapping);
            }
            Err(e) => warn!(error = %e, "Invalid mapping row skipped"),
        }
    }
    Ok(out)
}

fn append_jsonl(path: &Path, payload: &serde_json::Value) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{payload}")?;
    Ok(())
}

/// A QID is "Q" followed by digits; anything else is rejected.
pub fn normalize_qid(raw: &str) -> Option<String> {
    let qid = raw.trim();
    let mut chars = qid.chars();
    if chars.next() != Some('Q') {
        return None;
    }
    let rest = chars.as_str();
    if rest.is_empty() || !rest.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(qid.to_string())
}

/// Normalize an Instagram handle: strip @ and profile-URL wrappers, then
/// validate against the allowed charset.
pub fn normalize_instagram(raw: &str) -> Option<String> {
    normalize_handle(
        raw,
        &Regex::new(r"(?i)(?:https?://)?(?:www\.)?instagram\.com/([A-Za-z0-9._]+)/?").ok()?,
        &Regex::new(r"^[A-Za-z0-9._]{1,30}$").ok()?,
    )
}

/// Normalize an X handle: strip @ and x.com/twitter.com URL wrappers.
pub fn normalize_x(raw: &str) -> Option<String> {
    normalize_handle(
        raw,
        &Regex::new(r"(?i)(?:https?://)?(?:www\.)?(?:x\.com|twitter\.com)/([A-Za-z0-9_]+)/?")
            .ok()?,
        &Regex::new(r"^[A-Za-z0-9_]{1,15}$").ok()?,
    )
}

fn normalize_handle(raw: &str, url_pattern: &Regex, valid: &Regex) -> Option<String> {
    let mut value = raw.trim().trim_start_matches('@').to_string();
    if let Some(captures) = url_pattern.captures(&value) {
        value = captures.get(1)?.as_str().to_string();
    }
    let value = value.trim().trim_start_matches('@').to_string();
    if valid.is_match(&value) {
        Some(value)
    } else {
        None
    }
}

/// Fill only when the column is empty or clearly invalid; valid existing
/// handles win over fetched ones.
fn should_update(
    current: Option<&str>,
    new_value: Option<&str>,
    normalize: fn(&str) -> Option<String>,
) -> bool {
    if new_value.is_none() {
        return false;
    }
    match current {
        None => true,
        Some(current) if current.trim().is_empty() => true,
        Some(current) => normalize(current).is_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qid_validation() {
        assert_eq!(normalize_qid("Q123"), Some("Q123".to_string()));
        assert_eq!(normalize_qid("  Q9 "), Some("Q9".to_string()));
        assert_eq!(normalize_qid("123"), None);
        assert_eq!(normalize_qid("Qabc"), None);
        assert_eq!(normalize_qid(""), None);
    }

    #[test]
    fn instagram_normalization() {
        assert_eq!(normalize_instagram("@deputado.joao"), Some("deputado.joao".to_string()));
        assert_eq!(
            normalize_instagram("https://www.instagram.com/deputado.joao/"),
            Some("deputado.joao".to_string())
        );
        assert_eq!(normalize_instagram("nome com espaço"), None);
        assert_eq!(normalize_instagram(""), None);
    }

    #[test]
    fn x_normalization() {
        assert_eq!(normalize_x("@joao_oficial"), Some("joao_oficial".to_string()));
        assert_eq!(
            normalize_x("https://twitter.com/joao_oficial"),
            Some("joao_oficial".to_string())
        );
        assert_eq!(
            normalize_x("https://x.com/joao_oficial/"),
            Some("joao_oficial".to_string())
        );
        // X handles do not allow dots and cap at 15 chars.
        assert_eq!(normalize_x("nome.com.ponto"), None);
        assert_eq!(normalize_x("um_nome_longo_demais"), None);
    }

    #[test]
    fn update_only_fills_empty_or_invalid() {
        assert!(should_update(None, Some("novo"), normalize_x));
        assert!(should_update(Some(""), Some("novo"), normalize_x));
        // Current value is a URL, not a handle: invalid, so replace.
        assert!(should_update(
            Some("https://twitter.com/"),
            Some("novo"),
            normalize_x
        ));
        assert!(!should_update(Some("valido"), Some("novo"), normalize_x));
        assert!(!should_update(None, None, normalize_x));
    }

    #[test]
    fn mapping_skips_comments_and_bad_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapping.csv");
        std::fs::write(
            &path,
            "# official identity mapping\n\
             politician_id,wikidata_qid,camara_id,senado_id\n\
             1,Q123,204554,\n\
             # disabled for now\n\
             2,,178912,\n\
             not-a-number,Q1,,\n",
        )
        .unwrap();

        let mappings = load_mapping(&path).unwrap();
        assert_eq!(mappings.len(), 2);
        assert_eq!(mappings[&1].wikidata_qid.as_deref(), Some("Q123"));
        assert!(mappings[&2].wikidata_qid.as_deref().map_or(true, str::is_empty));
        assert_eq!(mappings[&1].camara_id.as_deref(), Some("204554"));
    }

    #[test]
    fn missing_mapping_file_is_an_error() {
        assert!(load_mapping(Path::new("/nonexistent/mapping.csv")).is_err());
    }
}
