//! Weekly public-records sweep. The court systems sit behind CAPTCHAs, so
//! the sweep prepares consultation stubs (query URL + instructions) for the
//! human-in-the-loop flow and ingests any HTML handed back later.

use anyhow::Result;
use tracing::info;

use mandato_collectors::esaj::{CourtDegree, EsajClient};
use mandato_common::{ConsultationStub, CourtCase, Politician};
use mandato_store::Store;

#[derive(Debug, Default, Clone, Copy)]
pub struct JudicialRunStats {
    pub politicians_processed: u64,
    pub stubs_created: u64,
    pub errors: u64,
}

/// Consultation stubs for every politician with a registered CPF, both court
/// degrees.
pub fn stubs_for(politicians: &[Politician]) -> Vec<ConsultationStub> {
    politicians
        .iter()
        .filter(|p| p.cpf.as_deref().is_some_and(|cpf| !cpf.is_empty()))
        .flat_map(|p| {
            let cpf = p.cpf.as_deref();
            [
                EsajClient::consultation_stub(p.id, &p.name, cpf, CourtDegree::First),
                EsajClient::consultation_stub(p.id, &p.name, cpf, CourtDegree::Second),
            ]
        })
        .collect()
}

/// Run the weekly sweep: generate and persist consultation stubs.
pub async fn run_sweep(store: &Store) -> Result<JudicialRunStats> {
    let mut stats = JudicialRunStats::default();

    let politicians = store.get_active_politicians().await?;
    let with_cpf: Vec<&Politician> = politicians
        .iter()
        .filter(|p| p.cpf.as_deref().is_some_and(|cpf| !cpf.is_empty()))
        .collect();
    stats.politicians_processed = with_cpf.len() as u64;

    let stubs = stubs_for(&politicians);
    if !stubs.is_empty() {
        stats.stubs_created = store.insert_consultation_stubs(&stubs).await?;
    }

    info!(
        politicians = stats.politicians_processed,
        stubs = stats.stubs_created,
        "Judicial sweep finished"
    );
    Ok(stats)
}

/// Ingest human-fetched result HTML for a politician.
pub async fn ingest_result_html(
    store: &Store,
    html: &str,
    politician_id: i64,
) -> Result<Vec<CourtCase>> {
    let cases = EsajClient::parse_result_html(html, Some(politician_id));
    if !cases.is_empty() {
        store.upsert_court_cases(&cases).await?;
    }
    Ok(cases)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn politician(id: i64, cpf: Option<&str>) -> Politician {
        Politician {
            id,
            uuid: format!("uuid-{id}"),
            name: format!("Político {id}"),
            city: None,
            state: Some("SP".to_string()),
            office: None,
            active: true,
            featured: false,
            instagram_handle: None,
            x_handle: None,
            cpf: cpf.map(str::to_string),
        }
    }

    #[test]
    fn stubs_only_for_politicians_with_cpf() {
        let roster = vec![
            politician(1, Some("12345678900")),
            politician(2, None),
            politician(3, Some("")),
        ];
        let stubs = stubs_for(&roster);
        // Two degrees for the single politician with a usable CPF.
        assert_eq!(stubs.len(), 2);
        assert!(stubs.iter().all(|s| s.politician_id == 1));
        assert!(stubs.iter().all(|s| s.court == "TJSP"));
        assert!(stubs[0].url.contains("cpopg"));
        assert!(stubs[1].url.contains("cposg"));
    }

    #[test]
    fn no_cpf_no_stubs() {
        assert!(stubs_for(&[politician(1, None)]).is_empty());
    }
}
