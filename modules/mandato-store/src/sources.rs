use anyhow::Result;
use tracing::info;
use uuid::Uuid;

use mandato_common::{SourceCategory, SourceEntry};

use crate::Store;

impl Store {
    /// Active news sources with their trust weights; feeds the in-memory
    /// registry at startup.
    pub async fn get_active_sources(&self) -> Result<Vec<SourceEntry>> {
        let rows = sqlx::query_as::<_, (Uuid, String, String, String, f64, bool)>(
            "SELECT id, domain, name, category, trust_weight, active \
             FROM source WHERE active = TRUE ORDER BY domain",
        )
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, domain, name, category, trust_weight, active)| SourceEntry {
                id: Some(id.to_string()),
                domain,
                name,
                category: category.parse().unwrap_or(SourceCategory::Regional),
                trust_weight,
                active,
            })
            .collect())
    }

    /// Persist an admin weight update; inserts the domain when unknown so
    /// the registry and store stay in lockstep.
    pub async fn set_source_weight(&self, domain: &str, weight: f64) -> Result<()> {
        let weight = weight.clamp(0.0, 2.0);
        let updated = sqlx::query("UPDATE source SET trust_weight = $2 WHERE domain = $1")
            .bind(domain)
            .bind(weight)
            .execute(self.pool())
            .await?
            .rows_affected();

        if updated == 0 {
            sqlx::query(
                "INSERT INTO source (id, domain, name, category, trust_weight, active) \
                 VALUES ($1, $2, $2, 'local', $3, TRUE)",
            )
            .bind(Uuid::new_v4())
            .bind(domain)
            .bind(weight)
            .execute(self.pool())
            .await?;
        }

        info!(domain, weight, "Source weight updated");
        Ok(())
    }
}
