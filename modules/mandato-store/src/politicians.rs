use anyhow::Result;

use mandato_common::Politician;

use crate::{Store, SCAN_PAGE};

type PoliticianRow = (
    i64,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    bool,
    bool,
    Option<String>,
    Option<String>,
    Option<String>,
);

const POLITICIAN_COLUMNS: &str =
    "id, uuid, name, city, state, office, active, featured, instagram_handle, x_handle, cpf";

impl Store {
    /// All active politicians, paginated behind the scenes.
    pub async fn get_active_politicians(&self) -> Result<Vec<Politician>> {
        self.scan_politicians("active = TRUE").await
    }

    /// The featured subset used by the social-post and mention jobs.
    pub async fn get_featured_politicians(&self) -> Result<Vec<Politician>> {
        self.scan_politicians("active = TRUE AND featured = TRUE").await
    }

    async fn scan_politicians(&self, filter: &str) -> Result<Vec<Politician>> {
        let mut all = Vec::new();
        let mut offset = 0i64;
        loop {
            let query = format!(
                "SELECT {POLITICIAN_COLUMNS} FROM politician WHERE {filter} \
                 ORDER BY id LIMIT $1 OFFSET $2"
            );
            let rows = sqlx::query_as::<_, PoliticianRow>(&query)
                .bind(SCAN_PAGE)
                .bind(offset)
                .fetch_all(self.pool())
                .await?;

            let page_len = rows.len() as i64;
            all.extend(rows.into_iter().map(row_to_politician));
            if page_len < SCAN_PAGE {
                break;
            }
            offset += SCAN_PAGE;
        }
        Ok(all)
    }

    /// Fill social handles discovered by the enrichment flow. Only the
    /// provided handles change; `None` leaves the column untouched.
    pub async fn update_politician_socials(
        &self,
        politician_id: i64,
        instagram_handle: Option<&str>,
        x_handle: Option<&str>,
    ) -> Result<bool> {
        let updated = sqlx::query(
            "UPDATE politician SET \
             instagram_handle = COALESCE($2, instagram_handle), \
             x_handle = COALESCE($3, x_handle) \
             WHERE id = $1",
        )
        .bind(politician_id)
        .bind(instagram_handle)
        .bind(x_handle)
        .execute(self.pool())
        .await?
        .rows_affected();
        Ok(updated > 0)
    }

    /// Competitors of a politician via the join table.
    pub async fn get_competitors(&self, politician_id: i64) -> Result<Vec<Politician>> {
        let query = format!(
            "SELECT {} FROM politician p \
             JOIN competitor_link c ON c.competitor_id = p.id \
             WHERE c.politician_id = $1 AND p.active = TRUE \
             ORDER BY p.id",
            POLITICIAN_COLUMNS
                .split(", ")
                .map(|col| format!("p.{col}"))
                .collect::<Vec<_>>()
                .join(", ")
        );
        let rows = sqlx::query_as::<_, PoliticianRow>(&query)
            .bind(politician_id)
            .fetch_all(self.pool())
            .await?;
        Ok(rows.into_iter().map(row_to_politician).collect())
    }
}

fn row_to_politician(r: PoliticianRow) -> Politician {
    Politician {
        id: r.0,
        uuid: r.1,
        name: r.2,
        city: r.3,
        state: r.4,
        office: r.5,
        active: r.6,
        featured: r.7,
        instagram_handle: r.8,
        x_handle: r.9,
        cpf: r.10,
    }
}
