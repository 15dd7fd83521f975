use anyhow::Result;
use chrono::Utc;
use uuid::Uuid;

use mandato_common::{ConsultationStub, CourtCase, JobStatus};

use crate::Store;

impl Store {
    /// Open a job-log row and return its id.
    pub async fn log_job_start(&self, kind: &str) -> Result<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO job_log (id, kind, status, started_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(id)
        .bind(kind)
        .bind(JobStatus::Started.to_string())
        .bind(Utc::now())
        .execute(self.pool())
        .await?;
        Ok(id)
    }

    /// Close a job-log row with its outcome.
    pub async fn log_job_end(
        &self,
        id: Uuid,
        status: JobStatus,
        message: &str,
        record_count: i64,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE job_log SET status = $2, message = $3, record_count = $4, \
             finished_at = $5 WHERE id = $1",
        )
        .bind(id)
        .bind(status.to_string())
        .bind(message)
        .bind(record_count)
        .bind(Utc::now())
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn insert_consultation_stubs(&self, stubs: &[ConsultationStub]) -> Result<u64> {
        let mut written = 0u64;
        for stub in stubs {
            let result = sqlx::query(
                "INSERT INTO consultation_stub (id, politician_id, court, url, \
                 instructions, created_at) VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(Uuid::new_v4())
            .bind(stub.politician_id)
            .bind(&stub.court)
            .bind(&stub.url)
            .bind(&stub.instructions)
            .bind(stub.created_at)
            .execute(self.pool())
            .await?;
            written += result.rows_affected();
        }
        Ok(written)
    }

    /// Court cases extracted from human-fetched HTML; duplicates by
    /// (court, case number) refresh in place.
    pub async fn upsert_court_cases(&self, cases: &[CourtCase]) -> Result<u64> {
        let mut written = 0u64;
        for case in cases {
            let result = sqlx::query(
                r#"
                INSERT INTO court_case (id, politician_id, court, case_number,
                    case_class, subject, filed_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (court, case_number) DO UPDATE SET
                    case_class = COALESCE(EXCLUDED.case_class, court_case.case_class),
                    subject = COALESCE(EXCLUDED.subject, court_case.subject),
                    filed_at = COALESCE(EXCLUDED.filed_at, court_case.filed_at)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(case.politician_id)
            .bind(&case.court)
            .bind(&case.case_number)
            .bind(&case.case_class)
            .bind(&case.subject)
            .bind(case.filed_at)
            .execute(self.pool())
            .await?;
            written += result.rows_affected();
        }
        Ok(written)
    }
}
