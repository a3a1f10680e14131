//! Live-state sink (Postgres-wire transactional store)
//!
//! Holds one row per `(stable_identity, cve_id)` with the current
//! status of that pair. The upsert applies the status monotonicity
//! rule in SQL: a `Fixed` row that reappears in a scan is reopened,
//! an `Open` row stays `Open`, and this path never sets `Fixed`
//! itself. Each batch commits as one transaction — a failure rolls
//! the whole batch back.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::info;
use vulnpipe_common::{EnrichedFinding, Error, Result};

/// Insert-or-update with the conditional status column. First sighting
/// inserts as Open with first_seen = last_seen = now; every
/// reappearance refreshes last_seen and technical_id unconditionally
/// and advances Fixed back to Open only.
const UPSERT_SQL: &str = r#"
    INSERT INTO active_vulnerabilities
        (stable_identity, technical_id, team_owner, region, cve_id,
         cvss_score, severity, status, first_seen, last_seen, finding_summary)
    VALUES ($1, $2, $3, $4, $5, $6, $7, 'Open', NOW(), NOW(), $8)
    ON CONFLICT (stable_identity, cve_id)
    DO UPDATE SET
        last_seen = NOW(),
        technical_id = EXCLUDED.technical_id,
        status = CASE
            WHEN active_vulnerabilities.status = 'Fixed' THEN 'Open'
            ELSE active_vulnerabilities.status
        END
"#;

const CREATE_TABLE_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS active_vulnerabilities (
        stable_identity  TEXT NOT NULL,
        technical_id     TEXT NOT NULL,
        team_owner       TEXT NOT NULL,
        region           TEXT NOT NULL,
        cve_id           TEXT NOT NULL,
        cvss_score       DOUBLE PRECISION NOT NULL,
        severity         TEXT NOT NULL,
        status           TEXT NOT NULL DEFAULT 'Open',
        first_seen       TIMESTAMPTZ NOT NULL,
        last_seen        TIMESTAMPTZ NOT NULL,
        finding_summary  TEXT,
        PRIMARY KEY (stable_identity, cve_id)
    )
"#;

/// State sink backed by a Postgres-compatible store
///
/// Upserts are always invoked from the single control task, so the
/// pool exists for connection reuse, not concurrency.
pub struct PostgresState {
    pool: PgPool,
}

impl PostgresState {
    pub async fn connect(database_url: &str, timeout: Duration) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(timeout)
            .connect(database_url)
            .await
            .map_err(|e| Error::SinkConnection(format!("state sink unreachable: {}", e)))?;
        Ok(Self { pool })
    }

    /// Create the live-state table if missing (idempotent)
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(CREATE_TABLE_SQL).execute(&self.pool).await?;
        info!("State sink schema verified (active_vulnerabilities)");
        Ok(())
    }

    /// Status → row count read-back, reported in the final summary
    pub async fn status_counts(&self) -> Result<Vec<(String, i64)>> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT status, COUNT(*) FROM active_vulnerabilities GROUP BY status ORDER BY status",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[async_trait]
impl super::StateSink for PostgresState {
    async fn upsert(&self, batch: &[EnrichedFinding]) -> Result<usize> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::StateWrite(format!("begin: {}", e)))?;

        for finding in batch {
            sqlx::query(UPSERT_SQL)
                .bind(&finding.stable_identity)
                .bind(&finding.raw.technical_id)
                .bind(&finding.owner)
                .bind(&finding.region)
                .bind(&finding.raw.finding_id)
                .bind(finding.raw.score)
                .bind(finding.raw.severity.as_str())
                .bind(&finding.raw.summary)
                .execute(&mut *tx)
                .await
                .map_err(|e| Error::StateWrite(format!("upsert: {}", e)))?;
            // Dropping the transaction on the error path rolls back
            // everything already applied from this batch.
        }

        tx.commit()
            .await
            .map_err(|e| Error::StateWrite(format!("commit: {}", e)))?;
        Ok(batch.len())
    }

    async fn check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| Error::SinkConnection(format!("state sink probe failed: {}", e)))?;
        Ok(())
    }
}
