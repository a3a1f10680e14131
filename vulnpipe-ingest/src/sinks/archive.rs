//! Warehouse archive client
//!
//! Streams batches into the columnar warehouse's `insertAll`-style
//! REST endpoint. One row per finding, keyed by
//! `(technical_id, scan_date, finding_id)`, with the full enriched
//! record carried as an opaque JSON blob. The warehouse is a ledger:
//! no dedup, no update, duplicates on retry are acceptable.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use vulnpipe_common::{EnrichedFinding, Error, Result};

const USER_AGENT: &str = concat!("vulnpipe/", env!("CARGO_PKG_VERSION"));

/// One archive row in the wire shape the warehouse expects
#[derive(Debug, Serialize)]
struct ArchiveRow {
    technical_id: String,
    scan_date: String,
    finding_id: String,
    /// Full enriched record, serialized as an opaque blob
    payload: String,
    ingestion_time: String,
}

#[derive(Debug, Serialize)]
struct InsertRequest {
    rows: Vec<InsertRowWrapper>,
}

#[derive(Debug, Serialize)]
struct InsertRowWrapper {
    json: ArchiveRow,
}

#[derive(Debug, Deserialize)]
struct InsertResponse {
    /// Per-row errors; empty or absent means every row landed
    #[serde(rename = "insertErrors", default)]
    insert_errors: Vec<InsertError>,
}

#[derive(Debug, Deserialize)]
struct InsertError {
    index: usize,
    #[serde(default)]
    errors: Vec<InsertErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct InsertErrorDetail {
    #[serde(default)]
    reason: String,
    #[serde(default)]
    message: String,
}

/// REST client for the warehouse streaming-insert API
#[derive(Debug)]
pub struct WarehouseArchive {
    http_client: reqwest::Client,
    insert_url: String,
    table_url: String,
    auth_token: String,
}

impl WarehouseArchive {
    /// `table_id` is the fully qualified `project.dataset.table`
    pub fn new(
        endpoint: &str,
        table_id: &str,
        auth_token: String,
        timeout: Duration,
    ) -> Result<Self> {
        let mut parts = table_id.splitn(3, '.');
        let (project, dataset, table) = match (parts.next(), parts.next(), parts.next()) {
            (Some(p), Some(d), Some(t)) if !p.is_empty() && !d.is_empty() && !t.is_empty() => {
                (p, d, t)
            }
            _ => {
                return Err(Error::Config(format!(
                    "archive table id must be project.dataset.table, got {:?}",
                    table_id
                )))
            }
        };

        let table_url = format!(
            "{}/projects/{}/datasets/{}/tables/{}",
            endpoint.trim_end_matches('/'),
            project,
            dataset,
            table
        );
        let insert_url = format!("{}/insertAll", table_url);

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            insert_url,
            table_url,
            auth_token,
        })
    }

    fn rows_for(batch: &[EnrichedFinding]) -> Result<Vec<InsertRowWrapper>> {
        let ingestion_time = Utc::now().to_rfc3339();
        batch
            .iter()
            .map(|finding| {
                let payload = serde_json::to_string(finding)
                    .map_err(|e| Error::ArchiveWrite(format!("payload serialization: {}", e)))?;
                Ok(InsertRowWrapper {
                    json: ArchiveRow {
                        technical_id: finding.raw.technical_id.clone(),
                        scan_date: finding.raw.scan_date.to_rfc3339(),
                        finding_id: finding.raw.finding_id.clone(),
                        payload,
                        ingestion_time: ingestion_time.clone(),
                    },
                })
            })
            .collect()
    }
}

#[async_trait]
impl super::ArchiveSink for WarehouseArchive {
    async fn append(&self, batch: &[EnrichedFinding]) -> Result<usize> {
        let request = InsertRequest {
            rows: Self::rows_for(batch)?,
        };

        let response = self
            .http_client
            .post(&self.insert_url)
            .bearer_auth(&self.auth_token)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let body: InsertResponse = response.json().await?;
        if !body.insert_errors.is_empty() {
            let first = &body.insert_errors[0];
            let detail = first
                .errors
                .first()
                .map(|e| format!("{}: {}", e.reason, e.message))
                .unwrap_or_else(|| "unknown".to_string());
            return Err(Error::ArchiveWrite(format!(
                "{} of {} rows rejected (row {}: {})",
                body.insert_errors.len(),
                batch.len(),
                first.index,
                detail
            )));
        }

        Ok(batch.len())
    }

    async fn check(&self) -> Result<()> {
        self.http_client
            .get(&self.table_url)
            .bearer_auth(&self.auth_token)
            .send()
            .await
            .map_err(|e| Error::SinkConnection(format!("archive sink unreachable: {}", e)))?
            .error_for_status()
            .map_err(|e| Error::SinkConnection(format!("archive table probe failed: {}", e)))?;
        Ok(())
    }
}
