//! HTTP client for the AeroGuard ingestion API.

use aeroguard_core::{FeedbackSignal, RiskLevel, TelemetryRecord, Zone};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;

/// Reply to `POST /data`.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestReply {
    pub vehicle_id: String,
    pub zone: Zone,
    pub risk: u8,
    pub level: RiskLevel,
    pub feedback: FeedbackSignal,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorReply {
    #[serde(default)]
    message: String,
}

pub struct RiskClient {
    base_url: String,
    client: reqwest::Client,
}

impl RiskClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Post one telemetry record and return the verdict the service computed.
    pub async fn send_record(&self, record: &TelemetryRecord) -> Result<IngestReply> {
        let url = format!("{}/data", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(record)
            .send()
            .await
            .with_context(|| format!("POST {}", url))?;

        let status = resp.status();
        if !status.is_success() {
            let reason = resp
                .json::<ErrorReply>()
                .await
                .map(|e| e.message)
                .unwrap_or_default();
            bail!("Ingest rejected ({}): {}", status, reason);
        }

        resp.json::<IngestReply>()
            .await
            .context("Failed to parse ingest reply")
    }

    /// Fetch the dashboard view of the default vehicle.
    pub async fn current(&self) -> Result<Value> {
        let url = format!("{}/api/current", self.base_url);
        let resp = self.client.get(&url).send().await?.error_for_status()?;
        Ok(resp.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ingest_reply() {
        let reply: IngestReply = serde_json::from_str(
            r#"{"status":"success","vehicle_id":"UAV-1","zone":"YELLOW","risk":30,
                "level":"SAFE","feedback":"SAFE","message":"SAFE: Near Restricted Zone"}"#,
        )
        .unwrap();
        assert_eq!(reply.zone, Zone::Yellow);
        assert_eq!(reply.risk, 30);
        assert_eq!(reply.feedback, FeedbackSignal::Safe);
    }

    #[test]
    fn trims_trailing_slash() {
        let client = RiskClient::new("http://localhost:5000/");
        assert_eq!(client.base_url, "http://localhost:5000");
    }
}
