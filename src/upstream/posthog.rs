//! PostHog HogQL query client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{QueryExecutor, UpstreamError, UpstreamResult};
use crate::{
    aggregation::FLOW_EVENT_NAMES,
    config::PostHogConfig,
    models::{DateRange, RawFlowRow, RawUsageRow},
};

/// Upstream error bodies are truncated to this many characters.
const MAX_ERROR_BODY_CHARS: usize = 500;

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Option<Vec<Value>>,
}

/// Client for the PostHog project query endpoint.
#[derive(Clone)]
pub struct PostHogClient {
    http_client: Client,
    base_url: String,
    project_id: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl PostHogClient {
    pub fn new(config: &PostHogConfig) -> UpstreamResult<Self> {
        let timeout = config.timeout();
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(UpstreamError::Request)?;

        let mut base_url = config.host.trim().to_string();
        // Remove trailing slash
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Ok(Self {
            http_client,
            base_url,
            project_id: config.project_id.clone(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            timeout,
        })
    }

    fn query_url(&self) -> String {
        format!("{}/api/projects/{}/query/", self.base_url, self.project_id)
    }

    /// Run a HogQL query and return its raw result rows.
    #[tracing::instrument(
        name = "posthog.query",
        skip(self, hogql),
        fields(project_id = %self.project_id)
    )]
    pub async fn query(&self, hogql: &str) -> UpstreamResult<Vec<Value>> {
        let api_key = self.api_key.as_deref().ok_or(UpstreamError::NotConfigured)?;

        let body = json!({
            "query": {
                "kind": "HogQLQuery",
                "query": hogql,
            }
        });

        let response = self
            .http_client
            .post(self.query_url())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Api {
                status: status.as_u16(),
                message: text.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let parsed: QueryResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                UpstreamError::Timeout(self.timeout)
            } else {
                UpstreamError::InvalidResponse(e.to_string())
            }
        })?;

        Ok(parsed.results.unwrap_or_default())
    }

    fn map_request_error(&self, e: reqwest::Error) -> UpstreamError {
        if e.is_timeout() {
            UpstreamError::Timeout(self.timeout)
        } else {
            UpstreamError::Request(e)
        }
    }
}

#[async_trait]
impl QueryExecutor for PostHogClient {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn usage_rows(&self, range: &DateRange) -> UpstreamResult<Vec<RawUsageRow>> {
        let rows = self.query(&usage_query(range)).await?;
        let total = rows.len();
        let decoded: Vec<_> = rows.iter().filter_map(decode_usage_row).collect();
        if decoded.len() < total {
            tracing::debug!(
                skipped = total - decoded.len(),
                "Skipped malformed usage rows"
            );
        }
        Ok(decoded)
    }

    async fn flow_rows(&self, range: &DateRange) -> UpstreamResult<Vec<RawFlowRow>> {
        let rows = self.query(&flow_query(range)).await?;
        let total = rows.len();
        let decoded: Vec<_> = rows.iter().filter_map(decode_flow_row).collect();
        if decoded.len() < total {
            tracing::debug!(
                skipped = total - decoded.len(),
                "Skipped malformed flow rows"
            );
        }
        Ok(decoded)
    }
}

/// Per-user, per-day event count and distinct active minutes.
fn usage_query(range: &DateRange) -> String {
    format!(
        "SELECT
            person.properties.email AS email,
            toDate(timestamp) AS day,
            count() AS event_count,
            count(DISTINCT toStartOfMinute(timestamp)) AS active_minutes
        FROM events
        WHERE timestamp >= '{start}'
            AND timestamp <= '{end}T23:59:59'
            AND person.properties.email IS NOT NULL
            AND person.properties.email != ''
        GROUP BY email, day
        ORDER BY email, day",
        start = range.start,
        end = range.end,
    )
}

/// Per-user count of each flow event name.
fn flow_query(range: &DateRange) -> String {
    let events = FLOW_EVENT_NAMES
        .iter()
        .map(|name| format!("'{name}'"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "SELECT
            person.properties.email AS email,
            event,
            count() AS cnt
        FROM events
        WHERE timestamp >= '{start}'
            AND timestamp <= '{end}T23:59:59'
            AND event IN ({events})
            AND person.properties.email IS NOT NULL
        GROUP BY email, event",
        start = range.start,
        end = range.end,
    )
}

fn string_cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        _ => String::new(),
    }
}

/// Non-negative integer from a number or numeric string; anything else is 0.
fn count_cell(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// `2025-01-10`, `2025-01-10 00:00:00` and `2025-01-10T00:00:00Z` all map to
/// `2025-01-10`.
fn day_cell(value: &Value) -> Option<String> {
    let s = value.as_str()?.trim();
    let day = s.split([' ', 'T']).next().unwrap_or(s);
    (!day.is_empty()).then(|| day.to_string())
}

fn decode_usage_row(row: &Value) -> Option<RawUsageRow> {
    let cells = row.as_array()?;
    if cells.len() < 4 {
        return None;
    }
    Some(RawUsageRow {
        email: string_cell(&cells[0]),
        day: day_cell(&cells[1])?,
        event_count: count_cell(&cells[2]),
        active_minutes: count_cell(&cells[3]),
    })
}

fn decode_flow_row(row: &Value) -> Option<RawFlowRow> {
    let cells = row.as_array()?;
    if cells.len() < 3 {
        return None;
    }
    Some(RawFlowRow {
        email: string_cell(&cells[0]),
        event_name: string_cell(&cells[1]),
        count: count_cell(&cells[2]),
    })
}
