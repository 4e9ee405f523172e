//! InfluxDB v2 write client.
//!
//! Renders a [`MetricsEntry`] to line protocol and posts it to the
//! `/api/v2/write` endpoint. Rendering is kept separate from transport so it
//! can be tested (and printed in dry-run mode) without a server.

use tracing::{debug, info, warn};

use crate::errors::MetricsError;
use crate::metrics::MetricsEntry;

/// Asynchronous InfluxDB v2 write API client.
#[derive(Clone)]
pub struct InfluxClient {
    http: reqwest::Client,
    base_url: String,
    org: String,
    bucket: String,
    token: String,
}

impl InfluxClient {
    /// Create a client targeting the given InfluxDB instance.
    pub fn new(
        base_url: impl Into<String>,
        org: impl Into<String>,
        bucket: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        info!(url = %base_url, "initializing influxdb client");
        Self {
            http: reqwest::Client::new(),
            base_url,
            org: org.into(),
            bucket: bucket.into(),
            token: token.into(),
        }
    }

    /// Write one metrics entry with second precision.
    pub async fn write_entry(&self, entry: &MetricsEntry) -> Result<(), MetricsError> {
        let body = to_line_protocol(entry);
        debug!(measurement = %entry.measurement, len = body.len(), "writing metrics entry");

        let url = format!("{}/api/v2/write", self.base_url);
        let resp = self
            .http
            .post(&url)
            .query(&[
                ("org", self.org.as_str()),
                ("bucket", self.bucket.as_str()),
                ("precision", "s"),
            ])
            .header("Authorization", format!("Token {}", self.token))
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await
            .map_err(MetricsError::HttpError)?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            warn!(status, body = %body, "influxdb write rejected");
            return Err(MetricsError::ApiError { status, body });
        }

        info!(measurement = %entry.measurement, "metrics entry written");
        Ok(())
    }
}

/// Render an entry as a single line-protocol record with a seconds
/// timestamp: `measurement,tag=v field=1i,other=2i 1700000000`.
pub fn to_line_protocol(entry: &MetricsEntry) -> String {
    let mut line = escape_measurement(&entry.measurement);

    for (key, value) in &entry.tags {
        line.push(',');
        line.push_str(&escape_key(key));
        line.push('=');
        line.push_str(&escape_key(value));
    }

    line.push(' ');
    let fields: Vec<String> = entry
        .fields
        .iter()
        .map(|(key, value)| format!("{}={}i", escape_key(key), value))
        .collect();
    line.push_str(&fields.join(","));

    line.push(' ');
    line.push_str(&entry.timestamp.to_string());
    line
}

/// Escape commas and spaces in a measurement name.
fn escape_measurement(s: &str) -> String {
    s.replace(',', "\\,").replace(' ', "\\ ")
}

/// Escape commas, equals signs, and spaces in tag keys/values and field keys.
fn escape_key(s: &str) -> String {
    s.replace(',', "\\,").replace('=', "\\=").replace(' ', "\\ ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn entry() -> MetricsEntry {
        let mut tags = BTreeMap::new();
        tags.insert("mode".to_string(), "measurement".to_string());
        let mut fields = BTreeMap::new();
        fields.insert("Commits upstream only".to_string(), 7);
        fields.insert("total".to_string(), 42);
        MetricsEntry {
            measurement: "zephyr".to_string(),
            tags,
            timestamp: 1_700_000_000,
            fields,
        }
    }

    #[test]
    fn test_line_protocol_rendering() {
        let line = to_line_protocol(&entry());
        assert_eq!(
            line,
            "zephyr,mode=measurement Commits\\ upstream\\ only=7i,total=42i 1700000000"
        );
    }

    #[test]
    fn test_escaping() {
        assert_eq!(escape_measurement("a b,c"), "a\\ b\\,c");
        assert_eq!(escape_key("a=b c"), "a\\=b\\ c");
    }

    #[test]
    fn test_client_construction_trims_trailing_slash() {
        let client = InfluxClient::new("https://influx.example.com/", "org", "bucket", "t0k3n");
        assert_eq!(client.base_url, "https://influx.example.com");
        assert_eq!(client.bucket, "bucket");
    }
}
