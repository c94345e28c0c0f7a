//! Destino upstream: API REST (PATCH por id da planta).

use plant_core::config::UpstreamConfig;
use plant_core::sink::{SinkError, UpstreamSink};
use plant_core::types::NormalizedReading;
use reqwest::blocking::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Corpo enviado ao armazenamento remoto.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UpstreamPayload {
    pub moisture: f64,
    pub light: f64,
    pub temperature: f64,
}

impl From<&NormalizedReading> for UpstreamPayload {
    fn from(r: &NormalizedReading) -> Self {
        Self {
            moisture: r.soil_moisture,
            light: r.light_level,
            temperature: r.temperature,
        }
    }
}

/// `{url}/rest/v1/{table}?id=eq.{plant_id}`
pub fn patch_url(cfg: &UpstreamConfig) -> String {
    format!(
        "{}/rest/v1/{}?id=eq.{}",
        cfg.url.trim_end_matches('/'),
        cfg.table,
        cfg.plant_id
    )
}

pub struct RestUpstream {
    client: Client,
    url: String,
    api_key: String,
}

impl RestUpstream {
    pub fn new(cfg: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: patch_url(cfg),
            api_key: cfg.api_key.clone(),
        })
    }
}

impl UpstreamSink for RestUpstream {
    fn send(&mut self, reading: &NormalizedReading) -> Result<(), SinkError> {
        let response = self
            .client
            .patch(&self.url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .json(&UpstreamPayload::from(reading))
            .send()
            .map_err(|e| SinkError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response.text().unwrap_or_default();
        debug!("Upstream respondeu {status}: {body}");

        if status.is_success() {
            Ok(())
        } else {
            Err(SinkError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_targets_plant_row() {
        let cfg = UpstreamConfig {
            url: "https://db.example.com/".into(),
            plant_id: "63163886".into(),
            ..Default::default()
        };
        assert_eq!(
            patch_url(&cfg),
            "https://db.example.com/rest/v1/plants?id=eq.63163886"
        );
    }

    #[test]
    fn payload_uses_store_column_names() {
        let reading = NormalizedReading {
            temperature: 21.5,
            soil_moisture: 43.0,
            light_level: 78.0,
        };
        let json = serde_json::to_value(UpstreamPayload::from(&reading)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"moisture": 43.0, "light": 78.0, "temperature": 21.5})
        );
    }
}
