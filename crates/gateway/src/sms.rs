//! Destino de alertas: gateway de SMS estilo Textbelt.
//!
//! POST de formulário com `phone`, `message` e `key`; a resposta JSON traz
//! `success` e, em caso de falha, `error`.

use plant_core::alerts::{Transition, alert_message};
use plant_core::config::{AlertThresholds, SmsConfig};
use plant_core::sink::{AlertSink, SinkError};
use plant_core::types::NormalizedReading;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::info;

/// Resposta do gateway de SMS.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SmsReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default, rename = "quotaRemaining")]
    pub quota_remaining: Option<i64>,
}

/// Interpreta a resposta HTTP do gateway. Fora de 2xx o corpo pode nem ser
/// JSON; o status e o corpo bruto vão no erro.
pub fn parse_reply(status: u16, body: &str) -> Result<Option<i64>, SinkError> {
    if !(200..300).contains(&status) {
        return Err(SinkError::Rejected {
            status,
            body: body.to_string(),
        });
    }
    let reply: SmsReply = serde_json::from_str(body)
        .map_err(|e| SinkError::Transport(format!("resposta inválida: {e}")))?;
    reply.into_result(status)
}

impl SmsReply {
    /// Converte a resposta em resultado; `status` é o HTTP da resposta.
    pub fn into_result(self, status: u16) -> Result<Option<i64>, SinkError> {
        if self.success {
            Ok(self.quota_remaining)
        } else {
            Err(SinkError::Rejected {
                status,
                body: self.error.unwrap_or_else(|| "success=false".into()),
            })
        }
    }
}

pub struct SmsAlerts {
    client: Client,
    url: String,
    phone: String,
    api_key: String,
    thresholds: AlertThresholds,
}

impl SmsAlerts {
    pub fn new(cfg: &SmsConfig, thresholds: AlertThresholds) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: cfg.url.clone(),
            phone: cfg.phone.clone(),
            api_key: cfg.api_key.clone(),
            thresholds,
        })
    }
}

impl AlertSink for SmsAlerts {
    fn notify(&mut self, kind: Transition, reading: &NormalizedReading) -> Result<(), SinkError> {
        let message = alert_message(kind, reading, &self.thresholds);

        let response = self
            .client
            .post(&self.url)
            .form(&[
                ("phone", self.phone.as_str()),
                ("message", message.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .map_err(|e| SinkError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| SinkError::Transport(e.to_string()))?;

        let quota = parse_reply(status, &body)?;
        match quota {
            Some(q) => info!("📩 SMS {kind:?} enviado (quota restante: {q})"),
            None => info!("📩 SMS {kind:?} enviado"),
        }
        Ok(())
    }
}
