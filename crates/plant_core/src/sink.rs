//! Destinos externos das leituras e dos alertas.
//!
//! O núcleo só conhece estes traits; HTTP, SMS e credenciais ficam nas
//! implementações do binário.

use crate::alerts::{Transition, alert_message};
use crate::config::AlertThresholds;
use crate::types::NormalizedReading;
use tracing::info;

/// Falha de um destino externo. Sempre recuperável para o gateway.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Erro de transporte: {0}")]
    Transport(String),

    #[error("Rejeitado pelo destino (status {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Destino desabilitado")]
    Disabled,
}

/// Armazenamento remoto das leituras normalizadas.
pub trait UpstreamSink {
    fn send(&mut self, reading: &NormalizedReading) -> Result<(), SinkError>;
}

/// Canal de notificação humana (SMS).
pub trait AlertSink {
    fn notify(&mut self, kind: Transition, reading: &NormalizedReading) -> Result<(), SinkError>;
}

impl<T: UpstreamSink + ?Sized> UpstreamSink for Box<T> {
    fn send(&mut self, reading: &NormalizedReading) -> Result<(), SinkError> {
        (**self).send(reading)
    }
}

impl<T: AlertSink + ?Sized> AlertSink for Box<T> {
    fn notify(&mut self, kind: Transition, reading: &NormalizedReading) -> Result<(), SinkError> {
        (**self).notify(kind, reading)
    }
}

/// Destino que só registra no log. Usado em `--dry-run` e quando um destino
/// está desabilitado na configuração.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink {
    thresholds: AlertThresholds,
}

impl LogSink {
    pub fn new(thresholds: AlertThresholds) -> Self {
        Self { thresholds }
    }

    /// Mesmo texto que o canal real enviaria.
    pub fn message(&self, kind: Transition, reading: &NormalizedReading) -> String {
        alert_message(kind, reading, &self.thresholds)
    }
}

impl UpstreamSink for LogSink {
    fn send(&mut self, reading: &NormalizedReading) -> Result<(), SinkError> {
        info!(
            "[dry-run] upstream ← Temp {:.1}°C | Umidade {:.1}% | Luz {:.1}%",
            reading.temperature, reading.soil_moisture, reading.light_level
        );
        Ok(())
    }
}

impl AlertSink for LogSink {
    fn notify(&mut self, kind: Transition, reading: &NormalizedReading) -> Result<(), SinkError> {
        info!("[dry-run] alerta {kind:?}:\n{}", self.message(kind, reading));
        Ok(())
    }
}
