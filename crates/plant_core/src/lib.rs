//! # Plant Core
//!
//! Crate compartilhada com o pipeline de ingestão e alerta do gateway de
//! sensores da planta: enquadramento de linhas seriais, decodificação JSON,
//! normalização de faixas e máquina de estados crítico/normal.
//!
//! ## Módulos
//! - [`framer`] – Bytes do link serial → linhas de texto
//! - [`protocol`] – Linha → leitura, diagnóstico ou malformado
//! - [`types`] – Leituras e normalização (clamp)
//! - [`alerts`] – Limiares e histerese de alerta
//! - [`sink`] – Traits dos destinos externos (upstream, SMS)
//! - [`gateway`] – Loop que liga tudo
//! - [`config`] – Configuração unificada via TOML

pub mod framer;
pub mod protocol;
pub mod types;
pub mod alerts;
pub mod sink;
pub mod gateway;
pub mod config;

// Re-exports convenientes
pub use alerts::{AlertState, CriticalMonitor, Transition};
pub use config::AppConfig;
pub use framer::{FramerError, LineFramer, ZeroReadPolicy};
pub use gateway::{Gateway, GatewayExit, GatewayStats, LineOutcome};
pub use protocol::{TelemetryEvent, decode};
pub use sink::{AlertSink, LogSink, SinkError, UpstreamSink};
pub use types::{NormalizedReading, Reading, normalize};
