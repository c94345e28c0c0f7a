//! Tipos de leitura de sensores e normalização.
//!
//! O dispositivo envia valores brutos sem garantia de faixa; a normalização
//! satura cada campo na faixa física válida em vez de rejeitar a leitura.

use serde::{Deserialize, Serialize};

// ──────────────────────────────────────────────
// Faixas físicas
// ──────────────────────────────────────────────

/// Temperatura mínima aceita (°C).
pub const TEMP_MIN: f64 = -50.0;
/// Temperatura máxima aceita (°C).
pub const TEMP_MAX: f64 = 100.0;
/// Faixa percentual (umidade do solo, luz).
pub const PERCENT_MIN: f64 = 0.0;
pub const PERCENT_MAX: f64 = 100.0;

// ──────────────────────────────────────────────
// Leituras
// ──────────────────────────────────────────────

/// Leitura bruta, exatamente como decodificada da linha serial.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Reading {
    /// Temperatura ambiente (°C)
    pub temperature: f64,
    /// Umidade do solo (%)
    pub soil_moisture: f64,
    /// Nível de luz (%)
    pub light_level: f64,
}

/// Leitura com todos os campos dentro das faixas físicas.
///
/// Só é construída por [`normalize`], então os invariantes de faixa valem
/// para qualquer instância vinda do pipeline.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct NormalizedReading {
    /// Temperatura em [-50, 100] °C
    pub temperature: f64,
    /// Umidade do solo em [0, 100] %
    pub soil_moisture: f64,
    /// Nível de luz em [0, 100] %
    pub light_level: f64,
}

/// `max(lo, min(x, hi))`.
///
/// Usa `f64::min`/`f64::max`, que ignoram NaN: um NaN satura em `hi`.
pub fn clamp(x: f64, lo: f64, hi: f64) -> f64 {
    lo.max(x.min(hi))
}

/// Satura cada campo da leitura na sua faixa física. Nunca falha.
pub fn normalize(r: &Reading) -> NormalizedReading {
    NormalizedReading {
        temperature: clamp(r.temperature, TEMP_MIN, TEMP_MAX),
        soil_moisture: clamp(r.soil_moisture, PERCENT_MIN, PERCENT_MAX),
        light_level: clamp(r.light_level, PERCENT_MIN, PERCENT_MAX),
    }
}

impl From<Reading> for NormalizedReading {
    fn from(r: Reading) -> Self {
        normalize(&r)
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
