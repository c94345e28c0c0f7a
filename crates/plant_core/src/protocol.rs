//! Protocolo da linha serial.
//!
//! O dispositivo mistura, no mesmo link, logs em texto livre e envelopes
//! JSON de uma linha:
//!
//! ```text
//! Sensor init OK
//! {"type":"sendData","temperature":21.5,"soilMoisture":43,"lightLevel":78}
//! ```
//!
//! - Linha que não começa com `{` → texto de diagnóstico do dispositivo
//! - Objeto JSON com `type == "sendData"` → leitura
//! - Objeto JSON de outro tipo → diagnóstico (ruído benigno)
//! - Começa com `{` mas não é um objeto JSON → malformado (link ruidoso)

use crate::types::Reading;
use serde_json::{Map, Value};

/// Valor de `type` que identifica um envelope de leitura.
pub const SEND_DATA_TYPE: &str = "sendData";

/// Resultado da decodificação de uma linha.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryEvent {
    /// Envelope `sendData` com os três campos numéricos.
    Reading(Reading),
    /// Texto que não é telemetria; só interessa ao operador.
    Diagnostic { text: String },
    /// Começa com `{` mas não é um objeto JSON válido.
    Malformed { line: String, error: String },
}

/// Decodifica uma linha já aparada. Função total: nunca falha nem entra em pânico.
pub fn decode(line: &str) -> TelemetryEvent {
    if !line.starts_with('{') {
        return TelemetryEvent::Diagnostic { text: line.into() };
    }

    let object = match serde_json::from_str::<Value>(line) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            return TelemetryEvent::Malformed {
                line: line.into(),
                error: format!("esperado objeto JSON, recebido {}", json_kind(&other)),
            };
        }
        Err(e) => {
            return TelemetryEvent::Malformed {
                line: line.into(),
                error: e.to_string(),
            };
        }
    };

    if object.get("type").and_then(Value::as_str) != Some(SEND_DATA_TYPE) {
        return TelemetryEvent::Diagnostic { text: line.into() };
    }

    TelemetryEvent::Reading(Reading {
        temperature: number_or_zero(&object, "temperature"),
        soil_moisture: number_or_zero(&object, "soilMoisture"),
        light_level: number_or_zero(&object, "lightLevel"),
    })
}

/// Campo ausente ou não numérico vale 0.
fn number_or_zero(object: &Map<String, Value>, key: &str) -> f64 {
    object.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "booleano",
        Value::Number(_) => "número",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "objeto",
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
