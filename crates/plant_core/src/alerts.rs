//! Sistema de alertas – estado crítico com histerese por borda.
//!
//! O monitor só emite uma transição quando o estado muda: uma vez ao entrar
//! num episódio crítico ([`Transition::Raised`]) e uma vez ao sair dele
//! ([`Transition::Cleared`]). Leituras repetidas na mesma condição não
//! geram nada.

use crate::config::AlertThresholds;
use crate::types::NormalizedReading;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Estado de alerta da planta.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertState {
    #[default]
    Normal,
    Critical,
}

/// Mudança de estado que dispara uma notificação.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    /// Normal → Critical
    Raised,
    /// Critical → Normal
    Cleared,
}

/// Grandeza que ficou abaixo do seu limiar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CriticalCause {
    SoilMoisture,
    Temperature,
    Light,
}

impl fmt::Display for CriticalCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CriticalCause::SoilMoisture => "umidade do solo",
            CriticalCause::Temperature => "temperatura",
            CriticalCause::Light => "luz",
        })
    }
}

/// `true` se qualquer grandeza estiver estritamente abaixo do seu limiar.
pub fn is_critical(reading: &NormalizedReading, thresholds: &AlertThresholds) -> bool {
    reading.soil_moisture < thresholds.moisture_critical
        || reading.temperature < thresholds.temp_critical
        || reading.light_level < thresholds.light_critical
}

/// Lista as grandezas abaixo do limiar, na mesma ordem de [`is_critical`].
pub fn critical_causes(
    reading: &NormalizedReading,
    thresholds: &AlertThresholds,
) -> Vec<CriticalCause> {
    let mut causes = Vec::new();
    if reading.soil_moisture < thresholds.moisture_critical {
        causes.push(CriticalCause::SoilMoisture);
    }
    if reading.temperature < thresholds.temp_critical {
        causes.push(CriticalCause::Temperature);
    }
    if reading.light_level < thresholds.light_critical {
        causes.push(CriticalCause::Light);
    }
    causes
}

/// Função de transição pura.
pub fn evaluate(
    state: AlertState,
    reading: &NormalizedReading,
    thresholds: &AlertThresholds,
) -> (AlertState, Option<Transition>) {
    match (state, is_critical(reading, thresholds)) {
        (AlertState::Normal, true) => (AlertState::Critical, Some(Transition::Raised)),
        (AlertState::Critical, false) => (AlertState::Normal, Some(Transition::Cleared)),
        (state, _) => (state, None),
    }
}

/// Dono do estado de alerta. Vive dentro do gateway, sem singleton global.
#[derive(Debug, Clone)]
pub struct CriticalMonitor {
    state: AlertState,
    thresholds: AlertThresholds,
}

impl CriticalMonitor {
    /// Começa em [`AlertState::Normal`].
    pub fn new(thresholds: AlertThresholds) -> Self {
        Self::with_state(thresholds, AlertState::Normal)
    }

    /// Começa num estado conhecido, p.ex. restaurado de um snapshot anterior.
    pub fn with_state(thresholds: AlertThresholds, state: AlertState) -> Self {
        Self { state, thresholds }
    }

    pub fn state(&self) -> AlertState {
        self.state
    }

    pub fn thresholds(&self) -> &AlertThresholds {
        &self.thresholds
    }

    /// Aplica [`evaluate`] e guarda o novo estado.
    pub fn observe(&mut self, reading: &NormalizedReading) -> Option<Transition> {
        let (next, transition) = evaluate(self.state, reading, &self.thresholds);
        self.state = next;
        transition
    }
}

/// Texto da notificação enviada ao operador.
pub fn render_alert(
    transition: Transition,
    reading: &NormalizedReading,
    causes: &[CriticalCause],
) -> String {
    let values = format!(
        "Temp: {:.1}°C\nUmidade: {:.1}%\nLuz: {:.1}%",
        reading.temperature, reading.soil_moisture, reading.light_level
    );

    match transition {
        Transition::Raised => {
            let why = if causes.is_empty() {
                String::new()
            } else {
                let names: Vec<String> = causes.iter().map(ToString::to_string).collect();
                format!("\nCrítico: {}", names.join(", "))
            };
            format!("🚨 Alerta Planta!\n{values}{why}\nVerifique sua planta!")
        }
        Transition::Cleared => {
            format!("✅ Planta recuperada\n{values}\nCondições normais novamente.")
        }
    }
}

/// Texto completo da notificação, com as causas calculadas a partir dos
/// limiares quando o alerta é de entrada em estado crítico.
pub fn alert_message(
    transition: Transition,
    reading: &NormalizedReading,
    thresholds: &AlertThresholds,
) -> String {
    let causes = match transition {
        Transition::Raised => critical_causes(reading, thresholds),
        Transition::Cleared => Vec::new(),
    };
    render_alert(transition, reading, &causes)
}
