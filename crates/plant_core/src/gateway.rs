//! Loop do gateway: linha → decodificação → normalização → upstream/alerta.
//!
//! Tudo acontece numa única thread; cada linha é processada por completo
//! (incluindo as chamadas externas) antes da próxima ser lida.

use crate::alerts::{AlertState, CriticalMonitor, Transition};
use crate::framer::{FramerError, LineFramer};
use crate::protocol::{TelemetryEvent, decode};
use crate::sink::{AlertSink, UpstreamSink};
use crate::types::{NormalizedReading, normalize};
use std::io::Read;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// O que aconteceu com uma linha.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    Diagnostic,
    Malformed,
    Reading {
        reading: NormalizedReading,
        upstream_ok: bool,
        transition: Option<Transition>,
        alert_ok: Option<bool>,
    },
}

/// Contadores acumulados desde o início do processo.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GatewayStats {
    pub lines: u64,
    pub diagnostics: u64,
    pub malformed: u64,
    pub readings: u64,
    pub upstream_failures: u64,
    pub alerts_raised: u64,
    pub alerts_cleared: u64,
    pub alert_failures: u64,
}

/// Motivo do fim do loop.
#[derive(Debug)]
pub struct GatewayExit {
    pub stats: GatewayStats,
    pub error: FramerError,
}

/// Dono do estado de alerta e dos destinos externos.
pub struct Gateway<U, A> {
    monitor: CriticalMonitor,
    upstream: U,
    alert: A,
    stats: GatewayStats,
}

impl<U: UpstreamSink, A: AlertSink> Gateway<U, A> {
    pub fn new(monitor: CriticalMonitor, upstream: U, alert: A) -> Self {
        Self {
            monitor,
            upstream,
            alert,
            stats: GatewayStats::default(),
        }
    }

    pub fn state(&self) -> AlertState {
        self.monitor.state()
    }

    pub fn stats(&self) -> GatewayStats {
        self.stats
    }

    pub fn upstream(&self) -> &U {
        &self.upstream
    }

    pub fn alert_sink(&self) -> &A {
        &self.alert
    }

    /// Processa uma linha já enquadrada. Nunca falha: erros de destino são
    /// registrados e contados.
    pub fn process_line(&mut self, line: &str) -> LineOutcome {
        self.stats.lines += 1;

        let raw = match decode(line) {
            TelemetryEvent::Diagnostic { text } => {
                self.stats.diagnostics += 1;
                info!(target: "device", "{text}");
                return LineOutcome::Diagnostic;
            }
            TelemetryEvent::Malformed { line, error } => {
                self.stats.malformed += 1;
                warn!("Dados corrompidos, JSON inválido ({error}): {line}");
                return LineOutcome::Malformed;
            }
            TelemetryEvent::Reading(raw) => raw,
        };

        self.stats.readings += 1;
        let reading = normalize(&raw);
        debug!("Leitura bruta {raw:?} → {reading:?}");

        let upstream_ok = match self.upstream.send(&reading) {
            Ok(()) => {
                info!(
                    "→ upstream | Temp {:.1}°C | Umidade {:.1}% | Luz {:.1}%",
                    reading.temperature, reading.soil_moisture, reading.light_level
                );
                true
            }
            Err(e) => {
                self.stats.upstream_failures += 1;
                error!("Falha ao enviar leitura upstream: {e}");
                false
            }
        };

        let transition = self.monitor.observe(&reading);
        let alert_ok = transition.map(|kind| {
            match kind {
                Transition::Raised => {
                    self.stats.alerts_raised += 1;
                    warn!("Estado CRÍTICO: {reading:?}");
                }
                Transition::Cleared => {
                    self.stats.alerts_cleared += 1;
                    info!("Estado normal restabelecido: {reading:?}");
                }
            }
            match self.alert.notify(kind, &reading) {
                Ok(()) => true,
                Err(e) => {
                    self.stats.alert_failures += 1;
                    error!("Falha ao enviar alerta {kind:?}: {e}");
                    false
                }
            }
        });

        LineOutcome::Reading {
            reading,
            upstream_ok,
            transition,
            alert_ok,
        }
    }

    /// Roda até a fonte de bytes cair de vez.
    pub fn run<R: Read>(
        &mut self,
        framer: &mut LineFramer<R>,
        idle_backoff: Duration,
    ) -> GatewayExit {
        loop {
            match framer.next_line() {
                Ok(Some(line)) => {
                    self.process_line(&line);
                }
                Ok(None) => {
                    if !idle_backoff.is_zero() {
                        std::thread::sleep(idle_backoff);
                    }
                }
                Err(error) => {
                    error!("Fonte serial encerrada: {error}");
                    return GatewayExit {
                        stats: self.stats,
                        error,
                    };
                }
            }
        }
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AlertThresholds;
    use crate::framer::ZeroReadPolicy;
    use crate::sink::SinkError;
    use std::collections::VecDeque;
    use std::io::{self, ErrorKind};

    #[derive(Default)]
    struct RecordingUpstream {
        sent: Vec<NormalizedReading>,
        fail: bool,
    }

    impl UpstreamSink for RecordingUpstream {
        fn send(&mut self, reading: &NormalizedReading) -> Result<(), SinkError> {
            self.sent.push(*reading);
            if self.fail {
                Err(SinkError::Transport("connection refused".into()))
            } else {
                Ok(())
            }
        }
    }

    #[derive(Default)]
    struct RecordingAlerts {
        sent: Vec<(Transition, NormalizedReading)>,
        fail: bool,
    }

    impl AlertSink for RecordingAlerts {
        fn notify(&mut self, kind: Transition, reading: &NormalizedReading) -> Result<(), SinkError> {
            self.sent.push((kind, *reading));
            if self.fail {
                Err(SinkError::Rejected {
                    status: 402,
                    body: "quota".into(),
                })
            } else {
                Ok(())
            }
        }
    }

    type TestGateway = Gateway<RecordingUpstream, RecordingAlerts>;

    fn gateway() -> TestGateway {
        Gateway::new(
            CriticalMonitor::new(AlertThresholds::default()),
            RecordingUpstream::default(),
            RecordingAlerts::default(),
        )
    }

    const A: &str = r#"{"type":"sendData","temperature":20,"soilMoisture":50,"lightLevel":50}"#;
    const B: &str = r#"{"type":"sendData","temperature":1,"soilMoisture":50,"lightLevel":50}"#;
    const C: &str = r#"{"type":"sendData","temperature":1,"soilMoisture":5,"lightLevel":50}"#;

    #[test]
    fn scenario_a_normal_reading() {
        let mut gw = gateway();
        let outcome = gw.process_line(A);
        let expected = NormalizedReading {
            temperature: 20.0,
            soil_moisture: 50.0,
            light_level: 50.0,
        };
        assert_eq!(
            outcome,
            LineOutcome::Reading {
                reading: expected,
                upstream_ok: true,
                transition: None,
                alert_ok: None,
            }
        );
        assert_eq!(gw.upstream().sent, vec![expected]);
        assert!(gw.alert_sink().sent.is_empty());
        assert_eq!(gw.state(), AlertState::Normal);
    }

    #[test]
    fn scenarios_b_c_d_hysteresis() {
        let mut gw = gateway();

        // B: entra em crítico
        gw.process_line(B);
        assert_eq!(gw.state(), AlertState::Critical);
        assert_eq!(gw.alert_sink().sent.len(), 1);
        assert_eq!(gw.alert_sink().sent[0].0, Transition::Raised);

        // C: continua crítico, sem nova notificação
        let outcome = gw.process_line(C);
        assert!(matches!(
            outcome,
            LineOutcome::Reading {
                transition: None,
                ..
            }
        ));
        assert_eq!(gw.state(), AlertState::Critical);
        assert_eq!(gw.alert_sink().sent.len(), 1);

        // D: volta ao normal
        gw.process_line(A);
        assert_eq!(gw.state(), AlertState::Normal);
        assert_eq!(gw.alert_sink().sent.len(), 2);
        assert_eq!(gw.alert_sink().sent[1].0, Transition::Cleared);
        assert_eq!(gw.alert_sink().sent[1].1.temperature, 20.0);

        // Upstream recebe todas as leituras, independente do estado
        assert_eq!(gw.upstream().sent.len(), 3);
    }

    #[test]
    fn scenario_e_plain_text() {
        let mut gw = gateway();
        assert_eq!(gw.process_line("not json at all"), LineOutcome::Diagnostic);
        assert!(gw.upstream().sent.is_empty());
        assert!(gw.alert_sink().sent.is_empty());
    }

    #[test]
    fn scenario_f_unknown_type() {
        let mut gw = gateway();
        assert_eq!(gw.process_line(r#"{"type":"heartbeat"}"#), LineOutcome::Diagnostic);
        assert!(gw.upstream().sent.is_empty());
        assert!(gw.alert_sink().sent.is_empty());
    }

    #[test]
    fn scenario_g_malformed_then_continues() {
        let mut gw = gateway();
        assert_eq!(gw.process_line("{broken"), LineOutcome::Malformed);
        assert_eq!(gw.stats().malformed, 1);
        assert!(matches!(gw.process_line(A), LineOutcome::Reading { .. }));
        assert_eq!(gw.upstream().sent.len(), 1);
    }

    #[test]
    fn upstream_failure_does_not_block_alerting() {
        let mut gw = Gateway::new(
            CriticalMonitor::new(AlertThresholds::default()),
            RecordingUpstream {
                fail: true,
                ..Default::default()
            },
            RecordingAlerts::default(),
        );
        let outcome = gw.process_line(B);
        assert!(matches!(
            outcome,
            LineOutcome::Reading {
                upstream_ok: false,
                transition: Some(Transition::Raised),
                alert_ok: Some(true),
                ..
            }
        ));
        assert_eq!(gw.stats().upstream_failures, 1);
        assert_eq!(gw.state(), AlertState::Critical);
    }

    #[test]
    fn alert_failure_keeps_state_transition() {
        let mut gw = Gateway::new(
            CriticalMonitor::new(AlertThresholds::default()),
            RecordingUpstream::default(),
            RecordingAlerts {
                fail: true,
                ..Default::default()
            },
        );
        gw.process_line(B);
        gw.process_line(B);
        // Sem reenvio: a falha não é retentada na leitura seguinte
        assert_eq!(gw.alert_sink().sent.len(), 1);
        assert_eq!(gw.stats().alert_failures, 1);
        assert_eq!(gw.state(), AlertState::Critical);
    }

    #[test]
    fn out_of_range_values_are_clamped_before_sync() {
        let mut gw = gateway();
        gw.process_line(r#"{"type":"sendData","temperature":150,"soilMoisture":-4,"lightLevel":300}"#);
        let sent = gw.upstream().sent[0];
        assert_eq!(sent.temperature, 100.0);
        assert_eq!(sent.soil_moisture, 0.0);
        assert_eq!(sent.light_level, 100.0);
        // Umidade 0 < 15 → crítico
        assert_eq!(gw.state(), AlertState::Critical);
    }

    #[test]
    fn run_drains_source_until_disconnect() {
        let input = format!("boot ok\n{A}\n{{broken\n{B}\n{C}\n{A}\n");
        let mut framer =
            LineFramer::new(input.as_bytes()).with_zero_read_policy(ZeroReadPolicy::Disconnect);
        let mut gw = gateway();

        let exit = gw.run(&mut framer, Duration::ZERO);

        assert!(matches!(exit.error, FramerError::ConnectionLost(_)));
        assert_eq!(
            exit.stats,
            GatewayStats {
                lines: 6,
                diagnostics: 1,
                malformed: 1,
                readings: 4,
                upstream_failures: 0,
                alerts_raised: 1,
                alerts_cleared: 1,
                alert_failures: 0,
            }
        );
        let kinds: Vec<Transition> = gw.alert_sink().sent.iter().map(|(k, _)| *k).collect();
        assert_eq!(kinds, vec![Transition::Raised, Transition::Cleared]);
    }

    /// Serial roteirizada: cada item é o resultado de um `read`.
    struct ScriptedSerial(VecDeque<io::Result<Vec<u8>>>);

    impl Read for ScriptedSerial {
        fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
            match self.0.pop_front() {
                Some(Ok(bytes)) => {
                    out[..bytes.len()].copy_from_slice(&bytes);
                    Ok(bytes.len())
                }
                Some(Err(e)) => Err(e),
                None => Err(io::Error::new(ErrorKind::BrokenPipe, "script esgotado")),
            }
        }
    }

    #[test]
    fn run_retries_after_timeout_until_device_lost() {
        let serial = ScriptedSerial(
            vec![
                Err(io::Error::new(ErrorKind::TimedOut, "timeout")),
                Ok(Vec::new()),
                Ok(format!("{B}\n").into_bytes()),
                Err(io::Error::new(ErrorKind::WouldBlock, "sem dados")),
                Ok(format!("{A}\n").into_bytes()),
                Err(io::Error::new(ErrorKind::NotConnected, "device unplugged")),
            ]
            .into(),
        );
        let mut framer = LineFramer::new(serial);
        let mut gw = gateway();

        let exit = gw.run(&mut framer, Duration::from_millis(1));

        match exit.error {
            FramerError::ConnectionLost(msg) => assert!(msg.contains("unplugged")),
        }
        assert_eq!(exit.stats.readings, 2);
        assert_eq!(gw.upstream().sent.len(), 2);
        let kinds: Vec<Transition> = gw.alert_sink().sent.iter().map(|(k, _)| *k).collect();
        assert_eq!(kinds, vec![Transition::Raised, Transition::Cleared]);
        assert_eq!(gw.state(), AlertState::Normal);
    }

    #[test]
    fn run_returns_when_device_hangs_up() {
        // Todo `read` devolve 0 bytes, como um tty cujo adaptador foi removido
        let mut framer =
            LineFramer::new(io::empty()).with_zero_read_policy(ZeroReadPolicy::Disconnect);
        let mut gw = gateway();

        let exit = gw.run(&mut framer, Duration::from_millis(1));

        assert!(matches!(exit.error, FramerError::ConnectionLost(_)));
        assert_eq!(exit.stats, GatewayStats::default());
    }
}
