//! # Plant Gateway
//!
//! Lê leituras JSON do link serial do dispositivo, sincroniza com o
//! armazenamento remoto e envia SMS quando a planta entra ou sai do estado
//! crítico.
//!
//! ## Uso
//! ```bash
//! plant_gateway                          # Serial configurada em config.toml
//! plant_gateway --config /etc/plant.toml
//! plant_gateway --stdin --dry-run < captura.log
//! ```

mod sms;
mod source;
mod upstream;

use plant_core::alerts::CriticalMonitor;
use plant_core::config::AppConfig;
use plant_core::gateway::Gateway;
use plant_core::sink::{AlertSink, LogSink, UpstreamSink};
use sms::SmsAlerts;
use source::Args;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};
use upstream::RestUpstream;

fn main() -> ExitCode {
    // ── Logging ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = match Args::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            error!("{e}");
            eprintln!("Uso: plant_gateway [--config <path>] [--stdin] [--dry-run]");
            return ExitCode::from(2);
        }
    };

    // ── Carregar config ──
    let config_path = args.config.clone().unwrap_or_else(AppConfig::default_path);
    let mut config = AppConfig::load(&config_path);

    // Salva config padrão se não existir
    if !config_path.exists() {
        if let Err(e) = config.save(&config_path) {
            warn!("Não foi possível salvar config padrão: {e}");
        }
    }

    config.apply_env();

    // Em dry-run os destinos não são usados, só o resto é validado
    let mut checked = config.clone();
    if args.dry_run {
        checked.upstream.enabled = false;
        checked.sms.enabled = false;
    }
    let errors = checked.validate();
    if !errors.is_empty() {
        for e in &errors {
            error!("Config inválida: {e}");
        }
        return ExitCode::FAILURE;
    }

    // ── Destinos ──
    let upstream: Box<dyn UpstreamSink> = if args.dry_run || !config.upstream.enabled {
        info!("Upstream desabilitado, leituras só no log");
        Box::new(LogSink::new(config.thresholds))
    } else {
        match RestUpstream::new(&config.upstream) {
            Ok(sink) => Box::new(sink),
            Err(e) => {
                error!("Falha ao criar cliente HTTP do upstream: {e}");
                return ExitCode::FAILURE;
            }
        }
    };

    let alerts: Box<dyn AlertSink> = if args.dry_run || !config.sms.enabled {
        info!("SMS desabilitado, alertas só no log");
        Box::new(LogSink::new(config.thresholds))
    } else {
        match SmsAlerts::new(&config.sms, config.thresholds) {
            Ok(sink) => Box::new(sink),
            Err(e) => {
                error!("Falha ao criar cliente HTTP do SMS: {e}");
                return ExitCode::FAILURE;
            }
        }
    };

    // ── Fonte serial ──
    let mut framer = match source::open_framer(&config.source, args.stdin) {
        Ok(framer) => framer,
        Err(e) => {
            error!("Erro serial ao abrir {}: {e}", config.source.device);
            return ExitCode::FAILURE;
        }
    };

    let source_name = if args.stdin {
        "stdin".to_string()
    } else {
        config.source.device.clone()
    };
    let t = &config.thresholds;

    // ── Banner ──
    println!();
    println!("══════════════════════════════════════════════");
    println!("   🌿 PLANT GATEWAY – ATIVO (Rust)");
    println!("══════════════════════════════════════════════");
    println!("  Fonte:     {source_name}");
    println!(
        "  Limiares:  temp < {:.1}°C | umidade < {:.1}% | luz < {:.1}%",
        t.temp_critical, t.moisture_critical, t.light_critical
    );
    println!(
        "  Upstream:  {}",
        if args.dry_run || !config.upstream.enabled { "log" } else { "REST" }
    );
    println!(
        "  SMS:       {}",
        if args.dry_run || !config.sms.enabled { "log" } else { "ativo" }
    );
    println!("══════════════════════════════════════════════");
    println!();

    // ── Loop principal ──
    let mut gateway = Gateway::new(CriticalMonitor::new(config.thresholds), upstream, alerts);
    let exit = gateway.run(
        &mut framer,
        Duration::from_millis(config.source.idle_backoff_ms),
    );

    let s = exit.stats;
    info!(
        "Encerrado: {} linhas | {} leituras | {} diagnósticos | {} malformadas | \
         {} falhas upstream | {} alertas ({} recuperações) | {} falhas de alerta",
        s.lines,
        s.readings,
        s.diagnostics,
        s.malformed,
        s.upstream_failures,
        s.alerts_raised,
        s.alerts_cleared,
        s.alert_failures
    );

    if args.stdin {
        // Fim do replay é o término esperado
        ExitCode::SUCCESS
    } else {
        error!("{}", exit.error);
        ExitCode::FAILURE
    }
}
