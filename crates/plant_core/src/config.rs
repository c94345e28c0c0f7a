//! Configuração unificada via TOML.
//!
//! Um único `config.toml` ao lado do executável; segredos podem vir de
//! variáveis de ambiente (ver [`AppConfig::apply_env`]).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Variáveis de ambiente que sobrescrevem campos do arquivo.
pub const ENV_UPSTREAM_URL: &str = "PLANT_GATEWAY_UPSTREAM_URL";
pub const ENV_UPSTREAM_KEY: &str = "PLANT_GATEWAY_UPSTREAM_KEY";
pub const ENV_PLANT_ID: &str = "PLANT_GATEWAY_PLANT_ID";
pub const ENV_SMS_KEY: &str = "PLANT_GATEWAY_SMS_KEY";
pub const ENV_SMS_PHONE: &str = "PLANT_GATEWAY_SMS_PHONE";

/// Fonte de bytes (link serial).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Caminho do dispositivo serial (baud/termios configurados fora do processo)
    pub device: String,
    /// Pausa após um poll sem linha (ms)
    pub idle_backoff_ms: u64,
    /// Tamanho máximo de uma linha parcial antes de ser descartada
    pub max_line_bytes: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            device: "/dev/ttyUSB0".into(),
            idle_backoff_ms: 50,
            max_line_bytes: 4096,
        }
    }
}

/// Limiares críticos. Abaixo de qualquer um deles (estritamente) a planta
/// está em estado crítico.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    pub temp_critical: f64,
    pub moisture_critical: f64,
    pub light_critical: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            temp_critical: 3.0,
            moisture_critical: 15.0,
            light_critical: 5.0,
        }
    }
}

/// Armazenamento remoto (REST, create-or-update por id da planta).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub enabled: bool,
    /// URL base da API REST
    pub url: String,
    pub table: String,
    pub plant_id: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: String::new(),
            table: "plants".into(),
            plant_id: String::new(),
            api_key: String::new(),
            timeout_secs: 10,
        }
    }
}

/// Gateway de SMS para alertas.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmsConfig {
    pub enabled: bool,
    pub url: String,
    pub phone: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "https://textbelt.com/text".into(),
            phone: String::new(),
            api_key: String::new(),
            timeout_secs: 10,
        }
    }
}

/// Configuração raiz do gateway.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub thresholds: AlertThresholds,
    pub upstream: UpstreamConfig,
    pub sms: SmsConfig,
}

impl AppConfig {
    /// Carrega configuração de um arquivo TOML.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match toml::from_str::<AppConfig>(&content) {
                    Ok(config) => {
                        info!("Configuração carregada de {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        warn!("Erro ao parsear {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    warn!("Erro ao ler {}: {}", path.display(), e);
                }
            }
        }

        info!("Usando configuração padrão");
        AppConfig::default()
    }

    /// Salva configuração em arquivo TOML.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content = toml::to_string_pretty(self).map_err(|e| e.to_string())?;
        std::fs::write(path, content).map_err(|e| e.to_string())?;
        info!("Configuração salva em {}", path.display());
        Ok(())
    }

    /// Retorna o caminho padrão do config.toml.
    pub fn default_path() -> PathBuf {
        let exe_dir = std::env::current_exe()
            .map(|p| p.parent().unwrap_or(Path::new(".")).to_path_buf())
            .unwrap_or_else(|_| PathBuf::from("."));
        exe_dir.join("config.toml")
    }

    /// Sobrescreve campos com variáveis de ambiente do processo.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Sobrescreve campos a partir de um lookup arbitrário (testável sem
    /// mexer no ambiente do processo). Valores vazios são ignorados.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_UPSTREAM_URL) {
            self.upstream.url = v;
        }
        if let Some(v) = get(ENV_UPSTREAM_KEY) {
            self.upstream.api_key = v;
        }
        if let Some(v) = get(ENV_PLANT_ID) {
            self.upstream.plant_id = v;
        }
        if let Some(v) = get(ENV_SMS_KEY) {
            self.sms.api_key = v;
        }
        if let Some(v) = get(ENV_SMS_PHONE) {
            self.sms.phone = v;
        }
    }

    /// Valida a configuração e retorna lista de erros.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let t = &self.thresholds;
        for (name, value) in [
            ("temp_critical", t.temp_critical),
            ("moisture_critical", t.moisture_critical),
            ("light_critical", t.light_critical),
        ] {
            if !value.is_finite() {
                errors.push(format!("Limiar {name} inválido: {value}"));
            }
        }

        if self.source.max_line_bytes < 64 {
            errors.push(format!(
                "max_line_bytes muito pequeno: {} (mínimo 64)",
                self.source.max_line_bytes
            ));
        }

        if self.upstream.enabled {
            if self.upstream.url.is_empty() {
                errors.push("upstream.url obrigatório com upstream habilitado".into());
            }
            if self.upstream.plant_id.is_empty() {
                errors.push("upstream.plant_id obrigatório com upstream habilitado".into());
            }
            if self.upstream.api_key.is_empty() {
                errors.push("upstream.api_key obrigatório com upstream habilitado".into());
            }
            check_timeout(&mut errors, "upstream", self.upstream.timeout_secs);
        }

        if self.sms.enabled {
            if self.sms.phone.is_empty() {
                errors.push("sms.phone obrigatório com SMS habilitado".into());
            }
            if self.sms.api_key.is_empty() {
                errors.push("sms.api_key obrigatório com SMS habilitado".into());
            }
            check_timeout(&mut errors, "sms", self.sms.timeout_secs);
        }

        errors
    }
}

fn check_timeout(errors: &mut Vec<String>, section: &str, secs: u64) {
    if !(1..=120).contains(&secs) {
        errors.push(format!("Timeout de {section} inválido: {secs}s (1–120)"));
    }
}
