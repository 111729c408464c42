use std::env;

use thiserror::Error;

use crate::domain::models::FallbackConfig;

const DEFAULT_CORS_ORIGINS: &[&str] =
    &["http://localhost:5173", "http://localhost:3000", "http://localhost:8080"];

#[derive(Debug, Clone)]
pub(crate) struct Settings {
    server: ServerSettings,
    runtime: RuntimeSettings,
    api: ApiSettings,
    cors: CorsSettings,
    fallback: FallbackSettings,
    telemetry: TelemetrySettings,
}

#[derive(Debug, Clone)]
pub(crate) struct ServerSettings {
    host: ServerHost,
    port: ServerPort,
}

#[derive(Debug, Clone)]
pub(crate) struct ApiSettings {
    pub(crate) project_name: String,
    pub(crate) version: String,
    pub(crate) api_v1_str: String,
}

#[derive(Debug, Clone)]
pub(crate) struct CorsSettings {
    pub(crate) origins: Vec<String>,
}

/// Process-wide grace-period policy defaults. Frozen into each session at
/// start time; assignments may carry their own override.
#[derive(Debug, Clone)]
pub(crate) struct FallbackSettings {
    pub(crate) grace_period_minutes: u64,
    pub(crate) max_reconnects: u32,
    pub(crate) auto_approve_grace: bool,
    pub(crate) auto_save_interval_seconds: u64,
    pub(crate) suspicious_threshold: u32,
    pub(crate) offline_mode: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct TelemetrySettings {
    pub(crate) log_level: String,
    pub(crate) json: bool,
    pub(crate) prometheus_enabled: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct RuntimeSettings {
    pub(crate) environment: Environment,
    /// Optional JSON file with the assignments to serve.
    pub(crate) assignments_file: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Environment {
    Development,
    Production,
    Staging,
    Test,
}

impl Environment {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Staging => "staging",
            Environment::Test => "test",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ServerHost(String);

#[derive(Debug, Clone, Copy)]
pub(crate) struct ServerPort(u16);

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("invalid server host: {0}")]
    InvalidHost(String),
    #[error("invalid server port: {0}")]
    InvalidPort(String),
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
    #[error("invalid cors origins: {0}")]
    InvalidCors(String),
}

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("EXAMROOM_HOST", "0.0.0.0");
        let port = env_or_default("EXAMROOM_PORT", "8000");

        let environment =
            parse_environment(env_optional("EXAMROOM_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let assignments_file = env_optional("ASSIGNMENTS_FILE");

        let project_name = env_or_default("PROJECT_NAME", "Examroom API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let grace_period_minutes =
            parse_u64("GRACE_PERIOD_MINUTES", env_or_default("GRACE_PERIOD_MINUTES", "5"))?;
        let max_reconnects = parse_u32("MAX_RECONNECTS", env_or_default("MAX_RECONNECTS", "3"))?;
        let auto_approve_grace = env_optional("AUTO_APPROVE_GRACE")
            .map(|value| parse_bool(&value))
            .unwrap_or(true);
        let auto_save_interval_seconds = parse_u64(
            "AUTO_SAVE_INTERVAL_SECONDS",
            env_or_default("AUTO_SAVE_INTERVAL_SECONDS", "10"),
        )?;
        let suspicious_threshold =
            parse_u32("SUSPICIOUS_THRESHOLD", env_or_default("SUSPICIOUS_THRESHOLD", "5"))?;
        let offline_mode =
            env_optional("OFFLINE_MODE").map(|value| parse_bool(&value)).unwrap_or(false);

        let log_level = env_or_default("EXAMROOM_LOG_LEVEL", "info");
        let json = env_optional("EXAMROOM_LOG_JSON")
            .map(|value| parse_bool(&value))
            .unwrap_or(false);
        let prometheus_enabled = env_optional("PROMETHEUS_ENABLED")
            .map(|value| parse_bool(&value))
            .unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, assignments_file },
            api: ApiSettings { project_name, version, api_v1_str },
            cors: CorsSettings { origins: cors_origins },
            fallback: FallbackSettings {
                grace_period_minutes,
                max_reconnects,
                auto_approve_grace,
                auto_save_interval_seconds,
                suspicious_threshold,
                offline_mode,
            },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;

        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn fallback(&self) -> &FallbackSettings {
        &self.fallback
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.fallback.auto_save_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "AUTO_SAVE_INTERVAL_SECONDS",
                value: String::from("0"),
            });
        }
        if self.fallback.suspicious_threshold == 0 {
            return Err(ConfigError::InvalidValue {
                field: "SUSPICIOUS_THRESHOLD",
                value: String::from("0"),
            });
        }
        Ok(())
    }
}

impl FallbackSettings {
    pub(crate) fn to_config(&self) -> FallbackConfig {
        FallbackConfig {
            grace_period_minutes: self.grace_period_minutes,
            max_reconnects: self.max_reconnects,
            auto_approve_grace: self.auto_approve_grace,
            auto_save_interval_seconds: self.auto_save_interval_seconds,
            suspicious_threshold: self.suspicious_threshold,
            offline_mode: self.offline_mode,
        }
    }
}

impl ServerHost {
    fn parse(value: String) -> Result<Self, ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::InvalidHost(value));
        }
        Ok(Self(value))
    }
}

impl ServerPort {
    fn parse(value: String) -> Result<Self, ConfigError> {
        let parsed: u16 = value.parse().map_err(|_| ConfigError::InvalidPort(value.clone()))?;
        if parsed == 0 {
            return Err(ConfigError::InvalidPort(value));
        }
        Ok(Self(parsed))
    }
}

fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn env_or_default(key: &str, default: &str) -> String {
    env_optional(key).unwrap_or_else(|| default.to_string())
}

fn parse_u32(field: &'static str, value: String) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidValue { field, value })
}

fn parse_u64(field: &'static str, value: String) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidValue { field, value })
}

fn parse_cors_origins(value: Option<String>) -> Result<Vec<String>, ConfigError> {
    let Some(raw) = value else {
        return Ok(DEFAULT_CORS_ORIGINS.iter().map(|item| item.to_string()).collect());
    };

    if raw.trim().is_empty() {
        return Ok(DEFAULT_CORS_ORIGINS.iter().map(|item| item.to_string()).collect());
    }

    if raw.trim_start().starts_with('[') {
        let parsed: Vec<String> =
            serde_json::from_str(&raw).map_err(|_| ConfigError::InvalidCors(raw.clone()))?;
        if parsed.is_empty() {
            return Ok(DEFAULT_CORS_ORIGINS.iter().map(|item| item.to_string()).collect());
        }
        return Ok(parsed);
    }

    let items: Vec<String> = raw
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect();

    if items.is_empty() {
        return Ok(DEFAULT_CORS_ORIGINS.iter().map(|item| item.to_string()).collect());
    }

    Ok(items)
}

fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "yes" | "YES" | "on" | "ON")
}

fn parse_environment(value: Option<String>) -> Environment {
    match value.as_deref().map(|val| val.to_lowercase()) {
        Some(ref val) if val == "production" || val == "prod" => Environment::Production,
        Some(ref val) if val == "staging" => Environment::Staging,
        Some(ref val) if val == "test" || val == "testing" => Environment::Test,
        _ => Environment::Development,
    }
}
