use std::str::FromStr;
use std::time::Duration;

use crate::application::orchestrator::EngineConfig;
use crate::application::runner::RunnerConfig;
use crate::domain::error::DomainError;
use crate::domain::values::mode::ConfirmationMode;

/// Runtime settings, read from the environment (`.env` is loaded by `main`).
#[derive(Debug, Clone, PartialEq)]
pub struct BotConfig {
    pub db_path: String,
    pub model_path: String,
    pub max_positions: usize,
    pub confirmation: ConfirmationMode,
    pub veto_threshold: f64,
    pub watch_authenticity: f64,
    pub pending_ttl_hours: i64,
    pub tick_secs: u64,
    pub scan_interval_secs: u64,
    pub cooldown_secs: u64,
    pub oracle_api_key: Option<String>,
    pub oracle_base_url: Option<String>,
    pub oracle_model: Option<String>,
    pub telegram_token: Option<String>,
    pub telegram_chat_id: Option<i64>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            db_path: "./huntbot.db".into(),
            model_path: "./huntbot_model.json".into(),
            max_positions: 5,
            confirmation: ConfirmationMode::Auto,
            veto_threshold: 0.30,
            watch_authenticity: 0.8,
            pending_ttl_hours: 24,
            tick_secs: 10,
            scan_interval_secs: 1800,
            cooldown_secs: 60,
            oracle_api_key: None,
            oracle_base_url: None,
            oracle_model: None,
            telegram_token: None,
            telegram_chat_id: None,
        }
    }
}

fn parse_var<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T, DomainError>
where
    T::Err: std::fmt::Display,
{
    match raw.filter(|v| !v.trim().is_empty()) {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse()
            .map_err(|e| DomainError::Config(format!("{key}={v}: {e}"))),
    }
}

impl BotConfig {
    pub fn from_env() -> Result<Self, DomainError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset or blank keys keep their
    /// defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DomainError> {
        let d = Self::default();
        let text = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config = Self {
            db_path: text("HUNTBOT_DB").unwrap_or(d.db_path),
            model_path: text("HUNTBOT_MODEL").unwrap_or(d.model_path),
            max_positions: parse_var("HUNTBOT_MAX_POSITIONS", lookup("HUNTBOT_MAX_POSITIONS"), d.max_positions)?,
            confirmation: match text("HUNTBOT_MODE") {
                None => d.confirmation,
                Some(v) => v
                    .parse()
                    .map_err(|e: String| DomainError::Config(format!("HUNTBOT_MODE: {e}")))?,
            },
            veto_threshold: parse_var("HUNTBOT_VETO", lookup("HUNTBOT_VETO"), d.veto_threshold)?,
            watch_authenticity: parse_var(
                "HUNTBOT_WATCH_AUTHENTICITY",
                lookup("HUNTBOT_WATCH_AUTHENTICITY"),
                d.watch_authenticity,
            )?,
            pending_ttl_hours: parse_var("HUNTBOT_PENDING_TTL_HOURS", lookup("HUNTBOT_PENDING_TTL_HOURS"), d.pending_ttl_hours)?,
            tick_secs: parse_var("HUNTBOT_TICK_SECS", lookup("HUNTBOT_TICK_SECS"), d.tick_secs)?,
            scan_interval_secs: parse_var(
                "HUNTBOT_SCAN_INTERVAL_SECS",
                lookup("HUNTBOT_SCAN_INTERVAL_SECS"),
                d.scan_interval_secs,
            )?,
            cooldown_secs: parse_var("HUNTBOT_COOLDOWN_SECS", lookup("HUNTBOT_COOLDOWN_SECS"), d.cooldown_secs)?,
            oracle_api_key: text("XAI_API_KEY"),
            oracle_base_url: text("HUNTBOT_ORACLE_URL"),
            oracle_model: text("HUNTBOT_ORACLE_MODEL"),
            telegram_token: text("TELEGRAM_TOKEN"),
            telegram_chat_id: text("TELEGRAM_CHAT_ID")
                .map(|v| parse_var("TELEGRAM_CHAT_ID", Some(v), 0i64))
                .transpose()?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.max_positions == 0 {
            return Err(DomainError::Config("max positions must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.veto_threshold) {
            return Err(DomainError::Config(format!(
                "veto threshold {} outside [0, 1]",
                self.veto_threshold
            )));
        }
        if self.tick_secs == 0 {
            return Err(DomainError::Config("tick must be at least one second".into()));
        }
        Ok(())
    }

    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            max_positions: self.max_positions,
            confirmation: self.confirmation,
            veto_threshold: self.veto_threshold,
            pending_ttl: chrono::Duration::hours(self.pending_ttl_hours),
            watch_authenticity: self.watch_authenticity,
        }
    }

    pub fn runner(&self) -> RunnerConfig {
        RunnerConfig {
            tick: Duration::from_secs(self.tick_secs),
            scan_interval: Duration::from_secs(self.scan_interval_secs),
            cooldown: Duration::from_secs(self.cooldown_secs),
        }
    }
}
