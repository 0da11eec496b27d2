//! Service configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use taskshare_core::ShareToken;
use taskshare_store::DEFAULT_TOKEN_ATTEMPTS;

const DAY: Duration = Duration::from_secs(86_400);

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable could not be parsed.
    #[error("invalid value for {var}: {value:?}")]
    Unparsable { var: &'static str, value: String },

    /// A setting is outside its allowed range.
    #[error("invalid {field}: {reason}")]
    OutOfRange { field: &'static str, reason: String },
}

/// Configuration for the sharing service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareConfig {
    /// Frontend origin that share links point at.
    pub base_url: String,
    /// Lifetime of a link when the owner does not choose one. `None` never
    /// expires.
    pub default_ttl_days: Option<u32>,
    /// Longest lifetime an owner may choose.
    pub max_ttl_days: u32,
    /// Recipients per share request, after deduplication.
    pub max_recipients: usize,
    /// Tokens minted before giving up on a collision streak.
    pub token_attempts: u32,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5173".to_string(),
            default_ttl_days: Some(30),
            max_ttl_days: 365,
            max_recipients: 50,
            token_attempts: DEFAULT_TOKEN_ATTEMPTS,
        }
    }
}

impl ShareConfig {
    /// Defaults overlaid with `TASKSHARE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    /// Overlay settings read through `lookup`, then validate.
    pub fn overlay<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("TASKSHARE_BASE_URL") {
            self.base_url = url;
        }
        if let Some(raw) = lookup("TASKSHARE_DEFAULT_TTL_DAYS") {
            self.default_ttl_days = match raw.trim() {
                "0" | "none" => None,
                other => Some(parse("TASKSHARE_DEFAULT_TTL_DAYS", other)?),
            };
        }
        if let Some(raw) = lookup("TASKSHARE_MAX_TTL_DAYS") {
            self.max_ttl_days = parse("TASKSHARE_MAX_TTL_DAYS", &raw)?;
        }
        if let Some(raw) = lookup("TASKSHARE_MAX_RECIPIENTS") {
            self.max_recipients = parse("TASKSHARE_MAX_RECIPIENTS", &raw)?;
        }
        if let Some(raw) = lookup("TASKSHARE_TOKEN_ATTEMPTS") {
            self.token_attempts = parse("TASKSHARE_TOKEN_ATTEMPTS", &raw)?;
        }

        self.validate()?;
        Ok(self)
    }

    /// Check that every setting is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(out_of_range("base_url", "must not be empty"));
        }
        if self.max_ttl_days == 0 {
            return Err(out_of_range("max_ttl_days", "must be at least 1"));
        }
        if let Some(days) = self.default_ttl_days {
            if days == 0 || days > self.max_ttl_days {
                return Err(out_of_range(
                    "default_ttl_days",
                    format!("must be between 1 and {}", self.max_ttl_days),
                ));
            }
        }
        if self.token_attempts == 0 {
            return Err(out_of_range("token_attempts", "must be at least 1"));
        }
        Ok(())
    }

    /// Public link for `token`: `{base_url}/task/{token}`.
    pub fn access_url(&self, token: &ShareToken) -> String {
        format!("{}/task/{}", self.base_url.trim_end_matches('/'), token.as_str())
    }

    /// Lifetime for `days` days.
    pub fn ttl_for_days(days: u32) -> Duration {
        DAY * days
    }

    /// The default link lifetime.
    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl_days.map(Self::ttl_for_days)
    }
}

fn parse<T: std::str::FromStr>(var: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Unparsable {
        var,
        value: raw.to_string(),
    })
}

fn out_of_range(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::OutOfRange {
        field,
        reason: reason.into(),
    }
}
