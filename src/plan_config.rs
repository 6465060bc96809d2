//! # Plan Bot Configuration Module
//!
//! Configuration structures for the bot: where plans come from, request
//! limits and localization defaults. Values are read from the environment
//! (optionally seeded from a `.env` file).

use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

// Constants for plan source configuration
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 12;
pub const DEFAULT_ID_COLUMN: &str = "user_id";
pub const DEFAULT_PLAN_COLUMN: &str = "plan_json";
pub const DEFAULT_LANGUAGE: &str = "uk";
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4096;

/// Export format of a published spreadsheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    /// Published CSV export
    Csv,
    /// Google Visualization (`gviz/tq`) JSON response
    Gviz,
    /// Array of row objects keyed by column name
    JsonRows,
}

impl FromStr for SheetFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(SheetFormat::Csv),
            "gviz" => Ok(SheetFormat::Gviz),
            "json" | "json_rows" => Ok(SheetFormat::JsonRows),
            other => Err(anyhow!("Unknown sheet format: {other}")),
        }
    }
}

/// Where plans are loaded from
#[derive(Debug, Clone, PartialEq)]
pub enum SourceConfig {
    /// Plan backend answering `act=get|swapMeal|swapDay|swapPlan`
    Api { url: String },
    /// Published spreadsheet with one JSON plan per user row
    Sheet {
        url: String,
        format: SheetFormat,
        /// Column holding the Telegram user id
        id_column: String,
        /// Column holding the JSON-encoded plan
        plan_column: String,
    },
}

/// Complete bot configuration
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Telegram bot API token
    pub bot_token: String,
    /// Plan data source
    pub source: SourceConfig,
    /// Client-side timeout for every outgoing request in seconds
    pub request_timeout_secs: u64,
    /// Language used when a user's Telegram language is unsupported
    pub default_language: String,
    /// PostgreSQL URL for the plan cache, disabled when unset
    pub database_url: Option<String>,
}

impl BotConfig {
    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    ///
    /// # Examples
    ///
    /// ```rust
    /// use mealplan::plan_config::{BotConfig, SourceConfig};
    ///
    /// let config = BotConfig::from_lookup(|key| match key {
    ///     "TELEGRAM_BOT_TOKEN" => Some("123:abc".to_string()),
    ///     "PLAN_API_URL" => Some("https://plans.example/exec".to_string()),
    ///     _ => None,
    /// })?;
    /// assert_eq!(config.request_timeout_secs, 12);
    /// assert!(matches!(config.source, SourceConfig::Api { .. }));
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bot_token = non_empty("TELEGRAM_BOT_TOKEN").context("TELEGRAM_BOT_TOKEN must be set")?;

        let source_kind = non_empty("PLAN_SOURCE").unwrap_or_else(|| "api".to_string());
        let source = match source_kind.to_lowercase().as_str() {
            "api" => SourceConfig::Api {
                url: non_empty("PLAN_API_URL").context("PLAN_API_URL must be set for the api source")?,
            },
            other => SourceConfig::Sheet {
                url: non_empty("PLAN_SHEET_URL")
                    .context("PLAN_SHEET_URL must be set for spreadsheet sources")?,
                format: other.parse()?,
                id_column: non_empty("PLAN_SHEET_ID_COLUMN")
                    .unwrap_or_else(|| DEFAULT_ID_COLUMN.to_string()),
                plan_column: non_empty("PLAN_SHEET_PLAN_COLUMN")
                    .unwrap_or_else(|| DEFAULT_PLAN_COLUMN.to_string()),
            },
        };

        let request_timeout_secs = match non_empty("PLAN_REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("Invalid PLAN_REQUEST_TIMEOUT_SECS: {raw}"))?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };
        if request_timeout_secs == 0 {
            bail!("PLAN_REQUEST_TIMEOUT_SECS must be greater than zero");
        }

        Ok(Self {
            bot_token,
            source,
            request_timeout_secs,
            default_language: non_empty("DEFAULT_LANGUAGE")
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            database_url: non_empty("DATABASE_URL"),
        })
    }

    /// Request timeout as a `Duration`
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
