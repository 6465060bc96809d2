//! Plan source selection: the backend API or a published spreadsheet.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::plan_api::{PlanApiClient, SwapAction};
use crate::plan_config::{BotConfig, SourceConfig};
use crate::plan_errors::PlanError;
use crate::plan_model::Plan;
use crate::sheet_source::SheetClient;

/// How to fetch a particular plan again
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanLocator {
    /// Backend plan addressed by id and access token
    Api { plan_id: String, token: String },
    /// Spreadsheet row addressed by user id
    Sheet { user_id: String },
}

impl PlanLocator {
    /// Parse a `/start` deep-link payload of the form `<plan_id>__<token>`
    pub fn from_start_payload(payload: &str) -> Option<Self> {
        let (plan_id, token) = payload.trim().split_once("__")?;
        if plan_id.is_empty() || token.is_empty() {
            return None;
        }
        Some(PlanLocator::Api {
            plan_id: plan_id.to_string(),
            token: token.to_string(),
        })
    }
}

/// Configured plan source
#[derive(Debug, Clone)]
pub enum PlanSource {
    Api(PlanApiClient),
    Sheet(SheetClient),
}

impl PlanSource {
    /// Build the source described by the configuration
    pub fn from_config(config: &BotConfig) -> Result<Self> {
        let timeout = config.request_timeout();
        let source = match &config.source {
            SourceConfig::Api { url } => PlanSource::Api(PlanApiClient::new(url.clone(), timeout)?),
            SourceConfig::Sheet {
                url,
                format,
                id_column,
                plan_column,
            } => PlanSource::Sheet(SheetClient::new(
                url.clone(),
                *format,
                id_column.clone(),
                plan_column.clone(),
                timeout,
            )?),
        };
        Ok(source)
    }

    /// Whether swap actions can be sent to this source
    pub fn supports_swaps(&self) -> bool {
        matches!(self, PlanSource::Api(_))
    }

    /// Load the plan a locator points to
    pub async fn load(&self, locator: &PlanLocator) -> Result<Plan, PlanError> {
        match (self, locator) {
            (PlanSource::Api(client), PlanLocator::Api { plan_id, token }) => {
                client.fetch_plan(plan_id, token).await
            }
            (PlanSource::Sheet(client), PlanLocator::Sheet { user_id }) => {
                client.fetch_plan(user_id).await
            }
            (PlanSource::Api(_), PlanLocator::Sheet { .. }) => Err(PlanError::MissingParams),
            (PlanSource::Sheet(_), PlanLocator::Api { .. }) => {
                Err(PlanError::Unsupported("get".to_string()))
            }
        }
    }

    /// Send a swap action; only the backend supports it
    pub async fn swap(&self, locator: &PlanLocator, action: &SwapAction) -> Result<Plan, PlanError> {
        match (self, locator) {
            (PlanSource::Api(client), PlanLocator::Api { plan_id, token }) => {
                client.swap(plan_id, token, action).await
            }
            _ => Err(PlanError::Unsupported(action.act().to_string())),
        }
    }
}
