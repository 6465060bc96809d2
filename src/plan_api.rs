//! # Plan API Client Module
//!
//! HTTP client for the plan backend. Every call is a single `GET` with the
//! action in the `act` query parameter, a fixed client-side timeout and no
//! retries. Responses are normalized before they leave this module, so callers
//! only ever see a canonical [`Plan`] or a [`PlanError`].

use reqwest::header::{ACCEPT, CACHE_CONTROL};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::field_lookup::{is_present, is_truthy, value_to_text};
use crate::plan_errors::PlanError;
use crate::plan_model::Plan;
use crate::plan_normalizer::normalize_plan;

/// A regeneration request for part of a plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapAction {
    /// Replace one meal; `day` is 1-based
    Meal { day: usize, meal_type: String },
    /// Replace a whole day; `day` is 1-based
    Day { day: usize },
    /// Regenerate the entire plan
    Plan,
}

impl SwapAction {
    /// Backend action name
    pub fn act(&self) -> &'static str {
        match self {
            SwapAction::Meal { .. } => "swapMeal",
            SwapAction::Day { .. } => "swapDay",
            SwapAction::Plan => "swapPlan",
        }
    }

    fn extra_params(&self) -> Vec<(&'static str, String)> {
        match self {
            SwapAction::Meal { day, meal_type } => {
                vec![("day", day.to_string()), ("meal_type", meal_type.clone())]
            }
            SwapAction::Day { day } => vec![("day", day.to_string())],
            SwapAction::Plan => Vec::new(),
        }
    }
}

/// Client for the plan backend
#[derive(Debug, Clone)]
pub struct PlanApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl PlanApiClient {
    /// Create a client with a fixed request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, PlanError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PlanError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    /// Issue one backend request and decode its JSON body
    async fn call(&self, params: &[(&str, String)]) -> Result<Value, PlanError> {
        let act = params
            .iter()
            .find(|(k, _)| *k == "act")
            .map(|(_, v)| v.as_str())
            .unwrap_or("");
        debug!(act = %act, "Calling plan API");

        let response = self
            .http
            .get(&self.base_url)
            .query(params)
            .header(ACCEPT, "application/json")
            .header(CACHE_CONTROL, "no-store")
            .send()
            .await
            .map_err(|e| {
                warn!(act = %act, error = %e, "Plan API request failed");
                PlanError::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(act = %act, status = status.as_u16(), "Plan API returned error status");
            return Err(PlanError::Http(status.as_u16()));
        }

        let body = response.json::<Value>().await?;
        Ok(body)
    }

    /// Load a plan by id and access token
    pub async fn fetch_plan(&self, plan_id: &str, token: &str) -> Result<Plan, PlanError> {
        if plan_id.trim().is_empty() || token.trim().is_empty() {
            return Err(PlanError::MissingParams);
        }

        let data = self
            .call(&[
                ("act", "get".to_string()),
                ("plan_id", plan_id.to_string()),
                ("token", token.to_string()),
            ])
            .await?;

        let plan = plan_from_get_response(&data)?;
        info!(plan_id = %plan_id, days = plan.days.len(), "Plan loaded from API");
        Ok(plan)
    }

    /// Ask the backend to regenerate part of a plan
    pub async fn swap(
        &self,
        plan_id: &str,
        token: &str,
        action: &SwapAction,
    ) -> Result<Plan, PlanError> {
        if plan_id.trim().is_empty() || token.trim().is_empty() {
            return Err(PlanError::MissingParams);
        }

        let mut params = vec![
            ("act", action.act().to_string()),
            ("plan_id", plan_id.to_string()),
            ("token", token.to_string()),
        ];
        params.extend(action.extra_params());

        let data = self.call(&params).await?;
        let plan = plan_from_swap_response(action, &data)?;
        info!(plan_id = %plan_id, act = action.act(), "Plan updated by swap action");
        Ok(plan)
    }
}

/// Interpret a `get` response
///
/// A non-empty `error` field wins; otherwise the `plan` field (or the whole
/// body) is normalized and must contain at least one day.
pub fn plan_from_get_response(data: &Value) -> Result<Plan, PlanError> {
    if let Some(error) = data.get("error").filter(|e| is_truthy(e)) {
        return Err(PlanError::Api(value_to_text(error)));
    }

    let payload = data.get("plan").filter(|p| !p.is_null()).unwrap_or(data);
    let plan = normalize_plan(payload);
    if !plan.has_days() {
        return Err(PlanError::InvalidFormat);
    }
    Ok(plan)
}

/// Interpret a swap response
///
/// Success requires a truthy `ok` and a `plan_updated` payload; anything else
/// fails with the backend's `error` text or `"<act> failed"`.
pub fn plan_from_swap_response(action: &SwapAction, data: &Value) -> Result<Plan, PlanError> {
    let ok = data.get("ok").map(is_truthy).unwrap_or(false);
    let updated = data.get("plan_updated").filter(|p| is_truthy(p));

    match (ok, updated) {
        (true, Some(updated)) => {
            let plan = normalize_plan(updated);
            if !plan.has_days() {
                return Err(PlanError::InvalidFormat);
            }
            Ok(plan)
        }
        _ => {
            let message = data
                .get("error")
                .filter(|e| is_present(e))
                .map(value_to_text)
                .unwrap_or_else(|| format!("{} failed", action.act()));
            Err(PlanError::ActionFailed(message))
        }
    }
}
