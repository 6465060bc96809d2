//! # Spreadsheet Plan Source Module
//!
//! Loads plans from a published spreadsheet instead of a dedicated backend.
//! The sheet holds one row per user: an id column with the Telegram user id and
//! a plan column with the JSON-encoded plan.
//!
//! ## Supported exports
//!
//! - CSV (`.../export?format=csv` or "publish to web" CSV)
//! - Google Visualization responses (`.../gviz/tq?tqx=out:json`), with or
//!   without the `google.visualization.Query.setResponse(...)` wrapper
//! - JSON arrays of row objects keyed by column name

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::field_lookup::{format_number, value_to_text};
use crate::plan_config::SheetFormat;
use crate::plan_errors::PlanError;
use crate::plan_model::Plan;
use crate::plan_normalizer::normalize_plan_str;

lazy_static! {
    static ref GVIZ_WRAPPER: Regex = Regex::new(r"(?s)setResponse\s*\((.*)\)\s*;?\s*$")
        .expect("GViz wrapper pattern should be valid");
}

/// Table extracted from a spreadsheet export: header plus data rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SheetTable {
    /// Index of a column, matched case-insensitively on the trimmed name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = name.trim().to_lowercase();
        self.header
            .iter()
            .position(|h| h.trim().to_lowercase() == wanted)
    }

    /// Plan cell of the last row whose id column equals `user_id`
    pub fn find_plan_cell(
        &self,
        id_column: &str,
        plan_column: &str,
        user_id: &str,
    ) -> Result<String, PlanError> {
        let not_found = || PlanError::RowNotFound(user_id.to_string());

        let (id_idx, plan_idx) = match (self.column_index(id_column), self.column_index(plan_column)) {
            (Some(id_idx), Some(plan_idx)) => (id_idx, plan_idx),
            _ => {
                warn!(id_column, plan_column, "Spreadsheet is missing the id or plan column");
                return Err(not_found());
            }
        };

        let wanted = normalize_id(user_id);
        self.rows
            .iter()
            .rev()
            .find(|row| row.get(id_idx).map(|c| normalize_id(c)) == Some(wanted.clone()))
            .and_then(|row| row.get(plan_idx))
            .map(|cell| cell.trim().to_string())
            .filter(|cell| !cell.is_empty())
            .ok_or_else(not_found)
    }
}

/// Compare ids by display form so `123.0` from a numeric cell matches `123`
fn normalize_id(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() => format_number(n),
        _ => trimmed.to_string(),
    }
}

/// Parse CSV text into records
///
/// Handles quoted fields, doubled quotes inside quotes, separators and line
/// breaks inside quotes, and both `\n` and `\r\n` record endings. Blank lines
/// are skipped.
///
/// # Examples
///
/// ```rust
/// use mealplan::sheet_source::parse_csv;
///
/// let records = parse_csv("user_id,plan_json\n42,\"{\"\"days\"\": []}\"\n");
/// assert_eq!(records[1], vec!["42".to_string(), "{\"days\": []}".to_string()]);
/// ```
pub fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.trim_start_matches('\u{feff}').chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                other => field.push(other),
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                record.push(std::mem::take(&mut field));
                push_record(&mut records, std::mem::take(&mut record));
            }
            other => field.push(other),
        }
    }

    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        push_record(&mut records, record);
    }

    records
}

fn push_record(records: &mut Vec<Vec<String>>, record: Vec<String>) {
    let blank = record.len() == 1 && record[0].is_empty();
    if !blank {
        records.push(record);
    }
}

/// Build a table from CSV text, first record as header
pub fn table_from_csv(text: &str) -> SheetTable {
    let mut records = parse_csv(text).into_iter();
    SheetTable {
        header: records.next().unwrap_or_default(),
        rows: records.collect(),
    }
}

/// Build a table from a Google Visualization response
pub fn table_from_gviz(text: &str) -> Result<SheetTable, PlanError> {
    let json_text = GVIZ_WRAPPER
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(text);

    let value: Value = serde_json::from_str(json_text.trim()).map_err(|e| {
        warn!(error = %e, "GViz response is not valid JSON");
        PlanError::InvalidFormat
    })?;

    if value.get("status").and_then(Value::as_str) == Some("error") {
        let message = value
            .get("errors")
            .and_then(|errors| errors.get(0))
            .and_then(|e| e.get("detailed_message").or_else(|| e.get("message")))
            .map(value_to_text)
            .unwrap_or_else(|| "gviz error".to_string());
        return Err(PlanError::Api(message));
    }

    let table = value.get("table").ok_or(PlanError::InvalidFormat)?;

    let header = table
        .get("cols")
        .and_then(Value::as_array)
        .map(|cols| {
            cols.iter()
                .map(|col| {
                    col.get("label")
                        .and_then(Value::as_str)
                        .filter(|l| !l.is_empty())
                        .or_else(|| col.get("id").and_then(Value::as_str))
                        .unwrap_or_default()
                        .to_string()
                })
                .collect()
        })
        .unwrap_or_default();

    let rows = table
        .get("rows")
        .and_then(Value::as_array)
        .map(|rows| {
            rows.iter()
                .map(|row| {
                    row.get("c")
                        .and_then(Value::as_array)
                        .map(|cells| cells.iter().map(gviz_cell_text).collect())
                        .unwrap_or_default()
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(SheetTable { header, rows })
}

fn gviz_cell_text(cell: &Value) -> String {
    match cell.get("v") {
        Some(v) if !v.is_null() => value_to_text(v),
        _ => cell.get("f").map(value_to_text).unwrap_or_default(),
    }
}

/// Build a table from a JSON array of row objects
///
/// The header is the union of keys in first-seen order; nested plan objects
/// are kept as their JSON text.
pub fn table_from_json_rows(text: &str) -> Result<SheetTable, PlanError> {
    let value: Value = serde_json::from_str(text.trim()).map_err(|_| PlanError::InvalidFormat)?;
    let rows = value.as_array().ok_or(PlanError::InvalidFormat)?;

    let mut header: Vec<String> = Vec::new();
    for row in rows {
        if let Some(obj) = row.as_object() {
            for key in obj.keys() {
                if !header.contains(key) {
                    header.push(key.clone());
                }
            }
        }
    }

    let rows = rows
        .iter()
        .map(|row| {
            header
                .iter()
                .map(|key| row.get(key).map(value_to_text).unwrap_or_default())
                .collect()
        })
        .collect();

    Ok(SheetTable { header, rows })
}

/// Parse an export body according to its format
pub fn parse_table(format: SheetFormat, text: &str) -> Result<SheetTable, PlanError> {
    match format {
        SheetFormat::Csv => Ok(table_from_csv(text)),
        SheetFormat::Gviz => table_from_gviz(text),
        SheetFormat::JsonRows => table_from_json_rows(text),
    }
}

/// Client for a published spreadsheet
#[derive(Debug, Clone)]
pub struct SheetClient {
    http: reqwest::Client,
    url: String,
    format: SheetFormat,
    id_column: String,
    plan_column: String,
}

impl SheetClient {
    pub fn new(
        url: impl Into<String>,
        format: SheetFormat,
        id_column: impl Into<String>,
        plan_column: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, PlanError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PlanError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            url: url.into(),
            format,
            id_column: id_column.into(),
            plan_column: plan_column.into(),
        })
    }

    /// Download the export and return the parsed table
    pub async fn fetch_table(&self) -> Result<SheetTable, PlanError> {
        debug!(format = ?self.format, "Fetching spreadsheet export");

        let response = self
            .http
            .get(&self.url)
            .header(reqwest::header::CACHE_CONTROL, "no-store")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Spreadsheet export returned error status");
            return Err(PlanError::Http(status.as_u16()));
        }

        let body = response.text().await?;
        parse_table(self.format, &body)
    }

    /// Load the plan stored for `user_id`
    pub async fn fetch_plan(&self, user_id: &str) -> Result<Plan, PlanError> {
        if user_id.trim().is_empty() {
            return Err(PlanError::MissingParams);
        }

        let table = self.fetch_table().await?;
        let plan = plan_from_table(&table, &self.id_column, &self.plan_column, user_id)?;
        info!(user_id = %user_id, days = plan.days.len(), "Plan loaded from spreadsheet");
        Ok(plan)
    }
}

/// Find and normalize a user's plan in a parsed table
pub fn plan_from_table(
    table: &SheetTable,
    id_column: &str,
    plan_column: &str,
    user_id: &str,
) -> Result<Plan, PlanError> {
    let cell = table.find_plan_cell(id_column, plan_column, user_id)?;
    let plan = normalize_plan_str(&cell);
    if !plan.has_days() {
        return Err(PlanError::InvalidFormat);
    }
    Ok(plan)
}
