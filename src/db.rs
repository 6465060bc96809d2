use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use tracing::{debug, info};

use crate::plan_model::Plan;
use crate::plan_source::PlanLocator;

/// Last plan shown to a Telegram user
#[derive(Debug, Clone, PartialEq)]
pub struct CachedPlan {
    pub telegram_id: i64,
    pub locator: PlanLocator,
    pub plan: Plan,
    pub updated_at: DateTime<Utc>,
}

/// Initialize the database schema
pub async fn init_database_schema(pool: &PgPool) -> Result<()> {
    info!("Initializing database schema...");

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS plan_cache (
            telegram_id BIGINT PRIMARY KEY,
            locator TEXT NOT NULL,
            plan TEXT NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create plan_cache table")?;

    info!("Database schema initialized successfully");
    Ok(())
}

/// Store the plan a user is looking at, replacing any previous one
pub async fn save_cached_plan(
    pool: &PgPool,
    telegram_id: i64,
    locator: &PlanLocator,
    plan: &Plan,
) -> Result<()> {
    let locator_json = serde_json::to_string(locator).context("Failed to serialize locator")?;
    let plan_json = serde_json::to_string(plan).context("Failed to serialize plan")?;

    sqlx::query(
        "INSERT INTO plan_cache (telegram_id, locator, plan, updated_at)
         VALUES ($1, $2, $3, NOW())
         ON CONFLICT (telegram_id)
         DO UPDATE SET locator = EXCLUDED.locator, plan = EXCLUDED.plan, updated_at = NOW()",
    )
    .bind(telegram_id)
    .bind(&locator_json)
    .bind(&plan_json)
    .execute(pool)
    .await
    .context("Failed to save cached plan")?;

    debug!(telegram_id, days = plan.days.len(), "Cached plan saved");
    Ok(())
}

/// Read the cached plan for a user, if any
pub async fn load_cached_plan(pool: &PgPool, telegram_id: i64) -> Result<Option<CachedPlan>> {
    let row = sqlx::query(
        "SELECT telegram_id, locator, plan, updated_at FROM plan_cache WHERE telegram_id = $1",
    )
    .bind(telegram_id)
    .fetch_optional(pool)
    .await
    .context("Failed to read cached plan")?;

    row.map(|row| cached_plan_from_row(&row)).transpose()
}

fn cached_plan_from_row(row: &PgRow) -> Result<CachedPlan> {
    let locator: String = row.get("locator");
    let plan: String = row.get("plan");

    Ok(CachedPlan {
        telegram_id: row.get("telegram_id"),
        locator: serde_json::from_str(&locator).context("Corrupted locator in plan cache")?,
        // Goes through the normalizer, so older rows still read back canonically
        plan: serde_json::from_str(&plan).context("Corrupted plan in plan cache")?,
        updated_at: row.get("updated_at"),
    })
}

/// Forget the cached plan for a user
pub async fn delete_cached_plan(pool: &PgPool, telegram_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM plan_cache WHERE telegram_id = $1")
        .bind(telegram_id)
        .execute(pool)
        .await
        .context("Failed to delete cached plan")?;

    Ok(result.rows_affected() > 0)
}
