use anyhow::{Context, Result};
use sqlx::postgres::PgPool;
use std::sync::Arc;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mealplan::bot::{self, PlanServices};
use mealplan::db;
use mealplan::dialogue::PlanDialogueState;
use mealplan::localization::init_localization_with_default;
use mealplan::plan_config::BotConfig;
use mealplan::plan_source::PlanSource;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize logging, JSON lines when LOG_FORMAT=json
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Starting Meal Plan Telegram Bot");

    let config = BotConfig::from_env()?;
    init_localization_with_default(&config.default_language)?;

    let source = PlanSource::from_config(&config).context("Failed to create plan source")?;
    info!(
        supports_swaps = source.supports_swaps(),
        timeout_secs = config.request_timeout_secs,
        "Plan source configured"
    );

    let pool = match &config.database_url {
        Some(database_url) => {
            let pool = PgPool::connect(database_url)
                .await
                .context("Failed to connect to database")?;
            db::init_database_schema(&pool).await?;
            Some(pool)
        }
        None => {
            warn!("DATABASE_URL not set, plan cache disabled");
            None
        }
    };

    let services = Arc::new(PlanServices { source, pool });
    let bot = Bot::new(config.bot_token);

    info!("Bot initialized, starting dispatcher");

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .enter_dialogue::<Message, InMemStorage<PlanDialogueState>, PlanDialogueState>()
                .endpoint(bot::message_handler),
        )
        .branch(
            Update::filter_callback_query()
                .enter_dialogue::<CallbackQuery, InMemStorage<PlanDialogueState>, PlanDialogueState>()
                .endpoint(bot::callback_handler),
        );

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![InMemStorage::<PlanDialogueState>::new(), services])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
