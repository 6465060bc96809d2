//! Dialogue Manager module for handling plan session transitions
//!
//! Every successful load or swap builds a fresh [`PlanSession`] and replaces
//! the stored one; failures leave the stored session untouched.

use anyhow::Result;
use sqlx::postgres::PgPool;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, MessageId, ParseMode};
use teloxide::{ApiError, RequestError};
use tracing::{debug, info, warn};

use crate::db::{load_cached_plan, save_cached_plan};
use crate::dialogue::{PlanDialogue, PlanDialogueState, PlanSession};
use crate::localization::{t_args_lang, t_lang};
use crate::plan_api::SwapAction;
use crate::plan_errors::PlanError;
use crate::plan_model::Plan;
use crate::plan_source::{PlanLocator, PlanSource};

use super::callback_data::PlanCallback;
use super::ui_builder::{create_plan_keyboard, create_shopping_keyboard, format_plan_message, format_shopping_list};

/// Shared handler dependencies
pub struct PlanServices {
    pub source: PlanSource,
    /// Plan cache, absent when no database is configured
    pub pool: Option<PgPool>,
}

/// Localized user-facing text for a plan failure
pub fn plan_error_message(error: &PlanError, language_code: Option<&str>) -> String {
    let detail = match error {
        PlanError::MissingParams => t_lang("error-missing-params", language_code),
        PlanError::Timeout(_) => t_lang("error-timeout", language_code),
        PlanError::Http(status) => {
            t_args_lang("error-http", &[("status", &status.to_string())], language_code)
        }
        PlanError::Transport(_) => t_lang("error-transport", language_code),
        PlanError::Api(msg) => t_args_lang("error-api", &[("msg", msg)], language_code),
        PlanError::RowNotFound(_) => t_lang("error-row-not-found", language_code),
        PlanError::InvalidFormat => t_lang("error-invalid-format", language_code),
        PlanError::ActionFailed(msg) => {
            t_args_lang("error-action-failed", &[("msg", msg)], language_code)
        }
        PlanError::Unsupported(_) => t_lang("error-unsupported", language_code),
    };
    format!("⚠️ {}: {}", t_lang("error-title", language_code), detail)
}

/// Translate a swap button into a backend action
///
/// Day numbers sent to the backend are 1-based; the meal type comes from the
/// session so stale buttons cannot address a meal that no longer exists.
pub fn swap_action_for(session: &PlanSession, callback: PlanCallback) -> Option<SwapAction> {
    match callback {
        PlanCallback::SwapMeal { day, meal } => {
            let meal = session.meal(day, meal)?;
            Some(SwapAction::Meal {
                day: day + 1,
                meal_type: meal.meal_type.clone(),
            })
        }
        PlanCallback::SwapDay(day) => {
            session.day(day)?;
            Some(SwapAction::Day { day: day + 1 })
        }
        PlanCallback::SwapPlan => Some(SwapAction::Plan),
        PlanCallback::Day(_) | PlanCallback::Shopping => None,
    }
}

/// Edit the tracked message in place, or send a new one when it cannot be edited
async fn present(
    bot: &Bot,
    chat_id: ChatId,
    message_id: Option<i32>,
    text: String,
    keyboard: InlineKeyboardMarkup,
) -> Result<i32> {
    if let Some(id) = message_id {
        match bot
            .edit_message_text(chat_id, MessageId(id), text.clone())
            .parse_mode(ParseMode::Html)
            .reply_markup(keyboard.clone())
            .await
        {
            Ok(_) | Err(RequestError::Api(ApiError::MessageNotModified)) => return Ok(id),
            Err(e) => {
                debug!(chat_id = %chat_id, error = %e, "Could not edit plan message, sending a new one");
            }
        }
    }

    let sent = bot
        .send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard)
        .await?;
    Ok(sent.id.0)
}

/// Render the session's current day and store the session
async fn show_session(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &PlanDialogue,
    services: &PlanServices,
    mut session: PlanSession,
) -> Result<PlanSession> {
    let language_code = session.language_code.as_deref();
    let text = format_plan_message(&session.plan, session.current_day, language_code);
    let keyboard = create_plan_keyboard(
        &session.plan,
        session.current_day,
        services.source.supports_swaps(),
        language_code,
    );

    let id = present(bot, chat_id, session.message_id, text, keyboard).await?;
    session.message_id = Some(id);

    dialogue
        .update(PlanDialogueState::ViewingPlan {
            session: session.clone(),
        })
        .await?;
    Ok(session)
}

/// Save the plan to the cache; failures are logged only
pub async fn cache_plan(services: &PlanServices, telegram_id: i64, locator: &PlanLocator, plan: &Plan) {
    if let Some(pool) = &services.pool {
        if let Err(e) = save_cached_plan(pool, telegram_id, locator, plan).await {
            warn!(user_id = telegram_id, error = %e, "Failed to cache plan");
        }
    }
}

/// Fetch a plan and show its first day
pub async fn load_and_show_plan(
    bot: &Bot,
    chat_id: ChatId,
    telegram_id: i64,
    dialogue: &PlanDialogue,
    services: &PlanServices,
    locator: PlanLocator,
    language_code: Option<&str>,
) -> Result<()> {
    let loading = bot
        .send_message(chat_id, t_lang("loading-plan", language_code))
        .await?;

    match services.source.load(&locator).await {
        Ok(plan) => {
            info!(user_id = telegram_id, days = plan.days.len(), "Plan loaded");
            let mut session = PlanSession::new(plan, locator, language_code.map(|s| s.to_string()));
            session.message_id = Some(loading.id.0);

            let session = show_session(bot, chat_id, dialogue, services, session).await?;
            cache_plan(services, telegram_id, &session.locator, &session.plan).await;
        }
        Err(e) => {
            warn!(user_id = telegram_id, error = %e, shape_failure = e.is_shape_failure(), "Failed to load plan");
            let text = plan_error_message(&e, language_code);
            if let Err(edit_error) = bot.edit_message_text(chat_id, loading.id, text.clone()).await {
                debug!(error = %edit_error, "Could not edit loading message");
                bot.send_message(chat_id, text).await?;
            }
        }
    }

    Ok(())
}

/// Show the cached plan for a user, returning whether one was found
pub async fn show_cached_plan(
    bot: &Bot,
    chat_id: ChatId,
    telegram_id: i64,
    dialogue: &PlanDialogue,
    services: &PlanServices,
    language_code: Option<&str>,
) -> Result<bool> {
    let Some(pool) = &services.pool else {
        return Ok(false);
    };

    let cached = match load_cached_plan(pool, telegram_id).await {
        Ok(Some(cached)) if cached.plan.has_days() => cached,
        Ok(_) => return Ok(false),
        Err(e) => {
            warn!(user_id = telegram_id, error = %e, "Failed to read plan cache");
            return Ok(false);
        }
    };

    debug!(user_id = telegram_id, updated_at = %cached.updated_at, "Showing cached plan");
    bot.send_message(chat_id, t_lang("cached-plan-notice", language_code))
        .await?;

    let session = PlanSession::new(cached.plan, cached.locator, language_code.map(|s| s.to_string()));
    show_session(bot, chat_id, dialogue, services, session).await?;
    Ok(true)
}

/// Switch the plan message to another day tab
pub async fn show_day(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &PlanDialogue,
    services: &PlanServices,
    mut session: PlanSession,
    day_index: usize,
) -> Result<()> {
    session.current_day = day_index;
    show_session(bot, chat_id, dialogue, services, session).await?;
    Ok(())
}

/// Replace the plan message with the shopping list view
pub async fn show_shopping_list(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &PlanDialogue,
    mut session: PlanSession,
) -> Result<()> {
    let language_code = session.language_code.as_deref();
    let text = format_shopping_list(&session.plan, language_code);
    let keyboard = create_shopping_keyboard(session.current_day, language_code);

    let id = present(bot, chat_id, session.message_id, text, keyboard).await?;
    if session.message_id != Some(id) {
        session.message_id = Some(id);
        dialogue.update(PlanDialogueState::ViewingPlan { session }).await?;
    }
    Ok(())
}

/// Send a swap action and show the updated plan
pub async fn apply_swap(
    bot: &Bot,
    chat_id: ChatId,
    telegram_id: i64,
    dialogue: &PlanDialogue,
    services: &PlanServices,
    session: PlanSession,
    action: SwapAction,
) -> Result<()> {
    let language_code = session.language_code.clone();

    match services.source.swap(&session.locator, &action).await {
        Ok(plan) => {
            info!(user_id = telegram_id, act = action.act(), "Swap applied");
            let session = show_session(bot, chat_id, dialogue, services, session.with_plan(plan)).await?;
            cache_plan(services, telegram_id, &session.locator, &session.plan).await;
        }
        Err(e) => {
            warn!(user_id = telegram_id, act = action.act(), error = %e, "Swap failed");
            bot.send_message(chat_id, plan_error_message(&e, language_code.as_deref()))
                .await?;
        }
    }

    Ok(())
}
