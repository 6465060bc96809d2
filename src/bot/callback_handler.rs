//! Callback Handler module for processing inline keyboard callback queries

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use tracing::{debug, warn};

use crate::dialogue::{validate_day_index, PlanDialogue, PlanDialogueState};
use crate::localization::t_lang;
use crate::plan_errors::PlanError;

use super::callback_data::PlanCallback;
use super::dialogue_manager::{
    apply_swap, plan_error_message, show_day, show_shopping_list, swap_action_for, PlanServices,
};

/// Handle callback queries from inline keyboards
pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    services: Arc<PlanServices>,
    dialogue: PlanDialogue,
) -> Result<()> {
    let telegram_id = q.from.id.0 as i64;
    let data = q.data.as_deref().unwrap_or("");
    debug!(user_id = telegram_id, data = %data, "Received callback query from user");

    let Some(callback) = PlanCallback::parse(data) else {
        warn!(user_id = telegram_id, data = %data, "Unknown callback data");
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };

    let Some(chat_id) = q.message.as_ref().map(|m| m.chat().id) else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };

    let session = match dialogue.get().await? {
        Some(PlanDialogueState::ViewingPlan { session }) => session,
        Some(PlanDialogueState::Start) | None => {
            let language_code = q.from.language_code.as_deref();
            bot.answer_callback_query(q.id.clone())
                .text(t_lang("error-no-session", language_code))
                .show_alert(true)
                .await?;
            return Ok(());
        }
    };
    let language_code = session.language_code.clone();

    match callback {
        PlanCallback::Day(index) => {
            bot.answer_callback_query(q.id.clone()).await?;
            match validate_day_index(&session, index) {
                Ok(index) => show_day(&bot, chat_id, &dialogue, &services, session, index).await?,
                Err(reason) => debug!(user_id = telegram_id, index, reason, "Ignoring stale day tab"),
            }
        }
        PlanCallback::Shopping => {
            bot.answer_callback_query(q.id.clone()).await?;
            show_shopping_list(&bot, chat_id, &dialogue, session).await?;
        }
        PlanCallback::SwapMeal { .. } | PlanCallback::SwapDay(_) | PlanCallback::SwapPlan => {
            if !services.source.supports_swaps() {
                let unsupported = PlanError::Unsupported(callback.to_data());
                bot.answer_callback_query(q.id.clone())
                    .text(plan_error_message(&unsupported, language_code.as_deref()))
                    .await?;
                return Ok(());
            }

            let Some(action) = swap_action_for(&session, callback) else {
                debug!(user_id = telegram_id, data = %data, "Ignoring stale swap button");
                bot.answer_callback_query(q.id.clone()).await?;
                return Ok(());
            };

            bot.answer_callback_query(q.id.clone())
                .text(t_lang("swapping", language_code.as_deref()))
                .await?;
            apply_swap(&bot, chat_id, telegram_id, &dialogue, &services, session, action).await?;
        }
    }

    Ok(())
}
