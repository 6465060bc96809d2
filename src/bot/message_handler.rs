//! Message Handler module for processing incoming Telegram messages

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::debug;

use crate::dialogue::PlanDialogue;
use crate::localization::t_lang;
use crate::plan_errors::PlanError;
use crate::plan_source::{PlanLocator, PlanSource};

use super::dialogue_manager::{load_and_show_plan, plan_error_message, show_cached_plan, PlanServices};

/// A recognised chat command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanCommand {
    /// `/start` with an optional deep-link payload
    Start(Option<String>),
    /// `/plan` with its whitespace-separated arguments
    Plan(Vec<String>),
    Help,
    /// Any other text
    Other,
}

impl PlanCommand {
    /// Parse message text, accepting `/command@botname` forms
    pub fn parse(text: &str) -> Self {
        let mut words = text.split_whitespace();
        let Some(head) = words.next() else {
            return PlanCommand::Other;
        };
        let command = head.split('@').next().unwrap_or(head).to_lowercase();
        let args: Vec<String> = words.map(str::to_string).collect();

        match command.as_str() {
            "/start" => PlanCommand::Start(args.into_iter().next()),
            "/plan" => PlanCommand::Plan(args),
            "/help" => PlanCommand::Help,
            _ => PlanCommand::Other,
        }
    }
}

/// Decide which plan a command asks for
///
/// `Ok(None)` means no plan was named and the cached one should be tried.
/// Backend plans need an id and a token. Spreadsheet plans are always the
/// sender's own row; arguments cannot name another user's row.
pub fn locator_for_command(
    command: &PlanCommand,
    sheet_mode: bool,
    sender_id: &str,
) -> Result<Option<PlanLocator>, PlanError> {
    let args: Vec<&str> = match command {
        PlanCommand::Start(payload) => payload.iter().map(String::as_str).collect(),
        PlanCommand::Plan(args) => args.iter().map(String::as_str).collect(),
        PlanCommand::Help | PlanCommand::Other => return Ok(None),
    };

    if sheet_mode {
        return Ok(Some(PlanLocator::Sheet {
            user_id: sender_id.to_string(),
        }));
    }

    match args.as_slice() {
        [] => Ok(None),
        [payload] => PlanLocator::from_start_payload(payload)
            .map(Some)
            .ok_or(PlanError::MissingParams),
        [plan_id, token] => Ok(Some(PlanLocator::Api {
            plan_id: plan_id.to_string(),
            token: token.to_string(),
        })),
        _ => Err(PlanError::MissingParams),
    }
}

fn welcome_message(language_code: Option<&str>) -> String {
    format!(
        "{}\n\n{}\n\n{}",
        t_lang("welcome-title", language_code),
        t_lang("welcome-description", language_code),
        t_lang("welcome-usage", language_code)
    )
}

fn help_message(sheet_mode: bool, language_code: Option<&str>) -> String {
    let plan_usage = if sheet_mode { "help-plan-sheet" } else { "help-plan" };
    [
        "help-title",
        plan_usage,
        "help-start",
        "help-help",
        "help-tabs",
    ]
    .iter()
    .map(|key| t_lang(key, language_code))
    .collect::<Vec<_>>()
    .join("\n")
}

async fn handle_text_message(
    bot: &Bot,
    msg: &Message,
    text: &str,
    dialogue: PlanDialogue,
    services: &PlanServices,
) -> Result<()> {
    let language_code = msg
        .from
        .as_ref()
        .and_then(|user| user.language_code.as_deref());
    let telegram_id = msg
        .from
        .as_ref()
        .map(|user| user.id.0 as i64)
        .unwrap_or(msg.chat.id.0);
    let sheet_mode = matches!(services.source, PlanSource::Sheet(_));

    let command = PlanCommand::parse(text);
    debug!(user_id = telegram_id, command = ?command, "Received text message from user");

    match &command {
        PlanCommand::Help => {
            bot.send_message(msg.chat.id, help_message(sheet_mode, language_code))
                .await?;
        }
        PlanCommand::Other => {
            bot.send_message(msg.chat.id, t_lang("text-response", language_code))
                .await?;
        }
        PlanCommand::Start(_) | PlanCommand::Plan(_) => {
            match locator_for_command(&command, sheet_mode, &telegram_id.to_string()) {
                Ok(Some(locator)) => {
                    load_and_show_plan(
                        bot,
                        msg.chat.id,
                        telegram_id,
                        &dialogue,
                        services,
                        locator,
                        language_code,
                    )
                    .await?;
                }
                Ok(None) => {
                    if matches!(command, PlanCommand::Start(_)) {
                        bot.send_message(msg.chat.id, welcome_message(language_code))
                            .await?;
                    }
                    let shown = show_cached_plan(
                        bot,
                        msg.chat.id,
                        telegram_id,
                        &dialogue,
                        services,
                        language_code,
                    )
                    .await?;
                    if !shown && matches!(command, PlanCommand::Plan(_)) {
                        bot.send_message(
                            msg.chat.id,
                            plan_error_message(&PlanError::MissingParams, language_code),
                        )
                        .await?;
                    }
                }
                Err(e) => {
                    bot.send_message(msg.chat.id, plan_error_message(&e, language_code))
                        .await?;
                }
            }
        }
    }

    Ok(())
}

pub async fn message_handler(
    bot: Bot,
    msg: Message,
    services: Arc<PlanServices>,
    dialogue: PlanDialogue,
) -> Result<()> {
    if let Some(text) = msg.text() {
        handle_text_message(&bot, &msg, text, dialogue, &services).await?;
    } else {
        let language_code = msg
            .from
            .as_ref()
            .and_then(|user| user.language_code.as_deref());
        debug!(user_id = %msg.chat.id, "Received unsupported message type from user");
        bot.send_message(msg.chat.id, t_lang("text-response", language_code))
            .await?;
    }

    Ok(())
}
