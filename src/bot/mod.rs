//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules:
//! - `message_handler`: Handles commands and other incoming messages
//! - `callback_handler`: Handles inline keyboard callback queries
//! - `callback_data`: Encodes and parses inline button payloads
//! - `ui_builder`: Creates keyboards and formats plan messages
//! - `dialogue_manager`: Loads, swaps and shows plan sessions

pub mod callback_data;
pub mod callback_handler;
pub mod dialogue_manager;
pub mod message_handler;
pub mod ui_builder;

// Re-export main handler functions for use in main.rs
pub use callback_handler::callback_handler;
pub use message_handler::message_handler;

pub use callback_data::PlanCallback;
pub use dialogue_manager::{plan_error_message, PlanServices};
pub use ui_builder::{create_plan_keyboard, format_plan_message, format_shopping_list};
