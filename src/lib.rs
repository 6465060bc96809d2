//! # Meal Plan Telegram Bot
//!
//! A Telegram bot that fetches weekly meal plans from a backend API or a
//! published spreadsheet, normalizes every accepted payload shape into one
//! canonical plan, and shows it as day tabs with macro totals, meal swaps and a
//! shopping list.

pub mod bot;
pub mod db;
pub mod dialogue;
pub mod field_lookup;
pub mod localization;
pub mod plan_api;
pub mod plan_config;
pub mod plan_errors;
pub mod plan_model;
pub mod plan_normalizer;
pub mod plan_source;
pub mod sheet_source;
