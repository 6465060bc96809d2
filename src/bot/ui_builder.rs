//! UI Builder module for creating keyboards and formatting messages
//!
//! Messages use Telegram HTML; all plan text is escaped before it is wrapped
//! in tags, and every emitted line carries balanced tags so a message can be
//! cut at any line boundary.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use teloxide::utils::html::escape;

use crate::field_lookup::{format_number, round_half_up};
use crate::localization::{t_args_lang, t_lang};
use crate::plan_config::TELEGRAM_MESSAGE_LIMIT;
use crate::plan_model::{Day, Macros, Meal, Plan, ShoppingList};

use super::callback_data::PlanCallback;

/// Longest meal title shown on a swap button, in characters
const BUTTON_TITLE_CHARS: usize = 24;
/// Longest plan title or day heading shown in a message, in characters
const HEADING_CHARS: usize = 256;
/// Day tabs per keyboard row
const DAY_TABS_PER_ROW: usize = 4;

/// How much of each meal card is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RenderDetail {
    Full,
    NoInstructions,
    NoIngredients,
    TitlesOnly,
}

impl RenderDetail {
    const LADDER: [RenderDetail; 4] = [
        RenderDetail::Full,
        RenderDetail::NoInstructions,
        RenderDetail::NoIngredients,
        RenderDetail::TitlesOnly,
    ];

    fn instructions(self) -> bool {
        self == RenderDetail::Full
    }

    fn ingredients(self) -> bool {
        self <= RenderDetail::NoInstructions
    }

    fn descriptions(self) -> bool {
        self <= RenderDetail::NoIngredients
    }
}

fn display_number(n: f64) -> String {
    format_number(round_half_up(n))
}

fn macro_args(macros: &Macros) -> [(&'static str, String); 4] {
    [
        ("kcal", display_number(macros.kcal)),
        ("protein", display_number(macros.protein_g)),
        ("fat", display_number(macros.fat_g)),
        ("carbs", display_number(macros.carbs_g)),
    ]
}

/// Localized macro line, e.g. `Ккал: 1800 | Б:120 Ж:60 В:200`
pub fn format_macros_line(key: &str, macros: &Macros, language_code: Option<&str>) -> String {
    let values = macro_args(macros);
    let args: Vec<(&str, &str)> = values.iter().map(|(k, v)| (*k, v.as_str())).collect();
    t_args_lang(key, &args, language_code)
}

/// Collapse a value onto one line
fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Wrap each non-empty line of `text` in `tag`, escaping the content
fn tagged_lines(text: &str, tag: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| format!("<{tag}>{}</{tag}>", escape(line)))
        .collect()
}

fn plain_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(escape)
        .collect()
}

/// Render one meal card as lines
pub fn format_meal_card(meal: &Meal, detail: RenderDetail, language_code: Option<&str>) -> Vec<String> {
    let mut lines = vec![format!("🍽 <b>{}</b>", escape(&single_line(meal.display_title())))];

    if !meal.title.is_empty() && !meal.meal_type.is_empty() {
        lines.push(format!("<i>{}</i>", escape(&single_line(&meal.meal_type))));
    }

    if meal.macros.has_any() {
        lines.push(format_macros_line("day-macros", &meal.macros, language_code));
    }

    if detail.descriptions() {
        lines.extend(tagged_lines(&meal.description, "i"));
    }

    if detail.ingredients() && !meal.ingredients.is_empty() {
        lines.push(format!("<u>{}</u>", escape(&t_lang("section-ingredients", language_code))));
        for ingredient in &meal.ingredients {
            let name = escape(&single_line(&ingredient.name));
            if ingredient.qty.is_empty() {
                lines.push(format!("• {name}"));
            } else {
                lines.push(format!("• {name} — {}", escape(&single_line(&ingredient.qty))));
            }
        }
    }

    if detail.instructions() && !meal.instructions.trim().is_empty() {
        lines.push(format!("<u>{}</u>", escape(&t_lang("section-instructions", language_code))));
        lines.extend(plain_lines(&meal.instructions));
    }

    if detail.descriptions() && !meal.swap_suggestions.is_empty() {
        lines.push(format!("<u>{}</u>", escape(&t_lang("section-swaps", language_code))));
        for suggestion in &meal.swap_suggestions {
            lines.push(format!("↔ {}", escape(&single_line(suggestion))));
        }
    }

    lines
}

fn render_plan(plan: &Plan, day: Option<&Day>, detail: RenderDetail, language_code: Option<&str>) -> Vec<String> {
    let mut lines = vec![
        format!("<b>{}</b>", escape(&truncate_label(&plan.meta.title, HEADING_CHARS))),
        format_macros_line("plan-macros", &plan.meta.macros, language_code),
    ];

    if let Some(day) = day {
        lines.push(String::new());
        lines.push(format!("📅 <b>{}</b>", escape(&truncate_label(&day.day, HEADING_CHARS))));
        lines.push(format_macros_line("day-macros", &day.macros, language_code));

        for meal in &day.meals {
            lines.push(String::new());
            lines.extend(format_meal_card(meal, detail, language_code));
        }
    }

    if detail != RenderDetail::Full {
        lines.push(String::new());
        lines.push(format!("<i>{}</i>", escape(&t_lang("message-truncated", language_code))));
    }

    lines
}

/// Message length as Telegram counts it, in UTF-16 code units
pub fn message_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Plain text of one rendered line: tags removed, entities decoded
fn strip_markup(line: &str) -> String {
    let mut text = String::with_capacity(line.len());
    let mut in_tag = false;
    for c in line.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

/// Cut a single rendered line to `limit` units, dropping its markup
fn truncate_line(line: &str, limit: usize) -> String {
    let mut out = String::new();
    let mut used = message_len("…");
    for c in strip_markup(line).chars() {
        let piece = escape(c.encode_utf8(&mut [0u8; 4]));
        let cost = message_len(&piece);
        if used + cost > limit {
            break;
        }
        out.push_str(&piece);
        used += cost;
    }
    out.push('…');
    out
}

/// Join lines, cutting at a line boundary so the result fits `limit`
///
/// Length is measured with [`message_len`]. A first line that alone exceeds
/// the limit is shortened to plain text instead of being dropped.
pub fn fit_lines(lines: &[String], limit: usize) -> String {
    let mut out = String::new();
    let mut used = 0;

    for line in lines {
        let cost = message_len(line) + usize::from(!out.is_empty());
        if used + cost > limit {
            if out.is_empty() {
                out = truncate_line(line, limit);
            }
            break;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(line);
        used += cost;
    }

    out
}

/// Render the plan message for one day tab
///
/// Instructions are dropped first, then ingredients, then descriptions, until
/// the message fits Telegram's limit.
pub fn format_plan_message(plan: &Plan, day_index: usize, language_code: Option<&str>) -> String {
    let day = plan.days.get(day_index);

    for detail in RenderDetail::LADDER {
        let text = render_plan(plan, day, detail, language_code).join("\n");
        if message_len(&text) <= TELEGRAM_MESSAGE_LIMIT {
            return text;
        }
    }

    fit_lines(
        &render_plan(plan, day, RenderDetail::TitlesOnly, language_code),
        TELEGRAM_MESSAGE_LIMIT,
    )
}

/// Render the shopping list view
pub fn format_shopping_list(plan: &Plan, language_code: Option<&str>) -> String {
    let mut lines = vec![format!("<b>{}</b>", escape(&t_lang("shopping-title", language_code)))];

    if plan.shopping_list.is_empty() {
        lines.push(escape(&t_lang("shopping-empty", language_code)));
    } else {
        match &plan.shopping_list {
            ShoppingList::Items(items) => {
                lines.extend(items.iter().map(|item| format!("• {}", escape(&single_line(&item.to_string())))));
            }
            ShoppingList::Categories(categories) => {
                for category in categories {
                    lines.push(String::new());
                    lines.push(format!("<b>{}</b>", escape(&single_line(&category.category))));
                    lines.extend(
                        category
                            .items
                            .iter()
                            .map(|item| format!("• {}", escape(&single_line(&item.to_string())))),
                    );
                }
            }
        }
    }

    if !plan.notes.is_empty() {
        lines.push(String::new());
        lines.push(format!("<u>{}</u>", escape(&t_lang("section-notes", language_code))));
        lines.extend(plan.notes.iter().map(|note| format!("💡 {}", escape(&single_line(note)))));
    }

    fit_lines(&lines, TELEGRAM_MESSAGE_LIMIT)
}

/// Shorten a label to `max` characters, never splitting a character
pub fn truncate_label(label: &str, max: usize) -> String {
    let label = single_line(label);
    if label.chars().count() <= max {
        return label;
    }
    let kept: String = label.chars().take(max.saturating_sub(1)).collect();
    format!("{kept}…")
}

fn callback_button(text: String, callback: PlanCallback) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text, callback.to_data())
}

/// Create the inline keyboard under a plan message
pub fn create_plan_keyboard(
    plan: &Plan,
    current_day: usize,
    supports_swaps: bool,
    language_code: Option<&str>,
) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();

    let tabs: Vec<InlineKeyboardButton> = plan
        .days
        .iter()
        .enumerate()
        .map(|(i, day)| {
            let label = truncate_label(&day.day, 12);
            let text = if i == current_day {
                format!("• {label} •")
            } else {
                label
            };
            callback_button(text, PlanCallback::Day(i))
        })
        .collect();
    rows.extend(tabs.chunks(DAY_TABS_PER_ROW).map(|chunk| chunk.to_vec()));

    if supports_swaps {
        if let Some(day) = plan.days.get(current_day) {
            for (meal_index, meal) in day.meals.iter().enumerate() {
                let title = truncate_label(meal.display_title(), BUTTON_TITLE_CHARS);
                rows.push(vec![callback_button(
                    t_args_lang("button-swap-meal", &[("meal", &title)], language_code),
                    PlanCallback::SwapMeal {
                        day: current_day,
                        meal: meal_index,
                    },
                )]);
            }

            rows.push(vec![
                callback_button(t_lang("button-swap-day", language_code), PlanCallback::SwapDay(current_day)),
                callback_button(t_lang("button-swap-plan", language_code), PlanCallback::SwapPlan),
            ]);
        }
    }

    rows.push(vec![callback_button(
        t_lang("button-shopping", language_code),
        PlanCallback::Shopping,
    )]);

    InlineKeyboardMarkup::new(rows)
}

/// Create the keyboard under the shopping list view
pub fn create_shopping_keyboard(current_day: usize, language_code: Option<&str>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![callback_button(
        t_lang("button-back", language_code),
        PlanCallback::Day(current_day),
    )]])
}
