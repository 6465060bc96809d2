//! # Plan Normalizer Module
//!
//! Turns heterogeneous plan payloads into the canonical [`Plan`].
//!
//! ## Accepted inputs
//!
//! - A JSON string holding any of the shapes below
//! - An object whose `text` field is a JSON string
//! - An already canonical plan (has a `days` array), read back unchanged
//! - An upstream plan with a `meal_plan` or `week_plan` array
//!
//! Anything else yields an empty plan with the default title. Normalization
//! never fails; deciding whether a plan without days is usable is left to the
//! caller.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::field_lookup::{
    finite_or_zero, first_non_empty, format_number, is_present, lookup_number, lookup_text,
    round_half_up, synonyms, to_number, value_to_text, DEFAULT_UNIT,
};
use crate::plan_model::{
    Day, Ingredient, Macros, Meal, Plan, PlanMeta, ShoppingCategory, ShoppingItem, ShoppingList,
    DEFAULT_PLAN_TITLE,
};

/// Canonical weekday names, Monday first
pub const UA_WEEKDAYS: [&str; 7] = [
    "Понеділок",
    "Вівторок",
    "Середа",
    "Четвер",
    "Пʼятниця",
    "Субота",
    "Неділя",
];

/// Placeholder for an ingredient or shopping item without a name
pub const MISSING_NAME: &str = "—";

/// Which field conventions a payload follows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceShape {
    /// Output of this normalizer: flat macros, `{name, qty}` ingredients
    Canonical,
    /// Upstream generator output: nested macros, gram quantity fields
    Upstream,
}

/// Normalize any accepted payload into a canonical [`Plan`]
///
/// # Examples
///
/// ```rust
/// use mealplan::plan_normalizer::normalize_plan;
/// use serde_json::json;
///
/// let raw = json!({
///     "meal_plan": [
///         {"day": "понеділок", "meals": [
///             {"meal_type": "breakfast", "dish_name": "Омлет",
///              "macros": {"kcal": 320, "protein_g": 21, "fat_g": 24, "carbs_g": 3}}
///         ]}
///     ]
/// });
/// let plan = normalize_plan(&raw);
/// assert_eq!(plan.days[0].day, "Понеділок");
/// assert_eq!(plan.days[0].meals[0].title, "Омлет");
/// assert_eq!(plan.meta.macros.kcal, 320.0);
/// ```
pub fn normalize_plan(raw: &Value) -> Plan {
    let raw = unwrap_payload(raw);

    if let Some(days) = raw.get("days").and_then(Value::as_array) {
        debug!(days = days.len(), "Reading canonical plan");
        return build_plan(&raw, days, SourceShape::Canonical);
    }

    let source_days = synonyms::SOURCE_DAYS
        .iter()
        .find_map(|key| raw.get(*key).and_then(Value::as_array));

    match source_days {
        Some(days) => {
            debug!(days = days.len(), "Converting upstream plan");
            build_plan(&raw, days, SourceShape::Upstream)
        }
        None => {
            debug!("Payload has no recognised day array, returning empty plan");
            Plan::empty()
        }
    }
}

/// Normalize a raw string payload (JSON text, possibly a spreadsheet cell)
pub fn normalize_plan_str(raw: &str) -> Plan {
    normalize_plan(&Value::String(raw.to_string()))
}

/// Unwrap JSON-in-a-string and `{ "text": "<json>" }` envelopes
fn unwrap_payload(raw: &Value) -> Value {
    let mut value = match raw {
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(parsed) => parsed,
            Err(e) => {
                trace!(error = %e, "Payload string is not valid JSON");
                raw.clone()
            }
        },
        other => other.clone(),
    };

    if let Some(text) = value.get("text").and_then(Value::as_str) {
        match serde_json::from_str::<Value>(text) {
            Ok(parsed) => value = parsed,
            Err(e) => trace!(error = %e, "Nested text field is not valid JSON"),
        }
    }

    value
}

fn build_plan(raw: &Value, source_days: &[Value], shape: SourceShape) -> Plan {
    let days: Vec<Day> = source_days
        .iter()
        .enumerate()
        .map(|(i, d)| read_day(d, i + 1, shape))
        .collect();

    let meta = compute_plan_meta(raw.get("meta"), &days);

    Plan {
        meta,
        days,
        shopping_list: raw
            .get("shopping_list")
            .map(read_shopping_list)
            .unwrap_or_default(),
        notes: first_non_empty(raw, synonyms::PLAN_NOTES)
            .map(read_text_list)
            .unwrap_or_default(),
        safety: raw
            .get("safety")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_else(Map::new),
    }
}

/// Resolve a day label against the weekday vocabulary
///
/// A label containing a canonical weekday name (case-insensitive) becomes that
/// name; other labels are kept trimmed and verbatim; a missing or blank label
/// becomes the weekday at the 1-based `index`, wrapping every seven days.
///
/// # Examples
///
/// ```rust
/// use mealplan::plan_normalizer::normalize_day_label;
/// use serde_json::json;
///
/// assert_eq!(normalize_day_label(Some(&json!("ВІВТОРОК, 2 день")), 1), "Вівторок");
/// assert_eq!(normalize_day_label(Some(&json!("day 1")), 1), "day 1");
/// assert_eq!(normalize_day_label(None, 9), "Вівторок");
/// ```
pub fn normalize_day_label(raw: Option<&Value>, index: usize) -> String {
    let text = raw
        .filter(|v| is_present(v))
        .map(value_to_text)
        .map(|t| t.trim().to_string())
        .unwrap_or_default();

    if text.is_empty() {
        return positional_day_label(index);
    }

    let lowered = text.to_lowercase();
    UA_WEEKDAYS
        .iter()
        .find(|name| lowered.contains(&name.to_lowercase()))
        .map(|name| name.to_string())
        .unwrap_or(text)
}

/// Weekday name for a 1-based position
pub fn positional_day_label(index: usize) -> String {
    UA_WEEKDAYS[(index + 6) % 7].to_string()
}

fn read_day(value: &Value, index: usize, shape: SourceShape) -> Day {
    let meals: Vec<Meal> = value
        .get("meals")
        .and_then(Value::as_array)
        .map(|meals| meals.iter().map(|m| read_meal(m, shape)).collect())
        .unwrap_or_default();

    let (label, macros) = match shape {
        SourceShape::Canonical => {
            let label = lookup_text(value, &["day"])
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| positional_day_label(index));
            (label, canonical_day_macros(value, &meals))
        }
        SourceShape::Upstream => (
            normalize_day_label(first_non_empty(value, synonyms::DAY_LABEL), index),
            compute_day_macros(first_non_empty(value, synonyms::DAY_TOTALS), &meals),
        ),
    };

    Day {
        day: label,
        meals,
        macros,
    }
}

/// Resolve a day's totals
///
/// An explicit totals object is authoritative: each field is coerced to a
/// number and a missing field is `0`. Without one, every field is the sum of
/// that field over `meals`.
pub fn compute_day_macros(explicit: Option<&Value>, meals: &[Meal]) -> Macros {
    match explicit {
        Some(totals) => Macros {
            kcal: lookup_number(totals, synonyms::KCAL),
            protein_g: lookup_number(totals, synonyms::PROTEIN),
            fat_g: lookup_number(totals, synonyms::FAT),
            carbs_g: lookup_number(totals, synonyms::CARBS),
        },
        None => Macros::sum(meals.iter().map(|m| &m.macros)),
    }
}

/// Totals of an already canonical day, per field falling back to the meal sum
fn canonical_day_macros(day: &Value, meals: &[Meal]) -> Macros {
    let summed = Macros::sum(meals.iter().map(|m| &m.macros));
    let field = |key: &str, fallback: f64| -> f64 {
        first_non_empty(day, &[key]).map(to_number).unwrap_or(fallback)
    };

    Macros {
        kcal: field("kcal", summed.kcal),
        protein_g: field("protein_g", summed.protein_g),
        fat_g: field("fat_g", summed.fat_g),
        carbs_g: field("carbs_g", summed.carbs_g),
    }
}

/// Derive the plan's display meta
///
/// The title comes from `source_meta` or the default. Each macro comes from
/// `source_meta` when present and non-zero, otherwise it is the rounded mean of
/// the per-day totals (`0` when there are no days).
pub fn compute_plan_meta(source_meta: Option<&Value>, days: &[Day]) -> PlanMeta {
    let meta = source_meta.unwrap_or(&Value::Null);

    let average = |pick: fn(&Macros) -> f64| -> f64 {
        if days.is_empty() {
            return 0.0;
        }
        let total: f64 = days.iter().map(|d| pick(&d.macros)).sum();
        finite_or_zero(round_half_up(total / days.len() as f64))
    };
    let field = |keys: &[&str], pick: fn(&Macros) -> f64| -> f64 {
        let explicit = lookup_number(meta, keys);
        if explicit != 0.0 {
            explicit
        } else {
            average(pick)
        }
    };

    PlanMeta {
        title: lookup_text(meta, &["title"]).unwrap_or_else(|| DEFAULT_PLAN_TITLE.to_string()),
        macros: Macros {
            kcal: field(synonyms::KCAL, |m| m.kcal),
            protein_g: field(synonyms::PROTEIN, |m| m.protein_g),
            fat_g: field(synonyms::FAT, |m| m.fat_g),
            carbs_g: field(synonyms::CARBS, |m| m.carbs_g),
        },
    }
}

fn read_meal(value: &Value, shape: SourceShape) -> Meal {
    // Meals without a nested macros object keep all four fields at zero;
    // ingredient-level figures are not summed.
    let macros_source = match shape {
        SourceShape::Canonical => value,
        SourceShape::Upstream => first_non_empty(value, synonyms::MEAL_MACROS).unwrap_or(&Value::Null),
    };

    let ingredients = value
        .get("ingredients")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(|i| read_ingredient(i, shape)).collect())
        .unwrap_or_default();

    Meal {
        meal_type: lookup_text(value, synonyms::MEAL_TYPE).unwrap_or_default(),
        title: lookup_text(value, synonyms::MEAL_TITLE).unwrap_or_default(),
        description: lookup_text(value, synonyms::MEAL_DESCRIPTION).unwrap_or_default(),
        instructions: lookup_text(value, synonyms::MEAL_INSTRUCTIONS).unwrap_or_default(),
        ingredients,
        macros: Macros {
            kcal: lookup_number(macros_source, synonyms::KCAL),
            protein_g: lookup_number(macros_source, synonyms::PROTEIN),
            fat_g: lookup_number(macros_source, synonyms::FAT),
            carbs_g: lookup_number(macros_source, synonyms::CARBS),
        },
        swap_suggestions: value
            .get("swap_suggestions")
            .map(read_text_list)
            .unwrap_or_default(),
    }
}

fn read_ingredient(value: &Value, shape: SourceShape) -> Ingredient {
    if let Value::String(name) = value {
        return Ingredient {
            name: if name.is_empty() { MISSING_NAME.to_string() } else { name.clone() },
            qty: String::new(),
        };
    }

    let name = lookup_text(value, synonyms::INGREDIENT_NAME)
        .unwrap_or_else(|| MISSING_NAME.to_string());

    let qty = match shape {
        SourceShape::Canonical => lookup_text(value, &["qty"]).unwrap_or_default(),
        SourceShape::Upstream => format_ingredient_quantity(value),
    };

    Ingredient { name, qty }
}

/// Build an ingredient's display quantity
///
/// `"{quantity} {unit}"` from the first quantity field, with the default gram
/// unit when none is given; without any quantity, the free-text details.
pub fn format_ingredient_quantity(value: &Value) -> String {
    match first_non_empty(value, synonyms::INGREDIENT_QUANTITY) {
        Some(quantity) => {
            let quantity = match quantity {
                Value::Number(_) => format_number(to_number(quantity)),
                other => value_to_text(other).trim().to_string(),
            };
            let unit = lookup_text(value, synonyms::INGREDIENT_UNIT)
                .unwrap_or_else(|| DEFAULT_UNIT.to_string());
            if unit.is_empty() {
                quantity
            } else {
                format!("{quantity} {unit}")
            }
        }
        None => lookup_text(value, synonyms::INGREDIENT_DETAILS).unwrap_or_default(),
    }
}

fn read_text_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter(|v| !v.is_null())
            .map(value_to_text)
            .collect(),
        Value::String(s) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn read_shopping_list(value: &Value) -> ShoppingList {
    match value {
        Value::Array(items) => ShoppingList::Items(items.iter().map(read_shopping_item).collect()),
        Value::Object(categories) => ShoppingList::Categories(
            categories
                .iter()
                .map(|(category, items)| ShoppingCategory {
                    category: category.clone(),
                    items: read_category_items(items),
                })
                .collect(),
        ),
        _ => ShoppingList::default(),
    }
}

fn read_category_items(value: &Value) -> Vec<ShoppingItem> {
    match value {
        Value::Array(items) => items.iter().map(read_shopping_item).collect(),
        // `{ "Рис": 500 }` or `{ "Рис": { "quantity": 500, "unit": "г" } }`
        Value::Object(entries) => entries
            .iter()
            .map(|(name, v)| match v {
                Value::Object(_) => ShoppingItem {
                    name: name.clone(),
                    qty: lookup_text(v, synonyms::SHOPPING_ITEM_QTY),
                    unit: lookup_text(v, synonyms::SHOPPING_ITEM_UNIT),
                },
                other => ShoppingItem {
                    name: name.clone(),
                    qty: Some(value_to_text(other)).filter(|q| !q.is_empty()),
                    unit: None,
                },
            })
            .collect(),
        Value::Null => Vec::new(),
        other => vec![read_shopping_item(other)],
    }
}

fn read_shopping_item(value: &Value) -> ShoppingItem {
    match value {
        Value::Object(_) => ShoppingItem {
            name: lookup_text(value, synonyms::SHOPPING_ITEM_NAME)
                .unwrap_or_else(|| MISSING_NAME.to_string()),
            qty: lookup_text(value, synonyms::SHOPPING_ITEM_QTY),
            unit: lookup_text(value, synonyms::SHOPPING_ITEM_UNIT),
        },
        other => {
            let name = value_to_text(other);
            ShoppingItem {
                name: if name.is_empty() { MISSING_NAME.to_string() } else { name },
                qty: None,
                unit: None,
            }
        }
    }
}

impl<'de> Deserialize<'de> for Plan {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(normalize_plan(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_positional_label_wraps() {
        assert_eq!(positional_day_label(1), "Понеділок");
        assert_eq!(positional_day_label(7), "Неділя");
        assert_eq!(positional_day_label(8), "Понеділок");
    }

    #[test]
    fn test_blank_label_uses_position() {
        assert_eq!(normalize_day_label(Some(&json!("   ")), 3), "Середа");
        assert_eq!(normalize_day_label(Some(&json!(null)), 2), "Вівторок");
    }

    #[test]
    fn test_numeric_label_kept_verbatim() {
        assert_eq!(normalize_day_label(Some(&json!(3)), 1), "3");
    }

    #[test]
    fn test_day_label_from_day_of_week() {
        let plan = normalize_plan(&json!({
            "week_plan": [{"day_of_week": "Пʼятниця", "meals": []}]
        }));
        assert_eq!(plan.days[0].day, "Пʼятниця");
    }

    #[test]
    fn test_upstream_quantity_variants() {
        assert_eq!(format_ingredient_quantity(&json!({"raw_g": 80})), "80 г");
        assert_eq!(format_ingredient_quantity(&json!({"cooked_grams": 200})), "200 г");
        assert_eq!(
            format_ingredient_quantity(&json!({"quantity": 2, "unit": "шт"})),
            "2 шт"
        );
        assert_eq!(
            format_ingredient_quantity(&json!({"quantity": "", "quantity_raw_g": 40})),
            "40 г"
        );
        assert_eq!(format_ingredient_quantity(&json!({})), "");
    }

    #[test]
    fn test_raw_quantity_wins_over_cooked() {
        let qty = format_ingredient_quantity(&json!({"quantity_cooked_g": 300, "raw_grams": 100}));
        assert_eq!(qty, "100 г");
    }

    #[test]
    fn test_bare_string_ingredient() {
        let ingredient = read_ingredient(&json!("Сіль"), SourceShape::Upstream);
        assert_eq!(ingredient.name, "Сіль");
        assert_eq!(ingredient.qty, "");
    }

    #[test]
    fn test_meal_without_macros_object_is_zero() {
        let meal = read_meal(
            &json!({"title": "Салат", "kcal": 200, "ingredients": [{"item": "Огірок", "kcal": 30}]}),
            SourceShape::Upstream,
        );
        assert_eq!(meal.macros, Macros::default());
    }

    #[test]
    fn test_macros_from_nutritional_info() {
        let meal = read_meal(
            &json!({"nutritional_info": {"kcal": "410", "protein_g": 30, "fat_g": "bad", "carbs_g": 40}}),
            SourceShape::Upstream,
        );
        assert_eq!(meal.macros, Macros::new(410.0, 30.0, 0.0, 40.0));
    }

    #[test]
    fn test_daily_total_wins_over_meal_sum() {
        let plan = normalize_plan(&json!({
            "meal_plan": [{
                "day": "Понеділок",
                "daily_total": {"kcal": 1800, "protein_g": 0, "fat_g": 60, "carbs_g": 200},
                "meals": [{"macros": {"kcal": 500, "protein_g": 30, "fat_g": 20, "carbs_g": 50}}]
            }]
        }));
        assert_eq!(plan.days[0].macros, Macros::new(1800.0, 0.0, 60.0, 200.0));
    }

    #[test]
    fn test_shopping_category_object_entries() {
        let plan = normalize_plan(&json!({
            "meal_plan": [],
            "shopping_list": {
                "Крупи": {"Рис": {"quantity": 500, "unit": "г"}, "Гречка": 1},
                "Інше": ["Сіль", {"item": "Олія", "qty": "1", "unit": "пляшка"}]
            }
        }));
        match plan.shopping_list {
            ShoppingList::Categories(categories) => {
                assert_eq!(categories.len(), 2);
                assert_eq!(categories[0].category, "Крупи");
                assert_eq!(categories[0].items[0].to_string(), "Рис: 500 г");
                assert_eq!(categories[0].items[1].to_string(), "Гречка: 1");
                assert_eq!(categories[1].items[0].to_string(), "Сіль");
                assert_eq!(categories[1].items[1].to_string(), "Олія: 1 пляшка");
            }
            other => panic!("expected categories, got {other:?}"),
        }
    }

    #[test]
    fn test_text_envelope() {
        let inner = json!({"meal_plan": [{"day": "Неділя", "meals": []}]}).to_string();
        let plan = normalize_plan(&json!({ "text": inner }));
        assert_eq!(plan.days.len(), 1);
        assert_eq!(plan.days[0].day, "Неділя");
    }

    #[test]
    fn test_deserialize_goes_through_normalizer() {
        let plan: Plan = serde_json::from_str(r#"{"week_plan": [{"meals": []}]}"#).unwrap();
        assert_eq!(plan.days[0].day, "Понеділок");
        assert_eq!(plan.meta.title, DEFAULT_PLAN_TITLE);
    }
}
