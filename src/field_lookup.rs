//! # Field Lookup Module
//!
//! Upstream plan payloads name the same field in several ways (`title`,
//! `dish_name`, `meal_name`, ...). This module keeps every synonym list as a
//! plain table and provides one resolver that walks a table in priority order.
//! Recognising a new upstream field name is a one-line table edit.
//!
//! It also holds the lenient scalar coercions used by the normalizer: any value
//! that does not convert to a finite number becomes `0`.

use serde_json::Value;

/// Ordered synonym lists, highest priority first
pub mod synonyms {
    /// Source day arrays, checked when no canonical `days` array exists
    pub const SOURCE_DAYS: &[&str] = &["meal_plan", "week_plan"];
    /// Day display label
    pub const DAY_LABEL: &[&str] = &["day", "day_of_week"];
    /// Explicit per-day totals object
    pub const DAY_TOTALS: &[&str] = &["daily_total", "daily_totals"];

    /// Meal slot identifier
    pub const MEAL_TYPE: &[&str] = &["meal_type"];
    /// Meal display name
    pub const MEAL_TITLE: &[&str] = &["title", "name", "dish_name", "meal_name"];
    pub const MEAL_DESCRIPTION: &[&str] = &["description", "desc"];
    pub const MEAL_INSTRUCTIONS: &[&str] = &["instructions", "preparation_instructions"];
    /// Nested macros object
    pub const MEAL_MACROS: &[&str] = &["macros", "nutritional_info"];

    pub const INGREDIENT_NAME: &[&str] = &["item", "name"];
    /// Numeric quantity, raw gram variants before cooked ones
    pub const INGREDIENT_QUANTITY: &[&str] = &[
        "quantity",
        "qty",
        "quantity_raw_g",
        "raw_grams",
        "raw_g",
        "quantity_cooked_g",
        "cooked_grams",
        "cooked_g",
    ];
    pub const INGREDIENT_UNIT: &[&str] = &["unit"];
    /// Free-text quantity used when no numeric quantity exists
    pub const INGREDIENT_DETAILS: &[&str] = &["quantity_details"];

    pub const SHOPPING_ITEM_NAME: &[&str] = &["name", "item"];
    pub const SHOPPING_ITEM_QTY: &[&str] = &["qty", "quantity"];
    pub const SHOPPING_ITEM_UNIT: &[&str] = &["unit"];

    pub const PLAN_NOTES: &[&str] = &["prep_tips", "notes"];

    pub const KCAL: &[&str] = &["kcal"];
    pub const PROTEIN: &[&str] = &["protein_g"];
    pub const FAT: &[&str] = &["fat_g"];
    pub const CARBS: &[&str] = &["carbs_g"];
}

/// Default unit appended to a quantity that comes without one
pub const DEFAULT_UNIT: &str = "г";

/// Whether a value counts as present: not null and not an empty string
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Loose truthiness: `null`, `false`, `0` and `""` are false
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Return the first value among `keys` that is present on `obj`
///
/// Later keys are only consulted when every earlier key is absent, null or an
/// empty string. Non-object inputs never match.
///
/// # Examples
///
/// ```rust
/// use mealplan::field_lookup::{first_non_empty, synonyms};
/// use serde_json::json;
///
/// let meal = json!({"title": "", "name": null, "dish_name": "Борщ"});
/// let title = first_non_empty(&meal, synonyms::MEAL_TITLE);
/// assert_eq!(title, Some(&json!("Борщ")));
/// ```
pub fn first_non_empty<'a>(obj: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .find(|value| is_present(value))
}

/// First present value rendered as display text
pub fn lookup_text(obj: &Value, keys: &[&str]) -> Option<String> {
    first_non_empty(obj, keys).map(value_to_text)
}

/// First present value coerced to a finite number, `0` when absent
pub fn lookup_number(obj: &Value, keys: &[&str]) -> f64 {
    first_non_empty(obj, keys).map(to_number).unwrap_or(0.0)
}

/// Coerce a JSON value to a finite number
///
/// Follows loose numeric conversion: numeric strings parse (surrounding
/// whitespace ignored, empty string is `0`), booleans are `0`/`1`, a
/// single-element array converts its element. Anything that does not yield a
/// finite number becomes `0`.
pub fn to_number(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().unwrap_or(0.0)
            }
        }
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Array(items) if items.len() == 1 => to_number(&items[0]),
        _ => 0.0,
    };

    finite_or_zero(n)
}

/// `n` itself when finite, otherwise `0`
pub fn finite_or_zero(n: f64) -> f64 {
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

/// Render a JSON scalar the way it reads on screen
///
/// Strings are kept verbatim, whole numbers lose their fractional part,
/// `null` is empty, and composite values fall back to compact JSON.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                format_number(n.as_f64().unwrap_or(0.0))
            }
        }
        other => other.to_string(),
    }
}

/// Format a number without a trailing `.0` for whole values
pub fn format_number(n: f64) -> String {
    if !n.is_finite() {
        return "0".to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Round half up to the nearest integer
pub fn round_half_up(n: f64) -> f64 {
    (n + 0.5).floor()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_non_empty_respects_priority() {
        let obj = json!({"name": "Name", "title": "Title"});
        assert_eq!(first_non_empty(&obj, synonyms::MEAL_TITLE), Some(&json!("Title")));
    }

    #[test]
    fn test_first_non_empty_skips_null_and_empty_string() {
        let obj = json!({"title": null, "name": "", "dish_name": 0});
        // zero is a present value
        assert_eq!(first_non_empty(&obj, synonyms::MEAL_TITLE), Some(&json!(0)));
    }

    #[test]
    fn test_first_non_empty_on_non_object() {
        assert_eq!(first_non_empty(&json!("text"), synonyms::MEAL_TITLE), None);
        assert_eq!(first_non_empty(&Value::Null, synonyms::MEAL_TITLE), None);
    }

    #[test]
    fn test_empty_object_counts_as_present() {
        let meal = json!({"macros": {}, "nutritional_info": {"kcal": 100}});
        assert_eq!(first_non_empty(&meal, synonyms::MEAL_MACROS), Some(&json!({})));
    }

    #[test]
    fn test_to_number_coercion() {
        assert_eq!(to_number(&json!(12.5)), 12.5);
        assert_eq!(to_number(&json!(" 42 ")), 42.0);
        assert_eq!(to_number(&json!("")), 0.0);
        assert_eq!(to_number(&json!("12abc")), 0.0);
        assert_eq!(to_number(&json!("NaN")), 0.0);
        assert_eq!(to_number(&json!("inf")), 0.0);
        assert_eq!(to_number(&json!(true)), 1.0);
        assert_eq!(to_number(&json!(null)), 0.0);
        assert_eq!(to_number(&json!([7])), 7.0);
        assert_eq!(to_number(&json!([1, 2])), 0.0);
        assert_eq!(to_number(&json!({"kcal": 1})), 0.0);
    }

    #[test]
    fn test_lookup_number_missing_is_zero() {
        let obj = json!({"fat_g": "9"});
        assert_eq!(lookup_number(&obj, synonyms::KCAL), 0.0);
        assert_eq!(lookup_number(&obj, synonyms::FAT), 9.0);
    }

    #[test]
    fn test_value_to_text() {
        assert_eq!(value_to_text(&json!(150)), "150");
        assert_eq!(value_to_text(&json!(1.5)), "1.5");
        assert_eq!(value_to_text(&json!(150.0)), "150");
        assert_eq!(value_to_text(&json!("2 pcs")), "2 pcs");
        assert_eq!(value_to_text(&Value::Null), "");
    }

    #[test]
    fn test_is_truthy() {
        assert!(is_truthy(&json!(true)));
        assert!(is_truthy(&json!({})));
        assert!(is_truthy(&json!("yes")));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&Value::Null));
    }

    #[test]
    fn test_finite_or_zero() {
        assert_eq!(finite_or_zero(12.5), 12.5);
        assert_eq!(finite_or_zero(f64::INFINITY), 0.0);
        assert_eq!(finite_or_zero(f64::NEG_INFINITY), 0.0);
        assert_eq!(finite_or_zero(f64::NAN), 0.0);
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(600.5), 601.0);
        assert_eq!(round_half_up(600.49), 600.0);
        assert_eq!(round_half_up(-0.5), 0.0);
    }
}
