//! # Normalizer Tests
//!
//! End-to-end checks of plan normalization over realistic upstream payloads.

use mealplan::plan_model::{Macros, Plan, ShoppingList, DEFAULT_PLAN_TITLE};
use mealplan::plan_normalizer::{compute_day_macros, compute_plan_meta, normalize_plan, normalize_plan_str};
use serde_json::{json, Value};

fn upstream_week() -> Value {
    json!({
        "meta": {"title": "Схуднення, тиждень 1", "kcal": 0},
        "meal_plan": [
            {
                "day": "day 1",
                "meals": [
                    {
                        "meal_type": "breakfast",
                        "dish_name": "Вівсянка з ягодами",
                        "desc": "Тепла і ситна",
                        "preparation_instructions": "Залити вівсянку молоком.\nДодати ягоди.",
                        "ingredients": [
                            {"item": "Rice", "quantity_raw_g": 150},
                            {"name": "Egg", "quantity_details": "2 pcs"},
                            "Сіль"
                        ],
                        "nutritional_info": {"kcal": "320.5", "protein_g": 12, "fat_g": 8, "carbs_g": 50},
                        "swap_suggestions": ["Гречка з молоком"]
                    },
                    {
                        "meal_type": "lunch",
                        "title": "Борщ",
                        "macros": {"kcal": 450, "protein_g": 20, "fat_g": 15, "carbs_g": 55}
                    }
                ]
            },
            {
                "day": "",
                "daily_total": {"kcal": 0, "protein_g": 90},
                "meals": [
                    {"meal_type": "dinner", "meal_name": "Риба", "macros": {"kcal": 500, "protein_g": 40, "fat_g": 20, "carbs_g": 10}}
                ]
            },
            {
                "day_of_week": "вівторок",
                "meals": []
            }
        ],
        "shopping_list": {
            "Крупи": [{"name": "Вівсянка", "qty": 500, "unit": "г"}],
            "Риба": {"Хек": {"quantity": 1, "unit": "кг"}}
        },
        "prep_tips": ["Зваріть крупи заздалегідь"],
        "safety": {"allergens": ["fish"]}
    })
}

#[test]
fn test_normalization_is_idempotent() {
    let once = normalize_plan(&upstream_week());
    let twice = normalize_plan(&once.to_value());
    assert_eq!(once, twice);

    let thrice = normalize_plan(&twice.to_value());
    assert_eq!(twice.to_value(), thrice.to_value());
}

#[test]
fn test_idempotence_for_json_string_input() {
    let once = normalize_plan_str(&upstream_week().to_string());
    let twice = normalize_plan_str(&serde_json::to_string(&once).unwrap());
    assert_eq!(once, twice);
}

#[test]
fn test_idempotence_for_empty_plan() {
    let once = normalize_plan(&json!({"unexpected": true}));
    let twice = normalize_plan(&once.to_value());
    assert_eq!(once, twice);
    assert!(twice.days.is_empty());
}

#[test]
fn test_day_labels() {
    let plan = normalize_plan(&upstream_week());
    // No weekday inside: kept verbatim
    assert_eq!(plan.days[0].day, "day 1");
    // Blank: positional weekday of the second day
    assert_eq!(plan.days[1].day, "Вівторок");
    // Case-insensitive match against the vocabulary
    assert_eq!(plan.days[2].day, "Вівторок");
}

#[test]
fn test_explicit_daily_total_is_authoritative() {
    let plan = normalize_plan(&upstream_week());
    let day = &plan.days[1];
    // Explicit zero kept, fields missing from daily_total are 0, not meal sums
    assert_eq!(day.macros.kcal, 0.0);
    assert_eq!(day.macros.protein_g, 90.0);
    assert_eq!(day.macros.fat_g, 0.0);
    assert_eq!(day.macros.carbs_g, 0.0);
}

#[test]
fn test_day_totals_fall_back_to_meal_sum() {
    let plan = normalize_plan(&upstream_week());
    assert_eq!(plan.days[0].macros, Macros::new(770.5, 32.0, 23.0, 105.0));
}

#[test]
fn test_zero_meal_siblings_are_summed_without_explicit_totals() {
    let meals = normalize_plan(&json!({
        "meal_plan": [{"meals": [
            {"macros": {"kcal": 0, "protein_g": 0, "fat_g": 0, "carbs_g": 0}},
            {"macros": {"kcal": 250, "protein_g": 10, "fat_g": 5, "carbs_g": 30}}
        ]}]
    }))
    .days
    .remove(0)
    .meals;

    assert_eq!(compute_day_macros(None, &meals), Macros::new(250.0, 10.0, 5.0, 30.0));
    assert_eq!(
        compute_day_macros(Some(&json!({"kcal": 0})), &meals),
        Macros::default()
    );
    assert_eq!(
        compute_day_macros(Some(&json!({"kcal": "1900", "fat_g": "abc"})), &meals),
        Macros::new(1900.0, 0.0, 0.0, 0.0)
    );
}

#[test]
fn test_canonical_day_missing_fields_fall_back_to_meal_sum() {
    let plan = normalize_plan(&json!({
        "days": [{"day": "Понеділок", "kcal": 1200, "meals": [
            {"meal_type": "lunch", "kcal": 600, "protein_g": 30, "fat_g": 20, "carbs_g": 70}
        ]}]
    }));
    assert_eq!(plan.days[0].macros, Macros::new(1200.0, 30.0, 20.0, 70.0));
}

#[test]
fn test_overflowing_totals_stay_finite() {
    let plan = normalize_plan(&json!({
        "meal_plan": [
            {"meals": [
                {"macros": {"kcal": 1e308, "protein_g": 10, "fat_g": 1, "carbs_g": 1}},
                {"macros": {"kcal": 1e308, "protein_g": 10, "fat_g": 1, "carbs_g": 1}}
            ]},
            {"daily_total": {"kcal": 1.7e308}, "meals": []},
            {"daily_total": {"kcal": 1.7e308}, "meals": []}
        ]
    }));

    let day = &plan.days[0];
    assert!(day.macros.kcal.is_finite());
    assert_eq!(day.macros.kcal, 0.0);
    assert_eq!(day.macros.protein_g, 20.0);

    for day in &plan.days {
        assert!(day.macros.kcal.is_finite());
    }
    assert!(plan.meta.macros.kcal.is_finite());
    assert!(plan.meta.macros.protein_g.is_finite());

    // The cached form round-trips without losing numbers to null
    let value = plan.to_value();
    assert!(value["meta"]["kcal"].is_number());
    assert_eq!(normalize_plan(&value), plan);
}

#[test]
fn test_ingredient_quantities() {
    let plan = normalize_plan(&upstream_week());
    let ingredients = &plan.days[0].meals[0].ingredients;
    assert_eq!(ingredients[0].name, "Rice");
    assert_eq!(ingredients[0].qty, "150 г");
    assert_eq!(ingredients[1].name, "Egg");
    assert_eq!(ingredients[1].qty, "2 pcs");
    assert_eq!(ingredients[2].name, "Сіль");
    assert_eq!(ingredients[2].qty, "");
}

#[test]
fn test_meal_fields_resolved_through_synonyms() {
    let plan = normalize_plan(&upstream_week());
    let breakfast = &plan.days[0].meals[0];
    assert_eq!(breakfast.meal_type, "breakfast");
    assert_eq!(breakfast.title, "Вівсянка з ягодами");
    assert_eq!(breakfast.description, "Тепла і ситна");
    assert!(breakfast.instructions.starts_with("Залити"));
    assert_eq!(breakfast.macros.kcal, 320.5);
    assert_eq!(breakfast.swap_suggestions, vec!["Гречка з молоком".to_string()]);
    assert_eq!(plan.days[1].meals[0].title, "Риба");
}

#[test]
fn test_meta_mean_of_day_totals() {
    let plan = normalize_plan(&json!({
        "meal_plan": [
            {"daily_total": {"kcal": 500}, "meals": []},
            {"daily_total": {"kcal": 700}, "meals": []}
        ]
    }));
    assert_eq!(plan.meta.macros.kcal, 600.0);
    assert_eq!(plan.meta.title, DEFAULT_PLAN_TITLE);
}

#[test]
fn test_meta_rounds_half_up_and_keeps_source_values() {
    let days = normalize_plan(&json!({
        "meal_plan": [
            {"daily_total": {"kcal": 500, "protein_g": 1}, "meals": []},
            {"daily_total": {"kcal": 501, "protein_g": 2}, "meals": []}
        ]
    }))
    .days;

    let meta = compute_plan_meta(Some(&json!({"title": "Мій план", "fat_g": 70})), &days);
    assert_eq!(meta.title, "Мій план");
    assert_eq!(meta.macros.kcal, 501.0);
    assert_eq!(meta.macros.protein_g, 2.0);
    assert_eq!(meta.macros.fat_g, 70.0);
    assert_eq!(meta.macros.carbs_g, 0.0);
}

#[test]
fn test_source_meta_title_is_used() {
    let plan = normalize_plan(&upstream_week());
    assert_eq!(plan.meta.title, "Схуднення, тиждень 1");
    // Explicit zero falls back to the mean of 770.5, 0 and 0
    assert_eq!(plan.meta.macros.kcal, 257.0);
}

#[test]
fn test_malformed_json_yields_default_plan() {
    let plan = normalize_plan_str("{\"meal_plan\": [");
    assert_eq!(plan, Plan::empty());
    assert_eq!(plan.meta.title, DEFAULT_PLAN_TITLE);
    assert!(plan.days.is_empty());

    for raw in [json!(null), json!(42), json!([1, 2]), json!({"days": "nope"})] {
        let plan = normalize_plan(&raw);
        assert!(plan.days.is_empty(), "expected no days for {raw}");
    }
}

#[test]
fn test_non_finite_and_garbage_numbers_become_zero() {
    let plan = normalize_plan(&json!({
        "meal_plan": [{"meals": [
            {"macros": {"kcal": "NaN", "protein_g": "abc", "fat_g": null, "carbs_g": "1e400"}}
        ]}]
    }));
    assert_eq!(plan.days[0].meals[0].macros, Macros::default());
}

#[test]
fn test_plan_level_pass_through_fields() {
    let plan = normalize_plan(&upstream_week());
    assert_eq!(plan.notes, vec!["Зваріть крупи заздалегідь".to_string()]);
    assert_eq!(plan.safety.get("allergens"), Some(&json!(["fish"])));

    match &plan.shopping_list {
        ShoppingList::Categories(categories) => {
            assert_eq!(categories[0].category, "Крупи");
            assert_eq!(categories[0].items[0].to_string(), "Вівсянка: 500 г");
            assert_eq!(categories[1].items[0].to_string(), "Хек: 1 кг");
        }
        other => panic!("expected categories, got {other:?}"),
    }
}

#[test]
fn test_canonical_input_keeps_stored_values() {
    let canonical = json!({
        "meta": {"title": "T", "kcal": 1000, "protein_g": 0, "fat_g": 0, "carbs_g": 0},
        "days": [
            {"day": "Cheat day", "kcal": 1000, "protein_g": 0, "fat_g": 0, "carbs_g": 0,
             "meals": [{"meal_type": "x", "title": "Піца", "kcal": 900, "protein_g": 30, "fat_g": 40, "carbs_g": 100,
                        "ingredients": [{"name": "Тісто", "qty": "300 г"}]}]}
        ]
    });
    let plan = normalize_plan(&canonical);
    assert_eq!(plan.days[0].day, "Cheat day");
    assert_eq!(plan.days[0].macros, Macros::new(1000.0, 0.0, 0.0, 0.0));
    assert_eq!(plan.days[0].meals[0].ingredients[0].qty, "300 г");
    assert_eq!(plan.days[0].meals[0].macros.kcal, 900.0);
}
