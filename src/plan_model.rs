//! # Meal Plan Data Model
//!
//! This module defines the canonical weekly meal plan produced by the
//! normalizer and consumed by the renderer. Every upstream payload shape ends
//! up as a [`Plan`], so the bot never has to look at raw JSON again.
//!
//! ## Core Concepts
//!
//! - **Plan**: display meta, ordered days, shopping list, notes and safety info
//! - **Day**: a labelled tab with meals and daily macro totals
//! - **Meal**: one slot of the day; `meal_type` is the key sent back on swaps
//! - **Macros**: kcal, protein, fat and carbs, always finite
//!
//! ## Usage
//!
//! ```rust
//! use mealplan::plan_model::{Day, Macros, Meal};
//!
//! let breakfast = Meal {
//!     meal_type: "breakfast".to_string(),
//!     title: "Вівсянка".to_string(),
//!     macros: Macros::new(350.0, 12.0, 8.0, 55.0),
//!     ..Default::default()
//! };
//! let day = Day::new("Понеділок", vec![breakfast]);
//! assert_eq!(day.macros.kcal, 350.0);
//! ```

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::field_lookup::finite_or_zero;

/// Title used when the source does not provide one
pub const DEFAULT_PLAN_TITLE: &str = "План харчування";

/// The four tracked nutrition numbers
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Macros {
    pub kcal: f64,
    pub protein_g: f64,
    pub fat_g: f64,
    pub carbs_g: f64,
}

impl Macros {
    pub fn new(kcal: f64, protein_g: f64, fat_g: f64, carbs_g: f64) -> Self {
        Self {
            kcal,
            protein_g,
            fat_g,
            carbs_g,
        }
    }

    /// Whether any of the four fields is non-zero
    pub fn has_any(&self) -> bool {
        self.kcal != 0.0 || self.protein_g != 0.0 || self.fat_g != 0.0 || self.carbs_g != 0.0
    }

    /// Field-wise sum over an iterator of macros
    ///
    /// A field whose sum overflows is `0`.
    pub fn sum<'a, I>(items: I) -> Self
    where
        I: IntoIterator<Item = &'a Macros>,
    {
        items
            .into_iter()
            .fold(Macros::default(), |acc, m| Macros {
                kcal: acc.kcal + m.kcal,
                protein_g: acc.protein_g + m.protein_g,
                fat_g: acc.fat_g + m.fat_g,
                carbs_g: acc.carbs_g + m.carbs_g,
            })
            .finite()
    }

    /// Replace every non-finite field with `0`
    pub fn finite(self) -> Self {
        Macros {
            kcal: finite_or_zero(self.kcal),
            protein_g: finite_or_zero(self.protein_g),
            fat_g: finite_or_zero(self.fat_g),
            carbs_g: finite_or_zero(self.carbs_g),
        }
    }
}

/// Plan-level display totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanMeta {
    pub title: String,
    #[serde(flatten)]
    pub macros: Macros,
}

impl Default for PlanMeta {
    fn default() -> Self {
        Self {
            title: DEFAULT_PLAN_TITLE.to_string(),
            macros: Macros::default(),
        }
    }
}

/// A single ingredient line of a meal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    /// Ingredient name, `—` when the source has none
    pub name: String,
    /// Display quantity with unit (e.g. "150 г", "2 pcs"), may be empty
    pub qty: String,
}

/// One meal slot of a day
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    /// Slot identifier sent back verbatim on a "replace meal" action
    pub meal_type: String,
    pub title: String,
    pub description: String,
    pub instructions: String,
    pub ingredients: Vec<Ingredient>,
    #[serde(flatten)]
    pub macros: Macros,
    pub swap_suggestions: Vec<String>,
}

impl Meal {
    /// Title to show on cards and buttons, falling back to the slot name
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.meal_type
        } else {
            &self.title
        }
    }
}

/// One tab of the weekly plan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Day {
    /// Display label (canonical weekday name where recognised)
    pub day: String,
    pub meals: Vec<Meal>,
    #[serde(flatten)]
    pub macros: Macros,
}

impl Day {
    /// Build a day whose totals are the sum of its meals
    pub fn new(label: impl Into<String>, meals: Vec<Meal>) -> Self {
        let macros = Macros::sum(meals.iter().map(|m| &m.macros));
        Self {
            day: label.into(),
            meals,
            macros,
        }
    }
}

/// A shopping list entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShoppingItem {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl fmt::Display for ShoppingItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        // A zero quantity reads as "no quantity"
        let shown = |q: &&str| !q.is_empty() && q.trim().parse::<f64>().map_or(true, |n| n != 0.0);
        if let Some(qty) = self.qty.as_deref().filter(shown) {
            write!(f, ": {qty}")?;
            if let Some(unit) = self.unit.as_deref().filter(|u| !u.is_empty()) {
                write!(f, " {unit}")?;
            }
        }
        Ok(())
    }
}

/// Shopping list in either of its two legal shapes
///
/// Serializes as a JSON array or as a JSON object keyed by category.
#[derive(Debug, Clone, PartialEq)]
pub enum ShoppingList {
    /// Flat ordered list
    Items(Vec<ShoppingItem>),
    /// Category name to items, in source order
    Categories(Vec<ShoppingCategory>),
}

/// Named group of shopping items
#[derive(Debug, Clone, PartialEq)]
pub struct ShoppingCategory {
    pub category: String,
    pub items: Vec<ShoppingItem>,
}

impl Default for ShoppingList {
    fn default() -> Self {
        ShoppingList::Items(Vec::new())
    }
}

impl Serialize for ShoppingList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ShoppingList::Items(items) => items.serialize(serializer),
            ShoppingList::Categories(categories) => {
                let mut map = serializer.serialize_map(Some(categories.len()))?;
                for category in categories {
                    map.serialize_entry(&category.category, &category.items)?;
                }
                map.end()
            }
        }
    }
}

impl ShoppingList {
    /// True when there is nothing to show
    pub fn is_empty(&self) -> bool {
        match self {
            ShoppingList::Items(items) => items.is_empty(),
            ShoppingList::Categories(categories) => categories.is_empty(),
        }
    }
}

/// Canonical weekly meal plan
///
/// Deserializing goes through the normalizer, so any accepted payload shape
/// can be read straight into a `Plan`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Plan {
    pub meta: PlanMeta,
    pub days: Vec<Day>,
    pub shopping_list: ShoppingList,
    pub notes: Vec<String>,
    pub safety: Map<String, Value>,
}

impl Plan {
    /// Empty plan with the default title
    pub fn empty() -> Self {
        Self::default()
    }

    /// A plan is usable for rendering only when it has at least one day
    pub fn has_days(&self) -> bool {
        !self.days.is_empty()
    }

    /// Canonical JSON form, readable back through the normalizer
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
