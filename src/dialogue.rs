//! Plan viewing dialogue: the per-chat view model of the currently open plan.

use serde::{Deserialize, Serialize};
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};

use crate::plan_model::{Day, Meal, Plan};
use crate::plan_source::PlanLocator;

/// Everything needed to render and act on the open plan
///
/// A session is replaced wholesale on every successful load or swap; only the
/// selected day and the message id change in place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlanSession {
    pub plan: Plan,
    pub locator: PlanLocator,
    /// Zero-based index of the day tab being shown
    pub current_day: usize,
    pub language_code: Option<String>,
    /// Message holding the rendered plan, edited on tab switches
    pub message_id: Option<i32>,
}

impl PlanSession {
    /// Fresh session on the first day of `plan`
    pub fn new(plan: Plan, locator: PlanLocator, language_code: Option<String>) -> Self {
        Self {
            plan,
            locator,
            current_day: 0,
            language_code,
            message_id: None,
        }
    }

    /// Replace the plan after a swap, keeping the selected day when it still exists
    pub fn with_plan(self, plan: Plan) -> Self {
        let current_day = if self.current_day < plan.days.len() {
            self.current_day
        } else {
            0
        };
        Self {
            plan,
            current_day,
            ..self
        }
    }

    pub fn day(&self, index: usize) -> Option<&Day> {
        self.plan.days.get(index)
    }

    pub fn current(&self) -> Option<&Day> {
        self.day(self.current_day)
    }

    pub fn meal(&self, day_index: usize, meal_index: usize) -> Option<&Meal> {
        self.day(day_index).and_then(|d| d.meals.get(meal_index))
    }
}

/// Represents the conversation state for plan viewing
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub enum PlanDialogueState {
    #[default]
    Start,
    ViewingPlan {
        session: PlanSession,
    },
}

/// Type alias for our plan dialogue
pub type PlanDialogue = Dialogue<PlanDialogueState, InMemStorage<PlanDialogueState>>;

/// Validates a day tab index against the open plan
pub fn validate_day_index(session: &PlanSession, index: usize) -> Result<usize, &'static str> {
    if session.plan.days.is_empty() {
        return Err("empty");
    }
    if index >= session.plan.days.len() {
        return Err("out_of_range");
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan_model::Day;

    fn session_with_days(count: usize) -> PlanSession {
        let plan = Plan {
            days: (0..count).map(|i| Day::new(format!("Day {i}"), Vec::new())).collect(),
            ..Default::default()
        };
        PlanSession::new(
            plan,
            PlanLocator::Sheet {
                user_id: "1".to_string(),
            },
            Some("uk".to_string()),
        )
    }

    #[test]
    fn test_day_index_validation() {
        let session = session_with_days(3);
        assert_eq!(validate_day_index(&session, 2), Ok(2));
        assert_eq!(validate_day_index(&session, 3), Err("out_of_range"));
        assert_eq!(validate_day_index(&session_with_days(0), 0), Err("empty"));
    }

    #[test]
    fn test_with_plan_keeps_selected_day() {
        let mut session = session_with_days(7);
        session.current_day = 4;
        let replaced = session.clone().with_plan(session_with_days(7).plan);
        assert_eq!(replaced.current_day, 4);

        let shorter = session.with_plan(session_with_days(2).plan);
        assert_eq!(shorter.current_day, 0);
    }
}
