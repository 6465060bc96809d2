//! Inline keyboard callback payloads
//!
//! Indices are zero-based positions in the open session. Meal types are looked
//! up from the session instead of being embedded, which keeps every payload
//! well under Telegram's 64-byte limit.

/// Action requested by an inline keyboard button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanCallback {
    /// Switch to a day tab
    Day(usize),
    /// Replace one meal of a day
    SwapMeal { day: usize, meal: usize },
    /// Replace a whole day
    SwapDay(usize),
    /// Regenerate the whole plan
    SwapPlan,
    /// Show the shopping list
    Shopping,
}

impl PlanCallback {
    /// Parse callback data produced by [`PlanCallback::to_data`]
    pub fn parse(data: &str) -> Option<Self> {
        let mut parts = data.split(':');
        let kind = parts.next()?;
        let mut index = || parts.next().and_then(|p| p.parse::<usize>().ok());

        let callback = match kind {
            "day" => PlanCallback::Day(index()?),
            "swap_meal" => {
                let day = index()?;
                let meal = index()?;
                PlanCallback::SwapMeal { day, meal }
            }
            "swap_day" => PlanCallback::SwapDay(index()?),
            "swap_plan" => PlanCallback::SwapPlan,
            "shop" => PlanCallback::Shopping,
            _ => return None,
        };

        // Trailing segments mean the payload came from somewhere else
        if parts.next().is_some() {
            return None;
        }
        Some(callback)
    }

    pub fn to_data(&self) -> String {
        match self {
            PlanCallback::Day(day) => format!("day:{day}"),
            PlanCallback::SwapMeal { day, meal } => format!("swap_meal:{day}:{meal}"),
            PlanCallback::SwapDay(day) => format!("swap_day:{day}"),
            PlanCallback::SwapPlan => "swap_plan".to_string(),
            PlanCallback::Shopping => "shop".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_payloads() {
        assert_eq!(PlanCallback::parse("day:3"), Some(PlanCallback::Day(3)));
        assert_eq!(
            PlanCallback::parse("swap_meal:1:2"),
            Some(PlanCallback::SwapMeal { day: 1, meal: 2 })
        );
        assert_eq!(PlanCallback::parse("swap_day:6"), Some(PlanCallback::SwapDay(6)));
        assert_eq!(PlanCallback::parse("swap_plan"), Some(PlanCallback::SwapPlan));
        assert_eq!(PlanCallback::parse("shop"), Some(PlanCallback::Shopping));
    }

    #[test]
    fn test_parse_rejects_malformed_payloads() {
        assert_eq!(PlanCallback::parse(""), None);
        assert_eq!(PlanCallback::parse("day"), None);
        assert_eq!(PlanCallback::parse("day:-1"), None);
        assert_eq!(PlanCallback::parse("swap_meal:1"), None);
        assert_eq!(PlanCallback::parse("shop:1"), None);
        assert_eq!(PlanCallback::parse("edit_0"), None);
    }

    #[test]
    fn test_payloads_fit_telegram_limit() {
        let widest = PlanCallback::SwapMeal {
            day: usize::MAX,
            meal: usize::MAX,
        };
        assert!(widest.to_data().len() <= 64);
        assert_eq!(PlanCallback::parse(&widest.to_data()), Some(widest));
    }
}
