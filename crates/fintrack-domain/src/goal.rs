//! Savings goals and the status derived from their progress.

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::budget::percentage;
use crate::category::{GoalCategory, ParseLabelError};
use crate::common::*;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GoalStatus {
    #[default]
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
    Cancelled,
}

impl GoalStatus {
    /// Status implied by the amounts alone. Cancelled is never derived.
    pub fn derive(current_amount: Decimal, target_amount: Decimal) -> Self {
        if current_amount >= target_amount {
            GoalStatus::Completed
        } else {
            GoalStatus::InProgress
        }
    }
}

impl fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            GoalStatus::InProgress => "In Progress",
            GoalStatus::Completed => "Completed",
            GoalStatus::Cancelled => "Cancelled",
        };
        f.write_str(label)
    }
}

impl FromStr for GoalStatus {
    type Err = ParseLabelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "in progress" | "inprogress" => Ok(GoalStatus::InProgress),
            "completed" => Ok(GoalStatus::Completed),
            "cancelled" => Ok(GoalStatus::Cancelled),
            _ => Err(ParseLabelError {
                kind: "goal status",
                value: value.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: Uuid,
    pub owner_id: OwnerId,
    pub name: String,
    pub target_amount: Decimal,
    pub current_amount: Decimal,
    pub start_date: NaiveDate,
    pub target_date: NaiveDate,
    pub category: GoalCategory,
    pub status: GoalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Goal {
    pub fn new(owner_id: OwnerId, data: NewGoal, now: DateTime<Utc>) -> Self {
        let current_amount = data.current_amount.unwrap_or(Decimal::ZERO);
        let mut goal = Self {
            id: Uuid::new_v4(),
            owner_id,
            name: data.name.trim().to_string(),
            target_amount: data.target_amount,
            current_amount,
            start_date: data.start_date,
            target_date: data.target_date,
            category: data.category,
            status: GoalStatus::InProgress,
            created_at: now,
            updated_at: now,
        };
        goal.refresh_status();
        goal
    }

    /// Re-derives the status from the amounts. Cancelled goals stay cancelled.
    pub fn refresh_status(&mut self) {
        if self.status != GoalStatus::Cancelled {
            self.status = GoalStatus::derive(self.current_amount, self.target_amount);
        }
    }

    pub fn set_progress(&mut self, current_amount: Decimal, now: DateTime<Utc>) {
        self.current_amount = current_amount;
        self.updated_at = now;
        self.refresh_status();
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) {
        self.status = GoalStatus::Cancelled;
        self.updated_at = now;
    }

    pub fn progress_percentage(&self) -> Decimal {
        percentage(self.current_amount, self.target_amount)
    }

    pub fn remaining(&self) -> Decimal {
        (self.target_amount - self.current_amount).max(Decimal::ZERO)
    }
}

impl Identifiable for Goal {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Owned for Goal {
    fn owner_id(&self) -> OwnerId {
        self.owner_id
    }
}

impl Displayable for Goal {
    fn display_label(&self) -> String {
        format!("{} [{}]", self.name, self.status)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewGoal {
    pub name: String,
    pub target_amount: Decimal,
    #[serde(default)]
    pub current_amount: Option<Decimal>,
    pub start_date: NaiveDate,
    pub target_date: NaiveDate,
    pub category: GoalCategory,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoalPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<GoalCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<GoalStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn goal(current: Option<Decimal>) -> Goal {
        Goal::new(
            OwnerId::new(),
            NewGoal {
                name: "Trip".into(),
                target_amount: dec!(1000),
                current_amount: current,
                start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                target_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
                category: GoalCategory::Vacation,
            },
            Utc::now(),
        )
    }

    #[test]
    fn status_follows_progress_both_ways() {
        let mut goal = goal(None);
        assert_eq!(goal.status, GoalStatus::InProgress);
        goal.set_progress(dec!(1000), Utc::now());
        assert_eq!(goal.status, GoalStatus::Completed);
        goal.set_progress(dec!(999), Utc::now());
        assert_eq!(goal.status, GoalStatus::InProgress);
    }

    #[test]
    fn cancelled_is_terminal() {
        let mut goal = goal(Some(dec!(10)));
        goal.cancel(Utc::now());
        goal.set_progress(dec!(5000), Utc::now());
        assert_eq!(goal.status, GoalStatus::Cancelled);
    }

    #[test]
    fn funded_goal_starts_completed() {
        let goal = goal(Some(dec!(1200)));
        assert_eq!(goal.status, GoalStatus::Completed);
        assert_eq!(goal.progress_percentage(), dec!(120));
        assert_eq!(goal.remaining(), Decimal::ZERO);
    }

    #[test]
    fn status_label_round_trips() {
        assert_eq!("in progress".parse::<GoalStatus>(), Ok(GoalStatus::InProgress));
        assert_eq!(GoalStatus::InProgress.to_string(), "In Progress");
        assert!("paused".parse::<GoalStatus>().is_err());
    }
}
