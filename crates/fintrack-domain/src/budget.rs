//! Monthly per-category budgets and their one-shot threshold flags.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::category::ExpenseCategory;
use crate::common::*;

/// Utilisation levels that trigger a one-time alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Threshold {
    EightyPercent,
    HundredPercent,
}

impl Threshold {
    /// Evaluation order: a single jump past both levels reports 80% first.
    pub const ALL: [Threshold; 2] = [Threshold::EightyPercent, Threshold::HundredPercent];

    pub fn percent(self) -> u32 {
        match self {
            Threshold::EightyPercent => 80,
            Threshold::HundredPercent => 100,
        }
    }

    /// Exact decimal check of `spending / limit >= percent / 100`.
    pub fn is_met(self, spending: Decimal, limit: Decimal) -> bool {
        if limit <= Decimal::ZERO {
            return spending > Decimal::ZERO;
        }
        match self {
            Threshold::EightyPercent => spending * Decimal::from(5) >= limit * Decimal::from(4),
            Threshold::HundredPercent => spending >= limit,
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percent())
    }
}

/// Two independent flags. They are deliberately not an ordered enum: a single
/// expense can cross both levels and each must fire exactly once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationFlags {
    pub eighty_percent: bool,
    pub hundred_percent: bool,
}

impl NotificationFlags {
    pub fn is_set(&self, threshold: Threshold) -> bool {
        match threshold {
            Threshold::EightyPercent => self.eighty_percent,
            Threshold::HundredPercent => self.hundred_percent,
        }
    }

    pub fn set(&mut self, threshold: Threshold, value: bool) {
        match threshold {
            Threshold::EightyPercent => self.eighty_percent = value,
            Threshold::HundredPercent => self.hundred_percent = value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: Uuid,
    pub owner_id: OwnerId,
    pub category: ExpenseCategory,
    pub month: NaiveDate,
    pub limit_amount: Decimal,
    pub current_spending: Decimal,
    #[serde(default)]
    pub notifications: NotificationFlags,
    /// Last expense write sequence already included in `current_spending`
    /// when the budget was created.
    #[serde(default)]
    pub counted_through: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Budget {
    pub fn new(
        key: BucketKey,
        limit_amount: Decimal,
        current_spending: Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id: key.owner_id,
            category: key.category,
            month: key.month(),
            limit_amount,
            current_spending: current_spending.max(Decimal::ZERO),
            notifications: NotificationFlags::default(),
            counted_through: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> BucketKey {
        BucketKey::new(self.owner_id, self.category, self.month)
    }

    /// Thresholds currently met whose flag has not fired yet.
    pub fn pending_thresholds(&self) -> Vec<Threshold> {
        Threshold::ALL
            .into_iter()
            .filter(|threshold| {
                !self.notifications.is_set(*threshold)
                    && threshold.is_met(self.current_spending, self.limit_amount)
            })
            .collect()
    }

    /// Adds `delta` to the running spend, clamping at zero.
    ///
    /// Returns `true` when the result had to be clamped, which means the cached
    /// figure had drifted from the expenses it summarises.
    pub fn apply_spending_delta(&mut self, delta: Decimal, now: DateTime<Utc>) -> bool {
        let next = self.current_spending + delta;
        self.updated_at = now;
        if next < Decimal::ZERO {
            self.current_spending = Decimal::ZERO;
            true
        } else {
            self.current_spending = next;
            false
        }
    }

    /// Flips the requested flags from false to true and returns the ones this
    /// call actually flipped.
    pub fn claim(&mut self, thresholds: &[Threshold], now: DateTime<Utc>) -> Vec<Threshold> {
        let mut claimed = Vec::new();
        for threshold in thresholds {
            if !self.notifications.is_set(*threshold) {
                self.notifications.set(*threshold, true);
                claimed.push(*threshold);
            }
        }
        if !claimed.is_empty() {
            self.updated_at = now;
        }
        claimed
    }

    /// Replaces the limit. Raising it clears every flag whose threshold is no
    /// longer met so future growth can alert again; lowering never clears.
    ///
    /// Returns the flags that were cleared.
    pub fn set_limit(&mut self, limit_amount: Decimal, now: DateTime<Utc>) -> Vec<Threshold> {
        let raised = limit_amount > self.limit_amount;
        self.limit_amount = limit_amount;
        self.updated_at = now;
        if !raised {
            return Vec::new();
        }
        let mut cleared = Vec::new();
        for threshold in Threshold::ALL {
            if self.notifications.is_set(threshold)
                && !threshold.is_met(self.current_spending, limit_amount)
            {
                self.notifications.set(threshold, false);
                cleared.push(threshold);
            }
        }
        cleared
    }

    pub fn remaining(&self) -> Decimal {
        self.limit_amount - self.current_spending
    }

    /// Spending as a percentage of the limit, rounded to two decimals.
    pub fn utilization_percent(&self) -> Decimal {
        percentage(self.current_spending, self.limit_amount)
    }
}

impl Identifiable for Budget {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Owned for Budget {
    fn owner_id(&self) -> OwnerId {
        self.owner_id
    }
}

impl Displayable for Budget {
    fn display_label(&self) -> String {
        format!(
            "{} {}: {} of {}",
            self.category,
            self.month.format("%Y-%m"),
            self.current_spending,
            self.limit_amount
        )
    }
}

/// `part / whole * 100`, rounded to two decimals; zero when `whole` is zero.
pub fn percentage(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    (part * Decimal::ONE_HUNDRED / whole).round_dp(2)
}
