//! Shared traits, identifiers and month arithmetic for the finance primitives.

use std::fmt;

use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::category::ExpenseCategory;

/// Exposes a stable identifier for stored entities.
pub trait Identifiable {
    fn id(&self) -> Uuid;
}

/// Ties an entity to the user that owns it.
pub trait Owned {
    fn owner_id(&self) -> OwnerId;
}

/// Converts an entity into a user-facing display label.
pub trait Displayable {
    fn display_label(&self) -> String;
}

/// Identity of the user owning a record, as resolved by the authentication layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(pub Uuid);

impl OwnerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OwnerId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for OwnerId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Returns the first calendar day of the month containing `date`.
pub fn month_floor(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.day0() as i64)
}

/// Returns the first calendar day of the month after the one containing `date`.
pub fn next_month(date: NaiveDate) -> NaiveDate {
    month_floor(date)
        .checked_add_months(Months::new(1))
        .unwrap_or(NaiveDate::MAX)
}

/// Identifies one budget's scope: an owner, an expense category and a month.
///
/// The month is always stored normalised to its first day, so two keys built
/// from any dates in the same month compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BucketKey {
    pub owner_id: OwnerId,
    pub category: ExpenseCategory,
    month: NaiveDate,
}

impl BucketKey {
    pub fn new(owner_id: OwnerId, category: ExpenseCategory, date: NaiveDate) -> Self {
        Self {
            owner_id,
            category,
            month: month_floor(date),
        }
    }

    pub fn month(&self) -> NaiveDate {
        self.month
    }

    /// Returns `true` when `date` falls in `[month, next month)`.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.month && date < next_month(self.month)
    }

    /// Inclusive calendar range covered by the bucket.
    pub fn range(&self) -> DateRange {
        DateRange::month_of(self.month)
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.owner_id,
            self.category,
            self.month.format("%Y-%m")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRangeError {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl fmt::Display for DateRangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "range start {} is after end {}", self.start, self.end)
    }
}

impl std::error::Error for DateRangeError {}

/// Inclusive calendar range used by listing filters and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateRangeError> {
        if start > end {
            return Err(DateRangeError { start, end });
        }
        Ok(Self { start, end })
    }

    /// The whole month containing `date`.
    pub fn month_of(date: NaiveDate) -> Self {
        let start = month_floor(date);
        let end = next_month(start) - Duration::days(1);
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn month_floor_normalises_any_day() {
        assert_eq!(month_floor(date(2024, 3, 31)), date(2024, 3, 1));
        assert_eq!(month_floor(date(2024, 3, 1)), date(2024, 3, 1));
        assert_eq!(next_month(date(2024, 12, 15)), date(2025, 1, 1));
    }

    #[test]
    fn bucket_contains_only_its_month() {
        let key = BucketKey::new(OwnerId::new(), ExpenseCategory::Food, date(2024, 2, 10));
        assert_eq!(key.month(), date(2024, 2, 1));
        assert!(key.contains(date(2024, 2, 29)));
        assert!(!key.contains(date(2024, 3, 1)));
        assert!(!key.contains(date(2024, 1, 31)));
        assert_eq!(key.range().end, date(2024, 2, 29));
    }

    #[test]
    fn keys_from_same_month_are_equal() {
        let owner = OwnerId::new();
        let a = BucketKey::new(owner, ExpenseCategory::Bills, date(2024, 5, 2));
        let b = BucketKey::new(owner, ExpenseCategory::Bills, date(2024, 5, 30));
        assert_eq!(a, b);
    }

    #[test]
    fn date_range_rejects_inverted_bounds() {
        assert!(DateRange::new(date(2024, 2, 2), date(2024, 2, 1)).is_err());
        let range = DateRange::new(date(2024, 2, 1), date(2024, 2, 1)).unwrap();
        assert!(range.contains(date(2024, 2, 1)));
    }
}
