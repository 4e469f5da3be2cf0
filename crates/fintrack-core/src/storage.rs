//! Storage seams consumed by the services.
//!
//! The traits describe a document store reachable by id, by owner-scoped filter
//! and by the budget bucket key. Every budget mutation is a single atomic
//! operation on one document; services never read-modify-write a budget.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fintrack_domain::{
    Budget, BucketKey, DateRange, Expense, ExpenseCategory, Goal, GoalStatus, Income,
    IncomeSource, OwnerId, PaymentMethod, Threshold,
};

use crate::CoreError;

/// Filters accepted by expense listings. All fields are optional and combine with AND.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpenseFilter {
    #[serde(default)]
    pub range: Option<DateRange>,
    #[serde(default)]
    pub category: Option<ExpenseCategory>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
}

impl ExpenseFilter {
    pub fn within(range: DateRange) -> Self {
        Self {
            range: Some(range),
            ..Self::default()
        }
    }

    pub fn matches(&self, expense: &Expense) -> bool {
        self.range.map_or(true, |range| range.contains(expense.date))
            && self.category.map_or(true, |category| expense.category == category)
            && self
                .payment_method
                .map_or(true, |method| expense.payment_method == method)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncomeFilter {
    #[serde(default)]
    pub range: Option<DateRange>,
    #[serde(default)]
    pub source: Option<IncomeSource>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
}

impl IncomeFilter {
    pub fn within(range: DateRange) -> Self {
        Self {
            range: Some(range),
            ..Self::default()
        }
    }

    pub fn matches(&self, income: &Income) -> bool {
        self.range.map_or(true, |range| range.contains(income.date))
            && self.source.map_or(true, |source| income.source == source)
            && self
                .payment_method
                .map_or(true, |method| income.payment_method == method)
    }
}

/// Offset pagination for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Page {
    pub fn first(limit: usize) -> Self {
        Self { offset: 0, limit }
    }

    /// Slices already-ordered items, capping the limit at `max_limit`.
    pub fn apply<T>(self, items: Vec<T>, max_limit: usize) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset)
            .take(self.limit.min(max_limit))
            .collect()
    }
}

/// Position of an expense write in the store's commit order.
///
/// A budget created from a bucket sum records the last position that sum
/// covers, so increments from earlier writes are not counted twice.
pub type WriteSeq = u64;

/// An expense write the store committed, with the document it displaced.
#[derive(Debug, Clone, PartialEq)]
pub struct CommittedExpense {
    /// The document replaced or removed by the write.
    pub previous: Expense,
    pub seq: WriteSeq,
}

/// Result of an atomic increment-and-fetch on a budget.
#[derive(Debug, Clone, PartialEq)]
pub struct SpendingUpdate {
    /// Budget state right after this increment.
    pub budget: Budget,
    /// The increment would have pushed spending below zero and was clamped.
    pub clamped: bool,
    /// The write predates the budget and is already in its initial spend;
    /// nothing was applied.
    pub already_counted: bool,
}

/// Result of an atomic limit change on a budget.
#[derive(Debug, Clone, PartialEq)]
pub struct LimitUpdate {
    pub budget: Budget,
    pub cleared: Vec<Threshold>,
}

#[async_trait]
pub trait ExpenseRepository: Send + Sync {
    async fn insert_expense(&self, expense: Expense) -> Result<WriteSeq, CoreError>;
    async fn find_expense(&self, owner_id: OwnerId, id: Uuid)
        -> Result<Option<Expense>, CoreError>;
    /// Matching expenses in no particular order.
    async fn find_expenses(
        &self,
        owner_id: OwnerId,
        filter: &ExpenseFilter,
    ) -> Result<Vec<Expense>, CoreError>;
    /// Atomically swaps the stored document with the same id and owner for
    /// `expense` and returns the document it replaced, or `None` if absent.
    async fn replace_expense(
        &self,
        expense: &Expense,
    ) -> Result<Option<CommittedExpense>, CoreError>;
    async fn delete_expense(
        &self,
        owner_id: OwnerId,
        id: Uuid,
    ) -> Result<Option<CommittedExpense>, CoreError>;
    /// Sum of expense amounts whose owner, category and month match the bucket.
    async fn sum_bucket(&self, key: &BucketKey) -> Result<Decimal, CoreError>;
}

#[async_trait]
pub trait IncomeRepository: Send + Sync {
    async fn insert_income(&self, income: Income) -> Result<(), CoreError>;
    async fn find_income(&self, owner_id: OwnerId, id: Uuid) -> Result<Option<Income>, CoreError>;
    async fn find_incomes(
        &self,
        owner_id: OwnerId,
        filter: &IncomeFilter,
    ) -> Result<Vec<Income>, CoreError>;
    async fn replace_income(&self, income: &Income) -> Result<bool, CoreError>;
    async fn delete_income(&self, owner_id: OwnerId, id: Uuid)
        -> Result<Option<Income>, CoreError>;
}

#[async_trait]
pub trait BudgetRepository: Send + Sync {
    async fn find_budget(&self, key: &BucketKey) -> Result<Option<Budget>, CoreError>;
    async fn find_budgets(
        &self,
        owner_id: OwnerId,
        month: NaiveDate,
    ) -> Result<Vec<Budget>, CoreError>;
    /// Atomically sums the expenses already in the bucket and inserts a budget
    /// starting from that spend, counted through the latest expense write.
    /// Fails with [`CoreError::Conflict`] when the bucket already holds one.
    async fn create_budget_from_bucket(
        &self,
        key: &BucketKey,
        limit_amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Budget, CoreError>;
    /// Atomically adds `delta` to the bucket's running spend (clamping at zero)
    /// and returns the resulting document, or `None` when no budget exists.
    /// Writes at or before the budget's `counted_through` are left out.
    async fn increment_spending(
        &self,
        key: &BucketKey,
        delta: Decimal,
        seq: WriteSeq,
        now: DateTime<Utc>,
    ) -> Result<Option<SpendingUpdate>, CoreError>;
    /// Atomically sets each requested flag that is still false and returns the
    /// thresholds this call flipped. Concurrent callers never both win one flag.
    async fn claim_thresholds(
        &self,
        key: &BucketKey,
        thresholds: &[Threshold],
        now: DateTime<Utc>,
    ) -> Result<Vec<Threshold>, CoreError>;
    /// Atomically replaces the limit and applies the reset-on-increase rule
    /// against the stored spending.
    async fn set_budget_limit(
        &self,
        key: &BucketKey,
        limit_amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Option<LimitUpdate>, CoreError>;
    async fn delete_budget(&self, key: &BucketKey) -> Result<Option<Budget>, CoreError>;
}

#[async_trait]
pub trait GoalRepository: Send + Sync {
    async fn insert_goal(&self, goal: Goal) -> Result<(), CoreError>;
    async fn find_goal(&self, owner_id: OwnerId, id: Uuid) -> Result<Option<Goal>, CoreError>;
    async fn find_goals(
        &self,
        owner_id: OwnerId,
        status: Option<GoalStatus>,
    ) -> Result<Vec<Goal>, CoreError>;
    async fn replace_goal(&self, goal: &Goal) -> Result<bool, CoreError>;
    async fn delete_goal(&self, owner_id: OwnerId, id: Uuid) -> Result<Option<Goal>, CoreError>;
}
