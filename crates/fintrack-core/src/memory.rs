//! In-process document store implementing every repository seam.
//!
//! Each operation runs under one write (or read) guard of a single
//! `tokio::sync::RwLock`, which makes budget increments and flag claims
//! linearizable per bucket. Persistent backends wrap it and snapshot the
//! collections after committed writes.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use fintrack_domain::{
    Budget, BucketKey, Expense, Goal, GoalStatus, Income, OwnerId, Threshold,
};

use crate::notify::RecipientDirectory;
use crate::storage::{
    BudgetRepository, CommittedExpense, ExpenseFilter, ExpenseRepository, GoalRepository,
    IncomeFilter, IncomeRepository, LimitUpdate, SpendingUpdate, WriteSeq,
};
use crate::CoreError;

/// Serializable copy of every collection, used for persistence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub expenses: Vec<Expense>,
    #[serde(default)]
    pub incomes: Vec<Income>,
    #[serde(default)]
    pub budgets: Vec<Budget>,
    #[serde(default)]
    pub goals: Vec<Goal>,
    #[serde(default)]
    pub recipients: Vec<RecipientEntry>,
    /// Sequence of the latest expense write.
    #[serde(default)]
    pub expense_seq: WriteSeq,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientEntry {
    pub owner_id: OwnerId,
    pub address: String,
}

#[derive(Debug, Default)]
struct Collections {
    expenses: HashMap<Uuid, Expense>,
    incomes: HashMap<Uuid, Income>,
    budgets: HashMap<BucketKey, Budget>,
    goals: HashMap<Uuid, Goal>,
    recipients: HashMap<OwnerId, String>,
    expense_seq: WriteSeq,
}

impl Collections {
    fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self, CoreError> {
        let mut collections = Self {
            expense_seq: snapshot.expense_seq,
            ..Self::default()
        };
        for expense in snapshot.expenses {
            collections.expenses.insert(expense.id, expense);
        }
        for income in snapshot.incomes {
            collections.incomes.insert(income.id, income);
        }
        for budget in snapshot.budgets {
            let key = budget.key();
            if collections.budgets.insert(key, budget).is_some() {
                return Err(CoreError::Conflict(format!(
                    "snapshot holds more than one budget for {key}"
                )));
            }
        }
        for goal in snapshot.goals {
            collections.goals.insert(goal.id, goal);
        }
        for entry in snapshot.recipients {
            collections.recipients.insert(entry.owner_id, entry.address);
        }
        Ok(collections)
    }

    fn next_expense_seq(&mut self) -> WriteSeq {
        self.expense_seq += 1;
        self.expense_seq
    }

    fn bucket_sum(&self, key: &BucketKey) -> Decimal {
        self.expenses
            .values()
            .filter(|expense| expense.bucket() == *key)
            .map(|expense| expense.amount)
            .sum()
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a store from a snapshot, rejecting duplicate budget buckets.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self, CoreError> {
        Ok(Self {
            inner: RwLock::new(Collections::from_snapshot(snapshot)?),
        })
    }

    /// Replaces every collection with the snapshot's contents.
    pub async fn restore(&self, snapshot: StoreSnapshot) -> Result<(), CoreError> {
        let collections = Collections::from_snapshot(snapshot)?;
        *self.inner.write().await = collections;
        Ok(())
    }

    /// Copies every collection, ordered by creation time for stable output.
    pub async fn snapshot(&self) -> StoreSnapshot {
        let guard = self.inner.read().await;
        let mut expenses: Vec<Expense> = guard.expenses.values().cloned().collect();
        expenses.sort_by_key(|e| (e.created_at, e.id));
        let mut incomes: Vec<Income> = guard.incomes.values().cloned().collect();
        incomes.sort_by_key(|i| (i.created_at, i.id));
        let mut budgets: Vec<Budget> = guard.budgets.values().cloned().collect();
        budgets.sort_by_key(|b| (b.created_at, b.id));
        let mut goals: Vec<Goal> = guard.goals.values().cloned().collect();
        goals.sort_by_key(|g| (g.created_at, g.id));
        let mut recipients: Vec<RecipientEntry> = guard
            .recipients
            .iter()
            .map(|(owner_id, address)| RecipientEntry {
                owner_id: *owner_id,
                address: address.clone(),
            })
            .collect();
        recipients.sort_by_key(|entry| entry.owner_id);
        StoreSnapshot {
            expenses,
            incomes,
            budgets,
            goals,
            recipients,
            expense_seq: guard.expense_seq,
        }
    }

    /// Registers (or replaces) the notification address of an owner.
    pub async fn register_recipient(&self, owner_id: OwnerId, address: impl Into<String>) {
        self.inner
            .write()
            .await
            .recipients
            .insert(owner_id, address.into());
    }
}

#[async_trait]
impl ExpenseRepository for MemoryStore {
    async fn insert_expense(&self, expense: Expense) -> Result<WriteSeq, CoreError> {
        let mut guard = self.inner.write().await;
        if guard.expenses.contains_key(&expense.id) {
            return Err(CoreError::Conflict(format!(
                "expense {} already exists",
                expense.id
            )));
        }
        guard.expenses.insert(expense.id, expense);
        Ok(guard.next_expense_seq())
    }

    async fn find_expense(
        &self,
        owner_id: OwnerId,
        id: Uuid,
    ) -> Result<Option<Expense>, CoreError> {
        let guard = self.inner.read().await;
        Ok(guard
            .expenses
            .get(&id)
            .filter(|expense| expense.owner_id == owner_id)
            .cloned())
    }

    async fn find_expenses(
        &self,
        owner_id: OwnerId,
        filter: &ExpenseFilter,
    ) -> Result<Vec<Expense>, CoreError> {
        let guard = self.inner.read().await;
        Ok(guard
            .expenses
            .values()
            .filter(|expense| expense.owner_id == owner_id && filter.matches(expense))
            .cloned()
            .collect())
    }

    async fn replace_expense(
        &self,
        expense: &Expense,
    ) -> Result<Option<CommittedExpense>, CoreError> {
        let mut guard = self.inner.write().await;
        let previous = match guard.expenses.get_mut(&expense.id) {
            Some(stored) if stored.owner_id == expense.owner_id => {
                std::mem::replace(stored, expense.clone())
            }
            _ => return Ok(None),
        };
        Ok(Some(CommittedExpense {
            previous,
            seq: guard.next_expense_seq(),
        }))
    }

    async fn delete_expense(
        &self,
        owner_id: OwnerId,
        id: Uuid,
    ) -> Result<Option<CommittedExpense>, CoreError> {
        let mut guard = self.inner.write().await;
        let owned = guard
            .expenses
            .get(&id)
            .is_some_and(|expense| expense.owner_id == owner_id);
        if !owned {
            return Ok(None);
        }
        let Some(previous) = guard.expenses.remove(&id) else {
            return Ok(None);
        };
        Ok(Some(CommittedExpense {
            previous,
            seq: guard.next_expense_seq(),
        }))
    }

    async fn sum_bucket(&self, key: &BucketKey) -> Result<Decimal, CoreError> {
        Ok(self.inner.read().await.bucket_sum(key))
    }
}

#[async_trait]
impl IncomeRepository for MemoryStore {
    async fn insert_income(&self, income: Income) -> Result<(), CoreError> {
        let mut guard = self.inner.write().await;
        if guard.incomes.contains_key(&income.id) {
            return Err(CoreError::Conflict(format!(
                "income {} already exists",
                income.id
            )));
        }
        guard.incomes.insert(income.id, income);
        Ok(())
    }

    async fn find_income(&self, owner_id: OwnerId, id: Uuid) -> Result<Option<Income>, CoreError> {
        let guard = self.inner.read().await;
        Ok(guard
            .incomes
            .get(&id)
            .filter(|income| income.owner_id == owner_id)
            .cloned())
    }

    async fn find_incomes(
        &self,
        owner_id: OwnerId,
        filter: &IncomeFilter,
    ) -> Result<Vec<Income>, CoreError> {
        let guard = self.inner.read().await;
        Ok(guard
            .incomes
            .values()
            .filter(|income| income.owner_id == owner_id && filter.matches(income))
            .cloned()
            .collect())
    }

    async fn replace_income(&self, income: &Income) -> Result<bool, CoreError> {
        let mut guard = self.inner.write().await;
        match guard.incomes.get_mut(&income.id) {
            Some(stored) if stored.owner_id == income.owner_id => {
                *stored = income.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_income(
        &self,
        owner_id: OwnerId,
        id: Uuid,
    ) -> Result<Option<Income>, CoreError> {
        let mut guard = self.inner.write().await;
        let owned = guard
            .incomes
            .get(&id)
            .is_some_and(|income| income.owner_id == owner_id);
        if !owned {
            return Ok(None);
        }
        Ok(guard.incomes.remove(&id))
    }
}

#[async_trait]
impl BudgetRepository for MemoryStore {
    async fn find_budget(&self, key: &BucketKey) -> Result<Option<Budget>, CoreError> {
        Ok(self.inner.read().await.budgets.get(key).cloned())
    }

    async fn find_budgets(
        &self,
        owner_id: OwnerId,
        month: NaiveDate,
    ) -> Result<Vec<Budget>, CoreError> {
        let guard = self.inner.read().await;
        Ok(guard
            .budgets
            .values()
            .filter(|budget| budget.owner_id == owner_id && budget.month == month)
            .cloned()
            .collect())
    }

    async fn create_budget_from_bucket(
        &self,
        key: &BucketKey,
        limit_amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Budget, CoreError> {
        let mut guard = self.inner.write().await;
        if guard.budgets.contains_key(key) {
            return Err(CoreError::Conflict(format!("budget already exists for {key}")));
        }
        let mut budget = Budget::new(*key, limit_amount, guard.bucket_sum(key), now);
        budget.counted_through = guard.expense_seq;
        guard.budgets.insert(*key, budget.clone());
        Ok(budget)
    }

    async fn increment_spending(
        &self,
        key: &BucketKey,
        delta: Decimal,
        seq: WriteSeq,
        now: DateTime<Utc>,
    ) -> Result<Option<SpendingUpdate>, CoreError> {
        let mut guard = self.inner.write().await;
        Ok(guard.budgets.get_mut(key).map(|budget| {
            let already_counted = seq <= budget.counted_through;
            let clamped = !already_counted && budget.apply_spending_delta(delta, now);
            SpendingUpdate {
                budget: budget.clone(),
                clamped,
                already_counted,
            }
        }))
    }

    async fn claim_thresholds(
        &self,
        key: &BucketKey,
        thresholds: &[Threshold],
        now: DateTime<Utc>,
    ) -> Result<Vec<Threshold>, CoreError> {
        let mut guard = self.inner.write().await;
        Ok(guard
            .budgets
            .get_mut(key)
            .map(|budget| budget.claim(thresholds, now))
            .unwrap_or_default())
    }

    async fn set_budget_limit(
        &self,
        key: &BucketKey,
        limit_amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Option<LimitUpdate>, CoreError> {
        let mut guard = self.inner.write().await;
        Ok(guard.budgets.get_mut(key).map(|budget| {
            let cleared = budget.set_limit(limit_amount, now);
            LimitUpdate {
                budget: budget.clone(),
                cleared,
            }
        }))
    }

    async fn delete_budget(&self, key: &BucketKey) -> Result<Option<Budget>, CoreError> {
        Ok(self.inner.write().await.budgets.remove(key))
    }
}

#[async_trait]
impl GoalRepository for MemoryStore {
    async fn insert_goal(&self, goal: Goal) -> Result<(), CoreError> {
        let mut guard = self.inner.write().await;
        if guard.goals.contains_key(&goal.id) {
            return Err(CoreError::Conflict(format!("goal {} already exists", goal.id)));
        }
        guard.goals.insert(goal.id, goal);
        Ok(())
    }

    async fn find_goal(&self, owner_id: OwnerId, id: Uuid) -> Result<Option<Goal>, CoreError> {
        let guard = self.inner.read().await;
        Ok(guard
            .goals
            .get(&id)
            .filter(|goal| goal.owner_id == owner_id)
            .cloned())
    }

    async fn find_goals(
        &self,
        owner_id: OwnerId,
        status: Option<GoalStatus>,
    ) -> Result<Vec<Goal>, CoreError> {
        let guard = self.inner.read().await;
        Ok(guard
            .goals
            .values()
            .filter(|goal| {
                goal.owner_id == owner_id && status.map_or(true, |wanted| goal.status == wanted)
            })
            .cloned()
            .collect())
    }

    async fn replace_goal(&self, goal: &Goal) -> Result<bool, CoreError> {
        let mut guard = self.inner.write().await;
        match guard.goals.get_mut(&goal.id) {
            Some(stored) if stored.owner_id == goal.owner_id => {
                *stored = goal.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_goal(&self, owner_id: OwnerId, id: Uuid) -> Result<Option<Goal>, CoreError> {
        let mut guard = self.inner.write().await;
        let owned = guard
            .goals
            .get(&id)
            .is_some_and(|goal| goal.owner_id == owner_id);
        if !owned {
            return Ok(None);
        }
        Ok(guard.goals.remove(&id))
    }
}

#[async_trait]
impl RecipientDirectory for MemoryStore {
    async fn address_of(&self, owner_id: OwnerId) -> Result<Option<String>, CoreError> {
        Ok(self.inner.read().await.recipients.get(&owner_id).cloned())
    }
}
