use std::sync::Arc;

use uuid::Uuid;

use fintrack_domain::{Expense, ExpensePatch, NewExpense, OwnerId};

use crate::budget_sync::{BudgetSync, SyncOutcome};
use crate::notify::{templates, Notifier};
use crate::storage::{ExpenseFilter, ExpenseRepository, Page};
use crate::time::Clock;
use crate::validation;
use crate::CoreError;

pub const DEFAULT_MAX_PAGE_SIZE: usize = 100;

/// A committed expense mutation together with the budget work it caused.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseChange {
    pub expense: Expense,
    pub sync: SyncOutcome,
}

/// Owns expense records and drives budget synchronisation after each write.
#[derive(Clone)]
pub struct ExpenseService {
    expenses: Arc<dyn ExpenseRepository>,
    sync: BudgetSync,
    receipts: Option<Notifier>,
    clock: Arc<dyn Clock>,
    max_page_size: usize,
}

impl ExpenseService {
    pub fn new(
        expenses: Arc<dyn ExpenseRepository>,
        sync: BudgetSync,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            expenses,
            sync,
            receipts: None,
            clock,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }

    /// Sends a "New Expense Recorded" message after every create.
    pub fn with_receipts(mut self, notifier: Notifier) -> Self {
        self.receipts = Some(notifier);
        self
    }

    pub fn with_max_page_size(mut self, max_page_size: usize) -> Self {
        self.max_page_size = max_page_size.max(1);
        self
    }

    pub async fn create(
        &self,
        owner_id: OwnerId,
        data: NewExpense,
    ) -> Result<ExpenseChange, CoreError> {
        validation::positive_amount("amount", data.amount)?;
        validation::required_text("description", &data.description)?;

        let expense = Expense::new(owner_id, data, self.clock.now());
        let seq = self.expenses.insert_expense(expense.clone()).await?;
        tracing::debug!(
            %owner_id,
            expense_id = %expense.id,
            amount = %expense.amount,
            category = %expense.category,
            "expense recorded"
        );

        let result = self.sync.on_expense_created(&expense, seq).await;
        let sync = self.synced(expense.id, result)?;
        if let Some(notifier) = &self.receipts {
            notifier
                .deliver(owner_id, templates::expense_recorded(&expense))
                .await;
        }
        Ok(ExpenseChange { expense, sync })
    }

    /// Matching expenses, newest date first, then newest record first.
    pub async fn list(
        &self,
        owner_id: OwnerId,
        filter: &ExpenseFilter,
        page: Option<Page>,
    ) -> Result<Vec<Expense>, CoreError> {
        let mut expenses = self.expenses.find_expenses(owner_id, filter).await?;
        expenses.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        let page = page.unwrap_or(Page::first(self.max_page_size));
        Ok(page.apply(expenses, self.max_page_size))
    }

    pub async fn get(&self, owner_id: OwnerId, id: Uuid) -> Result<Expense, CoreError> {
        self.expenses
            .find_expense(owner_id, id)
            .await?
            .ok_or_else(|| CoreError::not_found("Expense", id))
    }

    /// Applies the patch and moves the expense's budget contribution.
    ///
    /// The budget delta is taken against the document the store actually
    /// swapped out, so concurrent updates of one expense each account for
    /// exactly what they replaced. The last write wins.
    pub async fn update(
        &self,
        owner_id: OwnerId,
        id: Uuid,
        patch: ExpensePatch,
    ) -> Result<ExpenseChange, CoreError> {
        let mut expense = self.get(owner_id, id).await?;
        expense.apply(patch, self.clock.now());
        validation::positive_amount("amount", expense.amount)?;
        validation::required_text("description", &expense.description)?;

        let committed = self
            .expenses
            .replace_expense(&expense)
            .await?
            .ok_or_else(|| CoreError::not_found("Expense", id))?;
        tracing::debug!(%owner_id, expense_id = %id, "expense updated");

        let old = &committed.previous;
        let budget_relevant = old.amount != expense.amount || old.bucket() != expense.bucket();
        let sync = if budget_relevant {
            let result = self
                .sync
                .on_expense_updated(old, &expense, committed.seq)
                .await;
            self.synced(id, result)?
        } else {
            SyncOutcome::default()
        };
        Ok(ExpenseChange { expense, sync })
    }

    pub async fn delete(&self, owner_id: OwnerId, id: Uuid) -> Result<ExpenseChange, CoreError> {
        let committed = self
            .expenses
            .delete_expense(owner_id, id)
            .await?
            .ok_or_else(|| CoreError::not_found("Expense", id))?;
        tracing::debug!(%owner_id, expense_id = %id, "expense deleted");

        let result = self
            .sync
            .on_expense_deleted(&committed.previous, committed.seq)
            .await;
        let sync = self.synced(id, result)?;
        Ok(ExpenseChange {
            expense: committed.previous,
            sync,
        })
    }

    /// The expense write has already committed; a failed sync is reported, not rolled back.
    fn synced(
        &self,
        expense_id: Uuid,
        result: Result<SyncOutcome, CoreError>,
    ) -> Result<SyncOutcome, CoreError> {
        result.map_err(|err| {
            tracing::warn!(%expense_id, error = %err, "budget sync failed after expense write");
            CoreError::SyncFailed {
                expense_id,
                reason: err.to_string(),
            }
        })
    }
}
