use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use fintrack_domain::{month_floor, Budget, BucketKey, ExpenseCategory, OwnerId};

use crate::storage::{BudgetRepository, LimitUpdate};
use crate::time::Clock;
use crate::validation;
use crate::CoreError;

/// One budget per owner, category and month.
#[derive(Clone)]
pub struct BudgetService {
    budgets: Arc<dyn BudgetRepository>,
    clock: Arc<dyn Clock>,
}

impl BudgetService {
    pub fn new(budgets: Arc<dyn BudgetRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { budgets, clock }
    }

    /// Creates the bucket's budget or replaces the limit of the existing one.
    ///
    /// A new budget starts from the sum of the expenses already in its bucket,
    /// summed and inserted in one store operation, with both flags clear.
    /// Losing a concurrent creation turns the call into a limit update on the
    /// budget that won.
    pub async fn upsert(
        &self,
        owner_id: OwnerId,
        category: ExpenseCategory,
        month: NaiveDate,
        limit_amount: Decimal,
    ) -> Result<Budget, CoreError> {
        validation::positive_amount("limit amount", limit_amount)?;
        let key = BucketKey::new(owner_id, category, month);

        if let Some(update) = self.set_limit(&key, limit_amount).await? {
            return Ok(update.budget);
        }

        let created = self
            .budgets
            .create_budget_from_bucket(&key, limit_amount, self.clock.now())
            .await;
        match created {
            Ok(budget) => {
                tracing::info!(
                    bucket = %key,
                    limit = %limit_amount,
                    spending = %budget.current_spending,
                    "budget created"
                );
                Ok(budget)
            }
            Err(CoreError::Conflict(reason)) => {
                tracing::debug!(
                    bucket = %key,
                    "budget created concurrently; applying limit instead"
                );
                self.set_limit(&key, limit_amount)
                    .await?
                    .map(|update| update.budget)
                    .ok_or(CoreError::Conflict(reason))
            }
            Err(err) => Err(err),
        }
    }

    pub async fn get(
        &self,
        owner_id: OwnerId,
        category: ExpenseCategory,
        month: NaiveDate,
    ) -> Result<Budget, CoreError> {
        let key = BucketKey::new(owner_id, category, month);
        self.budgets
            .find_budget(&key)
            .await?
            .ok_or_else(|| CoreError::not_found("Budget", key))
    }

    /// Budgets of the month containing `month`, in category order.
    pub async fn list(
        &self,
        owner_id: OwnerId,
        month: NaiveDate,
    ) -> Result<Vec<Budget>, CoreError> {
        let mut budgets = self
            .budgets
            .find_budgets(owner_id, month_floor(month))
            .await?;
        budgets.sort_by_key(|budget| budget.category);
        Ok(budgets)
    }

    /// Changes the limit of an existing budget only.
    pub async fn update_limit(
        &self,
        owner_id: OwnerId,
        category: ExpenseCategory,
        month: NaiveDate,
        limit_amount: Decimal,
    ) -> Result<Budget, CoreError> {
        validation::positive_amount("limit amount", limit_amount)?;
        let key = BucketKey::new(owner_id, category, month);
        self.set_limit(&key, limit_amount)
            .await?
            .map(|update| update.budget)
            .ok_or_else(|| CoreError::not_found("Budget", key))
    }

    pub async fn delete(
        &self,
        owner_id: OwnerId,
        category: ExpenseCategory,
        month: NaiveDate,
    ) -> Result<Budget, CoreError> {
        let key = BucketKey::new(owner_id, category, month);
        let budget = self
            .budgets
            .delete_budget(&key)
            .await?
            .ok_or_else(|| CoreError::not_found("Budget", key))?;
        tracing::info!(bucket = %key, "budget deleted");
        Ok(budget)
    }

    async fn set_limit(
        &self,
        key: &BucketKey,
        limit_amount: Decimal,
    ) -> Result<Option<LimitUpdate>, CoreError> {
        let update = self
            .budgets
            .set_budget_limit(key, limit_amount, self.clock.now())
            .await?;
        if let Some(update) = &update {
            if update.cleared.is_empty() {
                tracing::debug!(bucket = %key, limit = %limit_amount, "budget limit updated");
            } else {
                tracing::info!(
                    bucket = %key,
                    limit = %limit_amount,
                    cleared = ?update.cleared,
                    "budget limit raised; thresholds re-armed"
                );
            }
        }
        Ok(update)
    }
}
