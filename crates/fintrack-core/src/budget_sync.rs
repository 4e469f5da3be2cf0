//! Keeps each budget's running spend in step with the expenses in its bucket.
//!
//! Every spending change is one atomic increment-and-fetch in the store, and
//! every threshold alert is preceded by an atomic flag claim, so concurrent
//! mutations of one bucket neither lose updates nor alert twice.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;

use fintrack_domain::{Budget, BucketKey, Expense, Threshold};

use crate::notify::{templates, Notifier};
use crate::storage::{BudgetRepository, WriteSeq};
use crate::time::Clock;
use crate::CoreError;

/// One threshold alert claimed during a sync pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BudgetAlert {
    pub bucket: BucketKey,
    pub threshold: Threshold,
    /// Whether the dispatcher accepted the message. The flag stays set either way.
    pub delivered: bool,
}

/// What a sync pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    /// Buckets whose budget spending changed.
    pub touched: Vec<BucketKey>,
    pub alerts: Vec<BudgetAlert>,
}

impl SyncOutcome {
    fn merge(&mut self, other: SyncOutcome) {
        self.touched.extend(other.touched);
        self.alerts.extend(other.alerts);
    }

    pub fn thresholds(&self) -> Vec<Threshold> {
        self.alerts.iter().map(|alert| alert.threshold).collect()
    }
}

#[derive(Clone)]
pub struct BudgetSync {
    budgets: Arc<dyn BudgetRepository>,
    notifier: Notifier,
    clock: Arc<dyn Clock>,
}

impl BudgetSync {
    pub fn new(
        budgets: Arc<dyn BudgetRepository>,
        notifier: Notifier,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            budgets,
            notifier,
            clock,
        }
    }

    /// `seq` is the store's sequence for the committed write being synced.
    pub async fn on_expense_created(
        &self,
        expense: &Expense,
        seq: WriteSeq,
    ) -> Result<SyncOutcome, CoreError> {
        self.adjust(expense.bucket(), expense.amount, seq, true).await
    }

    /// Moves the expense's contribution from its old state to its new one.
    ///
    /// Within one bucket only the net delta is applied, and thresholds are
    /// evaluated only when it is an increase. When the category or month
    /// changed, the old bucket is decremented and the new one incremented and
    /// evaluated.
    pub async fn on_expense_updated(
        &self,
        old: &Expense,
        new: &Expense,
        seq: WriteSeq,
    ) -> Result<SyncOutcome, CoreError> {
        let old_bucket = old.bucket();
        let new_bucket = new.bucket();
        if old_bucket == new_bucket {
            let delta = new.amount - old.amount;
            return self
                .adjust(new_bucket, delta, seq, delta > Decimal::ZERO)
                .await;
        }
        let mut outcome = self.adjust(old_bucket, -old.amount, seq, false).await?;
        outcome.merge(self.adjust(new_bucket, new.amount, seq, true).await?);
        Ok(outcome)
    }

    pub async fn on_expense_deleted(
        &self,
        old: &Expense,
        seq: WriteSeq,
    ) -> Result<SyncOutcome, CoreError> {
        self.adjust(old.bucket(), -old.amount, seq, false).await
    }

    async fn adjust(
        &self,
        bucket: BucketKey,
        delta: Decimal,
        seq: WriteSeq,
        check_thresholds: bool,
    ) -> Result<SyncOutcome, CoreError> {
        let mut outcome = SyncOutcome::default();
        if delta.is_zero() {
            return Ok(outcome);
        }
        let now = self.clock.now();
        let update = self
            .budgets
            .increment_spending(&bucket, delta, seq, now)
            .await?;
        let Some(update) = update else {
            tracing::debug!(%bucket, %delta, "no budget for bucket; spending untracked");
            return Ok(outcome);
        };
        if update.already_counted {
            tracing::debug!(%bucket, %delta, seq, "write predates budget; already counted");
            return Ok(outcome);
        }
        outcome.touched.push(bucket);
        if update.clamped {
            tracing::warn!(
                %bucket,
                %delta,
                budget_id = %update.budget.id,
                "budget spending would have gone negative; clamped at zero"
            );
        }
        tracing::debug!(
            %bucket,
            %delta,
            spending = %update.budget.current_spending,
            limit = %update.budget.limit_amount,
            "budget spending adjusted"
        );
        if check_thresholds {
            outcome.alerts = self.evaluate(bucket, &update.budget).await?;
        }
        Ok(outcome)
    }

    /// Claims every newly crossed threshold and dispatches one alert per claim.
    async fn evaluate(
        &self,
        bucket: BucketKey,
        budget: &Budget,
    ) -> Result<Vec<BudgetAlert>, CoreError> {
        let candidates = budget.pending_thresholds();
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let mut claimed = self
            .budgets
            .claim_thresholds(&bucket, &candidates, self.clock.now())
            .await?;
        claimed.sort();

        let mut alerts = Vec::with_capacity(claimed.len());
        for threshold in claimed {
            tracing::info!(
                %bucket,
                %threshold,
                spending = %budget.current_spending,
                limit = %budget.limit_amount,
                "budget threshold reached"
            );
            let delivered = self
                .notifier
                .deliver(budget.owner_id, templates::budget_alert(budget, threshold))
                .await;
            alerts.push(BudgetAlert {
                bucket,
                threshold,
                delivered,
            });
        }
        Ok(alerts)
    }
}
