//! Durable document store persisted as a single JSON snapshot.
//!
//! Atomic operations run on an inner [`MemoryStore`]; after every write the
//! whole snapshot is written to a temp file and renamed over the previous one.
//! Writes are serialised so snapshots land in commit order. A write whose
//! snapshot cannot be saved is rolled back in memory and reported as failed.

use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use fintrack_core::{
    storage::{
        BudgetRepository, CommittedExpense, ExpenseFilter, ExpenseRepository, GoalRepository,
        IncomeFilter, IncomeRepository, LimitUpdate, SpendingUpdate, WriteSeq,
    },
    CoreError, MemoryStore, RecipientDirectory, StoreSnapshot,
};
use fintrack_domain::{Budget, BucketKey, Expense, Goal, GoalStatus, Income, OwnerId, Threshold};

const TMP_SUFFIX: &str = "tmp";
pub const DEFAULT_FILE_NAME: &str = "fintrack.json";

pub struct JsonDocumentStore {
    inner: MemoryStore,
    path: Option<PathBuf>,
    write_gate: Mutex<()>,
}

impl JsonDocumentStore {
    /// Opens the snapshot at `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let path = path.into();
        let inner = if path.exists() {
            let snapshot = load_snapshot(&path)?;
            tracing::debug!(
                path = %path.display(),
                expenses = snapshot.expenses.len(),
                budgets = snapshot.budgets.len(),
                "loaded document snapshot"
            );
            MemoryStore::from_snapshot(snapshot)?
        } else {
            MemoryStore::new()
        };
        Ok(Self {
            inner,
            path: Some(path),
            write_gate: Mutex::new(()),
        })
    }

    /// A store that never touches the filesystem.
    pub fn open_in_memory() -> Self {
        Self {
            inner: MemoryStore::new(),
            path: None,
            write_gate: Mutex::new(()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub async fn snapshot(&self) -> StoreSnapshot {
        self.inner.snapshot().await
    }

    pub async fn register_recipient(
        &self,
        owner_id: OwnerId,
        address: impl Into<String>,
    ) -> Result<(), CoreError> {
        let _gate = self.write_gate.lock().await;
        let before = self.checkpoint().await;
        self.inner.register_recipient(owner_id, address).await;
        self.commit(before, true).await
    }

    /// State to roll back to if the next snapshot cannot be saved.
    /// Callers hold the write gate.
    async fn checkpoint(&self) -> Option<StoreSnapshot> {
        self.path.as_ref()?;
        Some(self.inner.snapshot().await)
    }

    /// Persists a changed store, restoring `before` when the save fails.
    async fn commit(&self, before: Option<StoreSnapshot>, changed: bool) -> Result<(), CoreError> {
        let (Some(path), Some(before)) = (&self.path, before) else {
            return Ok(());
        };
        if !changed {
            return Ok(());
        }
        let snapshot = self.inner.snapshot().await;
        let Err(err) = save_snapshot(&snapshot, path) else {
            return Ok(());
        };
        tracing::warn!(
            path = %path.display(),
            error = %err,
            "failed to persist snapshot; rolling the write back"
        );
        self.inner.restore(before).await?;
        Err(err)
    }
}

#[async_trait]
impl ExpenseRepository for JsonDocumentStore {
    async fn insert_expense(&self, expense: Expense) -> Result<WriteSeq, CoreError> {
        let _gate = self.write_gate.lock().await;
        let before = self.checkpoint().await;
        let seq = self.inner.insert_expense(expense).await?;
        self.commit(before, true).await?;
        Ok(seq)
    }

    async fn find_expense(
        &self,
        owner_id: OwnerId,
        id: Uuid,
    ) -> Result<Option<Expense>, CoreError> {
        self.inner.find_expense(owner_id, id).await
    }

    async fn find_expenses(
        &self,
        owner_id: OwnerId,
        filter: &ExpenseFilter,
    ) -> Result<Vec<Expense>, CoreError> {
        self.inner.find_expenses(owner_id, filter).await
    }

    async fn replace_expense(
        &self,
        expense: &Expense,
    ) -> Result<Option<CommittedExpense>, CoreError> {
        let _gate = self.write_gate.lock().await;
        let before = self.checkpoint().await;
        let replaced = self.inner.replace_expense(expense).await?;
        self.commit(before, replaced.is_some()).await?;
        Ok(replaced)
    }

    async fn delete_expense(
        &self,
        owner_id: OwnerId,
        id: Uuid,
    ) -> Result<Option<CommittedExpense>, CoreError> {
        let _gate = self.write_gate.lock().await;
        let before = self.checkpoint().await;
        let deleted = self.inner.delete_expense(owner_id, id).await?;
        self.commit(before, deleted.is_some()).await?;
        Ok(deleted)
    }

    async fn sum_bucket(&self, key: &BucketKey) -> Result<Decimal, CoreError> {
        self.inner.sum_bucket(key).await
    }
}

#[async_trait]
impl IncomeRepository for JsonDocumentStore {
    async fn insert_income(&self, income: Income) -> Result<(), CoreError> {
        let _gate = self.write_gate.lock().await;
        let before = self.checkpoint().await;
        self.inner.insert_income(income).await?;
        self.commit(before, true).await
    }

    async fn find_income(&self, owner_id: OwnerId, id: Uuid) -> Result<Option<Income>, CoreError> {
        self.inner.find_income(owner_id, id).await
    }

    async fn find_incomes(
        &self,
        owner_id: OwnerId,
        filter: &IncomeFilter,
    ) -> Result<Vec<Income>, CoreError> {
        self.inner.find_incomes(owner_id, filter).await
    }

    async fn replace_income(&self, income: &Income) -> Result<bool, CoreError> {
        let _gate = self.write_gate.lock().await;
        let before = self.checkpoint().await;
        let replaced = self.inner.replace_income(income).await?;
        self.commit(before, replaced).await?;
        Ok(replaced)
    }

    async fn delete_income(
        &self,
        owner_id: OwnerId,
        id: Uuid,
    ) -> Result<Option<Income>, CoreError> {
        let _gate = self.write_gate.lock().await;
        let before = self.checkpoint().await;
        let deleted = self.inner.delete_income(owner_id, id).await?;
        self.commit(before, deleted.is_some()).await?;
        Ok(deleted)
    }
}

#[async_trait]
impl BudgetRepository for JsonDocumentStore {
    async fn find_budget(&self, key: &BucketKey) -> Result<Option<Budget>, CoreError> {
        self.inner.find_budget(key).await
    }

    async fn find_budgets(
        &self,
        owner_id: OwnerId,
        month: NaiveDate,
    ) -> Result<Vec<Budget>, CoreError> {
        self.inner.find_budgets(owner_id, month).await
    }

    async fn create_budget_from_bucket(
        &self,
        key: &BucketKey,
        limit_amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Budget, CoreError> {
        let _gate = self.write_gate.lock().await;
        let before = self.checkpoint().await;
        let budget = self
            .inner
            .create_budget_from_bucket(key, limit_amount, now)
            .await?;
        self.commit(before, true).await?;
        Ok(budget)
    }

    async fn increment_spending(
        &self,
        key: &BucketKey,
        delta: Decimal,
        seq: WriteSeq,
        now: DateTime<Utc>,
    ) -> Result<Option<SpendingUpdate>, CoreError> {
        let _gate = self.write_gate.lock().await;
        let before = self.checkpoint().await;
        let update = self.inner.increment_spending(key, delta, seq, now).await?;
        let changed = update.as_ref().is_some_and(|update| !update.already_counted);
        self.commit(before, changed).await?;
        Ok(update)
    }

    async fn claim_thresholds(
        &self,
        key: &BucketKey,
        thresholds: &[Threshold],
        now: DateTime<Utc>,
    ) -> Result<Vec<Threshold>, CoreError> {
        let _gate = self.write_gate.lock().await;
        let before = self.checkpoint().await;
        let claimed = self.inner.claim_thresholds(key, thresholds, now).await?;
        self.commit(before, !claimed.is_empty()).await?;
        Ok(claimed)
    }

    async fn set_budget_limit(
        &self,
        key: &BucketKey,
        limit_amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Option<LimitUpdate>, CoreError> {
        let _gate = self.write_gate.lock().await;
        let before = self.checkpoint().await;
        let update = self.inner.set_budget_limit(key, limit_amount, now).await?;
        self.commit(before, update.is_some()).await?;
        Ok(update)
    }

    async fn delete_budget(&self, key: &BucketKey) -> Result<Option<Budget>, CoreError> {
        let _gate = self.write_gate.lock().await;
        let before = self.checkpoint().await;
        let deleted = self.inner.delete_budget(key).await?;
        self.commit(before, deleted.is_some()).await?;
        Ok(deleted)
    }
}

#[async_trait]
impl GoalRepository for JsonDocumentStore {
    async fn insert_goal(&self, goal: Goal) -> Result<(), CoreError> {
        let _gate = self.write_gate.lock().await;
        let before = self.checkpoint().await;
        self.inner.insert_goal(goal).await?;
        self.commit(before, true).await
    }

    async fn find_goal(&self, owner_id: OwnerId, id: Uuid) -> Result<Option<Goal>, CoreError> {
        self.inner.find_goal(owner_id, id).await
    }

    async fn find_goals(
        &self,
        owner_id: OwnerId,
        status: Option<GoalStatus>,
    ) -> Result<Vec<Goal>, CoreError> {
        self.inner.find_goals(owner_id, status).await
    }

    async fn replace_goal(&self, goal: &Goal) -> Result<bool, CoreError> {
        let _gate = self.write_gate.lock().await;
        let before = self.checkpoint().await;
        let replaced = self.inner.replace_goal(goal).await?;
        self.commit(before, replaced).await?;
        Ok(replaced)
    }

    async fn delete_goal(&self, owner_id: OwnerId, id: Uuid) -> Result<Option<Goal>, CoreError> {
        let _gate = self.write_gate.lock().await;
        let before = self.checkpoint().await;
        let deleted = self.inner.delete_goal(owner_id, id).await?;
        self.commit(before, deleted.is_some()).await?;
        Ok(deleted)
    }
}

#[async_trait]
impl RecipientDirectory for JsonDocumentStore {
    async fn address_of(&self, owner_id: OwnerId) -> Result<Option<String>, CoreError> {
        self.inner.address_of(owner_id).await
    }
}

/// Writes the snapshot next to `path` and renames it into place.
pub fn save_snapshot(snapshot: &StoreSnapshot, path: &Path) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let data =
        serde_json::to_string_pretty(snapshot).map_err(|err| CoreError::Serde(err.to_string()))?;
    let tmp = tmp_path(path);
    write_atomic(&tmp, &data)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn load_snapshot(path: &Path) -> Result<StoreSnapshot, CoreError> {
    let data = fs::read_to_string(path)?;
    serde_json::from_str(&data).map_err(|err| CoreError::Serde(err.to_string()))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> Result<(), CoreError> {
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tmp_path_appends_suffix() {
        assert_eq!(
            tmp_path(Path::new("/data/fintrack.json")),
            PathBuf::from("/data/fintrack.json.tmp")
        );
        assert_eq!(tmp_path(Path::new("/data/store")), PathBuf::from("/data/store.tmp"));
    }
}
