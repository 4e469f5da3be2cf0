use std::sync::Arc;

use uuid::Uuid;

use fintrack_domain::{Income, IncomePatch, NewIncome, OwnerId};

use crate::expense_service::DEFAULT_MAX_PAGE_SIZE;
use crate::notify::{templates, Notifier};
use crate::storage::{IncomeFilter, IncomeRepository, Page};
use crate::time::Clock;
use crate::validation;
use crate::CoreError;

/// Owns income records. Incomes never touch budgets.
#[derive(Clone)]
pub struct IncomeService {
    incomes: Arc<dyn IncomeRepository>,
    receipts: Option<Notifier>,
    clock: Arc<dyn Clock>,
    max_page_size: usize,
}

impl IncomeService {
    pub fn new(incomes: Arc<dyn IncomeRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            incomes,
            receipts: None,
            clock,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }

    pub fn with_receipts(mut self, notifier: Notifier) -> Self {
        self.receipts = Some(notifier);
        self
    }

    pub fn with_max_page_size(mut self, max_page_size: usize) -> Self {
        self.max_page_size = max_page_size.max(1);
        self
    }

    pub async fn create(&self, owner_id: OwnerId, data: NewIncome) -> Result<Income, CoreError> {
        validation::positive_amount("amount", data.amount)?;
        let income = Income::new(owner_id, data, self.clock.now());
        self.incomes.insert_income(income.clone()).await?;
        tracing::debug!(
            %owner_id,
            income_id = %income.id,
            amount = %income.amount,
            source = %income.source,
            "income recorded"
        );

        if let Some(notifier) = &self.receipts {
            notifier
                .deliver(owner_id, templates::income_recorded(&income))
                .await;
        }
        Ok(income)
    }

    pub async fn list(
        &self,
        owner_id: OwnerId,
        filter: &IncomeFilter,
        page: Option<Page>,
    ) -> Result<Vec<Income>, CoreError> {
        let mut incomes = self.incomes.find_incomes(owner_id, filter).await?;
        incomes.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        let page = page.unwrap_or(Page::first(self.max_page_size));
        Ok(page.apply(incomes, self.max_page_size))
    }

    pub async fn get(&self, owner_id: OwnerId, id: Uuid) -> Result<Income, CoreError> {
        self.incomes
            .find_income(owner_id, id)
            .await?
            .ok_or_else(|| CoreError::not_found("Income", id))
    }

    pub async fn update(
        &self,
        owner_id: OwnerId,
        id: Uuid,
        patch: IncomePatch,
    ) -> Result<Income, CoreError> {
        let mut income = self.get(owner_id, id).await?;
        income.apply(patch, self.clock.now());
        validation::positive_amount("amount", income.amount)?;
        if !self.incomes.replace_income(&income).await? {
            return Err(CoreError::not_found("Income", id));
        }
        tracing::debug!(%owner_id, income_id = %id, "income updated");
        Ok(income)
    }

    pub async fn delete(&self, owner_id: OwnerId, id: Uuid) -> Result<Income, CoreError> {
        let income = self
            .incomes
            .delete_income(owner_id, id)
            .await?
            .ok_or_else(|| CoreError::not_found("Income", id))?;
        tracing::debug!(%owner_id, income_id = %id, "income deleted");
        Ok(income)
    }
}
