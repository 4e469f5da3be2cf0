use std::sync::Arc;

use fintrack_config::{Config, ConfigManager};
use fintrack_core::{
    AnalyticsService, BudgetService, BudgetSync, Clock, ExpenseService, GoalService,
    IncomeService, NotificationDispatcher, Notifier, SystemClock,
};
use fintrack_domain::OwnerId;
use fintrack_storage_json::JsonDocumentStore;

use crate::dispatch::MutedDispatcher;
use crate::errors::TrackerError;

/// Wires configuration, the document store, notifications and every service.
pub struct FinanceTracker {
    config: Config,
    store: Arc<JsonDocumentStore>,
    expenses: ExpenseService,
    incomes: IncomeService,
    budgets: BudgetService,
    goals: GoalService,
    analytics: AnalyticsService,
}

impl FinanceTracker {
    /// Loads configuration through `manager`, initialises tracing and opens the store.
    pub fn bootstrap(
        manager: &ConfigManager,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Result<Self, TrackerError> {
        let config = manager.load()?;
        crate::utils::init_tracing(&config.log_filter);
        tracing::info!(config = %manager.config_path().display(), "configuration loaded");
        Self::open(config, dispatcher)
    }

    /// Opens (or creates) the document store under the configured data directory.
    pub fn open(
        config: Config,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Result<Self, TrackerError> {
        config.validate()?;
        let path = config.store_path();
        let store = JsonDocumentStore::open(&path)?;
        tracing::info!(store = %path.display(), "document store opened");
        Ok(Self::assemble(config, Arc::new(store), dispatcher, Arc::new(SystemClock)))
    }

    /// A tracker whose data lives only as long as the value.
    pub fn in_memory(config: Config, dispatcher: Arc<dyn NotificationDispatcher>) -> Self {
        Self::assemble(
            config,
            Arc::new(JsonDocumentStore::open_in_memory()),
            dispatcher,
            Arc::new(SystemClock),
        )
    }

    pub fn assemble(
        config: Config,
        store: Arc<JsonDocumentStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let dispatcher: Arc<dyn NotificationDispatcher> = if config.notifications.enabled {
            dispatcher
        } else {
            Arc::new(MutedDispatcher)
        };
        let notifier = Notifier::new(dispatcher, store.clone());
        let max_page_size = config.max_page_size;

        let sync = BudgetSync::new(store.clone(), notifier.clone(), clock.clone());
        let mut expenses = ExpenseService::new(store.clone(), sync, clock.clone())
            .with_max_page_size(max_page_size);
        let mut incomes =
            IncomeService::new(store.clone(), clock.clone()).with_max_page_size(max_page_size);
        if config.notifications.transaction_receipts {
            expenses = expenses.with_receipts(notifier.clone());
            incomes = incomes.with_receipts(notifier);
        }

        Self {
            budgets: BudgetService::new(store.clone(), clock.clone()),
            goals: GoalService::new(store.clone(), clock),
            analytics: AnalyticsService::new(
                store.clone(),
                store.clone(),
                store.clone(),
                store.clone(),
            ),
            expenses,
            incomes,
            store,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<JsonDocumentStore> {
        &self.store
    }

    pub fn expenses(&self) -> &ExpenseService {
        &self.expenses
    }

    pub fn incomes(&self) -> &IncomeService {
        &self.incomes
    }

    pub fn budgets(&self) -> &BudgetService {
        &self.budgets
    }

    pub fn goals(&self) -> &GoalService {
        &self.goals
    }

    pub fn analytics(&self) -> &AnalyticsService {
        &self.analytics
    }

    /// Sets where the owner's alerts and receipts are delivered.
    pub async fn register_recipient(
        &self,
        owner_id: OwnerId,
        address: impl Into<String>,
    ) -> Result<(), TrackerError> {
        self.store.register_recipient(owner_id, address).await?;
        Ok(())
    }
}
