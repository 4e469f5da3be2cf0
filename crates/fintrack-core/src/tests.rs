use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::{
    storage::{BudgetRepository, ExpenseFilter, LimitUpdate, Page, SpendingUpdate, WriteSeq},
    AnalyticsService, BudgetService, BudgetSync, CoreError, ErrorKind, ExpenseService,
    FixedClock, GoalService, IncomeService, MemoryOutbox, MemoryStore, Notifier, TrendGrouping,
};
use fintrack_domain::{
    Budget, BucketKey, DateRange, ExpenseCategory, ExpensePatch, GoalCategory, GoalPatch,
    GoalStatus, IncomeSource, NewExpense, NewGoal, NewIncome, OwnerId, PaymentMethod, Threshold,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap()
}

fn food(amount: Decimal, day: u32) -> NewExpense {
    NewExpense {
        amount,
        description: "groceries".into(),
        category: ExpenseCategory::Food,
        date: date(2024, 3, day),
        payment_method: PaymentMethod::Cash,
    }
}

struct Fixture {
    store: Arc<MemoryStore>,
    outbox: Arc<MemoryOutbox>,
    clock: Arc<FixedClock>,
    owner: OwnerId,
}

impl Fixture {
    async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let owner = OwnerId::new();
        store.register_recipient(owner, "owner@example.com").await;
        Self {
            store,
            outbox: Arc::new(MemoryOutbox::new()),
            clock: Arc::new(FixedClock::new(start())),
            owner,
        }
    }

    fn notifier(&self) -> Notifier {
        Notifier::new(self.outbox.clone(), self.store.clone())
    }

    fn sync(&self) -> BudgetSync {
        BudgetSync::new(self.store.clone(), self.notifier(), self.clock.clone())
    }

    fn expenses(&self) -> ExpenseService {
        ExpenseService::new(self.store.clone(), self.sync(), self.clock.clone())
    }

    fn budgets(&self) -> BudgetService {
        BudgetService::new(self.store.clone(), self.clock.clone())
    }

    fn goals(&self) -> GoalService {
        GoalService::new(self.store.clone(), self.clock.clone())
    }

    fn incomes(&self) -> IncomeService {
        IncomeService::new(self.store.clone(), self.clock.clone())
    }

    fn analytics(&self) -> AnalyticsService {
        AnalyticsService::new(
            self.store.clone(),
            self.store.clone(),
            self.store.clone(),
            self.store.clone(),
        )
    }
}

/// Budget store whose spending updates always fail.
struct BrokenBudgets;

#[async_trait]
impl BudgetRepository for BrokenBudgets {
    async fn find_budget(&self, _key: &BucketKey) -> Result<Option<Budget>, CoreError> {
        Ok(None)
    }

    async fn find_budgets(
        &self,
        _owner_id: OwnerId,
        _month: NaiveDate,
    ) -> Result<Vec<Budget>, CoreError> {
        Ok(Vec::new())
    }

    async fn create_budget_from_bucket(
        &self,
        _key: &BucketKey,
        _limit_amount: Decimal,
        _now: DateTime<Utc>,
    ) -> Result<Budget, CoreError> {
        Err(CoreError::Storage("budgets offline".into()))
    }

    async fn increment_spending(
        &self,
        _key: &BucketKey,
        _delta: Decimal,
        _seq: WriteSeq,
        _now: DateTime<Utc>,
    ) -> Result<Option<SpendingUpdate>, CoreError> {
        Err(CoreError::Storage("budgets offline".into()))
    }

    async fn claim_thresholds(
        &self,
        _key: &BucketKey,
        _thresholds: &[Threshold],
        _now: DateTime<Utc>,
    ) -> Result<Vec<Threshold>, CoreError> {
        Err(CoreError::Storage("budgets offline".into()))
    }

    async fn set_budget_limit(
        &self,
        _key: &BucketKey,
        _limit_amount: Decimal,
        _now: DateTime<Utc>,
    ) -> Result<Option<LimitUpdate>, CoreError> {
        Err(CoreError::Storage("budgets offline".into()))
    }

    async fn delete_budget(&self, _key: &BucketKey) -> Result<Option<Budget>, CoreError> {
        Ok(None)
    }
}

#[tokio::test]
async fn expense_create_rejects_non_positive_amount_and_blank_description() {
    let fx = Fixture::new().await;
    let service = fx.expenses();

    let err = service.create(fx.owner, food(dec!(0), 1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailure);

    let mut blank = food(dec!(5), 1);
    blank.description = "   ".into();
    let err = service.create(fx.owner, blank).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailure);

    assert!(service
        .list(fx.owner, &ExpenseFilter::default(), None)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn expense_list_orders_by_date_then_creation_and_paginates() {
    let fx = Fixture::new().await;
    let service = fx.expenses().with_max_page_size(2);

    let older = service.create(fx.owner, food(dec!(1), 5)).await.unwrap();
    fx.clock.advance(Duration::seconds(1));
    let first_on_tenth = service.create(fx.owner, food(dec!(2), 10)).await.unwrap();
    fx.clock.advance(Duration::seconds(1));
    let second_on_tenth = service.create(fx.owner, food(dec!(3), 10)).await.unwrap();

    let page = service
        .list(fx.owner, &ExpenseFilter::default(), Some(Page::first(50)))
        .await
        .unwrap();
    let ids: Vec<_> = page.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![second_on_tenth.expense.id, first_on_tenth.expense.id]);

    let rest = service
        .list(
            fx.owner,
            &ExpenseFilter::default(),
            Some(Page { offset: 2, limit: 2 }),
        )
        .await
        .unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].id, older.expense.id);
}

#[tokio::test]
async fn expense_filter_range_is_inclusive() {
    let fx = Fixture::new().await;
    let service = fx.expenses();
    service.create(fx.owner, food(dec!(1), 1)).await.unwrap();
    service.create(fx.owner, food(dec!(2), 15)).await.unwrap();
    service.create(fx.owner, food(dec!(3), 31)).await.unwrap();

    let range = DateRange::new(date(2024, 3, 1), date(2024, 3, 15)).unwrap();
    let filter = ExpenseFilter::within(range);
    let found = service.list(fx.owner, &filter, None).await.unwrap();
    assert_eq!(found.len(), 2);
}

#[tokio::test]
async fn other_owners_records_are_not_found() {
    let fx = Fixture::new().await;
    let service = fx.expenses();
    let created = service.create(fx.owner, food(dec!(10), 3)).await.unwrap();
    let stranger = OwnerId::new();

    let err = service.get(stranger, created.expense.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = service
        .update(stranger, created.expense.id, ExpensePatch::amount(dec!(1)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = service.delete(stranger, created.expense.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    assert!(service.get(fx.owner, created.expense.id).await.is_ok());
}

#[tokio::test]
async fn description_only_update_skips_budget_sync() {
    let fx = Fixture::new().await;
    fx.budgets()
        .upsert(fx.owner, ExpenseCategory::Food, date(2024, 3, 1), dec!(100))
        .await
        .unwrap();
    let service = fx.expenses();
    let created = service.create(fx.owner, food(dec!(40), 3)).await.unwrap();

    let patch = ExpensePatch {
        description: Some("weekly shop".into()),
        ..ExpensePatch::default()
    };
    let change = service.update(fx.owner, created.expense.id, patch).await.unwrap();
    assert!(change.sync.touched.is_empty());
    assert_eq!(change.expense.description, "weekly shop");

    let budget = fx
        .budgets()
        .get(fx.owner, ExpenseCategory::Food, date(2024, 3, 9))
        .await
        .unwrap();
    assert_eq!(budget.current_spending, dec!(40));
}

#[tokio::test]
async fn sync_failure_reports_but_keeps_the_expense() {
    let fx = Fixture::new().await;
    let sync = BudgetSync::new(Arc::new(BrokenBudgets), fx.notifier(), fx.clock.clone());
    let service = ExpenseService::new(fx.store.clone(), sync, fx.clock.clone());

    let err = service.create(fx.owner, food(dec!(25), 4)).await.unwrap_err();
    assert!(matches!(err, CoreError::SyncFailed { .. }));
    assert_eq!(err.kind(), ErrorKind::InternalFailure);

    let stored = service
        .list(fx.owner, &ExpenseFilter::default(), None)
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].amount, dec!(25));
}

#[tokio::test]
async fn receipts_are_sent_when_enabled() {
    let fx = Fixture::new().await;
    let service = fx.expenses().with_receipts(fx.notifier());
    service.create(fx.owner, food(dec!(12), 2)).await.unwrap();

    let incomes = fx.incomes().with_receipts(fx.notifier());
    incomes
        .create(
            fx.owner,
            NewIncome {
                amount: dec!(3000),
                source: IncomeSource::Salary,
                date: date(2024, 3, 1),
                payment_method: PaymentMethod::Bank,
                description: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(
        fx.outbox.subjects(),
        vec!["New Expense Recorded", "New Income Recorded"]
    );
}

#[tokio::test]
async fn receipt_failure_does_not_fail_create() {
    let fx = Fixture::new().await;
    fx.outbox.set_failing(true);
    let service = fx.expenses().with_receipts(fx.notifier());
    assert!(service.create(fx.owner, food(dec!(12), 2)).await.is_ok());
    assert_eq!(fx.outbox.attempts(), 1);
}

#[tokio::test]
async fn new_budget_starts_from_existing_bucket_spending() {
    let fx = Fixture::new().await;
    let expenses = fx.expenses();
    expenses.create(fx.owner, food(dec!(30), 2)).await.unwrap();
    expenses.create(fx.owner, food(dec!(45.50), 28)).await.unwrap();
    let mut other_month = food(dec!(99), 1);
    other_month.date = date(2024, 4, 1);
    expenses.create(fx.owner, other_month).await.unwrap();

    let budget = fx
        .budgets()
        .upsert(fx.owner, ExpenseCategory::Food, date(2024, 3, 17), dec!(500))
        .await
        .unwrap();
    assert_eq!(budget.month, date(2024, 3, 1));
    assert_eq!(budget.current_spending, dec!(75.50));
    assert!(!budget.notifications.eighty_percent);
}

#[tokio::test]
async fn upsert_on_existing_bucket_updates_limit() {
    let fx = Fixture::new().await;
    let budgets = fx.budgets();
    let created = budgets
        .upsert(fx.owner, ExpenseCategory::Bills, date(2024, 3, 1), dec!(100))
        .await
        .unwrap();
    let updated = budgets
        .upsert(fx.owner, ExpenseCategory::Bills, date(2024, 3, 31), dec!(250))
        .await
        .unwrap();
    assert_eq!(created.id, updated.id);
    assert_eq!(updated.limit_amount, dec!(250));
    assert_eq!(budgets.list(fx.owner, date(2024, 3, 5)).await.unwrap().len(), 1);
}

#[tokio::test]
async fn budget_limit_must_be_positive_and_budget_must_exist() {
    let fx = Fixture::new().await;
    let budgets = fx.budgets();
    let err = budgets
        .upsert(fx.owner, ExpenseCategory::Food, date(2024, 3, 1), dec!(-1))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailure);

    let err = budgets
        .update_limit(fx.owner, ExpenseCategory::Food, date(2024, 3, 1), dec!(10))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = budgets
        .delete(fx.owner, ExpenseCategory::Food, date(2024, 3, 1))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn budget_list_is_in_category_order() {
    let fx = Fixture::new().await;
    let budgets = fx.budgets();
    for category in [ExpenseCategory::Shopping, ExpenseCategory::Food, ExpenseCategory::Bills] {
        budgets
            .upsert(fx.owner, category, date(2024, 3, 1), dec!(100))
            .await
            .unwrap();
    }
    let listed: Vec<_> = budgets
        .list(fx.owner, date(2024, 3, 1))
        .await
        .unwrap()
        .into_iter()
        .map(|b| b.category)
        .collect();
    assert_eq!(
        listed,
        vec![ExpenseCategory::Food, ExpenseCategory::Bills, ExpenseCategory::Shopping]
    );
}

fn trip(current: Option<Decimal>) -> NewGoal {
    NewGoal {
        name: "Lisbon".into(),
        target_amount: dec!(1000),
        current_amount: current,
        start_date: date(2024, 1, 1),
        target_date: date(2024, 9, 1),
        category: GoalCategory::Vacation,
    }
}

#[tokio::test]
async fn goal_rejects_inverted_dates() {
    let fx = Fixture::new().await;
    let mut data = trip(None);
    data.target_date = date(2023, 12, 1);
    let err = fx.goals().create(fx.owner, data).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailure);
}

#[tokio::test]
async fn goal_status_follows_progress() {
    let fx = Fixture::new().await;
    let goals = fx.goals();
    let goal = goals.create(fx.owner, trip(Some(dec!(100)))).await.unwrap();
    assert_eq!(goal.status, GoalStatus::InProgress);

    let goal = goals.set_progress(fx.owner, goal.id, dec!(1000)).await.unwrap();
    assert_eq!(goal.status, GoalStatus::Completed);

    let goal = goals
        .update(
            fx.owner,
            goal.id,
            GoalPatch {
                target_amount: Some(dec!(2000)),
                ..GoalPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(goal.status, GoalStatus::InProgress);
}

#[tokio::test]
async fn contradicting_status_is_rejected() {
    let fx = Fixture::new().await;
    let goals = fx.goals();
    let goal = goals.create(fx.owner, trip(None)).await.unwrap();
    let err = goals
        .update(
            fx.owner,
            goal.id,
            GoalPatch {
                status: Some(GoalStatus::Completed),
                ..GoalPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailure);

    let unchanged = goals.get(fx.owner, goal.id).await.unwrap();
    assert_eq!(unchanged.status, GoalStatus::InProgress);
}

#[tokio::test]
async fn cancelled_goal_stays_cancelled() {
    let fx = Fixture::new().await;
    let goals = fx.goals();
    let goal = goals.create(fx.owner, trip(None)).await.unwrap();
    let goal = goals
        .update(
            fx.owner,
            goal.id,
            GoalPatch {
                status: Some(GoalStatus::Cancelled),
                ..GoalPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(goal.status, GoalStatus::Cancelled);

    let goal = goals.set_progress(fx.owner, goal.id, dec!(1500)).await.unwrap();
    assert_eq!(goal.status, GoalStatus::Cancelled);

    let err = goals
        .update(
            fx.owner,
            goal.id,
            GoalPatch {
                status: Some(GoalStatus::InProgress),
                ..GoalPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailure);
}

#[tokio::test]
async fn goals_list_newest_first_with_status_filter() {
    let fx = Fixture::new().await;
    let goals = fx.goals();
    let first = goals.create(fx.owner, trip(None)).await.unwrap();
    fx.clock.advance(Duration::minutes(1));
    let second = goals.create(fx.owner, trip(Some(dec!(1000)))).await.unwrap();

    let all: Vec<_> = goals
        .list(fx.owner, None)
        .await
        .unwrap()
        .into_iter()
        .map(|g| g.id)
        .collect();
    assert_eq!(all, vec![second.id, first.id]);

    let completed = goals.list(fx.owner, Some(GoalStatus::Completed)).await.unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].id, second.id);
}

#[tokio::test]
async fn analytics_reports_distribution_trends_and_summary() {
    let fx = Fixture::new().await;
    let expenses = fx.expenses();
    expenses.create(fx.owner, food(dec!(60), 2)).await.unwrap();
    expenses.create(fx.owner, food(dec!(15), 2)).await.unwrap();
    expenses
        .create(
            fx.owner,
            NewExpense {
                amount: dec!(25),
                description: "bus pass".into(),
                category: ExpenseCategory::Transport,
                date: date(2024, 3, 9),
                payment_method: PaymentMethod::CreditCard,
            },
        )
        .await
        .unwrap();
    fx.incomes()
        .create(
            fx.owner,
            NewIncome {
                amount: dec!(400),
                source: IncomeSource::Freelance,
                date: date(2024, 3, 12),
                payment_method: PaymentMethod::Bank,
                description: Some("logo".into()),
            },
        )
        .await
        .unwrap();

    let analytics = fx.analytics();
    let march = DateRange::month_of(date(2024, 3, 1));

    let shares = analytics.category_distribution(fx.owner, march).await.unwrap();
    assert_eq!(shares[0].category, ExpenseCategory::Food);
    assert_eq!(shares[0].total, dec!(75));
    assert_eq!(shares[0].count, 2);
    assert_eq!(shares[0].share_percent, dec!(75));

    let by_day = analytics
        .spending_trends(fx.owner, march, TrendGrouping::Day, None)
        .await
        .unwrap();
    let keys: Vec<_> = by_day.iter().map(|p| p.key.as_str()).collect();
    assert_eq!(keys, vec!["2024-03-02", "2024-03-09"]);

    let by_method = analytics
        .spending_trends(
            fx.owner,
            march,
            TrendGrouping::PaymentMethod,
            Some(ExpenseCategory::Transport),
        )
        .await
        .unwrap();
    assert_eq!(by_method.len(), 1);
    assert_eq!(by_method[0].key, "Credit Card");

    let summary = analytics.monthly_summary(fx.owner, date(2024, 3, 20)).await.unwrap();
    assert_eq!(summary.income, dec!(400));
    assert_eq!(summary.expenses, dec!(100));
    assert_eq!(summary.net, dec!(300));
}

#[tokio::test]
async fn budget_performance_flags_drift() {
    let fx = Fixture::new().await;
    let budgets = fx.budgets();
    budgets
        .upsert(fx.owner, ExpenseCategory::Food, date(2024, 3, 1), dec!(200))
        .await
        .unwrap();

    // Expense written past the engine, as after a failed sync.
    let broken = ExpenseService::new(
        fx.store.clone(),
        BudgetSync::new(Arc::new(BrokenBudgets), fx.notifier(), fx.clock.clone()),
        fx.clock.clone(),
    );
    let _ = broken.create(fx.owner, food(dec!(50), 3)).await;

    let report = fx
        .analytics()
        .budget_performance(fx.owner, date(2024, 3, 1))
        .await
        .unwrap();
    assert_eq!(report.len(), 1);
    assert_eq!(report[0].spent, dec!(50));
    assert_eq!(report[0].cached_spending, Decimal::ZERO);
    assert_eq!(report[0].utilization_percent, dec!(25));
    assert!(report[0].drift);
}

#[tokio::test]
async fn goal_progress_report_orders_by_target_date() {
    let fx = Fixture::new().await;
    let goals = fx.goals();
    let mut later = trip(Some(dec!(250)));
    later.name = "Car".into();
    later.target_date = date(2025, 6, 1);
    goals.create(fx.owner, later).await.unwrap();
    goals.create(fx.owner, trip(Some(dec!(500)))).await.unwrap();

    let report = fx.analytics().goal_progress(fx.owner).await.unwrap();
    assert_eq!(report[0].name, "Lisbon");
    assert_eq!(report[0].progress_percent, dec!(50));
    assert_eq!(report[1].remaining, dec!(750));
}
