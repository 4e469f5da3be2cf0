//! Read-only reports over the ledgers. Nothing here writes.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use fintrack_domain::{
    month_floor, percentage, DateRange, Expense, ExpenseCategory, OwnerId,
};

use crate::storage::{
    BudgetRepository, ExpenseFilter, ExpenseRepository, GoalRepository, IncomeFilter,
    IncomeRepository,
};
use crate::CoreError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetPerformance {
    pub category: ExpenseCategory,
    pub limit_amount: Decimal,
    /// Recomputed from the expense ledger, not the cached running spend.
    pub spent: Decimal,
    pub remaining: Decimal,
    pub utilization_percent: Decimal,
    pub cached_spending: Decimal,
    /// The cached running spend disagrees with the ledger.
    pub drift: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub category: ExpenseCategory,
    pub total: Decimal,
    pub count: usize,
    pub share_percent: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrendGrouping {
    Day,
    #[default]
    Month,
    Category,
    PaymentMethod,
}

impl TrendGrouping {
    fn key_of(self, expense: &Expense) -> String {
        match self {
            TrendGrouping::Day => expense.date.format("%Y-%m-%d").to_string(),
            TrendGrouping::Month => expense.date.format("%Y-%m").to_string(),
            TrendGrouping::Category => expense.category.label().to_string(),
            TrendGrouping::PaymentMethod => expense.payment_method.label().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub key: String,
    pub total: Decimal,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySummary {
    pub month: NaiveDate,
    pub income: Decimal,
    pub expenses: Decimal,
    pub net: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalProgress {
    pub name: String,
    pub target_amount: Decimal,
    pub saved: Decimal,
    pub remaining: Decimal,
    pub progress_percent: Decimal,
    pub target_date: NaiveDate,
}

#[derive(Clone)]
pub struct AnalyticsService {
    expenses: Arc<dyn ExpenseRepository>,
    incomes: Arc<dyn IncomeRepository>,
    budgets: Arc<dyn BudgetRepository>,
    goals: Arc<dyn GoalRepository>,
}

impl AnalyticsService {
    pub fn new(
        expenses: Arc<dyn ExpenseRepository>,
        incomes: Arc<dyn IncomeRepository>,
        budgets: Arc<dyn BudgetRepository>,
        goals: Arc<dyn GoalRepository>,
    ) -> Self {
        Self {
            expenses,
            incomes,
            budgets,
            goals,
        }
    }

    /// Every budget of the month against the spending recomputed from expenses.
    pub async fn budget_performance(
        &self,
        owner_id: OwnerId,
        month: NaiveDate,
    ) -> Result<Vec<BudgetPerformance>, CoreError> {
        let mut budgets = self.budgets.find_budgets(owner_id, month_floor(month)).await?;
        budgets.sort_by_key(|budget| budget.category);

        let mut report = Vec::with_capacity(budgets.len());
        for budget in budgets {
            let spent = self.expenses.sum_bucket(&budget.key()).await?;
            let drift = spent != budget.current_spending;
            if drift {
                tracing::warn!(
                    bucket = %budget.key(),
                    cached = %budget.current_spending,
                    ledger = %spent,
                    "budget spending drifted from its expenses"
                );
            }
            report.push(BudgetPerformance {
                category: budget.category,
                limit_amount: budget.limit_amount,
                spent,
                remaining: budget.limit_amount - spent,
                utilization_percent: percentage(spent, budget.limit_amount),
                cached_spending: budget.current_spending,
                drift,
            });
        }
        Ok(report)
    }

    /// Total, count and share of each category in the range, largest first.
    pub async fn category_distribution(
        &self,
        owner_id: OwnerId,
        range: DateRange,
    ) -> Result<Vec<CategoryShare>, CoreError> {
        let expenses = self
            .expenses
            .find_expenses(owner_id, &ExpenseFilter::within(range))
            .await?;
        let grand_total: Decimal = expenses.iter().map(|expense| expense.amount).sum();

        let mut per_category: BTreeMap<ExpenseCategory, (Decimal, usize)> = BTreeMap::new();
        for expense in &expenses {
            let entry = per_category.entry(expense.category).or_default();
            entry.0 += expense.amount;
            entry.1 += 1;
        }
        let mut shares: Vec<CategoryShare> = per_category
            .into_iter()
            .map(|(category, (total, count))| CategoryShare {
                category,
                total,
                count,
                share_percent: percentage(total, grand_total),
            })
            .collect();
        shares.sort_by(|a, b| b.total.cmp(&a.total).then(a.category.cmp(&b.category)));
        Ok(shares)
    }

    /// Expense totals grouped by `grouping`, ordered by group key.
    pub async fn spending_trends(
        &self,
        owner_id: OwnerId,
        range: DateRange,
        grouping: TrendGrouping,
        category: Option<ExpenseCategory>,
    ) -> Result<Vec<TrendPoint>, CoreError> {
        let filter = ExpenseFilter {
            range: Some(range),
            category,
            payment_method: None,
        };
        let expenses = self.expenses.find_expenses(owner_id, &filter).await?;

        let mut groups: BTreeMap<String, (Decimal, usize)> = BTreeMap::new();
        for expense in &expenses {
            let entry = groups.entry(grouping.key_of(expense)).or_default();
            entry.0 += expense.amount;
            entry.1 += 1;
        }
        Ok(groups
            .into_iter()
            .map(|(key, (total, count))| TrendPoint { key, total, count })
            .collect())
    }

    pub async fn monthly_summary(
        &self,
        owner_id: OwnerId,
        month: NaiveDate,
    ) -> Result<MonthlySummary, CoreError> {
        let range = DateRange::month_of(month);
        let income: Decimal = self
            .incomes
            .find_incomes(owner_id, &IncomeFilter::within(range))
            .await?
            .iter()
            .map(|income| income.amount)
            .sum();
        let expenses: Decimal = self
            .expenses
            .find_expenses(owner_id, &ExpenseFilter::within(range))
            .await?
            .iter()
            .map(|expense| expense.amount)
            .sum();
        Ok(MonthlySummary {
            month: range.start,
            income,
            expenses,
            net: income - expenses,
        })
    }

    /// Progress of every goal, soonest target date first.
    pub async fn goal_progress(&self, owner_id: OwnerId) -> Result<Vec<GoalProgress>, CoreError> {
        let mut goals = self.goals.find_goals(owner_id, None).await?;
        goals.sort_by(|a, b| a.target_date.cmp(&b.target_date).then(a.name.cmp(&b.name)));
        Ok(goals
            .into_iter()
            .map(|goal| GoalProgress {
                progress_percent: goal.progress_percentage(),
                remaining: goal.remaining(),
                saved: goal.current_amount,
                target_amount: goal.target_amount,
                target_date: goal.target_date,
                name: goal.name,
            })
            .collect())
    }
}
