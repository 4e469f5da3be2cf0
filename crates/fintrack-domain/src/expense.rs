//! Expense records and the payloads used to create or edit them.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::category::{ExpenseCategory, PaymentMethod};
use crate::common::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub owner_id: OwnerId,
    pub amount: Decimal,
    pub description: String,
    pub category: ExpenseCategory,
    pub date: NaiveDate,
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Expense {
    pub fn new(owner_id: OwnerId, data: NewExpense, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            amount: data.amount,
            description: data.description.trim().to_string(),
            category: data.category,
            date: data.date,
            payment_method: data.payment_method,
            created_at: now,
            updated_at: now,
        }
    }

    /// The budget bucket this expense counts towards.
    pub fn bucket(&self) -> BucketKey {
        BucketKey::new(self.owner_id, self.category, self.date)
    }

    /// Applies the provided fields, leaving the others untouched.
    pub fn apply(&mut self, patch: ExpensePatch, now: DateTime<Utc>) {
        if let Some(amount) = patch.amount {
            self.amount = amount;
        }
        if let Some(description) = patch.description {
            self.description = description.trim().to_string();
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(method) = patch.payment_method {
            self.payment_method = method;
        }
        self.updated_at = now;
    }
}

impl Identifiable for Expense {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Owned for Expense {
    fn owner_id(&self) -> OwnerId {
        self.owner_id
    }
}

impl Displayable for Expense {
    fn display_label(&self) -> String {
        format!("{} {} on {} ({})", self.category, self.amount, self.date, self.description)
    }
}

/// Fields required to record a new expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExpense {
    pub amount: Decimal,
    pub description: String,
    pub category: ExpenseCategory,
    pub date: NaiveDate,
    pub payment_method: PaymentMethod,
}

/// Partial update of an expense; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpensePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ExpenseCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
}

impl ExpensePatch {
    pub fn amount(amount: Decimal) -> Self {
        Self {
            amount: Some(amount),
            ..Self::default()
        }
    }

    pub fn category(category: ExpenseCategory) -> Self {
        Self {
            category: Some(category),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample(now: DateTime<Utc>) -> Expense {
        Expense::new(
            OwnerId::new(),
            NewExpense {
                amount: dec!(12.50),
                description: "  lunch ".into(),
                category: ExpenseCategory::Food,
                date: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
                payment_method: PaymentMethod::Cash,
            },
            now,
        )
    }

    #[test]
    fn new_expense_trims_description() {
        let expense = sample(Utc::now());
        assert_eq!(expense.description, "lunch");
        assert_eq!(
            expense.bucket().month(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
    }

    #[test]
    fn apply_only_touches_provided_fields() {
        let created = Utc::now();
        let mut expense = sample(created);
        let later = created + chrono::Duration::minutes(5);
        expense.apply(ExpensePatch::amount(dec!(20)), later);
        assert_eq!(expense.amount, dec!(20));
        assert_eq!(expense.category, ExpenseCategory::Food);
        assert_eq!(expense.created_at, created);
        assert_eq!(expense.updated_at, later);
    }
}
