//! Income records. Structurally parallel to expenses but outside budget math.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::category::{IncomeSource, PaymentMethod};
use crate::common::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Income {
    pub id: Uuid,
    pub owner_id: OwnerId,
    pub amount: Decimal,
    pub source: IncomeSource,
    pub date: NaiveDate,
    pub payment_method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Income {
    pub fn new(owner_id: OwnerId, data: NewIncome, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            amount: data.amount,
            source: data.source,
            date: data.date,
            payment_method: data.payment_method,
            description: clean_description(data.description),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: IncomePatch, now: DateTime<Utc>) {
        if let Some(amount) = patch.amount {
            self.amount = amount;
        }
        if let Some(source) = patch.source {
            self.source = source;
        }
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(method) = patch.payment_method {
            self.payment_method = method;
        }
        if let Some(description) = patch.description {
            self.description = clean_description(description);
        }
        self.updated_at = now;
    }
}

impl Identifiable for Income {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Owned for Income {
    fn owner_id(&self) -> OwnerId {
        self.owner_id
    }
}

fn clean_description(description: Option<String>) -> Option<String> {
    description
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewIncome {
    pub amount: Decimal,
    pub source: IncomeSource,
    pub date: NaiveDate,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub description: Option<String>,
}

/// Partial update of an income. `description: Some(None)` clears the note.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncomePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<IncomeSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
}
