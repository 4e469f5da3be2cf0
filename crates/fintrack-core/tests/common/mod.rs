#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;

use fintrack_core::{
    BudgetService, BudgetSync, ExpenseService, FixedClock, MemoryOutbox, MemoryStore, Notifier,
};
use fintrack_domain::{ExpenseCategory, NewExpense, OwnerId, PaymentMethod};

pub const OWNER_EMAIL: &str = "owner@example.com";

/// Services wired over one in-memory store and one outbox.
pub struct Engine {
    pub store: Arc<MemoryStore>,
    pub outbox: Arc<MemoryOutbox>,
    pub clock: Arc<FixedClock>,
    pub expenses: ExpenseService,
    pub budgets: BudgetService,
    pub owner: OwnerId,
}

pub async fn engine() -> Engine {
    let store = Arc::new(MemoryStore::new());
    let outbox = Arc::new(MemoryOutbox::new());
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 3, 20, 9, 0, 0).unwrap(),
    ));
    let owner = OwnerId::new();
    store.register_recipient(owner, OWNER_EMAIL).await;

    let notifier = Notifier::new(outbox.clone(), store.clone());
    let sync = BudgetSync::new(store.clone(), notifier, clock.clone());
    let expenses = ExpenseService::new(store.clone(), sync, clock.clone());
    let budgets = BudgetService::new(store.clone(), clock.clone());

    Engine {
        store,
        outbox,
        clock,
        expenses,
        budgets,
        owner,
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn march(day: u32) -> NaiveDate {
    date(2024, 3, day)
}

pub fn expense(category: ExpenseCategory, amount: Decimal, on: NaiveDate) -> NewExpense {
    NewExpense {
        amount,
        description: format!("{category} purchase"),
        category,
        date: on,
        payment_method: PaymentMethod::CreditCard,
    }
}

/// Alert subjects only, ignoring any receipts.
pub fn alert_subjects(outbox: &MemoryOutbox) -> Vec<String> {
    outbox
        .subjects()
        .into_iter()
        .filter(|subject| subject.starts_with("Budget Alert"))
        .collect()
}
