#![doc(test(attr(deny(warnings))))]

//! fintrack tracks incomes, expenses, monthly category budgets and savings
//! goals, keeping every budget's running spend consistent with its expenses
//! and alerting once when spending reaches 80% and 100% of the limit.

pub mod dispatch;
pub mod errors;
pub mod tracker;
pub mod utils;

pub use dispatch::{LogDispatcher, MutedDispatcher};
pub use errors::TrackerError;
pub use tracker::FinanceTracker;

use std::sync::Once;

use fintrack_config::model::DEFAULT_LOG_FILTER;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing with the default filter and emits a startup log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing(DEFAULT_LOG_FILTER);
        tracing::info!("fintrack tracing initialized.");
    });
}
