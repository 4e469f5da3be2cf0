//! fintrack-core
//!
//! Services, storage seams and the budget synchronisation engine.
//! Depends on fintrack-domain. No terminal I/O and no file persistence.

pub mod analytics_service;
pub mod budget_service;
pub mod budget_sync;
pub mod error;
pub mod expense_service;
pub mod goal_service;
pub mod income_service;
pub mod memory;
pub mod notify;
pub mod storage;
pub mod time;
mod validation;

pub use analytics_service::*;
pub use budget_service::*;
pub use budget_sync::*;
pub use error::{CoreError, DispatchError, ErrorKind, ErrorResponse};
pub use expense_service::*;
pub use goal_service::*;
pub use income_service::*;
pub use memory::{MemoryStore, StoreSnapshot};
pub use notify::{
    MemoryOutbox, Message, Notification, NotificationDispatcher, Notifier, RecipientDirectory,
};
pub use time::{Clock, FixedClock, SystemClock};

#[cfg(test)]
mod tests;
