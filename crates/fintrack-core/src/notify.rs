//! Notification seams: message templates, delivery and recipient lookup.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use fintrack_domain::{Budget, Expense, Income, OwnerId, Threshold};

use crate::error::DispatchError;
use crate::CoreError;

/// Subject and body of a message, before a recipient is attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Outbound delivery channel (mail relay, queue, log).
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), DispatchError>;
}

/// Resolves where an owner's notifications go.
#[async_trait]
pub trait RecipientDirectory: Send + Sync {
    async fn address_of(&self, owner_id: OwnerId) -> Result<Option<String>, CoreError>;
}

/// Best-effort delivery: resolves the recipient, sends, and logs every failure.
#[derive(Clone)]
pub struct Notifier {
    dispatcher: Arc<dyn NotificationDispatcher>,
    recipients: Arc<dyn RecipientDirectory>,
}

impl Notifier {
    pub fn new(
        dispatcher: Arc<dyn NotificationDispatcher>,
        recipients: Arc<dyn RecipientDirectory>,
    ) -> Self {
        Self {
            dispatcher,
            recipients,
        }
    }

    /// Returns whether the message was handed to the channel successfully.
    pub async fn deliver(&self, owner_id: OwnerId, message: Message) -> bool {
        let recipient = match self.recipients.address_of(owner_id).await {
            Ok(Some(address)) => address,
            Ok(None) => {
                tracing::debug!(
                    %owner_id,
                    subject = %message.subject,
                    "no recipient address; skipping notification"
                );
                return false;
            }
            Err(err) => {
                tracing::warn!(%owner_id, error = %err, "recipient lookup failed");
                return false;
            }
        };
        let notification = Notification {
            recipient,
            subject: message.subject,
            body: message.body,
        };
        match self.dispatcher.send(&notification).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(
                    %owner_id,
                    subject = %notification.subject,
                    error = %err,
                    "notification dispatch failed"
                );
                false
            }
        }
    }
}

pub mod templates {
    use super::*;

    pub fn budget_alert(budget: &Budget, threshold: Threshold) -> Message {
        Message {
            subject: format!(
                "Budget Alert: {} of {} Budget Reached",
                threshold, budget.category
            ),
            body: format!(
                "Your spending in {} for {} has reached {}% of your monthly budget.\n\
                 Current Spending: ${}\nBudget Amount: ${}",
                budget.category,
                budget.month.format("%B %Y"),
                budget.utilization_percent(),
                budget.current_spending,
                budget.limit_amount
            ),
        }
    }

    pub fn expense_recorded(expense: &Expense) -> Message {
        Message {
            subject: "New Expense Recorded".into(),
            body: format!(
                "Amount: ${}\nCategory: {}\nDescription: {}\nDate: {}",
                expense.amount, expense.category, expense.description, expense.date
            ),
        }
    }

    pub fn income_recorded(income: &Income) -> Message {
        Message {
            subject: "New Income Recorded".into(),
            body: format!(
                "Amount: ${}\nSource: {}\nDate: {}",
                income.amount, income.source, income.date
            ),
        }
    }
}

/// In-memory channel that keeps every delivered message.
///
/// Can be switched into a failing mode to exercise the best-effort path.
#[derive(Debug, Default)]
pub struct MemoryOutbox {
    sent: Mutex<Vec<Notification>>,
    attempts: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Subjects of delivered messages, oldest first.
    pub fn subjects(&self) -> Vec<String> {
        self.sent().into_iter().map(|n| n.subject).collect()
    }
}

#[async_trait]
impl NotificationDispatcher for MemoryOutbox {
    async fn send(&self, notification: &Notification) -> Result<(), DispatchError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(DispatchError {
                recipient: notification.recipient.clone(),
                reason: "outbox is in failing mode".into(),
            });
        }
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(notification.clone());
        Ok(())
    }
}
