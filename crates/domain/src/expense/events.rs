//! The created-expense domain event and its outbound port.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, mpsc};

use crate::card::model::Card;
use crate::expense::model::Expense;
use crate::user::User;

/// Fact published after an expense transaction commits.
///
/// Carries the expense with its card and the card's owner already
/// resolved, so consumers do not have to reach back into the store for
/// the data they render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseCreated {
    pub expense: Expense,
    pub card: Card,
    pub user: User,
}

/// Outbound port for domain events.
///
/// Publishing happens after the owning transaction has committed and is
/// fire-and-forget: a sink must never fail the caller. Delivery problems
/// are logged and dropped.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: ExpenseCreated);
}

/// Sink backed by an unbounded tokio channel, drained by the notification
/// dispatcher.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ExpenseCreated>,
}

impl ChannelSink {
    /// Creates the sink and the receiving end for a consumer.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ExpenseCreated>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn publish(&self, event: ExpenseCreated) {
        if self.tx.send(event).is_err() {
            tracing::warn!("expense event dropped: no consumer attached");
        }
    }
}

/// Sink that keeps every published event in memory, for tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<RwLock<Vec<ExpenseCreated>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything published so far.
    pub async fn events(&self) -> Vec<ExpenseCreated> {
        self.events.read().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.events.read().await.len()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn publish(&self, event: ExpenseCreated) {
        self.events.write().await.push(event);
    }
}
