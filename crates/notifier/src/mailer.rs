//! Mail transport port and in-memory implementation.
//!
//! The real transport (SMTP, provider API) lives outside this workspace;
//! the dispatcher only needs something that accepts a composed alert.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::alert::ExpenseAlert;

/// Error from a mail transport.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail transport: {0}")]
    Transport(String),
}

/// Trait for sending composed expense alerts.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, alert: &ExpenseAlert) -> Result<(), MailError>;
}

#[derive(Debug, Default)]
struct InMemoryMailerState {
    sent: Vec<ExpenseAlert>,
    fail_on_send: bool,
    fail_once: bool,
}

/// In-memory mailer for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMailer {
    state: Arc<RwLock<InMemoryMailerState>>,
}

impl InMemoryMailer {
    /// Creates a new in-memory mailer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the mailer to fail every subsequent send call.
    pub async fn set_fail_on_send(&self, fail: bool) {
        self.state.write().await.fail_on_send = fail;
    }

    /// Makes exactly the next send call fail.
    pub async fn fail_once(&self) {
        self.state.write().await.fail_once = true;
    }

    /// Returns every alert accepted so far.
    pub async fn sent(&self) -> Vec<ExpenseAlert> {
        self.state.read().await.sent.clone()
    }

    /// Returns the number of alerts accepted so far.
    pub async fn sent_count(&self) -> usize {
        self.state.read().await.sent.len()
    }
}

#[async_trait]
impl Mailer for InMemoryMailer {
    async fn send(&self, alert: &ExpenseAlert) -> Result<(), MailError> {
        let mut state = self.state.write().await;
        if state.fail_on_send || std::mem::take(&mut state.fail_once) {
            return Err(MailError::Transport("mailer unavailable".to_string()));
        }
        state.sent.push(alert.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn alert(to: &str) -> ExpenseAlert {
        ExpenseAlert {
            to: to.to_string(),
            cc: vec![],
            subject: crate::alert::SUBJECT.to_string(),
            owner_name: "Ana".to_string(),
            amount: "20,00".to_string(),
            description: "mercado".to_string(),
            date: Utc::now().date_naive(),
            last_four: "5670".to_string(),
        }
    }

    #[tokio::test]
    async fn send_records_alerts() {
        let mailer = InMemoryMailer::new();
        mailer.send(&alert("ana@example.com")).await.unwrap();
        mailer.send(&alert("bia@example.com")).await.unwrap();

        assert_eq!(mailer.sent_count().await, 2);
        assert_eq!(mailer.sent().await[1].to, "bia@example.com");
    }

    #[tokio::test]
    async fn fail_on_send() {
        let mailer = InMemoryMailer::new();
        mailer.set_fail_on_send(true).await;

        let err = mailer.send(&alert("ana@example.com")).await.unwrap_err();
        assert!(matches!(err, MailError::Transport(_)));
        assert_eq!(mailer.sent_count().await, 0);
    }

    #[tokio::test]
    async fn fail_once_affects_only_the_next_send() {
        let mailer = InMemoryMailer::new();
        mailer.fail_once().await;

        assert!(mailer.send(&alert("ana@example.com")).await.is_err());
        assert!(mailer.send(&alert("ana@example.com")).await.is_ok());
        assert_eq!(mailer.sent_count().await, 1);
    }
}
