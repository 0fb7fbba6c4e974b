//! Notification side channel for the card ledger.
//!
//! Consumes `ExpenseCreated` events published by the expense service,
//! composes the expense alert email, and hands it to a `Mailer`. By the
//! time an event reaches this crate the expense is committed: nothing
//! here can roll it back, and delivery failures are logged and dropped.

pub mod alert;
pub mod dispatcher;
pub mod error;
pub mod mailer;

pub use alert::ExpenseAlert;
pub use dispatcher::Dispatcher;
pub use error::NotifyError;
pub use mailer::{InMemoryMailer, MailError, Mailer};
