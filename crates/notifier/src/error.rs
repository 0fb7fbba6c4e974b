use domain::StoreError;
use thiserror::Error;

use crate::mailer::MailError;

/// Errors that can occur while dispatching a single notification.
///
/// These never propagate to the expense flow; the dispatcher logs them
/// and moves on to the next event.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("loading admin recipients: {0}")]
    Store(#[from] StoreError),

    #[error("sending expense alert: {0}")]
    Mail(#[from] MailError),
}
