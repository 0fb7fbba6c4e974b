//! Domain error taxonomy.
//!
//! Every service operation either returns the created/updated entity or
//! fails with exactly one of these. Infrastructure variants keep the store
//! error as their source for logging; the display text never leaks it.

use common::CardId;
use thiserror::Error;

use crate::card::number::CardNumberError;
use crate::store::StoreError;

/// Errors produced by the card and expense services.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The number failed length or Luhn validation.
    #[error("invalid card number")]
    InvalidCardNumber,

    /// Another card already holds this number.
    #[error("card number already registered")]
    DuplicateCardNumber,

    /// Deposit or expense amount was zero or negative.
    #[error("amount must be greater than zero")]
    InvalidAmount,

    /// The card is blocked or cancelled.
    #[error("card is not active")]
    InactiveCard,

    /// The card balance does not cover the expense amount.
    #[error("insufficient balance")]
    InsufficientBalance,

    #[error("card {0} not found")]
    CardNotFound(CardId),

    #[error("card could not be created")]
    CardNotCreated(#[source] StoreError),

    #[error("card could not be updated")]
    CardNotUpdated(#[source] StoreError),

    #[error("deposit failed")]
    DepositFailed(#[source] StoreError),

    #[error("expense could not be created")]
    ExpenseNotCreated(#[source] StoreError),
}

impl From<CardNumberError> for DomainError {
    fn from(_: CardNumberError) -> Self {
        DomainError::InvalidCardNumber
    }
}
