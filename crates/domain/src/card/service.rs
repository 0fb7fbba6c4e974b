//! Card domain service.

use common::UserId;

use crate::card::model::{Card, CardBrand, CardChanges, CardStatus, NewCard};
use crate::card::number::CardNumber;
use crate::error::DomainError;
use crate::money::Money;
use crate::store::{CardStore, StoreError};

/// Owns the card lifecycle: creation, deposits, status changes, and
/// partial updates. Every mutation goes through one atomic store call;
/// on failure the card is left exactly as it was.
///
/// Callers are expected to have passed access policy checks already.
#[derive(Debug, Clone)]
pub struct CardService<S> {
    cards: S,
}

impl<S: CardStore> CardService<S> {
    pub fn new(cards: S) -> Self {
        Self { cards }
    }

    /// Creates a card with balance zero.
    #[tracing::instrument(skip(self, number))]
    pub async fn store(
        &self,
        number: &str,
        status: CardStatus,
        brand: CardBrand,
        user_id: UserId,
    ) -> Result<Card, DomainError> {
        let number = CardNumber::parse(number)?;

        let new = NewCard {
            number,
            brand,
            status,
            user_id,
        };
        match self.cards.create(new).await {
            Ok(card) => {
                metrics::counter!("cards_created").increment(1);
                tracing::info!(card_id = %card.id, "card created");
                Ok(card)
            }
            Err(StoreError::DuplicateNumber) => Err(DomainError::DuplicateCardNumber),
            Err(e) => Err(DomainError::CardNotCreated(e)),
        }
    }

    /// Adds a positive amount to an active card's balance.
    #[tracing::instrument(skip(self, card), fields(card_id = %card.id))]
    pub async fn deposit(&self, card: &Card, amount: Money) -> Result<Card, DomainError> {
        if !card.is_active() {
            return Err(DomainError::InactiveCard);
        }
        if !amount.is_positive() {
            return Err(DomainError::InvalidAmount);
        }

        match self.cards.adjust_balance(card.id, amount).await {
            Ok(card) => {
                metrics::counter!("deposits_applied").increment(1);
                Ok(card)
            }
            Err(StoreError::NotFound { .. }) => Err(DomainError::CardNotFound(card.id)),
            Err(e) => Err(DomainError::DepositFailed(e)),
        }
    }

    /// Moves the card to `new_status`. Any of the three statuses is
    /// reachable from any other.
    #[tracing::instrument(skip(self, card), fields(card_id = %card.id))]
    pub async fn change_status(
        &self,
        card: &Card,
        new_status: CardStatus,
    ) -> Result<Card, DomainError> {
        let changes = CardChanges {
            status: Some(new_status),
            ..CardChanges::default()
        };
        match self.cards.update(card.id, changes).await {
            Ok(card) => Ok(card),
            Err(StoreError::NotFound { .. }) => Err(DomainError::CardNotFound(card.id)),
            Err(e) => Err(DomainError::CardNotUpdated(e)),
        }
    }

    /// Applies a partial update of number, status, and brand.
    ///
    /// A present number is re-validated and checked for uniqueness against
    /// every other card; if any check fails no field is applied. Balance
    /// and owner are not updatable through this path at all.
    #[tracing::instrument(skip(self, card, number), fields(card_id = %card.id))]
    pub async fn update(
        &self,
        card: &Card,
        number: Option<&str>,
        status: Option<CardStatus>,
        brand: Option<CardBrand>,
    ) -> Result<Card, DomainError> {
        let number = number.map(CardNumber::parse).transpose()?;

        let changes = CardChanges {
            number,
            status,
            brand,
        };
        match self.cards.update(card.id, changes).await {
            Ok(card) => Ok(card),
            Err(StoreError::DuplicateNumber) => Err(DomainError::DuplicateCardNumber),
            Err(StoreError::NotFound { .. }) => Err(DomainError::CardNotFound(card.id)),
            Err(e) => Err(DomainError::CardNotUpdated(e)),
        }
    }
}
