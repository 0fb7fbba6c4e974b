//! Expense domain service.

use common::CardId;

use crate::card::model::Card;
use crate::error::DomainError;
use crate::expense::events::{EventSink, ExpenseCreated};
use crate::expense::model::{Expense, NewExpense};
use crate::money::Money;
use crate::store::{CardStore, ExpenseStore, StoreError, UserStore};

/// Owns expense creation: guards the card-active and sufficient-balance
/// invariants, debits the card in the same transaction as the insert, and
/// publishes `ExpenseCreated` after commit.
///
/// The event sink is fire-and-forget; a committed expense is never rolled
/// back because notification delivery had a problem.
#[derive(Debug, Clone)]
pub struct ExpenseService<S, K> {
    store: S,
    events: K,
}

impl<S, K> ExpenseService<S, K>
where
    S: CardStore + ExpenseStore + UserStore,
    K: EventSink,
{
    pub fn new(store: S, events: K) -> Self {
        Self { store, events }
    }

    /// Records an expense against the card, debiting its balance.
    #[tracing::instrument(skip(self, description))]
    pub async fn store(
        &self,
        card_id: CardId,
        amount: Money,
        description: &str,
    ) -> Result<Expense, DomainError> {
        let card = CardStore::find(&self.store, card_id)
            .await
            .map_err(DomainError::ExpenseNotCreated)?
            .ok_or(DomainError::CardNotFound(card_id))?;

        if !card.is_active() {
            return Err(DomainError::InactiveCard);
        }
        if !amount.is_positive() {
            return Err(DomainError::InvalidAmount);
        }
        if !self.has_balance(&card, amount) {
            return Err(DomainError::InsufficientBalance);
        }

        let new = NewExpense {
            card_id,
            amount,
            description: description.to_string(),
        };
        let (expense, card) = match self.store.record(new).await {
            Ok(pair) => pair,
            // The balance moved between our check and the store's own
            // guard under the card lock.
            Err(StoreError::InsufficientFunds(_)) => {
                return Err(DomainError::InsufficientBalance);
            }
            Err(StoreError::NotFound { .. }) => return Err(DomainError::CardNotFound(card_id)),
            Err(e) => return Err(DomainError::ExpenseNotCreated(e)),
        };

        metrics::counter!("expenses_created").increment(1);
        tracing::info!(expense_id = %expense.id, card_id = %card.id, "expense recorded");

        self.publish_created(&expense, card).await;

        Ok(expense)
    }

    /// True iff the card balance covers `amount`.
    pub fn has_balance(&self, card: &Card, amount: Money) -> bool {
        card.balance >= amount
    }

    async fn publish_created(&self, expense: &Expense, card: Card) {
        match UserStore::find(&self.store, card.user_id).await {
            Ok(Some(user)) => {
                self.events
                    .publish(ExpenseCreated {
                        expense: expense.clone(),
                        card,
                        user,
                    })
                    .await;
            }
            Ok(None) => {
                tracing::error!(
                    card_id = %card.id,
                    user_id = %card.user_id,
                    "card owner missing, expense notification skipped"
                );
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    card_id = %card.id,
                    "could not resolve card owner, expense notification skipped"
                );
            }
        }
    }
}
