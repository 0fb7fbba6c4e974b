//! In-memory store used by tests and the default server wiring.
//!
//! One `RwLock` guards all three tables, so every mutating call is a
//! single atomic unit and balance mutations are naturally serialized, the
//! same guarantees the Postgres implementation provides with transactions
//! and row locks.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{CardId, ExpenseId, UserId};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::card::model::{Card, CardChanges, NewCard};
use crate::expense::model::{Expense, NewExpense};
use crate::money::Money;
use crate::store::{CardStore, ExpenseStore, Result, StoreError, UserStore};
use crate::user::{NewUser, User};

#[derive(Debug, Error)]
#[error("simulated write failure")]
struct WriteFailure;

#[derive(Debug, Default)]
struct State {
    users: HashMap<UserId, User>,
    cards: HashMap<CardId, Card>,
    expenses: HashMap<ExpenseId, Expense>,
    fail_writes: bool,
}

impl State {
    fn check_writable(&self) -> Result<()> {
        if self.fail_writes {
            Err(StoreError::backend(WriteFailure))
        } else {
            Ok(())
        }
    }

    fn number_taken(&self, number: &str, exclude: Option<CardId>) -> bool {
        self.cards
            .values()
            .any(|card| Some(card.id) != exclude && card.number.as_str() == number)
    }
}

/// In-memory implementation of the three repository ports.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent mutating call fail, for rollback tests.
    pub async fn set_fail_writes(&self, fail: bool) {
        self.state.write().await.fail_writes = fail;
    }

    pub async fn card_count(&self) -> usize {
        self.state.read().await.cards.len()
    }

    pub async fn expense_count(&self) -> usize {
        self.state.read().await.expenses.len()
    }
}

#[async_trait]
impl CardStore for InMemoryStore {
    async fn create(&self, new: NewCard) -> Result<Card> {
        let mut state = self.state.write().await;
        state.check_writable()?;

        if state.number_taken(new.number.as_str(), None) {
            return Err(StoreError::DuplicateNumber);
        }

        let card = Card {
            id: CardId::new(),
            user_id: new.user_id,
            number: new.number,
            brand: new.brand,
            status: new.status,
            balance: Money::zero(),
            created_at: Utc::now(),
        };
        state.cards.insert(card.id, card.clone());
        Ok(card)
    }

    async fn find(&self, id: CardId) -> Result<Option<Card>> {
        Ok(self.state.read().await.cards.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Card>> {
        let state = self.state.read().await;
        let mut cards: Vec<_> = state.cards.values().cloned().collect();
        cards.sort_by_key(|c| c.created_at);
        Ok(cards)
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Card>> {
        let state = self.state.read().await;
        let mut cards: Vec<_> = state
            .cards
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        cards.sort_by_key(|c| c.created_at);
        Ok(cards)
    }

    async fn update(&self, id: CardId, changes: CardChanges) -> Result<Card> {
        let mut state = self.state.write().await;
        state.check_writable()?;

        if let Some(ref number) = changes.number
            && state.number_taken(number.as_str(), Some(id))
        {
            return Err(StoreError::DuplicateNumber);
        }

        let card = state
            .cards
            .get_mut(&id)
            .ok_or_else(|| StoreError::card_not_found(id))?;

        if let Some(number) = changes.number {
            card.number = number;
        }
        if let Some(status) = changes.status {
            card.status = status;
        }
        if let Some(brand) = changes.brand {
            card.brand = brand;
        }
        Ok(card.clone())
    }

    async fn adjust_balance(&self, id: CardId, delta: Money) -> Result<Card> {
        let mut state = self.state.write().await;
        state.check_writable()?;

        let card = state
            .cards
            .get_mut(&id)
            .ok_or_else(|| StoreError::card_not_found(id))?;

        let new_balance = card.balance + delta;
        if new_balance.is_negative() {
            return Err(StoreError::InsufficientFunds(id));
        }
        card.balance = new_balance;
        Ok(card.clone())
    }

    async fn delete(&self, id: CardId) -> Result<()> {
        let mut state = self.state.write().await;
        state.check_writable()?;

        state
            .cards
            .remove(&id)
            .ok_or_else(|| StoreError::card_not_found(id))?;
        state.expenses.retain(|_, e| e.card_id != id);
        Ok(())
    }
}

#[async_trait]
impl ExpenseStore for InMemoryStore {
    async fn record(&self, new: NewExpense) -> Result<(Expense, Card)> {
        let mut state = self.state.write().await;
        state.check_writable()?;

        let card = state
            .cards
            .get_mut(&new.card_id)
            .ok_or_else(|| StoreError::card_not_found(new.card_id))?;

        if card.balance < new.amount {
            return Err(StoreError::InsufficientFunds(new.card_id));
        }
        card.balance -= new.amount;
        let card = card.clone();

        let expense = Expense {
            id: ExpenseId::new(),
            card_id: new.card_id,
            amount: new.amount,
            description: new.description,
            date: Utc::now().date_naive(),
        };
        state.expenses.insert(expense.id, expense.clone());
        Ok((expense, card))
    }

    async fn find(&self, id: ExpenseId) -> Result<Option<Expense>> {
        Ok(self.state.read().await.expenses.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Expense>> {
        let state = self.state.read().await;
        let mut expenses: Vec<_> = state.expenses.values().cloned().collect();
        expenses.sort_by_key(|e| e.date);
        Ok(expenses)
    }

    async fn list_for_card(&self, card_id: CardId) -> Result<Vec<Expense>> {
        let state = self.state.read().await;
        let mut expenses: Vec<_> = state
            .expenses
            .values()
            .filter(|e| e.card_id == card_id)
            .cloned()
            .collect();
        expenses.sort_by_key(|e| e.date);
        Ok(expenses)
    }

    async fn delete(&self, id: ExpenseId) -> Result<()> {
        let mut state = self.state.write().await;
        state.check_writable()?;

        state
            .expenses
            .remove(&id)
            .ok_or_else(|| StoreError::expense_not_found(id))?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn create(&self, new: NewUser) -> Result<User> {
        let mut state = self.state.write().await;
        state.check_writable()?;

        if state.users.values().any(|u| u.email == new.email) {
            return Err(StoreError::DuplicateEmail);
        }

        let user = User {
            id: UserId::new(),
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            user_type: new.user_type,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn admins(&self) -> Result<Vec<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .filter(|u| u.is_admin())
            .cloned()
            .collect())
    }

    async fn delete(&self, id: UserId) -> Result<()> {
        let mut state = self.state.write().await;
        state.check_writable()?;

        if state.cards.values().any(|c| c.user_id == id) {
            return Err(StoreError::UserHasCards(id));
        }
        state
            .users
            .remove(&id)
            .ok_or_else(|| StoreError::user_not_found(id))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::model::{CardBrand, CardStatus};
    use crate::card::number::CardNumber;
    use crate::user::UserType;

    fn new_card(number: &str, user_id: UserId) -> NewCard {
        NewCard {
            number: CardNumber::parse(number).unwrap(),
            brand: CardBrand::Visa,
            status: CardStatus::Ativo,
            user_id,
        }
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Ana".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            user_type: UserType::Comum,
        }
    }

    #[tokio::test]
    async fn create_starts_with_zero_balance() {
        let store = InMemoryStore::new();
        let card = CardStore::create(&store, new_card("1234567812345670", UserId::new()))
            .await
            .unwrap();
        assert!(card.balance.is_zero());

        let found = CardStore::find(&store, card.id).await.unwrap().unwrap();
        assert_eq!(found, card);
    }

    #[tokio::test]
    async fn list_for_user_scopes_by_owner() {
        let store = InMemoryStore::new();
        let ana = UserId::new();
        let bia = UserId::new();
        CardStore::create(&store, new_card("1234567812345670", ana))
            .await
            .unwrap();
        CardStore::create(&store, new_card("4539578763621486", bia))
            .await
            .unwrap();

        let cards = store.list_for_user(ana).await.unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].user_id, ana);
        assert_eq!(CardStore::list(&store).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn duplicate_number_is_rejected() {
        let store = InMemoryStore::new();
        CardStore::create(&store, new_card("1234567812345670", UserId::new()))
            .await
            .unwrap();
        let err = CardStore::create(&store, new_card("1234567812345670", UserId::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateNumber));
    }

    #[tokio::test]
    async fn update_checks_uniqueness_excluding_self() {
        let store = InMemoryStore::new();
        let card = CardStore::create(&store, new_card("1234567812345670", UserId::new()))
            .await
            .unwrap();
        CardStore::create(&store, new_card("4539578763621486", UserId::new()))
            .await
            .unwrap();

        // Re-submitting the card's own number is not a conflict.
        let updated = CardStore::update(
            &store,
            card.id,
            CardChanges {
                number: Some(CardNumber::parse("1234567812345670").unwrap()),
                status: Some(CardStatus::Bloqueado),
                brand: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.status, CardStatus::Bloqueado);

        // Taking another card's number is.
        let err = CardStore::update(
            &store,
            card.id,
            CardChanges {
                number: Some(CardNumber::parse("4539578763621486").unwrap()),
                ..CardChanges::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateNumber));
    }

    #[tokio::test]
    async fn adjust_balance_guards_against_negative() {
        let store = InMemoryStore::new();
        let card = CardStore::create(&store, new_card("1234567812345670", UserId::new()))
            .await
            .unwrap();

        let card = store
            .adjust_balance(card.id, Money::from_cents(10_000))
            .await
            .unwrap();
        assert_eq!(card.balance, Money::from_cents(10_000));

        let err = store
            .adjust_balance(card.id, Money::from_cents(-20_000))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InsufficientFunds(_)));

        let card = CardStore::find(&store, card.id).await.unwrap().unwrap();
        assert_eq!(card.balance, Money::from_cents(10_000));
    }

    #[tokio::test]
    async fn record_debits_card_atomically() {
        let store = InMemoryStore::new();
        let card = CardStore::create(&store, new_card("1234567812345670", UserId::new()))
            .await
            .unwrap();
        store
            .adjust_balance(card.id, Money::from_cents(10_000))
            .await
            .unwrap();

        let (expense, card) = store
            .record(NewExpense {
                card_id: card.id,
                amount: Money::from_cents(2000),
                description: "padaria".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(expense.amount, Money::from_cents(2000));
        assert_eq!(card.balance, Money::from_cents(8000));
        assert_eq!(store.expense_count().await, 1);
    }

    #[tokio::test]
    async fn record_rechecks_balance() {
        let store = InMemoryStore::new();
        let card = CardStore::create(&store, new_card("1234567812345670", UserId::new()))
            .await
            .unwrap();
        store
            .adjust_balance(card.id, Money::from_cents(1000))
            .await
            .unwrap();

        let err = store
            .record(NewExpense {
                card_id: card.id,
                amount: Money::from_cents(2000),
                description: "padaria".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InsufficientFunds(_)));
        assert_eq!(store.expense_count().await, 0);
    }

    #[tokio::test]
    async fn delete_card_cascades_expenses() {
        let store = InMemoryStore::new();
        let card = CardStore::create(&store, new_card("1234567812345670", UserId::new()))
            .await
            .unwrap();
        store
            .adjust_balance(card.id, Money::from_cents(10_000))
            .await
            .unwrap();
        store
            .record(NewExpense {
                card_id: card.id,
                amount: Money::from_cents(1000),
                description: "café".to_string(),
            })
            .await
            .unwrap();

        CardStore::delete(&store, card.id).await.unwrap();
        assert_eq!(store.card_count().await, 0);
        assert_eq!(store.expense_count().await, 0);
    }

    #[tokio::test]
    async fn user_delete_refused_while_cards_exist() {
        let store = InMemoryStore::new();
        let user = UserStore::create(&store, new_user("ana@example.com"))
            .await
            .unwrap();
        CardStore::create(&store, new_card("1234567812345670", user.id))
            .await
            .unwrap();

        let err = UserStore::delete(&store, user.id).await.unwrap_err();
        assert!(matches!(err, StoreError::UserHasCards(_)));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = InMemoryStore::new();
        UserStore::create(&store, new_user("ana@example.com"))
            .await
            .unwrap();
        let err = UserStore::create(&store, new_user("ana@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
    }

    #[tokio::test]
    async fn admins_filters_by_type() {
        let store = InMemoryStore::new();
        UserStore::create(&store, new_user("comum@example.com"))
            .await
            .unwrap();
        UserStore::create(
            &store,
            NewUser {
                user_type: UserType::Admin,
                ..new_user("admin@example.com")
            },
        )
        .await
        .unwrap();

        let admins = store.admins().await.unwrap();
        assert_eq!(admins.len(), 1);
        assert_eq!(admins[0].email, "admin@example.com");
    }

    #[tokio::test]
    async fn fail_writes_blocks_mutations_but_not_reads() {
        let store = InMemoryStore::new();
        let card = CardStore::create(&store, new_card("1234567812345670", UserId::new()))
            .await
            .unwrap();

        store.set_fail_writes(true).await;
        let err = store
            .adjust_balance(card.id, Money::from_cents(100))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));

        // Reads still work and show the untouched balance.
        let found = CardStore::find(&store, card.id).await.unwrap().unwrap();
        assert!(found.balance.is_zero());
    }
}
