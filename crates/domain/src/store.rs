//! Repository ports consumed by the domain services.
//!
//! Every trait method is one atomic unit of work: the implementation owns
//! the transaction boundary and either applies the whole mutation or none
//! of it. Balance mutations are serialized per card inside the
//! implementation (row lock in Postgres, single write lock in memory), so
//! concurrent read-modify-write of a balance cannot race.

use async_trait::async_trait;
use common::{CardId, ExpenseId, UserId};
use thiserror::Error;
use uuid::Uuid;

use crate::card::model::{Card, CardChanges, NewCard};
use crate::expense::model::{Expense, NewExpense};
use crate::money::Money;
use crate::user::{NewUser, User};

/// Errors surfaced by store implementations.
///
/// Uniqueness and balance-guard violations get distinct variants so the
/// services can map them to the domain taxonomy instead of treating every
/// failure as infrastructure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("card number already registered")]
    DuplicateNumber,

    #[error("email already registered")]
    DuplicateEmail,

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    /// The debit guard failed at commit time: the balance observed inside
    /// the transaction was lower than the amount.
    #[error("insufficient funds on card {0}")]
    InsufficientFunds(CardId),

    /// A user cannot be deleted while cards still reference it.
    #[error("user {0} still owns cards")]
    UserHasCards(UserId),

    #[error("storage backend: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        StoreError::Backend(Box::new(err))
    }

    pub fn card_not_found(id: CardId) -> Self {
        StoreError::NotFound {
            entity: "card",
            id: id.as_uuid(),
        }
    }

    pub fn expense_not_found(id: ExpenseId) -> Self {
        StoreError::NotFound {
            entity: "expense",
            id: id.as_uuid(),
        }
    }

    pub fn user_not_found(id: UserId) -> Self {
        StoreError::NotFound {
            entity: "user",
            id: id.as_uuid(),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Persistence gateway for cards. No business logic beyond the structural
/// invariants (unique number, non-negative balance).
#[async_trait]
pub trait CardStore: Send + Sync {
    /// Persists a new card with balance zero.
    async fn create(&self, new: NewCard) -> Result<Card>;

    async fn find(&self, id: CardId) -> Result<Option<Card>>;

    async fn list(&self) -> Result<Vec<Card>>;

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Card>>;

    /// Applies a partial update. A changed number is checked for
    /// uniqueness against every card except this one.
    async fn update(&self, id: CardId, changes: CardChanges) -> Result<Card>;

    /// Atomically adds `delta` to the balance, holding the card locked for
    /// the duration. Fails with `InsufficientFunds` if the result would be
    /// negative.
    async fn adjust_balance(&self, id: CardId, delta: Money) -> Result<Card>;

    /// Hard-deletes the card and every expense that belongs to it.
    async fn delete(&self, id: CardId) -> Result<()>;
}

/// Persistence gateway for expenses.
#[async_trait]
pub trait ExpenseStore: Send + Sync {
    /// Inserts the expense and debits the owning card in one transaction.
    ///
    /// Re-checks the balance under the card lock; returns
    /// `InsufficientFunds` if a concurrent debit got there first. Returns
    /// the created expense together with the updated card.
    async fn record(&self, new: NewExpense) -> Result<(Expense, Card)>;

    async fn find(&self, id: ExpenseId) -> Result<Option<Expense>>;

    async fn list(&self) -> Result<Vec<Expense>>;

    async fn list_for_card(&self, card_id: CardId) -> Result<Vec<Expense>>;

    async fn delete(&self, id: ExpenseId) -> Result<()>;
}

/// Persistence gateway for users.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, new: NewUser) -> Result<User>;

    async fn find(&self, id: UserId) -> Result<Option<User>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// All admin users, for notification Cc lists.
    async fn admins(&self) -> Result<Vec<User>>;

    /// Refuses with `UserHasCards` while any card references the user, so
    /// cards are never silently orphaned.
    async fn delete(&self, id: UserId) -> Result<()>;
}
