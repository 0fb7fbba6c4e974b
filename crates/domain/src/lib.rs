//! Domain core for the card ledger.
//!
//! This crate owns the balance-mutation rules:
//! - `CardNumber` value type gated by the Luhn check
//! - `CardService` for card lifecycle (creation, deposit, status, update)
//! - `ExpenseService` for expense creation with balance debiting
//! - Repository ports (`CardStore`, `ExpenseStore`, `UserStore`) with an
//!   in-memory implementation for tests and local runs
//! - The `ExpenseCreated` domain event and the `EventSink` outbound port
//!
//! Authorization is deliberately absent here: callers check access policy
//! before invoking a service.

pub mod card;
pub mod error;
pub mod expense;
pub mod memory;
pub mod money;
pub mod store;
pub mod user;

pub use card::model::{Card, CardBrand, CardChanges, CardStatus, NewCard};
pub use card::number::{CardNumber, CardNumberError};
pub use card::service::CardService;
pub use error::DomainError;
pub use expense::events::{ChannelSink, EventSink, ExpenseCreated, RecordingSink};
pub use expense::model::{Expense, NewExpense};
pub use expense::service::ExpenseService;
pub use memory::InMemoryStore;
pub use money::Money;
pub use store::{CardStore, ExpenseStore, StoreError, UserStore};
pub use user::{NewUser, User, UserType};
