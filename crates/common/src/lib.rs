//! Shared identifier types used across the card ledger crates.

mod types;

pub use types::{CardId, ExpenseId, UserId};
