//! PostgreSQL implementations of the card ledger repository ports.
//!
//! Each port method runs as one transaction. Balance mutations take a
//! `FOR UPDATE` row lock on the card so concurrent deposits and debits
//! are serialized per card.

pub mod postgres;

pub use postgres::PostgresStore;
