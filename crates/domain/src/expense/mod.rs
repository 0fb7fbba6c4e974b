//! Expense creation: entity, domain service, and the created-expense event.

pub mod events;
pub mod model;
pub mod service;
