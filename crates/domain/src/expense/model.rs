//! Expense entity.

use chrono::NaiveDate;
use common::{CardId, ExpenseId};
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// A debit recorded against a card.
///
/// Expenses are immutable once created; `date` is the creation date and
/// never changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub card_id: CardId,
    pub amount: Money,
    pub description: String,
    pub date: NaiveDate,
}

/// Fields required to record an expense. The date is stamped by the store
/// at insert time.
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub card_id: CardId,
    pub amount: Money,
    pub description: String,
}
