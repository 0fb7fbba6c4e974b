//! Expense alert composition.

use chrono::NaiveDate;
use domain::{ExpenseCreated, User};
use serde::Serialize;

/// Subject line used for every expense alert.
pub const SUBJECT: &str = "Nova Despesa Registrada";

/// A composed expense alert, ready for a mail transport.
///
/// Goes to the card owner with every admin in copy. Only the last four
/// digits of the card number ever leave the system.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpenseAlert {
    pub to: String,
    pub cc: Vec<String>,
    pub subject: String,
    pub owner_name: String,
    /// Amount in pt-BR notation, e.g. `"1.234,56"`.
    pub amount: String,
    pub description: String,
    pub date: NaiveDate,
    pub last_four: String,
}

impl ExpenseAlert {
    /// Builds the alert from a created-expense event and the admin list.
    pub fn compose(event: &ExpenseCreated, admins: &[User]) -> Self {
        Self {
            to: event.user.email.clone(),
            cc: admins.iter().map(|admin| admin.email.clone()).collect(),
            subject: SUBJECT.to_string(),
            owner_name: event.user.name.clone(),
            amount: event.expense.amount.formatted(),
            description: event.expense.description.clone(),
            date: event.expense.date,
            last_four: event.card.number.last_four().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::{CardId, ExpenseId, UserId};
    use domain::{Card, CardBrand, CardNumber, CardStatus, Expense, Money, UserType};

    fn user(name: &str, email: &str, user_type: UserType) -> User {
        User {
            id: UserId::new(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            user_type,
        }
    }

    fn event() -> ExpenseCreated {
        let owner = user("Ana", "ana@example.com", UserType::Comum);
        let card = Card {
            id: CardId::new(),
            user_id: owner.id,
            number: CardNumber::parse("1234567812345670").unwrap(),
            brand: CardBrand::Visa,
            status: CardStatus::Ativo,
            balance: Money::from_cents(8000),
            created_at: Utc::now(),
        };
        let expense = Expense {
            id: ExpenseId::new(),
            card_id: card.id,
            amount: Money::from_cents(123_456),
            description: "passagem aérea".to_string(),
            date: Utc::now().date_naive(),
        };
        ExpenseCreated {
            expense,
            card,
            user: owner,
        }
    }

    #[test]
    fn compose_addresses_owner_with_admins_in_copy() {
        let admins = vec![
            user("Root", "admin@example.com", UserType::Admin),
            user("Ops", "ops@example.com", UserType::Admin),
        ];
        let alert = ExpenseAlert::compose(&event(), &admins);

        assert_eq!(alert.to, "ana@example.com");
        assert_eq!(alert.cc, vec!["admin@example.com", "ops@example.com"]);
        assert_eq!(alert.subject, SUBJECT);
    }

    #[test]
    fn compose_formats_amount_and_masks_number() {
        let alert = ExpenseAlert::compose(&event(), &[]);

        assert_eq!(alert.owner_name, "Ana");
        assert_eq!(alert.amount, "1.234,56");
        assert_eq!(alert.description, "passagem aérea");
        assert_eq!(alert.last_four, "5670");
        assert!(alert.cc.is_empty());
    }
}
