//! Card entity and its enums.

use chrono::{DateTime, Utc};
use common::{CardId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::card::number::CardNumber;
use crate::money::Money;

/// Card lifecycle status.
///
/// Only `Ativo` permits deposits and expense creation. Transitions between
/// the three statuses are unrestricted: a cancelled card can be reactivated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardStatus {
    Ativo,
    Bloqueado,
    Cancelado,
}

impl CardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardStatus::Ativo => "Ativo",
            CardStatus::Bloqueado => "Bloqueado",
            CardStatus::Cancelado => "Cancelado",
        }
    }
}

impl std::fmt::Display for CardStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unrecognized status strings.
#[derive(Debug, Error)]
#[error("unknown card status: {0}")]
pub struct ParseCardStatusError(String);

impl std::str::FromStr for CardStatus {
    type Err = ParseCardStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Ativo" => Ok(CardStatus::Ativo),
            "Bloqueado" => Ok(CardStatus::Bloqueado),
            "Cancelado" => Ok(CardStatus::Cancelado),
            other => Err(ParseCardStatusError(other.to_string())),
        }
    }
}

/// Card brand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardBrand {
    Visa,
    MasterCard,
    Elo,
    #[serde(rename = "American Express")]
    AmericanExpress,
}

impl CardBrand {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardBrand::Visa => "Visa",
            CardBrand::MasterCard => "MasterCard",
            CardBrand::Elo => "Elo",
            CardBrand::AmericanExpress => "American Express",
        }
    }
}

impl std::fmt::Display for CardBrand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unrecognized brand strings.
#[derive(Debug, Error)]
#[error("unknown card brand: {0}")]
pub struct ParseCardBrandError(String);

impl std::str::FromStr for CardBrand {
    type Err = ParseCardBrandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Visa" => Ok(CardBrand::Visa),
            "MasterCard" => Ok(CardBrand::MasterCard),
            "Elo" => Ok(CardBrand::Elo),
            "American Express" => Ok(CardBrand::AmericanExpress),
            other => Err(ParseCardBrandError(other.to_string())),
        }
    }
}

/// A card owned by a user.
///
/// `balance` is never set directly by a caller; it only moves through
/// deposits and expense debits, and never goes below zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub user_id: UserId,
    pub number: CardNumber,
    pub brand: CardBrand,
    pub status: CardStatus,
    pub balance: Money,
    pub created_at: DateTime<Utc>,
}

impl Card {
    pub fn is_active(&self) -> bool {
        self.status == CardStatus::Ativo
    }
}

/// Fields required to create a card. Balance starts at zero; there is no
/// way to express an initial balance here.
#[derive(Debug, Clone)]
pub struct NewCard {
    pub number: CardNumber,
    pub brand: CardBrand,
    pub status: CardStatus,
    pub user_id: UserId,
}

/// Partial update applied to a card.
///
/// Balance and owner are deliberately not representable: the service
/// boundary cannot be talked into mutating either.
#[derive(Debug, Clone, Default)]
pub struct CardChanges {
    pub number: Option<CardNumber>,
    pub status: Option<CardStatus>,
    pub brand: Option<CardBrand>,
}

impl CardChanges {
    /// True when no field would change.
    pub fn is_empty(&self) -> bool {
        self.number.is_none() && self.status.is_none() && self.brand.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_string_roundtrip() {
        for s in [
            CardStatus::Ativo,
            CardStatus::Bloqueado,
            CardStatus::Cancelado,
        ] {
            assert_eq!(s.as_str().parse::<CardStatus>().unwrap(), s);
        }
        assert!("Expirado".parse::<CardStatus>().is_err());
    }

    #[test]
    fn brand_string_roundtrip() {
        for b in [
            CardBrand::Visa,
            CardBrand::MasterCard,
            CardBrand::Elo,
            CardBrand::AmericanExpress,
        ] {
            assert_eq!(b.as_str().parse::<CardBrand>().unwrap(), b);
        }
    }

    #[test]
    fn amex_serializes_with_space() {
        let json = serde_json::to_string(&CardBrand::AmericanExpress).unwrap();
        assert_eq!(json, "\"American Express\"");
        let back: CardBrand = serde_json::from_str(&json).unwrap();
        assert_eq!(back, CardBrand::AmericanExpress);
    }

    #[test]
    fn only_ativo_is_active() {
        let card = Card {
            id: CardId::new(),
            user_id: UserId::new(),
            number: CardNumber::parse("1234567812345670").unwrap(),
            brand: CardBrand::Visa,
            status: CardStatus::Ativo,
            balance: Money::zero(),
            created_at: Utc::now(),
        };
        assert!(card.is_active());
        for status in [CardStatus::Bloqueado, CardStatus::Cancelado] {
            let card = Card {
                status,
                ..card.clone()
            };
            assert!(!card.is_active());
        }
    }

    #[test]
    fn empty_changes() {
        assert!(CardChanges::default().is_empty());
        let changes = CardChanges {
            status: Some(CardStatus::Bloqueado),
            ..CardChanges::default()
        };
        assert!(!changes.is_empty());
    }
}
