//! Access policy predicates, checked before any service call.
//!
//! The domain core never sees the actor; these run in the handlers.
//! Listing everything and creating entities are admin operations; acting
//! on a specific card (or, through its card, an expense) is allowed for
//! an admin or the owning user.

use common::UserId;
use domain::{Card, User};

/// Listing every card or expense.
pub fn can_view_any(actor: &User) -> bool {
    actor.is_admin()
}

/// Creating a card or an expense.
pub fn can_create(actor: &User) -> bool {
    actor.is_admin()
}

/// Viewing, updating, depositing on, changing status of, or deleting a
/// card. Expenses inherit this through their owning card.
pub fn can_access_card(actor: &User, card: &Card) -> bool {
    actor.is_admin() || card.user_id == actor.id
}

/// Viewing or deleting a user account.
pub fn can_access_user(actor: &User, target: UserId) -> bool {
    actor.is_admin() || actor.id == target
}
