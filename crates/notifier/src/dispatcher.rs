//! Event consumer that turns created-expense events into emails.

use domain::{ExpenseCreated, UserStore};
use tokio::sync::mpsc;

use crate::alert::ExpenseAlert;
use crate::error::NotifyError;
use crate::mailer::Mailer;

/// Drains the expense event channel and sends one alert per event.
///
/// Runs as its own task, completely decoupled from the expense
/// transaction: a failure here is logged and counted, never retried
/// against balance state and never surfaced to the API caller.
pub struct Dispatcher<U, M> {
    users: U,
    mailer: M,
}

impl<U, M> Dispatcher<U, M>
where
    U: UserStore,
    M: Mailer,
{
    pub fn new(users: U, mailer: M) -> Self {
        Self { users, mailer }
    }

    /// Consumes events until every sender is dropped.
    pub async fn run(self, mut rx: mpsc::UnboundedReceiver<ExpenseCreated>) {
        while let Some(event) = rx.recv().await {
            if let Err(e) = self.dispatch(&event).await {
                metrics::counter!("notifications_failed").increment(1);
                tracing::warn!(
                    error = %e,
                    expense_id = %event.expense.id,
                    "expense notification failed"
                );
            }
        }
        tracing::debug!("expense event channel closed, dispatcher stopping");
    }

    #[tracing::instrument(skip(self, event), fields(expense_id = %event.expense.id))]
    async fn dispatch(&self, event: &ExpenseCreated) -> Result<(), NotifyError> {
        let admins = self.users.admins().await?;
        let alert = ExpenseAlert::compose(event, &admins);
        self.mailer.send(&alert).await?;

        metrics::counter!("notifications_sent").increment(1);
        tracing::info!(to = %alert.to, cc = alert.cc.len(), "expense alert sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::InMemoryMailer;
    use chrono::Utc;
    use common::{CardId, ExpenseId};
    use domain::{
        Card, CardBrand, CardNumber, CardService, CardStatus, ChannelSink, EventSink, Expense,
        ExpenseService, InMemoryStore, Money, NewUser, User, UserType,
    };

    async fn seed_owner_and_admin(store: &InMemoryStore) -> User {
        let owner = UserStore::create(
            store,
            NewUser {
                name: "Ana".to_string(),
                email: "ana@example.com".to_string(),
                password_hash: "hash".to_string(),
                user_type: UserType::Comum,
            },
        )
        .await
        .unwrap();
        UserStore::create(
            store,
            NewUser {
                name: "Root".to_string(),
                email: "admin@example.com".to_string(),
                password_hash: "hash".to_string(),
                user_type: UserType::Admin,
            },
        )
        .await
        .unwrap();
        owner
    }

    fn event_for(owner: &User, description: &str) -> ExpenseCreated {
        let card = Card {
            id: CardId::new(),
            user_id: owner.id,
            number: CardNumber::parse("1234567812345670").unwrap(),
            brand: CardBrand::Visa,
            status: CardStatus::Ativo,
            balance: Money::from_cents(9000),
            created_at: Utc::now(),
        };
        let expense = Expense {
            id: ExpenseId::new(),
            card_id: card.id,
            amount: Money::from_cents(1000),
            description: description.to_string(),
            date: Utc::now().date_naive(),
        };
        ExpenseCreated {
            expense,
            card,
            user: owner.clone(),
        }
    }

    #[tokio::test]
    async fn expense_flow_produces_one_email() {
        let store = InMemoryStore::new();
        let owner = seed_owner_and_admin(&store).await;

        let (sink, rx) = ChannelSink::new();
        let mailer = InMemoryMailer::new();
        let dispatcher = Dispatcher::new(store.clone(), mailer.clone());
        let handle = tokio::spawn(dispatcher.run(rx));

        let cards = CardService::new(store.clone());
        let expenses = ExpenseService::new(store.clone(), sink);

        let card = cards
            .store(
                "1234567812345670",
                CardStatus::Ativo,
                CardBrand::Visa,
                owner.id,
            )
            .await
            .unwrap();
        let card = cards
            .deposit(&card, Money::from_cents(10_000))
            .await
            .unwrap();
        expenses
            .store(card.id, Money::from_cents(2000), "mercado")
            .await
            .unwrap();

        // Dropping the service drops the only sender, stopping the run.
        drop(expenses);
        handle.await.unwrap();

        let sent = mailer.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "ana@example.com");
        assert_eq!(sent[0].cc, vec!["admin@example.com"]);
        assert_eq!(sent[0].amount, "20,00");
        assert_eq!(sent[0].last_four, "5670");
        assert_eq!(sent[0].owner_name, "Ana");
    }

    #[tokio::test]
    async fn mailer_failure_does_not_stop_the_dispatcher() {
        let store = InMemoryStore::new();
        let owner = seed_owner_and_admin(&store).await;

        let (sink, rx) = ChannelSink::new();
        let mailer = InMemoryMailer::new();
        mailer.fail_once().await;
        let handle = tokio::spawn(Dispatcher::new(store.clone(), mailer.clone()).run(rx));

        sink.publish(event_for(&owner, "primeira")).await;
        sink.publish(event_for(&owner, "segunda")).await;
        drop(sink);
        handle.await.unwrap();

        // The first alert was dropped, the second still went out.
        let sent = mailer.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].description, "segunda");
    }

    #[tokio::test]
    async fn run_stops_when_channel_closes() {
        let store = InMemoryStore::new();
        seed_owner_and_admin(&store).await;

        let (sink, rx) = ChannelSink::new();
        let handle = tokio::spawn(Dispatcher::new(store, InMemoryMailer::new()).run(rx));

        drop(sink);
        handle.await.unwrap();
    }
}
