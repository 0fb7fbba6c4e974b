use async_trait::async_trait;
use chrono::Utc;
use common::{CardId, ExpenseId, UserId};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use domain::store::{CardStore, ExpenseStore, Result, StoreError, UserStore};
use domain::{
    Card, CardChanges, CardNumber, Expense, Money, NewCard, NewExpense, NewUser, User,
};

const CARD_COLUMNS: &str = "id, user_id, number, brand, status, balance, created_at";
const EXPENSE_COLUMNS: &str = "id, card_id, amount, description, date";
const USER_COLUMNS: &str = "id, name, email, password_hash, user_type";

/// PostgreSQL-backed implementation of the repository ports.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the database at `url`.
    pub async fn connect(url: &str) -> std::result::Result<Self, sqlx::Error> {
        let pool = PgPool::connect(url).await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_card(row: &PgRow) -> Result<Card> {
        let number: String = row.try_get("number").map_err(StoreError::backend)?;
        let brand: String = row.try_get("brand").map_err(StoreError::backend)?;
        let status: String = row.try_get("status").map_err(StoreError::backend)?;

        Ok(Card {
            id: CardId::from_uuid(row.try_get::<Uuid, _>("id").map_err(StoreError::backend)?),
            user_id: UserId::from_uuid(
                row.try_get::<Uuid, _>("user_id")
                    .map_err(StoreError::backend)?,
            ),
            number: CardNumber::parse(&number).map_err(StoreError::backend)?,
            brand: brand.parse().map_err(StoreError::backend)?,
            status: status.parse().map_err(StoreError::backend)?,
            balance: Money::from_cents(row.try_get("balance").map_err(StoreError::backend)?),
            created_at: row.try_get("created_at").map_err(StoreError::backend)?,
        })
    }

    fn row_to_expense(row: &PgRow) -> Result<Expense> {
        Ok(Expense {
            id: ExpenseId::from_uuid(row.try_get::<Uuid, _>("id").map_err(StoreError::backend)?),
            card_id: CardId::from_uuid(
                row.try_get::<Uuid, _>("card_id")
                    .map_err(StoreError::backend)?,
            ),
            amount: Money::from_cents(row.try_get("amount").map_err(StoreError::backend)?),
            description: row.try_get("description").map_err(StoreError::backend)?,
            date: row.try_get("date").map_err(StoreError::backend)?,
        })
    }

    fn row_to_user(row: &PgRow) -> Result<User> {
        let user_type: String = row.try_get("user_type").map_err(StoreError::backend)?;

        Ok(User {
            id: UserId::from_uuid(row.try_get::<Uuid, _>("id").map_err(StoreError::backend)?),
            name: row.try_get("name").map_err(StoreError::backend)?,
            email: row.try_get("email").map_err(StoreError::backend)?,
            password_hash: row.try_get("password_hash").map_err(StoreError::backend)?,
            user_type: user_type.parse().map_err(StoreError::backend)?,
        })
    }
}

/// Maps card write failures, turning the unique-number constraint into its
/// own variant so services can distinguish it from generic failures.
fn map_card_write_err(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.constraint() == Some("cards_number_key")
    {
        return StoreError::DuplicateNumber;
    }
    StoreError::backend(e)
}

fn map_user_write_err(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.constraint() == Some("users_email_key")
    {
        return StoreError::DuplicateEmail;
    }
    StoreError::backend(e)
}

#[async_trait]
impl CardStore for PostgresStore {
    async fn create(&self, new: NewCard) -> Result<Card> {
        let id = CardId::new();
        let row = sqlx::query(&format!(
            "INSERT INTO cards (id, user_id, number, brand, status, balance, created_at) \
             VALUES ($1, $2, $3, $4, $5, 0, $6) \
             RETURNING {CARD_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(new.user_id.as_uuid())
        .bind(new.number.as_str())
        .bind(new.brand.as_str())
        .bind(new.status.as_str())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(map_card_write_err)?;

        Self::row_to_card(&row)
    }

    async fn find(&self, id: CardId) -> Result<Option<Card>> {
        let row = sqlx::query(&format!("SELECT {CARD_COLUMNS} FROM cards WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        row.as_ref().map(Self::row_to_card).transpose()
    }

    async fn list(&self) -> Result<Vec<Card>> {
        let rows = sqlx::query(&format!(
            "SELECT {CARD_COLUMNS} FROM cards ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        rows.iter().map(Self::row_to_card).collect()
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Card>> {
        let rows = sqlx::query(&format!(
            "SELECT {CARD_COLUMNS} FROM cards WHERE user_id = $1 ORDER BY created_at"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        rows.iter().map(Self::row_to_card).collect()
    }

    async fn update(&self, id: CardId, changes: CardChanges) -> Result<Card> {
        let mut tx = self.pool.begin().await.map_err(StoreError::backend)?;

        let row = sqlx::query(&format!(
            "SELECT {CARD_COLUMNS} FROM cards WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(StoreError::backend)?
        .ok_or_else(|| StoreError::card_not_found(id))?;

        let mut card = Self::row_to_card(&row)?;
        if let Some(number) = changes.number {
            card.number = number;
        }
        if let Some(status) = changes.status {
            card.status = status;
        }
        if let Some(brand) = changes.brand {
            card.brand = brand;
        }

        let row = sqlx::query(&format!(
            "UPDATE cards SET number = $1, brand = $2, status = $3 WHERE id = $4 \
             RETURNING {CARD_COLUMNS}"
        ))
        .bind(card.number.as_str())
        .bind(card.brand.as_str())
        .bind(card.status.as_str())
        .bind(id.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_card_write_err)?;

        let card = Self::row_to_card(&row)?;
        tx.commit().await.map_err(StoreError::backend)?;
        Ok(card)
    }

    async fn adjust_balance(&self, id: CardId, delta: Money) -> Result<Card> {
        let mut tx = self.pool.begin().await.map_err(StoreError::backend)?;

        let balance: Option<i64> =
            sqlx::query_scalar("SELECT balance FROM cards WHERE id = $1 FOR UPDATE")
                .bind(id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(StoreError::backend)?;
        let balance = balance.ok_or_else(|| StoreError::card_not_found(id))?;

        let new_balance = balance + delta.cents();
        if new_balance < 0 {
            return Err(StoreError::InsufficientFunds(id));
        }

        let row = sqlx::query(&format!(
            "UPDATE cards SET balance = $1 WHERE id = $2 RETURNING {CARD_COLUMNS}"
        ))
        .bind(new_balance)
        .bind(id.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(StoreError::backend)?;

        let card = Self::row_to_card(&row)?;
        tx.commit().await.map_err(StoreError::backend)?;
        Ok(card)
    }

    async fn delete(&self, id: CardId) -> Result<()> {
        let result = sqlx::query("DELETE FROM cards WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::card_not_found(id));
        }
        Ok(())
    }
}

#[async_trait]
impl ExpenseStore for PostgresStore {
    async fn record(&self, new: NewExpense) -> Result<(Expense, Card)> {
        let mut tx = self.pool.begin().await.map_err(StoreError::backend)?;

        let balance: Option<i64> =
            sqlx::query_scalar("SELECT balance FROM cards WHERE id = $1 FOR UPDATE")
                .bind(new.card_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(StoreError::backend)?;
        let balance = balance.ok_or_else(|| StoreError::card_not_found(new.card_id))?;

        if balance < new.amount.cents() {
            return Err(StoreError::InsufficientFunds(new.card_id));
        }

        let row = sqlx::query(&format!(
            "INSERT INTO expenses (id, card_id, amount, description, date) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {EXPENSE_COLUMNS}"
        ))
        .bind(ExpenseId::new().as_uuid())
        .bind(new.card_id.as_uuid())
        .bind(new.amount.cents())
        .bind(&new.description)
        .bind(Utc::now().date_naive())
        .fetch_one(&mut *tx)
        .await
        .map_err(StoreError::backend)?;
        let expense = Self::row_to_expense(&row)?;

        let row = sqlx::query(&format!(
            "UPDATE cards SET balance = balance - $1 WHERE id = $2 RETURNING {CARD_COLUMNS}"
        ))
        .bind(new.amount.cents())
        .bind(new.card_id.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(StoreError::backend)?;
        let card = Self::row_to_card(&row)?;

        tx.commit().await.map_err(StoreError::backend)?;
        Ok((expense, card))
    }

    async fn find(&self, id: ExpenseId) -> Result<Option<Expense>> {
        let row = sqlx::query(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        row.as_ref().map(Self::row_to_expense).transpose()
    }

    async fn list(&self) -> Result<Vec<Expense>> {
        let rows = sqlx::query(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses ORDER BY date"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        rows.iter().map(Self::row_to_expense).collect()
    }

    async fn list_for_card(&self, card_id: CardId) -> Result<Vec<Expense>> {
        let rows = sqlx::query(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses WHERE card_id = $1 ORDER BY date"
        ))
        .bind(card_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        rows.iter().map(Self::row_to_expense).collect()
    }

    async fn delete(&self, id: ExpenseId) -> Result<()> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::expense_not_found(id));
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    async fn create(&self, new: NewUser) -> Result<User> {
        let row = sqlx::query(&format!(
            "INSERT INTO users (id, name, email, password_hash, user_type) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(UserId::new().as_uuid())
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(new.user_type.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(map_user_write_err)?;

        Self::row_to_user(&row)
    }

    async fn find(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    async fn admins(&self) -> Result<Vec<User>> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_type = 'Admin' ORDER BY email"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        rows.iter().map(Self::row_to_user).collect()
    }

    async fn delete(&self, id: UserId) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(StoreError::backend)?;

        let owned: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cards WHERE user_id = $1")
            .bind(id.as_uuid())
            .fetch_one(&mut *tx)
            .await
            .map_err(StoreError::backend)?;
        if owned > 0 {
            return Err(StoreError::UserHasCards(id));
        }

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(StoreError::backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::user_not_found(id));
        }

        tx.commit().await.map_err(StoreError::backend)?;
        Ok(())
    }
}
