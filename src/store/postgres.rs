use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};

use super::{CardStore, StoreError, StoreResult};
use crate::models::{Card, CardStatus};

/// Postgres-backed card store
#[derive(Clone)]
pub struct PostgresCardStore {
    pool: PgPool,
}

impl PostgresCardStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool against `database_url` and brings the `cards` schema up
    /// to date before handing the store out.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await?;
        tracing::info!(max_connections, "Database pool created");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| sqlx::Error::Migrate(Box::new(e)))?;
        tracing::info!("Database migrations completed");

        Ok(Self::new(pool))
    }
}

#[derive(Debug, FromRow)]
struct CardRow {
    code: String,
    bank_swift: String,
    client_doc_type: String,
    client_doc_number: String,
    client_name: String,
    client_country: String,
    client_email: String,
    client_bank_id: String,
    card_number: String,
    issued_at: DateTime<Utc>,
    expiry_date: NaiveDate,
    cvv_hash: String,
    status: String,
}

impl TryFrom<CardRow> for Card {
    type Error = StoreError;

    fn try_from(row: CardRow) -> Result<Self, Self::Error> {
        let status: CardStatus = row
            .status
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("card {}: {}", row.code, e)))?;

        Ok(Card {
            code: row.code,
            bank_swift: row.bank_swift,
            client_doc_type: row.client_doc_type,
            client_doc_number: row.client_doc_number,
            client_name: row.client_name,
            client_country: row.client_country,
            client_email: row.client_email,
            client_bank_id: row.client_bank_id,
            card_number: row.card_number,
            issued_at: row.issued_at,
            expiry_date: row.expiry_date,
            cvv_hash: row.cvv_hash,
            status,
        })
    }
}

fn map_write_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StoreError::Conflict(
            db_err
                .constraint()
                .unwrap_or("cards unique constraint")
                .to_string(),
        ),
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl CardStore for PostgresCardStore {
    async fn find_by_code(&self, code: &str) -> StoreResult<Option<Card>> {
        let row = sqlx::query_as::<_, CardRow>(
            r#"
            SELECT * FROM cards WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Card::try_from).transpose()
    }

    async fn find_by_card_number(&self, card_number: &str) -> StoreResult<Option<Card>> {
        let row = sqlx::query_as::<_, CardRow>(
            r#"
            SELECT * FROM cards WHERE card_number = $1
            "#,
        )
        .bind(card_number)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Card::try_from).transpose()
    }

    async fn find_all(&self) -> StoreResult<Vec<Card>> {
        let rows = sqlx::query_as::<_, CardRow>(
            r#"
            SELECT * FROM cards ORDER BY issued_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Card::try_from).collect()
    }

    async fn insert(&self, card: &Card) -> StoreResult<Card> {
        let row = sqlx::query_as::<_, CardRow>(
            r#"
            INSERT INTO cards (
                code, bank_swift, client_doc_type, client_doc_number, client_name,
                client_country, client_email, client_bank_id, card_number,
                issued_at, expiry_date, cvv_hash, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(&card.code)
        .bind(&card.bank_swift)
        .bind(&card.client_doc_type)
        .bind(&card.client_doc_number)
        .bind(&card.client_name)
        .bind(&card.client_country)
        .bind(&card.client_email)
        .bind(&card.client_bank_id)
        .bind(&card.card_number)
        .bind(card.issued_at)
        .bind(card.expiry_date)
        .bind(&card.cvv_hash)
        .bind(card.status.as_code())
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        Card::try_from(row)
    }

    async fn save(&self, card: &Card) -> StoreResult<Card> {
        // Identifiers, dates and the CVV hash are immutable once issued
        let row = sqlx::query_as::<_, CardRow>(
            r#"
            UPDATE cards
            SET
                client_name = $2,
                client_email = $3,
                status = $4
            WHERE code = $1
            RETURNING *
            "#,
        )
        .bind(&card.code)
        .bind(&card.client_name)
        .bind(&card.client_email)
        .bind(card.status.as_code())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?
        .ok_or_else(|| StoreError::NotFound(card.code.clone()))?;

        Card::try_from(row)
    }

    async fn remove(&self, card: &Card) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM cards WHERE code = $1
            "#,
        )
        .bind(&card.code)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(card.code.clone()));
        }

        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
