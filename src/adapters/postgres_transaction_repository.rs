//! Postgres implementation of TransactionRepository.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::domain::{
    CallbackChannel, CustomerInfo, ProductInfo, ShippingInfo, Transaction, TransactionId,
    TransactionStatus,
};
use crate::ports::{RepositoryError, RepositoryResult, TransactionRepository, Transition};

const UNIQUE_VIOLATION: &str = "23505";

const COLUMNS: &str = "tran_id, amount, currency, customer_info, shipping_info, product_info, \
     gateway_session_key, status, resolved_via, created_at, updated_at";

/// Postgres-backed transaction repository.
#[derive(Clone)]
pub struct PostgresTransactionRepository {
    pool: PgPool,
}

impl PostgresTransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionRepository for PostgresTransactionRepository {
    async fn create(&self, tx: &Transaction) -> RepositoryResult<Transaction> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            r#"
            INSERT INTO payment_transactions (
                tran_id, amount, currency, customer_info, shipping_info, product_info,
                gateway_session_key, status, resolved_via, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(tx.id.as_str())
        .bind(&tx.amount)
        .bind(&tx.currency)
        .bind(Json(&tx.customer_info))
        .bind(Json(&tx.shipping_info))
        .bind(Json(&tx.product_info))
        .bind(&tx.gateway_session_key)
        .bind(tx.status.as_str())
        .bind(tx.resolved_via.map(|c| c.as_str()))
        .bind(tx.created_at)
        .bind(tx.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err)
                if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) =>
            {
                RepositoryError::DuplicateId(tx.id.to_string())
            }
            other => RepositoryError::from(other),
        })?;

        row.into_domain()
    }

    async fn get(&self, id: &TransactionId) -> RepositoryResult<Transaction> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {COLUMNS} FROM payment_transactions WHERE tran_id = $1"
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        row.ok_or_else(|| RepositoryError::NotFound(id.to_string()))?
            .into_domain()
    }

    async fn update_status(
        &self,
        id: &TransactionId,
        status: TransactionStatus,
        channel: CallbackChannel,
    ) -> RepositoryResult<Transition> {
        // Compare-and-swap on 'pending': of two racing first transitions only
        // one row update can match.
        let updated = sqlx::query_as::<_, TransactionRow>(&format!(
            r#"
            UPDATE payment_transactions
            SET status = $2, resolved_via = $3, updated_at = NOW()
            WHERE tran_id = $1 AND status = 'pending'
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id.as_str())
        .bind(status.as_str())
        .bind(channel.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        match updated {
            Some(row) => Ok(Transition::Applied(row.into_domain()?)),
            None => Ok(Transition::Unchanged(self.get(id).await?)),
        }
    }

    async fn ping(&self) -> RepositoryResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::from)?;
        Ok(())
    }
}

/// Internal row type for SQLx. Not exposed outside the adapter.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    tran_id: String,
    amount: BigDecimal,
    currency: String,
    customer_info: Json<CustomerInfo>,
    shipping_info: Json<ShippingInfo>,
    product_info: Json<ProductInfo>,
    gateway_session_key: Option<String>,
    status: String,
    resolved_via: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TransactionRow {
    fn into_domain(self) -> RepositoryResult<Transaction> {
        let status = self
            .status
            .parse::<TransactionStatus>()
            .map_err(RepositoryError::Database)?;
        let resolved_via = self
            .resolved_via
            .map(|c| c.parse::<CallbackChannel>())
            .transpose()
            .map_err(RepositoryError::Database)?;

        Ok(Transaction {
            id: TransactionId::from(self.tran_id),
            amount: self.amount,
            currency: self.currency,
            customer_info: self.customer_info.0,
            shipping_info: self.shipping_info.0,
            product_info: self.product_info.0,
            gateway_session_key: self.gateway_session_key,
            status,
            resolved_via,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
