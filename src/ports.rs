//! Ports the lifecycle service depends on.
//! Adapters for persistence and the payment gateway implement these traits,
//! so the service can be wired with Postgres and SSLCommerz in production
//! and with in-memory doubles in tests.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use std::time::Duration;
use thiserror::Error;

use crate::domain::{
    CallbackChannel, CustomerInfo, ProductInfo, ShippingInfo, Transaction, TransactionId,
    TransactionStatus,
};

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Transaction not found: {0}")]
    NotFound(String),

    #[error("Duplicate transaction id: {0}")]
    DuplicateId(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("row not found".to_string()),
            other => RepositoryError::Database(other.to_string()),
        }
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Result of a conditional status write.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// The record was pending and now holds the new status.
    Applied(Transaction),
    /// The record was already terminal; nothing was written.
    Unchanged(Transaction),
}

impl Transition {
    pub fn transaction(&self) -> &Transaction {
        match self {
            Transition::Applied(tx) | Transition::Unchanged(tx) => tx,
        }
    }

    pub fn applied(&self) -> bool {
        matches!(self, Transition::Applied(_))
    }
}

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Inserts a new record. Fails with `DuplicateId` if the id is taken.
    async fn create(&self, tx: &Transaction) -> RepositoryResult<Transaction>;

    async fn get(&self, id: &TransactionId) -> RepositoryResult<Transaction>;

    /// Sets `status` only while the stored status is still `pending`.
    async fn update_status(
        &self,
        id: &TransactionId,
        status: TransactionStatus,
        channel: CallbackChannel,
    ) -> RepositoryResult<Transition>;

    async fn ping(&self) -> RepositoryResult<()>;
}

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Gateway rejected the session: {reason}")]
    Rejected {
        http_status: u16,
        reason: String,
        payload: serde_json::Value,
    },

    #[error("Invalid response from gateway: {0}")]
    InvalidResponse(String),

    #[error("Circuit breaker open: {0}")]
    CircuitBreakerOpen(String),

    #[error("Gateway did not answer within {0:?}")]
    Timeout(Duration),
}

impl GatewayError {
    /// Whether the error says the gateway itself is unhealthy. A well-formed
    /// rejection of one order is the caller's problem and does not count.
    pub fn is_outage(&self) -> bool {
        match self {
            GatewayError::Request(_)
            | GatewayError::InvalidResponse(_)
            | GatewayError::Timeout(_) => true,
            GatewayError::Rejected { http_status, .. } => *http_status >= 500,
            GatewayError::CircuitBreakerOpen(_) => false,
        }
    }
}

/// Where the gateway should send the browser and the server-to-server notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackUrls {
    pub success: String,
    pub fail: String,
    pub cancel: String,
    pub ipn: String,
}

impl CallbackUrls {
    pub fn from_base(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            success: format!("{}/payment/success", base),
            fail: format!("{}/payment/fail", base),
            cancel: format!("{}/payment/cancel", base),
            ipn: format!("{}/payment/ipn", base),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderDetails {
    pub tran_id: TransactionId,
    pub total_amount: BigDecimal,
    pub currency: String,
    pub callbacks: CallbackUrls,
    pub product: ProductInfo,
    pub customer: CustomerInfo,
    pub shipping: ShippingInfo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewaySession {
    pub redirect_url: String,
    pub session_key: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn start_session(&self, order: &OrderDetails) -> Result<GatewaySession, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_urls_from_base_strips_trailing_slash() {
        let urls = CallbackUrls::from_base("https://pay.example.com/");

        assert_eq!(urls.success, "https://pay.example.com/payment/success");
        assert_eq!(urls.fail, "https://pay.example.com/payment/fail");
        assert_eq!(urls.cancel, "https://pay.example.com/payment/cancel");
        assert_eq!(urls.ipn, "https://pay.example.com/payment/ipn");
    }

    #[test]
    fn test_only_server_side_failures_are_outages() {
        let business = GatewayError::Rejected {
            http_status: 200,
            reason: "Invalid currency".to_string(),
            payload: serde_json::json!({ "status": "FAILED" }),
        };
        let upstream = GatewayError::Rejected {
            http_status: 503,
            reason: "HTTP 503".to_string(),
            payload: serde_json::Value::Null,
        };

        assert!(!business.is_outage());
        assert!(upstream.is_outage());
        assert!(GatewayError::InvalidResponse("eof".to_string()).is_outage());
        assert!(GatewayError::Timeout(Duration::from_secs(30)).is_outage());
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err = RepositoryError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }
}
