//! Transaction lifecycle: session initiation and callback reconciliation.
//!
//! A transaction starts `pending` and takes exactly one terminal status. The
//! first terminal transition to reach the store wins, whichever callback
//! channel it came through; later ones are acknowledged without effect.

use bigdecimal::BigDecimal;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::domain::{
    CallbackChannel, CustomerInfo, Outcome, ProductInfo, ShippingInfo, Transaction,
    TransactionId, TransactionStatus,
};
use crate::ports::{
    CallbackUrls, GatewayError, OrderDetails, PaymentGateway, RepositoryError,
    TransactionRepository, Transition,
};

/// Gateway status codes on the IPN channel that mean the payment is good.
const VALID_IPN_STATUSES: &[&str] = &["VALID", "VALIDATED"];

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Transaction not found: {0}")]
    NotFound(String),

    #[error("Duplicate transaction id: {0}")]
    DuplicateId(String),

    #[error("Store error: {0}")]
    Store(String),
}

impl From<RepositoryError> for LifecycleError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound(id) => LifecycleError::NotFound(id),
            RepositoryError::DuplicateId(id) => LifecycleError::DuplicateId(id),
            RepositoryError::Database(msg) => LifecycleError::Store(msg),
        }
    }
}

/// Input for starting a payment session.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub amount: BigDecimal,
    pub currency: String,
    pub customer: CustomerInfo,
    pub shipping: ShippingInfo,
    pub product: ProductInfo,
}

/// Output of a successful initiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Initiated {
    pub transaction_id: TransactionId,
    pub redirect_url: String,
}

pub struct TransactionLifecycle {
    repository: Arc<dyn TransactionRepository>,
    gateway: Arc<dyn PaymentGateway>,
    callbacks: CallbackUrls,
    gateway_timeout: Duration,
}

impl TransactionLifecycle {
    pub fn new(
        repository: Arc<dyn TransactionRepository>,
        gateway: Arc<dyn PaymentGateway>,
        callbacks: CallbackUrls,
        gateway_timeout: Duration,
    ) -> Self {
        Self {
            repository,
            gateway,
            callbacks,
            gateway_timeout,
        }
    }

    /// Opens a gateway session and records the pending transaction.
    ///
    /// Nothing is persisted unless the gateway hands back a redirect URL, and
    /// the caller only sees success once the pending record is written.
    pub async fn initiate(&self, request: PaymentRequest) -> Result<Initiated, LifecycleError> {
        let id = TransactionId::generate();

        let order = OrderDetails {
            tran_id: id.clone(),
            total_amount: request.amount,
            currency: request.currency,
            callbacks: self.callbacks.clone(),
            product: request.product,
            customer: request.customer,
            shipping: request.shipping,
        };

        let session =
            match tokio::time::timeout(self.gateway_timeout, self.gateway.start_session(&order))
                .await
            {
                Ok(Ok(session)) => session,
                Ok(Err(e)) => {
                    tracing::error!(tran_id = %id, error = %e, "Gateway session initiation failed");
                    return Err(e.into());
                }
                Err(_) => {
                    tracing::error!(
                        tran_id = %id,
                        timeout_secs = self.gateway_timeout.as_secs(),
                        "Gateway session initiation timed out"
                    );
                    return Err(GatewayError::Timeout(self.gateway_timeout).into());
                }
            };

        let tx = Transaction::new_pending(
            id,
            order.total_amount,
            order.currency,
            order.customer,
            order.shipping,
            order.product,
            session.session_key,
        );

        let stored = self.repository.create(&tx).await.map_err(|e| {
            // The gateway session exists but nothing tracks it; its callbacks
            // will surface as unknown ids.
            tracing::error!(tran_id = %tx.id, error = %e, "Failed to persist pending transaction");
            LifecycleError::from(e)
        })?;

        tracing::info!(
            tran_id = %stored.id,
            amount = %stored.amount,
            currency = %stored.currency,
            "Payment session initiated"
        );

        Ok(Initiated {
            transaction_id: stored.id,
            redirect_url: session.redirect_url,
        })
    }

    /// Applies a terminal outcome. A record that is already terminal is left
    /// untouched and reported as `Transition::Unchanged`.
    pub async fn apply_outcome(
        &self,
        id: &TransactionId,
        outcome: Outcome,
        channel: CallbackChannel,
    ) -> Result<Transition, LifecycleError> {
        let current = self.repository.get(id).await?;
        let requested: TransactionStatus = outcome.into();

        let transition = if current.status.is_terminal() {
            Transition::Unchanged(current)
        } else {
            self.repository.update_status(id, requested, channel).await?
        };

        match &transition {
            Transition::Applied(tx) => {
                tracing::info!(tran_id = %id, status = %tx.status, channel = %channel, "Transaction resolved");
            }
            Transition::Unchanged(tx) if tx.status == requested => {
                tracing::debug!(tran_id = %id, status = %tx.status, channel = %channel, "Duplicate callback ignored");
            }
            Transition::Unchanged(tx) => {
                tracing::warn!(
                    tran_id = %id,
                    status = %tx.status,
                    requested = %requested,
                    channel = %channel,
                    "Conflicting late callback ignored"
                );
            }
        }

        Ok(transition)
    }

    /// Maps an IPN status code onto an outcome and applies it.
    pub async fn apply_async_notification(
        &self,
        id: &TransactionId,
        gateway_status: &str,
    ) -> Result<Transition, LifecycleError> {
        let outcome = outcome_for_ipn_status(gateway_status);
        tracing::debug!(tran_id = %id, gateway_status = %gateway_status, "IPN received");
        self.apply_outcome(id, outcome, CallbackChannel::Ipn).await
    }

    pub async fn get(&self, id: &TransactionId) -> Result<Transaction, LifecycleError> {
        Ok(self.repository.get(id).await?)
    }

    pub async fn store_healthy(&self) -> bool {
        self.repository.ping().await.is_ok()
    }
}

pub fn outcome_for_ipn_status(gateway_status: &str) -> Outcome {
    let status = gateway_status.trim();
    if VALID_IPN_STATUSES
        .iter()
        .any(|valid| status.eq_ignore_ascii_case(valid))
    {
        Outcome::Success
    } else {
        Outcome::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryTransactionRepository;
    use crate::ports::GatewaySession;
    use async_trait::async_trait;

    struct StubGateway {
        redirect_url: String,
    }

    #[async_trait]
    impl PaymentGateway for StubGateway {
        async fn start_session(
            &self,
            _order: &OrderDetails,
        ) -> Result<GatewaySession, GatewayError> {
            Ok(GatewaySession {
                redirect_url: self.redirect_url.clone(),
                session_key: Some("SESSION".to_string()),
            })
        }
    }

    struct FailingGateway;

    #[async_trait]
    impl PaymentGateway for FailingGateway {
        async fn start_session(
            &self,
            _order: &OrderDetails,
        ) -> Result<GatewaySession, GatewayError> {
            Err(GatewayError::Rejected {
                http_status: 200,
                reason: "Store Credential Error".to_string(),
                payload: serde_json::json!({ "status": "FAILED" }),
            })
        }
    }

    struct SlowGateway;

    #[async_trait]
    impl PaymentGateway for SlowGateway {
        async fn start_session(
            &self,
            _order: &OrderDetails,
        ) -> Result<GatewaySession, GatewayError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(GatewaySession {
                redirect_url: "https://gw/pay/late".to_string(),
                session_key: None,
            })
        }
    }

    fn lifecycle(
        repo: &InMemoryTransactionRepository,
        gateway: Arc<dyn PaymentGateway>,
    ) -> TransactionLifecycle {
        TransactionLifecycle::new(
            Arc::new(repo.clone()),
            gateway,
            CallbackUrls::from_base("http://localhost:3030"),
            Duration::from_millis(200),
        )
    }

    fn stub(redirect_url: &str) -> Arc<dyn PaymentGateway> {
        Arc::new(StubGateway {
            redirect_url: redirect_url.to_string(),
        })
    }

    fn request() -> PaymentRequest {
        PaymentRequest {
            amount: BigDecimal::from(1000),
            currency: "BDT".to_string(),
            customer: CustomerInfo::default(),
            shipping: ShippingInfo::default(),
            product: ProductInfo::default(),
        }
    }

    async fn initiated(repo: &InMemoryTransactionRepository) -> (TransactionLifecycle, TransactionId) {
        let service = lifecycle(repo, stub("https://gw/pay/abc"));
        let initiated = service.initiate(request()).await.unwrap();
        (service, initiated.transaction_id)
    }

    #[tokio::test]
    async fn test_initiate_persists_pending_record() {
        let repo = InMemoryTransactionRepository::new();
        let service = lifecycle(&repo, stub("https://gw/pay/abc"));

        let initiated = service.initiate(request()).await.unwrap();

        assert_eq!(initiated.redirect_url, "https://gw/pay/abc");
        assert_eq!(repo.len().await, 1);
        let stored = service.get(&initiated.transaction_id).await.unwrap();
        assert_eq!(stored.status, TransactionStatus::Pending);
        assert_eq!(stored.amount, BigDecimal::from(1000));
        assert_eq!(stored.currency, "BDT");
        assert_eq!(stored.gateway_session_key.as_deref(), Some("SESSION"));
    }

    #[tokio::test]
    async fn test_initiate_gateway_failure_persists_nothing() {
        let repo = InMemoryTransactionRepository::new();
        let service = lifecycle(&repo, Arc::new(FailingGateway));

        let result = service.initiate(request()).await;

        assert!(matches!(
            result,
            Err(LifecycleError::Gateway(GatewayError::Rejected { .. }))
        ));
        assert!(repo.is_empty().await);
    }

    #[tokio::test]
    async fn test_initiate_timeout_persists_nothing() {
        let repo = InMemoryTransactionRepository::new();
        let service = lifecycle(&repo, Arc::new(SlowGateway));

        let result = service.initiate(request()).await;

        assert!(matches!(
            result,
            Err(LifecycleError::Gateway(GatewayError::Timeout(_)))
        ));
        assert!(repo.is_empty().await);
    }

    #[tokio::test]
    async fn test_duplicate_success_is_idempotent() {
        let repo = InMemoryTransactionRepository::new();
        let (service, id) = initiated(&repo).await;

        let first = service
            .apply_outcome(&id, Outcome::Success, CallbackChannel::Success)
            .await
            .unwrap();
        let second = service
            .apply_outcome(&id, Outcome::Success, CallbackChannel::Success)
            .await
            .unwrap();

        assert!(first.applied());
        assert!(!second.applied());
        assert_eq!(
            service.get(&id).await.unwrap().status,
            TransactionStatus::Success
        );
    }

    #[tokio::test]
    async fn test_first_terminal_outcome_wins() {
        let repo = InMemoryTransactionRepository::new();
        let (service, id) = initiated(&repo).await;

        service
            .apply_outcome(&id, Outcome::Success, CallbackChannel::Success)
            .await
            .unwrap();
        service
            .apply_outcome(&id, Outcome::Canceled, CallbackChannel::Cancel)
            .await
            .unwrap();

        let stored = service.get(&id).await.unwrap();
        assert_eq!(stored.status, TransactionStatus::Success);
        assert_eq!(stored.resolved_via, Some(CallbackChannel::Success));
    }

    #[tokio::test]
    async fn test_first_terminal_outcome_wins_reversed() {
        let repo = InMemoryTransactionRepository::new();
        let (service, id) = initiated(&repo).await;

        service
            .apply_outcome(&id, Outcome::Canceled, CallbackChannel::Cancel)
            .await
            .unwrap();
        service
            .apply_outcome(&id, Outcome::Success, CallbackChannel::Success)
            .await
            .unwrap();

        assert_eq!(
            service.get(&id).await.unwrap().status,
            TransactionStatus::Canceled
        );
    }

    #[tokio::test]
    async fn test_outcome_for_unknown_id_is_not_found() {
        let repo = InMemoryTransactionRepository::new();
        let service = lifecycle(&repo, stub("https://gw/pay/abc"));

        let result = service
            .apply_outcome(
                &TransactionId::from("unknown"),
                Outcome::Success,
                CallbackChannel::Success,
            )
            .await;

        assert!(matches!(result, Err(LifecycleError::NotFound(_))));
        assert!(repo.is_empty().await);
    }

    #[tokio::test]
    async fn test_valid_ipn_then_failed_ipn() {
        let repo = InMemoryTransactionRepository::new();
        let (service, id) = initiated(&repo).await;

        let valid = service.apply_async_notification(&id, "VALID").await.unwrap();
        assert!(valid.applied());
        assert_eq!(valid.transaction().status, TransactionStatus::Success);
        assert_eq!(valid.transaction().resolved_via, Some(CallbackChannel::Ipn));

        let failed = service.apply_async_notification(&id, "FAILED").await.unwrap();
        assert!(!failed.applied());
        assert_eq!(
            service.get(&id).await.unwrap().status,
            TransactionStatus::Success
        );
    }

    #[tokio::test]
    async fn test_concurrent_first_transitions_converge() {
        let repo = InMemoryTransactionRepository::new();
        let (service, id) = initiated(&repo).await;
        let service = Arc::new(service);

        let handles: Vec<_> = [Outcome::Success, Outcome::Failed, Outcome::Canceled]
            .into_iter()
            .map(|outcome| {
                let service = Arc::clone(&service);
                let id = id.clone();
                tokio::spawn(async move {
                    service
                        .apply_outcome(&id, outcome, CallbackChannel::Ipn)
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut applied = 0;
        for handle in handles {
            if handle.await.unwrap().applied() {
                applied += 1;
            }
        }

        assert_eq!(applied, 1);
        assert!(service.get(&id).await.unwrap().status.is_terminal());
    }

    #[test]
    fn test_ipn_status_normalization() {
        assert_eq!(outcome_for_ipn_status("VALID"), Outcome::Success);
        assert_eq!(outcome_for_ipn_status(" validated "), Outcome::Success);
        assert_eq!(outcome_for_ipn_status("FAILED"), Outcome::Failed);
        assert_eq!(outcome_for_ipn_status("CANCELLED"), Outcome::Failed);
        assert_eq!(outcome_for_ipn_status(""), Outcome::Failed);
    }
}
