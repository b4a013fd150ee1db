//! In-memory implementation of TransactionRepository, for tests and local runs
//! without a database.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::{CallbackChannel, Transaction, TransactionId, TransactionStatus};
use crate::ports::{RepositoryError, RepositoryResult, TransactionRepository, Transition};

/// A thread-safe in-memory transaction store.
///
/// The write lock is held for the whole check-and-set in `update_status`,
/// which gives the same single-winner behaviour as the Postgres conditional update.
#[derive(Default, Clone)]
pub struct InMemoryTransactionRepository {
    transactions: Arc<RwLock<HashMap<TransactionId, Transaction>>>,
}

impl InMemoryTransactionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.transactions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.transactions.read().await.is_empty()
    }
}

#[async_trait]
impl TransactionRepository for InMemoryTransactionRepository {
    async fn create(&self, tx: &Transaction) -> RepositoryResult<Transaction> {
        let mut transactions = self.transactions.write().await;
        if transactions.contains_key(&tx.id) {
            return Err(RepositoryError::DuplicateId(tx.id.to_string()));
        }
        transactions.insert(tx.id.clone(), tx.clone());
        Ok(tx.clone())
    }

    async fn get(&self, id: &TransactionId) -> RepositoryResult<Transaction> {
        let transactions = self.transactions.read().await;
        transactions
            .get(id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }

    async fn update_status(
        &self,
        id: &TransactionId,
        status: TransactionStatus,
        channel: CallbackChannel,
    ) -> RepositoryResult<Transition> {
        let mut transactions = self.transactions.write().await;
        let tx = transactions
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;

        if tx.status != TransactionStatus::Pending {
            return Ok(Transition::Unchanged(tx.clone()));
        }

        tx.status = status;
        tx.resolved_via = Some(channel);
        tx.updated_at = Utc::now();
        Ok(Transition::Applied(tx.clone()))
    }

    async fn ping(&self) -> RepositoryResult<()> {
        Ok(())
    }
}
