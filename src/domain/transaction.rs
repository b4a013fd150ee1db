//! Transaction domain entity.
//! Framework-agnostic representation of a payment session and its lifecycle state.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::order::{CustomerInfo, ProductInfo, ShippingInfo};

/// Opaque transaction identifier, shared with the gateway as `tran_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    /// Allocates a fresh identifier: 8 hex digits of the creation second
    /// followed by 16 random hex digits. 24 characters keeps it under the
    /// gateway's 30 character `tran_id` limit.
    pub fn generate() -> Self {
        let seconds = Utc::now().timestamp() as u32;
        let random = Uuid::new_v4().simple().to_string();
        Self(format!("{:08x}{}", seconds, &random[..16]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TransactionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for TransactionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
    Canceled,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Success => "success",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Canceled => "canceled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "success" => Ok(TransactionStatus::Success),
            "failed" => Ok(TransactionStatus::Failed),
            "canceled" => Ok(TransactionStatus::Canceled),
            other => Err(format!("unknown transaction status '{}'", other)),
        }
    }
}

/// A terminal outcome reported by the gateway. Cannot express `pending`,
/// so no callback can move a record back to its initial state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failed,
    Canceled,
}

impl From<Outcome> for TransactionStatus {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success => TransactionStatus::Success,
            Outcome::Failed => TransactionStatus::Failed,
            Outcome::Canceled => TransactionStatus::Canceled,
        }
    }
}

/// The callback route a terminal status arrived through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallbackChannel {
    Success,
    Fail,
    Cancel,
    Ipn,
}

impl CallbackChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallbackChannel::Success => "success",
            CallbackChannel::Fail => "fail",
            CallbackChannel::Cancel => "cancel",
            CallbackChannel::Ipn => "ipn",
        }
    }
}

impl fmt::Display for CallbackChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CallbackChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(CallbackChannel::Success),
            "fail" => Ok(CallbackChannel::Fail),
            "cancel" => Ok(CallbackChannel::Cancel),
            "ipn" => Ok(CallbackChannel::Ipn),
            other => Err(format!("unknown callback channel '{}'", other)),
        }
    }
}

/// Domain entity representing a payment transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub amount: BigDecimal,
    pub currency: String,
    pub customer_info: CustomerInfo,
    pub shipping_info: ShippingInfo,
    pub product_info: ProductInfo,
    pub gateway_session_key: Option<String>,
    pub status: TransactionStatus,
    pub resolved_via: Option<CallbackChannel>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new_pending(
        id: TransactionId,
        amount: BigDecimal,
        currency: String,
        customer_info: CustomerInfo,
        shipping_info: ShippingInfo,
        product_info: ProductInfo,
        gateway_session_key: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            amount,
            currency,
            customer_info,
            shipping_info,
            product_info,
            gateway_session_key,
            status: TransactionStatus::Pending,
            resolved_via: None,
            created_at: now,
            updated_at: now,
        }
    }
}
