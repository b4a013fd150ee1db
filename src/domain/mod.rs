pub mod order;
pub mod transaction;

pub use order::{CustomerInfo, ProductInfo, ShippingInfo};
pub use transaction::{
    CallbackChannel, Outcome, Transaction, TransactionId, TransactionStatus,
};
