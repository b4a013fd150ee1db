pub mod lifecycle;

pub use lifecycle::{Initiated, LifecycleError, PaymentRequest, TransactionLifecycle};
