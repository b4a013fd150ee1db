pub mod sslcommerz;

pub use sslcommerz::{SslCommerzClient, LIVE_BASE_URL, SANDBOX_BASE_URL};
