use async_trait::async_trait;
use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{backoff, failure_policy, Config, Error as FailsafeError, StateMachine};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::ports::{GatewayError, GatewaySession, OrderDetails, PaymentGateway};
use crate::utils::sanitize::sanitize_json;

pub const SANDBOX_BASE_URL: &str = "https://sandbox.sslcommerz.com";
pub const LIVE_BASE_URL: &str = "https://securepay.sslcommerz.com";
const SESSION_PATH: &str = "/gwprocess/v4/api.php";

/// Response from the session initiation endpoint. Only the fields the broker reads.
#[derive(Debug, Deserialize)]
struct SessionResponse {
    status: String,
    #[serde(default)]
    failedreason: Option<String>,
    #[serde(default)]
    sessionkey: Option<String>,
    #[serde(rename = "GatewayPageURL", default)]
    gateway_page_url: Option<String>,
}

/// HTTP client for the SSLCommerz hosted checkout API
#[derive(Clone)]
pub struct SslCommerzClient {
    client: Client,
    base_url: String,
    store_id: String,
    store_passwd: String,
    circuit_breaker: StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>,
}

impl SslCommerzClient {
    /// Creates a client against an explicit gateway host
    pub fn new(base_url: String, store_id: String, store_passwd: String) -> Self {
        Self::with_circuit_breaker(base_url, store_id, store_passwd, 3, 60)
    }

    /// Creates a client with custom circuit breaker configuration
    pub fn with_circuit_breaker(
        base_url: String,
        store_id: String,
        store_passwd: String,
        failure_threshold: u32,
        reset_timeout_secs: u64,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        let backoff = backoff::equal_jittered(
            Duration::from_secs(reset_timeout_secs),
            Duration::from_secs(reset_timeout_secs * 2),
        );
        let policy = failure_policy::consecutive_failures(failure_threshold, backoff);
        let circuit_breaker = Config::new().failure_policy(policy).build();

        SslCommerzClient {
            client,
            base_url,
            store_id,
            store_passwd,
            circuit_breaker,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the current state of the circuit breaker
    pub fn circuit_state(&self) -> String {
        if self.circuit_breaker.is_call_permitted() {
            "closed".to_string()
        } else {
            "open".to_string()
        }
    }

    fn form_fields(&self, order: &OrderDetails) -> Vec<(&'static str, String)> {
        let customer = &order.customer;
        let shipping = &order.shipping;

        let mut fields = vec![
            ("store_id", self.store_id.clone()),
            ("store_passwd", self.store_passwd.clone()),
            ("total_amount", order.total_amount.to_string()),
            ("currency", order.currency.clone()),
            ("tran_id", order.tran_id.to_string()),
            ("success_url", order.callbacks.success.clone()),
            ("fail_url", order.callbacks.fail.clone()),
            ("cancel_url", order.callbacks.cancel.clone()),
            ("ipn_url", order.callbacks.ipn.clone()),
            ("shipping_method", shipping.method.clone()),
            ("product_name", order.product.name.clone()),
            ("product_category", order.product.category.clone()),
            ("product_profile", order.product.profile.clone()),
            ("cus_name", customer.name.clone()),
            ("cus_email", customer.email.clone()),
            ("cus_add1", customer.address_line1.clone()),
            ("cus_city", customer.city.clone()),
            ("cus_postcode", customer.postcode.clone()),
            ("cus_country", customer.country.clone()),
            ("cus_phone", customer.phone.clone()),
            ("ship_name", shipping.name.clone()),
            ("ship_add1", shipping.address_line1.clone()),
            ("ship_city", shipping.city.clone()),
            ("ship_postcode", shipping.postcode.clone()),
            ("ship_country", shipping.country.clone()),
        ];

        let optional = [
            ("cus_add2", &customer.address_line2),
            ("cus_state", &customer.state),
            ("cus_fax", &customer.fax),
            ("ship_add2", &shipping.address_line2),
            ("ship_state", &shipping.state),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                fields.push((key, value.clone()));
            }
        }

        fields
    }
}

#[async_trait]
impl PaymentGateway for SslCommerzClient {
    async fn start_session(&self, order: &OrderDetails) -> Result<GatewaySession, GatewayError> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), SESSION_PATH);
        let client = self.client.clone();
        let fields = self.form_fields(order);

        let result = self
            .circuit_breaker
            .call_with(
                |e: &GatewayError| e.is_outage(),
                post_session(client, url, fields),
            )
            .await;

        match result {
            Ok(session) => Ok(session),
            Err(FailsafeError::Rejected) => Err(GatewayError::CircuitBreakerOpen(
                "SSLCommerz circuit breaker is open".to_string(),
            )),
            Err(FailsafeError::Inner(e)) => {
                if let GatewayError::Rejected { reason, payload, .. } = &e {
                    tracing::warn!(
                        tran_id = %order.tran_id,
                        reason = %reason,
                        payload = %sanitize_json(payload),
                        "Gateway rejected session"
                    );
                }
                Err(e)
            }
        }
    }
}

async fn post_session(
    client: Client,
    url: String,
    fields: Vec<(&'static str, String)>,
) -> Result<GatewaySession, GatewayError> {
    let response = client.post(&url).form(&fields).send().await?;
    let status = response.status();
    let body = response.text().await?;
    let payload: serde_json::Value = serde_json::from_str(&body)
        .unwrap_or_else(|_| serde_json::Value::String(body.clone()));

    if !status.is_success() {
        return Err(GatewayError::Rejected {
            http_status: status.as_u16(),
            reason: format!("HTTP {}", status.as_u16()),
            payload,
        });
    }

    let parsed: SessionResponse = serde_json::from_value(payload.clone())
        .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

    let redirect_url = parsed.gateway_page_url.filter(|url| !url.is_empty());

    match redirect_url {
        Some(redirect_url) if parsed.status.eq_ignore_ascii_case("SUCCESS") => Ok(GatewaySession {
            redirect_url,
            session_key: parsed.sessionkey.filter(|key| !key.is_empty()),
        }),
        _ => Err(GatewayError::Rejected {
            http_status: status.as_u16(),
            reason: parsed
                .failedreason
                .filter(|reason| !reason.is_empty())
                .unwrap_or(parsed.status),
            payload,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CustomerInfo, ProductInfo, ShippingInfo, TransactionId};
    use crate::ports::CallbackUrls;
    use bigdecimal::BigDecimal;

    fn order() -> OrderDetails {
        OrderDetails {
            tran_id: TransactionId::from("65f0c0de0123456789abcdef"),
            total_amount: BigDecimal::from(1000),
            currency: "BDT".to_string(),
            callbacks: CallbackUrls::from_base("http://localhost:3030"),
            product: ProductInfo::default(),
            customer: CustomerInfo::default(),
            shipping: ShippingInfo::default(),
        }
    }

    fn client(base_url: String) -> SslCommerzClient {
        SslCommerzClient::new(base_url, "teststore".to_string(), "teststore@ssl".to_string())
    }

    #[test]
    fn test_form_fields_carry_order_and_credentials() {
        let fields = client(SANDBOX_BASE_URL.to_string()).form_fields(&order());
        let get = |key: &str| {
            fields
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(get("store_id"), Some("teststore"));
        assert_eq!(get("tran_id"), Some("65f0c0de0123456789abcdef"));
        assert_eq!(get("total_amount"), Some("1000"));
        assert_eq!(get("ipn_url"), Some("http://localhost:3030/payment/ipn"));
        assert_eq!(get("shipping_method"), Some("Courier"));
        assert_eq!(get("cus_fax"), None);
    }

    #[test]
    fn test_circuit_breaker_starts_closed() {
        let client = client(SANDBOX_BASE_URL.to_string());
        assert_eq!(client.circuit_state(), "closed");
    }

    #[tokio::test]
    async fn test_start_session_success() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/gwprocess/v4/api.php")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("store_id".into(), "teststore".into()),
                mockito::Matcher::UrlEncoded("currency".into(), "BDT".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"status":"SUCCESS","failedreason":"","sessionkey":"ABC123","GatewayPageURL":"https://sandbox.sslcommerz.com/EasyCheckOut/testcdeABC123"}"#,
            )
            .create_async()
            .await;

        let session = client(server.url()).start_session(&order()).await.unwrap();

        assert_eq!(
            session.redirect_url,
            "https://sandbox.sslcommerz.com/EasyCheckOut/testcdeABC123"
        );
        assert_eq!(session.session_key.as_deref(), Some("ABC123"));
    }

    #[tokio::test]
    async fn test_start_session_failed_status_carries_reason() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/gwprocess/v4/api.php")
            .with_status(200)
            .with_body(r#"{"status":"FAILED","failedreason":"Store Credential Error Or Store is De-active","GatewayPageURL":""}"#)
            .create_async()
            .await;

        let result = client(server.url()).start_session(&order()).await;

        match result {
            Err(GatewayError::Rejected { http_status, reason, payload }) => {
                assert_eq!(http_status, 200);
                assert_eq!(reason, "Store Credential Error Or Store is De-active");
                assert_eq!(payload["status"], "FAILED");
            }
            other => panic!("expected Rejected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_start_session_http_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/gwprocess/v4/api.php")
            .with_status(500)
            .with_body("upstream unavailable")
            .create_async()
            .await;

        let result = client(server.url()).start_session(&order()).await;

        assert!(matches!(
            result,
            Err(GatewayError::Rejected { ref reason, .. }) if reason == "HTTP 500"
        ));
    }

    #[tokio::test]
    async fn test_start_session_garbage_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/gwprocess/v4/api.php")
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let result = client(server.url()).start_session(&order()).await;
        assert!(matches!(result, Err(GatewayError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_circuit_breaker_opens_after_failures() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/gwprocess/v4/api.php")
            .with_status(500)
            .expect_at_least(3)
            .create_async()
            .await;

        let client = SslCommerzClient::with_circuit_breaker(
            server.url(),
            "teststore".to_string(),
            "teststore@ssl".to_string(),
            3,
            60,
        );

        for _ in 0..3 {
            let _ = client.start_session(&order()).await;
        }

        let result = client.start_session(&order()).await;
        assert!(matches!(result, Err(GatewayError::CircuitBreakerOpen(_))));
    }

    #[tokio::test]
    async fn test_business_rejections_keep_circuit_closed() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/gwprocess/v4/api.php")
            .with_status(200)
            .with_body(r#"{"status":"FAILED","failedreason":"Invalid currency","GatewayPageURL":""}"#)
            .expect(4)
            .create_async()
            .await;

        let client = SslCommerzClient::with_circuit_breaker(
            server.url(),
            "teststore".to_string(),
            "teststore@ssl".to_string(),
            3,
            60,
        );

        for _ in 0..3 {
            let result = client.start_session(&order()).await;
            assert!(matches!(result, Err(GatewayError::Rejected { .. })));
        }

        assert_eq!(client.circuit_state(), "closed");
        let result = client.start_session(&order()).await;
        assert!(matches!(
            result,
            Err(GatewayError::Rejected { ref reason, .. }) if reason == "Invalid currency"
        ));
    }
}
