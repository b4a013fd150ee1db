//! Descriptive order fields the gateway requires on every session.
//! The broker passes them through untouched; validating them is the gateway's job.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomerInfo {
    pub name: String,
    pub email: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub postcode: String,
    pub country: String,
    pub phone: String,
    pub fax: Option<String>,
}

impl Default for CustomerInfo {
    fn default() -> Self {
        Self {
            name: "Customer Name".to_string(),
            email: "customer@example.com".to_string(),
            address_line1: "Dhaka".to_string(),
            address_line2: None,
            city: "Dhaka".to_string(),
            state: None,
            postcode: "1000".to_string(),
            country: "Bangladesh".to_string(),
            phone: "01711111111".to_string(),
            fax: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShippingInfo {
    pub method: String,
    pub name: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub postcode: String,
    pub country: String,
}

impl Default for ShippingInfo {
    fn default() -> Self {
        Self {
            method: "Courier".to_string(),
            name: "Customer Name".to_string(),
            address_line1: "Dhaka".to_string(),
            address_line2: None,
            city: "Dhaka".to_string(),
            state: None,
            postcode: "1000".to_string(),
            country: "Bangladesh".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductInfo {
    pub name: String,
    pub category: String,
    pub profile: String,
}

impl Default for ProductInfo {
    fn default() -> Self {
        Self {
            name: "Product Name".to_string(),
            category: "General".to_string(),
            profile: "general".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_customer_falls_back_to_defaults() {
        let customer: CustomerInfo =
            serde_json::from_str(r#"{"name":"Rahim","email":"rahim@example.com"}"#).unwrap();

        assert_eq!(customer.name, "Rahim");
        assert_eq!(customer.email, "rahim@example.com");
        assert_eq!(customer.country, "Bangladesh");
        assert!(customer.fax.is_none());
    }
}
