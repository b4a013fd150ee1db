use axum::{
    extract::{Path, State},
    Json,
};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::domain::{CustomerInfo, ProductInfo, ShippingInfo, Transaction, TransactionId};
use crate::error::AppError;
use crate::services::PaymentRequest;
use crate::validation::{normalize_amount, sanitize_string, validate_currency, validate_tran_id};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    pub amount: BigDecimal,
    pub currency: String,
    #[serde(default)]
    pub customer: Option<CustomerInfo>,
    #[serde(default)]
    pub shipping: Option<ShippingInfo>,
    #[serde(default)]
    pub product: Option<ProductInfo>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentResponse {
    pub redirect_url: String,
    pub transaction_id: TransactionId,
}

pub async fn create_payment(
    State(state): State<AppState>,
    Json(body): Json<CreatePaymentRequest>,
) -> Result<Json<CreatePaymentResponse>, AppError> {
    let amount = normalize_amount(&body.amount)?;
    validate_currency(&body.currency)?;

    let request = PaymentRequest {
        amount,
        currency: sanitize_string(&body.currency),
        customer: body.customer.unwrap_or_default(),
        shipping: body.shipping.unwrap_or_default(),
        product: body.product.unwrap_or_default(),
    };

    let initiated = state.lifecycle.initiate(request).await?;

    Ok(Json(CreatePaymentResponse {
        redirect_url: initiated.redirect_url,
        transaction_id: initiated.transaction_id,
    }))
}

pub async fn get_payment(
    State(state): State<AppState>,
    Path(tran_id): Path<String>,
) -> Result<Json<Transaction>, AppError> {
    validate_tran_id(&tran_id)?;
    let tx = state.lifecycle.get(&TransactionId::from(tran_id)).await?;
    Ok(Json(tx))
}
