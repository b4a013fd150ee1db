//! Gateway callback routes.
//!
//! Every route acknowledges the caller whatever happens internally: the browser
//! is redirected to the front-end result page and the IPN gets a 200. Unknown
//! or malformed callbacks are logged for operators instead.

use axum::{
    extract::State,
    response::Redirect,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::domain::{CallbackChannel, Outcome, TransactionId};
use crate::handlers::extract::JsonOrForm;
use crate::services::LifecycleError;
use crate::validation::validate_tran_id;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CallbackPayload {
    pub tran_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IpnPayload {
    pub tran_id: Option<String>,
    pub status: Option<String>,
}

pub async fn payment_success(
    State(state): State<AppState>,
    payload: Option<JsonOrForm<CallbackPayload>>,
) -> Redirect {
    apply(&state, tran_id_of(payload), Outcome::Success, CallbackChannel::Success).await;
    front_end_redirect(&state, "success")
}

pub async fn payment_fail(
    State(state): State<AppState>,
    payload: Option<JsonOrForm<CallbackPayload>>,
) -> Redirect {
    apply(&state, tran_id_of(payload), Outcome::Failed, CallbackChannel::Fail).await;
    front_end_redirect(&state, "fail")
}

pub async fn payment_cancel(
    State(state): State<AppState>,
    payload: Option<JsonOrForm<CallbackPayload>>,
) -> Redirect {
    apply(&state, tran_id_of(payload), Outcome::Canceled, CallbackChannel::Cancel).await;
    front_end_redirect(&state, "cancel")
}

pub async fn payment_ipn(
    State(state): State<AppState>,
    payload: Option<JsonOrForm<IpnPayload>>,
) -> Json<Value> {
    let (tran_id, status) = match payload {
        Some(JsonOrForm(p)) => (p.tran_id, p.status),
        None => (None, None),
    };

    if let Some(id) = checked_id(tran_id, CallbackChannel::Ipn) {
        let status = status.unwrap_or_else(|| {
            tracing::warn!(tran_id = %id, "IPN without status, treating as failed");
            String::new()
        });
        let result = state.lifecycle.apply_async_notification(&id, &status).await;
        log_failure(&id, CallbackChannel::Ipn, result.err());
    }

    Json(json!({ "message": "IPN received" }))
}

fn tran_id_of(payload: Option<JsonOrForm<CallbackPayload>>) -> Option<String> {
    payload.and_then(|JsonOrForm(p)| p.tran_id)
}

fn checked_id(tran_id: Option<String>, channel: CallbackChannel) -> Option<TransactionId> {
    let tran_id = match tran_id {
        Some(tran_id) => tran_id,
        None => {
            tracing::warn!(channel = %channel, "Callback without tran_id");
            return None;
        }
    };

    if let Err(e) = validate_tran_id(&tran_id) {
        tracing::warn!(channel = %channel, error = %e, "Callback with invalid tran_id");
        return None;
    }

    Some(TransactionId::from(tran_id))
}

async fn apply(
    state: &AppState,
    tran_id: Option<String>,
    outcome: Outcome,
    channel: CallbackChannel,
) {
    if let Some(id) = checked_id(tran_id, channel) {
        let result = state.lifecycle.apply_outcome(&id, outcome, channel).await;
        log_failure(&id, channel, result.err());
    }
}

fn log_failure(id: &TransactionId, channel: CallbackChannel, error: Option<LifecycleError>) {
    match error {
        None => {}
        Some(LifecycleError::NotFound(_)) => {
            tracing::warn!(tran_id = %id, channel = %channel, "Callback for unknown transaction");
        }
        Some(e) => {
            tracing::error!(tran_id = %id, channel = %channel, error = %e, "Failed to apply callback");
        }
    }
}

fn front_end_redirect(state: &AppState, page: &str) -> Redirect {
    Redirect::to(&format!(
        "{}/payment/{}",
        state.frontend_url.trim_end_matches('/'),
        page
    ))
}
