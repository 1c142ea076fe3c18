//! # Verification API
//!
//! `POST /verify`: the only unauthenticated license operation. Checks the
//! presented credentials and machine, binding the license on first use.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::NaiveDate;
use licd_registry::RegistryError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;

/// Verification request sent by a licensed client.
#[derive(Deserialize, ToSchema)]
pub struct VerifyRequest {
    pub username: String,
    pub password: String,
    pub license_key: String,
    /// Stable identifier of the presenting machine.
    pub machine_id: String,
}

/// Successful verification.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerifyResponse {
    pub success: bool,
    pub message: String,
    /// `YYYY-MM-DD`, or `null` for an unlimited license.
    #[schema(value_type = Option<String>, format = Date)]
    pub expiration_date: Option<NaiveDate>,
}

/// Build the verification router.
pub fn router() -> Router<AppState> {
    Router::new().route("/verify", post(verify_license))
}

/// POST /verify: Validate a license for a machine.
#[utoipa::path(
    post,
    path = "/verify",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "License is valid for this machine", body = VerifyResponse),
        (status = 400, description = "Malformed request or empty machine_id", body = crate::error::ErrorBody),
        (status = 401, description = "Bad credentials, suspended, bound elsewhere, or expired", body = crate::error::ErrorBody),
        (status = 404, description = "No license for this username", body = crate::error::ErrorBody),
    ),
    tag = "licenses"
)]
pub async fn verify_license(
    State(state): State<AppState>,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, AppError> {
    let req = extract_json(body)?;

    let verification = match state
        .registry
        .verify(&req.username, &req.password, &req.license_key, &req.machine_id)
        .await
    {
        Ok(v) => v,
        Err(err) => {
            if is_rejection(&err) {
                tracing::info!(username = %req.username, reason = %err, "verification rejected");
            }
            return Err(err.into());
        }
    };

    let message = if verification.newly_bound {
        "license activated on this machine"
    } else {
        "license is valid"
    };

    Ok(Json(VerifyResponse {
        success: true,
        message: message.to_string(),
        expiration_date: verification.expiration.date(),
    }))
}

fn is_rejection(err: &RegistryError) -> bool {
    matches!(
        err,
        RegistryError::BadCredentials
            | RegistryError::Suspended
            | RegistryError::MachineMismatch
            | RegistryError::Expired(_)
    )
}
