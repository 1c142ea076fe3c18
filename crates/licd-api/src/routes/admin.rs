//! # License Administration API
//!
//! Admin-token gated lifecycle endpoints. Mutations take the token in the
//! JSON body; the listing takes it as a query parameter.
//!
//! | Route                   | Operation |
//! |-------------------------|-----------|
//! | `POST /create_license`  | issue     |
//! | `POST /renew_license`   | set expiration date |
//! | `POST /reset_license`   | release machine binding |
//! | `POST /suspend_license` | deactivate |
//! | `GET /licenses`         | list      |

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use licd_registry::{LicenseSummary, NewLicense};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::{AppError, ErrorBody};
use crate::extractors::extract_json;
use crate::state::AppState;

/// Issue a new license.
#[derive(Deserialize, ToSchema)]
pub struct CreateLicenseRequest {
    pub admin_token: String,
    pub username: String,
    pub password: String,
    pub license_key: String,
    /// `YYYY-MM-DD`. Omit or `null` for a license that never expires.
    #[serde(default)]
    pub expiration_date: Option<String>,
}

/// Set a new expiration date.
#[derive(Deserialize, ToSchema)]
pub struct RenewLicenseRequest {
    pub admin_token: String,
    pub username: String,
    /// `YYYY-MM-DD`. May be earlier than the current date.
    pub new_expiration_date: String,
}

/// Reset or suspend a license.
#[derive(Deserialize, ToSchema)]
pub struct LicenseActionRequest {
    pub admin_token: String,
    pub username: String,
}

/// Query parameters of `GET /licenses`.
#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListLicensesQuery {
    #[serde(default)]
    pub admin_token: String,
}

/// Generic admin success body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

/// Renewal success body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RenewLicenseResponse {
    pub success: bool,
    pub message: String,
    #[schema(value_type = String, format = Date)]
    pub new_expiration_date: NaiveDate,
}

/// One license as seen by an administrator. Never includes the password hash.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LicenseView {
    pub username: String,
    pub license_key: String,
    /// Empty until the license is activated.
    pub machine_id: String,
    #[schema(value_type = Option<String>, format = Date)]
    pub expiration_date: Option<NaiveDate>,
    pub active: bool,
}

impl From<LicenseSummary> for LicenseView {
    fn from(summary: LicenseSummary) -> Self {
        Self {
            username: summary.username,
            license_key: summary.license_key,
            machine_id: summary.machine_id,
            expiration_date: summary.expiration_date,
            active: summary.active,
        }
    }
}

fn done(message: impl Into<String>) -> Json<ActionResponse> {
    Json(ActionResponse {
        success: true,
        message: message.into(),
    })
}

/// Build the administration router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create_license", post(create_license))
        .route("/renew_license", post(renew_license))
        .route("/reset_license", post(reset_license))
        .route("/suspend_license", post(suspend_license))
        .route("/licenses", get(list_licenses))
}

/// POST /create_license: Issue a new, unbound license.
#[utoipa::path(
    post,
    path = "/create_license",
    request_body = CreateLicenseRequest,
    responses(
        (status = 200, description = "License created", body = ActionResponse),
        (status = 400, description = "Empty field or malformed date", body = ErrorBody),
        (status = 403, description = "Admin token rejected", body = ErrorBody),
        (status = 409, description = "Username already has a license", body = ErrorBody),
        (status = 500, description = "Admin secret not configured", body = ErrorBody),
    ),
    tag = "admin"
)]
pub async fn create_license(
    State(state): State<AppState>,
    body: Result<Json<CreateLicenseRequest>, JsonRejection>,
) -> Result<Json<ActionResponse>, AppError> {
    let req = extract_json(body)?;
    state
        .registry
        .create_license(
            &req.admin_token,
            NewLicense {
                username: &req.username,
                password: &req.password,
                license_key: &req.license_key,
                expiration_date: req.expiration_date.as_deref(),
            },
        )
        .await?;
    Ok(done("license created"))
}

/// POST /renew_license: Overwrite the expiration date.
#[utoipa::path(
    post,
    path = "/renew_license",
    request_body = RenewLicenseRequest,
    responses(
        (status = 200, description = "Expiration date updated", body = RenewLicenseResponse),
        (status = 400, description = "Malformed date", body = ErrorBody),
        (status = 403, description = "Admin token rejected", body = ErrorBody),
        (status = 404, description = "No license for this username", body = ErrorBody),
        (status = 500, description = "Admin secret not configured", body = ErrorBody),
    ),
    tag = "admin"
)]
pub async fn renew_license(
    State(state): State<AppState>,
    body: Result<Json<RenewLicenseRequest>, JsonRejection>,
) -> Result<Json<RenewLicenseResponse>, AppError> {
    let req = extract_json(body)?;
    let new_expiration_date = state
        .registry
        .renew_license(&req.admin_token, &req.username, &req.new_expiration_date)
        .await?;
    Ok(Json(RenewLicenseResponse {
        success: true,
        message: "license renewed".to_string(),
        new_expiration_date,
    }))
}

/// POST /reset_license: Release the machine binding.
#[utoipa::path(
    post,
    path = "/reset_license",
    request_body = LicenseActionRequest,
    responses(
        (status = 200, description = "Binding cleared", body = ActionResponse),
        (status = 403, description = "Admin token rejected", body = ErrorBody),
        (status = 404, description = "No license for this username", body = ErrorBody),
        (status = 500, description = "Admin secret not configured", body = ErrorBody),
    ),
    tag = "admin"
)]
pub async fn reset_license(
    State(state): State<AppState>,
    body: Result<Json<LicenseActionRequest>, JsonRejection>,
) -> Result<Json<ActionResponse>, AppError> {
    let req = extract_json(body)?;
    state
        .registry
        .reset_license(&req.admin_token, &req.username)
        .await?;
    Ok(done("license reset"))
}

/// POST /suspend_license: Deactivate a license.
#[utoipa::path(
    post,
    path = "/suspend_license",
    request_body = LicenseActionRequest,
    responses(
        (status = 200, description = "License suspended", body = ActionResponse),
        (status = 403, description = "Admin token rejected", body = ErrorBody),
        (status = 404, description = "No license for this username", body = ErrorBody),
        (status = 500, description = "Admin secret not configured", body = ErrorBody),
    ),
    tag = "admin"
)]
pub async fn suspend_license(
    State(state): State<AppState>,
    body: Result<Json<LicenseActionRequest>, JsonRejection>,
) -> Result<Json<ActionResponse>, AppError> {
    let req = extract_json(body)?;
    state
        .registry
        .suspend_license(&req.admin_token, &req.username)
        .await?;
    Ok(done("license suspended"))
}

/// GET /licenses: List every license.
#[utoipa::path(
    get,
    path = "/licenses",
    params(ListLicensesQuery),
    responses(
        (status = 200, description = "All licenses, ordered by username", body = Vec<LicenseView>),
        (status = 403, description = "Admin token rejected", body = ErrorBody),
        (status = 500, description = "Admin secret not configured", body = ErrorBody),
    ),
    tag = "admin"
)]
pub async fn list_licenses(
    State(state): State<AppState>,
    Query(query): Query<ListLicensesQuery>,
) -> Result<Json<Vec<LicenseView>>, AppError> {
    let licenses = state.registry.list_licenses(&query.admin_token).await?;
    Ok(Json(licenses.into_iter().map(LicenseView::from).collect()))
}
