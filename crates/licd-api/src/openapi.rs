//! # OpenAPI Specification Assembly
//!
//! Collects the utoipa-documented routes into one OpenAPI document served at
//! `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the licd API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "licd: License Issuance and Validation",
        version = "0.1.0",
        description = "Verify software licenses with first-use machine binding, and administer their lifecycle.",
        license(name = "AGPL-3.0-or-later")
    ),
    paths(
        crate::routes::verify::verify_license,
        crate::routes::admin::create_license,
        crate::routes::admin::renew_license,
        crate::routes::admin::reset_license,
        crate::routes::admin::suspend_license,
        crate::routes::admin::list_licenses,
        crate::routes::health::service_info,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::verify::VerifyRequest,
        crate::routes::verify::VerifyResponse,
        crate::routes::admin::CreateLicenseRequest,
        crate::routes::admin::RenewLicenseRequest,
        crate::routes::admin::LicenseActionRequest,
        crate::routes::admin::ActionResponse,
        crate::routes::admin::RenewLicenseResponse,
        crate::routes::admin::LicenseView,
        crate::routes::health::ServiceInfo,
    )),
    tags(
        (name = "licenses", description = "License verification"),
        (name = "admin", description = "License administration (admin token required)"),
        (name = "health", description = "Service status"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json: Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
