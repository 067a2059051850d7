// src/handlers/access.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        entitlement::{AccessCheckResponse, PurchaseRequest, RemainingDaysResponse},
        tier::{ContentCategory, Tier},
    },
    services::entitlement::EntitlementStore,
};

/// Current tier and remaining days per tier.
pub async fn get_status(
    State(entitlements): State<Arc<EntitlementStore>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(entitlements.status().await))
}

/// Whether a content category may be opened.
pub async fn check_access(
    State(entitlements): State<Arc<EntitlementStore>>,
    Path(category): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let category: ContentCategory = category.parse().map_err(AppError::NotFound)?;
    let allowed = entitlements.check_access(category).await;

    Ok(Json(AccessCheckResponse { category, allowed }))
}

pub async fn remaining_days(
    State(entitlements): State<Arc<EntitlementStore>>,
    Path(tier): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let tier: Tier = tier.parse().map_err(AppError::NotFound)?;
    let remaining_days = entitlements.remaining_days(tier).await;

    Ok(Json(RemainingDaysResponse {
        tier,
        remaining_days,
    }))
}

/// Buys a tier through the payment processor.
///
/// A declined payment is still a 200 with `success: false`.
/// Only malformed requests and concurrent purchases are errors.
pub async fn purchase(
    State(entitlements): State<Arc<EntitlementStore>>,
    Json(payload): Json<PurchaseRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let outcome = entitlements
        .purchase(payload.tier, payload.method, payload.phone_number)
        .await?;

    Ok(Json(outcome))
}
