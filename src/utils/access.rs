// src/utils/access.rs

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    error::AppError, models::tier::ContentCategory, services::entitlement::EntitlementStore,
};

/// Axum Middleware: Exam entitlement gate.
///
/// Lets the request through only while the learner's tier unlocks practice
/// exams. Fails closed: anything short of a valid premium grant is a 403.
pub async fn exam_access_middleware(
    State(entitlements): State<Arc<EntitlementStore>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !entitlements.check_access(ContentCategory::Exams).await {
        return AppError::Forbidden("Practice exams require premium access".to_string())
            .into_response();
    }

    next.run(req).await
}
