// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{access, exam, progress},
    state::AppState,
    utils::access::exam_access_middleware,
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (access, exams, progress).
/// * Gates opening an exam behind the exam entitlement.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:5173"),
        HeaderValue::from_static("http://127.0.0.1:5173"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    let access_routes = Router::new()
        .route("/", get(access::get_status))
        .route("/purchase", post(access::purchase))
        .route("/tiers/{tier}/remaining-days", get(access::remaining_days))
        .route("/{category}", get(access::check_access));

    let exam_routes = Router::new()
        .route("/history", get(exam::list_history))
        .route("/history/summary", get(exam::history_summary))
        .route("/{id}", get(exam::get_exam).delete(exam::close_exam))
        .route("/{id}/start", post(exam::start_exam))
        .route("/{id}/answers", post(exam::select_answer))
        .route("/{id}/advance", post(exam::advance))
        .route("/{id}/retreat", post(exam::retreat))
        .route("/{id}/submit", post(exam::submit_exam))
        .route("/{id}/retry", post(exam::retry_exam))
        .route(
            "/{id}/questions/{question_id}/explanation",
            get(exam::explain_question),
        )
        // Entitlement is checked once, when an exam is opened.
        .merge(
            Router::new()
                .route("/", post(exam::open_exam))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    exam_access_middleware,
                )),
        );

    let progress_routes = Router::new()
        .route("/", get(progress::get_progress).delete(progress::reset_progress))
        .route("/lessons/{id}", post(progress::complete_lesson))
        .route("/videos/{id}", post(progress::complete_video));

    Router::new()
        .nest("/api/access", access_routes)
        .nest("/api/exams", exam_routes)
        .nest("/api/progress", progress_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
