// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, certificate, course, gamification, progress, quiz},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Public: auth, course catalogue, quiz fetch, certificate verification.
/// * Learner (JWT): progress, quiz submission, certificates, XP.
/// * Admin (JWT + admin role): course, unit and quiz management.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let public_routes = Router::new()
        .route("/courses", get(course::list_courses))
        .route("/courses/{id}", get(course::get_course))
        .route("/quizzes/{id}", get(quiz::get_quiz))
        .route(
            "/certificates/{certificate_id}",
            get(certificate::verify_certificate),
        );

    let learner_routes = Router::new()
        .route("/progress", post(progress::mark_complete))
        .route("/courses/{id}/progress", get(progress::get_progress))
        .route("/courses/{id}/certificate", post(certificate::issue_certificate))
        .route("/courses/{id}/gamification", get(gamification::get_gamification))
        .route("/quizzes/{id}/submit", post(quiz::submit_quiz))
        .route("/certificates", get(certificate::list_my_certificates))
        .route("/gamification/xp", post(gamification::add_xp))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let admin_routes = Router::new()
        .route("/courses", post(admin::create_course))
        .route(
            "/courses/{id}",
            put(admin::update_course).delete(admin::delete_course),
        )
        .route("/courses/{id}/units", post(admin::add_content_unit))
        .route(
            "/courses/{id}/units/{unit_id}",
            put(admin::update_content_unit),
        )
        .route("/courses/{id}/quizzes", post(admin::create_quiz))
        // Auth runs first (outermost), then the admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api", public_routes.merge(learner_routes))
        .nest("/api/admin", admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
