// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{attempt, code, module, progress, quiz, report, subject, teacher},
    state::AppState,
    utils::jwt::{auth_middleware, staff_middleware},
};

/// Assembles the main application router.
///
/// * Subject catalog is public.
/// * Everything else requires a bearer token; staff routes additionally
///   require the teacher or admin role.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
        HeaderValue::from_static("http://localhost:5173"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let subject_routes = Router::new()
        .route("/", get(subject::list_subjects))
        .route("/{id}", get(subject::get_subject));

    let module_routes = Router::new()
        .route("/{id}", get(module::get_module))
        .layer(auth.clone());

    let quiz_routes = Router::new()
        .route("/{module_id}/submit", post(quiz::submit_quiz))
        .route("/{module_id}/remediate", post(quiz::remediate))
        .layer(auth.clone());

    let progress_routes = Router::new()
        .route("/enroll/{subject_id}", post(progress::enroll))
        .route("/subject/{subject_id}", get(progress::get_progress))
        .layer(auth.clone());

    let attempt_routes = Router::new()
        .route("/me", get(attempt::my_attempts))
        .merge(
            Router::new()
                .route("/user/{user_id}", get(attempt::user_attempts))
                .route("/module/{module_id}", get(attempt::module_attempts))
                .layer(middleware::from_fn(staff_middleware)),
        )
        .layer(auth.clone());

    let report_routes = Router::new()
        .route("/generate", post(report::generate_report))
        .route("/user/{user_id}", get(report::list_reports))
        .layer(auth.clone());

    let code_routes = Router::new()
        .route("/execute", post(code::execute_code))
        .layer(auth.clone());

    // Auth first, then the staff check
    let teacher_routes = Router::new()
        .route("/students-progress", get(teacher::students_progress))
        .layer(middleware::from_fn(staff_middleware))
        .layer(auth);

    Router::new()
        .nest("/api/subjects", subject_routes)
        .nest("/api/modules", module_routes)
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/progress", progress_routes)
        .nest("/api/attempts", attempt_routes)
        .nest("/api/reports", report_routes)
        .nest("/api/code", code_routes)
        .nest("/api/teacher", teacher_routes)
        // Global middleware, outermost first
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
