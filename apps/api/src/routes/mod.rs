pub mod health;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::accounts::handlers as accounts;
use crate::board::handlers as board;
use crate::flows::handlers as flows;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // AI flows
        .route("/api/gemini", post(flows::handle_chat))
        .route("/api/v1/flows/:name", post(flows::handle_invoke_flow))
        .route("/api/v1/resume/optimize", post(flows::handle_optimize_resume))
        // Accounts
        .route("/api/v1/session", get(accounts::handle_session))
        .route(
            "/api/v1/users",
            get(accounts::handle_list_users).post(accounts::handle_create_user),
        )
        // Job board
        .route(
            "/api/v1/jobs",
            get(board::handle_list_jobs).post(board::handle_create_job),
        )
        .route(
            "/api/v1/jobs/:id",
            get(board::handle_get_job)
                .patch(board::handle_update_job)
                .delete(board::handle_delete_job),
        )
        .route("/api/v1/jobs/:id/applications", post(board::handle_apply))
        .route(
            "/api/v1/jobs/:id/applicants",
            get(board::handle_list_applicants),
        )
        .route(
            "/api/v1/jobs/:id/interview-questions",
            post(board::handle_interview_questions),
        )
        .route("/api/v1/applications", get(board::handle_my_applications))
        .route(
            "/api/v1/applications/:id/status",
            patch(board::handle_update_application_status),
        )
        .with_state(state)
}
