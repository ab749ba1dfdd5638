//! Axum route handlers for jobs and applications.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use tracing::info;

use crate::accounts::{caller_profile, ensure_role, Identity};
use crate::board::{ensure_owner, POSTING_ROLES};
use crate::errors::AppError;
use crate::flows::definitions::{InterviewQuestions, InterviewQuestionsInput};
use crate::flows::schema::Schema;
use crate::models::application::{
    applicants_for_job, applications_for_seeker, create_application, get_application,
    has_user_applied, update_application_status, Applicant, Application, ApplicationStatus,
    ApplicationWithJob,
};
use crate::models::job::{
    self, all_jobs, create_job, delete_job, draft_schema, jobs_for_employer, open_jobs,
    patch_schema, update_job, Job, JobDraft, JobPatch, JobStatus,
};
use crate::models::user::{get_user, UserRole};
use crate::state::AppState;
use crate::store::{DocumentStore, StoreError};

#[derive(Debug, Deserialize)]
pub struct JobsQuery {
    pub employer_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: ApplicationStatus,
}

/// Checks a raw body against `schema`, then decodes it.
fn validated<T: DeserializeOwned>(schema: &Schema, body: Value) -> Result<T, AppError> {
    schema.validate(&body)?;
    serde_json::from_value(body).map_err(|e| AppError::Validation(e.to_string()))
}

async fn existing_job(store: &dyn DocumentStore, id: &str) -> Result<Job, AppError> {
    job::get_job(store, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))
}

/// GET /api/v1/jobs
///
/// Every posting of one employer when `employer_id` is given. Otherwise admins
/// see all postings, closed ones included, and everyone else the open ones.
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    identity: Option<Identity>,
    Query(query): Query<JobsQuery>,
) -> Result<Json<Vec<Job>>, AppError> {
    let store = state.store.as_ref();
    if let Some(employer_id) = query.employer_id {
        return Ok(Json(jobs_for_employer(store, &employer_id).await?));
    }

    let is_admin = match identity {
        Some(identity) => get_user(store, identity.uid())
            .await?
            .is_some_and(|profile| profile.role == UserRole::Admin),
        None => false,
    };
    let jobs = if is_admin {
        all_jobs(store).await?
    } else {
        open_jobs(store).await?
    };
    Ok(Json(jobs))
}

/// POST /api/v1/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Job>), AppError> {
    let profile = caller_profile(state.store.as_ref(), &identity).await?;
    ensure_role(&profile, POSTING_ROLES)?;

    let draft: JobDraft = validated(&draft_schema(), body)?;
    let job = create_job(state.store.as_ref(), &profile.uid, draft).await?;

    info!(job_id = %job.uid, employer_id = %job.employer_id, "job posted");
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Job>, AppError> {
    Ok(Json(existing_job(state.store.as_ref(), &id).await?))
}

/// PATCH /api/v1/jobs/:id
pub async fn handle_update_job(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Job>, AppError> {
    let patch: JobPatch = validated(&patch_schema(), body)?;

    let profile = caller_profile(state.store.as_ref(), &identity).await?;
    let job = existing_job(state.store.as_ref(), &id).await?;
    ensure_owner(&profile, &job.employer_id)?;

    Ok(Json(update_job(state.store.as_ref(), &id, &patch).await?))
}

/// DELETE /api/v1/jobs/:id
pub async fn handle_delete_job(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let profile = caller_profile(state.store.as_ref(), &identity).await?;
    let job = existing_job(state.store.as_ref(), &id).await?;
    ensure_owner(&profile, &job.employer_id)?;

    delete_job(state.store.as_ref(), &id).await?;
    info!(job_id = %id, "job deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/jobs/:id/interview-questions
///
/// Runs the interview-question flow over the posting's title and description.
/// Open to any signed-in caller; seekers use it for interview practice.
pub async fn handle_interview_questions(
    State(state): State<AppState>,
    _identity: Identity,
    Path(id): Path<String>,
) -> Result<Json<InterviewQuestions>, AppError> {
    let job = existing_job(state.store.as_ref(), &id).await?;

    let input = InterviewQuestionsInput {
        job_title: job.title,
        job_description: job.description,
    };
    Ok(Json(state.flows.generate_interview_questions(&input).await?))
}

/// POST /api/v1/jobs/:id/applications
pub async fn handle_apply(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<Application>), AppError> {
    let profile = caller_profile(state.store.as_ref(), &identity).await?;
    ensure_role(&profile, &[UserRole::Seeker])?;

    let job = existing_job(state.store.as_ref(), &id).await?;
    if job.status != JobStatus::Open {
        return Err(AppError::Conflict("Job is no longer accepting applications".to_string()));
    }
    let already_applied = || AppError::Conflict("You have already applied to this job".to_string());
    if has_user_applied(state.store.as_ref(), &job.uid, &profile.uid).await? {
        return Err(already_applied());
    }

    // the document id is unique per job and seeker, so a concurrent duplicate fails here
    let application = create_application(state.store.as_ref(), &job, &profile.uid)
        .await
        .map_err(|e| match e {
            StoreError::AlreadyExists { .. } => already_applied(),
            other => other.into(),
        })?;
    info!(application_id = %application.uid, job_id = %job.uid, "application submitted");
    Ok((StatusCode::CREATED, Json(application)))
}

/// GET /api/v1/jobs/:id/applicants
pub async fn handle_list_applicants(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<Json<Vec<Applicant>>, AppError> {
    let profile = caller_profile(state.store.as_ref(), &identity).await?;
    let job = existing_job(state.store.as_ref(), &id).await?;
    ensure_owner(&profile, &job.employer_id)?;

    Ok(Json(applicants_for_job(state.store.as_ref(), &job.uid).await?))
}

/// GET /api/v1/applications
pub async fn handle_my_applications(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<ApplicationWithJob>>, AppError> {
    Ok(Json(
        applications_for_seeker(state.store.as_ref(), identity.uid()).await?,
    ))
}

/// PATCH /api/v1/applications/:id/status
pub async fn handle_update_application_status(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<Application>, AppError> {
    let profile = caller_profile(state.store.as_ref(), &identity).await?;
    let application = get_application(state.store.as_ref(), &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Application {id} not found")))?;
    ensure_owner(&profile, &application.employer_id)?;

    let updated = update_application_status(state.store.as_ref(), &id, update.status).await?;
    info!(application_id = %id, status = ?updated.status, "application status changed");
    Ok(Json(updated))
}
