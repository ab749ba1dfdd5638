use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::job::{self, Job};
use crate::models::user::{self, User};
use crate::store::{to_body, Document, DocumentStore, Filter, StoreError};

pub const COLLECTION: &str = "applications";

/// Pipeline position of an application, as shown to seekers and employers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Submitted,
    Reviewed,
    Interview,
    Offered,
    Rejected,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApplicationRecord {
    job_id: String,
    seeker_id: String,
    employer_id: String,
    status: ApplicationStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Application {
    pub uid: String,
    pub job_id: String,
    pub seeker_id: String,
    pub employer_id: String,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
}

impl TryFrom<Document> for Application {
    type Error = StoreError;

    fn try_from(doc: Document) -> Result<Self, Self::Error> {
        let record: ApplicationRecord = doc.decode()?;
        Ok(Application {
            uid: doc.id,
            job_id: record.job_id,
            seeker_id: record.seeker_id,
            employer_id: record.employer_id,
            status: record.status,
            applied_at: doc.created_at,
        })
    }
}

/// An application paired with the seeker's profile, for employer review.
#[derive(Debug, Clone, Serialize)]
pub struct Applicant {
    pub user: Option<User>,
    pub application: Application,
}

/// An application paired with its job; `job` is `None` once the posting is deleted.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationWithJob {
    pub job: Option<Job>,
    pub application: Application,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusPatch {
    status: ApplicationStatus,
}

async fn query_applications(
    store: &dyn DocumentStore,
    filters: &[Filter],
) -> Result<Vec<Application>, StoreError> {
    store
        .query(COLLECTION, filters)
        .await?
        .into_iter()
        .map(Application::try_from)
        .collect()
}

/// One application per seeker and job: the pair is the document id, so the
/// store's create conflict enforces uniqueness.
fn application_id(job_id: &str, seeker_id: &str) -> String {
    format!("{job_id}_{seeker_id}")
}

/// Files a new `Submitted` application; the employer is copied from the job.
/// Fails with `StoreError::AlreadyExists` when the seeker already applied.
pub async fn create_application(
    store: &dyn DocumentStore,
    job: &Job,
    seeker_id: &str,
) -> Result<Application, StoreError> {
    let record = ApplicationRecord {
        job_id: job.uid.clone(),
        seeker_id: seeker_id.to_string(),
        employer_id: job.employer_id.clone(),
        status: ApplicationStatus::Submitted,
    };
    store
        .create(
            COLLECTION,
            Some(application_id(&job.uid, seeker_id)),
            to_body(&record)?,
        )
        .await?
        .try_into()
}

pub async fn has_user_applied(
    store: &dyn DocumentStore,
    job_id: &str,
    seeker_id: &str,
) -> Result<bool, StoreError> {
    let existing = store
        .get(COLLECTION, &application_id(job_id, seeker_id))
        .await?;
    Ok(existing.is_some())
}

pub async fn get_application(
    store: &dyn DocumentStore,
    uid: &str,
) -> Result<Option<Application>, StoreError> {
    store
        .get(COLLECTION, uid)
        .await?
        .map(Application::try_from)
        .transpose()
}

/// Applications to one job, each with the applicant's profile if it still exists.
pub async fn applicants_for_job(
    store: &dyn DocumentStore,
    job_id: &str,
) -> Result<Vec<Applicant>, StoreError> {
    let applications = query_applications(store, &[Filter::eq("jobId", job_id)]).await?;
    let seeker_ids: Vec<String> = applications.iter().map(|a| a.seeker_id.clone()).collect();
    let users = user::get_users(store, &seeker_ids).await?;

    Ok(applications
        .into_iter()
        .map(|application| {
            let user = users
                .iter()
                .find(|u| u.uid == application.seeker_id)
                .cloned();
            Applicant { user, application }
        })
        .collect())
}

pub async fn applications_for_seeker(
    store: &dyn DocumentStore,
    seeker_id: &str,
) -> Result<Vec<ApplicationWithJob>, StoreError> {
    let applications = query_applications(store, &[Filter::eq("seekerId", seeker_id)]).await?;
    let mut joined = Vec::with_capacity(applications.len());
    for application in applications {
        let job = job::get_job(store, &application.job_id).await?;
        joined.push(ApplicationWithJob { job, application });
    }
    Ok(joined)
}

pub async fn update_application_status(
    store: &dyn DocumentStore,
    uid: &str,
    status: ApplicationStatus,
) -> Result<Application, StoreError> {
    store
        .update(COLLECTION, uid, to_body(&StatusPatch { status })?)
        .await?
        .try_into()
}
