use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::flows::schema::{Field, Schema};
use crate::store::{to_body, Document, DocumentStore, Filter, StoreError};

pub const COLLECTION: &str = "jobs";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Open,
    Closed,
}

/// Stored shape of a job posting.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobRecord {
    employer_id: String,
    title: String,
    description: String,
    skills: Vec<String>,
    salary: f64,
    location: String,
    status: JobStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    pub uid: String,
    pub employer_id: String,
    pub title: String,
    pub description: String,
    pub skills: Vec<String>,
    pub salary: f64,
    pub location: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<Document> for Job {
    type Error = StoreError;

    fn try_from(doc: Document) -> Result<Self, Self::Error> {
        let record: JobRecord = doc.decode()?;
        Ok(Job {
            uid: doc.id,
            employer_id: record.employer_id,
            title: record.title,
            description: record.description,
            skills: record.skills,
            salary: record.salary,
            location: record.location,
            status: record.status,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        })
    }
}

/// Body of a new job posting.
#[derive(Debug, Clone, Deserialize)]
pub struct JobDraft {
    pub title: String,
    pub description: String,
    pub skills: Vec<String>,
    pub salary: f64,
    pub location: String,
}

/// Partial update; absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
}

fn form_fields() -> Vec<Field> {
    vec![
        Field::string("title", "Job title.").min_length(5),
        Field::string("description", "Role, responsibilities and requirements.").min_length(20),
        Field::string_array("skills", "Required skills.").min_items(1),
        Field::number("salary", "Annual salary.").min_value(0.0),
        Field::string("location", "Where the job is based.").min_length(2),
    ]
}

/// Rules for a new posting body.
pub fn draft_schema() -> Schema {
    Schema::object(form_fields())
}

/// Same rules as [`draft_schema`], every field optional, plus `status`.
pub fn patch_schema() -> Schema {
    let mut fields: Vec<Field> = form_fields().into_iter().map(Field::optional).collect();
    fields.push(Field::one_of("status", "Posting status.", &["open", "closed"]).optional());
    Schema::object(fields)
}

pub async fn create_job(
    store: &dyn DocumentStore,
    employer_id: &str,
    draft: JobDraft,
) -> Result<Job, StoreError> {
    let record = JobRecord {
        employer_id: employer_id.to_string(),
        title: draft.title,
        description: draft.description,
        skills: draft.skills,
        salary: draft.salary,
        location: draft.location,
        status: JobStatus::Open,
    };
    store
        .create(COLLECTION, None, to_body(&record)?)
        .await?
        .try_into()
}

pub async fn get_job(store: &dyn DocumentStore, uid: &str) -> Result<Option<Job>, StoreError> {
    store
        .get(COLLECTION, uid)
        .await?
        .map(Job::try_from)
        .transpose()
}

async fn query_jobs(store: &dyn DocumentStore, filters: &[Filter]) -> Result<Vec<Job>, StoreError> {
    store
        .query(COLLECTION, filters)
        .await?
        .into_iter()
        .map(Job::try_from)
        .collect()
}

pub async fn jobs_for_employer(
    store: &dyn DocumentStore,
    employer_id: &str,
) -> Result<Vec<Job>, StoreError> {
    query_jobs(store, &[Filter::eq("employerId", employer_id)]).await
}

pub async fn open_jobs(store: &dyn DocumentStore) -> Result<Vec<Job>, StoreError> {
    query_jobs(store, &[Filter::eq("status", "open")]).await
}

pub async fn all_jobs(store: &dyn DocumentStore) -> Result<Vec<Job>, StoreError> {
    query_jobs(store, &[]).await
}

pub async fn update_job(
    store: &dyn DocumentStore,
    uid: &str,
    patch: &JobPatch,
) -> Result<Job, StoreError> {
    store
        .update(COLLECTION, uid, to_body(patch)?)
        .await?
        .try_into()
}

pub async fn delete_job(store: &dyn DocumentStore, uid: &str) -> Result<(), StoreError> {
    store.delete(COLLECTION, uid).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flows::schema::Constraint;
    use crate::store::InMemoryDocumentStore;
    use serde_json::json;

    fn draft(title: &str) -> JobDraft {
        JobDraft {
            title: title.to_string(),
            description: "Build and run the hiring platform backend.".to_string(),
            skills: vec!["Rust".to_string(), "SQL".to_string()],
            salary: 150_000.0,
            location: "Remote".to_string(),
        }
    }

    #[tokio::test]
    async fn test_new_jobs_start_open() {
        let store = InMemoryDocumentStore::new();
        let job = create_job(&store, "emp-1", draft("Backend Engineer")).await.unwrap();

        assert_eq!(job.status, JobStatus::Open);
        assert_eq!(job.employer_id, "emp-1");

        let raw = store.get(COLLECTION, &job.uid).await.unwrap().unwrap();
        assert_eq!(raw.data["employerId"], "emp-1");
        assert_eq!(raw.data["status"], "open");
    }

    #[tokio::test]
    async fn test_open_jobs_excludes_closed() {
        let store = InMemoryDocumentStore::new();
        let open = create_job(&store, "emp-1", draft("Backend Engineer")).await.unwrap();
        let closed = create_job(&store, "emp-1", draft("Frontend Engineer")).await.unwrap();
        update_job(
            &store,
            &closed.uid,
            &JobPatch {
                status: Some(JobStatus::Closed),
                ..JobPatch::default()
            },
        )
        .await
        .unwrap();

        let listed = open_jobs(&store).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].uid, open.uid);
        assert_eq!(jobs_for_employer(&store, "emp-1").await.unwrap().len(), 2);
        assert_eq!(all_jobs(&store).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_patch_only_touches_given_fields() {
        let store = InMemoryDocumentStore::new();
        let job = create_job(&store, "emp-1", draft("Backend Engineer")).await.unwrap();

        let updated = update_job(
            &store,
            &job.uid,
            &JobPatch {
                salary: Some(175_000.0),
                ..JobPatch::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.salary, 175_000.0);
        assert_eq!(updated.title, "Backend Engineer");
    }

    #[tokio::test]
    async fn test_delete_job() {
        let store = InMemoryDocumentStore::new();
        let job = create_job(&store, "emp-1", draft("Backend Engineer")).await.unwrap();
        delete_job(&store, &job.uid).await.unwrap();
        assert!(get_job(&store, &job.uid).await.unwrap().is_none());
    }

    #[test]
    fn test_draft_schema_rules() {
        let valid = json!({
            "title": "Backend Engineer",
            "description": "Build and run the hiring platform backend.",
            "skills": ["Rust"],
            "salary": 0,
            "location": "NY"
        });
        assert!(draft_schema().validate(&valid).is_ok());

        let mut short_title = valid.clone();
        short_title["title"] = json!("Dev");
        let err = draft_schema().validate(&short_title).unwrap_err();
        assert_eq!((err.field.as_str(), err.constraint), ("title", Constraint::MinLength));

        let mut no_skills = valid.clone();
        no_skills["skills"] = json!([]);
        assert_eq!(draft_schema().validate(&no_skills).unwrap_err().constraint, Constraint::MinItems);

        let mut negative = valid;
        negative["salary"] = json!(-5);
        assert_eq!(draft_schema().validate(&negative).unwrap_err().constraint, Constraint::MinValue);
    }

    #[test]
    fn test_patch_schema_allows_partial_bodies() {
        assert!(patch_schema().validate(&json!({ "status": "closed" })).is_ok());
        assert!(patch_schema().validate(&json!({})).is_ok());
        assert!(patch_schema().validate(&json!({ "status": "paused" })).is_err());
        assert!(patch_schema().validate(&json!({ "title": "abc" })).is_err());
    }
}
