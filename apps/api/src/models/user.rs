use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{to_body, Document, DocumentStore, StoreError};

pub const COLLECTION: &str = "users";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Recruiter,
    Employer,
    Seeker,
}

/// Stored shape of a user profile. The document id is the identity-provider uid.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserRecord {
    email: Option<String>,
    display_name: Option<String>,
    role: UserRole,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<Document> for User {
    type Error = StoreError;

    fn try_from(doc: Document) -> Result<Self, Self::Error> {
        let record: UserRecord = doc.decode()?;
        Ok(User {
            uid: doc.id,
            email: record.email,
            display_name: record.display_name,
            role: record.role,
            created_at: doc.created_at,
        })
    }
}

/// Profile fields supplied at sign-up.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub role: UserRole,
}

pub async fn create_user(
    store: &dyn DocumentStore,
    uid: &str,
    new_user: NewUser,
) -> Result<User, StoreError> {
    let record = UserRecord {
        email: new_user.email,
        display_name: new_user.display_name,
        role: new_user.role,
    };
    store
        .create(COLLECTION, Some(uid.to_string()), to_body(&record)?)
        .await?
        .try_into()
}

pub async fn get_user(store: &dyn DocumentStore, uid: &str) -> Result<Option<User>, StoreError> {
    store
        .get(COLLECTION, uid)
        .await?
        .map(User::try_from)
        .transpose()
}

/// Looks up several profiles; ids without a profile are skipped.
pub async fn get_users(store: &dyn DocumentStore, uids: &[String]) -> Result<Vec<User>, StoreError> {
    let mut users = Vec::with_capacity(uids.len());
    for uid in uids {
        if let Some(user) = get_user(store, uid).await? {
            users.push(user);
        }
    }
    Ok(users)
}

/// Every profile, newest first.
pub async fn all_users(store: &dyn DocumentStore) -> Result<Vec<User>, StoreError> {
    store
        .query(COLLECTION, &[])
        .await?
        .into_iter()
        .map(User::try_from)
        .collect()
}
