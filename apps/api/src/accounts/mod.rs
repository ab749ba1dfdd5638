//! Caller identity, profile lookup and role checks.
//!
//! Sign-in happens at an external identity provider; requests carry the
//! resulting opaque uid in the `x-user-id` header. Everything role-based is
//! derived from the stored profile, never from the request itself.

pub mod handlers;
pub mod identity;
pub mod session;

use crate::errors::AppError;
use crate::models::user::{get_user, User, UserRole};
use crate::store::DocumentStore;

pub use identity::Identity;

/// Profile of an authenticated caller. A caller without a profile is forbidden.
pub async fn caller_profile(store: &dyn DocumentStore, identity: &Identity) -> Result<User, AppError> {
    get_user(store, identity.uid())
        .await?
        .ok_or(AppError::Forbidden)
}

/// Fails with `Forbidden` unless the profile holds one of `allowed`.
pub fn ensure_role(profile: &User, allowed: &[UserRole]) -> Result<(), AppError> {
    if allowed.contains(&profile.role) {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}
