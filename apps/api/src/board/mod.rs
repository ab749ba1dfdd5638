//! Job board: postings, applications and the per-job AI helpers.

pub mod handlers;

use crate::errors::AppError;
use crate::models::user::{User, UserRole};

/// Roles allowed to post jobs.
pub const POSTING_ROLES: &[UserRole] = &[UserRole::Admin, UserRole::Employer, UserRole::Recruiter];

/// Admins manage every posting; employers and recruiters only their own.
pub fn ensure_owner(profile: &User, employer_id: &str) -> Result<(), AppError> {
    match profile.role {
        UserRole::Admin => Ok(()),
        UserRole::Employer | UserRole::Recruiter if profile.uid == employer_id => Ok(()),
        _ => Err(AppError::Forbidden),
    }
}
