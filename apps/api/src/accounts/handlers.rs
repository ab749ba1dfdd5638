use axum::{extract::State, http::StatusCode, Json};
use tracing::info;

use crate::accounts::session::{resolve_session, Session};
use crate::accounts::{caller_profile, ensure_role, Identity};
use crate::errors::AppError;
use crate::models::user::{all_users, create_user, NewUser, User, UserRole};
use crate::state::AppState;
use crate::store::StoreError;

/// GET /api/v1/session
pub async fn handle_session(
    State(state): State<AppState>,
    identity: Option<Identity>,
) -> Json<Session> {
    let uid = identity.as_ref().map(Identity::uid);
    Json(resolve_session(state.store.as_ref(), uid).await)
}

/// POST /api/v1/users
///
/// Creates the caller's own profile. Admin profiles are provisioned out of band.
pub async fn handle_create_user(
    State(state): State<AppState>,
    identity: Identity,
    Json(new_user): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), AppError> {
    if new_user.role == UserRole::Admin {
        return Err(AppError::Forbidden);
    }

    let user = create_user(state.store.as_ref(), identity.uid(), new_user)
        .await
        .map_err(|e| match e {
            StoreError::AlreadyExists { .. } => {
                AppError::Conflict("Profile already exists".to_string())
            }
            other => other.into(),
        })?;

    info!(uid = %user.uid, role = ?user.role, "profile created");
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /api/v1/users
pub async fn handle_list_users(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<User>>, AppError> {
    let profile = caller_profile(state.store.as_ref(), &identity).await?;
    ensure_role(&profile, &[UserRole::Admin])?;
    Ok(Json(all_users(state.store.as_ref()).await?))
}
