//! User API handlers.
//!
//! Every `/users/me` route acts for the login named by the
//! `X-Repometer-User` header.

use axum::{extract::State, http::StatusCode, Json};
use repometer_core::{
    subject::{RunOutcome, UserRecord},
    AnalysisStatus, RepositoryDescriptor, SubjectRef, TriggerAccepted,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::ApiError;
use super::middleware::{Caller, CurrentUser, GithubToken};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for replacing the selection
#[derive(Debug, Deserialize)]
pub struct SelectRepositoriesBody {
    pub repository_ids: Vec<u64>,
}

#[derive(Debug, Serialize)]
pub struct SelectionResponse {
    pub repository_ids: Vec<u64>,
    /// Selected repositories, in listing order
    pub repositories: Vec<RepositoryDescriptor>,
}

impl From<UserRecord> for SelectionResponse {
    fn from(user: UserRecord) -> Self {
        Self {
            repository_ids: user.selection.ids().collect(),
            repositories: user.selected_repositories(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    /// Fraction in [0, 1], or -1 when no run is in flight
    pub progress: f64,
}

#[derive(Debug, Serialize)]
pub struct UserStatusResponse {
    pub status: AnalysisStatus,
    pub last_run: Option<RunOutcome>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Register the token owner, or refresh their repository listing.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Caller(identity): Caller,
    GithubToken(token): GithubToken,
) -> Result<(StatusCode, Json<UserRecord>), ApiError> {
    let claimed = (!identity.is_anonymous()).then_some(identity.user_id.as_str());
    let user = state.orchestrator().register_user(&token, claimed).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_me(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<UserRecord>, ApiError> {
    Ok(Json(state.orchestrator().get_user(&user)?))
}

pub async fn delete_me(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<StatusCode, ApiError> {
    state.orchestrator().delete_user(&user)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Repositories known from the last GitHub listing
pub async fn list_github_repositories(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<RepositoryDescriptor>>, ApiError> {
    let user = state.orchestrator().get_user(&user)?;
    Ok(Json(user.github_repositories))
}

pub async fn get_selection(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<SelectionResponse>, ApiError> {
    let user = state.orchestrator().get_user(&user)?;
    Ok(Json(SelectionResponse::from(user)))
}

pub async fn put_selection(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<SelectRepositoriesBody>,
) -> Result<Json<SelectionResponse>, ApiError> {
    let user = state
        .orchestrator()
        .select_repositories(&user, &body.repository_ids)?;
    Ok(Json(SelectionResponse::from(user)))
}

/// Start an analysis; returns 202 immediately.
pub async fn trigger(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    GithubToken(token): GithubToken,
) -> Result<(StatusCode, Json<TriggerAccepted>), ApiError> {
    let accepted = state.orchestrator().trigger(&user, token)?;
    Ok((StatusCode::ACCEPTED, Json(accepted)))
}

pub async fn get_progress(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Json<ProgressResponse> {
    Json(ProgressResponse {
        progress: state.orchestrator().get_progress(&SubjectRef::user(user)),
    })
}

pub async fn get_status(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<UserStatusResponse>, ApiError> {
    let user = state.orchestrator().get_user(&user)?;
    Ok(Json(UserStatusResponse {
        status: user.status,
        last_run: user.last_run,
    }))
}

pub async fn reset(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<StatusCode, ApiError> {
    state.orchestrator().reset(&user)?;
    Ok(StatusCode::NO_CONTENT)
}
