//! Team API handlers.
//!
//! Only members of a team can see, trigger, reset or delete it.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use repometer_core::{subject::TeamRecord, AnalysisStatus, SubjectRef, TriggerAccepted};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::ApiError;
use super::middleware::CurrentUser;
use crate::state::AppState;

/// Request body for creating a team
#[derive(Debug, Deserialize)]
pub struct CreateTeamBody {
    pub name: String,
    /// Member logins; must include the requester
    pub members: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct TeamStatusResponse {
    pub status: AnalysisStatus,
    pub progress: f64,
}

pub async fn create_team(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<CreateTeamBody>,
) -> Result<(StatusCode, Json<TeamRecord>), ApiError> {
    let team = state
        .orchestrator()
        .create_team(&user, &body.name, &body.members)?;
    Ok((StatusCode::CREATED, Json(team)))
}

/// Teams listing the current user as a member
pub async fn list_teams(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<TeamRecord>>, ApiError> {
    Ok(Json(state.orchestrator().list_teams(&user)?))
}

pub async fn get_team(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(name): Path<String>,
) -> Result<Json<TeamRecord>, ApiError> {
    Ok(Json(state.orchestrator().get_team(&name, &user)?))
}

pub async fn delete_team(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.orchestrator().delete_team(&name, &user)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Start aggregating the members' summaries; returns 202 immediately.
pub async fn trigger_team(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(name): Path<String>,
) -> Result<(StatusCode, Json<TriggerAccepted>), ApiError> {
    let accepted = state.orchestrator().trigger_team(&name, &user)?;
    Ok((StatusCode::ACCEPTED, Json(accepted)))
}

pub async fn get_team_status(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(name): Path<String>,
) -> Result<Json<TeamStatusResponse>, ApiError> {
    let team = state.orchestrator().get_team(&name, &user)?;
    Ok(Json(TeamStatusResponse {
        status: team.status,
        progress: state.orchestrator().get_progress(&SubjectRef::team(name)),
    }))
}

pub async fn reset_team(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.orchestrator().reset_team(&name, &user)?;
    Ok(StatusCode::NO_CONTENT)
}
