//! Validation of repository selections and team membership.

use std::collections::HashSet;

use thiserror::Error;

use crate::config::TeamsConfig;

use super::store::StoreError;
use super::types::RepositorySelection;

const MAX_TEAM_NAME_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum SubjectError {
    #[error("At least one repository must be selected")]
    EmptySelection,

    #[error("At most {max} repositories can be selected, got {got}")]
    TooManyRepositories { max: usize, got: usize },

    #[error("Unknown repositories: {0:?}")]
    UnknownRepositories(Vec<u64>),

    #[error("A team needs at least {min} members")]
    TeamTooSmall { min: usize },

    #[error("A team can have at most {max} members")]
    TeamTooLarge { max: usize },

    #[error("The requester must be a member of the team")]
    RequesterNotMember,

    #[error("Unknown users: {0:?}")]
    UnknownMembers(Vec<String>),

    #[error("Invalid team name: {0:?}")]
    InvalidTeamName(String),

    #[error("Team {0} already exists")]
    TeamExists(String),

    #[error("User {0} not found")]
    UnknownUser(String),

    #[error("Team {0} not found")]
    UnknownTeam(String),

    #[error("Not a member of team {0}")]
    NotAMember(String),

    #[error("An analysis is in progress")]
    InProgress,

    #[error("GitHub profile could not be fetched")]
    ProfileUnavailable,

    #[error("The access token belongs to {login}, not {claimed}")]
    IdentityMismatch { claimed: String, login: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// De-duplicate `requested` and check it against the known repositories.
pub fn validate_selection(
    requested: &[u64],
    known: &HashSet<u64>,
    max: usize,
) -> Result<RepositorySelection, SubjectError> {
    let selection = RepositorySelection::new(requested.iter().copied());

    if selection.is_empty() {
        return Err(SubjectError::EmptySelection);
    }
    if selection.len() > max {
        return Err(SubjectError::TooManyRepositories {
            max,
            got: selection.len(),
        });
    }

    let unknown: Vec<u64> = selection.ids().filter(|id| !known.contains(id)).collect();
    if !unknown.is_empty() {
        return Err(SubjectError::UnknownRepositories(unknown));
    }

    Ok(selection)
}

/// Team names end up in URL paths.
pub fn validate_team_name(name: &str) -> Result<(), SubjectError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_TEAM_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
    if valid {
        Ok(())
    } else {
        Err(SubjectError::InvalidTeamName(name.to_string()))
    }
}

/// Normalize a member list and check it against the team bounds.
///
/// Duplicates are removed keeping first occurrence. `is_registered` is
/// asked about every remaining member.
pub fn validate_team_members(
    requester: &str,
    members: &[String],
    config: &TeamsConfig,
    is_registered: impl Fn(&str) -> Result<bool, StoreError>,
) -> Result<Vec<String>, SubjectError> {
    let mut seen = HashSet::new();
    let members: Vec<String> = members
        .iter()
        .map(|m| m.trim())
        .filter(|m| !m.is_empty())
        .filter(|m| seen.insert(m.to_string()))
        .map(str::to_string)
        .collect();

    if members.len() < config.min_members {
        return Err(SubjectError::TeamTooSmall {
            min: config.min_members,
        });
    }
    if members.len() > config.max_members {
        return Err(SubjectError::TeamTooLarge {
            max: config.max_members,
        });
    }
    if !members.iter().any(|m| m == requester) {
        return Err(SubjectError::RequesterNotMember);
    }

    let mut unknown = Vec::new();
    for member in &members {
        if !is_registered(member)? {
            unknown.push(member.clone());
        }
    }
    if !unknown.is_empty() {
        return Err(SubjectError::UnknownMembers(unknown));
    }

    Ok(members)
}
