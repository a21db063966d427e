//! User and team management on top of the subject store.

use std::collections::HashSet;

use tracing::info;

use crate::github::AccessToken;
use crate::subject::{
    validate_selection, validate_team_members, validate_team_name, AnalysisStatus, StoreError,
    SubjectError, TeamRecord, UserRecord,
};

use super::runner::AnalysisOrchestrator;

impl AnalysisOrchestrator {
    /// Create the token owner's user, or refresh its repository listing.
    ///
    /// When `claimed` is given it must match the token owner's login.
    pub async fn register_user(
        &self,
        token: &AccessToken,
        claimed: Option<&str>,
    ) -> Result<UserRecord, SubjectError> {
        let profile = self
            .fetcher
            .get_user_profile(token)
            .await
            .ok_or(SubjectError::ProfileUnavailable)?;
        if let Some(claimed) = claimed.filter(|c| *c != profile.login) {
            return Err(SubjectError::IdentityMismatch {
                claimed: claimed.to_string(),
                login: profile.login,
            });
        }
        let repositories = self.fetcher.list_repositories(token).await;

        let user = self.store.upsert_user(&profile.login, &repositories)?;
        info!(
            "Registered {} with {} repositories",
            user.username,
            user.github_repositories.len()
        );
        Ok(user)
    }

    pub fn get_user(&self, username: &str) -> Result<UserRecord, SubjectError> {
        self.store
            .get_user(username)?
            .ok_or_else(|| SubjectError::UnknownUser(username.to_string()))
    }

    pub fn delete_user(&self, username: &str) -> Result<(), SubjectError> {
        let user = self.get_user(username)?;
        if user.status == AnalysisStatus::InProgress {
            return Err(SubjectError::InProgress);
        }
        self.store.delete_user(username)?;
        info!("Deleted user {}", username);
        Ok(())
    }

    /// Replace the user's selection with `ids`.
    ///
    /// The stored cached run is kept only when the new selection equals it.
    pub fn select_repositories(
        &self,
        username: &str,
        ids: &[u64],
    ) -> Result<UserRecord, SubjectError> {
        let user = self.get_user(username)?;
        if user.status == AnalysisStatus::InProgress {
            return Err(SubjectError::InProgress);
        }

        let known: HashSet<u64> = user.github_repositories.iter().map(|r| r.id).collect();
        let selection = validate_selection(ids, &known, self.analysis.max_repositories)?;
        Ok(self.store.replace_selection(username, &selection)?)
    }

    pub fn create_team(
        &self,
        requester: &str,
        name: &str,
        members: &[String],
    ) -> Result<TeamRecord, SubjectError> {
        validate_team_name(name)?;
        let members = validate_team_members(requester, members, &self.teams, |member| {
            Ok(self.store.get_user(member)?.is_some())
        })?;

        let team = self
            .store
            .create_team(name, &members, requester)
            .map_err(|e| match e {
                StoreError::Conflict(_) => SubjectError::TeamExists(name.to_string()),
                other => other.into(),
            })?;
        info!("Created team {} with {} members", team.name, team.members.len());
        Ok(team)
    }

    /// The team, if `requester` is one of its members.
    pub fn get_team(&self, name: &str, requester: &str) -> Result<TeamRecord, SubjectError> {
        let team = self
            .store
            .get_team(name)?
            .ok_or_else(|| SubjectError::UnknownTeam(name.to_string()))?;
        if !team.has_member(requester) {
            return Err(SubjectError::NotAMember(name.to_string()));
        }
        Ok(team)
    }

    pub fn delete_team(&self, name: &str, requester: &str) -> Result<(), SubjectError> {
        let team = self.get_team(name, requester)?;
        if team.status == AnalysisStatus::InProgress {
            return Err(SubjectError::InProgress);
        }
        self.store.delete_team(name)?;
        info!("Deleted team {}", name);
        Ok(())
    }

    pub fn list_teams(&self, username: &str) -> Result<Vec<TeamRecord>, SubjectError> {
        Ok(self.store.list_teams_for_user(username)?)
    }
}
