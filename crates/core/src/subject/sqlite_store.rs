//! SQLite-backed subject store implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};

use crate::analysis::{RepositoryMetrics, SubjectMetricSummary};
use crate::github::RepositoryDescriptor;

use super::store::{StoreError, SubjectStore};
use super::types::{
    AnalysisStatus, CachedRun, RepositorySelection, RunOutcome, SubjectRef, TeamRecord,
    UserRecord,
};

/// SQLite-backed subject store. Structured fields are stored as JSON columns.
pub struct SqliteSubjectStore {
    conn: Mutex<Connection>,
}

/// Raw `users` row before JSON decoding.
struct UserRow {
    username: String,
    status: String,
    github_repositories: String,
    selection: String,
    metrics: String,
    summary: Option<String>,
    last_run: Option<String>,
    created_at: String,
    updated_at: String,
}

struct TeamRow {
    name: String,
    status: String,
    summary: Option<String>,
    created_by: String,
    created_at: String,
    updated_at: String,
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, StoreError> {
    Ok(serde_json::to_string(value)?)
}

fn from_json<T: DeserializeOwned>(json: &str) -> Result<T, StoreError> {
    Ok(serde_json::from_str(json)?)
}

fn parse_time(value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Serialization(format!("bad timestamp {value}: {e}")))
}

fn parse_status(value: &str) -> Result<AnalysisStatus, StoreError> {
    value.parse().map_err(StoreError::Serialization)
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

impl SqliteSubjectStore {
    /// Create a new SQLite subject store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite subject store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS users (
                username TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                github_repositories TEXT NOT NULL,
                selection TEXT NOT NULL,
                metrics TEXT NOT NULL,
                summary TEXT,
                last_run TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS cached_runs (
                username TEXT PRIMARY KEY REFERENCES users(username) ON DELETE CASCADE,
                selection TEXT NOT NULL,
                metrics TEXT NOT NULL,
                summary TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS teams (
                name TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                summary TEXT,
                created_by TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS team_members (
                team_name TEXT NOT NULL REFERENCES teams(name) ON DELETE CASCADE,
                username TEXT NOT NULL,
                position INTEGER NOT NULL,
                PRIMARY KEY (team_name, username)
            );

            CREATE INDEX IF NOT EXISTS idx_team_members_username ON team_members(username);
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("connection lock poisoned".to_string()))
    }

    fn load_user(conn: &Connection, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let row = conn
            .query_row(
                "SELECT username, status, github_repositories, selection, metrics, summary,
                        last_run, created_at, updated_at
                 FROM users WHERE username = ?1",
                params![username],
                |row| {
                    Ok(UserRow {
                        username: row.get(0)?,
                        status: row.get(1)?,
                        github_repositories: row.get(2)?,
                        selection: row.get(3)?,
                        metrics: row.get(4)?,
                        summary: row.get(5)?,
                        last_run: row.get(6)?,
                        created_at: row.get(7)?,
                        updated_at: row.get(8)?,
                    })
                },
            )
            .optional()?;

        row.map(|row| {
            Ok(UserRecord {
                username: row.username,
                status: parse_status(&row.status)?,
                github_repositories: from_json(&row.github_repositories)?,
                selection: from_json(&row.selection)?,
                metrics: from_json(&row.metrics)?,
                summary: row.summary.as_deref().map(from_json).transpose()?,
                last_run: row.last_run.as_deref().map(from_json).transpose()?,
                created_at: parse_time(&row.created_at)?,
                updated_at: parse_time(&row.updated_at)?,
            })
        })
        .transpose()
    }

    fn require_user(conn: &Connection, username: &str) -> Result<UserRecord, StoreError> {
        Self::load_user(conn, username)?
            .ok_or_else(|| StoreError::NotFound(format!("user {username}")))
    }

    fn load_team(conn: &Connection, name: &str) -> Result<Option<TeamRecord>, StoreError> {
        let row = conn
            .query_row(
                "SELECT name, status, summary, created_by, created_at, updated_at
                 FROM teams WHERE name = ?1",
                params![name],
                |row| {
                    Ok(TeamRow {
                        name: row.get(0)?,
                        status: row.get(1)?,
                        summary: row.get(2)?,
                        created_by: row.get(3)?,
                        created_at: row.get(4)?,
                        updated_at: row.get(5)?,
                    })
                },
            )
            .optional()?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT username FROM team_members WHERE team_name = ?1 ORDER BY position",
        )?;
        let members = stmt
            .query_map(params![name], |r| r.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(TeamRecord {
            name: row.name,
            members,
            status: parse_status(&row.status)?,
            summary: row.summary.as_deref().map(from_json).transpose()?,
            created_by: row.created_by,
            created_at: parse_time(&row.created_at)?,
            updated_at: parse_time(&row.updated_at)?,
        }))
    }

    /// Run an UPDATE that must touch exactly one subject row.
    fn update_one(
        conn: &Connection,
        subject: &SubjectRef,
        set_clause: &str,
        value: Option<String>,
    ) -> Result<(), StoreError> {
        let (table, key) = match subject {
            SubjectRef::User(_) => ("users", "username"),
            SubjectRef::Team(_) => ("teams", "name"),
        };
        let sql = format!(
            "UPDATE {table} SET {set_clause}, updated_at = ?2 WHERE {key} = ?3"
        );
        let changed = conn.execute(&sql, params![value, now(), subject.id()])?;
        if changed == 0 {
            return Err(StoreError::NotFound(subject.to_string()));
        }
        Ok(())
    }
}

impl SubjectStore for SqliteSubjectStore {
    fn get_user(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let conn = self.conn()?;
        Self::load_user(&conn, username)
    }

    fn upsert_user(
        &self,
        username: &str,
        repositories: &[RepositoryDescriptor],
    ) -> Result<UserRecord, StoreError> {
        let conn = self.conn()?;
        let repos_json = to_json(repositories)?;
        let now = now();

        conn.execute(
            "INSERT INTO users (username, status, github_repositories, selection, metrics,
                                summary, last_run, created_at, updated_at)
             VALUES (?1, ?2, ?3, '[]', '{}', NULL, NULL, ?4, ?4)
             ON CONFLICT(username) DO UPDATE SET
                github_repositories = excluded.github_repositories,
                updated_at = excluded.updated_at",
            params![
                username,
                AnalysisStatus::NotStarted.as_str(),
                repos_json,
                now
            ],
        )?;

        Self::require_user(&conn, username)
    }

    fn delete_user(&self, username: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM cached_runs WHERE username = ?1", params![username])?;
        let deleted = conn.execute("DELETE FROM users WHERE username = ?1", params![username])?;
        if deleted == 0 {
            return Err(StoreError::NotFound(format!("user {username}")));
        }
        Ok(())
    }

    fn replace_selection(
        &self,
        username: &str,
        selection: &RepositorySelection,
    ) -> Result<UserRecord, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let cached_selection: Option<String> = tx
            .query_row(
                "SELECT selection FROM cached_runs WHERE username = ?1",
                params![username],
                |row| row.get(0),
            )
            .optional()?;
        let cache_matches = match cached_selection {
            Some(json) => from_json::<RepositorySelection>(&json)? == *selection,
            None => false,
        };

        let selection_json = to_json(selection)?;
        let changed = if cache_matches {
            tx.execute(
                "UPDATE users SET selection = ?1, updated_at = ?2 WHERE username = ?3",
                params![selection_json, now(), username],
            )?
        } else {
            tx.execute("DELETE FROM cached_runs WHERE username = ?1", params![username])?;
            tx.execute(
                "UPDATE users SET selection = ?1, metrics = '{}', summary = NULL,
                        updated_at = ?2
                 WHERE username = ?3",
                params![selection_json, now(), username],
            )?
        };
        if changed == 0 {
            return Err(StoreError::NotFound(format!("user {username}")));
        }

        let user = Self::require_user(&tx, username)?;
        tx.commit()?;
        Ok(user)
    }

    fn get_status(&self, subject: &SubjectRef) -> Result<Option<AnalysisStatus>, StoreError> {
        let conn = self.conn()?;
        let sql = match subject {
            SubjectRef::User(_) => "SELECT status FROM users WHERE username = ?1",
            SubjectRef::Team(_) => "SELECT status FROM teams WHERE name = ?1",
        };
        let status: Option<String> = conn
            .query_row(sql, params![subject.id()], |row| row.get(0))
            .optional()?;
        status.as_deref().map(parse_status).transpose()
    }

    fn set_status(&self, subject: &SubjectRef, status: AnalysisStatus) -> Result<(), StoreError> {
        let conn = self.conn()?;
        Self::update_one(
            &conn,
            subject,
            "status = ?1",
            Some(status.as_str().to_string()),
        )
    }

    fn try_begin_run(&self, subject: &SubjectRef) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let sql = match subject {
            SubjectRef::User(_) => {
                "UPDATE users SET status = ?1, updated_at = ?2 WHERE username = ?3 AND status != ?1"
            }
            SubjectRef::Team(_) => {
                "UPDATE teams SET status = ?1, updated_at = ?2 WHERE name = ?3 AND status != ?1"
            }
        };
        let changed = conn.execute(
            sql,
            params![AnalysisStatus::InProgress.as_str(), now(), subject.id()],
        )?;
        Ok(changed == 1)
    }

    fn replace_metrics(
        &self,
        username: &str,
        metrics: &RepositoryMetrics,
    ) -> Result<(), StoreError> {
        let conn = self.conn()?;
        Self::update_one(
            &conn,
            &SubjectRef::user(username),
            "metrics = ?1",
            Some(to_json(metrics)?),
        )
    }

    fn replace_summary(
        &self,
        subject: &SubjectRef,
        summary: &SubjectMetricSummary,
    ) -> Result<(), StoreError> {
        let conn = self.conn()?;
        Self::update_one(&conn, subject, "summary = ?1", Some(to_json(summary)?))
    }

    fn record_run_outcome(&self, username: &str, outcome: &RunOutcome) -> Result<(), StoreError> {
        let conn = self.conn()?;
        Self::update_one(
            &conn,
            &SubjectRef::user(username),
            "last_run = ?1",
            Some(to_json(outcome)?),
        )
    }

    fn get_cached_run(&self, username: &str) -> Result<Option<CachedRun>, StoreError> {
        let conn = self.conn()?;
        let row: Option<(String, String, String, String)> = conn
            .query_row(
                "SELECT selection, metrics, summary, created_at FROM cached_runs
                 WHERE username = ?1",
                params![username],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        row.map(|(selection, metrics, summary, created_at)| {
            Ok(CachedRun {
                selection: from_json(&selection)?,
                metrics: from_json(&metrics)?,
                summary: from_json(&summary)?,
                created_at: parse_time(&created_at)?,
            })
        })
        .transpose()
    }

    fn store_cached_run(&self, username: &str, run: &CachedRun) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO cached_runs (username, selection, metrics, summary, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(username) DO UPDATE SET
                selection = excluded.selection,
                metrics = excluded.metrics,
                summary = excluded.summary,
                created_at = excluded.created_at",
            params![
                username,
                to_json(&run.selection)?,
                to_json(&run.metrics)?,
                to_json(&run.summary)?,
                run.created_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn reset_user(&self, username: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE users SET status = ?1, selection = '[]', metrics = '{}', summary = NULL,
                    updated_at = ?2
             WHERE username = ?3",
            params![AnalysisStatus::NotStarted.as_str(), now(), username],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("user {username}")));
        }
        Ok(())
    }

    fn create_team(
        &self,
        name: &str,
        members: &[String],
        created_by: &str,
    ) -> Result<TeamRecord, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let now = now();
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO teams (name, status, summary, created_by, created_at, updated_at)
             VALUES (?1, ?2, NULL, ?3, ?4, ?4)",
            params![name, AnalysisStatus::NotStarted.as_str(), created_by, now],
        )?;
        if inserted == 0 {
            return Err(StoreError::Conflict(format!("team {name}")));
        }

        for (position, member) in members.iter().enumerate() {
            tx.execute(
                "INSERT INTO team_members (team_name, username, position) VALUES (?1, ?2, ?3)",
                params![name, member, position as i64],
            )?;
        }

        let team = Self::load_team(&tx, name)?
            .ok_or_else(|| StoreError::NotFound(format!("team {name}")))?;
        tx.commit()?;
        Ok(team)
    }

    fn get_team(&self, name: &str) -> Result<Option<TeamRecord>, StoreError> {
        let conn = self.conn()?;
        Self::load_team(&conn, name)
    }

    fn delete_team(&self, name: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM teams WHERE name = ?1", params![name])?;
        if deleted == 0 {
            return Err(StoreError::NotFound(format!("team {name}")));
        }
        Ok(())
    }

    fn list_teams_for_user(&self, username: &str) -> Result<Vec<TeamRecord>, StoreError> {
        let conn = self.conn()?;
        let names = {
            let mut stmt = conn.prepare(
                "SELECT team_name FROM team_members WHERE username = ?1 ORDER BY team_name",
            )?;
            let names = stmt
                .query_map(params![username], |r| r.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            names
        };

        let mut teams = Vec::with_capacity(names.len());
        for name in names {
            if let Some(team) = Self::load_team(&conn, &name)? {
                teams.push(team);
            }
        }
        Ok(teams)
    }

    fn reset_team(&self, name: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE teams SET status = ?1, summary = NULL, updated_at = ?2 WHERE name = ?3",
            params![AnalysisStatus::NotStarted.as_str(), now(), name],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("team {name}")));
        }
        Ok(())
    }

    fn release_interrupted_runs(&self) -> Result<usize, StoreError> {
        let conn = self.conn()?;
        let mut released = 0;
        for table in ["users", "teams"] {
            released += conn.execute(
                &format!("UPDATE {table} SET status = ?1, updated_at = ?2 WHERE status = ?3"),
                params![
                    AnalysisStatus::Completed.as_str(),
                    now(),
                    AnalysisStatus::InProgress.as_str()
                ],
            )?;
        }
        Ok(released)
    }
}
