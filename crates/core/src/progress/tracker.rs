use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;

/// Returned by [`ProgressTracker::get_progress`] for subjects with no run in flight.
pub const NO_PROGRESS: f64 = -1.0;

const EVENT_BUFFER: usize = 256;

#[derive(Debug, Error, PartialEq)]
pub enum ProgressError {
    #[error("progress value {0} is outside [0, 1]")]
    InvalidArgument(f64),
}

/// A change to the progress map.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Updated { subject_id: String, value: f64 },
    Cleared { subject_id: String },
}

/// Shared subject id -> fraction map.
///
/// Cheap to clone; every clone sees the same entries. Updates from many
/// concurrent runs are safe since every operation touches a single key.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    entries: Arc<RwLock<HashMap<String, f64>>>,
    events: broadcast::Sender<ProgressEvent>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            events,
        }
    }

    /// Record `value` for `subject_id`, replacing any prior value.
    pub fn set_progress(&self, subject_id: &str, value: f64) -> Result<(), ProgressError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(ProgressError::InvalidArgument(value));
        }

        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(subject_id.to_string(), value);

        let _ = self.events.send(ProgressEvent::Updated {
            subject_id: subject_id.to_string(),
            value,
        });
        Ok(())
    }

    /// Current fraction, or [`NO_PROGRESS`] when no run is in flight.
    pub fn get_progress(&self, subject_id: &str) -> f64 {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(subject_id)
            .copied()
            .unwrap_or(NO_PROGRESS)
    }

    /// Remove the entry for `subject_id`. No-op when absent.
    pub fn clear_progress(&self, subject_id: &str) {
        let removed = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(subject_id);

        if removed.is_some() {
            let _ = self.events.send(ProgressEvent::Cleared {
                subject_id: subject_id.to_string(),
            });
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.events.subscribe()
    }

    /// Number of runs currently reporting progress.
    pub fn active(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
