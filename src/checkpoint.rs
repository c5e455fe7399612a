use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::models::Thread;

/// Everything needed to resume a crawl.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointState {
    #[serde(rename = "processed_threads", default)]
    pub processed_thread_ids: BTreeSet<String>,

    /// Threads found by discovery. Complete once `discovery_cursor` is `None`.
    #[serde(rename = "threads", default, skip_serializing_if = "Option::is_none")]
    pub cached_thread_list: Option<Vec<Thread>>,

    /// Continuation token of the first list page not yet fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovery_cursor: Option<String>,
}

impl CheckpointState {
    pub fn is_processed(&self, thread_id: &str) -> bool {
        self.processed_thread_ids.contains(thread_id)
    }

    /// Cached thread list, only if discovery ran to completion.
    pub fn complete_thread_list(&self) -> Option<&[Thread]> {
        match (&self.cached_thread_list, &self.discovery_cursor) {
            (Some(threads), None) => Some(threads),
            _ => None,
        }
    }
}

/// Single JSON document on disk. Unreadable means "no checkpoint".
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CheckpointStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> CheckpointState {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return CheckpointState::default(),
            Err(e) => {
                warn!("Could not read checkpoint {:?}: {}; starting fresh", self.path, e);
                return CheckpointState::default();
            }
        };

        if raw.trim().is_empty() {
            return CheckpointState::default();
        }

        match serde_json::from_str(&raw) {
            Ok(state) => state,
            Err(e) => {
                warn!("Checkpoint {:?} is corrupt ({}); starting fresh", self.path, e);
                CheckpointState::default()
            }
        }
    }

    /// Overwrite the checkpoint. Failures are logged and swallowed.
    pub fn save(&self, state: &CheckpointState) {
        match self.write(state) {
            Ok(()) => debug!(
                processed = state.processed_thread_ids.len(),
                "Checkpoint saved"
            ),
            Err(e) => error!("Failed to save checkpoint {:?}: {:#}", self.path, e),
        }
    }

    fn write(&self, state: &CheckpointState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }
        let json = serde_json::to_string(state)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("Failed to write {:?}", tmp))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to move {:?} into place", tmp))?;
        Ok(())
    }
}

// ── Tests ──
