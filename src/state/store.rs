//! State store
//!
//! Whole-document persistence of [`MonitorState`]. A missing, unreadable or
//! malformed document is treated as an empty initial state; only filesystem
//! failures on write are errors.

use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{MonitorError, Result};
use crate::state::document::MonitorState;

pub trait StateStore {
    fn load(&self) -> Result<MonitorState>;

    fn save(&self, state: &MonitorState) -> Result<()>;
}

/// JSON document on local disk, replaced atomically via a sibling temp file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse(&self, contents: &str) -> MonitorState {
        let value: Value = match serde_json::from_str(contents) {
            Ok(value) => value,
            Err(e) => {
                warn!("State file {:?} is not valid JSON ({}), starting fresh", self.path, e);
                return MonitorState::default();
            }
        };

        if !value.is_object() {
            warn!("State file {:?} is not a JSON object, starting fresh", self.path);
            return MonitorState::default();
        }

        serde_json::from_value(value).unwrap_or_else(|e| {
            warn!("State file {:?} has an unexpected shape ({}), starting fresh", self.path, e);
            MonitorState::default()
        })
    }
}

impl StateStore for JsonFileStore {
    fn load(&self) -> Result<MonitorState> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let state = self.parse(&contents);
                debug!("Loaded state with {} runs from {:?}", state.runs.len(), self.path);
                Ok(state)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No state file at {:?}, starting fresh", self.path);
                Ok(MonitorState::default())
            }
            Err(e) => {
                warn!("State file {:?} could not be read ({}), starting fresh", self.path, e);
                Ok(MonitorState::default())
            }
        }
    }

    fn save(&self, state: &MonitorState) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                MonitorError::StateError(format!("Failed to create state directory {:?}: {}", parent, e))
            })?;
        }

        let json = serde_json::to_string_pretty(state)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json)
            .map_err(|e| MonitorError::StateError(format!("Failed to write {:?}: {}", tmp, e)))?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            MonitorError::StateError(format!("Failed to replace {:?}: {}", self.path, e))
        })?;

        debug!("Saved state with {} runs to {:?}", state.runs.len(), self.path);
        Ok(())
    }
}
