//! Rule persistence between invocations.
//!
//! The whole rule set is written as one JSON document after every change.
//! Writes go to a sibling temp file first and are renamed into place.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use applb_core::ApplicationLoadBalancerRule;

use crate::error::CliError;

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StateDocument {
    version: u32,
    rules: Vec<ApplicationLoadBalancerRule>,
}

pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read saved rules. A missing file is an empty rule set.
    pub fn load(&self) -> Result<Vec<ApplicationLoadBalancerRule>, CliError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no state file yet");
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        let doc: StateDocument = serde_json::from_str(&raw).map_err(|e| self.invalid(e))?;
        if doc.version != FORMAT_VERSION {
            return Err(self.invalid(format!("unsupported version {}", doc.version)));
        }
        debug!(path = %self.path.display(), rules = doc.rules.len(), "loaded state");
        Ok(doc.rules)
    }

    pub fn save(&self, rules: Vec<ApplicationLoadBalancerRule>) -> Result<(), CliError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let doc = StateDocument {
            version: FORMAT_VERSION,
            rules,
        };
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&doc)?)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), rules = doc.rules.len(), "saved state");
        Ok(())
    }

    fn invalid(&self, reason: impl std::fmt::Display) -> CliError {
        CliError::State {
            path: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}
