//! Installed-skills registry: a single JSON document rewritten atomically.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstalledSkill {
    pub id: String,
    pub version: String,
    pub installed_at: DateTime<Utc>,
    pub install_path: PathBuf,
    pub author_key_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registry {
    pub skills: Vec<InstalledSkill>,
}

impl Registry {
    /// Load the registry; a missing file is an empty registry.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        match serde_json::from_str(&raw) {
            Ok(registry) => Ok(registry),
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "unreadable registry, starting empty");
                Ok(Self::default())
            }
        }
    }

    /// Rewrite the whole document under a temporary name, then rename over
    /// the target so concurrent readers never observe a partial write.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(self).expect("registry serialization cannot fail");
        std::fs::write(&tmp, body)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn find(&self, id: &str) -> Option<&InstalledSkill> {
        self.skills.iter().find(|s| s.id == id)
    }

    /// Upsert: drop any prior record sharing the id, then append the new
    /// record. At most one record per id can ever exist.
    pub fn upsert(&mut self, record: InstalledSkill) {
        self.skills.retain(|s| s.id != record.id);
        self.skills.push(record);
    }

    /// Remove by id, returning the removed record if present.
    pub fn remove(&mut self, id: &str) -> Option<InstalledSkill> {
        let idx = self.skills.iter().position(|s| s.id == id)?;
        Some(self.skills.remove(idx))
    }
}
