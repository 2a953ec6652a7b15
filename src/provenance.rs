//! Append-only provenance and audit logs (JSON Lines).
//!
//! Writers append complete lines and never rewrite. Each entry carries the
//! session id and agent identity alongside action-specific fields.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::session;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvenanceEntry {
    pub ts: DateTime<Utc>,
    pub session_id: String,
    pub action: String,
    pub agent: String,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, Value>,
}

/// An append-only JSONL log bound to a path.
#[derive(Debug, Clone)]
pub struct JsonlLog {
    path: PathBuf,
}

impl JsonlLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one action record. `fields` must be a JSON object; its keys
    /// are flattened into the entry.
    pub fn append(&self, action: &str, fields: Value) -> Result<()> {
        let entry = ProvenanceEntry {
            ts: Utc::now(),
            session_id: session::session_id(),
            action: action.to_string(),
            agent: session::agent_identity(),
            fields: match fields {
                Value::Object(map) => map,
                Value::Null => serde_json::Map::new(),
                other => {
                    let mut map = serde_json::Map::new();
                    map.insert("detail".into(), other);
                    map
                }
            },
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut line = serde_json::to_vec(&entry).expect("entry serialization cannot fail");
        line.push(b'\n');
        // One complete line per write; cross-process appends interleave at
        // line granularity.
        file.write_all(&line)?;
        Ok(())
    }

    /// Read every entry back, skipping unparseable lines.
    pub fn read_all(&self) -> Result<Vec<ProvenanceEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        Ok(raw
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| serde_json::from_str(l).ok())
            .collect())
    }
}
