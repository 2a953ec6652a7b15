//! Skill manifest schema: the contract between a skill and its runtime.
//!
//! Two forms exist. [`RawManifest`] is the on-wire document with every
//! defaultable field optional; [`Manifest`] is the validated form with
//! defaults applied. Signatures are always computed over the canonical
//! serialization of the validated form, and those bytes are treated as
//! opaque between sign and verify.

mod validate;

pub use validate::{RawManifest, is_valid_semver_range, validate_entrypoints};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SkillPortError};
use crate::scanner::Severity;

/// The only supported package format version.
pub const SSP_VERSION: &str = "1.0";

// ─── Manifest ────────────────────────────────────────────────────────────────

/// A validated skill manifest. Field order here defines the canonical JSON
/// key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub ssp_version: String,
    /// `author-slug/skill-slug`.
    pub id: String,
    pub name: String,
    /// Strict x.y.z.
    pub version: String,
    /// Semver range the host runtime must satisfy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openclaw_compat: Option<String>,
    pub description: String,
    pub author: Author,
    pub platform: Platform,
    pub os_compat: Vec<OsFamily>,
    pub entrypoints: Vec<String>,
    pub dependencies: Vec<Dependency>,
    pub permissions: Permissions,
    pub danger_flags: Vec<DangerFlag>,
    pub declared_risk: DeclaredRisk,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub scope: Scope,
    /// Archive-internal path → hex SHA-256, populated at create time.
    pub hashes: BTreeMap<String, String>,
}

impl Manifest {
    /// Parse and validate manifest bytes in one step.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let raw = RawManifest::parse(bytes)?;
        raw.validate().map_err(SkillPortError::ManifestInvalid)
    }

    /// Canonical serialization: two-space indent, `\n` newlines, key order as
    /// declared on the struct. These are the bytes that get signed.
    pub fn canonical_json(&self) -> Vec<u8> {
        serde_json::to_vec_pretty(self).expect("manifest serialization cannot fail")
    }

    /// The author slug (text before the `/`).
    pub fn author_slug(&self) -> &str {
        self.id.split('/').next().unwrap_or(&self.id)
    }

    /// The skill slug (text after the `/`).
    pub fn skill_slug(&self) -> &str {
        self.id.split('/').nth(1).unwrap_or(&self.id)
    }

    /// True when any danger flag is declared at critical severity.
    pub fn has_critical_danger_flag(&self) -> bool {
        self.danger_flags
            .iter()
            .any(|f| f.severity == Severity::Critical)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// First 16 hex chars of SHA-256 over the author's public PEM.
    pub signing_key_id: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    #[default]
    Openclaw,
    ClaudeCode,
    Universal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    Macos,
    Linux,
    Windows,
}

impl std::fmt::Display for OsFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Macos => "macos",
            Self::Linux => "linux",
            Self::Windows => "windows",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclaredRisk {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    pub kind: DependencyKind,
    #[serde(default)]
    pub optional: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    Binary,
    EnvVar,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DangerFlag {
    pub id: String,
    pub severity: Severity,
    #[serde(default)]
    pub note: String,
}

// ─── Permissions ─────────────────────────────────────────────────────────────

/// Permission declarations a skill requests. Always fully specified after
/// validation: absence of a grant is an explicit deny.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub network: NetworkPermission,
    pub filesystem: FilesystemPermission,
    pub exec: ExecPermission,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrations: Option<BTreeMap<String, IntegrationLevel>>,
}

impl Permissions {
    /// Permissions that deny everything.
    pub fn deny_all() -> Self {
        Self {
            network: NetworkPermission::None,
            filesystem: FilesystemPermission::default(),
            exec: ExecPermission::default(),
            integrations: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum NetworkPermission {
    None,
    Allowlist { domains: Vec<String> },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesystemPermission {
    #[serde(default)]
    pub read_paths: Vec<String>,
    #[serde(default)]
    pub write_paths: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecPermission {
    #[serde(default)]
    pub allowed_commands: Vec<String>,
    #[serde(default)]
    pub shell: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationLevel {
    None,
    Read,
    Write,
    Send,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    #[serde(default)]
    pub files: bool,
    #[serde(default)]
    pub network: bool,
    #[serde(default)]
    pub processes: bool,
    #[serde(default)]
    pub env_vars: bool,
}

/// Minimal valid manifest used as a fixture across the crate's unit tests.
#[cfg(test)]
pub(crate) fn demo_manifest() -> Manifest {
    Manifest {
        ssp_version: SSP_VERSION.to_string(),
        id: "alice/demo".into(),
        name: "demo".into(),
        version: "1.0.0".into(),
        openclaw_compat: None,
        description: "A demo skill".into(),
        author: Author {
            name: "alice".into(),
            email: None,
            signing_key_id: "0123456789abcdef".into(),
        },
        platform: Platform::Openclaw,
        os_compat: vec![OsFamily::Macos, OsFamily::Linux, OsFamily::Windows],
        entrypoints: vec!["SKILL.md".into()],
        dependencies: Vec::new(),
        permissions: Permissions::deny_all(),
        danger_flags: Vec::new(),
        declared_risk: DeclaredRisk::Medium,
        inputs: Vec::new(),
        outputs: Vec::new(),
        scope: Scope::default(),
        hashes: BTreeMap::new(),
    }
}
