//! Manifest validation: on-wire document → typed manifest or violations.
//!
//! Validation is total. It either produces a fully-typed [`Manifest`] with
//! defaults applied, or a list of violations each naming the offending
//! field. Nothing in between.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use super::{
    Author, DangerFlag, DeclaredRisk, Dependency, ExecPermission, FilesystemPermission,
    IntegrationLevel, Manifest, NetworkPermission, OsFamily, Platform, SSP_VERSION, Scope,
};
use crate::error::{Result, SkillPortError, Violation};

static ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9_-]+/[a-z0-9_-]+$").expect("id regex"));
static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+\.\d+$").expect("version regex"));
static KEY_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-f]{16}$").expect("key id regex"));

// ─── On-wire form ────────────────────────────────────────────────────────────

/// The manifest as authored: every defaultable field optional, every
/// mandatory field checked by [`RawManifest::validate`] rather than by serde,
/// so a missing field yields a named violation instead of a parse error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawManifest {
    pub ssp_version: Option<String>,
    pub id: Option<String>,
    pub name: Option<String>,
    pub version: Option<String>,
    pub openclaw_compat: Option<String>,
    pub description: Option<String>,
    pub author: Option<RawAuthor>,
    pub platform: Option<Platform>,
    pub os_compat: Option<Vec<OsFamily>>,
    pub entrypoints: Option<Vec<String>>,
    pub dependencies: Option<Vec<Dependency>>,
    pub permissions: Option<RawPermissions>,
    pub danger_flags: Option<Vec<DangerFlag>>,
    pub declared_risk: Option<DeclaredRisk>,
    pub inputs: Option<Vec<String>>,
    pub outputs: Option<Vec<String>>,
    pub scope: Option<Scope>,
    pub hashes: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAuthor {
    pub name: Option<String>,
    pub email: Option<String>,
    pub signing_key_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPermissions {
    pub network: Option<NetworkPermission>,
    pub filesystem: Option<FilesystemPermission>,
    pub exec: Option<ExecPermission>,
    pub integrations: Option<BTreeMap<String, IntegrationLevel>>,
}

impl RawManifest {
    /// Parse manifest JSON bytes. Syntax and type errors surface as a single
    /// document-level violation.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| {
            SkillPortError::ManifestInvalid(vec![Violation::new("$", format!("not valid JSON: {e}"))])
        })
    }

    /// Validate and apply defaults, producing the typed manifest or the full
    /// list of violations.
    #[allow(clippy::too_many_lines)]
    pub fn validate(self) -> std::result::Result<Manifest, Vec<Violation>> {
        let mut violations = Vec::new();

        let ssp_version = self.ssp_version.unwrap_or_default();
        if ssp_version != SSP_VERSION {
            violations.push(Violation::new(
                "ssp_version",
                format!("must be \"{SSP_VERSION}\""),
            ));
        }

        let id = self.id.unwrap_or_default();
        if !ID_RE.is_match(&id) {
            violations.push(Violation::new(
                "id",
                "must match author-slug/skill-slug ([a-z0-9_-]+/[a-z0-9_-]+)",
            ));
        }

        let version = self.version.unwrap_or_default();
        if !VERSION_RE.is_match(&version) {
            violations.push(Violation::new("version", "must be strict x.y.z"));
        }

        if let Some(range) = &self.openclaw_compat
            && !is_valid_semver_range(range)
        {
            violations.push(Violation::new(
                "openclaw_compat",
                "must be a semver range (e.g. >=1.2.0, <2.0.0)",
            ));
        }

        let name = match self.name {
            Some(name) if !name.trim().is_empty() => name,
            Some(_) => {
                violations.push(Violation::new("name", "must not be blank"));
                String::new()
            }
            // Default display name: the skill slug.
            None => id.split('/').nth(1).unwrap_or_default().to_string(),
        };

        let author = match self.author {
            Some(raw) => {
                let author_name = raw.name.unwrap_or_default();
                if author_name.trim().is_empty() {
                    violations.push(Violation::new("author.name", "must not be empty"));
                }
                let signing_key_id = raw.signing_key_id.unwrap_or_default();
                if !KEY_ID_RE.is_match(&signing_key_id) {
                    violations.push(Violation::new(
                        "author.signing_key_id",
                        "must be 16 lowercase hex characters",
                    ));
                }
                Author {
                    name: author_name,
                    email: raw.email,
                    signing_key_id,
                }
            }
            None => {
                violations.push(Violation::new("author", "is required"));
                Author {
                    name: String::new(),
                    email: None,
                    signing_key_id: String::new(),
                }
            }
        };

        let mut os_compat = self.os_compat.unwrap_or_default();
        os_compat.dedup();
        if os_compat.is_empty() {
            violations.push(Violation::new(
                "os_compat",
                "must name at least one of macos, linux, windows",
            ));
        }

        let entrypoints = self.entrypoints.unwrap_or_default();
        if entrypoints.is_empty() {
            violations.push(Violation::new("entrypoints", "must not be empty"));
        }
        for (idx, entry) in entrypoints.iter().enumerate() {
            if entry.trim().is_empty() {
                violations.push(Violation::new(
                    format!("entrypoints[{idx}]"),
                    "must not be blank",
                ));
            }
        }

        let permissions = match self.permissions {
            Some(raw) => {
                if raw.network.is_none() {
                    violations.push(Violation::new("permissions.network", "is required"));
                }
                if raw.filesystem.is_none() {
                    violations.push(Violation::new("permissions.filesystem", "is required"));
                }
                if raw.exec.is_none() {
                    violations.push(Violation::new("permissions.exec", "is required"));
                }
                super::Permissions {
                    network: raw.network.unwrap_or(NetworkPermission::None),
                    filesystem: raw.filesystem.unwrap_or_default(),
                    exec: raw.exec.unwrap_or_default(),
                    integrations: raw.integrations,
                }
            }
            None => {
                violations.push(Violation::new("permissions", "is required"));
                super::Permissions::deny_all()
            }
        };

        if !violations.is_empty() {
            return Err(violations);
        }

        Ok(Manifest {
            ssp_version,
            id,
            name,
            version,
            openclaw_compat: self.openclaw_compat,
            description: self.description.unwrap_or_default(),
            author,
            platform: self.platform.unwrap_or_default(),
            os_compat,
            entrypoints,
            dependencies: self.dependencies.unwrap_or_default(),
            permissions,
            danger_flags: self.danger_flags.unwrap_or_default(),
            declared_risk: self.declared_risk.unwrap_or_default(),
            inputs: self.inputs.unwrap_or_default(),
            outputs: self.outputs.unwrap_or_default(),
            scope: self.scope.unwrap_or_default(),
            hashes: self.hashes.unwrap_or_default(),
        })
    }
}

/// Check that every declared entrypoint exists in the caller's file map
/// (logical paths, `SKILL.md` at the root).
pub fn validate_entrypoints(
    manifest: &Manifest,
    files: &BTreeMap<String, Vec<u8>>,
) -> std::result::Result<(), Vec<Violation>> {
    let missing: Vec<Violation> = manifest
        .entrypoints
        .iter()
        .filter(|entry| !files.contains_key(*entry))
        .map(|entry| {
            Violation::new(
                "entrypoints",
                format!("entrypoint {entry} not present in payload"),
            )
        })
        .collect();
    if missing.is_empty() { Ok(()) } else { Err(missing) }
}

// ─── Semver ranges ───────────────────────────────────────────────────────────

/// Syntactic check for a semver range: comma-separated comparators, each an
/// optional operator (`=`, `>`, `>=`, `<`, `<=`, `^`, `~`) followed by a
/// version whose minor/patch may be a wildcard (`1.x`, `1.2.*`), or `*`.
pub fn is_valid_semver_range(range: &str) -> bool {
    static COMPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^(?:=|>=|<=|>|<|\^|~)?\s*(?:\*|\d+(?:\.(?:\d+|[xX*]))?(?:\.(?:\d+|[xX*]))?)$")
            .expect("comparator regex")
    });

    let trimmed = range.trim();
    if trimmed.is_empty() {
        return false;
    }
    trimmed
        .split(',')
        .map(str::trim)
        .all(|c| !c.is_empty() && COMPARATOR_RE.is_match(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_json() -> serde_json::Value {
        serde_json::json!({
            "ssp_version": "1.0",
            "id": "alice/demo",
            "version": "1.0.0",
            "author": {"name": "alice", "signing_key_id": "0123456789abcdef"},
            "os_compat": ["linux"],
            "entrypoints": ["SKILL.md"],
            "permissions": {
                "network": {"mode": "none"},
                "filesystem": {},
                "exec": {}
            }
        })
    }

    fn validate_value(value: serde_json::Value) -> std::result::Result<Manifest, Vec<Violation>> {
        RawManifest::parse(&serde_json::to_vec(&value).unwrap())
            .unwrap()
            .validate()
    }

    #[test]
    fn minimal_manifest_validates_with_defaults() {
        let manifest = validate_value(minimal_json()).unwrap();
        assert_eq!(manifest.name, "demo");
        assert_eq!(manifest.platform, Platform::Openclaw);
        assert_eq!(manifest.declared_risk, DeclaredRisk::Medium);
        assert!(manifest.dependencies.is_empty());
        assert!(manifest.danger_flags.is_empty());
        assert!(manifest.inputs.is_empty());
        assert!(!manifest.scope.files);
        assert!(manifest.hashes.is_empty());
    }

    #[test]
    fn wrong_ssp_version_rejected() {
        let mut value = minimal_json();
        value["ssp_version"] = "2.0".into();
        let violations = validate_value(value).unwrap_err();
        assert!(violations.iter().any(|v| v.field == "ssp_version"));
    }

    #[test]
    fn bad_id_shapes_rejected() {
        for bad in ["demo", "Alice/demo", "alice/demo/extra", "alice/", "/demo"] {
            let mut value = minimal_json();
            value["id"] = bad.into();
            let violations = validate_value(value).unwrap_err();
            assert!(violations.iter().any(|v| v.field == "id"), "id {bad:?}");
        }
    }

    #[test]
    fn loose_versions_rejected() {
        for bad in ["1.0", "1", "1.0.0-beta", "v1.0.0", "1.0.0.0"] {
            let mut value = minimal_json();
            value["version"] = bad.into();
            let violations = validate_value(value).unwrap_err();
            assert!(
                violations.iter().any(|v| v.field == "version"),
                "version {bad:?}"
            );
        }
    }

    #[test]
    fn signing_key_id_must_be_16_hex() {
        let mut value = minimal_json();
        value["author"]["signing_key_id"] = "ABCDEF0123456789".into();
        let violations = validate_value(value).unwrap_err();
        assert!(
            violations
                .iter()
                .any(|v| v.field == "author.signing_key_id")
        );
    }

    #[test]
    fn empty_os_compat_rejected() {
        let mut value = minimal_json();
        value["os_compat"] = serde_json::json!([]);
        let violations = validate_value(value).unwrap_err();
        assert!(violations.iter().any(|v| v.field == "os_compat"));
    }

    #[test]
    fn unknown_os_is_a_parse_violation() {
        let mut value = minimal_json();
        value["os_compat"] = serde_json::json!(["beos"]);
        let err = RawManifest::parse(&serde_json::to_vec(&value).unwrap()).unwrap_err();
        assert_eq!(err.code(), "manifest_invalid");
    }

    #[test]
    fn empty_entrypoints_rejected() {
        let mut value = minimal_json();
        value["entrypoints"] = serde_json::json!([]);
        let violations = validate_value(value).unwrap_err();
        assert!(violations.iter().any(|v| v.field == "entrypoints"));
    }

    #[test]
    fn missing_permission_records_each_named() {
        let mut value = minimal_json();
        value["permissions"] = serde_json::json!({"network": {"mode": "none"}});
        let violations = validate_value(value).unwrap_err();
        assert!(
            violations
                .iter()
                .any(|v| v.field == "permissions.filesystem")
        );
        assert!(violations.iter().any(|v| v.field == "permissions.exec"));
    }

    #[test]
    fn multiple_violations_all_reported() {
        let mut value = minimal_json();
        value["id"] = "bad id".into();
        value["version"] = "1".into();
        let violations = validate_value(value).unwrap_err();
        assert!(violations.len() >= 2);
    }

    #[test]
    fn openclaw_compat_range_syntax() {
        for good in [">=1.2.0, <2.0.0", "^1.2", "~1.2.3", "1.x", "*", "= 1.0.0"] {
            assert!(is_valid_semver_range(good), "{good:?}");
        }
        for bad in ["", "one.two", ">=", "1.2.3 banana", ">=1.2.0 <2"] {
            assert!(!is_valid_semver_range(bad), "{bad:?}");
        }
    }

    #[test]
    fn integrations_pass_through() {
        let mut value = minimal_json();
        value["permissions"]["integrations"] = serde_json::json!({"slack": "send"});
        let manifest = validate_value(value).unwrap();
        let integrations = manifest.permissions.integrations.unwrap();
        assert_eq!(integrations.get("slack"), Some(&IntegrationLevel::Send));
    }

    #[test]
    fn entrypoints_must_exist_in_payload() {
        let mut manifest = crate::manifest::demo_manifest();
        manifest.entrypoints = vec!["SKILL.md".into(), "scripts/run.sh".into()];
        let mut files = BTreeMap::new();
        files.insert("SKILL.md".to_string(), b"# Demo".to_vec());
        let violations = validate_entrypoints(&manifest, &files).unwrap_err();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("scripts/run.sh"));

        files.insert("scripts/run.sh".to_string(), b"echo".to_vec());
        assert!(validate_entrypoints(&manifest, &files).is_ok());
    }
}
