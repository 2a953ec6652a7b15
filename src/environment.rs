//! Host environment probe: OS detection, search-path binary resolution,
//! environment variable checks.

use serde::{Deserialize, Serialize};

use crate::manifest::{DependencyKind, Manifest, OsFamily};

/// Normalize the host OS identifier. `None` for platforms no skill can
/// declare compatibility with.
pub fn detect_os() -> Option<OsFamily> {
    match std::env::consts::OS {
        "macos" => Some(OsFamily::Macos),
        "linux" => Some(OsFamily::Linux),
        "windows" => Some(OsFamily::Windows),
        _ => None,
    }
}

/// Resolve a binary on the OS search path. False on not-found or error.
pub fn binary_exists(name: &str) -> bool {
    which::which(name).is_ok()
}

/// Non-empty environment variable lookup.
pub fn env_var_exists(name: &str) -> bool {
    std::env::var(name).is_ok_and(|v| !v.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Ok,
    Warn,
    Missing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvCheck {
    pub name: String,
    pub kind: String,
    pub status: CheckStatus,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvReport {
    pub checks: Vec<EnvCheck>,
    /// True iff the OS is compatible, no non-optional binary is missing,
    /// and no required env var is missing.
    pub ready: bool,
}

/// Probe the host against a manifest's OS compatibility and dependencies.
/// Optional dependencies degrade to warnings; required ones are missing.
pub fn check_environment(manifest: &Manifest) -> EnvReport {
    let mut checks = Vec::new();
    let mut ready = true;

    let host = detect_os();
    let os_ok = host.is_some_and(|os| manifest.os_compat.contains(&os));
    checks.push(EnvCheck {
        name: "os".into(),
        kind: "os".into(),
        status: if os_ok {
            CheckStatus::Ok
        } else {
            CheckStatus::Missing
        },
        detail: match host {
            Some(os) => format!("host is {os}"),
            None => format!("unsupported host ({})", std::env::consts::OS),
        },
    });
    if !os_ok {
        ready = false;
    }

    for dep in &manifest.dependencies {
        let (found, kind) = match dep.kind {
            DependencyKind::Binary => (binary_exists(&dep.name), "binary"),
            DependencyKind::EnvVar => (env_var_exists(&dep.name), "env_var"),
        };
        let status = if found {
            CheckStatus::Ok
        } else if dep.optional {
            CheckStatus::Warn
        } else {
            ready = false;
            CheckStatus::Missing
        };
        checks.push(EnvCheck {
            name: dep.name.clone(),
            kind: kind.into(),
            status,
            detail: if found {
                "found".into()
            } else if dep.optional {
                "not found (optional)".into()
            } else {
                "not found".into()
            },
        });
    }

    EnvReport { checks, ready }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{Dependency, demo_manifest};

    #[test]
    fn detect_os_maps_to_a_known_family() {
        // The test host is one of the three supported families.
        assert!(detect_os().is_some());
    }

    #[test]
    fn binary_exists_for_shell_absent_for_nonsense() {
        // `sh` exists on unix hosts, `cmd` on windows.
        #[cfg(unix)]
        assert!(binary_exists("sh"));
        #[cfg(windows)]
        assert!(binary_exists("cmd"));
        assert!(!binary_exists("definitely-not-a-real-binary-xyz"));
    }

    #[test]
    fn env_var_exists_requires_non_empty() {
        // SAFETY: test-local variable names, no concurrent readers.
        unsafe {
            std::env::set_var("SKILLPORT_TEST_PRESENT", "1");
            std::env::set_var("SKILLPORT_TEST_EMPTY", "");
        }
        assert!(env_var_exists("SKILLPORT_TEST_PRESENT"));
        assert!(!env_var_exists("SKILLPORT_TEST_EMPTY"));
        assert!(!env_var_exists("SKILLPORT_TEST_ABSENT_XYZ"));
    }

    #[test]
    fn compatible_manifest_is_ready() {
        let report = check_environment(&demo_manifest());
        assert!(report.ready, "{:?}", report.checks);
    }

    #[test]
    fn missing_required_binary_blocks_readiness() {
        let mut manifest = demo_manifest();
        manifest.dependencies.push(Dependency {
            name: "definitely-not-a-real-binary-xyz".into(),
            kind: DependencyKind::Binary,
            optional: false,
        });
        let report = check_environment(&manifest);
        assert!(!report.ready);
        assert!(
            report
                .checks
                .iter()
                .any(|c| c.status == CheckStatus::Missing && c.kind == "binary")
        );
    }

    #[test]
    fn missing_optional_binary_only_warns() {
        let mut manifest = demo_manifest();
        manifest.dependencies.push(Dependency {
            name: "definitely-not-a-real-binary-xyz".into(),
            kind: DependencyKind::Binary,
            optional: true,
        });
        let report = check_environment(&manifest);
        assert!(report.ready);
        assert!(
            report
                .checks
                .iter()
                .any(|c| c.status == CheckStatus::Warn)
        );
    }

    #[test]
    fn incompatible_os_blocks_readiness() {
        let mut manifest = demo_manifest();
        // Claim compatibility with everything except the host.
        let host = detect_os().unwrap();
        manifest.os_compat = [OsFamily::Macos, OsFamily::Linux, OsFamily::Windows]
            .into_iter()
            .filter(|os| *os != host)
            .collect();
        let report = check_environment(&manifest);
        assert!(!report.ready);
    }
}
