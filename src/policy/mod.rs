//! Declarative `.skillportrc` policy: per-action approval gates and
//! auto-install limits.
//!
//! Loading never fails: the first valid policy file wins (project dir, then
//! user config dir), and a missing or malformed file falls through to the
//! built-in defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Policy file name, looked up in the project root and the user config dir.
pub const POLICY_FILE_NAME: &str = ".skillportrc";

pub const DEFAULT_MAX_RISK_SCORE: u32 = 30;
pub const DEFAULT_MAX_PER_SESSION: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    /// Empty means every host is allowed.
    pub allowed_hosts: Vec<String>,
    pub workspace_boundary: bool,
    /// Actions that require a human in the loop.
    pub requires_approval: Vec<String>,
    pub auto_install: AutoInstallPolicy,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            allowed_hosts: Vec::new(),
            workspace_boundary: true,
            requires_approval: Vec::new(),
            auto_install: AutoInstallPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoInstallPolicy {
    pub max_risk_score: u32,
    pub require_platform_sig: bool,
    pub max_per_session: u32,
}

impl Default for AutoInstallPolicy {
    fn default() -> Self {
        Self {
            max_risk_score: DEFAULT_MAX_RISK_SCORE,
            require_platform_sig: false,
            max_per_session: DEFAULT_MAX_PER_SESSION,
        }
    }
}

/// On-disk shape: a top-level `policy` object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PolicyFile {
    policy: Policy,
}

/// Context for a policy decision.
#[derive(Debug, Clone, Default)]
pub struct ActionContext {
    pub non_interactive: bool,
    pub risk_score: Option<u32>,
    pub has_platform_sig: bool,
    pub session_install_count: u32,
}

/// The outcome of a policy check. Denials carry hints naming the
/// `.skillportrc` knob that would unblock the action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyDecision {
    pub allowed: bool,
    pub reason: String,
    pub hints: Vec<String>,
}

impl PolicyDecision {
    fn allow(reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            reason: reason.into(),
            hints: Vec::new(),
        }
    }

    fn deny(reason: impl Into<String>, hints: Vec<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
            hints,
        }
    }
}

impl Policy {
    /// Load the effective policy: project scope takes precedence over user
    /// scope; anything missing or malformed falls back to defaults.
    pub fn load(project_dir: &Path, user_config_dir: &Path) -> Self {
        for dir in [project_dir, user_config_dir] {
            let path = dir.join(POLICY_FILE_NAME);
            if let Some(policy) = Self::read_file(&path) {
                tracing::debug!(path = %path.display(), "loaded policy");
                return policy;
            }
        }
        Self::default()
    }

    fn read_file(path: &Path) -> Option<Self> {
        let raw = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str::<PolicyFile>(&raw) {
            Ok(file) => Some(file.policy),
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "malformed policy file ignored");
                None
            }
        }
    }

    /// Evaluate an action against this policy. Fail-closed in
    /// non-interactive mode for anything listed under `requires_approval`.
    pub fn check(&self, action: &str, ctx: &ActionContext) -> PolicyDecision {
        if self.requires_approval.iter().any(|a| a == action) && ctx.non_interactive {
            return PolicyDecision::deny(
                format!("action '{action}' requires interactive approval"),
                vec![format!(
                    "remove \"{action}\" from policy.requires_approval in .skillportrc to allow it non-interactively"
                )],
            );
        }

        if action == "install" && ctx.non_interactive {
            let limits = &self.auto_install;
            if let Some(risk) = ctx.risk_score
                && risk > limits.max_risk_score
            {
                return PolicyDecision::deny(
                    format!(
                        "risk score {risk} exceeds auto_install.max_risk_score {}",
                        limits.max_risk_score
                    ),
                    vec![
                        "raise policy.auto_install.max_risk_score in .skillportrc".into(),
                        "or install interactively to review the scan findings".into(),
                    ],
                );
            }
            if limits.require_platform_sig && !ctx.has_platform_sig {
                return PolicyDecision::deny(
                    "archive has no platform signature and policy requires one",
                    vec![
                        "set policy.auto_install.require_platform_sig to false in .skillportrc"
                            .into(),
                    ],
                );
            }
            if ctx.session_install_count >= limits.max_per_session {
                return PolicyDecision::deny(
                    format!(
                        "session install count {} reached auto_install.max_per_session {}",
                        ctx.session_install_count, limits.max_per_session
                    ),
                    vec!["raise policy.auto_install.max_per_session in .skillportrc".into()],
                );
            }
        }

        PolicyDecision::allow(format!("action '{action}' permitted by policy"))
    }

    /// Host gate for marketplace traffic: allow all when the list is empty,
    /// otherwise exact membership.
    pub fn is_host_allowed(&self, host: &str) -> bool {
        self.allowed_hosts.is_empty() || self.allowed_hosts.iter().any(|h| h == host)
    }
}
