//! Permission assessor: maps declared permissions to a 5-level risk
//! classification per category, plus the pointwise maximum overall.

use serde::{Deserialize, Serialize};

use crate::manifest::{IntegrationLevel, NetworkPermission, Permissions};

/// Risk classification, totally ordered safe < low < medium < high < critical.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Safe,
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Safe => "safe",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionAssessment {
    pub network: RiskLevel,
    pub filesystem: RiskLevel,
    pub exec: RiskLevel,
    pub integrations: RiskLevel,
    pub overall: RiskLevel,
}

/// Write targets that make a skill's filesystem grant critical: the
/// filesystem root, the user's home, and system configuration trees.
fn is_critical_write_path(path: &str) -> bool {
    let trimmed = path.trim();
    matches!(trimmed, "/" | "~" | "/etc" | "/usr")
        || trimmed.starts_with("/etc/")
        || trimmed.starts_with("/usr/")
        || trimmed.starts_with("~/")
}

pub fn assess_permissions(permissions: &Permissions) -> PermissionAssessment {
    let network = assess_network(&permissions.network);
    let filesystem = assess_filesystem(permissions);
    let exec = assess_exec(permissions);
    let integrations = assess_integrations(permissions);

    let overall = network.max(filesystem).max(exec).max(integrations);

    PermissionAssessment {
        network,
        filesystem,
        exec,
        integrations,
        overall,
    }
}

fn assess_network(network: &NetworkPermission) -> RiskLevel {
    match network {
        NetworkPermission::None => RiskLevel::Safe,
        NetworkPermission::Allowlist { domains } if domains.len() <= 2 => RiskLevel::Low,
        NetworkPermission::Allowlist { .. } => RiskLevel::Medium,
    }
}

fn assess_filesystem(permissions: &Permissions) -> RiskLevel {
    let fs = &permissions.filesystem;
    if fs.read_paths.is_empty() && fs.write_paths.is_empty() {
        return RiskLevel::Safe;
    }
    if fs.write_paths.is_empty() {
        return RiskLevel::Low;
    }
    if fs.write_paths.iter().any(|p| is_critical_write_path(p)) {
        return RiskLevel::Critical;
    }
    RiskLevel::Medium
}

fn assess_exec(permissions: &Permissions) -> RiskLevel {
    let exec = &permissions.exec;
    if exec.shell {
        return RiskLevel::High;
    }
    if exec.allowed_commands.is_empty() {
        return RiskLevel::Safe;
    }
    if exec.allowed_commands.len() <= 3 {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}

fn assess_integrations(permissions: &Permissions) -> RiskLevel {
    let Some(integrations) = &permissions.integrations else {
        return RiskLevel::Safe;
    };
    if integrations.is_empty() {
        return RiskLevel::Safe;
    }
    let levels: Vec<IntegrationLevel> = integrations.values().copied().collect();
    if levels
        .iter()
        .any(|l| matches!(l, IntegrationLevel::Send | IntegrationLevel::Write))
    {
        return RiskLevel::High;
    }
    if levels.iter().any(|l| matches!(l, IntegrationLevel::Read)) {
        return RiskLevel::Medium;
    }
    RiskLevel::Low
}
