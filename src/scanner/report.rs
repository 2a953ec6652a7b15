//! Scan report types and risk scoring.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Issue severity. Weights feed the risk score; the scan fails when any
/// high or critical issue is present.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn weight(self) -> u32 {
        match self {
            Self::Info => 0,
            Self::Low => 2,
            Self::Medium => 5,
            Self::High => 15,
            Self::Critical => 30,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Secret,
    Dangerous,
    Pii,
    Obfuscation,
    Network,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Secret => "secret",
            Self::Dangerous => "dangerous",
            Self::Pii => "pii",
            Self::Obfuscation => "obfuscation",
            Self::Network => "network",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rule match at a specific file and line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanIssue {
    pub rule_id: String,
    pub category: Category,
    pub severity: Severity,
    pub file: String,
    /// 1-based.
    pub line: u32,
    /// First 200 characters of the offending line.
    pub snippet: String,
    pub remediation: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanSummary {
    pub total: u32,
    pub by_severity: BTreeMap<String, u32>,
    pub by_category: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub passed: bool,
    /// Capped weighted sum of issue severities, in [0, 100].
    pub risk_score: u32,
    pub summary: ScanSummary,
    pub issues: Vec<ScanIssue>,
    pub scanned_files: Vec<String>,
    pub skipped_files: Vec<String>,
    pub scanned_at: DateTime<Utc>,
    pub scanner_version: String,
}

/// Risk score ceiling. The weighted sum saturates here.
pub const MAX_RISK_SCORE: u32 = 100;

impl ScanReport {
    pub fn from_issues(
        issues: Vec<ScanIssue>,
        scanned_files: Vec<String>,
        skipped_files: Vec<String>,
    ) -> Self {
        let mut summary = ScanSummary {
            total: issues.len() as u32,
            ..ScanSummary::default()
        };
        let mut weighted: u32 = 0;
        for issue in &issues {
            weighted = weighted.saturating_add(issue.severity.weight());
            *summary
                .by_severity
                .entry(issue.severity.as_str().to_string())
                .or_insert(0) += 1;
            *summary
                .by_category
                .entry(issue.category.as_str().to_string())
                .or_insert(0) += 1;
        }

        let high = summary.by_severity.get("high").copied().unwrap_or(0);
        let critical = summary.by_severity.get("critical").copied().unwrap_or(0);

        Self {
            passed: high == 0 && critical == 0,
            risk_score: weighted.min(MAX_RISK_SCORE),
            summary,
            issues,
            scanned_files,
            skipped_files,
            scanned_at: Utc::now(),
            scanner_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn count(&self, severity: Severity) -> u32 {
        self.summary
            .by_severity
            .get(severity.as_str())
            .copied()
            .unwrap_or(0)
    }
}
