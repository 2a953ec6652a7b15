use std::path::PathBuf;

use thiserror::Error;

// ─── Schema violations ───────────────────────────────────────────────────────

/// A single manifest schema violation, naming the offending field.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

// ─── Error taxonomy ──────────────────────────────────────────────────────────

/// Structured error taxonomy for `SkillPort`.
///
/// Every failure the core can surface maps to exactly one variant, a stable
/// code string, and a numeric exit code. Mapping to the JSON envelope and to
/// process exit happens at the outermost boundary; the core never prints.
#[derive(Debug, Error)]
pub enum SkillPortError {
    // ── Input ────────────────────────────────────────────────────────────
    #[error("invalid input: {0}")]
    InputInvalid(String),

    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("not found: {0}")]
    NotFound(String),

    // ── Archive ──────────────────────────────────────────────────────────
    #[error("malformed archive: {0}")]
    MalformedArchive(String),

    #[error("manifest invalid: {}", format_violations(.0))]
    ManifestInvalid(Vec<Violation>),

    #[error("archive entry escapes extraction root: {entry}")]
    ZipSlip { entry: String },

    #[error("archive exceeds decompression limit of {limit_bytes} bytes")]
    DecompressionBomb { limit_bytes: u64 },

    // ── Trust chain ──────────────────────────────────────────────────────
    #[error("checksum mismatch for: {}", .paths.join(", "))]
    ChecksumMismatch { paths: Vec<String> },

    #[error("archive has no author signature")]
    SignatureMissing,

    #[error("signature verification failed: {0}")]
    SignatureInvalid(String),

    #[error("signing key missing: {0}")]
    KeyMissing(String),

    #[error("key not registered: {0}")]
    KeyNotRegistered(String),

    // ── Scan / policy ────────────────────────────────────────────────────
    #[error(
        "security scan failed: risk score {risk_score} with {high} high and {critical} critical issues"
    )]
    ScanFailed {
        risk_score: u32,
        high: u32,
        critical: u32,
    },

    #[error("blocked by policy: {reason}")]
    PolicyRejected { reason: String, hints: Vec<String> },

    // ── Environment ──────────────────────────────────────────────────────
    #[error("skill does not support this OS ({host}); supported: {}", .supported.join(", "))]
    OsIncompatible {
        host: String,
        supported: Vec<String>,
    },

    #[error("required dependency missing: {name}")]
    DependencyMissing { name: String },

    // ── Marketplace ──────────────────────────────────────────────────────
    #[error("authentication required: {0}")]
    AuthRequired(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("rate limited")]
    RateLimited { retry_after_secs: Option<u64> },

    // ── Fallthrough ──────────────────────────────────────────────────────
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl SkillPortError {
    /// Stable machine-readable code string for the JSON envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InputInvalid(_) => "input_invalid",
            Self::FileNotFound(_) => "file_not_found",
            Self::NotFound(_) => "not_found",
            Self::MalformedArchive(_) => "malformed_archive",
            Self::ManifestInvalid(_) => "manifest_invalid",
            Self::ZipSlip { .. } => "zip_slip",
            Self::DecompressionBomb { .. } => "decompression_bomb",
            Self::ChecksumMismatch { .. } => "checksum_mismatch",
            Self::SignatureMissing => "signature_missing",
            Self::SignatureInvalid(_) => "signature_invalid",
            Self::KeyMissing(_) => "key_missing",
            Self::KeyNotRegistered(_) => "key_not_registered",
            Self::ScanFailed { .. } => "scan_failed",
            Self::PolicyRejected { .. } => "policy_rejected",
            Self::OsIncompatible { .. } => "os_incompatible",
            Self::DependencyMissing { .. } => "dependency_missing",
            Self::AuthRequired(_) => "auth_required",
            Self::Forbidden(_) => "forbidden",
            Self::Network(_) => "network",
            Self::RateLimited { .. } => "rate_limited",
            Self::Io(_) => "io",
            Self::Other(_) => "internal",
        }
    }

    /// Stable exit code contract for automation.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InputInvalid(_) | Self::FileNotFound(_) | Self::NotFound(_) => 2,
            Self::Network(_) | Self::RateLimited { .. } => 10,
            Self::AuthRequired(_) | Self::Forbidden(_) => 11,
            Self::OsIncompatible { .. } | Self::DependencyMissing { .. } => 20,
            Self::MalformedArchive(_)
            | Self::ManifestInvalid(_)
            | Self::ZipSlip { .. }
            | Self::DecompressionBomb { .. }
            | Self::ChecksumMismatch { .. }
            | Self::SignatureMissing
            | Self::SignatureInvalid(_)
            | Self::KeyMissing(_)
            | Self::KeyNotRegistered(_) => 30,
            Self::ScanFailed { .. } => 31,
            Self::PolicyRejected { .. } => 32,
            Self::Io(_) | Self::Other(_) => 1,
        }
    }

    /// Whether the caller may retry the operation unchanged.
    pub fn retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::RateLimited { .. })
    }

    /// Human-readable unblock hints, surfaced in the JSON envelope.
    pub fn hints(&self) -> Vec<String> {
        match self {
            Self::PolicyRejected { hints, .. } => hints.clone(),
            Self::SignatureMissing => {
                vec!["re-export the archive with `skillport export` to attach a signature".into()]
            }
            Self::KeyMissing(_) => {
                vec!["generate a keypair with `skillport keys generate`".into()]
            }
            Self::AuthRequired(_) => {
                vec!["set SKILLPORT_AUTH_TOKEN or log in to the marketplace".into()]
            }
            Self::RateLimited {
                retry_after_secs: Some(secs),
            } => vec![format!("retry after {secs}s")],
            _ => Vec::new(),
        }
    }
}

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, SkillPortError>;
