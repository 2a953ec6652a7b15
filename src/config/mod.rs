//! Persisted state layout and tool configuration.
//!
//! Everything lives under the user's `.skillport` directory:
//!   config.json              marketplace URL, auth token, default key id
//!   keys/default.pub|.key    PEM keypair, private key at 0o600
//!   installed/registry.json  installed-skills index
//!   audit/audit.log          JSON Lines audit trail
//!   provenance.jsonl         append-only provenance log
//!   traces/                  optional per-execution traces

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use directories::UserDirs;
use serde::{Deserialize, Serialize};

use crate::crypto::Keypair;
use crate::error::{Result, SkillPortError};
use crate::manifest::Platform;

pub const DEFAULT_MARKETPLACE_URL: &str = "https://api.skillport.dev";

/// Filesystem layout rooted at the SkillPort home directory.
#[derive(Debug, Clone)]
pub struct SkillPortHome {
    root: PathBuf,
}

impl SkillPortHome {
    /// Resolve the state root, creating the directory tree on first use.
    /// `SKILLPORT_HOME` overrides the default `~/.skillport`.
    pub fn resolve() -> Result<Self> {
        if let Ok(root) = std::env::var("SKILLPORT_HOME")
            && !root.trim().is_empty()
        {
            return Self::at(PathBuf::from(root));
        }
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("could not find home directory")?;
        let root = home.join(".skillport");
        Self::at(root)
    }

    /// Root the layout at an explicit directory (tests, sandboxes).
    pub fn at(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        for dir in ["keys", "installed", "audit", "traces"] {
            std::fs::create_dir_all(root.join(dir))?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.json")
    }

    pub fn public_key_path(&self) -> PathBuf {
        self.root.join("keys").join("default.pub")
    }

    pub fn private_key_path(&self) -> PathBuf {
        self.root.join("keys").join("default.key")
    }

    pub fn registry_path(&self) -> PathBuf {
        self.root.join("installed").join("registry.json")
    }

    pub fn audit_log_path(&self) -> PathBuf {
        self.root.join("audit").join("audit.log")
    }

    pub fn provenance_path(&self) -> PathBuf {
        self.root.join("provenance.jsonl")
    }

    pub fn traces_dir(&self) -> PathBuf {
        self.root.join("traces")
    }

    /// Install root for a target platform. `OPENCLAW_SKILLS_DIR` and
    /// `CLAUDE_SKILLS_DIR` override; otherwise skills land under this home.
    pub fn install_root(&self, platform: Platform) -> PathBuf {
        let from_env = |var: &str| {
            std::env::var(var)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
        };
        match platform {
            Platform::Openclaw => from_env("OPENCLAW_SKILLS_DIR")
                .unwrap_or_else(|| self.root.join("skills").join("openclaw")),
            Platform::ClaudeCode => from_env("CLAUDE_SKILLS_DIR")
                .unwrap_or_else(|| self.root.join("skills").join("claude")),
            Platform::Universal => from_env("OPENCLAW_SKILLS_DIR")
                .or_else(|| from_env("CLAUDE_SKILLS_DIR"))
                .unwrap_or_else(|| self.root.join("skills").join("universal")),
        }
    }

    // ── Key storage ──────────────────────────────────────────────────────

    /// Persist a keypair as the default identity. The private key is
    /// written with owner-only permissions.
    pub fn save_keypair(&self, keypair: &Keypair) -> Result<()> {
        std::fs::write(self.public_key_path(), &keypair.public_pem)?;
        let private_path = self.private_key_path();
        std::fs::write(&private_path, &keypair.private_pem)?;
        restrict_permissions(&private_path)?;
        Ok(())
    }

    pub fn load_public_key(&self) -> Result<String> {
        std::fs::read_to_string(self.public_key_path())
            .map_err(|_| SkillPortError::KeyMissing("no default public key".into()))
    }

    pub fn load_private_key(&self) -> Result<String> {
        std::fs::read_to_string(self.private_key_path())
            .map_err(|_| SkillPortError::KeyMissing("no default private key".into()))
    }
}

/// Owner-only file mode for key material and config carrying tokens.
fn restrict_permissions(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

// ─── Tool configuration ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub marketplace_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_expiry: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_key_id: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            marketplace_url: DEFAULT_MARKETPLACE_URL.to_string(),
            auth_token: None,
            auth_expiry: None,
            default_key_id: None,
        }
    }
}

impl Config {
    /// Load the config, creating a default one on first run. Environment
    /// overrides are applied after load.
    pub fn load_or_init(home: &SkillPortHome) -> Result<Self> {
        let path = home.config_path();
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw).map_err(|e| {
                SkillPortError::InputInvalid(format!("unreadable config {}: {e}", path.display()))
            })?
        } else {
            let config = Self::default();
            config.save(home)?;
            config
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn save(&self, home: &SkillPortHome) -> Result<()> {
        let path = home.config_path();
        let body = serde_json::to_vec_pretty(self).expect("config serialization cannot fail");
        std::fs::write(&path, body)?;
        restrict_permissions(&path)?;
        Ok(())
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("SKILLPORT_API_URL")
            && !url.trim().is_empty()
        {
            self.marketplace_url = url;
        }
        if let Ok(token) = std::env::var("SKILLPORT_AUTH_TOKEN")
            && !token.trim().is_empty()
        {
            self.auth_token = Some(token);
        }
    }
}
