//! Shared fixtures for the integration suites.
#![allow(dead_code)]

use std::collections::BTreeMap;

use skillport::crypto::Keypair;
use skillport::manifest::{
    Author, DeclaredRisk, Manifest, OsFamily, Permissions, Platform, Scope,
};

/// A minimal valid manifest for `alice/demo`, signed by `key_id`.
pub fn demo_manifest(key_id: &str) -> Manifest {
    Manifest {
        ssp_version: "1.0".into(),
        id: "alice/demo".into(),
        name: "demo".into(),
        version: "1.0.0".into(),
        openclaw_compat: None,
        description: "A demo skill".into(),
        author: Author {
            name: "alice".into(),
            email: None,
            signing_key_id: key_id.into(),
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

pub fn demo_files() -> BTreeMap<String, Vec<u8>> {
    let mut files = BTreeMap::new();
    files.insert("SKILL.md".to_string(), b"# Demo".to_vec());
    files
}

pub fn keypair() -> Keypair {
    skillport::crypto::generate_keypair().expect("keypair generation")
}
