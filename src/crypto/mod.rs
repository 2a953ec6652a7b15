//! Ed25519 signing and SHA-256 checksum primitives.
//!
//! The signature covers the serialized manifest, which itself commits to
//! every payload file via its hash map. Tampering with any payload byte
//! breaks a checksum; tampering with any manifest byte breaks the signature.

use std::collections::BTreeMap;

use anyhow::Context;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use ed25519_dalek::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use pkcs8::LineEnding;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use crate::error::{Result, SkillPortError};

/// Number of leading hex characters of the public-key digest used as key id.
const KEY_ID_LEN: usize = 16;

/// A freshly generated Ed25519 keypair in PEM form.
#[derive(Debug, Clone)]
pub struct Keypair {
    /// SPKI-encoded public key.
    pub public_pem: String,
    /// PKCS#8-encoded private key.
    pub private_pem: String,
    /// First 16 hex chars of SHA-256 over the public PEM string.
    pub key_id: String,
}

/// Generate an Ed25519 keypair. The caller is responsible for persisting the
/// private PEM with owner-only permissions.
pub fn generate_keypair() -> Result<Keypair> {
    let signing_key = SigningKey::generate(&mut OsRng);
    let private_pem = signing_key
        .to_pkcs8_pem(LineEnding::LF)
        .context("failed to encode private key as PKCS#8 PEM")?
        .to_string();
    let public_pem = signing_key
        .verifying_key()
        .to_public_key_pem(LineEnding::LF)
        .context("failed to encode public key as SPKI PEM")?;
    let key_id = key_id_for_public_pem(&public_pem);

    Ok(Keypair {
        public_pem,
        private_pem,
        key_id,
    })
}

/// Derive the key id for a PEM-encoded public key: SHA-256 over the PEM
/// string, truncated to the first 16 lowercase hex characters.
pub fn key_id_for_public_pem(public_pem: &str) -> String {
    let digest = sha256_hex(public_pem.as_bytes());
    digest[..KEY_ID_LEN].to_string()
}

/// Sign the exact bytes passed in. Returns a base64 signature.
pub fn sign(manifest_bytes: &[u8], private_pem: &str) -> Result<String> {
    let signing_key = SigningKey::from_pkcs8_pem(private_pem)
        .map_err(|e| SkillPortError::KeyMissing(format!("unreadable private key: {e}")))?;
    let signature = signing_key.sign(manifest_bytes);
    Ok(BASE64.encode(signature.to_bytes()))
}

/// Verify a base64 signature over the exact bytes passed in.
///
/// Never raises: a malformed key, signature, or base64 payload is reported
/// as `false`.
pub fn verify(manifest_bytes: &[u8], signature_b64: &str, public_pem: &str) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_public_key_pem(public_pem) else {
        return false;
    };
    // Base64 may arrive with incidental newline wrapping.
    let compact: String = signature_b64.split_whitespace().collect();
    let Ok(sig_bytes) = BASE64.decode(compact.as_bytes()) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(&sig_bytes) else {
        return false;
    };
    verifying_key.verify(manifest_bytes, &signature).is_ok()
}

/// Hex-encoded SHA-256 of the given bytes (64 lowercase hex chars).
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Compute the checksum map for a file map, preserving entries.
pub fn compute_checksums(files: &BTreeMap<String, Vec<u8>>) -> BTreeMap<String, String> {
    files
        .iter()
        .map(|(path, bytes)| (path.clone(), sha256_hex(bytes)))
        .collect()
}

/// Verify a file map against an expected checksum map.
///
/// A path is reported as mismatched both when present with different bytes
/// and when absent from the file map.
pub fn verify_checksums(
    files: &BTreeMap<String, Vec<u8>>,
    expected: &BTreeMap<String, String>,
) -> (bool, Vec<String>) {
    let mut mismatches = Vec::new();
    for (path, want) in expected {
        match files.get(path) {
            Some(bytes) if &sha256_hex(bytes) == want => {}
            _ => mismatches.push(path.clone()),
        }
    }
    (mismatches.is_empty(), mismatches)
}
