//! Archive creation: checksum, sign, emit.

use std::collections::BTreeMap;
use std::io::{Cursor, Write};

use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

/// Deterministic write options: deflate level 9, fixed timestamp.
pub(crate) fn deflate_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9))
        .last_modified_time(zip::DateTime::default())
}

use super::{
    AUTHOR_SIG_ENTRY, CHECKSUMS_ENTRY, MANIFEST_ENTRY, PAYLOAD_PREFIX, SKILL_MD_ENTRY,
    is_unsafe_entry_path,
};
use crate::crypto;
use crate::error::{Result, SkillPortError};
use crate::manifest::{Manifest, validate_entrypoints};

/// Build a signed `.ssp` archive.
///
/// `files` maps logical paths as seen from the caller (`SKILL.md` lands at
/// the archive root, everything else under `payload/`). The manifest's hash
/// map is overwritten from actual content, the result is serialized
/// canonically, and the signature covers exactly those bytes. The signer
/// never recomputes or reformats the manifest after signing.
pub fn create_archive(
    manifest: &Manifest,
    files: &BTreeMap<String, Vec<u8>>,
    private_key_pem: &str,
) -> Result<Vec<u8>> {
    for path in files.keys() {
        if is_unsafe_entry_path(path) {
            return Err(SkillPortError::InputInvalid(format!(
                "unsafe file path: {path}"
            )));
        }
    }

    validate_entrypoints(manifest, files).map_err(SkillPortError::ManifestInvalid)?;

    // Internal layout: SKILL.md at the root, everything else under payload/.
    let mut internal: BTreeMap<String, Vec<u8>> = BTreeMap::new();
    for (path, bytes) in files {
        let key = if path == SKILL_MD_ENTRY {
            SKILL_MD_ENTRY.to_string()
        } else {
            format!("{PAYLOAD_PREFIX}{path}")
        };
        internal.insert(key, bytes.clone());
    }

    let checksums = crypto::compute_checksums(&internal);

    let mut signed_manifest = manifest.clone();
    signed_manifest.hashes = checksums.clone();
    let manifest_bytes = signed_manifest.canonical_json();
    let signature = crypto::sign(&manifest_bytes, private_key_pem)?;

    let checksum_bytes =
        serde_json::to_vec_pretty(&checksums).expect("checksum map serialization cannot fail");

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let mut put = |name: &str, bytes: &[u8]| -> Result<()> {
        writer
            .start_file(name, deflate_options())
            .map_err(|e| SkillPortError::MalformedArchive(format!("zip write: {e}")))?;
        writer.write_all(bytes)?;
        Ok(())
    };

    // Fixed logical order.
    put(MANIFEST_ENTRY, &manifest_bytes)?;
    put(AUTHOR_SIG_ENTRY, signature.as_bytes())?;
    put(CHECKSUMS_ENTRY, &checksum_bytes)?;
    if let Some(skill_md) = internal.get(SKILL_MD_ENTRY) {
        put(SKILL_MD_ENTRY, skill_md)?;
    }
    for (name, bytes) in &internal {
        if name.starts_with(PAYLOAD_PREFIX) {
            put(name, bytes)?;
        }
    }

    let cursor = writer
        .finish()
        .map_err(|e| SkillPortError::MalformedArchive(format!("zip finalize: {e}")))?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::demo_manifest;

    fn demo_files() -> BTreeMap<String, Vec<u8>> {
        let mut files = BTreeMap::new();
        files.insert("SKILL.md".to_string(), b"# Demo".to_vec());
        files.insert("scripts/run.sh".to_string(), b"echo demo".to_vec());
        files
    }

    fn entry_names(bytes: &[u8]) -> Vec<String> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn entries_appear_in_fixed_logical_order() {
        let kp = crypto::generate_keypair().unwrap();
        let bytes = create_archive(&demo_manifest(), &demo_files(), &kp.private_pem).unwrap();
        assert_eq!(
            entry_names(&bytes),
            vec![
                "manifest.json",
                "signatures/author.sig",
                "checksums.json",
                "SKILL.md",
                "payload/scripts/run.sh",
            ]
        );
    }

    #[test]
    fn create_is_deterministic_for_fixed_inputs() {
        let kp = crypto::generate_keypair().unwrap();
        let a = create_archive(&demo_manifest(), &demo_files(), &kp.private_pem).unwrap();
        let b = create_archive(&demo_manifest(), &demo_files(), &kp.private_pem).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn manifest_hashes_cover_internal_layout() {
        let kp = crypto::generate_keypair().unwrap();
        let bytes = create_archive(&demo_manifest(), &demo_files(), &kp.private_pem).unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut manifest_raw = Vec::new();
        std::io::Read::read_to_end(
            &mut archive.by_name("manifest.json").unwrap(),
            &mut manifest_raw,
        )
        .unwrap();
        let manifest = Manifest::from_bytes(&manifest_raw).unwrap();
        assert!(manifest.hashes.contains_key("SKILL.md"));
        assert!(manifest.hashes.contains_key("payload/scripts/run.sh"));
        assert_eq!(
            manifest.hashes["SKILL.md"],
            crypto::sha256_hex(b"# Demo"),
        );
    }

    #[test]
    fn unsafe_caller_paths_rejected() {
        let kp = crypto::generate_keypair().unwrap();
        let mut files = demo_files();
        files.insert("../escape.txt".to_string(), b"x".to_vec());
        let err = create_archive(&demo_manifest(), &files, &kp.private_pem).unwrap_err();
        assert_eq!(err.code(), "input_invalid");
    }

    #[test]
    fn missing_entrypoint_rejected() {
        let kp = crypto::generate_keypair().unwrap();
        let mut manifest = demo_manifest();
        manifest.entrypoints = vec!["missing.md".into()];
        let err = create_archive(&manifest, &demo_files(), &kp.private_pem).unwrap_err();
        assert_eq!(err.code(), "manifest_invalid");
    }

    #[test]
    fn signature_verifies_over_stored_manifest_bytes() {
        let kp = crypto::generate_keypair().unwrap();
        let bytes = create_archive(&demo_manifest(), &demo_files(), &kp.private_pem).unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut manifest_raw = Vec::new();
        std::io::Read::read_to_end(
            &mut archive.by_name("manifest.json").unwrap(),
            &mut manifest_raw,
        )
        .unwrap();
        let mut sig = String::new();
        std::io::Read::read_to_string(
            &mut archive.by_name("signatures/author.sig").unwrap(),
            &mut sig,
        )
        .unwrap();

        assert!(crypto::verify(&manifest_raw, &sig, &kp.public_pem));
    }
}
