//! Archive extraction with zip-slip and decompression-bomb defenses.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};

use zip::ZipArchive;

use super::{
    AUTHOR_SIG_ENTRY, CHECKSUMS_ENTRY, MANIFEST_ENTRY, MAX_UNCOMPRESSED_BYTES, PLATFORM_SIG_ENTRY,
    SKILL_MD_ENTRY, is_unsafe_entry_path,
};
use crate::error::{Result, SkillPortError};
use crate::manifest::{Manifest, RawManifest};

/// Everything read out of an `.ssp` archive.
///
/// `manifest_raw` holds the bytes exactly as stored in the archive — never a
/// re-serialization — because signature verification runs over them.
#[derive(Debug, Clone)]
pub struct ExtractedArchive {
    pub manifest: Manifest,
    pub manifest_raw: Vec<u8>,
    /// Archive-internal path (`SKILL.md`, `payload/<path>`) → bytes.
    pub files: BTreeMap<String, Vec<u8>>,
    /// Present and non-empty, or `None`.
    pub author_signature: Option<String>,
    pub platform_signature: Option<String>,
    pub checksums: BTreeMap<String, String>,
    pub skill_md: Option<String>,
}

/// Extract an `.ssp` archive with the default 500 MiB decompression cap.
pub fn extract_archive(bytes: &[u8]) -> Result<ExtractedArchive> {
    extract_with_limit(bytes, MAX_UNCOMPRESSED_BYTES)
}

pub(crate) fn extract_with_limit(bytes: &[u8], limit_bytes: u64) -> Result<ExtractedArchive> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| SkillPortError::MalformedArchive(format!("not a valid zip: {e}")))?;

    let manifest_raw = read_entry(&mut archive, MANIFEST_ENTRY)?
        .ok_or_else(|| SkillPortError::MalformedArchive("manifest.json missing".into()))?;
    let manifest = RawManifest::parse(&manifest_raw)?
        .validate()
        .map_err(SkillPortError::ManifestInvalid)?;

    let author_signature = read_signature(&mut archive, AUTHOR_SIG_ENTRY)?;
    let platform_signature = read_signature(&mut archive, PLATFORM_SIG_ENTRY)?;

    let checksums: BTreeMap<String, String> = match read_entry(&mut archive, CHECKSUMS_ENTRY)? {
        Some(raw) => serde_json::from_slice(&raw)
            .map_err(|e| SkillPortError::MalformedArchive(format!("checksums.json: {e}")))?,
        None => BTreeMap::new(),
    };

    // Zip-slip defense: validate every entry name before any path handling.
    let unsafe_entry = archive
        .file_names()
        .find(|name| is_unsafe_entry_path(name))
        .map(ToString::to_string);
    if let Some(entry) = unsafe_entry {
        return Err(SkillPortError::ZipSlip { entry });
    }

    let mut files: BTreeMap<String, Vec<u8>> = BTreeMap::new();
    let mut declared_total: u64 = 0;
    let mut actual_total: u64 = 0;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| SkillPortError::MalformedArchive(format!("entry {i}: {e}")))?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        if is_metadata_entry(&name) {
            continue;
        }

        // Declared sizes are checked first, but they are advisory; the
        // bounded read below enforces the cap on actual decompressed bytes.
        declared_total = declared_total.saturating_add(entry.size());
        if declared_total > limit_bytes {
            return Err(SkillPortError::DecompressionBomb { limit_bytes });
        }

        let remaining = limit_bytes - actual_total;
        let mut content = Vec::new();
        (&mut entry)
            .take(remaining + 1)
            .read_to_end(&mut content)
            .map_err(|e| SkillPortError::MalformedArchive(format!("entry {name}: {e}")))?;
        actual_total += content.len() as u64;
        if actual_total > limit_bytes {
            return Err(SkillPortError::DecompressionBomb { limit_bytes });
        }
        files.insert(name, content);
    }

    let skill_md = files
        .get(SKILL_MD_ENTRY)
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned());

    Ok(ExtractedArchive {
        manifest,
        manifest_raw,
        files,
        author_signature,
        platform_signature,
        checksums,
        skill_md,
    })
}

fn is_metadata_entry(name: &str) -> bool {
    name == MANIFEST_ENTRY || name == CHECKSUMS_ENTRY || name.starts_with("signatures/")
}

fn read_entry(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> Result<Option<Vec<u8>>> {
    match archive.by_name(name) {
        Ok(mut entry) => {
            let mut content = Vec::new();
            entry
                .read_to_end(&mut content)
                .map_err(|e| SkillPortError::MalformedArchive(format!("entry {name}: {e}")))?;
            Ok(Some(content))
        }
        Err(zip::result::ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(SkillPortError::MalformedArchive(format!(
            "entry {name}: {e}"
        ))),
    }
}

/// Signatures are base64 text; whitespace is tolerated, empty means absent.
fn read_signature(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> Result<Option<String>> {
    Ok(read_entry(archive, name)?.and_then(|raw| {
        let text = String::from_utf8_lossy(&raw).trim().to_string();
        if text.is_empty() { None } else { Some(text) }
    }))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::archive::create_archive;
    use crate::crypto;
    use crate::manifest::demo_manifest;

    fn demo_files() -> BTreeMap<String, Vec<u8>> {
        let mut files = BTreeMap::new();
        files.insert("SKILL.md".to_string(), b"# Demo".to_vec());
        files.insert("scripts/run.sh".to_string(), b"echo demo".to_vec());
        files
    }

    /// Hand-craft a zip with arbitrary entries (stored, no compression).
    fn raw_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in entries {
            let options = zip::write::SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Stored);
            writer.start_file(*name, options).unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn signed_manifest_bytes() -> Vec<u8> {
        demo_manifest().canonical_json()
    }

    #[test]
    fn roundtrip_preserves_manifest_files_and_signature() {
        let kp = crypto::generate_keypair().unwrap();
        let manifest = demo_manifest();
        let bytes = create_archive(&manifest, &demo_files(), &kp.private_pem).unwrap();

        let extracted = extract_archive(&bytes).unwrap();
        assert_eq!(extracted.manifest.id, "alice/demo");
        assert_eq!(extracted.skill_md.as_deref(), Some("# Demo"));
        assert_eq!(
            extracted.files.get("payload/scripts/run.sh").unwrap(),
            b"echo demo"
        );
        assert!(extracted.platform_signature.is_none());

        let sig = extracted.author_signature.expect("author signature");
        assert!(crypto::verify(&extracted.manifest_raw, &sig, &kp.public_pem));

        let (ok, mismatches) =
            crypto::verify_checksums(&extracted.files, &extracted.manifest.hashes);
        assert!(ok, "{mismatches:?}");
    }

    #[test]
    fn missing_manifest_is_malformed() {
        let bytes = raw_zip(&[("SKILL.md", b"# Demo")]);
        let err = extract_archive(&bytes).unwrap_err();
        assert_eq!(err.code(), "malformed_archive");
    }

    #[test]
    fn garbage_bytes_are_malformed() {
        let err = extract_archive(b"not a zip at all").unwrap_err();
        assert_eq!(err.code(), "malformed_archive");
    }

    #[test]
    fn invalid_manifest_surfaces_violations() {
        let bytes = raw_zip(&[("manifest.json", br#"{"ssp_version": "9.9"}"#)]);
        let err = extract_archive(&bytes).unwrap_err();
        assert_eq!(err.code(), "manifest_invalid");
    }

    #[test]
    fn backslash_entry_rejected_as_zip_slip() {
        let manifest = signed_manifest_bytes();
        let bytes = raw_zip(&[
            ("manifest.json", manifest.as_slice()),
            ("payload\\..\\..\\etc\\passwd", b"root:x:0:0"),
        ]);
        let err = extract_archive(&bytes).unwrap_err();
        assert!(matches!(err, SkillPortError::ZipSlip { .. }), "{err}");
    }

    #[test]
    fn dotdot_entry_rejected_as_zip_slip() {
        let manifest = signed_manifest_bytes();
        let bytes = raw_zip(&[
            ("manifest.json", manifest.as_slice()),
            ("payload/../../etc/passwd", b"root:x:0:0"),
        ]);
        let err = extract_archive(&bytes).unwrap_err();
        assert!(matches!(err, SkillPortError::ZipSlip { .. }));
    }

    #[test]
    fn absolute_entry_rejected_as_zip_slip() {
        let manifest = signed_manifest_bytes();
        let bytes = raw_zip(&[
            ("manifest.json", manifest.as_slice()),
            ("/etc/passwd", b"root:x:0:0"),
        ]);
        let err = extract_archive(&bytes).unwrap_err();
        assert!(matches!(err, SkillPortError::ZipSlip { .. }));
    }

    #[test]
    fn cumulative_size_over_limit_is_a_bomb() {
        let manifest = signed_manifest_bytes();
        let big = vec![0_u8; 4096];
        let bytes = raw_zip(&[
            ("manifest.json", manifest.as_slice()),
            ("payload/a.bin", big.as_slice()),
            ("payload/b.bin", big.as_slice()),
        ]);
        let err = extract_with_limit(&bytes, 6000).unwrap_err();
        assert!(matches!(err, SkillPortError::DecompressionBomb { .. }));
    }

    #[test]
    fn under_limit_extracts_fine() {
        let manifest = signed_manifest_bytes();
        let bytes = raw_zip(&[
            ("manifest.json", manifest.as_slice()),
            ("payload/a.bin", b"small".as_slice()),
        ]);
        let extracted = extract_with_limit(&bytes, 6000).unwrap();
        assert_eq!(extracted.files.len(), 1);
    }

    #[test]
    fn missing_checksums_yield_empty_map() {
        let manifest = signed_manifest_bytes();
        let bytes = raw_zip(&[("manifest.json", manifest.as_slice())]);
        let extracted = extract_archive(&bytes).unwrap();
        assert!(extracted.checksums.is_empty());
        assert!(extracted.author_signature.is_none());
    }

    #[test]
    fn empty_signature_entry_reads_as_absent() {
        let manifest = signed_manifest_bytes();
        let bytes = raw_zip(&[
            ("manifest.json", manifest.as_slice()),
            ("signatures/author.sig", b"  \n"),
        ]);
        let extracted = extract_archive(&bytes).unwrap();
        assert!(extracted.author_signature.is_none());
    }

    #[test]
    fn manifest_raw_is_stored_bytes_not_reserialization() {
        // Same manifest content but with eccentric whitespace. Extraction
        // must hand back the stored bytes untouched.
        let pretty = signed_manifest_bytes();
        let value: serde_json::Value = serde_json::from_slice(&pretty).unwrap();
        let compact = serde_json::to_vec(&value).unwrap();
        assert_ne!(pretty, compact);

        let bytes = raw_zip(&[("manifest.json", compact.as_slice())]);
        let extracted = extract_archive(&bytes).unwrap();
        assert_eq!(extracted.manifest_raw, compact);
    }
}
