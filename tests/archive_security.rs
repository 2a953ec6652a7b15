//! Zip-slip resistance against hand-crafted archives.

mod common;

use std::io::Write as _;

use skillport::SkillPortError;
use skillport::archive::extract_archive;

/// Hand-craft a zip with a valid manifest plus one attacker-controlled entry.
fn zip_with_entry(entry_name: &str) -> Vec<u8> {
    let kp = common::keypair();
    let manifest_bytes = common::demo_manifest(&kp.key_id).canonical_json();

    let stored = || {
        zip::write::SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored)
    };
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    writer.start_file("manifest.json", stored()).unwrap();
    writer.write_all(&manifest_bytes).unwrap();
    writer.start_file(entry_name, stored()).unwrap();
    writer.write_all(b"root:x:0:0").unwrap();
    writer.finish().unwrap().into_inner()
}

#[test]
fn backslash_traversal_entry_rejected() {
    let bytes = zip_with_entry("payload\\..\\..\\etc\\passwd");
    let err = extract_archive(&bytes).unwrap_err();
    match err {
        SkillPortError::ZipSlip { entry } => assert!(entry.contains("passwd")),
        other => panic!("expected zip-slip rejection, got {other}"),
    }
}

#[test]
fn dotdot_traversal_entry_rejected() {
    let bytes = zip_with_entry("payload/../../etc/passwd");
    assert!(matches!(
        extract_archive(&bytes).unwrap_err(),
        SkillPortError::ZipSlip { .. }
    ));
}

#[test]
fn absolute_path_entry_rejected() {
    let bytes = zip_with_entry("/etc/passwd");
    assert!(matches!(
        extract_archive(&bytes).unwrap_err(),
        SkillPortError::ZipSlip { .. }
    ));
}

#[test]
fn plain_backslash_entry_rejected_even_without_dots() {
    let bytes = zip_with_entry("payload\\nested\\file.txt");
    assert!(matches!(
        extract_archive(&bytes).unwrap_err(),
        SkillPortError::ZipSlip { .. }
    ));
}

#[test]
fn exit_code_for_zip_slip_is_security_rejection() {
    let bytes = zip_with_entry("payload/../../etc/passwd");
    let err = extract_archive(&bytes).unwrap_err();
    assert_eq!(err.code(), "zip_slip");
    assert_eq!(err.exit_code(), 30);
}

#[test]
fn safe_payload_entries_still_extract() {
    let bytes = zip_with_entry("payload/scripts/tool.py");
    let extracted = extract_archive(&bytes).unwrap();
    assert!(extracted.files.contains_key("payload/scripts/tool.py"));
}
