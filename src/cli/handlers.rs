//! Command handlers: wire the core pipelines to the CLI surface.
//!
//! Handlers return structured data plus a human summary; the envelope and
//! exit-code mapping live in [`crate::output`].

use std::collections::BTreeMap;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use serde_json::json;

use super::commands::{Cli, Commands, KeyCommands};
use crate::archive::{
    AUTHOR_SIG_ENTRY, CHECKSUMS_ENTRY, ExtractedArchive, MANIFEST_ENTRY, PAYLOAD_PREFIX,
    PLATFORM_SIG_ENTRY, SKILL_MD_ENTRY, create_archive, extract_archive,
};
use crate::config::{Config, SkillPortHome};
use crate::crypto;
use crate::environment::check_environment;
use crate::error::{Result, SkillPortError};
use crate::install::{InstallOptions, InstallSource, Installer};
use crate::manifest::RawManifest;
use crate::marketplace::MarketplaceClient;
use crate::output::{self, CommandOutput};
use crate::policy::{ActionContext, Policy};
use crate::provenance::JsonlLog;
use crate::registry::Registry;
use crate::scanner::Scanner;
use crate::security::assess_permissions;

/// Entry point for `main`: execute the parsed CLI and return the exit code.
pub fn run(cli: Cli) -> i32 {
    let json_mode = cli.json;
    let result = execute(cli.command, json_mode);
    output::emit(&result, json_mode)
}

struct Ctx {
    home: SkillPortHome,
    config: Config,
    policy: Policy,
    json_mode: bool,
}

fn execute(command: Commands, json_mode: bool) -> Result<CommandOutput> {
    let home = SkillPortHome::resolve()?;
    let config = Config::load_or_init(&home)?;
    let cwd = std::env::current_dir()?;
    let policy = Policy::load(&cwd, home.root());
    let ctx = Ctx {
        home,
        config,
        policy,
        json_mode,
    };

    match command {
        Commands::Init { dir } => init(&ctx, &dir),
        Commands::Scan { path } => scan(&ctx, &path),
        Commands::Export { dir, output } => export(&ctx, &dir, output),
        Commands::Sign { archive } => sign(&ctx, &archive),
        Commands::Verify { archive } => verify(&ctx, &archive),
        Commands::Install {
            source,
            force,
            accept_risk,
            yes,
        } => install(&ctx, &source, force, accept_risk, yes),
        Commands::DryRun { source } => dry_run(&ctx, &source),
        Commands::Uninstall { id } => uninstall(&ctx, &id),
        Commands::Publish { archive } => publish(&ctx, &archive),
        Commands::Plan { source } => plan(&ctx, &source),
        Commands::Inspect { archive } => inspect(&archive),
        Commands::Keys { command } => match command {
            KeyCommands::Generate { force } => keys_generate(&ctx, force),
            KeyCommands::Register { label } => keys_register(&ctx, &label),
        },
        Commands::Convert { dir } => convert(&ctx, &dir),
    }
}

// ─── Authoring ───────────────────────────────────────────────────────────────

const SKILL_MD_TEMPLATE: &str = "# My Skill\n\n\
    Describe what this skill does and how the agent should use it.\n";

fn manifest_template(author: &str, slug: &str, key_id: &str) -> serde_json::Value {
    json!({
        "ssp_version": "1.0",
        "id": format!("{author}/{slug}"),
        "name": slug,
        "version": "0.1.0",
        "description": "",
        "author": {
            "name": author,
            "signing_key_id": key_id,
        },
        "os_compat": ["macos", "linux", "windows"],
        "entrypoints": ["SKILL.md"],
        "permissions": {
            "network": {"mode": "none"},
            "filesystem": {"read_paths": [], "write_paths": []},
            "exec": {"allowed_commands": [], "shell": false},
        },
    })
}

/// Directory names become skill slugs: lowercased, everything else mapped
/// to dashes.
fn slug_from_dir(dir: &Path) -> String {
    let raw = dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("skill")
        .to_ascii_lowercase();
    let slug: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();
    if slug.is_empty() { "skill".into() } else { slug }
}

fn local_key_id_or_placeholder(home: &SkillPortHome) -> String {
    home.load_public_key()
        .map(|pem| crypto::key_id_for_public_pem(&pem))
        .unwrap_or_else(|_| "0000000000000000".into())
}

fn init(ctx: &Ctx, dir: &Path) -> Result<CommandOutput> {
    std::fs::create_dir_all(dir)?;
    let mut created = Vec::new();

    let skill_md = dir.join(SKILL_MD_ENTRY);
    if !skill_md.exists() {
        std::fs::write(&skill_md, SKILL_MD_TEMPLATE)?;
        created.push(skill_md.clone());
    }

    let manifest_path = dir.join("skillport.json");
    if !manifest_path.exists() {
        let template = manifest_template(
            "local",
            &slug_from_dir(&dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf())),
            &local_key_id_or_placeholder(&ctx.home),
        );
        std::fs::write(
            &manifest_path,
            serde_json::to_vec_pretty(&template).expect("template serialization cannot fail"),
        )?;
        created.push(manifest_path);
    }

    let names: Vec<String> = created.iter().map(|p| p.display().to_string()).collect();
    Ok(CommandOutput::new(
        json!({"created": names}),
        if names.is_empty() {
            "nothing to do: skill files already present".to_string()
        } else {
            format!("created {}", names.join(", "))
        },
    ))
}

fn convert(ctx: &Ctx, dir: &Path) -> Result<CommandOutput> {
    let skill_md = dir.join(SKILL_MD_ENTRY);
    if !skill_md.exists() {
        return Err(SkillPortError::FileNotFound(skill_md));
    }
    let manifest_path = dir.join("skillport.json");
    if manifest_path.exists() {
        return Err(SkillPortError::InputInvalid(format!(
            "{} already exists",
            manifest_path.display()
        )));
    }

    let template = manifest_template(
        "local",
        &slug_from_dir(&dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf())),
        &local_key_id_or_placeholder(&ctx.home),
    );
    std::fs::write(
        &manifest_path,
        serde_json::to_vec_pretty(&template).expect("template serialization cannot fail"),
    )?;

    Ok(CommandOutput::new(
        json!({"manifest": manifest_path.display().to_string()}),
        format!("wrote {}", manifest_path.display()),
    ))
}

// ─── Scan ────────────────────────────────────────────────────────────────────

fn scan(ctx: &Ctx, path: &Path) -> Result<CommandOutput> {
    let scanner = Scanner::new();
    let report = if path.is_dir() {
        scanner.scan_files(&collect_dir_files(path)?)
    } else if path.is_file() {
        scanner.scan_archive(&std::fs::read(path)?)?
    } else {
        return Err(SkillPortError::FileNotFound(path.to_path_buf()));
    };

    JsonlLog::new(ctx.home.provenance_path()).append(
        "scan",
        json!({
            "target": path.display().to_string(),
            "risk_score": report.risk_score,
            "passed": report.passed,
            "issues": report.summary.total,
        }),
    )?;

    if !report.passed {
        if !ctx.json_mode {
            for issue in &report.issues {
                eprintln!(
                    "{} [{} {}] {}:{} {}",
                    issue.rule_id, issue.category, issue.severity, issue.file, issue.line,
                    issue.snippet
                );
            }
        }
        return Err(SkillPortError::ScanFailed {
            risk_score: report.risk_score,
            high: report.count(crate::scanner::Severity::High),
            critical: report.count(crate::scanner::Severity::Critical),
        });
    }

    let message = format!(
        "scan passed: {} files, {} issues, risk score {}",
        report.scanned_files.len(),
        report.summary.total,
        report.risk_score
    );
    Ok(CommandOutput::new(
        serde_json::to_value(&report).expect("report serialization cannot fail"),
        message,
    ))
}

// ─── Export / sign / verify ──────────────────────────────────────────────────

fn export(ctx: &Ctx, dir: &Path, output: Option<PathBuf>) -> Result<CommandOutput> {
    let manifest_path = dir.join("skillport.json");
    if !manifest_path.exists() {
        return Err(SkillPortError::FileNotFound(manifest_path));
    }
    let raw = RawManifest::parse(&std::fs::read(&manifest_path)?)?;
    let mut manifest = raw.validate().map_err(SkillPortError::ManifestInvalid)?;

    let private_pem = ctx.home.load_private_key()?;
    let public_pem = ctx.home.load_public_key()?;
    let local_key_id = crypto::key_id_for_public_pem(&public_pem);
    if manifest.author.signing_key_id != local_key_id {
        tracing::warn!(
            declared = %manifest.author.signing_key_id,
            local = %local_key_id,
            "manifest names a different signing key; using the local default"
        );
        manifest.author.signing_key_id = local_key_id.clone();
    }

    let files = collect_export_files(dir)?;
    let bytes = create_archive(&manifest, &files, &private_pem)?;

    let out_path = output.unwrap_or_else(|| {
        PathBuf::from(format!("{}-{}.ssp", manifest.skill_slug(), manifest.version))
    });
    std::fs::write(&out_path, &bytes)?;

    JsonlLog::new(ctx.home.provenance_path()).append(
        "export",
        json!({
            "id": manifest.id,
            "version": manifest.version,
            "archive": out_path.display().to_string(),
            "size_bytes": bytes.len(),
            "key_id": local_key_id,
        }),
    )?;

    Ok(CommandOutput::new(
        json!({
            "archive": out_path.display().to_string(),
            "id": manifest.id,
            "version": manifest.version,
            "size_bytes": bytes.len(),
            "key_id": local_key_id,
        }),
        format!(
            "exported {} {} to {}",
            manifest.id,
            manifest.version,
            out_path.display()
        ),
    ))
}

fn sign(ctx: &Ctx, archive: &Path) -> Result<CommandOutput> {
    if !archive.exists() {
        return Err(SkillPortError::FileNotFound(archive.to_path_buf()));
    }
    let extracted = extract_archive(&std::fs::read(archive)?)?;

    let private_pem = ctx.home.load_private_key()?;
    let public_pem = ctx.home.load_public_key()?;
    let local_key_id = crypto::key_id_for_public_pem(&public_pem);
    if extracted.manifest.author.signing_key_id != local_key_id {
        return Err(SkillPortError::InputInvalid(format!(
            "manifest names signing key {}; local default key is {local_key_id}",
            extracted.manifest.author.signing_key_id
        )));
    }

    let signature = crypto::sign(&extracted.manifest_raw, &private_pem)?;
    let bytes = rebuild_archive(&extracted, &signature)?;
    std::fs::write(archive, bytes)?;

    JsonlLog::new(ctx.home.provenance_path()).append(
        "sign",
        json!({
            "id": extracted.manifest.id,
            "archive": archive.display().to_string(),
            "key_id": local_key_id,
        }),
    )?;

    Ok(CommandOutput::new(
        json!({"id": extracted.manifest.id, "key_id": local_key_id}),
        format!("signed {} with key {local_key_id}", archive.display()),
    ))
}

/// Rewrite an archive with a fresh author signature, keeping the stored
/// manifest bytes untouched.
fn rebuild_archive(extracted: &ExtractedArchive, author_sig: &str) -> Result<Vec<u8>> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let mut put = |name: &str, bytes: &[u8]| -> Result<()> {
        writer
            .start_file(name, crate::archive::deflate_options())
            .map_err(|e| SkillPortError::MalformedArchive(format!("zip write: {e}")))?;
        writer.write_all(bytes)?;
        Ok(())
    };

    put(MANIFEST_ENTRY, &extracted.manifest_raw)?;
    put(AUTHOR_SIG_ENTRY, author_sig.as_bytes())?;
    if let Some(platform_sig) = &extracted.platform_signature {
        put(PLATFORM_SIG_ENTRY, platform_sig.as_bytes())?;
    }
    let checksum_bytes = serde_json::to_vec_pretty(&extracted.checksums)
        .expect("checksum map serialization cannot fail");
    put(CHECKSUMS_ENTRY, &checksum_bytes)?;
    if let Some(skill_md) = extracted.files.get(SKILL_MD_ENTRY) {
        put(SKILL_MD_ENTRY, skill_md)?;
    }
    for (name, bytes) in &extracted.files {
        if name.starts_with(PAYLOAD_PREFIX) {
            put(name, bytes)?;
        }
    }

    let cursor = writer
        .finish()
        .map_err(|e| SkillPortError::MalformedArchive(format!("zip finalize: {e}")))?;
    Ok(cursor.into_inner())
}

fn verify(ctx: &Ctx, archive: &Path) -> Result<CommandOutput> {
    if !archive.exists() {
        return Err(SkillPortError::FileNotFound(archive.to_path_buf()));
    }
    let extracted = extract_archive(&std::fs::read(archive)?)?;
    let manifest = &extracted.manifest;

    let (checksums_ok, mismatches) = crypto::verify_checksums(&extracted.files, &manifest.hashes);
    if !checksums_ok {
        return Err(SkillPortError::ChecksumMismatch { paths: mismatches });
    }

    let signature = extracted
        .author_signature
        .as_deref()
        .ok_or(SkillPortError::SignatureMissing)?;

    // Verified against the local key when the manifest names it; otherwise
    // the signature is only known to be present.
    let mut verified_against_local_key = false;
    if let Ok(public_pem) = ctx.home.load_public_key()
        && crypto::key_id_for_public_pem(&public_pem) == manifest.author.signing_key_id
    {
        if !crypto::verify(&extracted.manifest_raw, signature, &public_pem) {
            return Err(SkillPortError::SignatureInvalid(format!(
                "author signature does not match key {}",
                manifest.author.signing_key_id
            )));
        }
        verified_against_local_key = true;
    }

    JsonlLog::new(ctx.home.provenance_path()).append(
        "verify",
        json!({
            "id": manifest.id,
            "version": manifest.version,
            "checksums_valid": true,
            "signature_verified": verified_against_local_key,
        }),
    )?;

    Ok(CommandOutput::new(
        json!({
            "id": manifest.id,
            "version": manifest.version,
            "checksums_valid": true,
            "author_signature": true,
            "platform_signature": extracted.platform_signature.is_some(),
            "signature_verified": verified_against_local_key,
            "skill_md": extracted.skill_md,
        }),
        format!(
            "verified {} {}: checksums ok, author signature {}",
            manifest.id,
            manifest.version,
            if verified_against_local_key {
                "valid"
            } else {
                "present (key not locally trusted)"
            }
        ),
    ))
}

// ─── Install family ──────────────────────────────────────────────────────────

fn install(
    ctx: &Ctx,
    source: &str,
    force: bool,
    accept_risk: bool,
    yes: bool,
) -> Result<CommandOutput> {
    let installer = Installer::new(&ctx.home, &ctx.config, &ctx.policy);
    let outcome = installer.install(
        &InstallSource::parse(source),
        InstallOptions {
            force,
            non_interactive: yes || ctx.json_mode,
            accept_risk,
            dry_run: false,
        },
    )?;

    if !outcome.already_installed {
        write_trace(&ctx.home, &outcome)?;
    }

    let message = if outcome.already_installed {
        format!("{} {} is already installed", outcome.id, outcome.version)
    } else {
        format!(
            "installed {} {} (risk score {})",
            outcome.id, outcome.version, outcome.risk_score
        )
    };
    Ok(CommandOutput::new(
        serde_json::to_value(&outcome).expect("outcome serialization cannot fail"),
        message,
    ))
}

fn dry_run(ctx: &Ctx, source: &str) -> Result<CommandOutput> {
    let installer = Installer::new(&ctx.home, &ctx.config, &ctx.policy);
    let outcome = installer.install(
        &InstallSource::parse(source),
        InstallOptions {
            force: false,
            non_interactive: true,
            // A dry run only reports; elevated risk shows up in the outcome.
            accept_risk: true,
            dry_run: true,
        },
    )?;
    let message = format!(
        "dry run: {} {} would install with risk score {} ({} permissions)",
        outcome.id, outcome.version, outcome.risk_score, outcome.permission_risk
    );
    Ok(CommandOutput::new(
        serde_json::to_value(&outcome).expect("outcome serialization cannot fail"),
        message,
    ))
}

fn uninstall(ctx: &Ctx, id: &str) -> Result<CommandOutput> {
    let installer = Installer::new(&ctx.home, &ctx.config, &ctx.policy);
    let removed = installer.uninstall(id)?;
    Ok(CommandOutput::new(
        json!({"id": id, "removed_path": removed.display().to_string()}),
        format!("uninstalled {id}"),
    ))
}

fn plan(ctx: &Ctx, source: &str) -> Result<CommandOutput> {
    let bytes = match InstallSource::parse(source) {
        InstallSource::LocalFile(path) => std::fs::read(path)?,
        InstallSource::Marketplace(id) => {
            let client = MarketplaceClient::new(&ctx.config, &ctx.policy)?;
            let url = client.request_download_url(&id)?;
            client.download(&url)?
        }
    };
    let extracted = extract_archive(&bytes)?;
    let manifest = &extracted.manifest;

    let report = Scanner::new().scan_files(&extracted.files);
    let assessment = assess_permissions(&manifest.permissions);
    let env_report = check_environment(manifest);
    let decision = ctx.policy.check(
        "install",
        &ActionContext {
            non_interactive: true,
            risk_score: Some(report.risk_score),
            has_platform_sig: extracted.platform_signature.is_some(),
            session_install_count: crate::session::install_count(),
        },
    );

    let registry = Registry::load(&ctx.home.registry_path())?;
    let already = registry.find(&manifest.id).map(|r| r.version.clone());

    let message = format!(
        "plan for {} {}: scan {} (risk {}), permissions {}, environment {}, auto-install {}",
        manifest.id,
        manifest.version,
        if report.passed { "passes" } else { "fails" },
        report.risk_score,
        assessment.overall,
        if env_report.ready { "ready" } else { "not ready" },
        if decision.allowed { "allowed" } else { "blocked" },
    );

    Ok(CommandOutput::new(
        json!({
            "id": manifest.id,
            "version": manifest.version,
            "already_installed_version": already,
            "scan": serde_json::to_value(&report).expect("report serialization cannot fail"),
            "permissions": serde_json::to_value(assessment).expect("assessment serialization cannot fail"),
            "environment": serde_json::to_value(&env_report).expect("env serialization cannot fail"),
            "policy": serde_json::to_value(&decision).expect("decision serialization cannot fail"),
        }),
        message,
    ))
}

fn inspect(archive: &Path) -> Result<CommandOutput> {
    if !archive.exists() {
        return Err(SkillPortError::FileNotFound(archive.to_path_buf()));
    }
    let extracted = extract_archive(&std::fs::read(archive)?)?;
    let manifest = &extracted.manifest;

    let files: Vec<serde_json::Value> = extracted
        .files
        .iter()
        .map(|(name, bytes)| json!({"path": name, "size_bytes": bytes.len()}))
        .collect();

    Ok(CommandOutput::new(
        json!({
            "manifest": serde_json::to_value(manifest).expect("manifest serialization cannot fail"),
            "files": files,
            "author_signature": extracted.author_signature.is_some(),
            "platform_signature": extracted.platform_signature.is_some(),
            "skill_md": extracted.skill_md.is_some(),
        }),
        format!(
            "{} {} by {} ({} files)",
            manifest.id,
            manifest.version,
            manifest.author.name,
            extracted.files.len()
        ),
    ))
}

// ─── Publish / keys ──────────────────────────────────────────────────────────

fn publish(ctx: &Ctx, archive: &Path) -> Result<CommandOutput> {
    if !archive.exists() {
        return Err(SkillPortError::FileNotFound(archive.to_path_buf()));
    }
    let bytes = std::fs::read(archive)?;
    let extracted = extract_archive(&bytes)?;
    if extracted.author_signature.is_none() {
        return Err(SkillPortError::SignatureMissing);
    }

    let report = Scanner::new().scan_archive(&bytes)?;
    if !report.passed {
        return Err(SkillPortError::ScanFailed {
            risk_score: report.risk_score,
            high: report.count(crate::scanner::Severity::High),
            critical: report.count(crate::scanner::Severity::Critical),
        });
    }

    let decision = ctx.policy.check(
        "publish",
        &ActionContext {
            non_interactive: ctx.json_mode,
            ..ActionContext::default()
        },
    );
    if !decision.allowed {
        return Err(SkillPortError::PolicyRejected {
            reason: decision.reason,
            hints: decision.hints,
        });
    }

    let client = MarketplaceClient::new(&ctx.config, &ctx.policy)?;
    let receipt = client.upload(bytes)?;

    JsonlLog::new(ctx.home.provenance_path()).append(
        "publish",
        json!({
            "id": receipt.id,
            "version": receipt.version,
            "risk_score": report.risk_score,
        }),
    )?;

    Ok(CommandOutput::new(
        json!({"id": receipt.id, "version": receipt.version}),
        format!("published {} {}", receipt.id, receipt.version),
    ))
}

fn keys_generate(ctx: &Ctx, force: bool) -> Result<CommandOutput> {
    if ctx.home.private_key_path().exists() && !force {
        return Err(SkillPortError::InputInvalid(
            "a default keypair already exists; pass --force to replace it".into(),
        ));
    }
    let keypair = crypto::generate_keypair()?;
    ctx.home.save_keypair(&keypair)?;

    let mut config = ctx.config.clone();
    config.default_key_id = Some(keypair.key_id.clone());
    config.save(&ctx.home)?;

    JsonlLog::new(ctx.home.provenance_path())
        .append("keys-generate", json!({"key_id": keypair.key_id}))?;

    Ok(CommandOutput::new(
        json!({
            "key_id": keypair.key_id,
            "public_key_path": ctx.home.public_key_path().display().to_string(),
        }),
        format!("generated keypair {}", keypair.key_id),
    ))
}

fn keys_register(ctx: &Ctx, label: &str) -> Result<CommandOutput> {
    let public_pem = ctx.home.load_public_key()?;
    let client = MarketplaceClient::new(&ctx.config, &ctx.policy)?;
    let registered = client.register_key(&public_pem, label)?;

    JsonlLog::new(ctx.home.provenance_path()).append(
        "keys-register",
        json!({"key_id": registered.key_id, "label": label}),
    )?;

    Ok(CommandOutput::new(
        json!({"key_id": registered.key_id, "label": label}),
        format!("registered key {} as '{label}'", registered.key_id),
    ))
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Walk a directory into a logical file map with forward-slash relative
/// paths. Hidden directories are skipped.
fn collect_dir_files(root: &Path) -> Result<BTreeMap<String, Vec<u8>>> {
    let mut files = BTreeMap::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in std::fs::read_dir(&current)? {
            let entry = entry?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            let relative = path
                .strip_prefix(root)
                .map_err(|_| SkillPortError::InputInvalid("path escapes scan root".into()))?
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            files.insert(relative, std::fs::read(&path)?);
        }
    }
    Ok(files)
}

/// The export file set: everything except the manifest source and any
/// previously exported archives.
fn collect_export_files(dir: &Path) -> Result<BTreeMap<String, Vec<u8>>> {
    let mut files = collect_dir_files(dir)?;
    files.retain(|path, _| path != "skillport.json" && !path.ends_with(".ssp"));
    Ok(files)
}

/// Optional per-execution trace under `traces/`.
fn write_trace(home: &SkillPortHome, outcome: &crate::install::InstallOutcome) -> Result<()> {
    let ts = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");
    let slug = outcome.id.replace('/', "_");
    let path = home
        .traces_dir()
        .join(format!("{ts}_{slug}_{}.json", outcome.version));
    std::fs::write(
        path,
        serde_json::to_vec_pretty(outcome).expect("outcome serialization cannot fail"),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_from_dir_sanitizes() {
        assert_eq!(slug_from_dir(Path::new("/tmp/My Skill!")), "my-skill-");
        assert_eq!(slug_from_dir(Path::new("/tmp/log_parser")), "log_parser");
        assert_eq!(slug_from_dir(Path::new("demo-skill")), "demo-skill");
    }

    #[test]
    fn manifest_template_validates() {
        let value = manifest_template("local", "demo", "0123456789abcdef");
        let raw = RawManifest::parse(&serde_json::to_vec(&value).unwrap()).unwrap();
        let manifest = raw.validate().unwrap();
        assert_eq!(manifest.id, "local/demo");
        assert_eq!(manifest.entrypoints, vec!["SKILL.md".to_string()]);
    }

    #[test]
    fn collect_dir_files_uses_forward_slashes_and_skips_hidden() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("scripts")).unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join("SKILL.md"), "# Demo").unwrap();
        std::fs::write(dir.path().join("scripts/run.sh"), "echo hi").unwrap();
        std::fs::write(dir.path().join(".git/config"), "x").unwrap();
        std::fs::write(dir.path().join(".hidden"), "x").unwrap();

        let files = collect_dir_files(dir.path()).unwrap();
        let names: Vec<&String> = files.keys().collect();
        assert_eq!(names, vec!["SKILL.md", "scripts/run.sh"]);
    }

    #[test]
    fn export_files_exclude_manifest_source_and_archives() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("SKILL.md"), "# Demo").unwrap();
        std::fs::write(dir.path().join("skillport.json"), "{}").unwrap();
        std::fs::write(dir.path().join("demo-0.1.0.ssp"), "zip").unwrap();

        let files = collect_export_files(dir.path()).unwrap();
        let names: Vec<&String> = files.keys().collect();
        assert_eq!(names, vec!["SKILL.md"]);
    }
}
