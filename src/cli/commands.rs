use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// `SkillPort` — secure distribution pipeline for agent skills.
#[derive(Parser, Debug)]
#[command(name = "skillport")]
#[command(version)]
#[command(about = "Package, scan, verify and install signed agent skills", long_about = None)]
pub struct Cli {
    /// Emit a single machine-readable JSON envelope on stdout
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scaffold a new skill directory (SKILL.md + skillport.json)
    Init {
        /// Target directory
        #[arg(default_value = ".")]
        dir: PathBuf,
    },

    /// Scan a skill directory or .ssp archive for security issues
    Scan {
        /// Directory or archive to scan
        path: PathBuf,
    },

    /// Build and sign a .ssp archive from a skill directory
    Export {
        /// Skill directory containing skillport.json
        dir: PathBuf,

        /// Output archive path (defaults to <skill>-<version>.ssp)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Re-sign an existing archive with the local default key
    Sign {
        /// Archive to sign
        archive: PathBuf,
    },

    /// Verify an archive's checksums and author signature
    Verify {
        /// Archive to verify
        archive: PathBuf,
    },

    /// Install a skill from a local archive or the marketplace
    Install {
        /// Archive path or marketplace SSP id (author/skill)
        source: String,

        /// Reinstall even when the same id and version is present
        #[arg(long)]
        force: bool,

        /// Accept elevated risk (shell exec, critical danger flags)
        #[arg(long)]
        accept_risk: bool,

        /// Run non-interactively, never prompting
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Run the install pipeline without writing anything
    DryRun {
        /// Archive path or marketplace SSP id
        source: String,
    },

    /// Remove an installed skill
    Uninstall {
        /// Skill id (author/skill)
        id: String,
    },

    /// Scan, verify and upload an archive to the marketplace
    Publish {
        /// Archive to publish
        archive: PathBuf,
    },

    /// Report what installing a skill would do (scan, permissions, environment)
    Plan {
        /// Archive path or marketplace SSP id
        source: String,
    },

    /// Show an archive's manifest and contents
    Inspect {
        /// Archive to inspect
        archive: PathBuf,
    },

    /// Manage signing keys
    Keys {
        #[command(subcommand)]
        command: KeyCommands,
    },

    /// Generate a skillport.json for a plain SKILL.md directory
    Convert {
        /// Directory containing SKILL.md
        dir: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum KeyCommands {
    /// Generate a new default Ed25519 keypair
    Generate {
        /// Overwrite an existing keypair
        #[arg(long)]
        force: bool,
    },

    /// Register the default public key with the marketplace
    Register {
        /// Human label for the key
        #[arg(long, default_value = "default")]
        label: String,
    },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn dry_run_uses_kebab_case() {
        let cli = Cli::try_parse_from(["skillport", "dry-run", "alice/demo"]).unwrap();
        assert!(matches!(cli.command, Commands::DryRun { .. }));
    }

    #[test]
    fn json_flag_is_global() {
        let cli = Cli::try_parse_from(["skillport", "scan", "dir", "--json"]).unwrap();
        assert!(cli.json);
    }

    #[test]
    fn keys_generate_parses() {
        let cli = Cli::try_parse_from(["skillport", "keys", "generate"]).unwrap();
        match cli.command {
            Commands::Keys {
                command: KeyCommands::Generate { force },
            } => assert!(!force),
            other => panic!("unexpected {other:?}"),
        }
    }
}
