//! The outermost output boundary: JSON envelope and exit codes.
//!
//! In JSON mode stdout carries exactly one envelope; human-readable progress
//! goes to stderr and only when JSON mode is off. The core never prints —
//! everything funnels through here.

use serde_json::{Value, json};

use crate::error::SkillPortError;

pub const SCHEMA_VERSION: u32 = 1;

/// What a command handler produced: structured data for the envelope plus a
/// human-readable summary line.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub data: Value,
    pub message: String,
}

impl CommandOutput {
    pub fn new(data: Value, message: impl Into<String>) -> Self {
        Self {
            data,
            message: message.into(),
        }
    }
}

pub fn success_envelope(data: &Value) -> Value {
    json!({
        "schema_version": SCHEMA_VERSION,
        "ok": true,
        "data": data,
    })
}

pub fn error_envelope(err: &SkillPortError) -> Value {
    json!({
        "schema_version": SCHEMA_VERSION,
        "ok": false,
        "error": {
            "code": err.code(),
            "message": err.to_string(),
            "retryable": err.retryable(),
            "hints": err.hints(),
        },
    })
}

/// Print the outcome and return the process exit code.
pub fn emit(result: &Result<CommandOutput, SkillPortError>, json_mode: bool) -> i32 {
    match result {
        Ok(output) => {
            if json_mode {
                println!("{}", success_envelope(&output.data));
            } else {
                println!("{}", output.message);
            }
            0
        }
        Err(err) => {
            if json_mode {
                println!("{}", error_envelope(err));
            } else {
                eprintln!("error: {err}");
                for hint in err.hints() {
                    eprintln!("  hint: {hint}");
                }
            }
            err.exit_code()
        }
    }
}
