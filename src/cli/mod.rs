//! CLI boundary: argument surface and command handlers.

mod commands;
mod handlers;

pub use commands::{Cli, Commands, KeyCommands};
pub use handlers::run;
