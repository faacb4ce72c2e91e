//! CLI commands for Dojo.
//!
//! Each command follows the same shape: an `Options` struct with the output
//! flags, an `Output` struct that serializes to JSON, and a command type
//! whose `run` never fails (errors are carried in the output).

pub mod config_cmd;
pub mod lessons;
pub mod play;
pub mod show;

pub use config_cmd::ConfigCommand;
pub use lessons::LessonsCommand;
pub use play::PlayCommand;
pub use show::ShowCommand;

/// Output flags shared by every command.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Render an output according to the shared flags.
pub(crate) fn render<T, F>(output: &T, options: OutputOptions, text: F) -> String
where
    T: serde::Serialize,
    F: FnOnce(&T) -> String,
{
    if options.quiet {
        return String::new();
    }

    if options.json {
        serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
    } else {
        text(output)
    }
}
