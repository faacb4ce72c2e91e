//! Config command for Dojo.
//!
//! Prints the effective configuration after all layers are merged, and
//! optionally pins it into the project config file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cli::{render, OutputOptions};
use crate::config::{dojo_home, project_dojo_dir, Config};

/// Output format for the config command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigOutput {
    pub success: bool,
    pub config: Config,
    /// Resolved user-level config directory, if a home directory exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dojo_home: Option<String>,
    /// Project config file written by `--save`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The config command implementation.
pub struct ConfigCommand {
    config: Config,
}

impl ConfigCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Report the configuration, saving it under `save_in` when given.
    pub fn run(&self, save_in: Option<&Path>) -> ConfigOutput {
        let mut output = ConfigOutput {
            success: true,
            config: self.config.clone(),
            dojo_home: dojo_home().map(|p| p.display().to_string()),
            saved_to: None,
            error: None,
        };

        if let Some(cwd) = save_in {
            match self.config.save_project(cwd) {
                Ok(()) => {
                    let path = project_dojo_dir(cwd).join("config.toml");
                    output.saved_to = Some(path.display().to_string());
                }
                Err(e) => {
                    output.success = false;
                    output.error = Some(e.to_string());
                }
            }
        }

        output
    }

    pub fn format_output(&self, output: &ConfigOutput, options: OutputOptions) -> String {
        render(output, options, format_text)
    }
}

fn format_text(output: &ConfigOutput) -> String {
    if let Some(error) = &output.error {
        return format!("Saving config failed: {}\n", error);
    }

    let body = toml::to_string_pretty(&output.config)
        .unwrap_or_else(|e| format!("# could not render config: {}\n", e));
    let mut text = String::new();
    if let Some(home) = &output.dojo_home {
        text.push_str(&format!("# user config: {}/config.toml\n", home));
    }
    if let Some(saved) = &output.saved_to {
        text.push_str(&format!("# saved to: {}\n", saved));
    }
    text.push_str(&body);
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_text_is_toml() {
        let cmd = ConfigCommand::new(Config::default());
        let text = cmd.format_output(&cmd.run(None), OutputOptions::default());
        assert!(text.contains("[game]"));
        assert!(text.contains("starting_lives = 3"));

        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_config_json() {
        let mut config = Config::default();
        config.game.xp_per_activity = 40;
        let cmd = ConfigCommand::new(config);
        let json = cmd.format_output(
            &cmd.run(None),
            OutputOptions {
                json: true,
                quiet: false,
            },
        );
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["config"]["game"]["xp_per_activity"], 40);
    }

    #[test]
    fn test_config_save() {
        let temp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.game.starting_lives = 5;

        let output = ConfigCommand::new(config).run(Some(temp.path()));
        assert!(output.success);
        assert!(output.saved_to.unwrap().ends_with("config.toml"));

        let saved =
            Config::load_from_file(&temp.path().join(".dojo").join("config.toml")).unwrap();
        assert_eq!(saved.game.starting_lives, 5);
    }
}
