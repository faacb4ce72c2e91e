//! Configuration loading for Dojo.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Project config (`.dojo/config.toml`)
//! 3. User config (`~/.dojo/config.toml`)
//! 4. Defaults (lowest priority)
//!
//! All configuration is optional. A lesson runs with the defaults below
//! when no config exists.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{DojoError, FailOpen, Result};

/// Main configuration struct for Dojo.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Reward and penalty rules.
    pub game: GameConfig,
    /// Celebration gate timing.
    pub celebration: CelebrationConfig,
    /// Progressive feedback reveal.
    pub streaming: StreamingConfig,
    /// Where lessons and feedback templates come from.
    pub catalog: CatalogConfig,
}

/// Reward and penalty rules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    /// Lives at lesson start; also the upper bound.
    pub starting_lives: u32,
    /// XP granted for each successful activity.
    pub xp_per_activity: u32,
}

/// Minimum number of starting lives.
pub const MIN_STARTING_LIVES: u32 = 1;

impl GameConfig {
    /// Check if a starting lives value is valid.
    pub fn is_valid_starting_lives(value: u32) -> bool {
        value >= MIN_STARTING_LIVES
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            starting_lives: 3,
            xp_per_activity: 25,
        }
    }
}

/// Celebration gate timing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CelebrationConfig {
    /// Milliseconds after which a celebration continues on its own.
    /// Zero means the learner must continue explicitly.
    pub auto_continue_ms: u64,
}

/// Progressive reveal of feedback text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamingConfig {
    /// Characters revealed per tick.
    pub chars_per_tick: usize,
    /// Suggested delay between ticks, in milliseconds.
    pub tick_ms: u64,
}

impl StreamingConfig {
    /// Check if a chars-per-tick value is valid.
    pub fn is_valid_chars_per_tick(value: usize) -> bool {
        value >= 1
    }
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            chars_per_tick: 3,
            tick_ms: 20,
        }
    }
}

/// Lesson and template sources. Unset paths use the built-in content.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CatalogConfig {
    /// Directory of `lesson_*.toml` files.
    pub lessons_dir: Option<PathBuf>,
    /// Feedback template overrides.
    pub templates_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration with full precedence chain.
    pub fn load() -> Self {
        match env::current_dir() {
            Ok(cwd) => Self::load_from_cwd(&cwd),
            Err(_) => {
                let mut config = Config::default();
                if let Some(user_config) = Self::load_user_config() {
                    config = config.merge(user_config);
                }
                config.apply_env_overrides();
                config
            }
        }
    }

    /// Load configuration with a specific working directory.
    pub fn load_from_cwd(cwd: &Path) -> Self {
        let mut config = Config::default();

        if let Some(user_config) = Self::load_user_config() {
            config = config.merge(user_config);
        }

        if let Some(project_config) = Self::load_project_config(cwd) {
            config = config.merge(project_config);
        }

        config.apply_env_overrides();

        config
    }

    /// Load user config from `~/.dojo/config.toml`.
    fn load_user_config() -> Option<Config> {
        let path = dojo_home()?.join("config.toml");
        if !path.exists() {
            return None;
        }
        Some(Self::load_from_file(&path).fail_open_default("loading user config"))
    }

    /// Load project config from `.dojo/config.toml` in the given directory.
    fn load_project_config(cwd: &Path) -> Option<Config> {
        let path = project_dojo_dir(cwd).join("config.toml");
        if !path.exists() {
            return None;
        }
        Some(Self::load_from_file(&path).fail_open_default("loading project config"))
    }

    /// Load config from a specific file path.
    ///
    /// Out-of-range values are replaced by their defaults with a warning.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| DojoError::storage(path, e))?;
        let mut config: Config =
            toml::from_str(&content).map_err(|e| DojoError::config(e.to_string()))?;
        config.sanitize(path);
        Ok(config)
    }

    /// Reset values that fail validation to their defaults.
    fn sanitize(&mut self, origin: &Path) {
        if !GameConfig::is_valid_starting_lives(self.game.starting_lives) {
            let fallback = GameConfig::default().starting_lives;
            tracing::warn!(
                "Invalid starting_lives {} in {}. Must be >= {}. Using '{}'.",
                self.game.starting_lives,
                origin.display(),
                MIN_STARTING_LIVES,
                fallback
            );
            self.game.starting_lives = fallback;
        }

        if !StreamingConfig::is_valid_chars_per_tick(self.streaming.chars_per_tick) {
            let fallback = StreamingConfig::default().chars_per_tick;
            tracing::warn!(
                "Invalid chars_per_tick {} in {}. Must be >= 1. Using '{}'.",
                self.streaming.chars_per_tick,
                origin.display(),
                fallback
            );
            self.streaming.chars_per_tick = fallback;
        }
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        // DOJO_STARTING_LIVES
        if let Ok(val) = env::var("DOJO_STARTING_LIVES") {
            match val.parse::<u32>() {
                Ok(n) if GameConfig::is_valid_starting_lives(n) => self.game.starting_lives = n,
                _ => tracing::warn!(
                    "Invalid DOJO_STARTING_LIVES value '{}'. Must be >= {}. Using '{}'.",
                    val,
                    MIN_STARTING_LIVES,
                    self.game.starting_lives
                ),
            }
        }

        // DOJO_XP_PER_ACTIVITY
        if let Ok(val) = env::var("DOJO_XP_PER_ACTIVITY") {
            match val.parse::<u32>() {
                Ok(n) => self.game.xp_per_activity = n,
                Err(_) => tracing::warn!(
                    "Invalid DOJO_XP_PER_ACTIVITY value '{}'. Expected a non-negative integer. Using '{}'.",
                    val,
                    self.game.xp_per_activity
                ),
            }
        }

        // DOJO_AUTO_CONTINUE_MS
        if let Ok(val) = env::var("DOJO_AUTO_CONTINUE_MS") {
            match val.parse::<u64>() {
                Ok(n) => self.celebration.auto_continue_ms = n,
                Err(_) => tracing::warn!(
                    "Invalid DOJO_AUTO_CONTINUE_MS value '{}'. Expected milliseconds. Using '{}'.",
                    val,
                    self.celebration.auto_continue_ms
                ),
            }
        }

        // DOJO_CHARS_PER_TICK
        if let Ok(val) = env::var("DOJO_CHARS_PER_TICK") {
            match val.parse::<usize>() {
                Ok(n) if StreamingConfig::is_valid_chars_per_tick(n) => {
                    self.streaming.chars_per_tick = n
                }
                _ => tracing::warn!(
                    "Invalid DOJO_CHARS_PER_TICK value '{}'. Must be >= 1. Using '{}'.",
                    val,
                    self.streaming.chars_per_tick
                ),
            }
        }

        // DOJO_LESSONS_DIR
        if let Ok(val) = env::var("DOJO_LESSONS_DIR") {
            if !val.is_empty() {
                self.catalog.lessons_dir = Some(PathBuf::from(val));
            }
        }

        // DOJO_TEMPLATES_PATH
        if let Ok(val) = env::var("DOJO_TEMPLATES_PATH") {
            if !val.is_empty() {
                self.catalog.templates_path = Some(PathBuf::from(val));
            }
        }
    }

    /// Merge another config into this one, field by field.
    ///
    /// Values in `other` that differ from the defaults win. A layer that sets
    /// a field back to its default cannot override a lower layer's custom value.
    fn merge(mut self, other: Config) -> Self {
        let default_game = GameConfig::default();
        if other.game.starting_lives != default_game.starting_lives {
            self.game.starting_lives = other.game.starting_lives;
        }
        if other.game.xp_per_activity != default_game.xp_per_activity {
            self.game.xp_per_activity = other.game.xp_per_activity;
        }

        if other.celebration.auto_continue_ms != CelebrationConfig::default().auto_continue_ms {
            self.celebration.auto_continue_ms = other.celebration.auto_continue_ms;
        }

        let default_streaming = StreamingConfig::default();
        if other.streaming.chars_per_tick != default_streaming.chars_per_tick {
            self.streaming.chars_per_tick = other.streaming.chars_per_tick;
        }
        if other.streaming.tick_ms != default_streaming.tick_ms {
            self.streaming.tick_ms = other.streaming.tick_ms;
        }

        if other.catalog.lessons_dir.is_some() {
            self.catalog.lessons_dir = other.catalog.lessons_dir;
        }
        if other.catalog.templates_path.is_some() {
            self.catalog.templates_path = other.catalog.templates_path;
        }

        self
    }

    /// Save configuration to the project config file.
    ///
    /// Writes `.dojo/config.toml` via a temp file and rename.
    pub fn save_project(&self, cwd: &Path) -> Result<()> {
        let dojo_dir = project_dojo_dir(cwd);

        if !dojo_dir.exists() {
            fs::create_dir_all(&dojo_dir).map_err(|e| DojoError::storage(&dojo_dir, e))?;
        }

        let config_path = dojo_dir.join("config.toml");
        let content =
            toml::to_string_pretty(self).map_err(|e| DojoError::config(e.to_string()))?;

        let temp_path = dojo_dir.join(".config.toml.tmp");
        fs::write(&temp_path, &content).map_err(|e| DojoError::storage(&temp_path, e))?;
        fs::rename(&temp_path, &config_path).map_err(|e| DojoError::storage(&config_path, e))?;

        Ok(())
    }
}

/// Get the Dojo home directory.
///
/// Uses `DOJO_HOME` when set and non-empty, otherwise `~/.dojo`.
pub fn dojo_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("DOJO_HOME") {
        if home.is_empty() {
            tracing::warn!("DOJO_HOME is empty, using default");
        } else {
            return Some(PathBuf::from(home));
        }
    }

    dirs::home_dir().map(|home| home.join(".dojo"))
}

/// Get the project Dojo directory for a working directory.
pub fn project_dojo_dir(cwd: &Path) -> PathBuf {
    cwd.join(".dojo")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.game.starting_lives, 3);
        assert_eq!(config.game.xp_per_activity, 25);
        assert_eq!(config.celebration.auto_continue_ms, 0);
        assert_eq!(config.streaming.chars_per_tick, 3);
        assert_eq!(config.streaming.tick_ms, 20);
        assert!(config.catalog.lessons_dir.is_none());
        assert!(config.catalog.templates_path.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(
            &config_path,
            r#"
[game]
starting_lives = 5

[streaming]
chars_per_tick = 8
"#,
        )
        .unwrap();

        let config = Config::load_from_file(&config_path).unwrap();

        assert_eq!(config.game.starting_lives, 5);
        assert_eq!(config.streaming.chars_per_tick, 8);
        assert_eq!(config.game.xp_per_activity, 25);
        assert_eq!(config.streaming.tick_ms, 20);
    }

    #[test]
    fn test_load_from_file_missing() {
        let result = Config::load_from_file(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(DojoError::Storage { .. })));
    }

    #[test]
    fn test_load_from_file_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "this is not valid toml [[[").unwrap();

        let result = Config::load_from_file(&config_path);
        assert!(matches!(result, Err(DojoError::Config { .. })));
    }

    #[test]
    fn test_load_from_file_resets_invalid_values() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(
            &config_path,
            "[game]\nstarting_lives = 0\nxp_per_activity = 30\n\n[streaming]\nchars_per_tick = 0\n",
        )
        .unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config.game.starting_lives, 3);
        assert_eq!(config.streaming.chars_per_tick, 3);
        assert_eq!(config.game.xp_per_activity, 30);

        let merged = Config::default().merge(config);
        assert_eq!(merged.game.starting_lives, 3);
    }

    #[test]
    #[serial]
    fn test_zero_lives_in_project_keeps_user_value() {
        let home = TempDir::new().unwrap();
        fs::write(home.path().join("config.toml"), "[game]\nstarting_lives = 4\n").unwrap();
        env::set_var("DOJO_HOME", home.path());

        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".dojo")).unwrap();
        fs::write(
            dir.path().join(".dojo").join("config.toml"),
            "[game]\nstarting_lives = 0\n",
        )
        .unwrap();

        let config = Config::load_from_cwd(dir.path());
        assert_eq!(config.game.starting_lives, 4);

        env::remove_var("DOJO_HOME");
    }

    #[test]
    #[serial]
    fn test_project_config_precedence() {
        let home = TempDir::new().unwrap();
        env::set_var("DOJO_HOME", home.path());

        let dir = TempDir::new().unwrap();
        let dojo_dir = dir.path().join(".dojo");
        fs::create_dir_all(&dojo_dir).unwrap();
        fs::write(
            dojo_dir.join("config.toml"),
            "[game]\nxp_per_activity = 40\n",
        )
        .unwrap();

        let config = Config::load_from_cwd(dir.path());

        assert_eq!(config.game.xp_per_activity, 40);
        assert_eq!(config.game.starting_lives, 3);

        env::remove_var("DOJO_HOME");
    }

    #[test]
    #[serial]
    fn test_user_config_is_overridden_by_project() {
        let home = TempDir::new().unwrap();
        fs::write(
            home.path().join("config.toml"),
            "[game]\nxp_per_activity = 10\nstarting_lives = 4\n",
        )
        .unwrap();
        env::set_var("DOJO_HOME", home.path());

        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".dojo")).unwrap();
        fs::write(
            dir.path().join(".dojo").join("config.toml"),
            "[game]\nxp_per_activity = 50\n",
        )
        .unwrap();

        let config = Config::load_from_cwd(dir.path());
        assert_eq!(config.game.xp_per_activity, 50);
        assert_eq!(config.game.starting_lives, 4);

        env::remove_var("DOJO_HOME");
    }

    #[test]
    #[serial]
    fn test_env_var_precedence() {
        let home = TempDir::new().unwrap();
        env::set_var("DOJO_HOME", home.path());

        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".dojo")).unwrap();
        fs::write(
            dir.path().join(".dojo").join("config.toml"),
            "[game]\nstarting_lives = 7\n",
        )
        .unwrap();

        env::set_var("DOJO_STARTING_LIVES", "9");

        let config = Config::load_from_cwd(dir.path());
        assert_eq!(config.game.starting_lives, 9);

        env::remove_var("DOJO_STARTING_LIVES");
        env::remove_var("DOJO_HOME");
    }

    #[test]
    #[serial]
    fn test_env_var_overrides() {
        env::set_var("DOJO_STARTING_LIVES", "4");
        env::set_var("DOJO_XP_PER_ACTIVITY", "30");
        env::set_var("DOJO_AUTO_CONTINUE_MS", "1500");
        env::set_var("DOJO_CHARS_PER_TICK", "6");
        env::set_var("DOJO_LESSONS_DIR", "/srv/lessons");
        env::set_var("DOJO_TEMPLATES_PATH", "/srv/feedback.toml");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config.game.starting_lives, 4);
        assert_eq!(config.game.xp_per_activity, 30);
        assert_eq!(config.celebration.auto_continue_ms, 1500);
        assert_eq!(config.streaming.chars_per_tick, 6);
        assert_eq!(
            config.catalog.lessons_dir,
            Some(PathBuf::from("/srv/lessons"))
        );
        assert_eq!(
            config.catalog.templates_path,
            Some(PathBuf::from("/srv/feedback.toml"))
        );

        env::remove_var("DOJO_STARTING_LIVES");
        env::remove_var("DOJO_XP_PER_ACTIVITY");
        env::remove_var("DOJO_AUTO_CONTINUE_MS");
        env::remove_var("DOJO_CHARS_PER_TICK");
        env::remove_var("DOJO_LESSONS_DIR");
        env::remove_var("DOJO_TEMPLATES_PATH");
    }

    #[test]
    #[serial]
    fn test_invalid_env_values_keep_previous() {
        env::set_var("DOJO_STARTING_LIVES", "0");
        env::set_var("DOJO_XP_PER_ACTIVITY", "lots");
        env::set_var("DOJO_CHARS_PER_TICK", "0");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config.game.starting_lives, 3);
        assert_eq!(config.game.xp_per_activity, 25);
        assert_eq!(config.streaming.chars_per_tick, 3);

        env::remove_var("DOJO_STARTING_LIVES");
        env::remove_var("DOJO_XP_PER_ACTIVITY");
        env::remove_var("DOJO_CHARS_PER_TICK");
    }

    #[test]
    fn test_merge_configs() {
        let base = Config::default();
        let mut other = Config::default();
        other.game.xp_per_activity = 100;
        other.catalog.lessons_dir = Some(PathBuf::from("lessons"));

        let merged = base.merge(other);
        assert_eq!(merged.game.xp_per_activity, 100);
        assert_eq!(merged.game.starting_lives, 3);
        assert_eq!(merged.catalog.lessons_dir, Some(PathBuf::from("lessons")));
    }

    #[test]
    fn test_merge_default_value_does_not_override() {
        let mut base = Config::default();
        base.game.starting_lives = 6;

        let merged = base.merge(Config::default());
        assert_eq!(merged.game.starting_lives, 6);
    }

    #[test]
    #[serial]
    fn test_dojo_home_with_env() {
        env::set_var("DOJO_HOME", "/custom/dojo");
        assert_eq!(dojo_home(), Some(PathBuf::from("/custom/dojo")));
        env::remove_var("DOJO_HOME");
    }

    #[test]
    #[serial]
    fn test_dojo_home_empty_env_falls_back() {
        env::set_var("DOJO_HOME", "");
        let home = dojo_home();
        if let Some(path) = home {
            assert!(path.ends_with(".dojo"));
        }
        env::remove_var("DOJO_HOME");
    }

    #[test]
    fn test_save_project_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.game.xp_per_activity = 15;
        config.celebration.auto_continue_ms = 800;

        config.save_project(dir.path()).unwrap();

        let loaded =
            Config::load_from_file(&dir.path().join(".dojo").join("config.toml")).unwrap();
        assert_eq!(loaded, config);
        assert!(!dir.path().join(".dojo").join(".config.toml.tmp").exists());
    }
}
