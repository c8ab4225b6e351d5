//! Configuration loading for wordcall.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Project config (`.wordcall/config.toml`)
//! 3. User config (`~/.wordcall/config.toml`)
//! 4. Defaults (lowest priority)
//!
//! All configuration is optional. The game runs with the built-in word pools
//! and default round settings when no config exists.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{GameError, Result};
use crate::util::read_to_string_limited;

/// Default recognizer locale.
pub const DEFAULT_LOCALE: &str = "en-US";
/// Default number of words in a round.
pub const DEFAULT_WORD_COUNT: usize = 10;
/// Default delay between a correct answer and the next word.
pub const DEFAULT_ADVANCE_DELAY_MS: u64 = 1000;
/// Longest accepted advance delay.
pub const MAX_ADVANCE_DELAY_MS: u64 = 10_000;

/// Main configuration struct for wordcall.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Round behavior.
    pub round: RoundSettings,
    /// Extra word pools.
    pub vocabulary: VocabularyConfig,
}

/// Round behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RoundSettings {
    /// Locale passed to the recognizer on every start.
    pub locale: String,
    /// Word count used when none is given.
    pub default_word_count: usize,
    /// How long "Correct!" stays up before the next word.
    pub advance_delay_ms: u64,
}

impl Default for RoundSettings {
    fn default() -> Self {
        Self {
            locale: DEFAULT_LOCALE.to_string(),
            default_word_count: DEFAULT_WORD_COUNT,
            advance_delay_ms: DEFAULT_ADVANCE_DELAY_MS,
        }
    }
}

impl RoundSettings {
    /// The advance delay as a duration.
    pub fn advance_delay(&self) -> Duration {
        Duration::from_millis(self.advance_delay_ms)
    }

    /// Check if a word count is acceptable.
    pub fn is_valid_word_count(count: usize) -> bool {
        count > 0
    }

    /// Check if an advance delay is acceptable.
    pub fn is_valid_advance_delay(ms: u64) -> bool {
        ms <= MAX_ADVANCE_DELAY_MS
    }
}

/// Word pool file configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VocabularyConfig {
    /// TOML file with extra or replacement categories.
    pub path: Option<PathBuf>,
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

    /// Load user config from `~/.wordcall/config.toml`.
    fn load_user_config() -> Option<Config> {
        let home = wordcall_home()?;
        Self::load_from_file(&home.join("config.toml")).ok()
    }

    /// Load project config from the nearest `.wordcall/config.toml`.
    fn load_project_config(cwd: &Path) -> Option<Config> {
        let config_path = project_wordcall_dir(cwd).join("config.toml");
        Self::load_from_file(&config_path).ok()
    }

    /// Load config from a specific file path.
    ///
    /// A relative vocabulary path is resolved against the file's directory.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = read_to_string_limited(path)?;
        let mut config: Config =
            toml::from_str(&content).map_err(|e| GameError::config(e.to_string()))?;

        if let (Some(vocab), Some(base)) = (config.vocabulary.path.as_mut(), path.parent()) {
            if vocab.is_relative() {
                *vocab = base.join(&*vocab);
            }
        }

        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        // WORDCALL_LOCALE
        if let Ok(val) = env::var("WORDCALL_LOCALE") {
            let trimmed = val.trim();
            if trimmed.is_empty() {
                eprintln!(
                    "Warning: Empty WORDCALL_LOCALE. Using '{}'.",
                    self.round.locale
                );
            } else {
                self.round.locale = trimmed.to_string();
            }
        }

        // WORDCALL_WORD_COUNT
        if let Ok(val) = env::var("WORDCALL_WORD_COUNT") {
            match val.parse::<usize>() {
                Ok(n) if RoundSettings::is_valid_word_count(n) => {
                    self.round.default_word_count = n;
                }
                _ => eprintln!(
                    "Warning: Invalid WORDCALL_WORD_COUNT value '{}'. \
                    Expected a positive integer. Using '{}'.",
                    val, self.round.default_word_count
                ),
            }
        }

        // WORDCALL_ADVANCE_DELAY_MS
        if let Ok(val) = env::var("WORDCALL_ADVANCE_DELAY_MS") {
            match val.parse::<u64>() {
                Ok(ms) if RoundSettings::is_valid_advance_delay(ms) => {
                    self.round.advance_delay_ms = ms;
                }
                _ => eprintln!(
                    "Warning: Invalid WORDCALL_ADVANCE_DELAY_MS value '{}'. \
                    Expected 0 to {}. Using '{}'.",
                    val, MAX_ADVANCE_DELAY_MS, self.round.advance_delay_ms
                ),
            }
        }

        // WORDCALL_VOCABULARY
        if let Ok(val) = env::var("WORDCALL_VOCABULARY") {
            if val.trim().is_empty() {
                eprintln!("Warning: Empty WORDCALL_VOCABULARY. Ignoring.");
            } else {
                self.vocabulary.path = Some(PathBuf::from(val.trim()));
            }
        }
    }

    /// Merge another config into this one.
    ///
    /// Values from `other` take precedence when they differ from defaults.
    /// A layer cannot set a field back to its default once a lower layer
    /// changed it.
    pub fn merge(mut self, other: Config) -> Self {
        let default_round = RoundSettings::default();
        if other.round.locale != default_round.locale {
            self.round.locale = other.round.locale;
        }
        if other.round.default_word_count != default_round.default_word_count {
            self.round.default_word_count = other.round.default_word_count;
        }
        if other.round.advance_delay_ms != default_round.advance_delay_ms {
            self.round.advance_delay_ms = other.round.advance_delay_ms;
        }

        if other.vocabulary.path.is_some() {
            self.vocabulary.path = other.vocabulary.path;
        }

        self
    }

    /// Load config, then clamp invalid file values.
    ///
    /// Unreadable layers are already skipped by [`Config::load`].
    pub fn load_sanitized() -> Self {
        Self::load().sanitized()
    }

    /// Replace out-of-range values with defaults.
    pub fn sanitized(mut self) -> Self {
        let defaults = RoundSettings::default();
        if !RoundSettings::is_valid_word_count(self.round.default_word_count) {
            tracing::warn!(
                value = self.round.default_word_count,
                "invalid default_word_count in config, using default"
            );
            self.round.default_word_count = defaults.default_word_count;
        }
        if !RoundSettings::is_valid_advance_delay(self.round.advance_delay_ms) {
            tracing::warn!(
                value = self.round.advance_delay_ms,
                "invalid advance_delay_ms in config, using default"
            );
            self.round.advance_delay_ms = defaults.advance_delay_ms;
        }
        if self.round.locale.trim().is_empty() {
            self.round.locale = defaults.locale;
        }
        self
    }
}

/// Get the wordcall home directory.
///
/// Returns `$WORDCALL_HOME` if set and non-empty, otherwise `~/.wordcall`.
/// Without a home directory, falls back to `/tmp/wordcall-<uid>`.
pub fn wordcall_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("WORDCALL_HOME") {
        if home.is_empty() {
            tracing::warn!("WORDCALL_HOME is empty, using default");
        } else {
            let path = PathBuf::from(&home);
            if path.is_absolute() {
                return Some(path);
            }
            if let Ok(canonical) = path.canonicalize() {
                return Some(canonical);
            }
            tracing::warn!("WORDCALL_HOME is relative and doesn't exist, using as-is");
            return Some(path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        return Some(home.join(".wordcall"));
    }

    let fallback_path = fallback_wordcall_home();
    tracing::warn!(
        "HOME not set, using fallback location: {}",
        fallback_path.display()
    );
    Some(fallback_path)
}

#[cfg(unix)]
fn fallback_wordcall_home() -> PathBuf {
    use std::os::unix::fs::MetadataExt;
    let uid = std::fs::metadata("/").map(|m| m.uid()).unwrap_or(0);
    PathBuf::from(format!("/tmp/wordcall-{}", uid))
}

#[cfg(not(unix))]
fn fallback_wordcall_home() -> PathBuf {
    std::env::temp_dir().join("wordcall")
}

/// Find the nearest directory at or above `cwd` holding `.wordcall/`.
///
/// Falls back to `cwd` itself.
pub fn find_project_root(cwd: &Path) -> PathBuf {
    cwd.ancestors()
        .find(|ancestor| ancestor.join(".wordcall").is_dir())
        .unwrap_or(cwd)
        .to_path_buf()
}

/// Get the project wordcall directory for a given working directory.
pub fn project_wordcall_dir(cwd: &Path) -> PathBuf {
    find_project_root(cwd).join(".wordcall")
}

/// Get the progression snapshot directory.
///
/// Returns `<wordcall_home>/progress/`.
pub fn progress_dir() -> Option<PathBuf> {
    wordcall_home().map(|h| h.join("progress"))
}

/// Get the round history log path.
///
/// Returns `<wordcall_home>/history.log`.
pub fn history_path() -> Option<PathBuf> {
    wordcall_home().map(|h| h.join("history.log"))
}

/// Get the crash log path.
///
/// Returns `<wordcall_home>/crash.log`.
pub fn crash_log_path() -> Option<PathBuf> {
    wordcall_home().map(|h| h.join("crash.log"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    const ENV_VARS: [&str; 4] = [
        "WORDCALL_LOCALE",
        "WORDCALL_WORD_COUNT",
        "WORDCALL_ADVANCE_DELAY_MS",
        "WORDCALL_VOCABULARY",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            env::remove_var(var);
        }
    }

    fn write_project_config(dir: &Path, content: &str) -> PathBuf {
        let wordcall_dir = dir.join(".wordcall");
        fs::create_dir_all(&wordcall_dir).unwrap();
        let path = wordcall_dir.join("config.toml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.round.locale, "en-US");
        assert_eq!(config.round.default_word_count, 10);
        assert_eq!(config.round.advance_delay(), Duration::from_millis(1000));
        assert!(config.vocabulary.path.is_none());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: Config = toml::from_str(
            r#"
[round]
locale = "en-GB"
"#,
        )
        .unwrap();

        assert_eq!(config.round.locale, "en-GB");
        assert_eq!(config.round.default_word_count, 10);
    }

    #[test]
    #[serial]
    fn test_project_config() {
        clear_env();
        let dir = TempDir::new().unwrap();
        write_project_config(
            dir.path(),
            r#"
[round]
default_word_count = 5
advance_delay_ms = 250

[vocabulary]
path = "words.toml"
"#,
        );

        let config = Config::load_from_cwd(dir.path());

        assert_eq!(config.round.default_word_count, 5);
        assert_eq!(config.round.advance_delay_ms, 250);
        assert_eq!(
            config.vocabulary.path,
            Some(dir.path().join(".wordcall").join("words.toml"))
        );
    }

    #[test]
    #[serial]
    fn test_project_config_found_from_subdirectory() {
        clear_env();
        let dir = TempDir::new().unwrap();
        write_project_config(dir.path(), "[round]\nlocale = \"fr-FR\"\n");
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let config = Config::load_from_cwd(&nested);
        assert_eq!(config.round.locale, "fr-FR");
        assert_eq!(find_project_root(&nested), dir.path());
    }

    #[test]
    #[serial]
    fn test_env_var_precedence() {
        clear_env();
        let dir = TempDir::new().unwrap();
        write_project_config(dir.path(), "[round]\ndefault_word_count = 15\n");

        env::set_var("WORDCALL_WORD_COUNT", "20");
        let config = Config::load_from_cwd(dir.path());
        assert_eq!(config.round.default_word_count, 20);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_var_overrides() {
        clear_env();
        env::set_var("WORDCALL_LOCALE", "es-ES");
        env::set_var("WORDCALL_WORD_COUNT", "25");
        env::set_var("WORDCALL_ADVANCE_DELAY_MS", "0");
        env::set_var("WORDCALL_VOCABULARY", "/opt/words.toml");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config.round.locale, "es-ES");
        assert_eq!(config.round.default_word_count, 25);
        assert_eq!(config.round.advance_delay_ms, 0);
        assert_eq!(config.vocabulary.path, Some(PathBuf::from("/opt/words.toml")));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_env_values_keep_previous() {
        clear_env();
        env::set_var("WORDCALL_WORD_COUNT", "0");
        env::set_var("WORDCALL_ADVANCE_DELAY_MS", "soon");
        env::set_var("WORDCALL_LOCALE", "  ");

        let mut config = Config::default();
        config.round.default_word_count = 30;
        config.apply_env_overrides();

        assert_eq!(config.round.default_word_count, 30);
        assert_eq!(config.round.advance_delay_ms, 1000);
        assert_eq!(config.round.locale, "en-US");

        clear_env();
    }

    #[test]
    fn test_merge_field_by_field() {
        let mut user = Config::default();
        user.round.locale = "de-DE".into();
        user.round.default_word_count = 40;

        let mut project = Config::default();
        project.round.advance_delay_ms = 500;

        let merged = Config::default().merge(user).merge(project);
        assert_eq!(merged.round.locale, "de-DE");
        assert_eq!(merged.round.default_word_count, 40);
        assert_eq!(merged.round.advance_delay_ms, 500);
    }

    #[test]
    fn test_sanitized() {
        let mut config = Config::default();
        config.round.default_word_count = 0;
        config.round.advance_delay_ms = 60_000;
        config.round.locale = String::new();

        let config = config.sanitized();
        assert_eq!(config.round, RoundSettings::default());
    }

    #[test]
    #[serial]
    fn test_load_sanitized_clamps_user_config() {
        clear_env();
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("config.toml"),
            "[round]\ndefault_word_count = 0\nadvance_delay_ms = 60000\n",
        )
        .unwrap();
        env::set_var("WORDCALL_HOME", dir.path().to_str().unwrap());

        let config = Config::load_sanitized();
        assert!(RoundSettings::is_valid_word_count(config.round.default_word_count));
        assert!(RoundSettings::is_valid_advance_delay(config.round.advance_delay_ms));

        env::remove_var("WORDCALL_HOME");
    }

    #[test]
    fn test_load_from_file_rejects_bad_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[round\n").unwrap();
        assert!(matches!(
            Config::load_from_file(&path),
            Err(GameError::Config { .. })
        ));
    }

    #[test]
    #[serial]
    fn test_wordcall_home_with_env() {
        let dir = TempDir::new().unwrap();
        env::set_var("WORDCALL_HOME", dir.path().to_str().unwrap());

        assert_eq!(wordcall_home().unwrap(), dir.path());
        assert_eq!(progress_dir().unwrap(), dir.path().join("progress"));
        assert_eq!(history_path().unwrap(), dir.path().join("history.log"));
        assert_eq!(crash_log_path().unwrap(), dir.path().join("crash.log"));

        env::remove_var("WORDCALL_HOME");
    }

    #[test]
    #[serial]
    fn test_wordcall_home_empty_env() {
        env::set_var("WORDCALL_HOME", "");

        let home = wordcall_home();
        assert!(home.is_some());
        let home = home.unwrap();
        assert!(home.ends_with(".wordcall") || home.to_string_lossy().contains("wordcall-"));

        env::remove_var("WORDCALL_HOME");
    }
}
