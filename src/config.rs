use crate::announce::Language;
use crate::defaults;
use crate::error::{Result, StationvoxError};
use crate::sequencer::SequencerSettings;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub playback: PlaybackConfig,
    pub speech: SpeechConfig,
    pub player: PlayerConfig,
    pub templates: TemplatesConfig,
    pub recording: RecordingConfig,
    pub daemon: DaemonConfig,
}

/// Queue and player behaviour
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Languages every announcement is rendered in, in playback order.
    pub languages: Vec<Language>,
    pub repeat_count: u32,
    /// 0-100
    pub volume: u8,
    pub inter_item_pause_ms: u64,
    pub settle_pause_ms: u64,
    pub history_capacity: usize,
}

/// Speech synthesis command configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpeechConfig {
    pub command: String,
    /// Relative to the engine's normal speed.
    pub rate: f32,
    pub pitch: f32,
    /// Voice per language name, e.g. `hindi = "hi"`.
    pub voices: BTreeMap<String, String>,
}

/// Recorded clip playback configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlayerConfig {
    pub command: String,
}

/// Template overrides
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct TemplatesConfig {
    /// TOML file overriding individual (kind, language) templates.
    pub path: Option<PathBuf>,
}

/// Recording studio configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct RecordingConfig {
    /// Input device name; the best default device when unset.
    pub device: Option<String>,
}

/// Daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct DaemonConfig {
    /// IPC socket path; `$XDG_RUNTIME_DIR/stationvox.sock` when unset.
    pub socket: Option<PathBuf>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            languages: Language::ALL.to_vec(),
            repeat_count: defaults::REPEAT_COUNT,
            volume: defaults::VOLUME,
            inter_item_pause_ms: defaults::INTER_ITEM_PAUSE_MS,
            settle_pause_ms: defaults::SETTLE_PAUSE_MS,
            history_capacity: defaults::HISTORY_CAPACITY,
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            command: defaults::SPEECH_COMMAND.to_string(),
            rate: defaults::SPEECH_RATE,
            pitch: defaults::SPEECH_PITCH,
            voices: BTreeMap::new(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            command: defaults::PLAYER_COMMAND.to_string(),
        }
    }
}

impl SpeechConfig {
    /// Configured voices keyed by language.
    pub fn voices_by_language(&self) -> Result<BTreeMap<Language, String>> {
        self.voices
            .iter()
            .map(|(name, voice)| Ok((name.parse::<Language>()?, voice.clone())))
            .collect()
    }
}

impl PlaybackConfig {
    pub fn to_settings(&self) -> SequencerSettings {
        SequencerSettings {
            languages: self.languages.clone(),
            repeat_count: self.repeat_count,
            volume: self.volume,
            inter_item_pause_ms: self.inter_item_pause_ms,
            settle_pause_ms: self.settle_pause_ms,
        }
    }
}

fn invalid(key: &str, message: impl Into<String>) -> StationvoxError {
    StationvoxError::ConfigInvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Missing fields use default values; the result is validated.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StationvoxError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                StationvoxError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if the file doesn't exist
    ///
    /// Invalid TOML and invalid values are still errors.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(StationvoxError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            other => other,
        }
    }

    /// Reject values the sequencer cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.playback.repeat_count == 0 {
            return Err(invalid("playback.repeat_count", "must be at least 1"));
        }
        if self.playback.volume > defaults::MAX_VOLUME {
            return Err(invalid(
                "playback.volume",
                format!("{} is above {}", self.playback.volume, defaults::MAX_VOLUME),
            ));
        }
        if self.playback.history_capacity == 0 {
            return Err(invalid("playback.history_capacity", "must be at least 1"));
        }
        if self.speech.rate.is_nan() || self.speech.rate <= 0.0 {
            return Err(invalid("speech.rate", "must be greater than 0"));
        }
        if self.speech.command.trim().is_empty() {
            return Err(invalid("speech.command", "must not be empty"));
        }
        if self.player.command.trim().is_empty() {
            return Err(invalid("player.command", "must not be empty"));
        }
        self.speech
            .voices_by_language()
            .map_err(|e| invalid("speech.voices", e.to_string()))?;
        Ok(())
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - STATIONVOX_LANGUAGES → playback.languages (comma separated)
    /// - STATIONVOX_VOLUME → playback.volume
    /// - STATIONVOX_REPEAT → playback.repeat_count
    /// - STATIONVOX_SPEECH_COMMAND → speech.command
    ///
    /// Unparseable values are ignored with a warning.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(languages) = std::env::var("STATIONVOX_LANGUAGES")
            && !languages.is_empty()
        {
            match Language::parse_list(&languages) {
                Ok(parsed) => self.playback.languages = parsed,
                Err(e) => tracing::warn!("ignoring STATIONVOX_LANGUAGES: {}", e),
            }
        }

        if let Ok(volume) = std::env::var("STATIONVOX_VOLUME")
            && !volume.is_empty()
        {
            match volume.trim().parse::<u8>() {
                Ok(v) if v <= defaults::MAX_VOLUME => self.playback.volume = v,
                _ => tracing::warn!("ignoring STATIONVOX_VOLUME={:?}: expected 0-100", volume),
            }
        }

        if let Ok(repeat) = std::env::var("STATIONVOX_REPEAT")
            && !repeat.is_empty()
        {
            match repeat.trim().parse::<u32>() {
                Ok(n) if n >= 1 => self.playback.repeat_count = n,
                _ => tracing::warn!("ignoring STATIONVOX_REPEAT={:?}: expected 1 or more", repeat),
            }
        }

        if let Ok(command) = std::env::var("STATIONVOX_SPEECH_COMMAND")
            && !command.is_empty()
        {
            self.speech.command = command;
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/stationvox/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join("stationvox")
            .join("config.toml")
    }

    /// Look up a value by dotted path, e.g. `playback.volume`.
    pub fn get_value_by_path(&self, key: &str) -> Result<String> {
        let root = toml::Value::try_from(self).map_err(|e| StationvoxError::ConfigParse {
            message: e.to_string(),
        })?;

        let mut value = &root;
        for part in key.split('.') {
            value = value
                .get(part)
                .ok_or_else(|| invalid(key, "no such configuration key"))?;
        }

        Ok(match value {
            toml::Value::String(s) => s.clone(),
            toml::Value::Table(table) => toml::to_string_pretty(table)
                .map_err(|e| StationvoxError::ConfigParse {
                    message: e.to_string(),
                })?
                .trim_end()
                .to_string(),
            other => other.to_string(),
        })
    }

    /// The whole configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| StationvoxError::ConfigParse {
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Mutex to serialize tests that modify environment variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    // SAFETY: These helpers are only used in tests with ENV_LOCK held,
    // ensuring no concurrent access to environment variables.
    fn set_env(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) }
    }

    fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) }
    }

    fn clear_stationvox_env() {
        remove_env("STATIONVOX_LANGUAGES");
        remove_env("STATIONVOX_VOLUME");
        remove_env("STATIONVOX_REPEAT");
        remove_env("STATIONVOX_SPEECH_COMMAND");
    }

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(contents.as_bytes()).unwrap();
        temp_file
    }

    #[test]
    fn test_default_config_has_correct_values() {
        let config = Config::default();

        assert_eq!(config.playback.languages, Language::ALL.to_vec());
        assert_eq!(config.playback.repeat_count, 1);
        assert_eq!(config.playback.volume, 80);
        assert_eq!(config.playback.inter_item_pause_ms, 500);
        assert_eq!(config.playback.settle_pause_ms, 1000);
        assert_eq!(config.playback.history_capacity, 50);
        assert_eq!(config.speech.command, "espeak-ng");
        assert_eq!(config.player.command, "paplay");
        assert_eq!(config.templates.path, None);
        assert_eq!(config.daemon.socket, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_toml_file() {
        let temp_file = write_temp(
            r#"
            [playback]
            languages = ["hindi", "english"]
            repeat_count = 2
            volume = 60

            [speech]
            command = "/opt/espeak/bin/espeak-ng"
            rate = 1.2

            [speech.voices]
            hindi = "hi+f3"

            [player]
            command = "aplay"

            [templates]
            path = "/etc/stationvox/templates.toml"
        "#,
        );

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(
            config.playback.languages,
            vec![Language::Hindi, Language::English]
        );
        assert_eq!(config.playback.repeat_count, 2);
        assert_eq!(config.playback.volume, 60);
        assert_eq!(config.speech.command, "/opt/espeak/bin/espeak-ng");
        assert_eq!(config.speech.rate, 1.2);
        assert_eq!(
            config.speech.voices_by_language().unwrap()[&Language::Hindi],
            "hi+f3"
        );
        assert_eq!(config.player.command, "aplay");
        assert_eq!(
            config.templates.path,
            Some(PathBuf::from("/etc/stationvox/templates.toml"))
        );
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let temp_file = write_temp(
            r#"
            [playback]
            volume = 40
        "#,
        );

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.playback.volume, 40);
        assert_eq!(config.playback.repeat_count, 1);
        assert_eq!(config.playback.languages, Language::ALL.to_vec());
        assert_eq!(config.speech, SpeechConfig::default());
    }

    #[test]
    fn test_zero_repeat_count_is_rejected() {
        let temp_file = write_temp("[playback]\nrepeat_count = 0\n");
        match Config::load(temp_file.path()) {
            Err(StationvoxError::ConfigInvalidValue { key, .. }) => {
                assert_eq!(key, "playback.repeat_count")
            }
            other => panic!("Expected ConfigInvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_volume_above_100_is_rejected() {
        let temp_file = write_temp("[playback]\nvolume = 150\n");
        assert!(matches!(
            Config::load(temp_file.path()),
            Err(StationvoxError::ConfigInvalidValue { .. })
        ));
    }

    #[test]
    fn test_unknown_voice_language_is_rejected() {
        let temp_file = write_temp("[speech.voices]\ntamil = \"ta\"\n");
        assert!(matches!(
            Config::load(temp_file.path()),
            Err(StationvoxError::ConfigInvalidValue { .. })
        ));
    }

    #[test]
    fn test_unknown_language_in_list_is_parse_error() {
        let temp_file = write_temp("[playback]\nlanguages = [\"klingon\"]\n");
        assert!(matches!(
            Config::load(temp_file.path()),
            Err(StationvoxError::Config(_))
        ));
    }

    #[test]
    fn test_env_override_languages_and_volume() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_stationvox_env();

        set_env("STATIONVOX_LANGUAGES", "kannada,english");
        set_env("STATIONVOX_VOLUME", "35");
        let config = Config::default().with_env_overrides();

        assert_eq!(
            config.playback.languages,
            vec![Language::Kannada, Language::English]
        );
        assert_eq!(config.playback.volume, 35);
        assert_eq!(config.playback.repeat_count, 1);

        clear_stationvox_env();
    }

    #[test]
    fn test_env_override_repeat_and_command() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_stationvox_env();

        set_env("STATIONVOX_REPEAT", "3");
        set_env("STATIONVOX_SPEECH_COMMAND", "espeak");
        let config = Config::default().with_env_overrides();

        assert_eq!(config.playback.repeat_count, 3);
        assert_eq!(config.speech.command, "espeak");

        clear_stationvox_env();
    }

    #[test]
    fn test_env_override_invalid_values_ignored() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_stationvox_env();

        set_env("STATIONVOX_VOLUME", "loud");
        set_env("STATIONVOX_REPEAT", "0");
        set_env("STATIONVOX_LANGUAGES", "english,tamil");
        let config = Config::default().with_env_overrides();

        assert_eq!(config, Config::default());

        clear_stationvox_env();
    }

    #[test]
    fn test_env_override_empty_string_ignored() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_stationvox_env();

        set_env("STATIONVOX_SPEECH_COMMAND", "");
        let config = Config::default().with_env_overrides();
        assert_eq!(config.speech.command, "espeak-ng");

        clear_stationvox_env();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let temp_file = write_temp(
            r#"
            [playback
            volume = "broken
        "#,
        );
        assert!(matches!(
            Config::load(temp_file.path()),
            Err(StationvoxError::Config(_))
        ));
    }

    #[test]
    fn test_default_path_is_xdg_compliant() {
        let path = Config::default_path();
        let path_str = path.to_string_lossy();

        assert!(path_str.contains("stationvox"));
        assert!(path_str.ends_with("config.toml"));
    }

    #[test]
    fn test_load_or_default_returns_default_for_missing_file() {
        let missing_path = Path::new("/tmp/nonexistent_stationvox_config_12345.toml");
        assert_eq!(Config::load_or_default(missing_path).unwrap(), Config::default());
    }

    #[test]
    fn test_load_or_default_fails_on_invalid_toml() {
        let temp_file = write_temp("[playback\n");
        assert!(Config::load_or_default(temp_file.path()).is_err());
    }

    #[test]
    fn test_get_value_by_path() {
        let config = Config::default();
        assert_eq!(config.get_value_by_path("playback.volume").unwrap(), "80");
        assert_eq!(config.get_value_by_path("speech.command").unwrap(), "espeak-ng");
        let languages = config.get_value_by_path("playback.languages").unwrap();
        assert!(languages.starts_with('['));
        assert!(languages.contains("\"kannada\""));
        assert!(config.get_value_by_path("player").unwrap().contains("command"));
        assert!(config.get_value_by_path("playback.nope").is_err());
    }

    #[test]
    fn test_toml_dump_loads_back() {
        let mut config = Config::default();
        config.playback.volume = 55;
        config.speech.voices.insert("hindi".into(), "hi".into());

        let temp_file = write_temp(&config.to_toml_string().unwrap());
        assert_eq!(Config::load(temp_file.path()).unwrap(), config);
    }

    #[test]
    fn test_to_settings_copies_playback_values() {
        let config = Config::default();
        let settings = config.playback.to_settings();
        assert_eq!(settings, SequencerSettings::default());
    }
}
