use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use assistant_core::{VoiceDescriptor, VoicePreferences};
use assistant_engine::{
    AtomicFileWriter, DriverSettings, PersistError, TransportSettings, VoicePollSettings,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::logging::LogDestination;

pub const SETTINGS_FILENAME: &str = "assistant_settings.ron";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("could not read settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse settings: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("could not serialize settings: {0}")]
    Serialize(#[from] ron::Error),
    #[error("could not write settings: {0}")]
    Persist(#[from] PersistError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub base_url: String,
    pub connect_timeout_secs: u64,
    pub control_timeout_secs: u64,
    pub download_dir: PathBuf,
    pub log_destination: LogDestination,
    pub verbose: bool,
    /// Subscribe to the backend's canvas broadcast feed.
    pub subscribe_events: bool,
    /// Overrides the 45 second wait before a tool placeholder is settled.
    pub tool_fallback_secs: Option<u64>,
    /// Program and arguments used to speak replies. `{voice}` and `{text}`
    /// are substituted; without a command replies are only logged.
    pub speech_command: Option<Vec<String>>,
    pub voices: Vec<VoiceDescriptor>,
    pub voice_preferences: VoicePreferences,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: TransportSettings::default().base_url,
            connect_timeout_secs: 10,
            control_timeout_secs: 30,
            download_dir: PathBuf::from("downloads"),
            log_destination: LogDestination::File,
            verbose: false,
            subscribe_events: true,
            tool_fallback_secs: None,
            speech_command: None,
            voices: Vec::new(),
            voice_preferences: VoicePreferences::default(),
        }
    }
}

impl ClientSettings {
    pub fn transport(&self) -> TransportSettings {
        TransportSettings {
            base_url: self.base_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: None,
            control_timeout: Duration::from_secs(self.control_timeout_secs),
        }
    }

    pub fn driver(&self) -> DriverSettings {
        DriverSettings {
            tool_fallback_delay: self.tool_fallback_secs.map(Duration::from_secs),
            download_dir: self.download_dir.clone(),
            voice_poll: VoicePollSettings::default(),
            voice_preferences: self.voice_preferences.clone(),
        }
    }
}

/// Reads settings from `path`. A missing file yields the defaults.
pub fn load_settings(path: &Path) -> Result<ClientSettings, SettingsError> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(ClientSettings::default());
        }
        Err(err) => return Err(err.into()),
    };
    Ok(ron::from_str(&content)?)
}

pub fn save_settings(path: &Path, settings: &ClientSettings) -> Result<PathBuf, SettingsError> {
    let content = ron::ser::to_string_pretty(settings, ron::ser::PrettyConfig::new())?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| SETTINGS_FILENAME.to_string());
    Ok(AtomicFileWriter::new(dir).write(&filename, content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let settings = load_settings(&temp.path().join("absent.ron")).unwrap();
        assert_eq!(settings, ClientSettings::default());
    }

    #[test]
    fn saved_settings_load_back() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(SETTINGS_FILENAME);
        let settings = ClientSettings {
            base_url: "http://10.0.0.2:8000".to_string(),
            tool_fallback_secs: Some(10),
            speech_command: Some(vec!["espeak".into(), "-v".into(), "{voice}".into(), "{text}".into()]),
            voices: vec![VoiceDescriptor::new("Zira", "en-US", false)],
            ..ClientSettings::default()
        };

        save_settings(&path, &settings).unwrap();

        assert_eq!(load_settings(&path).unwrap(), settings);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(SETTINGS_FILENAME);
        fs::write(&path, "(base_url: \"http://example.test\", verbose: true)").unwrap();

        let settings = load_settings(&path).unwrap();

        assert_eq!(settings.base_url, "http://example.test");
        assert!(settings.verbose);
        assert_eq!(settings.control_timeout_secs, 30);
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(SETTINGS_FILENAME);
        fs::write(&path, "{ not ron").unwrap();

        assert!(matches!(load_settings(&path), Err(SettingsError::Parse(_))));
    }

    #[test]
    fn settings_map_to_engine_settings() {
        let settings = ClientSettings {
            tool_fallback_secs: Some(5),
            ..ClientSettings::default()
        };
        assert_eq!(settings.driver().tool_fallback_delay, Some(Duration::from_secs(5)));
        assert_eq!(settings.transport().request_timeout, None);
    }
}
