use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use directories::ProjectDirs;
use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const APP_NAME: &str = "bell_ringer";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// where alarms are stored, defaults to `alarms.json` in the data directory
    pub alarms_file: Option<PathBuf>,
    /// bundled alarm list copied to `alarms_file` on first run
    pub seed_alarms_file: Option<PathBuf>,
    pub sounds: Sounds,
    pub speech: SpeechConfig,
    pub alarm: AlarmCycle,
    pub emergency: EmergencyCycle,
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Sounds {
    pub bell: PathBuf,
    pub emergency: PathBuf,
}

impl Default for Sounds {
    fn default() -> Self {
        let sounds = Config::sounds_path().unwrap_or_else(|_| PathBuf::from("sounds"));
        Self {
            bell: sounds.join("bell.mp3"),
            emergency: sounds.join("fire_alarm.mp3"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SpeechConfig {
    /// espeak compatible program
    pub program: String,
    /// voice id, the first voice the program lists when unset
    pub voice: Option<String>,
    pub volume: f64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            program: "espeak-ng".to_string(),
            voice: None,
            volume: 0.8,
        }
    }
}

/// timing of the bell and message cycle of a scheduled alarm
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AlarmCycle {
    pub budget_secs: f64,
    pub bell_secs: f64,
    pub bell_volume: f64,
    pub pause_before_speech_secs: f64,
    pub pause_after_speech_secs: f64,
    /// words per minute
    pub rate: u32,
}

impl Default for AlarmCycle {
    fn default() -> Self {
        Self {
            budget_secs: 15.0,
            bell_secs: 3.0,
            bell_volume: 0.6,
            pause_before_speech_secs: 3.0,
            pause_after_speech_secs: 5.0,
            rate: 100,
        }
    }
}

impl SpeechConfig {
    #[must_use]
    pub fn volume(&self) -> f32 {
        self.volume as f32
    }
}

impl AlarmCycle {
    #[must_use]
    pub fn bell_volume(&self) -> f32 {
        self.bell_volume as f32
    }

    #[must_use]
    pub fn budget(&self) -> Duration {
        secs(self.budget_secs)
    }

    #[must_use]
    pub fn bell(&self) -> Duration {
        secs(self.bell_secs)
    }

    #[must_use]
    pub fn pause_before_speech(&self) -> Duration {
        secs(self.pause_before_speech_secs)
    }

    #[must_use]
    pub fn pause_after_speech(&self) -> Duration {
        secs(self.pause_after_speech_secs)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct EmergencyCycle {
    pub text: String,
    pub minutes: f64,
    pub volume: f64,
    pub rate: u32,
    pub pause_secs: f64,
}

impl Default for EmergencyCycle {
    fn default() -> Self {
        Self {
            text: "Emergency! Please evacuate immediately!".to_string(),
            minutes: 360.0,
            volume: 1.0,
            rate: 120,
            pause_secs: 5.0,
        }
    }
}

impl EmergencyCycle {
    #[must_use]
    pub fn volume(&self) -> f32 {
        self.volume as f32
    }

    #[must_use]
    pub fn budget(&self) -> Duration {
        secs(self.minutes * 60.0)
    }

    #[must_use]
    pub fn pause(&self) -> Duration {
        secs(self.pause_secs)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ScheduleConfig {
    pub initial_delay_secs: f64,
    pub poll_interval_secs: f64,
    /// counted from startup, not from midnight
    pub reset_interval_secs: f64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            initial_delay_secs: 30.0,
            poll_interval_secs: 15.0,
            reset_interval_secs: 24.0 * 60.0 * 60.0,
        }
    }
}

impl ScheduleConfig {
    #[must_use]
    pub fn initial_delay(&self) -> Duration {
        secs(self.initial_delay_secs)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        secs(self.poll_interval_secs)
    }

    #[must_use]
    pub fn reset_interval(&self) -> Duration {
        secs(self.reset_interval_secs)
    }
}

/// negative or nan values count as zero
fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

/// a century, longer than any process will wait for
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// `from + after`, capped at a century ahead when the sum is out of range
pub(crate) fn deadline(from: Instant, after: Duration) -> Instant {
    from.checked_add(after)
        .or_else(|| from.checked_add(FAR_FUTURE))
        .unwrap_or(from)
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the config at `path`, falling back to defaults when there is none.
    ///
    /// # Errors
    /// if the file exists but can't be read or parsed
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let config = fs::read_to_string(path).map_err(|source| Error::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&config).map_err(|source| Error::ParseConfig {
            path: path.to_path_buf(),
            source,
        })
    }

    /// # Errors
    /// if the config can't be serialized or written
    pub fn save(&self, path: &Path) -> Result<()> {
        let config = toml::to_string(self)?;
        let write_err = |source: std::io::Error| Error::WriteConfig {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(path, config).map_err(write_err)
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("", "", APP_NAME).ok_or(Error::NoProjectDirs)
    }

    /// # Errors
    /// if there is no home directory
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// # Errors
    /// if there is no home directory
    pub fn sounds_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.data_dir().join("sounds"))
    }

    /// # Errors
    /// if there is no home directory
    pub fn default_alarms_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.data_dir().join("alarms.json"))
    }

    /// the configured alarms file, or the default one
    ///
    /// # Errors
    /// if none is configured and there is no home directory
    pub fn alarms_path(&self) -> Result<PathBuf> {
        self.alarms_file
            .clone()
            .map_or_else(Self::default_alarms_path, Ok)
    }
}
