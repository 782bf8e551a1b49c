//! Error types for alarm storage, configuration and alerting

use std::path::PathBuf;
use thiserror::Error;

use crate::{audio::AudioError, speech::SpeechError};

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid time format `{0}`, please use HH:MM")]
    InvalidTimeFormat(String),

    #[error("unknown day `{0}`")]
    UnknownDay(String),

    #[error("alarm index {index} is out of range, there are {len} alarms")]
    OutOfRange { index: usize, len: usize },

    #[error("failed to read alarms file {path}")]
    ReadAlarms {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse alarms file {path}")]
    ParseAlarms {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write alarms file {path}")]
    WriteAlarms {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize alarms")]
    SerializeAlarms(#[source] serde_json::Error),

    #[error("failed to read config file {path}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}")]
    ParseConfig {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to write config file {path}")]
    WriteConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize config")]
    SerializeConfig(#[from] toml::ser::Error),

    #[error("couldn't determine the user's config and data directories")]
    NoProjectDirs,

    #[error("failed to spawn {name} thread")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Speech(#[from] SpeechError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
