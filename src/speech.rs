//! Text to speech through an espeak compatible command line program.

use std::{
    path::PathBuf,
    process::Command,
    sync::{Mutex, PoisonError},
};

use log::{debug, info};
use thiserror::Error;

use crate::audio::Mute;

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("speech program `{program}` not found in PATH")]
    NotFound {
        program: String,
        #[source]
        source: which::Error,
    },

    #[error("failed to run {}", program.display())]
    Run {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} exited with {status}", program.display())]
    Failed {
        program: PathBuf,
        status: std::process::ExitStatus,
    },
}

/// a voice the engine can speak with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub id: String,
    pub name: String,
    pub language: String,
}

/// The speech capability used by alerts. Properties are shared by every
/// caller, so concurrent speakers may pick up each other's rate or volume.
pub trait SpeechEngine: Send + Sync {
    /// # Errors
    /// if the engine can't be queried
    fn voices(&self) -> Result<Vec<Voice>, SpeechError>;

    fn set_voice(&self, id: &str);

    /// words per minute
    fn set_rate(&self, rate: u32);

    /// `volume` is clamped to `0.0..=1.0`
    fn set_volume(&self, volume: f32);

    /// Speaks `text`, returning once it has been spoken.
    ///
    /// # Errors
    /// if the engine fails to speak
    fn speak(&self, text: &str) -> Result<(), SpeechError>;
}

#[derive(Debug, Clone, Default)]
struct Properties {
    voice: Option<String>,
    rate: Option<u32>,
    volume: Option<f32>,
}

/// [`SpeechEngine`] running `espeak`/`espeak-ng` once per utterance
#[derive(Debug)]
pub struct CommandSpeech {
    program: PathBuf,
    properties: Mutex<Properties>,
}

impl CommandSpeech {
    /// Looks `program` up in `PATH`.
    ///
    /// # Errors
    /// if the program can't be found
    pub fn new(program: &str) -> Result<Self, SpeechError> {
        let program = which::which(program).map_err(|source| SpeechError::NotFound {
            program: program.to_string(),
            source,
        })?;
        info!("speaking with {}", program.display());
        Ok(Self {
            program,
            properties: Mutex::default(),
        })
    }

    fn properties(&self) -> Properties {
        self.properties
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update(&self, f: impl FnOnce(&mut Properties)) {
        let mut properties = self.properties.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut *properties);
    }

    /// command line arguments for one utterance
    fn args(properties: &Properties, text: &str) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(voice) = &properties.voice {
            args.extend(["-v".to_string(), voice.clone()]);
        }
        if let Some(rate) = properties.rate {
            args.extend(["-s".to_string(), rate.to_string()]);
        }
        if let Some(volume) = properties.volume {
            // espeak amplitude, 100 is its normal level
            let amplitude = (volume * 100.0).round() as u32;
            args.extend(["-a".to_string(), amplitude.to_string()]);
        }
        args.push("--".to_string());
        args.push(text.to_string());
        args
    }

    fn run(&self, args: &[String]) -> Result<std::process::Output, SpeechError> {
        Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|source| SpeechError::Run {
                program: self.program.clone(),
                source,
            })
    }
}

impl SpeechEngine for CommandSpeech {
    fn voices(&self) -> Result<Vec<Voice>, SpeechError> {
        let output = self.run(&["--voices".to_string()])?;
        if !output.status.success() {
            return Err(SpeechError::Failed {
                program: self.program.clone(),
                status: output.status,
            });
        }
        Ok(parse_voices(&String::from_utf8_lossy(&output.stdout)))
    }

    fn set_voice(&self, id: &str) {
        self.update(|p| p.voice = Some(id.to_string()));
    }

    fn set_rate(&self, rate: u32) {
        self.update(|p| p.rate = Some(rate));
    }

    fn set_volume(&self, volume: f32) {
        self.update(|p| p.volume = Some(volume.clamp(0.0, 1.0)));
    }

    fn speak(&self, text: &str) -> Result<(), SpeechError> {
        let args = Self::args(&self.properties(), text);
        debug!("speaking {text:?}");
        let status = Command::new(&self.program)
            .args(&args)
            .status()
            .map_err(|source| SpeechError::Run {
                program: self.program.clone(),
                source,
            })?;
        if !status.success() {
            return Err(SpeechError::Failed {
                program: self.program.clone(),
                status,
            });
        }
        Ok(())
    }
}

impl SpeechEngine for Mute {
    fn voices(&self) -> Result<Vec<Voice>, SpeechError> {
        Ok(Vec::new())
    }

    fn set_voice(&self, _id: &str) {}

    fn set_rate(&self, _rate: u32) {}

    fn set_volume(&self, _volume: f32) {}

    fn speak(&self, _text: &str) -> Result<(), SpeechError> {
        Ok(())
    }
}

/// parses the table printed by `espeak --voices`:
/// `Pty Language Age/Gender VoiceName File Other Languages`
fn parse_voices(table: &str) -> Vec<Voice> {
    table
        .lines()
        .skip(1)
        .filter_map(|line| {
            let mut columns = line.split_whitespace();
            let _priority = columns.next()?;
            let language = columns.next()?;
            let _age_gender = columns.next()?;
            let name = columns.next()?;
            let file = columns.next()?;
            Some(Voice {
                id: file.to_string(),
                name: name.replace('_', " "),
                language: language.to_string(),
            })
        })
        .collect()
}
