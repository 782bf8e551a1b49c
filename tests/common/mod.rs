#![allow(dead_code)]

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Instant,
};

use bell_ringer::{
    audio::{AudioError, AudioPlayer, Loops},
    scheduler::Clock,
    sequencer::Alert,
    speech::{SpeechEngine, SpeechError, Voice},
    Error,
};
use chrono::{NaiveDate, NaiveDateTime};

#[derive(Debug, Clone, PartialEq)]
pub enum Sound {
    Load(PathBuf),
    Volume(f32),
    Play(Loops),
    Stop,
}

#[derive(Debug, Default)]
pub struct RecordingPlayer {
    pub events: Mutex<Vec<(Instant, Sound)>>,
}

impl RecordingPlayer {
    pub fn sounds(&self) -> Vec<Sound> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(_, sound)| sound.clone())
            .collect()
    }

    fn push(&self, sound: Sound) -> Result<(), AudioError> {
        self.events.lock().unwrap().push((Instant::now(), sound));
        Ok(())
    }
}

impl AudioPlayer for RecordingPlayer {
    fn load(&self, path: &Path) -> Result<(), AudioError> {
        self.push(Sound::Load(path.to_path_buf()))
    }

    fn set_volume(&self, volume: f32) -> Result<(), AudioError> {
        self.push(Sound::Volume(volume))
    }

    fn play(&self, loops: Loops) -> Result<(), AudioError> {
        self.push(Sound::Play(loops))
    }

    fn stop(&self) -> Result<(), AudioError> {
        self.push(Sound::Stop)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub voice: Option<String>,
    pub rate: Option<u32>,
    pub volume: Option<f32>,
}

#[derive(Debug, Default)]
pub struct RecordingSpeech {
    voice: Mutex<Option<String>>,
    rate: Mutex<Option<u32>>,
    volume: Mutex<Option<f32>>,
    pub spoken: Mutex<Vec<(Instant, Utterance)>>,
}

impl RecordingSpeech {
    pub fn utterances(&self) -> Vec<Utterance> {
        self.spoken
            .lock()
            .unwrap()
            .iter()
            .map(|(_, u)| u.clone())
            .collect()
    }
}

impl SpeechEngine for RecordingSpeech {
    fn voices(&self) -> Result<Vec<Voice>, SpeechError> {
        Ok(vec![
            Voice {
                id: "gmw/en".to_string(),
                name: "English".to_string(),
                language: "en".to_string(),
            },
            Voice {
                id: "gmw/de".to_string(),
                name: "German".to_string(),
                language: "de".to_string(),
            },
        ])
    }

    fn set_voice(&self, id: &str) {
        *self.voice.lock().unwrap() = Some(id.to_string());
    }

    fn set_rate(&self, rate: u32) {
        *self.rate.lock().unwrap() = Some(rate);
    }

    fn set_volume(&self, volume: f32) {
        *self.volume.lock().unwrap() = Some(volume);
    }

    fn speak(&self, text: &str) -> Result<(), SpeechError> {
        let utterance = Utterance {
            text: text.to_string(),
            voice: self.voice.lock().unwrap().clone(),
            rate: *self.rate.lock().unwrap(),
            volume: *self.volume.lock().unwrap(),
        };
        self.spoken
            .lock()
            .unwrap()
            .push((Instant::now(), utterance));
        Ok(())
    }
}

/// records rung messages, failing for `fail_on`
#[derive(Debug, Default)]
pub struct RecordingAlert {
    pub rung: Mutex<Vec<String>>,
    pub fail_on: Option<String>,
    pub panic_on: Option<String>,
}

impl RecordingAlert {
    pub fn rung(&self) -> Vec<String> {
        self.rung.lock().unwrap().clone()
    }
}

impl Alert for RecordingAlert {
    fn ring(&self, message: &str) -> Result<(), Error> {
        if self.panic_on.as_deref() == Some(message) {
            panic!("alert for {message} blew up");
        }
        if self.fail_on.as_deref() == Some(message) {
            return Err(Error::Spawn {
                name: "test",
                source: std::io::Error::other("no threads left"),
            });
        }
        self.rung.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

/// a clock that only moves when told to
#[derive(Debug, Clone)]
pub struct FixedClock(pub Arc<Mutex<NaiveDateTime>>);

impl FixedClock {
    pub fn at(now: NaiveDateTime) -> Self {
        Self(Arc::new(Mutex::new(now)))
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.0.lock().unwrap() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.0.lock().unwrap()
    }
}

/// 2024-01-01 was a Monday
pub fn monday_at(hour: u32, minute: u32, second: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(hour, minute, second)
        .unwrap()
}

pub fn tuesday_at(hour: u32, minute: u32, second: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(hour, minute, second)
        .unwrap()
}
