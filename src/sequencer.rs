//! Bell and speech alert sequences.
//!
//! Every sequence, every bell and every utterance runs on its own detached
//! thread. The bell and the voice are lined up only by sleeping, never by
//! waiting for either engine to report that it finished.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use log::{error, info, warn};

use crate::{
    audio::{AudioError, AudioPlayer, Loops},
    config::{deadline, AlarmCycle, EmergencyCycle, SpeechConfig},
    error::{Error, Result},
    speech::SpeechEngine,
};

/// Threads of a running alert. Dropping it leaves them running.
#[derive(Debug)]
#[must_use = "dropping the handle detaches the alert"]
pub struct AlertHandle {
    threads: Vec<JoinHandle<()>>,
}

impl AlertHandle {
    /// Blocks until the alert's own threads have finished. Bells and
    /// utterances it spawned may still be finishing.
    pub fn join(self) {
        for thread in self.threads {
            if thread.join().is_err() {
                error!("an alert thread panicked");
            }
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.threads.iter().all(JoinHandle::is_finished)
    }
}

/// something that can start the alert for a rung alarm
pub trait Alert: Send + Sync {
    /// Starts ringing `message` without waiting for it to finish.
    ///
    /// # Errors
    /// if the alert couldn't be started
    fn ring(&self, message: &str) -> Result<()>;
}

#[derive(Clone)]
pub struct AlertSequencer {
    player: Arc<dyn AudioPlayer>,
    speech: Arc<dyn SpeechEngine>,
    voice: Option<String>,
    speech_volume: f32,
    bell: PathBuf,
    emergency_sound: PathBuf,
    alarm: AlarmCycle,
    emergency: EmergencyCycle,
}

impl std::fmt::Debug for AlertSequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertSequencer")
            .field("voice", &self.voice)
            .field("bell", &self.bell)
            .field("emergency_sound", &self.emergency_sound)
            .field("alarm", &self.alarm)
            .field("emergency", &self.emergency)
            .finish_non_exhaustive()
    }
}

impl AlertSequencer {
    #[must_use]
    pub fn new(
        player: Arc<dyn AudioPlayer>,
        speech: Arc<dyn SpeechEngine>,
        speech_config: &SpeechConfig,
        bell: impl Into<PathBuf>,
        emergency_sound: impl Into<PathBuf>,
    ) -> Self {
        Self {
            player,
            speech,
            voice: speech_config.voice.clone(),
            speech_volume: speech_config.volume(),
            bell: bell.into(),
            emergency_sound: emergency_sound.into(),
            alarm: AlarmCycle::default(),
            emergency: EmergencyCycle::default(),
        }
    }

    #[must_use]
    pub fn with_alarm_cycle(mut self, alarm: AlarmCycle) -> Self {
        self.alarm = alarm;
        self
    }

    #[must_use]
    pub fn with_emergency_cycle(mut self, emergency: EmergencyCycle) -> Self {
        self.emergency = emergency;
        self
    }

    /// Voice used when none is configured.
    pub fn set_default_voice(&mut self, voice: impl Into<String>) {
        if self.voice.is_none() {
            self.voice = Some(voice.into());
        }
    }

    /// Runs the scheduled alarm cycle for `message`: bell, pause, message,
    /// pause, repeated while the cycle budget has not run out. The budget is
    /// only checked before each round, a started round always finishes.
    ///
    /// # Errors
    /// if the cycle thread can't be spawned
    pub fn start_alarm(&self, message: &str) -> Result<AlertHandle> {
        let this = self.clone();
        let message = message.to_string();
        let end = deadline(Instant::now(), self.alarm.budget());
        let thread = spawn("alarm cycle", move || {
            info!("ringing {message:?}");
            while Instant::now() < end {
                this.play_bell(&this.bell, this.alarm.bell_volume(), this.alarm.bell());
                thread::sleep(this.alarm.pause_before_speech());
                this.say_detached(&message, this.alarm.rate);
                thread::sleep(this.alarm.pause_after_speech());
            }
        })?;
        Ok(AlertHandle {
            threads: vec![thread],
        })
    }

    /// Loops the emergency sound at its own volume and repeats the emergency
    /// text until the emergency budget runs out. Nothing else stops it.
    ///
    /// # Errors
    /// if one of the cycle threads can't be spawned
    pub fn start_emergency(&self) -> Result<AlertHandle> {
        let end = deadline(Instant::now(), self.emergency.budget());
        warn!(
            "emergency alarm started for {} minutes",
            self.emergency.minutes
        );

        let this = self.clone();
        let siren = spawn("emergency sound", move || {
            log_audio(this.player.load(&this.emergency_sound));
            log_audio(this.player.set_volume(this.emergency.volume()));
            log_audio(this.player.play(Loops::Forever));
            sleep_until(end);
            log_audio(this.player.stop());
            info!("emergency sound stopped");
        })?;

        let this = self.clone();
        let announcements = spawn("emergency speech", move || {
            while Instant::now() < end {
                this.say_detached(&this.emergency.text, this.emergency.rate);
                thread::sleep(this.emergency.pause());
            }
        })?;

        Ok(AlertHandle {
            threads: vec![siren, announcements],
        })
    }

    /// Speaks `text` on a detached thread.
    ///
    /// # Errors
    /// if the thread can't be spawned
    pub fn say(&self, text: &str, rate: u32) -> Result<AlertHandle> {
        let this = self.clone();
        let text = text.to_string();
        let thread = spawn("speech", move || this.speak(&text, rate))?;
        Ok(AlertHandle {
            threads: vec![thread],
        })
    }

    fn say_detached(&self, text: &str, rate: u32) {
        if let Err(e) = self.say(text, rate) {
            error!("couldn't start speaking {text:?}: {e}");
        }
    }

    fn speak(&self, text: &str, rate: u32) {
        if let Some(voice) = &self.voice {
            self.speech.set_voice(voice);
        }
        self.speech.set_rate(rate);
        self.speech.set_volume(self.speech_volume);
        if let Err(e) = self.speech.speak(text) {
            error!("couldn't speak {text:?}: {e}");
        }
    }

    /// plays `sound` for `duration` on a detached thread
    fn play_bell(&self, sound: &Path, volume: f32, duration: Duration) {
        let player = Arc::clone(&self.player);
        let sound = sound.to_path_buf();
        let spawned = spawn("bell", move || {
            log_audio(player.load(&sound));
            log_audio(player.set_volume(volume));
            log_audio(player.play(Loops::Once));
            thread::sleep(duration);
            log_audio(player.stop());
        });
        if let Err(e) = spawned {
            error!("couldn't ring the bell: {e}");
        }
    }
}

impl Alert for AlertSequencer {
    fn ring(&self, message: &str) -> Result<()> {
        // the cycle ends on its own
        drop(self.start_alarm(message)?);
        Ok(())
    }
}

fn spawn(name: &'static str, f: impl FnOnce() + Send + 'static) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(name.to_string())
        .spawn(f)
        .map_err(|source| Error::Spawn { name, source })
}

fn log_audio(result: std::result::Result<(), AudioError>) {
    if let Err(e) = result {
        error!("audio: {e}");
    }
}

fn sleep_until(end: Instant) {
    let now = Instant::now();
    if end > now {
        thread::sleep(end - now);
    }
}
