#![warn(clippy::pedantic, clippy::nursery, clippy::cargo)]
#![deny(clippy::use_self, rust_2018_idioms)]
#![allow(
    clippy::multiple_crate_versions,
    clippy::module_name_repetitions,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

use std::sync::{Arc, Mutex, PoisonError};

use log::{info, warn};

pub mod alarm;
pub mod audio;
pub mod communication;
pub mod config;
pub mod error;
pub mod scheduler;
pub mod sequencer;
pub mod speech;
pub mod store;
pub mod tracker;

pub use alarm::{AlarmRule, AlarmTime, Day};
pub use config::Config;
pub use error::{Error, Result};

use audio::AudioPlayer;
use scheduler::{Clock, Scheduler, SchedulerHandle};
use sequencer::{AlertHandle, AlertSequencer};
use speech::{SpeechEngine, Voice};
use store::AlarmStore;

/// Everything a running bell ringer owns: the alarm list, the alert
/// sequencer and, once started, the scheduler thread.
pub struct BellRinger {
    config: Config,
    store: Arc<Mutex<AlarmStore>>,
    sequencer: Arc<AlertSequencer>,
    speech: Arc<dyn SpeechEngine>,
    scheduler: Option<SchedulerHandle>,
}

impl std::fmt::Debug for BellRinger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BellRinger")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("sequencer", &self.sequencer)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl BellRinger {
    /// Loads the alarm list (seeding it on first run) and prepares alerts.
    /// Nothing rings until [`Self::start`].
    ///
    /// # Errors
    /// if the alarms file can't be located, seeded, read or parsed
    pub fn new(
        config: Config,
        player: Arc<dyn AudioPlayer>,
        speech: Arc<dyn SpeechEngine>,
    ) -> Result<Self> {
        let path = config.alarms_path()?;
        if let Some(seed) = &config.seed_alarms_file {
            AlarmStore::seed(&path, seed)?;
        }
        let store = AlarmStore::open(path)?;

        let mut sequencer = AlertSequencer::new(
            player,
            Arc::clone(&speech),
            &config.speech,
            &config.sounds.bell,
            &config.sounds.emergency,
        )
        .with_alarm_cycle(config.alarm.clone())
        .with_emergency_cycle(config.emergency.clone());
        if config.speech.voice.is_none() {
            match speech.voices() {
                Ok(voices) => {
                    if let Some(voice) = voices.into_iter().next() {
                        info!("using voice {} ({})", voice.id, voice.name);
                        sequencer.set_default_voice(voice.id);
                    }
                }
                Err(e) => warn!("couldn't list voices, using the engine default: {e}"),
            }
        }

        Ok(Self {
            config,
            store: Arc::new(Mutex::new(store)),
            sequencer: Arc::new(sequencer),
            speech,
            scheduler: None,
        })
    }

    fn store(&self) -> std::sync::MutexGuard<'_, AlarmStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Validates and stores a new alarm.
    ///
    /// # Errors
    /// `InvalidTimeFormat` if `time` is not `HH:MM`, leaving the alarms
    /// untouched, or if the alarms can't be written
    pub fn schedule(
        &self,
        time: &str,
        message: &str,
        days: impl IntoIterator<Item = Day>,
    ) -> Result<AlarmRule> {
        let rule = AlarmRule::new(time.parse()?, message, days);
        self.store().add(rule.clone())?;
        info!("scheduled {rule}");
        Ok(rule)
    }

    /// Removes the alarm at `index` in listing order.
    ///
    /// # Errors
    /// `OutOfRange` if there is no such alarm, or if the alarms can't be written
    pub fn delete(&self, index: usize) -> Result<AlarmRule> {
        let rule = self.store().delete_at(index)?;
        info!("deleted {rule}");
        Ok(rule)
    }

    #[must_use]
    pub fn alarms(&self) -> Vec<AlarmRule> {
        self.store().rules().to_vec()
    }

    /// Starts polling for due alarms, unless already polling.
    ///
    /// # Errors
    /// if the scheduler thread can't be spawned
    pub fn start(&mut self, clock: impl Clock) -> Result<()> {
        if self.scheduler.as_ref().is_some_and(SchedulerHandle::is_running) {
            return Ok(());
        }
        let alert: Arc<dyn sequencer::Alert> = self.sequencer.clone();
        let scheduler = Scheduler::new(Arc::clone(&self.store), alert);
        self.scheduler = Some(scheduler.spawn(clock, &self.config.schedule)?);
        Ok(())
    }

    /// Stops polling. Alerts already ringing keep going.
    pub fn shutdown(&mut self) -> Option<Scheduler> {
        self.scheduler.take().map(SchedulerHandle::shutdown)
    }

    /// Blocks while the scheduler runs.
    pub fn wait(&mut self) {
        if let Some(scheduler) = self.scheduler.take() {
            scheduler.wait();
        }
    }

    /// Starts the emergency alarm. It can't be stopped, it ends on its own
    /// once the emergency time is up.
    ///
    /// # Errors
    /// if the alert threads can't be spawned
    pub fn emergency(&self) -> Result<AlertHandle> {
        self.sequencer.start_emergency()
    }

    /// Speaks `text` right away at the alarm speech rate.
    ///
    /// # Errors
    /// if the speech thread can't be spawned
    pub fn say(&self, text: &str) -> Result<AlertHandle> {
        self.sequencer.say(text, self.config.alarm.rate)
    }

    /// # Errors
    /// if the speech engine can't list its voices
    pub fn voices(&self) -> Result<Vec<Voice>> {
        Ok(self.speech.voices()?)
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }
}
