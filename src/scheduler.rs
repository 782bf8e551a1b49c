//! Polls the clock and rings alarms whose minute has come.
//!
//! Matching is minute granular while polls are closer together than a
//! minute, so one alarm is seen as due on several polls in a row. The
//! [`TriggerTracker`] is what keeps it from ringing more than once.

use std::{
    panic::{self, AssertUnwindSafe},
    sync::{
        mpsc::{self, RecvTimeoutError, Sender},
        Arc, Mutex, PoisonError,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use chrono::{Datelike, NaiveDateTime};
use log::{debug, error, info};

use crate::{
    alarm::{AlarmTime, Day},
    config::{deadline, ScheduleConfig},
    error::{Error, Result},
    sequencer::Alert,
    store::AlarmStore,
    tracker::{TriggerKey, TriggerTracker},
};

/// source of local wall clock time
pub trait Clock: Send + 'static {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// shortest interval the polling thread will wait for
const MIN_INTERVAL: Duration = Duration::from_millis(1);

pub struct Scheduler {
    store: Arc<Mutex<AlarmStore>>,
    tracker: TriggerTracker,
    alert: Arc<dyn Alert>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("store", &self.store)
            .field("tracker", &self.tracker)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    #[must_use]
    pub fn new(store: Arc<Mutex<AlarmStore>>, alert: Arc<dyn Alert>) -> Self {
        Self {
            store,
            tracker: TriggerTracker::new(),
            alert,
        }
    }

    /// One pass over every alarm, in stored order, at `now`.
    /// Returns the keys of the alarms that started ringing.
    ///
    /// A failing or panicking alert is logged and does not stop the pass.
    pub fn poll(&mut self, now: NaiveDateTime) -> Vec<TriggerKey> {
        let current = AlarmTime::of(now.time());
        let today = Day::from(now.weekday());
        // alerts must not run under the store lock
        let rules = self
            .store
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .rules()
            .to_vec();
        debug!("polling {} alarm(s) at {today} {current}", rules.len());

        let mut fired = Vec::new();
        for rule in rules {
            let key = TriggerKey::new(today, rule.time);
            if rule.time != current || !rule.rings_on(today) || self.tracker.has_fired(&key) {
                continue;
            }
            let alert = &self.alert;
            let rang = panic::catch_unwind(AssertUnwindSafe(|| alert.ring(&rule.message)));
            match rang {
                Ok(Ok(())) => {
                    info!("alarm {rule} rang");
                    self.tracker.mark_fired(key);
                    fired.push(key);
                }
                Ok(Err(e)) => error!("alarm {rule} failed to ring: {e}"),
                Err(_) => error!("alarm {rule} panicked while ringing"),
            }
        }
        fired
    }

    /// Lets every alarm ring again.
    pub fn reset(&mut self) {
        self.tracker.reset_all();
    }

    #[must_use]
    pub const fn tracker(&self) -> &TriggerTracker {
        &self.tracker
    }

    /// Moves the scheduler onto its own thread. The first poll happens after
    /// `timing.initial_delay()`, then every `timing.poll_interval()` after the
    /// previous poll. The rung alarms are forgotten every
    /// `timing.reset_interval()` counted from now.
    ///
    /// # Errors
    /// if the thread can't be spawned
    pub fn spawn(self, clock: impl Clock, timing: &ScheduleConfig) -> Result<SchedulerHandle> {
        let (tx, rx) = mpsc::channel::<()>();
        let initial_delay = timing.initial_delay();
        let poll_interval = timing.poll_interval().max(MIN_INTERVAL);
        let reset_interval = timing.reset_interval().max(MIN_INTERVAL);
        let mut scheduler = self;

        let thread = thread::Builder::new()
            .name("scheduler".to_string())
            .spawn(move || {
                let start = Instant::now();
                let mut next_poll = deadline(start, initial_delay);
                let mut next_reset = deadline(start, reset_interval);
                info!("scheduler started");
                loop {
                    let wake_at = next_poll.min(next_reset);
                    match rx.recv_timeout(wake_at.saturating_duration_since(Instant::now())) {
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                        Err(RecvTimeoutError::Timeout) => {}
                    }
                    let now = Instant::now();
                    if now >= next_reset {
                        scheduler.reset();
                        next_reset = deadline(next_reset, reset_interval);
                    }
                    if now >= next_poll {
                        scheduler.poll(clock.now());
                        next_poll = deadline(Instant::now(), poll_interval);
                    }
                }
                info!("scheduler stopped");
                scheduler
            })
            .map_err(|source| Error::Spawn {
                name: "scheduler",
                source,
            })?;

        Ok(SchedulerHandle {
            shutdown: tx,
            thread,
        })
    }
}

/// Running scheduler thread. Dropping the handle stops it too.
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown: Sender<()>,
    thread: JoinHandle<Scheduler>,
}

impl SchedulerHandle {
    /// Stops polling and hands the scheduler back.
    ///
    /// # Panics
    /// if the scheduler thread panicked
    pub fn shutdown(self) -> Scheduler {
        // the thread may have already exited, then there is nobody to tell
        let _ = self.shutdown.send(());
        match self.thread.join() {
            Ok(scheduler) => scheduler,
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    /// Blocks for as long as the scheduler runs.
    pub fn wait(self) {
        let Self { shutdown, thread } = self;
        if thread.join().is_err() {
            error!("scheduler thread panicked");
        }
        drop(shutdown);
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.thread.is_finished()
    }
}
