use std::collections::HashSet;

use log::info;

use crate::alarm::{AlarmTime, Day};

/// identifies one day specific ringing of an alarm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TriggerKey {
    pub day: Day,
    pub time: AlarmTime,
}

impl TriggerKey {
    #[must_use]
    pub const fn new(day: Day, time: AlarmTime) -> Self {
        Self { day, time }
    }
}

/// remembers which alarms already rang since the last reset
#[derive(Debug, Default)]
pub struct TriggerTracker {
    fired: HashSet<TriggerKey>,
}

impl TriggerTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn has_fired(&self, key: &TriggerKey) -> bool {
        self.fired.contains(key)
    }

    pub fn mark_fired(&mut self, key: TriggerKey) {
        self.fired.insert(key);
    }

    pub fn reset_all(&mut self) {
        info!("clearing {} rang alarm(s)", self.fired.len());
        self.fired.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fired.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fired.is_empty()
    }
}
