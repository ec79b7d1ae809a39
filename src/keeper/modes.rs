//! Emergency and tank mode flags shared by the keepers

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::core::types::{millis_since, Millis};
use crate::status::CharStatus;

/// Time an emergency must last before it may end automatically
pub const EMERGENCY_SETTLE_MS: Millis = 6_000;

/// A named on/off flag
///
/// Clones share the flag, so a handle can be given to whatever toggles the
/// mode by hand (hotkey listener, UI) while the keepers read it each tick.
#[derive(Debug, Clone)]
pub struct SimpleModeReporter {
    name: &'static str,
    flag: Arc<AtomicBool>,
}

impl SimpleModeReporter {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_mode_on(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    pub fn start_mode(&self) {
        if !self.flag.swap(true, Ordering::AcqRel) {
            tracing::info!(mode = self.name, "Mode started");
        }
    }

    pub fn stop_mode(&self) {
        if self.flag.swap(false, Ordering::AcqRel) {
            tracing::info!(mode = self.name, "Mode stopped");
        }
    }
}

/// Emergency flag with status-driven entry and a settle delay before exit
///
/// Max HP is inferred from the highest HP observed. A manual override keeps
/// emergency on and blocks the automatic stop until the override is released.
#[derive(Debug)]
pub struct EmergencyReporter {
    auto: SimpleModeReporter,
    manual: SimpleModeReporter,
    hp_threshold: i32,
    mana_lo: i32,
    observed_max_hp: i32,
    started_at: Option<Instant>,
}

impl EmergencyReporter {
    pub fn new(hp_threshold: i32, mana_lo: i32) -> Self {
        Self {
            auto: SimpleModeReporter::new("emergency"),
            manual: SimpleModeReporter::new("emergency_override"),
            hp_threshold,
            mana_lo,
            observed_max_hp: 0,
            started_at: None,
        }
    }

    /// Whether this status calls for emergency; records the HP peak
    pub fn is_emergency(&mut self, status: &CharStatus) -> bool {
        self.observed_max_hp = self.observed_max_hp.max(status.hp);
        status.hp <= self.hp_threshold
    }

    pub fn is_mode_on(&self) -> bool {
        self.auto.is_mode_on() || self.manual.is_mode_on()
    }

    pub fn start_mode(&mut self, now: Instant) {
        if self.auto.is_mode_on() {
            return;
        }
        self.started_at = Some(now);
        self.auto.start_mode();
    }

    pub fn stop_mode(&mut self) {
        self.started_at = None;
        self.auto.stop_mode();
    }

    pub fn should_stop_emergency(&self, status: &CharStatus, now: Instant) -> bool {
        if self.manual.is_mode_on() {
            return false;
        }
        if !self.auto.is_mode_on() {
            return true;
        }
        let settled = millis_since(now, self.started_at).map_or(true, |ms| ms >= EMERGENCY_SETTLE_MS);
        status.hp >= self.observed_max_hp && status.mana > self.mana_lo && settled
    }

    /// Handle for forcing emergency by hand
    pub fn override_reporter(&self) -> SimpleModeReporter {
        self.manual.clone()
    }

    pub fn observed_max_hp(&self) -> i32 {
        self.observed_max_hp
    }
}

/// Mode flags handed to every keeper for one tick
#[derive(Debug)]
pub struct Modes {
    pub emergency: EmergencyReporter,
    pub tank: SimpleModeReporter,
}

impl Modes {
    pub fn new(emergency_hp_threshold: i32, mana_lo: i32) -> Self {
        Self {
            emergency: EmergencyReporter::new(emergency_hp_threshold, mana_lo),
            tank: SimpleModeReporter::new("tank"),
        }
    }

    /// Per-tick emergency transition: start when breached, stop once safe and settled
    pub fn update_emergency(&mut self, status: &CharStatus, now: Instant) {
        if self.emergency.is_emergency(status) {
            self.emergency.start_mode(now);
        } else if self.emergency.auto.is_mode_on()
            && self.emergency.should_stop_emergency(status, now)
        {
            self.emergency.stop_mode();
        }
    }

    pub fn is_emergency_or_tank(&self) -> bool {
        self.emergency.is_mode_on() || self.tank.is_mode_on()
    }
}
