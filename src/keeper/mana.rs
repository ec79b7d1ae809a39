//! Mage mana potion policy with latched urgency

use std::sync::Arc;

use crate::command::GameClient;
use crate::core::error::Result;
use crate::keeper::thresholds::{StatConfig, ThresholdCalculator, ThrottleMap};
use crate::keeper::{InferredMax, ManaKeeping};
use crate::status::CharStatus;

/// Latched mana urgency
///
/// Transitions, with bands `critical < lo < hi`:
/// - `Normal -> HighPriority` at `mana <= lo`
/// - any state `-> Critical` at `mana <= critical`
/// - `HighPriority | Critical -> Normal` once `mana >= hi`
///
/// Between `lo` and `hi` the previous urgency is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManaUrgency {
    #[default]
    Normal,
    HighPriority,
    Critical,
}

impl ManaUrgency {
    pub fn next(self, mana: i32, config: &StatConfig) -> ManaUrgency {
        if mana <= config.critical() {
            return ManaUrgency::Critical;
        }
        match self {
            ManaUrgency::Critical | ManaUrgency::HighPriority if mana < config.hi() => self,
            _ if mana <= config.lo() => ManaUrgency::HighPriority,
            _ => ManaUrgency::Normal,
        }
    }
}

pub struct ManaKeeper {
    client: Arc<dyn GameClient>,
    calculator: ThresholdCalculator,
    total_mana: InferredMax,
    urgency: ManaUrgency,
}

impl ManaKeeper {
    pub fn new(client: Arc<dyn GameClient>, config: StatConfig, throttle: ThrottleMap, total_mana: i32) -> Self {
        Self {
            client,
            calculator: ThresholdCalculator::new(config, throttle),
            total_mana: InferredMax::new(total_mana),
            urgency: ManaUrgency::Normal,
        }
    }

    pub fn urgency(&self) -> ManaUrgency {
        self.urgency
    }

    pub fn total_mana(&self) -> i32 {
        self.total_mana.get()
    }

    fn config(&self) -> &StatConfig {
        self.calculator.config()
    }
}

impl ManaKeeping for ManaKeeper {
    fn handle_status_change(&mut self, status: &CharStatus, is_downtime: bool) -> Result<()> {
        self.total_mana.observe(status.mana);
        let previous = self.urgency;
        self.urgency = previous.next(status.mana, self.config());
        if previous != self.urgency {
            tracing::debug!(mana = status.mana, from = ?previous, to = ?self.urgency, "Mana urgency changed");
        }

        match self.urgency {
            ManaUrgency::Critical => self
                .client
                .drink_mana(self.calculator.throttle().critical_ms),
            ManaUrgency::HighPriority => self
                .client
                .drink_mana(self.calculator.gen_threshold_ms(status.mana)),
            ManaUrgency::Normal if is_downtime && status.mana <= self.config().downtime() => self
                .client
                .drink_mana(self.calculator.gen_threshold_ms(status.mana)),
            ManaUrgency::Normal => Ok(()),
        }
    }

    fn is_healthy(&self, status: &CharStatus) -> bool {
        self.urgency == ManaUrgency::Normal && status.mana > self.config().lo()
    }

    fn is_critical_mana(&self, status: &CharStatus) -> bool {
        status.mana <= self.config().critical()
    }
}
