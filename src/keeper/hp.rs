//! Heal spell policy

use std::sync::Arc;

use crate::command::GameClient;
use crate::core::config::HpConfig;
use crate::core::error::Result;
use crate::keeper::modes::Modes;
use crate::keeper::thresholds::{ThresholdCalculator, ThrottleMap};
use crate::keeper::InferredMax;
use crate::status::CharStatus;

/// Heal spell tier chosen for a given HP deficit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealTier {
    Minor,
    Medium,
    Greater,
}

pub struct HpKeeper {
    client: Arc<dyn GameClient>,
    config: HpConfig,
    calculator: ThresholdCalculator,
    total_hp: InferredMax,
    emergency_hp_threshold: i32,
}

impl HpKeeper {
    pub fn new(
        client: Arc<dyn GameClient>,
        config: HpConfig,
        throttle: ThrottleMap,
        total_hp: i32,
        emergency_hp_threshold: i32,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            client,
            calculator: ThresholdCalculator::new(config.bands, throttle),
            config,
            total_hp: InferredMax::new(total_hp),
            emergency_hp_threshold,
        })
    }

    pub fn total_hp(&self) -> i32 {
        self.total_hp.get()
    }

    fn missing(&self, status: &CharStatus) -> i32 {
        self.total_hp.get() - status.hp
    }

    pub fn heal_tier(&self, missing: i32) -> HealTier {
        if missing <= self.config.minor_heal {
            HealTier::Minor
        } else if missing <= self.config.medium_heal {
            HealTier::Medium
        } else {
            HealTier::Greater
        }
    }

    pub fn handle_status_change(
        &mut self,
        status: &CharStatus,
        is_downtime: bool,
        modes: &Modes,
    ) -> Result<()> {
        self.total_hp.observe(status.hp);
        let missing = self.missing(status);
        let throttle = self.calculator.throttle();

        if missing >= self.config.heal_at_missing {
            if modes.emergency.is_mode_on() {
                tracing::debug!(hp = status.hp, missing, "Emergency heal");
                return self.client.cast_greater_heal(throttle.critical_ms);
            }

            // Above the downtime band the curve yields the no-refill duration
            let throttle_ms = self
                .calculator
                .gen_threshold_ms(status.hp)
                .min(throttle.downtime_ms);
            let tier = self.heal_tier(missing);
            tracing::debug!(hp = status.hp, missing, ?tier, throttle_ms, "Heal");
            match tier {
                HealTier::Minor => self.client.cast_minor_heal(throttle_ms),
                HealTier::Medium => self.client.cast_medium_heal(throttle_ms),
                HealTier::Greater => self.client.cast_greater_heal(throttle_ms),
            }
        } else if is_downtime && missing >= self.config.downtime_heal_at_missing {
            tracing::debug!(hp = status.hp, missing, "Downtime heal");
            self.client.cast_minor_heal(throttle.downtime_ms)
        } else {
            Ok(())
        }
    }

    pub fn is_healthy(&self, status: &CharStatus) -> bool {
        self.missing(status) < self.config.heal_at_missing
    }

    pub fn is_critical_hp(&self, hp: i32) -> bool {
        hp <= self.emergency_hp_threshold
    }
}
