//! Per-tick orchestration of all keepers
//!
//! Order within a tick is fixed: emergency transition, HP, shield, mana,
//! equipment, speed. Shield and haste share a cooldown, so the shield runs
//! before the equipment reads and haste runs last under explicit skip rules.

use std::sync::Arc;

use crate::core::error::Result;
use crate::core::types::Clock;
use crate::keeper::hp::HpKeeper;
use crate::keeper::modes::{Modes, SimpleModeReporter};
use crate::keeper::speed::SpeedKeeper;
use crate::keeper::{EquipmentKeeping, ManaKeeping, ShieldKeeping};
use crate::status::CharStatus;

pub struct CharKeeper {
    clock: Arc<dyn Clock>,
    modes: Modes,
    hp: HpKeeper,
    shield: Box<dyn ShieldKeeping>,
    mana: Box<dyn ManaKeeping>,
    equipment: Box<dyn EquipmentKeeping>,
    speed: SpeedKeeper,
}

impl CharKeeper {
    pub fn new(
        clock: Arc<dyn Clock>,
        modes: Modes,
        hp: HpKeeper,
        shield: Box<dyn ShieldKeeping>,
        mana: Box<dyn ManaKeeping>,
        equipment: Box<dyn EquipmentKeeping>,
        speed: SpeedKeeper,
    ) -> Self {
        Self {
            clock,
            modes,
            hp,
            shield,
            mana,
            equipment,
            speed,
        }
    }

    pub fn modes(&self) -> &Modes {
        &self.modes
    }

    /// Handle for switching tank mode by hand
    pub fn tank_mode(&self) -> SimpleModeReporter {
        self.modes.tank.clone()
    }

    /// Handle for forcing emergency mode by hand
    pub fn emergency_override(&self) -> SimpleModeReporter {
        self.modes.emergency.override_reporter()
    }

    /// Safe enough for low-urgency top-offs
    pub fn is_downtime(&self, status: &CharStatus) -> bool {
        self.speed.is_hasted(status)
            && self.hp.is_healthy(status)
            && self.mana.is_healthy(status)
            && !self.modes.emergency.is_mode_on()
    }

    pub fn should_skip_haste(&self, status: &CharStatus) -> bool {
        let critical_hp = self.hp.is_critical_hp(status.hp)
            && !self.shield.is_healthy(status, &self.modes);
        let critical_mana = self.mana.is_critical_mana(status) && !self.speed.is_paralyzed(status);
        critical_hp || critical_mana || self.shield.should_cast(status, &self.modes)
    }

    pub fn handle_status_change(&mut self, status: &CharStatus) -> Result<()> {
        let was_emergency = self.modes.emergency.is_mode_on();
        self.modes.update_emergency(status, self.clock.now());
        if was_emergency != self.modes.emergency.is_mode_on() {
            tracing::info!(
                hp = status.hp,
                mana = status.mana,
                emergency = self.modes.emergency.is_mode_on(),
                "Emergency transition"
            );
        }

        let is_downtime = self.is_downtime(status);
        tracing::debug!(
            hp = status.hp,
            mana = status.mana,
            speed = status.speed,
            charge = status.magic_shield_level,
            is_downtime,
            "Tick"
        );

        self.hp.handle_status_change(status, is_downtime, &self.modes)?;
        self.shield.handle_status_change(status, &self.modes)?;
        self.mana.handle_status_change(status, is_downtime)?;
        self.equipment.handle_status_change(status, &self.modes)?;

        if self.should_skip_haste(status) {
            tracing::debug!("Skipping haste this tick");
            Ok(())
        } else {
            self.speed.handle_status_change(status)
        }
    }
}
