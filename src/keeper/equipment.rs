//! Ring, amulet and food upkeep across normal, tank and emergency modes
//!
//! Each mode has an [`EquipmentModeManager`] holding, per slot, where that
//! mode's gear comes from. Normal gear is a named item equipped with the equip
//! hotkey. Tank and emergency gear is whatever sits on the matching action bar
//! slot and is worn or removed by toggling that slot. A slot with no emergency
//! gear falls back to tank gear, then to normal gear.
//!
//! On a mode change, toggled gear of the mode being left is taken off first;
//! the next mode's gear is only put on once no stale gear is worn.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::command::GameClient;
use crate::core::config::EquipmentConfig;
use crate::core::error::Result;
use crate::core::types::{millis_since, Clock, Millis};
use crate::keeper::modes::Modes;
use crate::keeper::EquipmentKeeping;
use crate::status::{CharStatus, ItemName, ItemSlot};

/// Minimum spacing between two presses for the same slot
pub const RETOGGLE_INTERVAL_MS: Millis = 250;
pub const FOOD_INTERVAL_MS: Millis = 60_000;
pub const FOOD_ADVANCE_MS: Millis = 9_000;
pub const FOOD_ROTATION: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EquipmentMode {
    Normal,
    Tank,
    Emergency,
}

impl EquipmentMode {
    pub fn from_modes(modes: &Modes) -> Self {
        if modes.emergency.is_mode_on() {
            EquipmentMode::Emergency
        } else if modes.tank.is_mode_on() {
            EquipmentMode::Tank
        } else {
            EquipmentMode::Normal
        }
    }

    fn index(self) -> usize {
        match self {
            EquipmentMode::Normal => 0,
            EquipmentMode::Tank => 1,
            EquipmentMode::Emergency => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Ring,
    Amulet,
}

impl Slot {
    const BOTH: [Slot; 2] = [Slot::Ring, Slot::Amulet];

    fn equipped(self) -> ItemSlot {
        match self {
            Slot::Ring => ItemSlot::EquippedRing,
            Slot::Amulet => ItemSlot::EquippedAmulet,
        }
    }
}

/// Where a mode's gear for one slot comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GearSource {
    None,
    Named(ItemName),
    TankSlot,
    EmergencySlot,
}

impl GearSource {
    fn resolve(mode: EquipmentMode, slot: Slot, config: &EquipmentConfig) -> GearSource {
        let (named, tank, emergency) = match slot {
            Slot::Ring => (config.ring, config.tank_ring, config.emergency_ring),
            Slot::Amulet => (config.amulet, config.tank_amulet, config.emergency_amulet),
        };
        let normal = named.map_or(GearSource::None, GearSource::Named);
        match mode {
            EquipmentMode::Emergency if emergency => GearSource::EmergencySlot,
            EquipmentMode::Emergency | EquipmentMode::Tank if tank => GearSource::TankSlot,
            _ => normal,
        }
    }

    fn is_toggle(self) -> bool {
        matches!(self, GearSource::TankSlot | GearSource::EmergencySlot)
    }

    /// Item this source wants worn, if it can tell
    fn desired(self, slot: Slot, status: &CharStatus) -> Option<ItemName> {
        let item = match (self, slot) {
            (GearSource::None, _) => return None,
            (GearSource::Named(item), _) => item,
            (GearSource::TankSlot, Slot::Ring) => status.item(ItemSlot::TankActionRing),
            (GearSource::TankSlot, Slot::Amulet) => status.item(ItemSlot::TankActionAmulet),
            (GearSource::EmergencySlot, Slot::Ring) => status.item(ItemSlot::EmergencyActionRing),
            (GearSource::EmergencySlot, Slot::Amulet) => {
                status.item(ItemSlot::EmergencyActionAmulet)
            }
        };
        item.is_item().then_some(item)
    }

    fn press(self, slot: Slot, client: &dyn GameClient) -> Result<()> {
        match (self, slot) {
            (GearSource::None, _) => Ok(()),
            (GearSource::Named(_), Slot::Ring) => client.equip_ring(),
            (GearSource::Named(_), Slot::Amulet) => client.equip_amulet(),
            (GearSource::TankSlot, Slot::Ring) => client.toggle_tank_ring(),
            (GearSource::TankSlot, Slot::Amulet) => client.toggle_tank_amulet(),
            (GearSource::EmergencySlot, Slot::Ring) => client.toggle_emergency_ring(),
            (GearSource::EmergencySlot, Slot::Amulet) => client.toggle_emergency_amulet(),
        }
    }
}

#[derive(Debug)]
struct SlotManager {
    slot: Slot,
    source: GearSource,
    last_press: Option<Instant>,
}

impl SlotManager {
    fn is_worn(&self, status: &CharStatus) -> bool {
        match self.source.desired(self.slot, status) {
            Some(item) => status.item(self.slot.equipped()).matches(item),
            None => false,
        }
    }

    fn is_satisfied(&self, status: &CharStatus) -> bool {
        self.source.desired(self.slot, status).is_none() || self.is_worn(status)
    }

    fn press(&mut self, client: &dyn GameClient, now: Instant) -> Result<()> {
        let ready = millis_since(now, self.last_press).map_or(true, |ms| ms >= RETOGGLE_INTERVAL_MS);
        if !ready {
            return Ok(());
        }
        self.last_press = Some(now);
        self.source.press(self.slot, client)
    }
}

/// Gear upkeep for a single mode
#[derive(Debug)]
pub struct EquipmentModeManager {
    mode: EquipmentMode,
    ring: SlotManager,
    amulet: SlotManager,
}

impl EquipmentModeManager {
    pub fn new(mode: EquipmentMode, config: &EquipmentConfig) -> Self {
        let slot = |slot| SlotManager {
            slot,
            source: GearSource::resolve(mode, slot, config),
            last_press: None,
        };
        Self {
            mode,
            ring: slot(Slot::Ring),
            amulet: slot(Slot::Amulet),
        }
    }

    pub fn mode(&self) -> EquipmentMode {
        self.mode
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut SlotManager {
        match slot {
            Slot::Ring => &mut self.ring,
            Slot::Amulet => &mut self.amulet,
        }
    }

    fn source(&self, slot: Slot) -> GearSource {
        match slot {
            Slot::Ring => self.ring.source,
            Slot::Amulet => self.amulet.source,
        }
    }

    /// Every configured slot is wearing this mode's gear
    pub fn is_in_mode(&self, status: &CharStatus) -> bool {
        self.ring.is_satisfied(status) && self.amulet.is_satisfied(status)
    }

    fn maintain(&mut self, status: &CharStatus, client: &dyn GameClient, now: Instant) -> Result<()> {
        let mode = self.mode;
        for slot in Slot::BOTH {
            let manager = self.slot_mut(slot);
            if !manager.is_satisfied(status) {
                tracing::debug!(?mode, ?slot, "Equipping");
                manager.press(client, now)?;
            }
        }
        Ok(())
    }

    /// Take off toggled gear the next mode does not use; true while some is still worn
    fn release(
        &mut self,
        status: &CharStatus,
        client: &dyn GameClient,
        now: Instant,
        next: [GearSource; 2],
    ) -> Result<bool> {
        let mode = self.mode;
        let mut stale = false;
        for (slot, next_source) in Slot::BOTH.into_iter().zip(next) {
            let manager = self.slot_mut(slot);
            if manager.source.is_toggle() && manager.source != next_source && manager.is_worn(status) {
                tracing::debug!(?mode, ?slot, "Removing gear of previous mode");
                manager.press(client, now)?;
                stale = true;
            }
        }
        Ok(stale)
    }
}

/// Eats on a 60 s cadence with a four-step rotation
///
/// Each meal moves the reference time forward by 9 s, except every fourth,
/// which resets it to now.
#[derive(Debug, Default)]
struct FoodTimer {
    last: Option<Instant>,
    count: u32,
}

impl FoodTimer {
    fn is_due(&mut self, now: Instant) -> bool {
        let due = millis_since(now, self.last).map_or(true, |ms| ms >= FOOD_INTERVAL_MS);
        if !due {
            return false;
        }
        self.count += 1;
        if self.count >= FOOD_ROTATION {
            self.count = 0;
            self.last = Some(now);
        } else {
            self.last = Some(
                self.last
                    .map_or(now, |ts| ts + Duration::from_millis(FOOD_ADVANCE_MS)),
            );
        }
        true
    }
}

pub struct EquipmentKeeper {
    client: Arc<dyn GameClient>,
    clock: Arc<dyn Clock>,
    managers: [EquipmentModeManager; 3],
    mode: EquipmentMode,
    leaving: Option<EquipmentMode>,
    eat_food: bool,
    food: FoodTimer,
}

impl EquipmentKeeper {
    pub fn new(client: Arc<dyn GameClient>, clock: Arc<dyn Clock>, config: &EquipmentConfig) -> Self {
        Self {
            client,
            clock,
            managers: [
                EquipmentModeManager::new(EquipmentMode::Normal, config),
                EquipmentModeManager::new(EquipmentMode::Tank, config),
                EquipmentModeManager::new(EquipmentMode::Emergency, config),
            ],
            mode: EquipmentMode::Normal,
            leaving: None,
            eat_food: config.eat_food,
            food: FoodTimer::default(),
        }
    }

    pub fn mode(&self) -> EquipmentMode {
        self.mode
    }

    pub fn manager(&self, mode: EquipmentMode) -> &EquipmentModeManager {
        &self.managers[mode.index()]
    }

    pub fn get_next_mode(&self, modes: &Modes) -> EquipmentMode {
        EquipmentMode::from_modes(modes)
    }
}

impl EquipmentKeeping for EquipmentKeeper {
    fn handle_status_change(&mut self, status: &CharStatus, modes: &Modes) -> Result<()> {
        let now = self.clock.now();

        if self.eat_food && self.food.is_due(now) {
            self.client.eat_food()?;
        }

        let next = self.get_next_mode(modes);
        if next != self.mode {
            tracing::info!(from = ?self.mode, to = ?next, "Equipment mode changed");
            self.leaving.get_or_insert(self.mode);
            self.mode = next;
        }

        if let Some(previous) = self.leaving {
            let current = &self.managers[self.mode.index()];
            let next_sources = [current.source(Slot::Ring), current.source(Slot::Amulet)];
            let stale = self.managers[previous.index()].release(
                status,
                self.client.as_ref(),
                now,
                next_sources,
            )?;
            if stale {
                return Ok(());
            }
            self.leaving = None;
        }

        self.managers[self.mode.index()].maintain(status, self.client.as_ref(), now)
    }
}

/// Nothing to keep equipped
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEquipmentKeeper;

impl EquipmentKeeping for NoopEquipmentKeeper {
    fn handle_status_change(&mut self, _status: &CharStatus, _modes: &Modes) -> Result<()> {
        Ok(())
    }
}
