//! Translation of keeper decisions into channel-tagged commands

use std::sync::Arc;

use crate::command::model::{Command, CommandType, ThrottleBehavior};
use crate::command::processor::CommandProcessor;
use crate::core::config::Hotkeys;
use crate::core::error::Result;
use crate::core::types::Millis;

/// Channel spacing for ring/amulet equips and toggles
pub const EQUIP_THROTTLE_MS: Millis = 250;
/// Channel spacing for eating food
pub const FOOD_THROTTLE_MS: Millis = 500;

/// Every abstract action a keeper can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientAction {
    MinorHeal,
    MediumHeal,
    GreaterHeal,
    DrinkMana,
    DrinkMinorHeal,
    DrinkMediumHeal,
    DrinkGreaterHeal,
    Haste,
    MagicShield,
    CancelMagicShield,
    EquipRing,
    EquipAmulet,
    ToggleEmergencyRing,
    ToggleEmergencyAmulet,
    ToggleTankRing,
    ToggleTankAmulet,
    EatFood,
}

impl ClientAction {
    pub fn cmd_type(self) -> CommandType {
        use ClientAction::*;
        match self {
            MinorHeal | MediumHeal | GreaterHeal => CommandType::HealSpell,
            Haste | MagicShield | CancelMagicShield => CommandType::UtilitySpell,
            DrinkMana | DrinkMinorHeal | DrinkMediumHeal | DrinkGreaterHeal | EatFood => {
                CommandType::UseItem
            }
            EquipRing | EquipAmulet | ToggleEmergencyRing | ToggleEmergencyAmulet
            | ToggleTankRing | ToggleTankAmulet => CommandType::EquipItem,
        }
    }

    pub fn throttle_behavior(self) -> ThrottleBehavior {
        use ClientAction::*;
        match self {
            MagicShield | ToggleEmergencyRing | ToggleEmergencyAmulet | ToggleTankRing
            | ToggleTankAmulet => ThrottleBehavior::RequeueTop,
            CancelMagicShield | EatFood => ThrottleBehavior::RequeueBack,
            _ => ThrottleBehavior::Drop,
        }
    }

    /// De-duplication key of the commands built for this action
    pub fn cmd_id(self) -> &'static str {
        use ClientAction::*;
        match self {
            MinorHeal => "minor_heal",
            MediumHeal => "medium_heal",
            GreaterHeal => "greater_heal",
            DrinkMana => "drink_mana",
            DrinkMinorHeal => "drink_minor_heal",
            DrinkMediumHeal => "drink_medium_heal",
            DrinkGreaterHeal => "drink_greater_heal",
            Haste => "haste",
            MagicShield => "magic_shield",
            CancelMagicShield => "cancel_magic_shield",
            EquipRing => "equip_ring",
            EquipAmulet => "equip_amulet",
            ToggleEmergencyRing => "toggle_emergency_ring",
            ToggleEmergencyAmulet => "toggle_emergency_amulet",
            ToggleTankRing => "toggle_tank_ring",
            ToggleTankAmulet => "toggle_tank_amulet",
            EatFood => "eat_food",
        }
    }

    fn hotkey(self, keys: &Hotkeys) -> &str {
        use ClientAction::*;
        match self {
            MinorHeal => &keys.minor_heal,
            MediumHeal => &keys.medium_heal,
            GreaterHeal => &keys.greater_heal,
            DrinkMana => &keys.mana_potion,
            DrinkMinorHeal => &keys.minor_health_potion,
            DrinkMediumHeal => &keys.medium_health_potion,
            DrinkGreaterHeal => &keys.greater_health_potion,
            Haste => &keys.haste,
            MagicShield => &keys.magic_shield,
            CancelMagicShield => &keys.cancel_magic_shield,
            EquipRing => &keys.equip_ring,
            EquipAmulet => &keys.equip_amulet,
            ToggleEmergencyRing => &keys.emergency_ring,
            ToggleEmergencyAmulet => &keys.emergency_amulet,
            ToggleTankRing => &keys.tank_ring,
            ToggleTankAmulet => &keys.tank_amulet,
            EatFood => &keys.eat_food,
        }
    }
}

/// The keepers' only way of acting on the game
///
/// Implementors provide [`GameClient::request`]; the named methods are the
/// vocabulary keepers are written against.
pub trait GameClient: Send + Sync {
    fn request(&self, action: ClientAction, throttle_ms: Millis) -> Result<()>;

    fn cast_minor_heal(&self, throttle_ms: Millis) -> Result<()> {
        self.request(ClientAction::MinorHeal, throttle_ms)
    }

    fn cast_medium_heal(&self, throttle_ms: Millis) -> Result<()> {
        self.request(ClientAction::MediumHeal, throttle_ms)
    }

    fn cast_greater_heal(&self, throttle_ms: Millis) -> Result<()> {
        self.request(ClientAction::GreaterHeal, throttle_ms)
    }

    fn drink_mana(&self, throttle_ms: Millis) -> Result<()> {
        self.request(ClientAction::DrinkMana, throttle_ms)
    }

    fn drink_minor_heal(&self, throttle_ms: Millis) -> Result<()> {
        self.request(ClientAction::DrinkMinorHeal, throttle_ms)
    }

    fn drink_medium_heal(&self, throttle_ms: Millis) -> Result<()> {
        self.request(ClientAction::DrinkMediumHeal, throttle_ms)
    }

    fn drink_greater_heal(&self, throttle_ms: Millis) -> Result<()> {
        self.request(ClientAction::DrinkGreaterHeal, throttle_ms)
    }

    fn cast_haste(&self, throttle_ms: Millis) -> Result<()> {
        self.request(ClientAction::Haste, throttle_ms)
    }

    fn cast_magic_shield(&self, throttle_ms: Millis) -> Result<()> {
        self.request(ClientAction::MagicShield, throttle_ms)
    }

    fn cancel_magic_shield(&self, throttle_ms: Millis) -> Result<()> {
        self.request(ClientAction::CancelMagicShield, throttle_ms)
    }

    fn equip_ring(&self) -> Result<()> {
        self.request(ClientAction::EquipRing, EQUIP_THROTTLE_MS)
    }

    fn equip_amulet(&self) -> Result<()> {
        self.request(ClientAction::EquipAmulet, EQUIP_THROTTLE_MS)
    }

    fn toggle_emergency_ring(&self) -> Result<()> {
        self.request(ClientAction::ToggleEmergencyRing, EQUIP_THROTTLE_MS)
    }

    fn toggle_emergency_amulet(&self) -> Result<()> {
        self.request(ClientAction::ToggleEmergencyAmulet, EQUIP_THROTTLE_MS)
    }

    fn toggle_tank_ring(&self) -> Result<()> {
        self.request(ClientAction::ToggleTankRing, EQUIP_THROTTLE_MS)
    }

    fn toggle_tank_amulet(&self) -> Result<()> {
        self.request(ClientAction::ToggleTankAmulet, EQUIP_THROTTLE_MS)
    }

    fn eat_food(&self) -> Result<()> {
        self.request(ClientAction::EatFood, FOOD_THROTTLE_MS)
    }
}

/// [`GameClient`] backed by the command processor
pub struct ClientInterface {
    hotkeys: Hotkeys,
    processor: Arc<CommandProcessor>,
}

impl ClientInterface {
    pub fn new(hotkeys: Hotkeys, processor: Arc<CommandProcessor>) -> Self {
        Self { hotkeys, processor }
    }

    pub fn command_for(&self, action: ClientAction, throttle_ms: Millis) -> Command {
        Command::hotkey(
            action.cmd_type(),
            action.cmd_id(),
            throttle_ms,
            action.throttle_behavior(),
            action.hotkey(&self.hotkeys),
        )
    }

    pub fn processor(&self) -> &Arc<CommandProcessor> {
        &self.processor
    }
}

impl GameClient for ClientInterface {
    fn request(&self, action: ClientAction, throttle_ms: Millis) -> Result<()> {
        self.processor.send(self.command_for(action, throttle_ms))
    }
}
