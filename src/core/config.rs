//! Bot configuration loaded from TOML
//!
//! Every tunable threshold of the keepers is collected here. The file is
//! deserialized with serde and validated once, before any keeper is built, so a
//! bad value aborts startup instead of surfacing mid-fight.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{BotError, Result};
use crate::core::types::{ShieldType, Vocation};
use crate::keeper::knight::PotionProbabilities;
use crate::keeper::thresholds::{StatConfig, ThrottleMap};
use crate::status::ItemName;

/// Complete bot configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotConfig {
    pub character: CharacterConfig,
    pub hp: HpConfig,
    /// Mana bands for the mage mana keeper
    pub mana: StatConfig,
    /// Required for knights, ignored otherwise
    #[serde(default)]
    pub knight: Option<KnightConfig>,
    #[serde(default)]
    pub equipment: EquipmentConfig,
    #[serde(default)]
    pub throttle: ThrottleConfig,
    #[serde(default)]
    pub hotkeys: Hotkeys,
}

fn default_shield_type() -> ShieldType {
    ShieldType::None
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterConfig {
    pub vocation: Vocation,

    /// Starting guess for max HP; raised whenever a higher HP is observed
    pub total_hp: i32,

    /// Starting guess for max mana
    pub total_mana: i32,

    /// Speed without any buff. Anything below means paralyzed.
    pub base_speed: i32,

    /// Speed while hasted
    pub hasted_speed: i32,

    #[serde(default = "default_shield_type")]
    pub magic_shield_type: ShieldType,

    /// Shield charge at or below which the shield is recast
    #[serde(default)]
    pub magic_shield_threshold: i32,

    /// HP at or below which emergency mode starts
    pub emergency_hp_threshold: i32,
}

/// Heal spell policy
///
/// Heal tiers are compared against the missing HP in ascending order:
/// missing up to `minor_heal` casts the minor heal, up to `medium_heal` the
/// medium heal, anything above the greater heal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HpConfig {
    /// Missing HP at which healing starts
    pub heal_at_missing: i32,

    /// Missing HP worth topping off while in downtime
    pub downtime_heal_at_missing: i32,

    pub minor_heal: i32,
    pub medium_heal: i32,
    /// Deficit one greater heal restores; only bounds the tier ladder, since
    /// deficits beyond it still get the greater heal
    pub greater_heal: i32,

    /// HP bands driving the heal throttle curve
    pub bands: StatConfig,
}

impl HpConfig {
    pub fn validate(&self) -> Result<()> {
        if self.heal_at_missing <= 0 || self.downtime_heal_at_missing <= 0 {
            return Err(BotError::Config(format!(
                "heal_at_missing and downtime_heal_at_missing must be positive, got {} / {}",
                self.heal_at_missing, self.downtime_heal_at_missing
            )));
        }
        if !(self.minor_heal < self.medium_heal && self.medium_heal < self.greater_heal) {
            return Err(BotError::Config(format!(
                "heal tiers must be ascending, got {} / {} / {}",
                self.minor_heal, self.medium_heal, self.greater_heal
            )));
        }
        Ok(())
    }
}

/// Knight potion policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnightConfig {
    pub hp: StatConfig,
    pub mana: StatConfig,

    /// Probability of choosing an HP potion over a mana potion
    #[serde(default)]
    pub probabilities: PotionProbabilities,

    /// Fixed seed for the potion choice; entropy when absent
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

/// Gear kept equipped per mode
///
/// Normal gear is named explicitly. Tank and emergency gear is whatever sits
/// on the corresponding action bar slot; the flags enable those slots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EquipmentConfig {
    pub ring: Option<ItemName>,
    pub amulet: Option<ItemName>,
    pub emergency_ring: bool,
    pub emergency_amulet: bool,
    pub tank_ring: bool,
    pub tank_amulet: bool,
    pub eat_food: bool,
}

impl EquipmentConfig {
    /// False when the equipment keeper would never act
    pub fn is_enabled(&self) -> bool {
        self.ring.is_some()
            || self.amulet.is_some()
            || self.emergency_ring
            || self.emergency_amulet
            || self.tank_ring
            || self.tank_amulet
            || self.eat_food
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Heal spells
    pub hp: ThrottleMap,
    /// Mage mana potions
    pub mana: ThrottleMap,
    /// Knight potions
    pub potion: ThrottleMap,
}

/// Key sent for each abstract action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hotkeys {
    pub minor_heal: String,
    pub medium_heal: String,
    pub greater_heal: String,
    pub mana_potion: String,
    pub minor_health_potion: String,
    pub medium_health_potion: String,
    pub greater_health_potion: String,
    pub haste: String,
    pub magic_shield: String,
    pub cancel_magic_shield: String,
    pub equip_ring: String,
    pub equip_amulet: String,
    pub emergency_ring: String,
    pub emergency_amulet: String,
    pub tank_ring: String,
    pub tank_amulet: String,
    pub eat_food: String,
}

impl Default for Hotkeys {
    fn default() -> Self {
        Self {
            minor_heal: "F1".into(),
            medium_heal: "F2".into(),
            greater_heal: "F3".into(),
            mana_potion: "F4".into(),
            minor_health_potion: "F5".into(),
            medium_health_potion: "F6".into(),
            greater_health_potion: "F7".into(),
            haste: "F8".into(),
            magic_shield: "F9".into(),
            cancel_magic_shield: "F10".into(),
            equip_ring: "F11".into(),
            equip_amulet: "F12".into(),
            emergency_ring: "shift+F1".into(),
            emergency_amulet: "shift+F2".into(),
            tank_ring: "shift+F3".into(),
            tank_amulet: "shift+F4".into(),
            eat_food: "shift+F5".into(),
        }
    }
}

impl Hotkeys {
    fn entries(&self) -> [(&'static str, &str); 17] {
        [
            ("minor_heal", &self.minor_heal),
            ("medium_heal", &self.medium_heal),
            ("greater_heal", &self.greater_heal),
            ("mana_potion", &self.mana_potion),
            ("minor_health_potion", &self.minor_health_potion),
            ("medium_health_potion", &self.medium_health_potion),
            ("greater_health_potion", &self.greater_health_potion),
            ("haste", &self.haste),
            ("magic_shield", &self.magic_shield),
            ("cancel_magic_shield", &self.cancel_magic_shield),
            ("equip_ring", &self.equip_ring),
            ("equip_amulet", &self.equip_amulet),
            ("emergency_ring", &self.emergency_ring),
            ("emergency_amulet", &self.emergency_amulet),
            ("tank_ring", &self.tank_ring),
            ("tank_amulet", &self.tank_amulet),
            ("eat_food", &self.eat_food),
        ]
    }

    pub fn validate(&self) -> Result<()> {
        match self.entries().iter().find(|(_, key)| key.trim().is_empty()) {
            Some((name, _)) => Err(BotError::Config(format!("hotkey '{}' is empty", name))),
            None => Ok(()),
        }
    }
}

impl BotConfig {
    /// Read, parse and validate a TOML configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&contents)?;
        tracing::info!(
            path = %path.as_ref().display(),
            vocation = %config.character.vocation,
            shield = %config.character.magic_shield_type,
            "Loaded configuration"
        );
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: BotConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints serde cannot express
    pub fn validate(&self) -> Result<()> {
        let character = &self.character;
        if character.total_hp <= 0 || character.total_mana <= 0 {
            return Err(BotError::Config(format!(
                "total_hp and total_mana must be positive, got {} / {}",
                character.total_hp, character.total_mana
            )));
        }
        if character.base_speed <= 0 || character.hasted_speed <= character.base_speed {
            return Err(BotError::Config(format!(
                "expected 0 < base_speed < hasted_speed, got {} / {}",
                character.base_speed, character.hasted_speed
            )));
        }
        if character.emergency_hp_threshold <= 0
            || character.emergency_hp_threshold >= character.total_hp
        {
            return Err(BotError::Config(format!(
                "emergency_hp_threshold must lie in (0, total_hp), got {}",
                character.emergency_hp_threshold
            )));
        }
        if character.magic_shield_threshold < 0 {
            return Err(BotError::Config("magic_shield_threshold must not be negative".into()));
        }

        self.hp.validate()?;

        self.throttle.hp.validate("hp")?;
        self.throttle.mana.validate("mana")?;
        self.throttle.potion.validate("potion")?;

        if character.vocation == Vocation::Knight {
            let knight = self.knight.as_ref().ok_or(BotError::MissingPotionThresholds)?;
            knight.probabilities.validate()?;
        }

        self.hotkeys.validate()
    }
}
