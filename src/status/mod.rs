//! Character status snapshots handed to the keepers once per tick

pub mod deferred;
pub mod reader;

use serde::{Deserialize, Serialize};

pub use deferred::{Deferred, ReadSentinel, ReadWorker};
pub use reader::{
    CharStats, EquipmentProbe, ProbeStatusReader, StatsProbe, StatusReader, StatusRecord,
    TraceStatusReader,
};

/// Identity of an item as recognised from the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemName {
    Empty,
    StoneSkinAmulet,
    ProtectionAmulet,
    ElvenAmulet,
    PlatinumAmulet,
    GarlicNecklace,
    MightRing,
    EnergyRing,
    LifeRing,
    RingOfHealing,
    TimeRing,
    /// Read succeeded but the item was not recognised
    Unknown,
    /// The read itself failed
    ReadError,
}

impl Default for ItemName {
    fn default() -> Self {
        ItemName::Empty
    }
}

impl ItemName {
    /// True when the identity is trustworthy (recognised item or empty slot)
    pub fn is_known(self) -> bool {
        !matches!(self, ItemName::Unknown | ItemName::ReadError)
    }

    /// True for a recognised, non-empty item
    pub fn is_item(self) -> bool {
        self.is_known() && self != ItemName::Empty
    }

    /// Whether `self` (worn) is the same recognised item as `other`
    ///
    /// Unknown or failed reads never match, so callers err toward re-equipping.
    pub fn matches(self, other: ItemName) -> bool {
        self.is_item() && self == other
    }
}

impl ReadSentinel for ItemName {
    fn read_error() -> Self {
        ItemName::ReadError
    }
}

/// Magic shield spell state as shown by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MagicShieldStatus {
    RecentlyCast,
    OffCooldown,
    OnCooldown,
    /// Read failed; never treated as castable
    Unknown,
}

impl Default for MagicShieldStatus {
    fn default() -> Self {
        MagicShieldStatus::OffCooldown
    }
}

impl ReadSentinel for MagicShieldStatus {
    fn read_error() -> Self {
        MagicShieldStatus::Unknown
    }
}

/// Which health potion tiers are still in stock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PotionStock {
    pub minor_health: bool,
    pub medium_health: bool,
    pub greater_health: bool,
}

impl Default for PotionStock {
    fn default() -> Self {
        Self {
            minor_health: true,
            medium_health: true,
            greater_health: true,
        }
    }
}

impl PotionStock {
    pub fn none() -> Self {
        Self {
            minor_health: false,
            medium_health: false,
            greater_health: false,
        }
    }

    pub fn any_health(&self) -> bool {
        self.minor_health || self.medium_health || self.greater_health
    }
}

impl ReadSentinel for PotionStock {
    // Drinking a depleted potion is harmless, skipping an available one is not
    fn read_error() -> Self {
        PotionStock::default()
    }
}

/// Slots read from the client for the equipment keeper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemSlot {
    EquippedAmulet,
    EquippedRing,
    EmergencyActionAmulet,
    EmergencyActionRing,
    TankActionAmulet,
    TankActionRing,
}

impl ItemSlot {
    pub const ALL: [ItemSlot; 6] = [
        ItemSlot::EquippedAmulet,
        ItemSlot::EquippedRing,
        ItemSlot::EmergencyActionAmulet,
        ItemSlot::EmergencyActionRing,
        ItemSlot::TankActionAmulet,
        ItemSlot::TankActionRing,
    ];
}

/// One tick's view of the character
///
/// Integer stats are plain memory reads. Equipment, shield status and potion
/// stock may still be computing; reading them blocks until the underlying read
/// finished or resolves to the field's error value.
#[derive(Debug)]
pub struct CharStatus {
    pub hp: i32,
    pub mana: i32,
    pub speed: i32,
    pub magic_shield_level: i32,
    pub equipped_amulet: Deferred<ItemName>,
    pub equipped_ring: Deferred<ItemName>,
    pub emergency_action_amulet: Deferred<ItemName>,
    pub emergency_action_ring: Deferred<ItemName>,
    pub tank_action_amulet: Deferred<ItemName>,
    pub tank_action_ring: Deferred<ItemName>,
    pub magic_shield_status: Deferred<MagicShieldStatus>,
    pub potions: Deferred<PotionStock>,
}

impl CharStatus {
    /// Snapshot with empty gear, shield off cooldown and full potion stock
    pub fn new(hp: i32, mana: i32, speed: i32, magic_shield_level: i32) -> Self {
        Self {
            hp,
            mana,
            speed,
            magic_shield_level,
            equipped_amulet: Deferred::ready(ItemName::Empty),
            equipped_ring: Deferred::ready(ItemName::Empty),
            emergency_action_amulet: Deferred::ready(ItemName::Empty),
            emergency_action_ring: Deferred::ready(ItemName::Empty),
            tank_action_amulet: Deferred::ready(ItemName::Empty),
            tank_action_ring: Deferred::ready(ItemName::Empty),
            magic_shield_status: Deferred::ready(MagicShieldStatus::OffCooldown),
            potions: Deferred::ready(PotionStock::default()),
        }
    }

    pub fn item(&self, slot: ItemSlot) -> ItemName {
        self.item_field(slot).get()
    }

    pub fn item_field(&self, slot: ItemSlot) -> &Deferred<ItemName> {
        match slot {
            ItemSlot::EquippedAmulet => &self.equipped_amulet,
            ItemSlot::EquippedRing => &self.equipped_ring,
            ItemSlot::EmergencyActionAmulet => &self.emergency_action_amulet,
            ItemSlot::EmergencyActionRing => &self.emergency_action_ring,
            ItemSlot::TankActionAmulet => &self.tank_action_amulet,
            ItemSlot::TankActionRing => &self.tank_action_ring,
        }
    }

    pub fn set_item(&mut self, slot: ItemSlot, field: Deferred<ItemName>) {
        match slot {
            ItemSlot::EquippedAmulet => self.equipped_amulet = field,
            ItemSlot::EquippedRing => self.equipped_ring = field,
            ItemSlot::EmergencyActionAmulet => self.emergency_action_amulet = field,
            ItemSlot::EmergencyActionRing => self.emergency_action_ring = field,
            ItemSlot::TankActionAmulet => self.tank_action_amulet = field,
            ItemSlot::TankActionRing => self.tank_action_ring = field,
        }
    }

    pub fn with_item(mut self, slot: ItemSlot, item: ItemName) -> Self {
        self.set_item(slot, Deferred::ready(item));
        self
    }

    pub fn with_magic_shield_status(mut self, status: MagicShieldStatus) -> Self {
        self.magic_shield_status = Deferred::ready(status);
        self
    }

    pub fn with_potions(mut self, potions: PotionStock) -> Self {
        self.potions = Deferred::ready(potions);
        self
    }

    pub fn magic_shield_status(&self) -> MagicShieldStatus {
        self.magic_shield_status.get()
    }

    pub fn potions(&self) -> PotionStock {
        self.potions.get()
    }
}
