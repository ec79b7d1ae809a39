//! Keepers: per-stat policy engines driven once per status tick
//!
//! Each keeper looks at the current [`CharStatus`] and asks the
//! [`GameClient`](crate::command::GameClient) for actions. The mana, shield and
//! equipment concerns come in several shapes selected once at startup; they are
//! held behind the capability traits below.

pub mod char_keeper;
pub mod equipment;
pub mod hp;
pub mod knight;
pub mod mana;
pub mod modes;
pub mod shield;
pub mod speed;
pub mod thresholds;

pub use char_keeper::CharKeeper;
pub use equipment::{EquipmentKeeper, EquipmentMode, NoopEquipmentKeeper};
pub use hp::HpKeeper;
pub use knight::{KnightPotionKeeper, KnightPrioritiesStrategy, PotionProbabilities};
pub use mana::{ManaKeeper, ManaUrgency};
pub use modes::{EmergencyReporter, Modes, SimpleModeReporter};
pub use shield::{MagicShieldKeeper, NoShieldKeeper, ProtectorKeeper, ShieldPolicy};
pub use speed::SpeedKeeper;
pub use thresholds::{RefillPriority, StatConfig, ThresholdCalculator, ThrottleMap};

use crate::core::error::Result;
use crate::status::CharStatus;

/// Maximum of a stat inferred from observation
///
/// Starts at the configured guess and is raised, never lowered, whenever a
/// higher value is seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InferredMax(i32);

impl InferredMax {
    pub fn new(initial: i32) -> Self {
        Self(initial)
    }

    pub fn observe(&mut self, value: i32) -> i32 {
        self.0 = self.0.max(value);
        self.0
    }

    pub fn get(&self) -> i32 {
        self.0
    }
}

/// Mana refill policy (mage spells and knight potions)
pub trait ManaKeeping: Send {
    fn handle_status_change(&mut self, status: &CharStatus, is_downtime: bool) -> Result<()>;

    /// Mana is high enough for downtime activities
    fn is_healthy(&self, status: &CharStatus) -> bool;

    fn is_critical_mana(&self, status: &CharStatus) -> bool;
}

/// Defensive buff policy
pub trait ShieldKeeping: Send {
    fn handle_status_change(&mut self, status: &CharStatus, modes: &Modes) -> Result<()>;

    /// Whether the keeper wants to cast this tick
    fn should_cast(&self, status: &CharStatus, modes: &Modes) -> bool;

    fn is_healthy(&self, status: &CharStatus, modes: &Modes) -> bool {
        !self.should_cast(status, modes)
    }
}

/// Ring, amulet and food upkeep
pub trait EquipmentKeeping: Send {
    fn handle_status_change(&mut self, status: &CharStatus, modes: &Modes) -> Result<()>;
}
