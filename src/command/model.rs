//! Command value objects routed to the per-channel senders

use serde::{Deserialize, Serialize};

use crate::core::types::Millis;

/// Logical channel a command is dispatched on
///
/// Each channel has its own sender thread and its own throttle clock.
/// Commands on different channels are never ordered relative to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    HealSpell,
    EquipItem,
    UseItem,
    UtilitySpell,
}

impl CommandType {
    pub const ALL: [CommandType; 4] = [
        CommandType::HealSpell,
        CommandType::EquipItem,
        CommandType::UseItem,
        CommandType::UtilitySpell,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CommandType::HealSpell => "heal_spell",
            CommandType::EquipItem => "equip_item",
            CommandType::UseItem => "use_item",
            CommandType::UtilitySpell => "utility_spell",
        }
    }
}

/// What a sender does with a command that arrives while its channel is throttled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThrottleBehavior {
    /// Discard it
    Drop,
    /// Retry it after the command currently at the head of the queue
    RequeueBack,
    /// Retry it before anything else
    RequeueTop,
    /// Issue it anyway
    Force,
}

/// Physical effect of issuing a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Hotkey(String),
    /// Poison pill: the receiving sender thread exits
    Stop,
}

/// Identifier under which a sender de-duplicates commands
pub const STOP_CMD_ID: &str = "__stop__";

/// A single attempt to perform a game action
///
/// Commands with the same `cmd_id` are the same logical action even when they
/// are separate instances; `cmd_id` is the only key used for de-duplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub cmd_type: CommandType,
    pub cmd_id: String,
    pub throttle_ms: Millis,
    pub throttle_behavior: ThrottleBehavior,
    pub action: Action,
}

impl Command {
    pub fn new(
        cmd_type: CommandType,
        cmd_id: impl Into<String>,
        throttle_ms: Millis,
        throttle_behavior: ThrottleBehavior,
        action: Action,
    ) -> Self {
        Self {
            cmd_type,
            cmd_id: cmd_id.into(),
            throttle_ms,
            throttle_behavior,
            action,
        }
    }

    pub fn hotkey(
        cmd_type: CommandType,
        cmd_id: impl Into<String>,
        throttle_ms: Millis,
        throttle_behavior: ThrottleBehavior,
        key: impl Into<String>,
    ) -> Self {
        Self::new(
            cmd_type,
            cmd_id,
            throttle_ms,
            throttle_behavior,
            Action::Hotkey(key.into()),
        )
    }

    /// Sentinel that makes the sender for `cmd_type` exit
    pub fn stop(cmd_type: CommandType) -> Self {
        Self::new(cmd_type, STOP_CMD_ID, 0, ThrottleBehavior::Force, Action::Stop)
    }

    pub fn is_stop(&self) -> bool {
        self.action == Action::Stop
    }

    pub fn same_action(&self, other: &Command) -> bool {
        self.cmd_id == other.cmd_id
    }
}
