//! Core type definitions used throughout the codebase

use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::core::error::BotError;

/// Milliseconds, the unit of every throttle in the bot
pub type Millis = u64;

/// Source of "now" for every time-dependent rule
///
/// Keepers and command senders never call `Instant::now()` directly so that
/// tests and trace replays can drive time explicitly.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced time, starting at the moment of construction
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset += by;
    }

    pub fn advance_ms(&self, ms: Millis) {
        self.advance(Duration::from_millis(ms));
    }

    pub fn set_offset(&self, offset: Duration) {
        *self.offset.lock().unwrap_or_else(|e| e.into_inner()) = offset;
    }

    pub fn elapsed(&self) -> Duration {
        *self.offset.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.elapsed()
    }
}

/// Milliseconds elapsed since `since`, or `None` if it never happened
pub fn millis_since(now: Instant, since: Option<Instant>) -> Option<Millis> {
    since.map(|ts| now.saturating_duration_since(ts).as_millis() as Millis)
}

/// Character vocation, selects the mana/potion keeper variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Vocation {
    Mage,
    Knight,
}

impl FromStr for Vocation {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mage" | "sorcerer" | "druid" => Ok(Vocation::Mage),
            "knight" => Ok(Vocation::Knight),
            other => Err(BotError::UnknownVocation(other.to_string())),
        }
    }
}

impl TryFrom<String> for Vocation {
    type Error = BotError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Vocation> for String {
    fn from(value: Vocation) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Vocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vocation::Mage => write!(f, "mage"),
            Vocation::Knight => write!(f, "knight"),
        }
    }
}

/// Which defensive buff policy the character runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ShieldType {
    /// No shield keeper at all
    None,
    /// Magic shield kept up permanently
    Permanent,
    /// Magic shield only while in emergency or tank mode
    Emergency,
    /// Knight protector, recast blindly on an interval
    Protector,
}

impl FromStr for ShieldType {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(ShieldType::None),
            "permanent" => Ok(ShieldType::Permanent),
            "emergency" => Ok(ShieldType::Emergency),
            "protector" => Ok(ShieldType::Protector),
            other => Err(BotError::UnknownShieldType(other.to_string())),
        }
    }
}

impl TryFrom<String> for ShieldType {
    type Error = BotError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ShieldType> for String {
    fn from(value: ShieldType) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ShieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShieldType::None => "none",
            ShieldType::Permanent => "permanent",
            ShieldType::Emergency => "emergency",
            ShieldType::Protector => "protector",
        };
        write!(f, "{}", name)
    }
}
