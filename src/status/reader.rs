//! Status sources: live probes and recorded traces

use std::io::BufRead;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::error::{ReadError, Result};
use crate::status::deferred::ReadWorker;
use crate::status::{CharStatus, Deferred, ItemName, ItemSlot, MagicShieldStatus, PotionStock};

/// Produces one status snapshot per tick
pub trait StatusReader {
    /// `None` once the source is exhausted, `Some(Err)` when this tick's read failed
    fn read_status(&mut self) -> Option<std::result::Result<CharStatus, ReadError>>;

    /// Drop reads that were not consumed by the tick that requested them
    fn cancel_pending(&self) {}
}

/// Raw character stats, read synchronously
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharStats {
    pub hp: i32,
    pub mana: i32,
    pub speed: i32,
    pub magic_shield_level: i32,
}

pub trait StatsProbe: Send {
    fn read_stats(&mut self) -> std::result::Result<CharStats, ReadError>;
}

/// Slow reads of the client window (worn items, action bar, cooldowns)
pub trait EquipmentProbe: Send + Sync {
    fn read_item(&self, slot: ItemSlot) -> std::result::Result<ItemName, ReadError>;
    fn read_magic_shield_status(&self) -> std::result::Result<MagicShieldStatus, ReadError>;
    fn read_potion_stock(&self) -> std::result::Result<PotionStock, ReadError>;
}

/// Combines synchronous stat reads with deferred equipment reads
pub struct ProbeStatusReader {
    stats: Box<dyn StatsProbe>,
    equipment: Arc<dyn EquipmentProbe>,
    worker: ReadWorker,
}

impl ProbeStatusReader {
    pub fn new(stats: Box<dyn StatsProbe>, equipment: Arc<dyn EquipmentProbe>) -> Result<Self> {
        Ok(Self {
            stats,
            equipment,
            worker: ReadWorker::spawn("equipment-reads")?,
        })
    }
}

impl StatusReader for ProbeStatusReader {
    fn read_status(&mut self) -> Option<std::result::Result<CharStatus, ReadError>> {
        let stats = match self.stats.read_stats() {
            Ok(stats) => stats,
            Err(err) => return Some(Err(err)),
        };

        let mut status = CharStatus::new(stats.hp, stats.mana, stats.speed, stats.magic_shield_level);
        for slot in ItemSlot::ALL {
            let probe = Arc::clone(&self.equipment);
            status.set_item(slot, self.worker.submit(move || probe.read_item(slot)));
        }
        let probe = Arc::clone(&self.equipment);
        status.magic_shield_status = self.worker.submit(move || probe.read_magic_shield_status());
        let probe = Arc::clone(&self.equipment);
        status.potions = self.worker.submit(move || probe.read_potion_stock());

        Some(Ok(status))
    }

    fn cancel_pending(&self) {
        self.worker.cancel_pending();
    }
}

/// One recorded snapshot, as stored in a JSON-lines trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub hp: i32,
    pub mana: i32,
    pub speed: i32,
    #[serde(default)]
    pub magic_shield_level: i32,
    #[serde(default)]
    pub equipped_amulet: ItemName,
    #[serde(default)]
    pub equipped_ring: ItemName,
    #[serde(default)]
    pub emergency_action_amulet: ItemName,
    #[serde(default)]
    pub emergency_action_ring: ItemName,
    #[serde(default)]
    pub tank_action_amulet: ItemName,
    #[serde(default)]
    pub tank_action_ring: ItemName,
    #[serde(default)]
    pub magic_shield_status: MagicShieldStatus,
    #[serde(default)]
    pub potions: PotionStock,
}

impl StatusRecord {
    pub fn into_status(self) -> CharStatus {
        CharStatus {
            hp: self.hp,
            mana: self.mana,
            speed: self.speed,
            magic_shield_level: self.magic_shield_level,
            equipped_amulet: Deferred::ready(self.equipped_amulet),
            equipped_ring: Deferred::ready(self.equipped_ring),
            emergency_action_amulet: Deferred::ready(self.emergency_action_amulet),
            emergency_action_ring: Deferred::ready(self.emergency_action_ring),
            tank_action_amulet: Deferred::ready(self.tank_action_amulet),
            tank_action_ring: Deferred::ready(self.tank_action_ring),
            magic_shield_status: Deferred::ready(self.magic_shield_status),
            potions: Deferred::ready(self.potions),
        }
    }
}

/// Replays a JSON-lines trace of [`StatusRecord`]s
pub struct TraceStatusReader<R> {
    lines: std::io::Lines<R>,
    line_no: usize,
}

impl<R: BufRead> TraceStatusReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            lines: input.lines(),
            line_no: 0,
        }
    }
}

impl<R: BufRead> StatusReader for TraceStatusReader<R> {
    fn read_status(&mut self) -> Option<std::result::Result<CharStatus, ReadError>> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(err) => return Some(Err(ReadError::Failed(err.to_string()))),
            };
            self.line_no += 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            return Some(
                serde_json::from_str::<StatusRecord>(line)
                    .map(StatusRecord::into_status)
                    .map_err(|e| ReadError::Failed(format!("trace line {}: {}", self.line_no, e))),
            );
        }
    }
}
