//! Bot assembly and the tick loop

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::command::GameClient;
use crate::core::config::BotConfig;
use crate::core::error::{BotError, Result};
use crate::core::types::{Clock, ShieldType, Vocation};
use crate::keeper::char_keeper::CharKeeper;
use crate::keeper::equipment::{EquipmentKeeper, NoopEquipmentKeeper};
use crate::keeper::hp::HpKeeper;
use crate::keeper::knight::KnightPotionKeeper;
use crate::keeper::mana::ManaKeeper;
use crate::keeper::modes::Modes;
use crate::keeper::shield::{MagicShieldKeeper, NoShieldKeeper, ProtectorKeeper, ShieldPolicy};
use crate::keeper::speed::SpeedKeeper;
use crate::keeper::{EquipmentKeeping, ManaKeeping, ShieldKeeping};
use crate::status::StatusReader;

/// Select and build every keeper variant from the configuration
pub fn build_char_keeper(
    config: &BotConfig,
    client: Arc<dyn GameClient>,
    clock: Arc<dyn Clock>,
) -> Result<CharKeeper> {
    let character = &config.character;

    let (mana, mana_lo): (Box<dyn ManaKeeping>, i32) = match character.vocation {
        Vocation::Mage => (
            Box::new(ManaKeeper::new(
                Arc::clone(&client),
                config.mana,
                config.throttle.mana,
                character.total_mana,
            )),
            config.mana.lo(),
        ),
        Vocation::Knight => {
            let knight = config.knight.as_ref().ok_or(BotError::MissingPotionThresholds)?;
            (
                Box::new(KnightPotionKeeper::new(
                    Arc::clone(&client),
                    Arc::clone(&clock),
                    knight,
                    config.throttle.potion,
                )),
                knight.mana.lo(),
            )
        }
    };

    let shield: Box<dyn ShieldKeeping> = match character.magic_shield_type {
        ShieldType::None => Box::new(NoShieldKeeper),
        ShieldType::Permanent | ShieldType::Emergency => {
            let policy = if character.magic_shield_type == ShieldType::Permanent {
                ShieldPolicy::Permanent
            } else {
                ShieldPolicy::Emergency
            };
            Box::new(MagicShieldKeeper::new(
                Arc::clone(&client),
                Arc::clone(&clock),
                policy,
                character.magic_shield_threshold,
                character.total_hp,
            ))
        }
        ShieldType::Protector => Box::new(ProtectorKeeper::new(Arc::clone(&client), Arc::clone(&clock))),
    };

    let equipment: Box<dyn EquipmentKeeping> = if config.equipment.is_enabled() {
        Box::new(EquipmentKeeper::new(
            Arc::clone(&client),
            Arc::clone(&clock),
            &config.equipment,
        ))
    } else {
        Box::new(NoopEquipmentKeeper)
    };

    let hp = HpKeeper::new(
        Arc::clone(&client),
        config.hp,
        config.throttle.hp,
        character.total_hp,
        character.emergency_hp_threshold,
    )?;
    let speed = SpeedKeeper::new(client, character.base_speed, character.hasted_speed);
    let modes = Modes::new(character.emergency_hp_threshold, mana_lo);

    tracing::info!(
        vocation = %character.vocation,
        shield = %character.magic_shield_type,
        equipment = config.equipment.is_enabled(),
        "Char keeper built"
    );
    Ok(CharKeeper::new(clock, modes, hp, shield, mana, equipment, speed))
}

/// What one tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Handled,
    /// The snapshot could not be read; the tick was skipped
    ReadFailed,
    /// The reader has no more snapshots
    Exhausted,
}

/// Read one snapshot, run the keepers on it, then cancel unconsumed reads
pub fn run_bot_tick(keeper: &mut CharKeeper, reader: &mut dyn StatusReader) -> Result<TickOutcome> {
    let outcome = match reader.read_status() {
        None => return Ok(TickOutcome::Exhausted),
        Some(Err(e)) => {
            tracing::warn!("Status read failed, skipping tick: {}", e);
            Ok(TickOutcome::ReadFailed)
        }
        Some(Ok(status)) => keeper
            .handle_status_change(&status)
            .map(|()| TickOutcome::Handled),
    };
    // Also on failure, so stale reads never leak into the next tick
    reader.cancel_pending();
    outcome
}

/// Drives the keepers at a fixed tick rate until stopped or out of input
pub struct BotRunner<R> {
    reader: R,
    keeper: CharKeeper,
    tick_interval: Duration,
    stop: Arc<AtomicBool>,
}

impl<R: StatusReader> BotRunner<R> {
    pub fn new(reader: R, keeper: CharKeeper, tick_interval: Duration) -> Self {
        Self {
            reader,
            keeper,
            tick_interval,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Setting the returned flag ends `run` after the current tick
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn keeper(&self) -> &CharKeeper {
        &self.keeper
    }

    /// Returns the number of ticks executed, skipped reads included
    pub fn run(&mut self) -> Result<u64> {
        let mut ticks = 0u64;
        tracing::info!(tick_ms = self.tick_interval.as_millis() as u64, "Bot loop started");

        while !self.stop.load(Ordering::Acquire) {
            let started = Instant::now();
            match run_bot_tick(&mut self.keeper, &mut self.reader)? {
                TickOutcome::Exhausted => break,
                TickOutcome::Handled | TickOutcome::ReadFailed => ticks += 1,
            }
            if let Some(remaining) = self.tick_interval.checked_sub(started.elapsed()) {
                std::thread::sleep(remaining);
            }
        }

        tracing::info!(ticks, "Bot loop stopped");
        Ok(ticks)
    }
}
