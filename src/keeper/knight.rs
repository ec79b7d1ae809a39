//! Knight potion policy: HP and mana potions competing for one action slot
//!
//! Both resources are classified into refill priorities every tick. When a
//! refill is warranted, an HP potion is chosen over a mana potion with a
//! probability looked up in [`PotionProbabilities`] and blended by how deep
//! HP sits inside its current band, so the split shifts smoothly as HP drops.

use std::sync::Arc;
use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::command::GameClient;
use crate::core::config::KnightConfig;
use crate::core::error::{BotError, Result};
use crate::core::types::{millis_since, Clock, Millis};
use crate::keeper::hp::HealTier;
use crate::keeper::thresholds::{RefillPriority, StatConfig, ThresholdCalculator, ThrottleMap};
use crate::keeper::ManaKeeping;
use crate::status::{CharStatus, PotionStock};

/// Window in which a potion throttle may not shrink below the previous one
pub const POTION_NO_SHRINK_MS: Millis = 800;

/// Probability of drinking an HP potion, by `[hp_priority][mana_priority]`
///
/// Rows and columns follow [`RefillPriority`] order: no refill, downtime,
/// high priority, critical. Columns must not decrease from row to row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PotionProbabilities {
    pub table: [[f64; 4]; 4],
}

impl Default for PotionProbabilities {
    fn default() -> Self {
        Self {
            table: [
                [0.0, 0.0, 0.0, 0.0],
                [1.0, 0.5, 0.25, 0.0],
                [1.0, 0.75, 0.5, 0.33],
                [1.0, 1.0, 0.75, 0.6],
            ],
        }
    }
}

impl PotionProbabilities {
    pub fn validate(&self) -> Result<()> {
        for (row, values) in self.table.iter().enumerate() {
            for (col, p) in values.iter().enumerate() {
                if !(0.0..=1.0).contains(p) {
                    return Err(BotError::Config(format!(
                        "potion probability [{}][{}] = {} is outside [0, 1]",
                        row, col, p
                    )));
                }
                if row > 0 && self.table[row - 1][col] > *p {
                    return Err(BotError::Config(format!(
                        "potion probabilities must not decrease as HP urgency rises (column {})",
                        col
                    )));
                }
            }
        }
        Ok(())
    }

    /// Blend the entry for `hp` toward the next more urgent HP row by `depth`
    pub fn probability(&self, hp: RefillPriority, mana: RefillPriority, depth: f64) -> f64 {
        if hp == RefillPriority::NoRefill {
            return 0.0;
        }
        if mana == RefillPriority::NoRefill {
            return 1.0;
        }
        let here = self.table[hp.index()][mana.index()];
        let next = self.table[hp.higher_priority().index()][mana.index()];
        here + (next - here) * depth.clamp(0.0, 1.0)
    }
}

/// Latched classification of HP and mana
///
/// A resource is CRITICAL at or below `critical`, HIGH_PRIORITY at or below
/// `lo`, DOWNTIME at or below `downtime`. Once HIGH_PRIORITY or CRITICAL it
/// stays at least HIGH_PRIORITY until it climbs back to `hi`.
#[derive(Debug, Clone)]
pub struct KnightPrioritiesStrategy {
    hp_config: StatConfig,
    mana_config: StatConfig,
    hp_priority: RefillPriority,
    mana_priority: RefillPriority,
}

impl KnightPrioritiesStrategy {
    pub fn new(hp_config: StatConfig, mana_config: StatConfig) -> Self {
        Self {
            hp_config,
            mana_config,
            hp_priority: RefillPriority::NoRefill,
            mana_priority: RefillPriority::NoRefill,
        }
    }

    fn classify(value: i32, config: &StatConfig, previous: RefillPriority) -> RefillPriority {
        let raw = if value <= config.critical() {
            RefillPriority::Critical
        } else if value <= config.lo() {
            RefillPriority::HighPriority
        } else if value <= config.downtime() {
            RefillPriority::Downtime
        } else {
            RefillPriority::NoRefill
        };

        let latched = previous >= RefillPriority::HighPriority && value < config.hi();
        if latched && raw < RefillPriority::HighPriority {
            RefillPriority::HighPriority
        } else {
            raw
        }
    }

    pub fn update(&mut self, hp: i32, mana: i32) -> (RefillPriority, RefillPriority) {
        self.hp_priority = Self::classify(hp, &self.hp_config, self.hp_priority);
        self.mana_priority = Self::classify(mana, &self.mana_config, self.mana_priority);
        (self.hp_priority, self.mana_priority)
    }

    pub fn hp_priority(&self) -> RefillPriority {
        self.hp_priority
    }

    pub fn mana_priority(&self) -> RefillPriority {
        self.mana_priority
    }

    /// How far HP has sunk into its current band, 0 at the top and 1 at the bottom
    pub fn hp_band_depth(&self, hp: i32) -> f64 {
        let config = &self.hp_config;
        let (top, bottom) = match self.hp_priority {
            RefillPriority::Critical | RefillPriority::NoRefill => return 0.0,
            RefillPriority::HighPriority => (config.lo(), config.critical()),
            RefillPriority::Downtime => (config.downtime(), config.lo()),
        };
        ((top - hp) as f64 / (top - bottom) as f64).clamp(0.0, 1.0)
    }
}

pub struct KnightPotionKeeper {
    client: Arc<dyn GameClient>,
    clock: Arc<dyn Clock>,
    strategy: KnightPrioritiesStrategy,
    hp_calculator: ThresholdCalculator,
    mana_calculator: ThresholdCalculator,
    probabilities: PotionProbabilities,
    rng: ChaCha8Rng,
    last_potion: Option<(Instant, Millis)>,
}

impl KnightPotionKeeper {
    pub fn new(
        client: Arc<dyn GameClient>,
        clock: Arc<dyn Clock>,
        config: &KnightConfig,
        throttle: ThrottleMap,
    ) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            client,
            clock,
            strategy: KnightPrioritiesStrategy::new(config.hp, config.mana),
            hp_calculator: ThresholdCalculator::new(config.hp, throttle),
            mana_calculator: ThresholdCalculator::new(config.mana, throttle),
            probabilities: config.probabilities.clone(),
            rng,
            last_potion: None,
        }
    }

    pub fn strategy(&self) -> &KnightPrioritiesStrategy {
        &self.strategy
    }

    /// Keep the throttle from tightening in a burst right after a potion
    fn settle_throttle(&mut self, now: Instant, throttle_ms: Millis) -> Millis {
        let throttle_ms = match self.last_potion {
            Some((ts, previous))
                if millis_since(now, Some(ts)).is_some_and(|ms| ms < POTION_NO_SHRINK_MS) =>
            {
                throttle_ms.max(previous)
            }
            _ => throttle_ms,
        };
        self.last_potion = Some((now, throttle_ms));
        throttle_ms
    }

    fn drink_health(&self, potions: PotionStock, priority: RefillPriority, throttle_ms: Millis) -> Result<()> {
        let order = match priority {
            RefillPriority::Critical => [HealTier::Greater, HealTier::Medium, HealTier::Minor],
            RefillPriority::HighPriority => [HealTier::Medium, HealTier::Greater, HealTier::Minor],
            RefillPriority::Downtime | RefillPriority::NoRefill => {
                [HealTier::Minor, HealTier::Medium, HealTier::Greater]
            }
        };

        match order.into_iter().find(|tier| in_stock(potions, *tier)) {
            Some(HealTier::Minor) => self.client.drink_minor_heal(throttle_ms),
            Some(HealTier::Medium) => self.client.drink_medium_heal(throttle_ms),
            Some(HealTier::Greater) => self.client.drink_greater_heal(throttle_ms),
            None => {
                tracing::debug!("No health potions left, drinking mana instead");
                self.client.drink_mana(throttle_ms)
            }
        }
    }
}

fn in_stock(potions: PotionStock, tier: HealTier) -> bool {
    match tier {
        HealTier::Minor => potions.minor_health,
        HealTier::Medium => potions.medium_health,
        HealTier::Greater => potions.greater_health,
    }
}

impl ManaKeeping for KnightPotionKeeper {
    fn handle_status_change(&mut self, status: &CharStatus, is_downtime: bool) -> Result<()> {
        let (hp_priority, mana_priority) = self.strategy.update(status.hp, status.mana);

        if hp_priority == RefillPriority::NoRefill && mana_priority == RefillPriority::NoRefill {
            return Ok(());
        }
        let urgent = hp_priority > RefillPriority::Downtime || mana_priority > RefillPriority::Downtime;
        if !urgent && !is_downtime {
            return Ok(());
        }

        let depth = self.strategy.hp_band_depth(status.hp);
        let p_hp = self.probabilities.probability(hp_priority, mana_priority, depth);
        let drink_hp = self.rng.gen::<f64>() < p_hp;
        let now = self.clock.now();

        if drink_hp {
            let throttle_ms = self.hp_calculator.gen_threshold_ms(status.hp);
            let throttle_ms = self.settle_throttle(now, throttle_ms);
            tracing::debug!(?hp_priority, ?mana_priority, p_hp, throttle_ms, "HP potion");
            self.drink_health(status.potions(), hp_priority, throttle_ms)
        } else {
            let throttle_ms = self.mana_calculator.gen_threshold_ms(status.mana);
            let throttle_ms = self.settle_throttle(now, throttle_ms);
            tracing::debug!(?hp_priority, ?mana_priority, p_hp, throttle_ms, "Mana potion");
            self.client.drink_mana(throttle_ms)
        }
    }

    fn is_healthy(&self, status: &CharStatus) -> bool {
        self.strategy.mana_priority() < RefillPriority::HighPriority
            && status.mana > self.strategy.mana_config.lo()
    }

    fn is_critical_mana(&self, status: &CharStatus) -> bool {
        status.mana <= self.strategy.mana_config.critical()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ClientAction;
    use crate::core::types::ManualClock;
    use crate::test_support::RecordingClient;

    fn hp_config() -> StatConfig {
        StatConfig::new(100, 300, 500, 800).unwrap()
    }

    fn mana_config() -> StatConfig {
        StatConfig::new(50, 150, 300, 450).unwrap()
    }

    fn keeper(seed: u64) -> (KnightPotionKeeper, Arc<RecordingClient>, Arc<ManualClock>) {
        let client = Arc::new(RecordingClient::new());
        let clock = Arc::new(ManualClock::new());
        let config = KnightConfig {
            hp: hp_config(),
            mana: mana_config(),
            probabilities: PotionProbabilities::default(),
            rng_seed: Some(seed),
        };
        let keeper = KnightPotionKeeper::new(client.clone(), clock.clone(), &config, ThrottleMap::default());
        (keeper, client, clock)
    }

    fn status(hp: i32, mana: i32) -> CharStatus {
        CharStatus::new(hp, mana, 300, 0)
    }

    #[test]
    fn test_classification_and_latch() {
        let mut strategy = KnightPrioritiesStrategy::new(hp_config(), mana_config());
        assert_eq!(strategy.update(900, 500).0, RefillPriority::NoRefill);
        assert_eq!(strategy.update(700, 500).0, RefillPriority::Downtime);
        assert_eq!(strategy.update(250, 500).0, RefillPriority::HighPriority);
        assert_eq!(strategy.update(50, 500).0, RefillPriority::Critical);
        // Raw band is DOWNTIME, latch keeps it at HIGH_PRIORITY below hi
        assert_eq!(strategy.update(400, 500).0, RefillPriority::HighPriority);
        assert_eq!(strategy.update(499, 500).0, RefillPriority::HighPriority);
        assert_eq!(strategy.update(500, 500).0, RefillPriority::Downtime);
        assert_eq!(strategy.update(400, 500).0, RefillPriority::Downtime);
    }

    #[test]
    fn test_probability_is_continuous_across_bands() {
        let probabilities = PotionProbabilities::default();
        let mut strategy = KnightPrioritiesStrategy::new(hp_config(), mana_config());

        // Bottom of the downtime band meets the top of the high priority band
        strategy.update(301, 200);
        let above = probabilities.probability(
            strategy.hp_priority(),
            RefillPriority::Downtime,
            strategy.hp_band_depth(301),
        );
        strategy.update(300, 200);
        let below = probabilities.probability(
            strategy.hp_priority(),
            RefillPriority::Downtime,
            strategy.hp_band_depth(300),
        );
        assert!((above - below).abs() < 0.01);

        assert_eq!(probabilities.probability(RefillPriority::NoRefill, RefillPriority::Critical, 0.5), 0.0);
        assert_eq!(probabilities.probability(RefillPriority::Critical, RefillPriority::NoRefill, 0.0), 1.0);
    }

    #[test]
    fn test_validation_rejects_decreasing_columns() {
        let mut probabilities = PotionProbabilities::default();
        assert!(probabilities.validate().is_ok());
        probabilities.table[3][1] = 0.1;
        assert!(probabilities.validate().is_err());
        probabilities.table[3][1] = 1.5;
        assert!(probabilities.validate().is_err());
    }

    #[test]
    fn test_nothing_to_do_when_full_or_not_urgent() {
        let (mut keeper, client, _clock) = keeper(7);
        keeper.handle_status_change(&status(900, 500), false).unwrap();
        keeper.handle_status_change(&status(700, 400), false).unwrap();
        assert!(client.take().is_empty());

        keeper.handle_status_change(&status(700, 500), true).unwrap();
        assert_eq!(client.take_actions(), vec![ClientAction::DrinkMinorHeal]);
    }

    #[test]
    fn test_health_potion_fallback_order() {
        let (mut keeper, client, clock) = keeper(7);
        let depleted = PotionStock {
            greater_health: false,
            ..PotionStock::default()
        };
        keeper.handle_status_change(&status(50, 500), false).unwrap();
        clock.advance_ms(1000);
        keeper
            .handle_status_change(&status(50, 500).with_potions(depleted), false)
            .unwrap();
        clock.advance_ms(1000);
        keeper
            .handle_status_change(&status(50, 500).with_potions(PotionStock::none()), false)
            .unwrap();
        assert_eq!(
            client.take_actions(),
            vec![
                ClientAction::DrinkGreaterHeal,
                ClientAction::DrinkMediumHeal,
                ClientAction::DrinkMana
            ]
        );
    }

    #[test]
    fn test_mana_only_when_hp_full() {
        let (mut keeper, client, _clock) = keeper(7);
        keeper.handle_status_change(&status(900, 40), false).unwrap();
        assert_eq!(
            client.take(),
            vec![(ClientAction::DrinkMana, ThrottleMap::default().critical_ms)]
        );
    }

    #[test]
    fn test_throttle_does_not_shrink_right_after_a_potion() {
        let (mut keeper, client, clock) = keeper(7);
        keeper.handle_status_change(&status(250, 500), false).unwrap();
        let (_, first) = client.take()[0];
        assert!(first > ThrottleMap::default().critical_ms);

        clock.advance_ms(100);
        keeper.handle_status_change(&status(50, 500), false).unwrap();
        assert_eq!(client.take()[0].1, first);

        clock.advance_ms(POTION_NO_SHRINK_MS);
        keeper.handle_status_change(&status(50, 500), false).unwrap();
        assert_eq!(client.take()[0].1, ThrottleMap::default().critical_ms);
    }

    #[test]
    fn test_seeded_choice_is_reproducible() {
        let run = |seed| {
            let (mut keeper, client, clock) = keeper(seed);
            for _ in 0..50 {
                clock.advance_ms(1000);
                keeper.handle_status_change(&status(250, 100), false).unwrap();
            }
            client.actions()
        };
        let first = run(42);
        assert_eq!(first, run(42));
        assert!(first.contains(&ClientAction::DrinkMana));
        assert!(first.contains(&ClientAction::DrinkMediumHeal));
    }
}
