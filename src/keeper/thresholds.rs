//! Stat bands, refill priorities and throttle interpolation

use serde::{Deserialize, Serialize};

use crate::core::error::{BotError, Result};
use crate::core::types::Millis;

/// Refill urgency, ordered from least to most urgent
///
/// The derived ordering is relied upon by keepers that compare priorities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum RefillPriority {
    NoRefill = 0,
    Downtime = 1,
    HighPriority = 2,
    Critical = 3,
}

impl RefillPriority {
    pub const ALL: [RefillPriority; 4] = [
        RefillPriority::NoRefill,
        RefillPriority::Downtime,
        RefillPriority::HighPriority,
        RefillPriority::Critical,
    ];

    /// Next more urgent priority, saturating at `Critical`
    pub fn higher_priority(self) -> RefillPriority {
        match self {
            RefillPriority::NoRefill => RefillPriority::Downtime,
            RefillPriority::Downtime => RefillPriority::HighPriority,
            RefillPriority::HighPriority | RefillPriority::Critical => RefillPriority::Critical,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct RawStatConfig {
    critical: i32,
    lo: i32,
    hi: i32,
    downtime: i32,
}

/// Four ordered thresholds over one stat: `critical < lo < hi < downtime`
///
/// Only constructible through [`StatConfig::new`], so the ordering always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawStatConfig")]
pub struct StatConfig {
    critical: i32,
    lo: i32,
    hi: i32,
    downtime: i32,
}

impl StatConfig {
    pub fn new(critical: i32, lo: i32, hi: i32, downtime: i32) -> Result<Self> {
        Self::named("stat", critical, lo, hi, downtime)
    }

    /// Same as `new`, naming the stat in the error message
    pub fn named(stat: &str, critical: i32, lo: i32, hi: i32, downtime: i32) -> Result<Self> {
        if critical < lo && lo < hi && hi < downtime {
            Ok(Self {
                critical,
                lo,
                hi,
                downtime,
            })
        } else {
            Err(BotError::InvalidThresholds {
                stat: stat.to_string(),
                critical,
                lo,
                hi,
                downtime,
            })
        }
    }

    pub fn critical(&self) -> i32 {
        self.critical
    }

    pub fn lo(&self) -> i32 {
        self.lo
    }

    pub fn hi(&self) -> i32 {
        self.hi
    }

    pub fn downtime(&self) -> i32 {
        self.downtime
    }

    /// Midpoint of `lo` and `hi`, the edge between the high-priority and downtime bands
    pub fn midpoint(&self) -> f64 {
        (self.lo as f64 + self.hi as f64) / 2.0
    }

    /// Band a value falls into, without any latching
    pub fn band_of(&self, value: i32) -> RefillPriority {
        let value_f = value as f64;
        if value <= self.critical {
            RefillPriority::Critical
        } else if value_f <= self.midpoint() {
            RefillPriority::HighPriority
        } else if value <= self.downtime {
            RefillPriority::Downtime
        } else {
            RefillPriority::NoRefill
        }
    }
}

impl TryFrom<RawStatConfig> for StatConfig {
    type Error = BotError;

    fn try_from(raw: RawStatConfig) -> Result<Self> {
        StatConfig::new(raw.critical, raw.lo, raw.hi, raw.downtime)
    }
}

/// Throttle duration per refill priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleMap {
    pub critical_ms: Millis,
    pub high_priority_ms: Millis,
    pub downtime_ms: Millis,
    /// Effectively "never refill automatically"
    pub no_refill_ms: Millis,
}

impl Default for ThrottleMap {
    fn default() -> Self {
        Self {
            critical_ms: 250,
            high_priority_ms: 600,
            downtime_ms: 1500,
            no_refill_ms: 60_000,
        }
    }
}

impl ThrottleMap {
    pub fn duration_for(&self, priority: RefillPriority) -> Millis {
        match priority {
            RefillPriority::Critical => self.critical_ms,
            RefillPriority::HighPriority => self.high_priority_ms,
            RefillPriority::Downtime => self.downtime_ms,
            RefillPriority::NoRefill => self.no_refill_ms,
        }
    }

    /// Durations must not shrink as urgency drops, or the curve loses monotonicity
    pub fn validate(&self, name: &str) -> Result<()> {
        if self.critical_ms <= self.high_priority_ms
            && self.high_priority_ms <= self.downtime_ms
            && self.downtime_ms <= self.no_refill_ms
        {
            Ok(())
        } else {
            Err(BotError::Config(format!(
                "{} throttle must satisfy critical <= high_priority <= downtime <= no_refill, got {:?}",
                name, self
            )))
        }
    }
}

/// Maps a stat value to a throttle by piecewise-linear interpolation
///
/// - `value <= critical`: CRITICAL duration
/// - `critical < value <= midpoint(lo, hi)`: CRITICAL to HIGH_PRIORITY
/// - `midpoint < value <= downtime`: HIGH_PRIORITY to DOWNTIME
/// - `value > downtime`: NO_REFILL duration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdCalculator {
    config: StatConfig,
    throttle: ThrottleMap,
}

impl ThresholdCalculator {
    pub fn new(config: StatConfig, throttle: ThrottleMap) -> Self {
        Self { config, throttle }
    }

    pub fn config(&self) -> &StatConfig {
        &self.config
    }

    pub fn throttle(&self) -> &ThrottleMap {
        &self.throttle
    }

    pub fn gen_threshold_ms(&self, value: i32) -> Millis {
        let critical = self.config.critical as f64;
        let midpoint = self.config.midpoint();
        let downtime = self.config.downtime as f64;
        let value_f = value as f64;

        if value <= self.config.critical {
            self.throttle.critical_ms
        } else if value_f <= midpoint {
            let fraction = (value_f - critical) / (midpoint - critical);
            lerp(self.throttle.critical_ms, self.throttle.high_priority_ms, fraction)
        } else if value <= self.config.downtime {
            let fraction = (value_f - midpoint) / (downtime - midpoint);
            lerp(self.throttle.high_priority_ms, self.throttle.downtime_ms, fraction)
        } else {
            self.throttle.no_refill_ms
        }
    }
}

fn lerp(from: Millis, to: Millis, fraction: f64) -> Millis {
    let fraction = fraction.clamp(0.0, 1.0);
    let value = from as f64 + (to as f64 - from as f64) * fraction;
    value.round() as Millis
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn calculator() -> ThresholdCalculator {
        ThresholdCalculator::new(
            StatConfig::new(100, 300, 500, 800).unwrap(),
            ThrottleMap {
                critical_ms: 200,
                high_priority_ms: 600,
                downtime_ms: 1400,
                no_refill_ms: 30_000,
            },
        )
    }

    #[test]
    fn test_stat_config_rejects_bad_ordering() {
        assert!(StatConfig::new(10, 20, 30, 40).is_ok());
        assert!(StatConfig::new(20, 20, 30, 40).is_err());
        assert!(StatConfig::new(10, 30, 20, 40).is_err());
        assert!(StatConfig::new(10, 20, 40, 40).is_err());
        assert!(matches!(
            StatConfig::named("mana", 50, 10, 60, 70),
            Err(BotError::InvalidThresholds { ref stat, .. }) if stat == "mana"
        ));
    }

    #[test]
    fn test_stat_config_deserialize_validates() {
        let ok: std::result::Result<StatConfig, _> =
            toml::from_str("critical = 1\nlo = 2\nhi = 3\ndowntime = 4");
        assert!(ok.is_ok());
        let bad: std::result::Result<StatConfig, _> =
            toml::from_str("critical = 5\nlo = 2\nhi = 3\ndowntime = 4");
        assert!(bad.is_err());
    }

    #[test]
    fn test_higher_priority_saturates() {
        assert_eq!(RefillPriority::NoRefill.higher_priority(), RefillPriority::Downtime);
        assert_eq!(RefillPriority::Downtime.higher_priority(), RefillPriority::HighPriority);
        assert_eq!(RefillPriority::HighPriority.higher_priority(), RefillPriority::Critical);
        assert_eq!(RefillPriority::Critical.higher_priority(), RefillPriority::Critical);
        assert!(RefillPriority::Critical > RefillPriority::HighPriority);
        assert!(RefillPriority::Downtime > RefillPriority::NoRefill);
    }

    #[test]
    fn test_band_edges() {
        let calc = calculator();
        assert_eq!(calc.gen_threshold_ms(50), 200);
        assert_eq!(calc.gen_threshold_ms(100), 200);
        // midpoint(300, 500) = 400
        assert_eq!(calc.gen_threshold_ms(400), 600);
        assert_eq!(calc.gen_threshold_ms(250), 400);
        assert_eq!(calc.gen_threshold_ms(600), 1000);
        assert_eq!(calc.gen_threshold_ms(800), 1400);
        assert_eq!(calc.gen_threshold_ms(801), 30_000);
    }

    #[test]
    fn test_band_of() {
        let config = StatConfig::new(100, 300, 500, 800).unwrap();
        assert_eq!(config.band_of(100), RefillPriority::Critical);
        assert_eq!(config.band_of(400), RefillPriority::HighPriority);
        assert_eq!(config.band_of(401), RefillPriority::Downtime);
        assert_eq!(config.band_of(800), RefillPriority::Downtime);
        assert_eq!(config.band_of(801), RefillPriority::NoRefill);
    }

    #[test]
    fn test_throttle_map_validation() {
        assert!(ThrottleMap::default().validate("hp").is_ok());
        let inverted = ThrottleMap {
            critical_ms: 900,
            ..ThrottleMap::default()
        };
        assert!(inverted.validate("hp").is_err());
    }

    proptest! {
        #[test]
        fn prop_threshold_non_increasing_as_stat_drops(
            critical in 0i32..1000,
            gaps in (1i32..500, 1i32..500, 1i32..500),
            durations in (0u64..500, 0u64..500, 0u64..500, 0u64..500),
            value in -100i32..3000,
        ) {
            let lo = critical + gaps.0;
            let hi = lo + gaps.1;
            let downtime = hi + gaps.2;
            let critical_ms = durations.0;
            let high_priority_ms = critical_ms + durations.1;
            let downtime_ms = high_priority_ms + durations.2;
            let no_refill_ms = downtime_ms + durations.3;
            let calc = ThresholdCalculator::new(
                StatConfig::new(critical, lo, hi, downtime).unwrap(),
                ThrottleMap { critical_ms, high_priority_ms, downtime_ms, no_refill_ms },
            );
            prop_assert!(calc.gen_threshold_ms(value - 1) <= calc.gen_threshold_ms(value));
        }

        #[test]
        fn prop_threshold_continuous_inside_refill_range(
            critical in 0i32..1000,
            gaps in (20i32..500, 20i32..500, 20i32..500),
            value_offset in 0i32..1500,
        ) {
            let lo = critical + gaps.0;
            let hi = lo + gaps.1;
            let downtime = hi + gaps.2;
            let throttle = ThrottleMap {
                critical_ms: 100,
                high_priority_ms: 600,
                downtime_ms: 1600,
                no_refill_ms: 60_000,
            };
            let calc = ThresholdCalculator::new(
                StatConfig::new(critical, lo, hi, downtime).unwrap(),
                throttle,
            );
            let value = (critical + value_offset).min(downtime);
            // One stat point moves the curve by at most the steepest band slope
            let steepest = (throttle.downtime_ms - throttle.high_priority_ms) as f64
                / ((downtime as f64 - calc.config().midpoint()).max(1.0));
            let steepest = steepest.max(
                (throttle.high_priority_ms - throttle.critical_ms) as f64
                    / (calc.config().midpoint() - critical as f64),
            );
            let jump = calc.gen_threshold_ms(value) as f64 - calc.gen_threshold_ms(value - 1) as f64;
            prop_assert!(jump <= steepest + 1.0);
        }
    }
}
