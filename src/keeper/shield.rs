//! Magic shield and protector upkeep
//!
//! The magic shield keeper is status driven. Shield status pixels lag the
//! game by a tick or more, so a cast attempt only becomes the authoritative
//! "last cast" once a later tick shows the spell as recently cast or cooling
//! down. The protector has no readable state and is reasserted on a timer.
//!
//! These keepers are not meant for concurrent use; the char keeper calls them
//! once per tick from the decision thread.

use std::sync::Arc;
use std::time::Instant;

use crate::command::GameClient;
use crate::core::error::Result;
use crate::core::types::{millis_since, Clock, Millis};
use crate::keeper::modes::Modes;
use crate::keeper::{InferredMax, ShieldKeeping};
use crate::status::{CharStatus, MagicShieldStatus};

/// Shield lasts 180 s; renew a little early
pub const SHIELD_RENEW_MS: Millis = 170_000;
pub const SHIELD_CAST_THROTTLE_MS: Millis = 1000;
pub const SHIELD_CANCEL_THROTTLE_MS: Millis = 1000;
/// Charge above which an emergency-only shield is cancelled once safe
pub const EMERGENCY_CANCEL_CHARGE: i32 = 1000;

pub const PROTECTOR_INTERVAL_MS: Millis = 9_000;
pub const PROTECTOR_ATTEMPTS: u32 = 4;
pub const PROTECTOR_RETRY_MS: Millis = 250;

/// When the magic shield should be up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShieldPolicy {
    Permanent,
    /// Only while emergency or tank mode is on
    Emergency,
}

pub struct MagicShieldKeeper {
    client: Arc<dyn GameClient>,
    clock: Arc<dyn Clock>,
    policy: ShieldPolicy,
    threshold: i32,
    total_hp: InferredMax,
    last_cast_ts: Option<Instant>,
    pending_cast_ts: Option<Instant>,
    prev_status: MagicShieldStatus,
}

impl MagicShieldKeeper {
    pub fn new(
        client: Arc<dyn GameClient>,
        clock: Arc<dyn Clock>,
        policy: ShieldPolicy,
        threshold: i32,
        total_hp: i32,
    ) -> Self {
        Self {
            client,
            clock,
            policy,
            threshold,
            total_hp: InferredMax::new(total_hp),
            last_cast_ts: None,
            pending_cast_ts: None,
            prev_status: MagicShieldStatus::Unknown,
        }
    }

    pub fn last_cast_ts(&self) -> Option<Instant> {
        self.last_cast_ts
    }

    /// Commit the pending attempt if the shield was castable then and is not anymore
    fn reconcile(&mut self, current: MagicShieldStatus) {
        if let Some(attempt) = self.pending_cast_ts.take() {
            let landed = self.prev_status == MagicShieldStatus::OffCooldown
                && matches!(
                    current,
                    MagicShieldStatus::RecentlyCast | MagicShieldStatus::OnCooldown
                );
            if landed {
                tracing::debug!("Magic shield cast confirmed");
                self.last_cast_ts = Some(attempt);
            }
        }
        self.prev_status = current;
    }

    fn guarded_mode_off(&self, modes: &Modes) -> bool {
        self.policy == ShieldPolicy::Emergency && !modes.is_emergency_or_tank()
    }

    pub fn should_cast_cancel(&self, status: &CharStatus, modes: &Modes) -> bool {
        if self.guarded_mode_off(modes) && status.magic_shield_level > EMERGENCY_CANCEL_CHARGE {
            return true;
        }
        let total_hp = self.total_hp.get() as f64;
        let mana = status.mana as f64;
        mana <= 1.25 * total_hp && status.magic_shield_level as f64 * 2.0 > mana
    }
}

impl ShieldKeeping for MagicShieldKeeper {
    fn handle_status_change(&mut self, status: &CharStatus, modes: &Modes) -> Result<()> {
        self.total_hp.observe(status.hp);
        self.reconcile(status.magic_shield_status());

        if self.should_cast(status, modes) {
            tracing::debug!(charge = status.magic_shield_level, mana = status.mana, "Casting magic shield");
            self.client.cast_magic_shield(SHIELD_CAST_THROTTLE_MS)?;
            self.pending_cast_ts = Some(self.clock.now());
        } else if self.should_cast_cancel(status, modes) {
            tracing::debug!(charge = status.magic_shield_level, mana = status.mana, "Cancelling magic shield");
            self.client.cancel_magic_shield(SHIELD_CANCEL_THROTTLE_MS)?;
        }
        Ok(())
    }

    fn should_cast(&self, status: &CharStatus, modes: &Modes) -> bool {
        if status.magic_shield_status() != MagicShieldStatus::OffCooldown {
            return false;
        }
        if self.guarded_mode_off(modes) {
            return false;
        }

        let total_hp = self.total_hp.get() as f64;
        let mana = status.mana as f64;
        if mana < 1.5 * total_hp {
            return false;
        }

        let expired = millis_since(self.clock.now(), self.last_cast_ts)
            .is_some_and(|ms| ms >= SHIELD_RENEW_MS);
        (status.magic_shield_level <= self.threshold || expired) && mana >= total_hp
    }
}

/// Blind periodic recast of the knight protector
///
/// Every interval it makes a few attempts spaced apart, then restarts its clock.
pub struct ProtectorKeeper {
    client: Arc<dyn GameClient>,
    clock: Arc<dyn Clock>,
    window_start: Option<Instant>,
    attempts: u32,
    last_attempt: Option<Instant>,
}

impl ProtectorKeeper {
    pub fn new(client: Arc<dyn GameClient>, clock: Arc<dyn Clock>) -> Self {
        Self {
            client,
            clock,
            window_start: None,
            attempts: 0,
            last_attempt: None,
        }
    }

    fn is_due(&self, now: Instant) -> bool {
        millis_since(now, self.window_start).map_or(true, |ms| ms >= PROTECTOR_INTERVAL_MS)
    }

    fn attempt_ready(&self, now: Instant) -> bool {
        millis_since(now, self.last_attempt).map_or(true, |ms| ms >= PROTECTOR_RETRY_MS)
    }
}

impl ShieldKeeping for ProtectorKeeper {
    fn handle_status_change(&mut self, _status: &CharStatus, _modes: &Modes) -> Result<()> {
        let now = self.clock.now();
        if !self.is_due(now) || !self.attempt_ready(now) {
            return Ok(());
        }

        self.client.cast_magic_shield(PROTECTOR_RETRY_MS)?;
        self.attempts += 1;
        self.last_attempt = Some(now);

        if self.attempts >= PROTECTOR_ATTEMPTS {
            tracing::debug!("Protector renewal window done");
            self.window_start = Some(now);
            self.attempts = 0;
            self.last_attempt = None;
        }
        Ok(())
    }

    fn should_cast(&self, _status: &CharStatus, _modes: &Modes) -> bool {
        let now = self.clock.now();
        self.is_due(now) && self.attempt_ready(now)
    }
}

/// No defensive buff configured
#[derive(Debug, Default, Clone, Copy)]
pub struct NoShieldKeeper;

impl ShieldKeeping for NoShieldKeeper {
    fn handle_status_change(&mut self, _status: &CharStatus, _modes: &Modes) -> Result<()> {
        Ok(())
    }

    fn should_cast(&self, _status: &CharStatus, _modes: &Modes) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ClientAction;
    use crate::core::types::ManualClock;
    use crate::test_support::RecordingClient;

    const TOTAL_HP: i32 = 1000;

    fn keeper(policy: ShieldPolicy) -> (MagicShieldKeeper, Arc<RecordingClient>, Arc<ManualClock>) {
        let client = Arc::new(RecordingClient::new());
        let clock = Arc::new(ManualClock::new());
        let keeper = MagicShieldKeeper::new(client.clone(), clock.clone(), policy, 300, TOTAL_HP);
        (keeper, client, clock)
    }

    fn status(mana: i32, charge: i32, shield: MagicShieldStatus) -> CharStatus {
        CharStatus::new(TOTAL_HP, mana, 300, charge).with_magic_shield_status(shield)
    }

    fn modes() -> Modes {
        Modes::new(200, 100)
    }

    #[test]
    fn test_casts_when_charge_low_and_mana_rich() {
        let (mut keeper, client, _clock) = keeper(ShieldPolicy::Permanent);
        let modes = modes();

        keeper
            .handle_status_change(&status(1500, 200, MagicShieldStatus::OffCooldown), &modes)
            .unwrap();
        assert_eq!(client.take_actions(), vec![ClientAction::MagicShield]);

        // Mana below 150% of max HP
        keeper
            .handle_status_change(&status(1499, 200, MagicShieldStatus::OffCooldown), &modes)
            .unwrap();
        // Shield on cooldown
        keeper
            .handle_status_change(&status(3000, 200, MagicShieldStatus::OnCooldown), &modes)
            .unwrap();
        assert!(client.take().is_empty());
    }

    #[test]
    fn test_confirmed_cast_drives_renewal() {
        let (mut keeper, client, clock) = keeper(ShieldPolicy::Permanent);
        let modes = modes();

        keeper
            .handle_status_change(&status(2000, 0, MagicShieldStatus::OffCooldown), &modes)
            .unwrap();
        let cast_at = clock.now();
        assert_eq!(client.take_actions(), vec![ClientAction::MagicShield]);
        clock.advance_ms(500);
        keeper
            .handle_status_change(&status(2000, 900, MagicShieldStatus::RecentlyCast), &modes)
            .unwrap();
        assert_eq!(keeper.last_cast_ts(), Some(cast_at));

        clock.advance_ms(SHIELD_RENEW_MS - 1000);
        keeper
            .handle_status_change(&status(2000, 900, MagicShieldStatus::OffCooldown), &modes)
            .unwrap();
        assert!(client.take().is_empty());

        clock.advance_ms(1000);
        keeper
            .handle_status_change(&status(2000, 900, MagicShieldStatus::OffCooldown), &modes)
            .unwrap();
        assert_eq!(client.take_actions(), vec![ClientAction::MagicShield]);
    }

    #[test]
    fn test_unconfirmed_cast_is_not_committed() {
        let (mut keeper, client, clock) = keeper(ShieldPolicy::Permanent);
        let modes = modes();

        keeper
            .handle_status_change(&status(2000, 0, MagicShieldStatus::OffCooldown), &modes)
            .unwrap();
        client.take();
        keeper
            .handle_status_change(&status(2000, 900, MagicShieldStatus::OffCooldown), &modes)
            .unwrap();
        assert_eq!(keeper.last_cast_ts(), None);

        clock.advance_ms(SHIELD_RENEW_MS * 2);
        keeper
            .handle_status_change(&status(2000, 900, MagicShieldStatus::OffCooldown), &modes)
            .unwrap();
        assert!(client.take().is_empty());
    }

    #[test]
    fn test_cancels_when_shield_locks_needed_mana() {
        let (mut keeper, client, _clock) = keeper(ShieldPolicy::Permanent);
        let modes = modes();

        keeper
            .handle_status_change(&status(1200, 700, MagicShieldStatus::OnCooldown), &modes)
            .unwrap();
        assert_eq!(client.take_actions(), vec![ClientAction::CancelMagicShield]);

        keeper
            .handle_status_change(&status(1200, 500, MagicShieldStatus::OnCooldown), &modes)
            .unwrap();
        keeper
            .handle_status_change(&status(1300, 700, MagicShieldStatus::OnCooldown), &modes)
            .unwrap();
        assert!(client.take().is_empty());
    }

    #[test]
    fn test_emergency_policy_follows_modes() {
        let (mut keeper, client, _clock) = keeper(ShieldPolicy::Emergency);
        let modes = modes();

        let low_charge = status(2000, 0, MagicShieldStatus::OffCooldown);
        assert!(!keeper.should_cast(&low_charge, &modes));

        modes.tank.start_mode();
        assert!(keeper.should_cast(&low_charge, &modes));
        keeper
            .handle_status_change(&status(2000, 1500, MagicShieldStatus::OnCooldown), &modes)
            .unwrap();
        assert!(client.take().is_empty());

        modes.tank.stop_mode();
        keeper
            .handle_status_change(&status(2000, 1500, MagicShieldStatus::OnCooldown), &modes)
            .unwrap();
        assert_eq!(client.take_actions(), vec![ClientAction::CancelMagicShield]);
    }

    #[test]
    fn test_protector_recasts_on_interval() {
        let client = Arc::new(RecordingClient::new());
        let clock = Arc::new(ManualClock::new());
        let mut keeper = ProtectorKeeper::new(client.clone(), clock.clone());
        let modes = modes();
        let any = CharStatus::new(500, 500, 300, 0);

        // 100 ms ticks: one attempt every 250 ms until four were made
        for _ in 0..20 {
            keeper.handle_status_change(&any, &modes).unwrap();
            clock.advance_ms(100);
        }
        assert_eq!(client.take_actions().len(), PROTECTOR_ATTEMPTS as usize);
        assert!(!keeper.should_cast(&any, &modes));

        clock.advance_ms(PROTECTOR_INTERVAL_MS);
        assert!(keeper.should_cast(&any, &modes));
        keeper.handle_status_change(&any, &modes).unwrap();
        assert_eq!(client.take_actions(), vec![ClientAction::MagicShield]);
    }

    #[test]
    fn test_no_shield_is_always_healthy() {
        let keeper = NoShieldKeeper;
        let status = CharStatus::new(1, 1, 1, 0);
        assert!(keeper.is_healthy(&status, &modes()));
    }
}
