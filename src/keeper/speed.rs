use std::sync::Arc;

use crate::command::GameClient;
use crate::core::error::Result;
use crate::core::types::Millis;
use crate::status::CharStatus;

pub const PARALYZED_HASTE_THROTTLE_MS: Millis = 500;
pub const HASTE_THROTTLE_MS: Millis = 1000;

/// Keeps the character hasted; paralysis is answered faster than a plain missing haste
pub struct SpeedKeeper {
    client: Arc<dyn GameClient>,
    base_speed: i32,
    hasted_speed: i32,
}

impl SpeedKeeper {
    pub fn new(client: Arc<dyn GameClient>, base_speed: i32, hasted_speed: i32) -> Self {
        Self {
            client,
            base_speed,
            hasted_speed,
        }
    }

    pub fn is_paralyzed(&self, status: &CharStatus) -> bool {
        status.speed < self.base_speed
    }

    pub fn is_hasted(&self, status: &CharStatus) -> bool {
        status.speed >= self.hasted_speed
    }

    pub fn handle_status_change(&mut self, status: &CharStatus) -> Result<()> {
        if self.is_paralyzed(status) {
            tracing::debug!(speed = status.speed, "Paralyzed");
            self.client.cast_haste(PARALYZED_HASTE_THROTTLE_MS)
        } else if !self.is_hasted(status) {
            self.client.cast_haste(HASTE_THROTTLE_MS)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ClientAction;
    use crate::test_support::RecordingClient;

    #[test]
    fn test_haste_urgency() {
        let client = Arc::new(RecordingClient::new());
        let mut keeper = SpeedKeeper::new(client.clone(), 200, 260);

        keeper.handle_status_change(&CharStatus::new(100, 100, 150, 0)).unwrap();
        keeper.handle_status_change(&CharStatus::new(100, 100, 220, 0)).unwrap();
        keeper.handle_status_change(&CharStatus::new(100, 100, 260, 0)).unwrap();

        assert_eq!(
            client.requests(),
            vec![
                (ClientAction::Haste, PARALYZED_HASTE_THROTTLE_MS),
                (ClientAction::Haste, HASTE_THROTTLE_MS)
            ]
        );
    }
}
