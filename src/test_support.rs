//! Recording doubles for tests and dry runs

use std::sync::Mutex;

use crate::command::{Action, ActionDriver, ClientAction, GameClient};
use crate::core::error::{BotError, Result};
use crate::core::types::Millis;

/// Configuration used by examples and tests
pub const SAMPLE_CONFIG: &str = include_str!("../data/sample_config.toml");

/// Driver that remembers every key it was asked to press
#[derive(Debug, Default)]
pub struct RecordingDriver {
    keys: Mutex<Vec<String>>,
    failures_left: Mutex<usize>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Vec<String> {
        self.keys.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Make the next `count` actions fail with a driver error
    pub fn fail_next(&self, count: usize) {
        *self.failures_left.lock().unwrap_or_else(|e| e.into_inner()) = count;
    }
}

impl ActionDriver for RecordingDriver {
    fn perform(&self, action: &Action) -> Result<()> {
        let mut failures = self.failures_left.lock().unwrap_or_else(|e| e.into_inner());
        if *failures > 0 {
            *failures -= 1;
            return Err(BotError::Driver("scripted failure".into()));
        }
        if let Action::Hotkey(key) = action {
            self.keys
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(key.clone());
        }
        Ok(())
    }
}

/// Client that records requests instead of dispatching them
#[derive(Debug, Default)]
pub struct RecordingClient {
    requests: Mutex<Vec<(ClientAction, Millis)>>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<(ClientAction, Millis)> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn actions(&self) -> Vec<ClientAction> {
        self.requests().into_iter().map(|(action, _)| action).collect()
    }

    /// Requests recorded since the last call
    pub fn take(&self) -> Vec<(ClientAction, Millis)> {
        std::mem::take(&mut *self.requests.lock().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn take_actions(&self) -> Vec<ClientAction> {
        self.take().into_iter().map(|(action, _)| action).collect()
    }
}

impl GameClient for RecordingClient {
    fn request(&self, action: ClientAction, throttle_ms: Millis) -> Result<()> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((action, throttle_ms));
        Ok(())
    }
}
