//! Physical execution of commands

use std::process::Command as Process;

use crate::command::model::Action;
use crate::core::error::{BotError, Result};

/// Performs the physical effect of an issued command
pub trait ActionDriver: Send + Sync {
    fn perform(&self, action: &Action) -> Result<()>;
}

/// Logs keystrokes instead of sending them
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunDriver;

impl ActionDriver for DryRunDriver {
    fn perform(&self, action: &Action) -> Result<()> {
        if let Action::Hotkey(key) = action {
            tracing::info!(key = %key, "dry-run keystroke");
        }
        Ok(())
    }
}

/// Sends keystrokes to a client window through `xdotool`
#[derive(Debug, Clone)]
pub struct XdotoolDriver {
    window_id: String,
}

impl XdotoolDriver {
    pub fn new(window_id: impl Into<String>) -> Self {
        Self {
            window_id: window_id.into(),
        }
    }
}

impl ActionDriver for XdotoolDriver {
    fn perform(&self, action: &Action) -> Result<()> {
        let Action::Hotkey(key) = action else {
            return Ok(());
        };

        let status = Process::new("xdotool")
            .args(["key", "--window", &self.window_id, key])
            .status()
            .map_err(|e| BotError::Driver(format!("failed to run xdotool: {}", e)))?;

        if status.success() {
            Ok(())
        } else {
            Err(BotError::Driver(format!(
                "xdotool exited with {} for key {}",
                status, key
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dry_run_accepts_everything() {
        let driver = DryRunDriver;
        assert!(driver.perform(&Action::Hotkey("F1".into())).is_ok());
        assert!(driver.perform(&Action::Stop).is_ok());
    }

    #[test]
    fn test_xdotool_ignores_stop() {
        let driver = XdotoolDriver::new("0");
        assert!(driver.perform(&Action::Stop).is_ok());
    }
}
