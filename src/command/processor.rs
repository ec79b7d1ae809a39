//! Fan-out of commands to one sender thread per channel

use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use ahash::AHashMap;

use crate::command::driver::ActionDriver;
use crate::command::model::{Command, CommandType};
use crate::command::sender::CommandSender;
use crate::core::error::{BotError, Result};
use crate::core::types::Clock;

struct SenderHandle {
    tx: Sender<Command>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

/// Routes every command to the sender thread of its channel
///
/// Producers only ever enqueue; `send` never blocks on dispatch.
pub struct CommandProcessor {
    senders: AHashMap<CommandType, SenderHandle>,
}

impl CommandProcessor {
    /// Spawn one sender thread for every channel
    pub fn start(driver: Arc<dyn ActionDriver>, clock: Arc<dyn Clock>) -> Result<Self> {
        let mut senders = AHashMap::with_capacity(CommandType::ALL.len());
        for cmd_type in CommandType::ALL {
            let (tx, sender) = CommandSender::channel(cmd_type, Arc::clone(&driver), Arc::clone(&clock));
            let thread = sender.spawn()?;
            senders.insert(
                cmd_type,
                SenderHandle {
                    tx,
                    thread: Mutex::new(Some(thread)),
                },
            );
        }
        tracing::info!(channels = senders.len(), "Command processor started");
        Ok(Self { senders })
    }

    pub fn send(&self, cmd: Command) -> Result<()> {
        let cmd_type = cmd.cmd_type;
        let handle = self
            .senders
            .get(&cmd_type)
            .ok_or(BotError::UnknownChannel(cmd_type))?;
        handle
            .tx
            .send(cmd)
            .map_err(|_| BotError::ChannelClosed(cmd_type))
    }

    /// Send the stop sentinel on every channel and wait for the threads to exit
    ///
    /// Commands queued before the sentinel are still processed. Safe to call twice.
    pub fn stop(&self) {
        for (cmd_type, handle) in &self.senders {
            let _ = handle.tx.send(Command::stop(*cmd_type));
        }
        for (cmd_type, handle) in &self.senders {
            let thread = handle
                .thread
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .take();
            if let Some(thread) = thread {
                if let Err(e) = thread.join() {
                    tracing::error!(channel = cmd_type.name(), "Sender thread panicked: {:?}", e);
                }
            }
        }
    }
}

impl Drop for CommandProcessor {
    fn drop(&mut self) {
        self.stop();
    }
}
