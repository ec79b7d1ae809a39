//! Per-channel command sender: throttling, retries and de-duplication
//!
//! One sender owns one channel. Producers push commands into its input
//! channel from any thread; the sender thread is the only consumer. On each
//! fetch the retry deque is drained before the main FIFO queue.
//!
//! When a dequeued command arrives while the channel is still throttled, its
//! [`ThrottleBehavior`] decides what happens:
//! - `Drop`: discarded
//! - `Force`: issued anyway
//! - `RequeueTop`: pushed to the front of the retry deque
//! - `RequeueBack`: the main queue head is promoted into the retry deque and
//!   the command goes to the back of the main queue
//!
//! Invariants: the retry deque never holds more than [`MAX_RETRY_QUEUE`]
//! commands, and a `cmd_id` is pending at most once across both queues.

use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use ahash::AHashSet;

use crate::command::driver::ActionDriver;
use crate::command::model::{Command, CommandType, ThrottleBehavior};
use crate::core::error::Result;
use crate::core::types::{millis_since, Clock, Millis};

pub const MAX_RETRY_QUEUE: usize = 10;

/// Result of dispatching one command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Issued,
    Dropped,
    /// Put back for a later attempt; `wait_ms` is set when this command was
    /// already requeued since the last issue and the sender should idle until
    /// its throttle ends
    Requeued { wait_ms: Option<Millis> },
    /// The driver failed; the channel's throttle clock is left untouched
    Failed,
    Stopped,
}

pub struct CommandSender {
    cmd_type: CommandType,
    rx: Receiver<Command>,
    queue: VecDeque<Command>,
    retry_queue: VecDeque<Command>,
    last_cmd_ts: Option<Instant>,
    /// Ids requeued since the last successful issue
    requeued_since_issue: AHashSet<String>,
    driver: Arc<dyn ActionDriver>,
    clock: Arc<dyn Clock>,
}

impl CommandSender {
    pub fn new(
        cmd_type: CommandType,
        rx: Receiver<Command>,
        driver: Arc<dyn ActionDriver>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            cmd_type,
            rx,
            queue: VecDeque::new(),
            retry_queue: VecDeque::new(),
            last_cmd_ts: None,
            requeued_since_issue: AHashSet::new(),
            driver,
            clock,
        }
    }

    /// A sender together with the producer end of its input channel
    pub fn channel(
        cmd_type: CommandType,
        driver: Arc<dyn ActionDriver>,
        clock: Arc<dyn Clock>,
    ) -> (Sender<Command>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self::new(cmd_type, rx, driver, clock))
    }

    pub fn cmd_type(&self) -> CommandType {
        self.cmd_type
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn retry_len(&self) -> usize {
        self.retry_queue.len()
    }

    pub fn last_cmd_ts(&self) -> Option<Instant> {
        self.last_cmd_ts
    }

    fn is_pending(&self, cmd_id: &str) -> bool {
        self.queue
            .iter()
            .chain(self.retry_queue.iter())
            .any(|c| c.cmd_id == cmd_id)
    }

    fn accept(&mut self, cmd: Command) {
        if !cmd.is_stop() && self.is_pending(&cmd.cmd_id) {
            tracing::debug!(cmd_id = %cmd.cmd_id, "Dropping duplicate of a pending command");
            return;
        }
        self.queue.push_back(cmd);
    }

    fn drain_incoming(&mut self) {
        while let Ok(cmd) = self.rx.try_recv() {
            self.accept(cmd);
        }
    }

    /// Next command to dispatch without blocking, retries first
    pub fn fetch(&mut self) -> Option<Command> {
        self.drain_incoming();
        self.retry_queue
            .pop_front()
            .or_else(|| self.queue.pop_front())
    }

    /// Block until a command is available; `None` once every producer is gone
    fn next_command(&mut self) -> Option<Command> {
        loop {
            if let Some(cmd) = self.fetch() {
                return Some(cmd);
            }
            match self.rx.recv() {
                Ok(cmd) => self.accept(cmd),
                Err(_) => return None,
            }
        }
    }

    /// Idle until the throttle has passed or a new command arrives
    fn wait_for_input(&mut self, wait_ms: Millis) {
        match self.rx.recv_timeout(Duration::from_millis(wait_ms)) {
            Ok(cmd) => self.accept(cmd),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {}
        }
    }

    pub fn dispatch(&mut self, cmd: Command) -> DispatchOutcome {
        if cmd.is_stop() {
            return DispatchOutcome::Stopped;
        }

        let now = self.clock.now();
        let elapsed = millis_since(now, self.last_cmd_ts);
        let throttled = matches!(elapsed, Some(ms) if ms < cmd.throttle_ms);
        if !throttled {
            return self.issue(cmd, now);
        }

        let remaining = cmd.throttle_ms - elapsed.unwrap_or(0);
        match cmd.throttle_behavior {
            ThrottleBehavior::Drop => {
                tracing::debug!(cmd_id = %cmd.cmd_id, remaining_ms = remaining, "Throttled, dropping");
                DispatchOutcome::Dropped
            }
            ThrottleBehavior::Force => self.issue(cmd, now),
            ThrottleBehavior::RequeueTop => self.requeue_top(cmd, remaining),
            ThrottleBehavior::RequeueBack => self.requeue_back(cmd, remaining),
        }
    }

    fn issue(&mut self, cmd: Command, now: Instant) -> DispatchOutcome {
        match self.driver.perform(&cmd.action) {
            Ok(()) => {
                tracing::debug!(cmd_id = %cmd.cmd_id, throttle_ms = cmd.throttle_ms, "Issued");
                self.last_cmd_ts = Some(now);
                self.requeued_since_issue.clear();
                DispatchOutcome::Issued
            }
            Err(e) => {
                tracing::error!(cmd_id = %cmd.cmd_id, "Failed to issue command: {}", e);
                DispatchOutcome::Failed
            }
        }
    }

    fn requeue_top(&mut self, cmd: Command, remaining: Millis) -> DispatchOutcome {
        if self.retry_queue.iter().any(|c| c.same_action(&cmd)) {
            return DispatchOutcome::Dropped;
        }
        if self.retry_queue.len() >= MAX_RETRY_QUEUE {
            tracing::warn!(cmd_id = %cmd.cmd_id, "Retry queue full, dropping requeue");
            return DispatchOutcome::Dropped;
        }
        let wait_ms = self.note_requeue(&cmd, remaining);
        self.retry_queue.push_front(cmd);
        DispatchOutcome::Requeued { wait_ms }
    }

    fn requeue_back(&mut self, cmd: Command, remaining: Millis) -> DispatchOutcome {
        if self.is_pending(&cmd.cmd_id) {
            return DispatchOutcome::Dropped;
        }
        if let Some(head) = self.queue.pop_front() {
            let promotable = self.retry_queue.len() < MAX_RETRY_QUEUE
                && !self.retry_queue.iter().any(|c| c.same_action(&head));
            if promotable {
                self.retry_queue.push_back(head);
            } else {
                self.queue.push_front(head);
            }
        }
        let wait_ms = self.note_requeue(&cmd, remaining);
        self.queue.push_back(cmd);
        DispatchOutcome::Requeued { wait_ms }
    }

    /// Records the requeue; asks the loop to idle once a command comes around
    /// again without anything having been issued in between
    fn note_requeue(&mut self, cmd: &Command, remaining: Millis) -> Option<Millis> {
        let repeated = !self.requeued_since_issue.insert(cmd.cmd_id.clone());
        repeated.then_some(remaining)
    }

    /// Dispatch loop; returns after the stop sentinel or when all producers are gone
    pub fn run(mut self) {
        let span = tracing::info_span!("command_sender", channel = self.cmd_type.name());
        let _enter = span.enter();
        tracing::debug!("Command sender started");

        while let Some(cmd) = self.next_command() {
            match self.dispatch(cmd) {
                DispatchOutcome::Stopped => break,
                DispatchOutcome::Requeued {
                    wait_ms: Some(wait_ms),
                } => self.wait_for_input(wait_ms),
                _ => {}
            }
        }

        tracing::debug!(
            pending = self.queue.len() + self.retry_queue.len(),
            "Command sender stopped"
        );
    }

    pub fn spawn(self) -> Result<JoinHandle<()>> {
        let name = format!("sender-{}", self.cmd_type.name());
        let handle = thread::Builder::new().name(name).spawn(move || self.run())?;
        Ok(handle)
    }
}
