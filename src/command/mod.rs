//! Command dispatch pipeline
//!
//! Keeper decision -> GameClient -> Command -> CommandProcessor -> CommandSender
//! (one thread per channel) -> ActionDriver

pub mod client;
pub mod driver;
pub mod model;
pub mod processor;
pub mod sender;

pub use client::{ClientAction, ClientInterface, GameClient};
pub use driver::{ActionDriver, DryRunDriver, XdotoolDriver};
pub use model::{Action, Command, CommandType, ThrottleBehavior};
pub use processor::CommandProcessor;
pub use sender::{CommandSender, DispatchOutcome, MAX_RETRY_QUEUE};
