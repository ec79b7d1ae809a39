//! Keeperbot - character keeper bot
//!
//! Stat keepers turn per-tick character snapshots into throttled game
//! commands, dispatched on independent channels by dedicated sender threads.

pub mod command;
pub mod core;
pub mod keeper;
pub mod runtime;
pub mod status;

#[doc(hidden)]
pub mod test_support;
