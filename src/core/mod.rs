pub mod config;
pub mod error;
pub mod types;

pub use config::BotConfig;
pub use error::{BotError, ReadError, Result};
pub use types::{Clock, ManualClock, Millis, ShieldType, SystemClock, Vocation};
