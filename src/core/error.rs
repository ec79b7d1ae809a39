use thiserror::Error;

use crate::command::CommandType;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Invalid thresholds for {stat}: expected critical < lo < hi < downtime, got {critical} / {lo} / {hi} / {downtime}")]
    InvalidThresholds {
        stat: String,
        critical: i32,
        lo: i32,
        hi: i32,
        downtime: i32,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown vocation: {0}")]
    UnknownVocation(String),

    #[error("Unknown magic shield type: {0}")]
    UnknownShieldType(String),

    #[error("Knight characters require a [knight] section with potion thresholds")]
    MissingPotionThresholds,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Command channel closed: {0:?}")]
    ChannelClosed(CommandType),

    #[error("No sender registered for channel: {0:?}")]
    UnknownChannel(CommandType),
}

pub type Result<T> = std::result::Result<T, BotError>;

/// Failure of a single status probe (memory or pixel read).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    #[error("Read failed: {0}")]
    Failed(String),

    #[error("Read cancelled")]
    Cancelled,
}
