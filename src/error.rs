use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced while building or driving an emulated speech system.
///
/// The protocol handlers themselves never fail; these cover configuration,
/// ROM image loading, pin lookup and asynchronous line delivery.
#[derive(Debug, Error)]
pub enum EmuError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("ROM image for {name} is {len} bytes, a bank holds at most {max}")]
    ImageTooLarge { name: String, len: usize, max: usize },

    #[error("bank {bank} of {name} does not fit in four bits")]
    InvalidBank { name: String, bank: u64 },

    #[error("bank {bank} is claimed by both {first} and {second}")]
    DuplicateBank {
        bank: u8,
        first: String,
        second: String,
    },

    #[error("unknown component type: {0}")]
    UnknownComponentType(String),

    #[error("invalid property '{property}' on {name}: {reason}")]
    InvalidProperty {
        name: String,
        property: String,
        reason: String,
    },

    #[error("pin {pin} not found on {component}")]
    PinNotFound { component: String, pin: String },

    #[error("interrupt controller is no longer running")]
    ControllerStopped,
}

pub type Result<T> = std::result::Result<T, EmuError>;
