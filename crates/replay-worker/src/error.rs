//! Replay error types

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to start engine: {0}")]
    EngineSpawn(String),

    #[error("Engine I/O error: {0}")]
    EngineIo(String),

    #[error("Engine exited unexpectedly")]
    EngineExited,

    #[error("Engine did not answer {command:?} within {after:?}")]
    EngineTimeout { command: String, after: Duration },

    #[error("Engine response had no {0:?} line")]
    MissingMarker(&'static str),

    #[error("Result sink error: {0}")]
    Sink(String),
}
