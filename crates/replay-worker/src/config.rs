//! Replay configuration from environment variables

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::engine::EngineOptions;
use crate::error::ReplayError;
use crate::replayer::ReplayOptions;

#[derive(Clone, Debug)]
pub struct ReplayConfig {
    /// Engine executable, resolved through PATH when not absolute
    pub engine_path: String,

    /// Handshake and search options for the engine session
    pub engine: EngineOptions,

    /// CSV file rows are appended to
    pub output_path: PathBuf,

    pub replay: ReplayOptions,
}

impl ReplayConfig {
    /// Load configuration from environment variables.
    /// Unset variables take their defaults; unparseable values are errors.
    pub fn load() -> Result<Self, ReplayError> {
        let engine_path = env::var("ENGINE_PATH").unwrap_or_else(|_| "stockfish".to_string());

        let read_timeout_secs: u64 = env_or("ENGINE_READ_TIMEOUT_SECS", 120)?;
        let engine = EngineOptions {
            threads: env_or("ENGINE_THREADS", 1)?,
            hash_mb: env_or("ENGINE_HASH_MB", 256)?,
            search_depth: env_or("SEARCH_DEPTH", 20)?,
            read_timeout: (read_timeout_secs > 0).then(|| Duration::from_secs(read_timeout_secs)),
        };
        if engine.threads == 0 || engine.search_depth == 0 {
            return Err(ReplayError::Config(
                "ENGINE_THREADS and SEARCH_DEPTH must be positive".into(),
            ));
        }

        let output_path = env::var("OUTPUT_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("analyzed.csv"));

        let replay = ReplayOptions {
            initial_clock_ds: env_or("INITIAL_CLOCK_DS", 1800)?,
            mate_policy: env_or("MATE_SCORE_POLICY", Default::default())?,
            perspective: env_or("SCORE_PERSPECTIVE", Default::default())?,
        };

        Ok(Self {
            engine_path,
            engine,
            output_path,
            replay,
        })
    }
}

fn env_or<T>(name: &str, default: T) -> Result<T, ReplayError>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| ReplayError::Config(format!("{name}={raw:?}: {e}"))),
        _ => Ok(default),
    }
}
