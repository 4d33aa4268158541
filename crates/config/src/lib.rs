//! # Config - scanner tuning knobs
//!
//! Settings for reading record streams. Defaults suit small keys and values;
//! callers that store larger records must raise `max_token_size` to at least
//! the largest `key.len() + value.len()` they expect.
//!
//! ## Environment
//!
//! ```text
//! RECORD_MAX_TOKEN_SIZE   max key+value bytes per record   (default: 65536)
//! RECORD_INITIAL_BUFFER   initial scan buffer in bytes     (default: 4096)
//! ```

use anyhow::{bail, Context, Result};
use record::META_LEN;

/// Default upper bound on `key.len() + value.len()` for one record (64 KiB).
pub const DEFAULT_MAX_TOKEN_SIZE: usize = 64 * 1024;

/// Default size of the scanner's first buffer allocation (4 KiB).
pub const DEFAULT_INITIAL_BUFFER_SIZE: usize = 4096;

/// Environment variable overriding [`ScanConfig::max_token_size`].
pub const ENV_MAX_TOKEN_SIZE: &str = "RECORD_MAX_TOKEN_SIZE";

/// Environment variable overriding [`ScanConfig::initial_buffer_size`].
pub const ENV_INITIAL_BUFFER: &str = "RECORD_INITIAL_BUFFER";

/// Configuration for a record scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanConfig {
    /// Largest `key.len() + value.len()` the scanner will buffer.
    pub max_token_size: usize,
    /// Bytes allocated up front. The buffer grows from here on demand.
    pub initial_buffer_size: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_token_size: DEFAULT_MAX_TOKEN_SIZE,
            initial_buffer_size: DEFAULT_INITIAL_BUFFER_SIZE,
        }
    }
}

impl ScanConfig {
    /// Config with the given token bound and the default initial buffer.
    pub fn new(max_token_size: usize) -> Self {
        Self {
            max_token_size,
            ..Self::default()
        }
    }

    /// Sets the maximum key+value size.
    pub fn max_token_size(mut self, bytes: usize) -> Self {
        self.max_token_size = bytes;
        self
    }

    /// Sets the initial buffer allocation.
    pub fn initial_buffer_size(mut self, bytes: usize) -> Self {
        self.initial_buffer_size = bytes;
        self
    }

    /// Hard cap on the scanner buffer: one full record, header included.
    #[must_use]
    pub fn buffer_limit(&self) -> usize {
        self.max_token_size.saturating_add(META_LEN)
    }

    /// Size of the first allocation, clamped to [`buffer_limit`](Self::buffer_limit).
    #[must_use]
    pub fn initial_capacity(&self) -> usize {
        self.initial_buffer_size.min(self.buffer_limit())
    }

    /// Rejects zero sizes.
    ///
    /// Applied by [`from_env`](Self::from_env) and
    /// [`from_lookup`](Self::from_lookup). Configs built in code are passed to
    /// the scanner unchecked; call this first if the values come from users.
    pub fn validate(&self) -> Result<()> {
        if self.max_token_size == 0 {
            bail!("max_token_size must be greater than zero");
        }
        if self.initial_buffer_size == 0 {
            bail!("initial_buffer_size must be greater than zero");
        }
        Ok(())
    }

    /// Reads the config from the process environment, falling back to the
    /// defaults for unset variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key: &str| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup (the environment in
    /// production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let cfg = Self {
            max_token_size: parse_or(&lookup, ENV_MAX_TOKEN_SIZE, defaults.max_token_size)?,
            initial_buffer_size: parse_or(
                &lookup,
                ENV_INITIAL_BUFFER,
                defaults.initial_buffer_size,
            )?,
        };
        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_or<F>(lookup: &F, key: &str, default: usize) -> Result<usize>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}
