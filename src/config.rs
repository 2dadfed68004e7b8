//! Centralized configuration for QuiverSST tools.
//!
//! The codecs themselves take their geometry explicitly (`payload_size` / `chunk_size`);
//! this config only carries defaults and guards for callers that move tables to and
//! from files (the CLI and `file` helpers).
//!
//! Env (all optional):
//! - SST_PAYLOAD_SIZE   : default v1 payload size (u16, default 10)
//! - SST_CHUNK_SIZE     : default v2 chunk size (u16, default 64)
//! - SST_MAX_TABLE_BYTES: refuse to read table files larger than this (default 1 GiB)
//! - SST_STRICT_LOAD    : run a full structural check after reading a file (default false)

use crate::error::{Result, SstError};
use crate::table::chunked::ChunkLayout;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SstConfig {
    /// Default payload size for new v1 tables.
    /// Env: SST_PAYLOAD_SIZE (default 10)
    pub payload_size: u16,

    /// Default chunk size for new v2 tables (must exceed the 8-byte chunk header).
    /// Env: SST_CHUNK_SIZE (default 64)
    pub chunk_size: u16,

    /// Upper bound for a table file read from disk, in bytes.
    /// Env: SST_MAX_TABLE_BYTES (default 1 GiB)
    pub max_table_bytes: usize,

    /// Run `check()` after reading a file and fail on any problem.
    /// Env: SST_STRICT_LOAD = 0|1|true|false (default false)
    pub strict_load: bool,
}

impl Default for SstConfig {
    fn default() -> Self {
        Self {
            payload_size: 10,
            chunk_size: 64,
            max_table_bytes: 1usize << 30,
            strict_load: false,
        }
    }
}

impl SstConfig {
    /// Load configuration from environment variables; unparsable values keep defaults.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("SST_PAYLOAD_SIZE") {
            if let Ok(n) = v.trim().parse::<u16>() {
                cfg.payload_size = n;
            }
        }

        if let Ok(v) = std::env::var("SST_CHUNK_SIZE") {
            if let Ok(n) = v.trim().parse::<u16>() {
                cfg.chunk_size = n;
            }
        }

        if let Ok(v) = std::env::var("SST_MAX_TABLE_BYTES") {
            if let Ok(n) = v.trim().parse::<usize>() {
                cfg.max_table_bytes = n;
            }
        }

        if let Ok(v) = std::env::var("SST_STRICT_LOAD") {
            cfg.strict_load = parse_bool(&v);
        }

        cfg
    }

    pub fn with_payload_size(mut self, size: u16) -> Self {
        self.payload_size = size;
        self
    }

    pub fn with_chunk_size(mut self, size: u16) -> Self {
        self.chunk_size = size;
        self
    }

    pub fn with_max_table_bytes(mut self, bytes: usize) -> Self {
        self.max_table_bytes = bytes;
        self
    }

    pub fn with_strict_load(mut self, on: bool) -> Self {
        self.strict_load = on;
        self
    }

    /// Reject settings the codecs cannot work with.
    pub fn validate(&self) -> Result<()> {
        ChunkLayout::new(self.chunk_size)?;
        if self.max_table_bytes == 0 {
            return Err(SstError::Config("max_table_bytes must be > 0".into()));
        }
        Ok(())
    }
}

fn parse_bool(v: &str) -> bool {
    let s = v.trim().to_ascii_lowercase();
    s == "1" || s == "true" || s == "yes" || s == "on"
}
