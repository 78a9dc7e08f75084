//! Configuration for Skyhash connections
//!
//! An explicit, immutable value handed to `connect`. There is no
//! process-wide builder state.

use std::time::Duration;

use crate::error::{Result, SkyError};

/// Default port Skytable listens on
pub const DEFAULT_PORT: u16 = 2003;

/// Connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Endpoint
    // -------------------------------------------------------------------------
    /// Host running the server
    pub host: String,

    /// TCP port of the server
    pub port: u16,

    // -------------------------------------------------------------------------
    // Read-Drive Loop
    // -------------------------------------------------------------------------
    /// Bytes requested from the transport per read
    pub read_chunk_size: usize,

    /// Initial capacity of the accumulation buffer
    pub buffer_capacity: usize,

    /// Maximum nesting of recursive arrays accepted from the server
    pub max_depth: usize,

    /// Largest incomplete frame kept buffered before giving up (in bytes)
    pub max_frame_size: usize,

    // -------------------------------------------------------------------------
    // Transport
    // -------------------------------------------------------------------------
    /// Disable Nagle's algorithm
    pub nodelay: bool,

    /// Socket read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Socket write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Pool
    // -------------------------------------------------------------------------
    /// Max physical connections held by a pool
    pub pool_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            read_chunk_size: 1024,
            buffer_capacity: 4096,
            max_depth: 64,
            max_frame_size: 16 * 1024 * 1024, // 16 MB
            nodelay: true,
            read_timeout_ms: 0,
            write_timeout_ms: 0,
            pool_size: 8,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// `host:port` string used to open the TCP transport
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_ms > 0).then(|| Duration::from_millis(self.read_timeout_ms))
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        (self.write_timeout_ms > 0).then(|| Duration::from_millis(self.write_timeout_ms))
    }

    /// Reject settings the read loop cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(SkyError::Config("host must not be empty".to_string()));
        }
        if self.read_chunk_size == 0 {
            return Err(SkyError::Config("read_chunk_size must be at least 1".to_string()));
        }
        if self.max_depth == 0 {
            return Err(SkyError::Config("max_depth must be at least 1".to_string()));
        }
        if self.max_frame_size == 0 {
            return Err(SkyError::Config("max_frame_size must be at least 1".to_string()));
        }
        if self.pool_size == 0 {
            return Err(SkyError::Config("pool_size must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the server host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the server port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the number of bytes requested per transport read
    pub fn read_chunk_size(mut self, size: usize) -> Self {
        self.config.read_chunk_size = size;
        self
    }

    /// Set the initial accumulation buffer capacity
    pub fn buffer_capacity(mut self, size: usize) -> Self {
        self.config.buffer_capacity = size;
        self
    }

    /// Set the maximum array nesting depth
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.config.max_depth = depth;
        self
    }

    /// Set the largest incomplete frame kept buffered
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.config.max_frame_size = size;
        self
    }

    pub fn nodelay(mut self, nodelay: bool) -> Self {
        self.config.nodelay = nodelay;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the maximum number of pooled connections
    pub fn pool_size(mut self, size: usize) -> Self {
        self.config.pool_size = size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
