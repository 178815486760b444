//! Configuration for a C&C node
//!
//! Centralized configuration with sensible defaults.

use crate::error::{CncError, Result};
use crate::protocol::{PacketLimits, PacketLimitsBuilder};

/// Main configuration for a node
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Packet Profile
    // -------------------------------------------------------------------------
    /// Field widths and MTU shared by both codecs
    pub limits: PacketLimits,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// UDP listen address
    pub listen_addr: String,

    /// Socket read timeout (milliseconds); bounds how long shutdown takes
    pub read_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Dispatch Configuration
    // -------------------------------------------------------------------------
    /// Worker threads executing commands
    pub workers: usize,

    /// Packets allowed to wait for a worker before new ones are dropped
    pub queue_depth: usize,

    /// Longest a single command may run (milliseconds)
    pub command_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            limits: PacketLimits::DEFAULT,
            listen_addr: "127.0.0.1:8050".to_string(),
            read_timeout_ms: 500,
            workers: 4,
            queue_depth: 64,
            command_timeout_ms: 10_000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
    limits: PacketLimitsBuilder,
}

impl ConfigBuilder {
    /// Set the transport MTU
    pub fn mtu(mut self, mtu: usize) -> Self {
        self.limits = self.limits.mtu(mtu);
        self
    }

    /// Set the maximum number of command arguments
    pub fn max_num_args(mut self, count: usize) -> Self {
        self.limits = self.limits.max_num_args(count);
        self
    }

    /// Set the longest argument the execution engine accepts
    pub fn max_arg_len(mut self, len: usize) -> Self {
        self.limits = self.limits.max_arg_len(len);
        self
    }

    /// Set the command name field width
    pub fn cmd_name_len(mut self, len: usize) -> Self {
        self.limits = self.limits.cmd_name_len(len);
        self
    }

    /// Set the argument field width
    pub fn arg_len(mut self, len: usize) -> Self {
        self.limits = self.limits.arg_len(len);
        self
    }

    /// Set the bytes of a response reserved for everything but output
    pub fn response_overhead(mut self, overhead: usize) -> Self {
        self.limits = self.limits.response_overhead(overhead);
        self
    }

    /// Set the UDP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the socket read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the number of worker threads
    pub fn workers(mut self, count: usize) -> Self {
        self.config.workers = count;
        self
    }

    /// Set the worker queue depth
    pub fn queue_depth(mut self, depth: usize) -> Self {
        self.config.queue_depth = depth;
        self
    }

    /// Set the per-command timeout (in milliseconds)
    pub fn command_timeout_ms(mut self, ms: u64) -> Self {
        self.config.command_timeout_ms = ms;
        self
    }

    /// Validate and produce the config
    pub fn build(self) -> Result<Config> {
        let mut config = self.config;
        config.limits = self.limits.build()?;

        if config.workers == 0 {
            return Err(CncError::Config("at least one worker is required".to_string()));
        }
        if config.queue_depth == 0 {
            return Err(CncError::Config("queue depth must be positive".to_string()));
        }
        if config.read_timeout_ms == 0 {
            return Err(CncError::Config("read timeout must be positive".to_string()));
        }
        if config.command_timeout_ms == 0 {
            return Err(CncError::Config("command timeout must be positive".to_string()));
        }

        Ok(config)
    }
}
