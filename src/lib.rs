//! # cnc
//!
//! Command-and-control protocol for MTU-constrained links:
//! - Bounded command and response packets sized to the link MTU
//! - Exact-inverse codecs that fail closed on malformed input
//! - A dispatch contract separating codec errors from execution failures
//! - UDP transport with a worker pool
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      UDP Server                              │
//! │                 (one packet per datagram)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  bytes (≤ MTU)
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                    Dispatcher                                │
//! │     CommandCodec ──► Executor ──► ResponseCodec              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!                       ▼
//!               ┌───────────────┐
//!               │  ShellEngine  │
//!               │ (child procs) │
//!               └───────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod dispatch;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{CncError, CodecError, CodecResult, Result};
pub use config::Config;
pub use protocol::{Action, CommandCodec, CommandPacket, PacketLimits, ResponseCodec, ResponsePacket};
pub use dispatch::{Dispatcher, Executor, ShellEngine};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of cnc
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
