//! Dispatch Module
//!
//! The boundary between decoded commands and whatever executes them.
//!
//! ## Flow
//! ```text
//!   bytes ──► CommandCodec::decode ──► Executor::execute ──► ResponseCodec::encode ──► bytes
//!                   │
//!                   └── CodecError (packet dropped, executor never called)
//! ```
//!
//! Executors never fail: a command that cannot run, exits non-zero or times
//! out is reported through the return code and output of its response.

use std::sync::Arc;

use bytes::Bytes;

use crate::error::CodecResult;
use crate::protocol::{CommandCodec, CommandPacket, PacketLimits, ResponseCodec, ResponsePacket};

mod shell;

pub use shell::{
    return_code_for_exit, EngineStats, ShellEngine, RC_NOT_EXECUTABLE, RC_NOT_FOUND, RC_TIMEOUT,
};

/// Something that turns a command into a response
///
/// Implementations are shared between worker threads and must serialize
/// access to any state they touch themselves.
pub trait Executor: Send + Sync {
    /// Execute a command and describe the outcome
    fn execute(&self, command: &CommandPacket) -> ResponsePacket;
}

impl<F> Executor for F
where
    F: Fn(&CommandPacket) -> ResponsePacket + Send + Sync,
{
    fn execute(&self, command: &CommandPacket) -> ResponsePacket {
        self(command)
    }
}

/// Decodes inbound packets, runs them and encodes the result
#[derive(Clone)]
pub struct Dispatcher {
    command_codec: CommandCodec,
    response_codec: ResponseCodec,
    executor: Arc<dyn Executor>,
}

impl Dispatcher {
    /// Create a dispatcher for one link profile
    pub fn new(limits: PacketLimits, executor: Arc<dyn Executor>) -> Self {
        Self {
            command_codec: CommandCodec::new(limits),
            response_codec: ResponseCodec::new(limits),
            executor,
        }
    }

    /// The profile both codecs enforce
    pub fn limits(&self) -> &PacketLimits {
        self.command_codec.limits()
    }

    /// Run an already decoded command
    pub fn dispatch(&self, command: &CommandPacket) -> ResponsePacket {
        tracing::trace!("Dispatching {:?}", command);

        let response = self.executor.execute(command);

        if response.is_success() {
            tracing::debug!(
                "{} '{}' completed in {:.3}s",
                command.action,
                command.command_name,
                response.execution_time
            );
        } else {
            tracing::debug!(
                "{} '{}' failed with code {} in {:.3}s",
                command.action,
                command.command_name,
                response.return_code,
                response.execution_time
            );
        }

        response
    }

    /// Handle one inbound packet
    ///
    /// Only decoding can fail; a rejected packet never reaches the executor.
    pub fn handle(&self, packet: &[u8]) -> CodecResult<Bytes> {
        let command = self.command_codec.decode(packet)?;
        let response = self.dispatch(&command);
        Ok(self.response_codec.encode(&response))
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("limits", self.limits())
            .finish_non_exhaustive()
    }
}
