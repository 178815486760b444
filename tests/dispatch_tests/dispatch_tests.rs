//! Tests for the Dispatcher
//!
//! These tests verify:
//! - Decoded commands reach the executor unchanged
//! - Rejected packets never reach the executor
//! - Execution failures travel as response data
//! - Output truncation on the way out

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use cnc::dispatch::{Dispatcher, Executor};
use cnc::protocol::{
    Action, CommandCodec, CommandPacket, PacketLimits, ResponseCodec, ResponsePacket,
};
use cnc::CodecError;

// =============================================================================
// Helper Functions
// =============================================================================

/// Executor that records how often it ran and echoes the command back
struct EchoExecutor {
    calls: AtomicUsize,
}

impl EchoExecutor {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Executor for EchoExecutor {
    fn execute(&self, command: &CommandPacket) -> ResponsePacket {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let output = format!(
            "{} {} {}",
            command.action,
            command.command_name,
            command.arguments.join(" ")
        );
        ResponsePacket::ok(0.001, output)
    }
}

fn encode(cmd: &CommandPacket) -> Vec<u8> {
    CommandCodec::new(PacketLimits::DEFAULT)
        .encode(cmd)
        .unwrap()
        .to_vec()
}

fn decode(bytes: &[u8]) -> ResponsePacket {
    ResponseCodec::new(PacketLimits::DEFAULT).decode(bytes).unwrap()
}

// =============================================================================
// Dispatch Tests
// =============================================================================

#[test]
fn test_handle_runs_executor() {
    let executor = EchoExecutor::new();
    let dispatcher = Dispatcher::new(PacketLimits::DEFAULT, executor.clone());

    let cmd = CommandPacket::execute("ls", ["-l", "/tmp"]);
    let response = decode(&dispatcher.handle(&encode(&cmd)).unwrap());

    assert_eq!(response.return_code, 0);
    assert_eq!(response.output, "execute ls -l /tmp");
    assert_eq!(executor.calls(), 1);
}

#[test]
fn test_dispatch_decoded_command() {
    let executor = EchoExecutor::new();
    let dispatcher = Dispatcher::new(PacketLimits::DEFAULT, executor.clone());

    let response = dispatcher.dispatch(&CommandPacket::help("status"));

    assert_eq!(response.output, "help status ");
    assert_eq!(executor.calls(), 1);
}

#[test]
fn test_closure_executor() {
    let executor = |command: &CommandPacket| match command.action {
        Action::Version => ResponsePacket::ok(0.0, "1.2.3"),
        _ => ResponsePacket::failure(1, 0.0, "unsupported"),
    };
    let dispatcher = Dispatcher::new(PacketLimits::DEFAULT, Arc::new(executor));

    let version = decode(&dispatcher.handle(&encode(&CommandPacket::version())).unwrap());
    assert_eq!(version.output, "1.2.3");

    let status = decode(&dispatcher.handle(&encode(&CommandPacket::status())).unwrap());
    assert_eq!(status.return_code, 1);
    assert_eq!(status.output, "unsupported");
}

// =============================================================================
// Rejection Tests
// =============================================================================

#[test]
fn test_malformed_packet_not_dispatched() {
    let executor = EchoExecutor::new();
    let dispatcher = Dispatcher::new(PacketLimits::DEFAULT, executor.clone());

    let result = dispatcher.handle(&[0x00]);

    assert!(matches!(result, Err(CodecError::Malformed(_))));
    assert_eq!(executor.calls(), 0);
}

#[test]
fn test_unknown_action_not_dispatched() {
    let executor = EchoExecutor::new();
    let dispatcher = Dispatcher::new(PacketLimits::DEFAULT, executor.clone());

    let result = dispatcher.handle(&[0x04, 0x00, 0x00]);

    assert_eq!(result, Err(CodecError::UnknownAction(4)));
    assert_eq!(executor.calls(), 0);
}

#[test]
fn test_over_limit_packet_not_dispatched() {
    let executor = EchoExecutor::new();
    let dispatcher = Dispatcher::new(PacketLimits::DEFAULT, executor.clone());

    let result = dispatcher.handle(&[0x00, 0x00, 0x0B]);

    assert!(matches!(result, Err(CodecError::Validation(_))));
    assert_eq!(executor.calls(), 0);
}

// =============================================================================
// Execution Failure Tests
// =============================================================================

#[test]
fn test_execution_failure_is_data() {
    let executor = |_: &CommandPacket| ResponsePacket::failure(124, 30.0, "timed out");
    let dispatcher = Dispatcher::new(PacketLimits::DEFAULT, Arc::new(executor));

    let encoded = dispatcher
        .handle(&encode(&CommandPacket::execute("sleep", ["60"])))
        .unwrap();
    let response = decode(&encoded);

    assert_eq!(response, ResponsePacket::failure(124, 30.0, "timed out"));
}

#[test]
fn test_large_output_truncated_not_dropped() {
    let limits = PacketLimits::builder().mtu(64).build().unwrap();
    let executor = |_: &CommandPacket| ResponsePacket::ok(0.0, "z".repeat(500));
    let dispatcher = Dispatcher::new(limits, Arc::new(executor));

    let cmd = CommandPacket::execute("cat", ["big"]);
    let request = CommandCodec::new(limits).encode(&cmd).unwrap();
    let encoded = dispatcher.handle(&request).unwrap();

    assert_eq!(encoded.len(), 64);
    let response = ResponseCodec::new(limits).decode(&encoded).unwrap();
    assert_eq!(response.output, "z".repeat(55));
}

#[test]
fn test_dispatcher_reports_limits() {
    let limits = PacketLimits::builder().mtu(128).build().unwrap();
    let dispatcher = Dispatcher::new(limits, EchoExecutor::new());

    assert_eq!(dispatcher.limits().mtu(), 128);
}

#[test]
fn test_dispatcher_shared_across_threads() {
    let executor = EchoExecutor::new();
    let dispatcher = Dispatcher::new(PacketLimits::DEFAULT, executor.clone());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let dispatcher = dispatcher.clone();
            std::thread::spawn(move || {
                let cmd = CommandPacket::execute("echo", [i.to_string()]);
                let response = decode(&dispatcher.handle(&encode(&cmd)).unwrap());
                assert_eq!(response.output, format!("execute echo {}", i));
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(executor.calls(), 8);
}
