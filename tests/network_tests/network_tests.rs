//! Tests for the UDP transport
//!
//! These tests verify:
//! - Client/server round trip through the dispatcher
//! - Malformed and oversize datagrams are dropped without a reply
//! - Graceful shutdown

use std::net::UdpSocket;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use cnc::config::Config;
use cnc::dispatch::Executor;
use cnc::network::{Client, Server, ShutdownHandle};
use cnc::protocol::{Action, CommandPacket, PacketLimits, ResponseCodec, ResponsePacket};
use cnc::CncError;

// =============================================================================
// Helper Functions
// =============================================================================

fn stub_executor() -> Arc<dyn Executor> {
    Arc::new(|command: &CommandPacket| match command.action {
        Action::Execute => ResponsePacket::ok(0.003, command.arguments.join(" ")),
        Action::Status => ResponsePacket::ok(0.0, "nominal"),
        Action::Version => ResponsePacket::ok(0.0, "test"),
        Action::Help => ResponsePacket::failure(1, 0.0, "no help"),
    })
}

fn start_server(config: Config) -> (std::net::SocketAddr, ShutdownHandle, JoinHandle<()>) {
    let server = Server::bind(config, stub_executor()).unwrap();
    let addr = server.local_addr().unwrap();
    let handle = server.shutdown_handle();
    let join = thread::spawn(move || server.run().unwrap());
    (addr, handle, join)
}

fn test_config() -> Config {
    Config::builder()
        .listen_addr("127.0.0.1:0")
        .workers(2)
        .read_timeout_ms(20)
        .build()
        .unwrap()
}

// =============================================================================
// Round Trip Tests
// =============================================================================

#[test]
fn test_client_server_round_trip() {
    let (addr, shutdown, join) = start_server(test_config());
    let client = Client::connect(addr, PacketLimits::DEFAULT, Duration::from_secs(2)).unwrap();

    let response = client
        .send(&CommandPacket::execute("echo", ["a", "b"]))
        .unwrap();
    assert_eq!(response, ResponsePacket::ok(0.003, "a b"));

    let response = client.send(&CommandPacket::status()).unwrap();
    assert_eq!(response.output, "nominal");

    let response = client.send(&CommandPacket::help("")).unwrap();
    assert_eq!(response.return_code, 1);

    shutdown.shutdown();
    join.join().unwrap();
}

#[test]
fn test_client_rejects_invalid_command_locally() {
    let (addr, shutdown, join) = start_server(test_config());
    let client = Client::connect(addr, PacketLimits::DEFAULT, Duration::from_millis(200)).unwrap();

    let cmd = CommandPacket::execute("echo", ["x".repeat(21)]);
    let result = client.send(&cmd);
    assert!(matches!(result, Err(CncError::Codec(_))));

    shutdown.shutdown();
    join.join().unwrap();
}

#[test]
fn test_small_mtu_profile() {
    let config = Config::builder()
        .listen_addr("127.0.0.1:0")
        .mtu(48)
        .read_timeout_ms(20)
        .build()
        .unwrap();
    let limits = config.limits;
    let (addr, shutdown, join) = start_server(config);
    let client = Client::connect(addr, limits, Duration::from_secs(2)).unwrap();

    let long_args: Vec<String> = (0..4).map(|i| format!("{:0>8}", i)).collect();
    let response = client.send(&CommandPacket::execute("echo", long_args)).unwrap();

    // "00000000 00000001 00000002 00000003" is 35 bytes; 39 fit
    assert_eq!(response.output.len(), 35);

    shutdown.shutdown();
    join.join().unwrap();
}

// =============================================================================
// Rejection Tests
// =============================================================================

#[test]
fn test_malformed_datagram_gets_no_reply() {
    let (addr, shutdown, join) = start_server(test_config());

    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket.set_read_timeout(Some(Duration::from_millis(200))).unwrap();
    socket.send_to(&[0x04, 0x00, 0x00], addr).unwrap();

    let mut buf = [0u8; 512];
    assert!(socket.recv_from(&mut buf).is_err());

    // The server is still serving afterwards
    let client = Client::connect(addr, PacketLimits::DEFAULT, Duration::from_secs(2)).unwrap();
    assert_eq!(client.send(&CommandPacket::version()).unwrap().output, "test");

    shutdown.shutdown();
    join.join().unwrap();
}

#[test]
fn test_oversize_datagram_gets_no_reply() {
    let (addr, shutdown, join) = start_server(test_config());

    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket.set_read_timeout(Some(Duration::from_millis(200))).unwrap();
    socket.send_to(&[0u8; 400], addr).unwrap();

    let mut buf = [0u8; 512];
    assert!(socket.recv_from(&mut buf).is_err());

    shutdown.shutdown();
    join.join().unwrap();
}

#[test]
fn test_client_times_out_without_server() {
    // Bind and immediately drop a socket so nothing listens on the port
    let addr = UdpSocket::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
    let client = Client::connect(addr, PacketLimits::DEFAULT, Duration::from_millis(100)).unwrap();

    let result = client.send(&CommandPacket::status());
    assert!(result.is_err());
}

#[test]
fn test_response_decoded_with_profile() {
    let (addr, shutdown, join) = start_server(test_config());

    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    socket.send_to(&[0x02, 0x00, 0x00], addr).unwrap();

    let mut buf = [0u8; 512];
    let (len, _) = socket.recv_from(&mut buf).unwrap();
    let response = ResponseCodec::new(PacketLimits::DEFAULT)
        .decode(&buf[..len])
        .unwrap();
    assert_eq!(response.output, "test");

    shutdown.shutdown();
    join.join().unwrap();
}

// =============================================================================
// Shutdown Tests
// =============================================================================

#[test]
fn test_shutdown_stops_server() {
    let (_addr, shutdown, join) = start_server(test_config());

    assert!(!shutdown.is_shutdown());
    shutdown.shutdown();
    assert!(shutdown.is_shutdown());

    join.join().unwrap();
}
