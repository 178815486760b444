//! Network Module
//!
//! UDP transport for the C&C protocol: one datagram carries one packet.
//!
//! ## Architecture
//! - Single receive thread
//! - Worker thread pool fed through a bounded queue
//! - Packets routed through the Dispatcher

mod server;
mod client;

pub use server::{Server, ShutdownHandle};
pub use client::Client;
