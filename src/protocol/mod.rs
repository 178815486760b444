//! Protocol Module
//!
//! Defines the wire protocol between a controller and a node.
//!
//! ## Command Format
//! ```text
//! ┌───────────┬─────────────┬──────────┬──────────┬───────────────────────────┐
//! │ Action(1) │ NameLen (1) │ Name (n) │ Argc (1) │ argc × [ArgLen (1) + Arg] │
//! └───────────┴─────────────┴──────────┴──────────┴───────────────────────────┘
//! ```
//!
//! ### Actions
//! - 0x00: EXECUTE - Name: program, Args: positional arguments
//! - 0x01: STATUS  - Name/Args ignored
//! - 0x02: VERSION - Name/Args ignored
//! - 0x03: HELP    - Name: optional topic filter
//!
//! ## Response Format
//! ```text
//! ┌──────────┬──────────────────────────┬──────────────────────────┐
//! │ Code (1) │ Exec Time (8, f64 LE)    │ Output (remaining bytes) │
//! └──────────┴──────────────────────────┴──────────────────────────┘
//! ```
//!
//! Every packet in either direction fits the link MTU.

mod schema;
mod command;
mod response;
mod codec;

pub use schema::{
    Action, PacketLimits, PacketLimitsBuilder, COMMAND_HEADER_LEN, DEFAULT_ARG_LEN,
    DEFAULT_CMD_NAME_LEN, DEFAULT_MAX_ARG_LEN, DEFAULT_MAX_NUM_ARGS, DEFAULT_MTU,
    DEFAULT_RESPONSE_OVERHEAD, DEFAULT_STDOUT_LEN, DEFAULT_STR_LEN, MAX_FIELD_LEN,
    RESPONSE_HEADER_LEN,
};
pub use command::CommandPacket;
pub use response::{ResponsePacket, RC_FAILURE, RC_SUCCESS};
pub use codec::{truncate_output, CommandCodec, ResponseCodec};
