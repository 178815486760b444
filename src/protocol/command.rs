//! Command definitions
//!
//! Represents commands sent to a node.

use crate::error::{CodecError, CodecResult};
use super::{Action, PacketLimits};

/// A command packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPacket {
    /// Operation to perform
    pub action: Action,

    /// Program to run for `Execute`; action-defined otherwise
    pub command_name: String,

    /// Positional arguments, in order
    pub arguments: Vec<String>,
}

impl CommandPacket {
    /// Create a command with the given action, name and arguments
    pub fn new<I, S>(action: Action, command_name: impl Into<String>, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            action,
            command_name: command_name.into(),
            arguments: arguments.into_iter().map(Into::into).collect(),
        }
    }

    /// Create an `Execute` command
    pub fn execute<I, S>(program: impl Into<String>, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Action::Execute, program, arguments)
    }

    /// Create a `Status` command
    pub fn status() -> Self {
        Self::new(Action::Status, "", Vec::<String>::new())
    }

    /// Create a `Version` command
    pub fn version() -> Self {
        Self::new(Action::Version, "", Vec::<String>::new())
    }

    /// Create a `Help` command, optionally filtered to one topic
    pub fn help(topic: impl Into<String>) -> Self {
        Self::new(Action::Help, topic, Vec::<String>::new())
    }

    /// Check every field against the bounds of `limits`
    pub fn validate(&self, limits: &PacketLimits) -> CodecResult<()> {
        if self.command_name.len() > limits.cmd_name_len() {
            return Err(CodecError::Validation(format!(
                "command name is {} bytes (max {})",
                self.command_name.len(),
                limits.cmd_name_len()
            )));
        }

        if self.arguments.len() > limits.max_num_args() {
            return Err(CodecError::Validation(format!(
                "{} arguments (max {})",
                self.arguments.len(),
                limits.max_num_args()
            )));
        }

        if let Some((index, arg)) = self
            .arguments
            .iter()
            .enumerate()
            .find(|(_, arg)| arg.len() > limits.arg_len())
        {
            return Err(CodecError::Validation(format!(
                "argument {} is {} bytes (max {})",
                index,
                arg.len(),
                limits.arg_len()
            )));
        }

        Ok(())
    }

    /// Exact encoded size of this command
    pub fn encoded_len(&self) -> usize {
        super::COMMAND_HEADER_LEN
            + self.command_name.len()
            + self.arguments.iter().map(|arg| 1 + arg.len()).sum::<usize>()
    }
}
