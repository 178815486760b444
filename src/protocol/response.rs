//! Response definitions
//!
//! Represents the result of executing a command.

/// Return code for a successful command
pub const RC_SUCCESS: u8 = 0;

/// Return code for a generic failure
pub const RC_FAILURE: u8 = 1;

/// A response packet
#[derive(Debug, Clone, PartialEq)]
pub struct ResponsePacket {
    /// Exit status of the command, 0 on success
    pub return_code: u8,

    /// Wall-clock execution time in seconds
    pub execution_time: f64,

    /// Captured output; truncated by the codec if it exceeds the link budget
    pub output: String,
}

impl ResponsePacket {
    /// Create a response, clamping a negative or non-finite execution time to zero
    pub fn new(return_code: u8, execution_time: f64, output: impl Into<String>) -> Self {
        Self {
            return_code,
            execution_time: sanitize_seconds(execution_time),
            output: output.into(),
        }
    }

    /// Create a successful response
    pub fn ok(execution_time: f64, output: impl Into<String>) -> Self {
        Self::new(RC_SUCCESS, execution_time, output)
    }

    /// Create a failed response with an explanatory message
    pub fn failure(return_code: u8, execution_time: f64, message: impl Into<String>) -> Self {
        Self::new(return_code, execution_time, message)
    }

    /// Whether the command reported success
    pub fn is_success(&self) -> bool {
        self.return_code == RC_SUCCESS
    }
}

/// Execution times are finite and non-negative; anything else becomes zero.
pub(crate) fn sanitize_seconds(seconds: f64) -> f64 {
    if !seconds.is_finite() || seconds < 0.0 {
        0.0
    } else {
        seconds
    }
}
