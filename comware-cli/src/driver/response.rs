//! Response type for command execution results.

use std::time::Duration;

use serde::Serialize;

use crate::error::{DriverError, Result};

/// Response from a single command.
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    /// The command that was sent.
    pub command: String,

    /// Decoded output with the command echo and trailing prompt removed.
    pub result: String,

    /// Decoded output before normalization.
    #[serde(skip)]
    pub raw_result: String,

    /// The prompt the device settled on.
    pub prompt: String,

    /// Time taken to execute the command.
    #[serde(skip)]
    pub elapsed: Duration,

    /// The error line, if the output matched an error pattern.
    pub failure_message: Option<String>,
}

impl Response {
    /// Create a new successful response.
    pub fn new(
        command: impl Into<String>,
        result: impl Into<String>,
        raw_result: impl Into<String>,
        prompt: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            command: command.into(),
            result: result.into(),
            raw_result: raw_result.into(),
            prompt: prompt.into(),
            elapsed,
            failure_message: None,
        }
    }

    /// Create a response rejected by the device.
    pub fn failed(
        command: impl Into<String>,
        result: impl Into<String>,
        raw_result: impl Into<String>,
        prompt: impl Into<String>,
        elapsed: Duration,
        failure_message: impl Into<String>,
    ) -> Self {
        Self {
            failure_message: Some(failure_message.into()),
            ..Self::new(command, result, raw_result, prompt, elapsed)
        }
    }

    /// Check if the device accepted the command.
    pub fn is_success(&self) -> bool {
        self.failure_message.is_none()
    }

    /// Turn a rejected response into [`DriverError::DeviceRejected`].
    pub fn into_result(self) -> Result<Self> {
        match self.failure_message {
            Some(message) => Err(DriverError::DeviceRejected {
                command: self.command,
                message,
            }
            .into()),
            None => Ok(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_into_result() {
        let ok = Response::new("display clock", "10:00", "", "<SW>", Duration::ZERO);
        assert!(ok.into_result().is_ok());

        let rejected = Response::failed(
            "shutdwn",
            "",
            "",
            "[SW]",
            Duration::ZERO,
            "% Unrecognized command found at '^' position.",
        );
        let err = rejected.into_result().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeviceRejected);
        assert!(err.to_string().contains("shutdwn"));
    }
}
