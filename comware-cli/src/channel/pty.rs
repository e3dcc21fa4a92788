//! PTY channel: one command in flight, read until the terminal settles.

use std::time::Duration;

use log::{debug, trace};
use regex::bytes::Regex;
use tokio::time::Instant;

use super::buffer::PatternBuffer;
use super::terminal::{Classification, TerminalDetector};
use crate::driver::Response;
use crate::error::{ChannelError, Result};
use crate::transport::Transport;

/// Configuration for PTY channel behavior.
#[derive(Debug, Clone)]
pub struct PtyConfig {
    /// How long to wait for the device to settle after a command.
    pub timeout: Duration,

    /// Search depth for pattern matching.
    pub search_depth: usize,

    /// Line terminator appended to commands.
    pub return_char: String,
}

impl Default for PtyConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            search_depth: 1000,
            return_char: "\n".to_string(),
        }
    }
}

/// A question the device may ask mid-command, with the answer to give.
#[derive(Debug, Clone)]
pub struct Interaction {
    /// Pattern identifying the question.
    pub pattern: Regex,

    /// Text sent back (followed by the return character).
    pub answer: String,
}

impl Interaction {
    /// Create an interaction, failing on an invalid pattern.
    pub fn new(pattern: &str, answer: impl Into<String>) -> std::result::Result<Self, ChannelError> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            answer: answer.into(),
        })
    }
}

/// Per-command send options.
#[derive(Debug, Clone)]
pub struct SendOptions {
    /// Append the return character to the command.
    pub newline: bool,

    /// Write the command and return without reading a response.
    pub sendonly: bool,

    /// Questions to answer while the command runs.
    pub interactions: Vec<Interaction>,

    /// Only settle once every interaction has been answered.
    pub check_all: bool,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            newline: true,
            sendonly: false,
            interactions: Vec::new(),
            check_all: false,
        }
    }
}

/// How a read ended.
struct Settled {
    raw: Vec<u8>,
    prompt: Option<String>,
    error: Option<String>,
}

/// Half-duplex command channel over a [`Transport`].
///
/// Tracks the last prompt the device printed, which is the only source of
/// truth for the current terminal mode.
pub struct PtyChannel<T> {
    transport: T,
    detector: TerminalDetector,
    config: PtyConfig,
    buffer: PatternBuffer,
    prompt: Option<String>,
}

impl<T: Transport> PtyChannel<T> {
    /// Create a new PTY channel.
    pub fn new(transport: T, detector: TerminalDetector, config: PtyConfig) -> Self {
        Self {
            buffer: PatternBuffer::new(config.search_depth),
            transport,
            detector,
            config,
            prompt: None,
        }
    }

    /// The last prompt printed by the device, if the session is connected.
    pub fn prompt(&self) -> Option<&str> {
        if self.transport.is_connected() {
            self.prompt.as_deref()
        } else {
            None
        }
    }

    /// The terminal detector in use.
    pub fn detector(&self) -> &TerminalDetector {
        &self.detector
    }

    /// Whether the underlying transport is connected.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Get the default timeout.
    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    /// Set the default timeout.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.config.timeout = timeout;
    }

    /// Wait for a prompt without sending anything (e.g. right after login).
    pub async fn read_until_prompt(&mut self) -> Result<Response> {
        let start = std::time::Instant::now();
        self.buffer.clear();
        let settled = self.read_until_settled(&[], false).await?;
        Ok(self.finish("", settled, start.elapsed()))
    }

    /// Send a command and wait for the device to settle.
    pub async fn send_command(&mut self, command: &str) -> Result<Response> {
        self.send_with(command, &SendOptions::default()).await
    }

    /// Send a command with explicit options.
    ///
    /// A response whose output matched an error pattern is returned as a
    /// failed [`Response`], not an `Err`; only transport trouble is an error.
    pub async fn send_with(&mut self, command: &str, options: &SendOptions) -> Result<Response> {
        if !self.transport.is_connected() {
            self.prompt = None;
            return Err(ChannelError::ConnectionLost.into());
        }

        let start = std::time::Instant::now();
        self.buffer.clear();

        let mut line = command.to_string();
        if options.newline {
            line.push_str(&self.config.return_char);
        }
        debug!("send: {:?}", command);
        self.transport.send(line.as_bytes()).await?;

        if options.sendonly {
            return Ok(Response::new(
                command,
                "",
                "",
                self.prompt.clone().unwrap_or_default(),
                start.elapsed(),
            ));
        }

        let settled = self
            .read_until_settled(&options.interactions, options.check_all)
            .await?;
        Ok(self.finish(command, settled, start.elapsed()))
    }

    /// Close the transport.
    pub async fn close(&mut self) -> Result<()> {
        self.prompt = None;
        self.transport.close().await
    }

    async fn read_until_settled(
        &mut self,
        interactions: &[Interaction],
        check_all: bool,
    ) -> Result<Settled> {
        let timeout = self.config.timeout;
        let deadline = Instant::now() + timeout;
        let mut answered = vec![false; interactions.len()];
        let mut mark = 0;
        let mut error: Option<String> = None;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let chunk = match tokio::time::timeout(remaining, self.transport.read()).await {
                Ok(result) => result?,
                Err(_) => {
                    if error.is_some() {
                        // The device complained but never printed a prompt.
                        return Ok(Settled {
                            raw: self.buffer.take(),
                            prompt: None,
                            error,
                        });
                    }
                    return Err(ChannelError::PromptTimeout(timeout).into());
                }
            };

            let Some(chunk) = chunk else {
                self.prompt = None;
                return Err(ChannelError::ConnectionLost.into());
            };
            trace!("recv {} bytes", chunk.len());
            self.buffer.extend(&chunk);

            if let Some(index) = Self::pending_question(
                interactions,
                &answered,
                self.buffer.tail_from(mark),
            ) {
                answered[index] = true;
                let reply = format!("{}{}", interactions[index].answer, self.config.return_char);
                debug!("answering interactive prompt #{}", index);
                self.transport.send(reply.as_bytes()).await?;
                mark = self.buffer.len();
                continue;
            }

            let region = self.buffer.tail_from(mark);
            let prompt = match self.detector.classify(region) {
                Classification::Running => continue,
                Classification::StderrMatch { error: line } => {
                    if error.is_none() {
                        debug!("error pattern matched: {:?}", line);
                        error = Some(line);
                    }
                    match self.detector.classify_prompt(region).prompt() {
                        Some(prompt) => prompt.to_string(),
                        None => continue,
                    }
                }
                Classification::StdoutMatch { prompt }
                | Classification::ConfigPromptMatch { prompt } => prompt,
            };

            if check_all && answered.iter().any(|done| !done) {
                continue;
            }

            return Ok(Settled {
                raw: self.buffer.take(),
                prompt: Some(prompt),
                error,
            });
        }
    }

    fn pending_question(
        interactions: &[Interaction],
        answered: &[bool],
        region: &[u8],
    ) -> Option<usize> {
        interactions
            .iter()
            .enumerate()
            .find(|(i, it)| !answered[*i] && it.pattern.is_match(region))
            .map(|(i, _)| i)
    }

    fn finish(&mut self, command: &str, settled: Settled, elapsed: Duration) -> Response {
        if let Some(ref prompt) = settled.prompt {
            self.prompt = Some(prompt.clone());
        }
        let prompt = settled.prompt.unwrap_or_default();
        let raw = String::from_utf8_lossy(&settled.raw).into_owned();
        let result = normalize_output(&raw, command, &prompt);

        match settled.error {
            Some(error) => Response::failed(command, result, raw, prompt, elapsed, error),
            None => Response::new(command, result, raw, prompt, elapsed),
        }
    }
}

/// Strip the command echo and the trailing prompt, normalize line endings.
fn normalize_output(raw: &str, command: &str, prompt: &str) -> String {
    let text = raw.replace("\r\n", "\n").replace('\r', "");
    let mut lines: Vec<&str> = text.lines().collect();

    let command = command.trim();
    if !command.is_empty() && lines.first().is_some_and(|l| l.trim() == command) {
        lines.remove(0);
    }
    if !prompt.is_empty() && lines.last().is_some_and(|l| l.trim() == prompt) {
        lines.pop();
    }
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::platform::comware;
    use crate::transport::mock::MockTransport;

    fn channel(mock: MockTransport) -> PtyChannel<MockTransport> {
        let config = PtyConfig {
            timeout: Duration::from_millis(200),
            ..PtyConfig::default()
        };
        PtyChannel::new(mock, comware::terminal(), config)
    }

    #[tokio::test]
    async fn test_initial_prompt() {
        let mut ch = channel(MockTransport::new().banner("\r\n******\r\n<SW-CORE-01>"));
        let response = ch.read_until_prompt().await.unwrap();
        assert_eq!(response.prompt, "<SW-CORE-01>");
        assert_eq!(ch.prompt(), Some("<SW-CORE-01>"));
    }

    #[tokio::test]
    async fn test_output_across_chunks() {
        let mock = MockTransport::new().on(
            "display clock",
            &["display clock\r\n10:00", ":00 UTC Mon 01/01/2024\r\n", "<SW-CORE-01>"],
        );
        let mut ch = channel(mock);
        let response = ch.send_command("display clock").await.unwrap();
        assert!(response.is_success());
        assert_eq!(response.result, "10:00:00 UTC Mon 01/01/2024");
        assert_eq!(response.prompt, "<SW-CORE-01>");
    }

    #[tokio::test]
    async fn test_error_response_waits_for_prompt() {
        let mock = MockTransport::new().on(
            "shutdwn",
            &[
                "shutdwn\r\n          ^\r\n % Unrecognized command found at '^' position.\r\n",
                "[SW-CORE-01-GigabitEthernet1/0/1]",
            ],
        );
        let mut ch = channel(mock);
        let response = ch.send_command("shutdwn").await.unwrap();
        assert!(!response.is_success());
        assert_eq!(response.prompt, "[SW-CORE-01-GigabitEthernet1/0/1]");
        assert_eq!(ch.prompt(), Some("[SW-CORE-01-GigabitEthernet1/0/1]"));
    }

    #[tokio::test]
    async fn test_error_without_prompt_still_fails_command() {
        let mock = MockTransport::new().on("bogus", &["% Unrecognized command found at '^' position."]);
        let mut ch = channel(mock);
        let response = ch.send_command("bogus").await.unwrap();
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn test_eof_is_connection_lost() {
        let mut ch = channel(MockTransport::new().on_eof("reboot"));
        let err = ch.send_command("reboot").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionLost);
        assert_eq!(ch.prompt(), None);
    }

    #[tokio::test]
    async fn test_timeout_is_connection_failure() {
        let mut ch = channel(MockTransport::new());
        let err = ch.send_command("display version").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionFailure);
    }

    #[tokio::test]
    async fn test_interactive_answer() {
        let mock = MockTransport::new()
            .on("save force", &["save force\r\nThe current configuration will be written. Continue? [Y/N]:"])
            .on("Y", &["Y\r\nSaved the current configuration to mainboard device successfully.\r\n<SW>"]);
        let mut ch = channel(mock);
        let options = SendOptions {
            interactions: vec![Interaction::new(r"\[Y/N\]:$", "Y").unwrap()],
            ..SendOptions::default()
        };
        let response = ch.send_with("save force", &options).await.unwrap();
        assert!(response.is_success());
        assert_eq!(response.prompt, "<SW>");
    }

    #[tokio::test]
    async fn test_sendonly_does_not_read() {
        let mock = MockTransport::new();
        let log = mock.sent_log();
        let mut ch = channel(mock);
        let options = SendOptions {
            sendonly: true,
            ..SendOptions::default()
        };
        let response = ch.send_with("reboot", &options).await.unwrap();
        assert_eq!(response.result, "");
        assert_eq!(*log.lock().unwrap(), vec!["reboot"]);
    }

    #[test]
    fn test_normalize_output() {
        let raw = "display clock\r\n10:00:00 UTC\r\n\r\n<SW>";
        assert_eq!(normalize_output(raw, "display clock", "<SW>"), "10:00:00 UTC");
    }
}
