//! Configuration mode tracking.
//!
//! Comware has one transition that matters: user view to system view and
//! back. The controller never assumes a transition worked; the state only
//! changes once the device prints a prompt that confirms it.
//!
//! ```text
//!            enter_config             prompt [..]
//!  Normal ───────────────► Entering ───────────────► Config
//!    ▲                         │ prompt <..>            │
//!    │◄────────────────────────┘ (escalation failed)    │ exit_config
//!    │             prompt <..>                          ▼
//!    └──────────────────────────────────────────── Leaving
//! ```

use log::debug;

use crate::channel::{PtyChannel, TerminalDetector};
use crate::error::{DriverError, Result};
use crate::platform::PlatformDefinition;
use crate::transport::Transport;

/// Where the session is believed to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeState {
    /// User view.
    Normal,
    /// `system-view` sent, prompt not confirmed yet.
    EnteringConfig,
    /// System view or one of its sub-views.
    Config,
    /// Exit command sent, prompt not confirmed yet.
    LeavingConfig,
}

/// Drives and tracks configuration mode transitions.
#[derive(Debug, Clone)]
pub struct ModeController {
    state: ModeState,
    enter_command: String,
    exit_command: String,
}

impl ModeController {
    pub fn new(enter_command: impl Into<String>, exit_command: impl Into<String>) -> Self {
        Self {
            state: ModeState::Normal,
            enter_command: enter_command.into(),
            exit_command: exit_command.into(),
        }
    }

    pub fn from_platform(platform: &PlatformDefinition) -> Self {
        Self::new(&platform.config_command, &platform.exit_config_command)
    }

    pub fn state(&self) -> ModeState {
        self.state
    }

    pub fn in_config_mode(&self) -> bool {
        self.state == ModeState::Config
    }

    /// Resynchronize with the prompt the device last printed.
    ///
    /// An unknown prompt leaves the state alone.
    pub fn observe(&mut self, prompt: Option<&str>, detector: &TerminalDetector) {
        if let Some(prompt) = prompt {
            self.state = if detector.is_config_prompt(prompt) {
                ModeState::Config
            } else {
                ModeState::Normal
            };
        }
    }

    /// Enter system view. A no-op if the last prompt is already a
    /// configuration prompt.
    pub async fn enter_config<T: Transport>(&mut self, channel: &mut PtyChannel<T>) -> Result<()> {
        let Some(prompt) = channel.prompt().map(str::to_string) else {
            return Err(DriverError::PrivilegeEscalationFailed {
                prompt: None,
                message: "no prompt observed, refusing to change mode".to_string(),
            }
            .into());
        };
        if channel.detector().is_config_prompt(&prompt) {
            self.state = ModeState::Config;
            return Ok(());
        }

        debug!("entering configuration mode from {}", prompt);
        self.state = ModeState::EnteringConfig;
        let response = match channel.send_command(&self.enter_command).await {
            Ok(response) => response,
            Err(e) => {
                self.resync(channel);
                return Err(e);
            }
        };
        self.resync(channel);

        if let Some(message) = response.failure_message {
            return Err(DriverError::PrivilegeEscalationFailed {
                prompt: Some(response.prompt),
                message,
            }
            .into());
        }
        if self.state != ModeState::Config {
            return Err(DriverError::PrivilegeEscalationFailed {
                message: format!("'{}' did not reach a configuration prompt", self.enter_command),
                prompt: Some(response.prompt),
            }
            .into());
        }
        Ok(())
    }

    /// Return to user view. Nothing is sent unless the last prompt is a
    /// configuration prompt.
    pub async fn exit_config<T: Transport>(&mut self, channel: &mut PtyChannel<T>) -> Result<()> {
        let Some(prompt) = channel.prompt().map(str::to_string) else {
            return Ok(());
        };
        if !channel.detector().is_config_prompt(&prompt) {
            self.state = ModeState::Normal;
            return Ok(());
        }

        debug!("leaving configuration mode from {}", prompt);
        self.state = ModeState::LeavingConfig;
        let response = match channel.send_command(&self.exit_command).await {
            Ok(response) => response,
            Err(e) => {
                self.resync(channel);
                return Err(e);
            }
        };
        self.resync(channel);

        if self.state != ModeState::Normal {
            return Err(DriverError::PrivilegeEscalationFailed {
                message: response
                    .failure_message
                    .unwrap_or_else(|| format!("'{}' did not leave configuration mode", self.exit_command)),
                prompt: Some(response.prompt),
            }
            .into());
        }
        Ok(())
    }

    fn resync<T: Transport>(&mut self, channel: &PtyChannel<T>) {
        match channel.prompt() {
            Some(prompt) => self.state = Self::mode_of(prompt, channel.detector()),
            // Lost the session: nothing is confirmed any more.
            None => self.state = ModeState::Normal,
        }
    }

    fn mode_of(prompt: &str, detector: &TerminalDetector) -> ModeState {
        if detector.is_config_prompt(prompt) {
            ModeState::Config
        } else {
            ModeState::Normal
        }
    }
}
