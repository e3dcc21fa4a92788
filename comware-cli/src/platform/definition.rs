//! Platform definition for device-family specific configuration.

use crate::channel::TerminalDetector;

/// A best-effort command run right after login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnOpenCommand {
    pub command: String,

    /// Reported through the session's event sink when the command fails.
    pub warning: String,
}

/// Platform definition containing all device-family specific configuration.
#[derive(Debug, Clone)]
pub struct PlatformDefinition {
    /// Platform name (e.g., "comware").
    pub name: String,

    /// Prompt and error patterns.
    pub terminal: TerminalDetector,

    /// Command that enters configuration mode.
    pub config_command: String,

    /// Command that leaves configuration mode.
    pub exit_config_command: String,

    /// Commands to run when the session is opened.
    pub on_open_commands: Vec<OnOpenCommand>,

    /// Terminal width for PTY.
    pub terminal_width: u32,

    /// Terminal height for PTY.
    pub terminal_height: u32,
}

impl PlatformDefinition {
    /// Create a new platform definition.
    pub fn new(name: impl Into<String>, terminal: TerminalDetector) -> Self {
        Self {
            name: name.into(),
            terminal,
            config_command: String::new(),
            exit_config_command: String::new(),
            on_open_commands: vec![],
            terminal_width: 511,
            terminal_height: 24,
        }
    }

    /// Set the commands that enter and leave configuration mode.
    pub fn with_config_commands(
        mut self,
        enter: impl Into<String>,
        exit: impl Into<String>,
    ) -> Self {
        self.config_command = enter.into();
        self.exit_config_command = exit.into();
        self
    }

    /// Add an on_open command and the warning to emit if the device
    /// refuses it.
    pub fn with_on_open_command(
        mut self,
        command: impl Into<String>,
        warning: impl Into<String>,
    ) -> Self {
        self.on_open_commands.push(OnOpenCommand {
            command: command.into(),
            warning: warning.into(),
        });
        self
    }

    /// Set terminal dimensions.
    pub fn with_terminal_size(mut self, width: u32, height: u32) -> Self {
        self.terminal_width = width;
        self.terminal_height = height;
        self
    }
}
