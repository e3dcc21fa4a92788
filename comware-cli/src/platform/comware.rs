//! HPE Comware platform definition.
//!
//! Comware has two views that matter for automation:
//! - user view, prompt `<hostname>`
//! - system view (and its sub-views), prompt `[hostname]`, `[hostname-vlan10]`
//!
//! # Prompt Examples
//!
//! ```text
//! <SW-CORE-01>                          # user view
//! [SW-CORE-01]                          # system view
//! [SW-CORE-01-GigabitEthernet1/0/1]     # interface view
//! Password:                             # super / local password prompt
//! ```
//!
//! # View Graph
//!
//! ```text
//! ┌───────────┐  system-view  ┌─────────────┐
//! │ user view ├───────────────► system view │
//! │  <name>   │      end      │   [name]    │
//! └───────────┘◄──────────────┴─────────────┘
//! ```

use regex::bytes::Regex;

use crate::channel::TerminalDetector;
use crate::platform::PlatformDefinition;

/// Platform name.
pub const PLATFORM_NAME: &str = "comware";

/// Matched against a single prompt line.
const CONFIG_PROMPT: &str = r"^\[.+\]$";

const STDOUT_PATTERNS: &[&str] = &[
    r"[\r\n]?[\w]*\(.+\)[ \t]*[\^\*]?(?:\[.+\])? ?#(?:\s*)$",
    r"[pP]assword:$",
    r"(?:^|\s)[a-zA-Z0-9]([a-zA-Z0-9-]*[a-zA-Z0-9])?[ \t]*#\s*$",
    r"[\r\n]?[\w\+\-\.:/\[\]]+(?:\([^\)]+\)){0,3}(?:[>#]) ?$",
];

const STDERR_PATTERNS: &[&str] = &[
    r"% ?Error",
    r"(?i)% Unrecognized command found at ?[\s]+",
    r"(?i)% Too many parameters found at ?[\s]+",
    r"(?i)% Incomplete command found at ?[\s]+",
    r"Error:",
    r"(?m)^% \w+",
    r"% ?Bad secret",
    r"(?i)invalid input",
    r"(?i)(?:incomplete|ambiguous) command",
    r"(?i)connection timed out",
    r"(?i)[^\r\n]+ not found",
    r"'[^']' +returned error code: ?\d+",
];

/// The Comware terminal detector.
pub fn terminal() -> TerminalDetector {
    TerminalDetector::new(
        STDOUT_PATTERNS.iter().map(|p| Regex::new(p).unwrap()).collect(),
        STDERR_PATTERNS.iter().map(|p| Regex::new(p).unwrap()).collect(),
        Regex::new(CONFIG_PROMPT).unwrap(),
    )
}

/// Create the HPE Comware platform definition.
pub fn platform() -> PlatformDefinition {
    PlatformDefinition::new(PLATFORM_NAME, terminal())
        .with_config_commands("system-view", "end")
        .with_on_open_command(
            "screen-length disable",
            "Unable to disable screen-length, command responses may be truncated",
        )
        .with_terminal_size(511, 24)
}
