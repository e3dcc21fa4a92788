//! Terminal state detection for interactive sessions.
//!
//! Device output is classified by ordered regex matching:
//!
//! 1. error (stderr) patterns, anywhere in the searched region
//! 2. normal (stdout) prompt patterns, in declared order
//! 3. the configuration prompt pattern, against the last line
//!
//! Errors are checked first. Comware happily prints an error message and
//! then a perfectly normal prompt, and that must never read as success.

use memchr::memrchr2;
use regex::bytes::Regex;

/// Coarse state of the terminal after classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalState {
    /// No prompt yet - keep reading.
    Running,
    /// A normal prompt was reached.
    StdoutMatch,
    /// An error pattern matched.
    StderrMatch,
    /// A configuration mode prompt was reached.
    ConfigPromptMatch,
}

/// Result of classifying a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// No pattern matched.
    Running,
    /// A normal prompt was reached.
    StdoutMatch { prompt: String },
    /// An error pattern matched; `error` is the matching line.
    StderrMatch { error: String },
    /// A configuration prompt was reached.
    ConfigPromptMatch { prompt: String },
}

impl Classification {
    /// The coarse state of this classification.
    pub fn state(&self) -> TerminalState {
        match self {
            Classification::Running => TerminalState::Running,
            Classification::StdoutMatch { .. } => TerminalState::StdoutMatch,
            Classification::StderrMatch { .. } => TerminalState::StderrMatch,
            Classification::ConfigPromptMatch { .. } => TerminalState::ConfigPromptMatch,
        }
    }

    /// The captured prompt, for prompt classifications.
    pub fn prompt(&self) -> Option<&str> {
        match self {
            Classification::StdoutMatch { prompt } | Classification::ConfigPromptMatch { prompt } => {
                Some(prompt)
            }
            _ => None,
        }
    }

    /// Whether the classification is still [`Classification::Running`].
    pub fn is_running(&self) -> bool {
        matches!(self, Classification::Running)
    }
}

/// Ordered prompt and error patterns for one device family.
#[derive(Debug, Clone)]
pub struct TerminalDetector {
    stdout: Vec<Regex>,
    stderr: Vec<Regex>,
    config_prompt: Regex,
}

impl TerminalDetector {
    /// Build a detector.
    ///
    /// `config_prompt` is matched against a single prompt line, not the
    /// whole buffer.
    pub fn new(stdout: Vec<Regex>, stderr: Vec<Regex>, config_prompt: Regex) -> Self {
        Self {
            stdout,
            stderr,
            config_prompt,
        }
    }

    /// Classify accumulated output.
    pub fn classify(&self, data: &[u8]) -> Classification {
        if let Some(error) = self.find_error(data) {
            return Classification::StderrMatch { error };
        }
        self.classify_prompt(data)
    }

    /// Classify ignoring error patterns.
    pub fn classify_prompt(&self, data: &[u8]) -> Classification {
        if self.stdout.iter().any(|re| re.is_match(data)) {
            return Classification::StdoutMatch {
                prompt: last_line(data),
            };
        }

        match open_line(data) {
            Some(prompt) if self.is_config_prompt(&prompt) => {
                Classification::ConfigPromptMatch { prompt }
            }
            _ => Classification::Running,
        }
    }

    /// The line containing the first error pattern match, if any.
    pub fn find_error(&self, data: &[u8]) -> Option<String> {
        self.stderr
            .iter()
            .find_map(|re| re.find(data))
            .map(|m| line_around(data, m.start(), m.end()))
    }

    /// Whether a single prompt line is a configuration prompt.
    pub fn is_config_prompt(&self, prompt: &str) -> bool {
        self.config_prompt.is_match(prompt.trim().as_bytes())
    }
}

/// The last non-empty line of `data`, trimmed.
fn last_line(data: &[u8]) -> String {
    let trimmed = data.trim_ascii_end();
    let start = memrchr2(b'\n', b'\r', trimmed).map_or(0, |pos| pos + 1);
    String::from_utf8_lossy(&trimmed[start..]).trim().to_string()
}

/// The unterminated last line of `data`, if the output does not end in a newline.
fn open_line(data: &[u8]) -> Option<String> {
    let trimmed = data.trim_ascii_end();
    let rest = &data[trimmed.len()..];
    if rest.contains(&b'\n') || rest.contains(&b'\r') {
        return None;
    }
    Some(last_line(trimmed))
}

/// The full line containing `data[start..end]`, trimmed.
fn line_around(data: &[u8], start: usize, end: usize) -> String {
    let line_start = memrchr2(b'\n', b'\r', &data[..start]).map_or(0, |pos| pos + 1);
    let line_end = memchr::memchr2(b'\n', b'\r', &data[end..]).map_or(data.len(), |pos| end + pos);
    String::from_utf8_lossy(&data[line_start..line_end])
        .trim()
        .to_string()
}
