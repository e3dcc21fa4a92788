//! Channel layer: terminal output buffering, state detection and the PTY
//! command loop.
//!
//! Everything here works on raw device bytes. Mode tracking and parsing
//! live in the driver and template layers.

mod buffer;
mod pty;
mod terminal;

pub use buffer::PatternBuffer;
pub use pty::{Interaction, PtyChannel, PtyConfig, SendOptions};
pub use terminal::{Classification, TerminalDetector, TerminalState};
