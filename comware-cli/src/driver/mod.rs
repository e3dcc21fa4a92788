//! High-level driver for device interaction.
//!
//! [`Session`] is the entry point: it owns the PTY channel, tracks the
//! configuration mode through [`ModeController`] and exposes the
//! configuration, command and facts operations.

mod builder;
mod events;
mod privilege;
pub(crate) mod response;
mod session;

pub use builder::SessionBuilder;
pub use events::{EventSink, LogSink};
pub use privilege::{ModeController, ModeState};
pub use response::Response;
pub use session::{
    Capabilities, ConfigSource, DeviceInfo, DeviceOperations, GetOptions, Session, SessionOptions,
    SessionState,
};
