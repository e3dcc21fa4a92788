//! Transport layer.
//!
//! A [`Transport`] moves bytes to and from the device and nothing else:
//! prompt detection, decoding and mode tracking all live above it. The
//! bundled [`SshTransport`] wraps russh; tests use an in-memory script.

pub mod config;
#[cfg(test)]
pub(crate) mod mock;
mod ssh;

use std::future::Future;

use bytes::Bytes;

pub use config::{AuthMethod, HostKeyVerification, SshConfig};
pub use ssh::SshTransport;

use crate::error::Result;

/// Byte-level connection to a device.
pub trait Transport: Send {
    /// Write raw bytes to the device.
    fn send(&mut self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Read the next chunk of output.
    ///
    /// Returns `Ok(None)` once the device has closed the session.
    fn read(&mut self) -> impl Future<Output = Result<Option<Bytes>>> + Send;

    /// Whether the connection is still open.
    fn is_connected(&self) -> bool;

    /// Close the connection.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}
