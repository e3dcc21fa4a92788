//! # comware-cli
//!
//! Async CLI session library for HPE Comware switch automation.
//!
//! comware-cli drives a Comware terminal the way an operator would: it
//! sends one command at a time, decides from the prompt and the error
//! taxonomy whether the command finished or failed, moves between user
//! view and system view, and turns `display` output into structured
//! records (and records back into configuration lines).
//!
//! ## Features
//!
//! - Async SSH sessions via russh, or any [`Transport`](transport::Transport)
//! - Terminal state detection with Comware prompt and error patterns
//! - Configuration mode tracking that only trusts prompts the device printed
//! - Declarative line templates with round-trip rendering
//! - Argument specs with type coercion and redaction of secrets
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use comware_cli::{Resource, SessionBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), comware_cli::Error> {
//!     let session = SessionBuilder::new("192.168.1.1")
//!         .username("admin")
//!         .password("secret")
//!         .connect()
//!         .await?;
//!
//!     session.edit_config(&["interface GigabitEthernet1/0/1", "description uplink"]).await?;
//!
//!     let facts = session.gather_facts(&[Resource::Interfaces]).await?;
//!     println!("{}", serde_json::Value::Object(facts));
//!
//!     session.close().await
//! }
//! ```

pub mod channel;
pub mod driver;
pub mod error;
pub mod facts;
pub mod platform;
pub mod template;
pub mod transport;

// Re-export main types for convenience
pub use driver::{
    DeviceInfo, EventSink, GetOptions, Response, Session, SessionBuilder, SessionOptions,
    SessionState,
};
pub use error::{Error, ErrorKind};
pub use facts::Resource;
pub use platform::PlatformDefinition;
pub use transport::{AuthMethod, SshConfig};
