//! Platform definitions.
//!
//! A platform bundles everything that is specific to one device family:
//! prompt grammar, error taxonomy, mode-switch commands and the commands
//! run when a session opens.

pub mod comware;
mod definition;

pub use definition::{OnOpenCommand, PlatformDefinition};
