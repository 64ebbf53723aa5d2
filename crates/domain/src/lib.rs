//! Shared types for Ellis: messages, errors, configuration, the built-in
//! persona and structured trace events.

pub mod config;
pub mod error;
pub mod message;
pub mod persona;
pub mod trace;

pub use error::{Error, ProviderErrorKind, Result};
pub use message::{Message, Role};
