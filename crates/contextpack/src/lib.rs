//! Builds the bounded history window sent with each model call.

pub mod trimming;

pub use trimming::{message_size, trim, TrimReport};
