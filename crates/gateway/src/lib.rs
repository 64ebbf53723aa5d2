pub mod bootstrap;
pub mod channel;
pub mod cli;
pub mod runtime;
pub mod state;
