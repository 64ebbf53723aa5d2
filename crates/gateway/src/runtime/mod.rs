//! Core runtime: the turn executor and the per-thread locks that keep
//! turns on one conversation in order.

pub mod thread_lock;
pub mod turn;

pub use thread_lock::{ThreadLockClosed, ThreadLockMap};
pub use turn::{failure_reply, TurnExecutor, TurnSettings, TurnStage};
