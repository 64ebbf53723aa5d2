//! Conversation thread memory for Ellis.
//!
//! Each thread is an append-only sequence of messages keyed by the
//! transport's chat id, held in memory and optionally written through to
//! JSONL transcripts.

pub mod store;
pub mod transcript;

pub use store::ConversationStore;
pub use transcript::{transcript_file_name, TranscriptLine};
