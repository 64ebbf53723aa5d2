//! Per-thread conversation store.
//!
//! Threads are created implicitly on first append and never removed.
//! Appends always succeed in memory; when a transcript directory is
//! configured they are also written through to `<dir>/<thread>.jsonl`, and
//! a thread's transcript is replayed from disk the first time it is touched.
//!
//! The store does not order concurrent appends to the same thread; callers
//! serialize turns per thread.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use ellis_domain::error::{Error, Result};
use ellis_domain::trace::TraceEvent;
use ellis_domain::Message;

use crate::transcript::{append_line, read_jsonl_file, transcript_file_name, TranscriptLine};

pub struct ConversationStore {
    dir: Option<PathBuf>,
    threads: RwLock<HashMap<String, Vec<Message>>>,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl ConversationStore {
    /// A store that lives for the process lifetime only.
    pub fn in_memory() -> Self {
        Self {
            dir: None,
            threads: RwLock::new(HashMap::new()),
        }
    }

    /// A store that writes every message through to JSONL files under `dir`.
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir).map_err(Error::Io)?;
        Ok(Self {
            dir: Some(dir.to_path_buf()),
            threads: RwLock::new(HashMap::new()),
        })
    }

    pub fn is_persistent(&self) -> bool {
        self.dir.is_some()
    }

    /// Append a message to the end of a thread, creating the thread if absent.
    pub fn append(&self, thread_id: &str, message: Message) {
        self.ensure_loaded(thread_id);

        let line = self.dir.as_ref().map(|_| TranscriptLine::from_message(&message));
        let role = message.role;
        {
            let mut threads = self.threads.write();
            threads.entry(thread_id.to_owned()).or_default().push(message);
        }

        let persisted = match (line, self.transcript_path(thread_id)) {
            (Some(line), Some(path)) => match append_line(&path, &line) {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(
                        thread_id = thread_id,
                        error = %e,
                        "transcript write failed; message kept in memory only"
                    );
                    false
                }
            },
            _ => false,
        };

        TraceEvent::TranscriptAppend {
            thread_id: thread_id.to_owned(),
            role: role.as_str().to_owned(),
            persisted,
        }
        .emit();
    }

    /// Full ordered history of a thread; empty for an unknown thread.
    pub fn get_history(&self, thread_id: &str) -> Vec<Message> {
        self.ensure_loaded(thread_id);
        self.threads
            .read()
            .get(thread_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of threads currently held in memory (for monitoring).
    pub fn thread_count(&self) -> usize {
        self.threads.read().len()
    }

    // ── Private helpers ───────────────────────────────────────────────

    fn transcript_path(&self, thread_id: &str) -> Option<PathBuf> {
        let dir = self.dir.as_ref()?;
        match transcript_file_name(thread_id) {
            Some(name) => Some(dir.join(name)),
            None => {
                tracing::warn!(
                    thread_id = thread_id,
                    "thread id is not usable as a file name; not persisted"
                );
                None
            }
        }
    }

    /// Replay a thread from disk the first time it is seen.
    fn ensure_loaded(&self, thread_id: &str) {
        if self.dir.is_none() || self.threads.read().contains_key(thread_id) {
            return;
        }

        let messages: Vec<Message> = match self.transcript_path(thread_id) {
            Some(path) => match read_jsonl_file(&path, thread_id) {
                Ok(lines) => lines
                    .into_iter()
                    .filter_map(TranscriptLine::into_message)
                    .collect(),
                Err(e) => {
                    tracing::warn!(
                        thread_id = thread_id,
                        error = %e,
                        "failed to replay transcript; starting thread empty"
                    );
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        if !messages.is_empty() {
            tracing::debug!(thread_id = thread_id, messages = messages.len(), "thread replayed");
        }

        // Another caller may have loaded it meanwhile; keep theirs.
        self.threads
            .write()
            .entry(thread_id.to_owned())
            .or_insert(messages);
    }
}
