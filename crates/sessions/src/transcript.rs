//! Append-only JSONL transcripts.
//!
//! Each persisted thread gets a `<thread>.jsonl` file; every message is one
//! JSON line. Malformed lines are skipped on replay.

use std::io::Write;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use ellis_domain::error::{Error, Result};
use ellis_domain::{Message, Role};

/// A single transcript line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptLine {
    pub timestamp: String,
    pub role: String,
    pub content: String,
}

impl TranscriptLine {
    /// Stamp a message with the current time.
    pub fn from_message(message: &Message) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            role: message.role.as_str().to_owned(),
            content: message.content.clone(),
        }
    }

    /// Convert back to a message. Lines with an unknown role yield `None`.
    pub fn into_message(self) -> Option<Message> {
        Role::parse(&self.role).map(|role| Message {
            role,
            content: self.content,
        })
    }
}

/// File name for a thread's transcript, or `None` if the thread id cannot
/// be used safely as a file name.
///
/// Telegram ids are signed integers, optionally `chat:topic`; `:` maps to
/// `.` so both forms stay distinct and reversible.
pub fn transcript_file_name(thread_id: &str) -> Option<String> {
    if thread_id.is_empty() || thread_id.len() > 128 {
        return None;
    }
    let mut name = String::with_capacity(thread_id.len() + 6);
    for c in thread_id.chars() {
        match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => name.push(c),
            ':' => name.push('.'),
            _ => return None,
        }
    }
    name.push_str(".jsonl");
    Some(name)
}

/// Append one line to a JSONL file, creating it if needed.
pub(crate) fn append_line(path: &Path, line: &TranscriptLine) -> Result<()> {
    let mut json = serde_json::to_string(line)
        .map_err(|e| Error::Other(format!("serializing transcript line: {e}")))?;
    json.push('\n');

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(Error::Io)?;
    file.write_all(json.as_bytes()).map_err(Error::Io)?;
    Ok(())
}

/// Read and parse a JSONL transcript file. A missing file is an empty
/// transcript.
pub(crate) fn read_jsonl_file(path: &Path, thread_id: &str) -> Result<Vec<TranscriptLine>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let raw = std::fs::read_to_string(path).map_err(Error::Io)?;
    let mut lines = Vec::new();
    for line in raw.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<TranscriptLine>(line) {
            Ok(tl) => lines.push(tl),
            Err(e) => {
                tracing::warn!(
                    thread_id = thread_id,
                    error = %e,
                    "skipping malformed transcript line"
                );
            }
        }
    }
    Ok(lines)
}
