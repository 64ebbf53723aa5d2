use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Thread memory persistence.
///
/// With `persist = false` (the default) threads live for the process
/// lifetime only. With `persist = true` every message is also appended to
/// `<dir>/<thread_id>.jsonl` and replayed after a restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    #[serde(default)]
    pub persist: bool,
    #[serde(default = "d_dir")]
    pub dir: PathBuf,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            persist: false,
            dir: d_dir(),
        }
    }
}

fn d_dir() -> PathBuf {
    PathBuf::from("data/threads")
}
