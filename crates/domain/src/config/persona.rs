use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::persona::{GREETING, PERSONA_PROMPT};

/// Overrides for the built-in persona.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonaConfig {
    /// Text file holding a replacement system prompt.
    #[serde(default)]
    pub prompt_file: Option<PathBuf>,
    /// Replacement `/start` greeting.
    #[serde(default)]
    pub greeting: Option<String>,
}

impl PersonaConfig {
    /// The system prompt to send, reading `prompt_file` when set.
    pub fn load_prompt(&self) -> Result<String> {
        match &self.prompt_file {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("reading persona prompt {}: {e}", path.display()))
                })?;
                if text.trim().is_empty() {
                    return Err(Error::Config(format!(
                        "persona prompt {} is empty",
                        path.display()
                    )));
                }
                Ok(text)
            }
            None => Ok(PERSONA_PROMPT.to_owned()),
        }
    }

    pub fn greeting(&self) -> &str {
        self.greeting.as_deref().unwrap_or(GREETING)
    }
}
