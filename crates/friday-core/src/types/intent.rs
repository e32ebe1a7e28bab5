//! Structured intent produced from a free-text command.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// What a free-text command is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum IntentKind {
    Pdf,
    Video,
    Audio,
    Unknown,
}

impl IntentKind {
    /// Verb the kind maps to.
    pub fn action(&self) -> &'static str {
        match self {
            IntentKind::Pdf => "parse",
            IntentKind::Video | IntentKind::Audio => "process",
            IntentKind::Unknown => "unknown",
        }
    }
}

/// Intent plus the parameter pulled out of the command text, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    #[serde(rename = "type")]
    pub kind: IntentKind,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
}

impl Intent {
    pub fn new(kind: IntentKind, parameter: Option<String>) -> Self {
        Self {
            kind,
            action: kind.action().to_string(),
            parameter,
        }
    }

    pub fn unknown() -> Self {
        Self::new(IntentKind::Unknown, None)
    }
}
