// Typed outcome of a narrative request.
//
// Generation never fails past this boundary: every error path becomes
// `Narrative::Unavailable` with a reason, and callers render the offline
// notice in its place.

use serde::Serialize;
use thiserror::Error;

/// Placeholder shown wherever generated commentary could not be produced.
pub const OFFLINE_NOTICE: &str =
    "The press box is offline right now. The numbers above still tell the story.";

/// Why a narrative could not be generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NarrativeFailure {
    #[error("narrative generation disabled in config")]
    Disabled,

    #[error("no API key configured")]
    MissingApiKey,

    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("{message}")]
    Api { message: String },

    #[error("response contained no text")]
    EmptyResponse,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Narrative {
    Generated {
        text: String,
        input_tokens: u32,
        output_tokens: u32,
    },
    Unavailable {
        reason: NarrativeFailure,
    },
}

impl Narrative {
    pub fn unavailable(reason: NarrativeFailure) -> Self {
        Narrative::Unavailable { reason }
    }

    pub fn is_generated(&self) -> bool {
        matches!(self, Narrative::Generated { .. })
    }

    /// Generated text, or [`OFFLINE_NOTICE`] for any failure.
    pub fn text_or_offline_notice(&self) -> &str {
        match self {
            Narrative::Generated { text, .. } => text,
            Narrative::Unavailable { .. } => OFFLINE_NOTICE,
        }
    }
}
