//! Canonical agent event schema.
//!
//! Every provider (in-process or CLI subprocess) translates its raw output
//! into these events before anything above the core sees it. The schema is
//! deliberately small: a session start, assistant messages made of ordered
//! content blocks, an error, and a completion marker.
//!
//! Serialized with an internal `type` tag:
//! ```json
//! {"type": "assistant", "blocks": [{"type": "text", "text": "done"}]}
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// One block inside an assistant message.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain assistant text.
    Text { text: String },

    /// Model reasoning, shown separately from the answer.
    Thinking { thinking: String },

    /// The agent invoked a tool.
    ToolUse {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        name: String,
        #[ts(type = "unknown")]
        input: serde_json::Value,
    },

    /// Output of a previously invoked tool.
    ToolResult {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_use_id: Option<String>,
        content: String,
        #[serde(default)]
        is_error: bool,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn thinking(thinking: impl Into<String>) -> Self {
        Self::Thinking {
            thinking: thinking.into(),
        }
    }
}

/// Normalized message emitted by every provider.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CanonicalEvent {
    /// The backend opened (or resumed) a session.
    SessionStart { session_id: String },

    /// An assistant message with its blocks in emission order.
    Assistant { blocks: Vec<ContentBlock> },

    /// A failure. Always terminal for the run that produced it.
    Error { message: String },

    /// The backend reported a finished turn.
    Complete {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },
}

impl CanonicalEvent {
    /// Assistant message with a single text block.
    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self::Assistant {
            blocks: vec![ContentBlock::text(text)],
        }
    }

    /// Assistant message with a single thinking block.
    pub fn assistant_thinking(thinking: impl Into<String>) -> Self {
        Self::Assistant {
            blocks: vec![ContentBlock::thinking(thinking)],
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Concatenated text of all text blocks, if this is an assistant message.
    pub fn text(&self) -> Option<String> {
        match self {
            Self::Assistant { blocks } => {
                let text: Vec<&str> = blocks
                    .iter()
                    .filter_map(|b| match b {
                        ContentBlock::Text { text } => Some(text.as_str()),
                        _ => None,
                    })
                    .collect();
                if text.is_empty() {
                    None
                } else {
                    Some(text.join(""))
                }
            }
            _ => None,
        }
    }
}
