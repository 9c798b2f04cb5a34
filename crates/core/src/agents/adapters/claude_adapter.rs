//! Claude adapter running the Claude CLI with `--output-format stream-json`.

use crate::agents::base::{EventStream, Provider, QueryOptions};
use crate::agents::executor::{AgentProcessExecutor, BackendSpec, CliInvocation};
use crate::agents::provider_kind::ProviderKind;
use crate::agents::resolver::{CredentialSource, ExecutableResolver};
use async_trait::async_trait;
use fp_protocol::events::{CanonicalEvent, ContentBlock};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

pub const CLAUDE_BACKEND: BackendSpec = BackendSpec {
    name: "claude",
    executables: &["claude"],
    path_override_var: "CLAUDE_CMD",
    credential_vars: &["ANTHROPIC_API_KEY", "CLAUDE_CODE_OAUTH_TOKEN"],
    translate: translate_claude_event,
};

/// Provider backed by the Claude CLI.
#[derive(Clone)]
pub struct ClaudeProvider {
    executor: AgentProcessExecutor,
}

impl ClaudeProvider {
    pub fn new(
        resolver: Arc<dyn ExecutableResolver>,
        credentials: Arc<dyn CredentialSource>,
    ) -> Self {
        Self::with_executor(AgentProcessExecutor::new(CLAUDE_BACKEND, resolver, credentials))
    }

    pub fn with_executor(executor: AgentProcessExecutor) -> Self {
        Self { executor }
    }

    /// Build the argument vector for one query.
    ///
    /// The CLI accepts a system prompt natively, so it is not folded into the
    /// prompt.
    pub fn build_args(options: &QueryOptions) -> Vec<String> {
        let mut args = vec![
            "-p".to_string(),
            "--model".to_string(),
            options.model.clone(),
            "--output-format".to_string(),
            "stream-json".to_string(),
            "--verbose".to_string(),
            "--permission-mode".to_string(),
            "bypassPermissions".to_string(),
        ];

        if let Some(system) = options.system_prompt.as_deref().filter(|s| !s.trim().is_empty()) {
            args.push("--append-system-prompt".to_string());
            args.push(system.to_string());
        }

        args.push(options.prompt.clone());
        args
    }
}

#[async_trait]
impl Provider for ClaudeProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Claude
    }

    async fn check_availability(&self) -> bool {
        self.executor.executable().is_some()
    }

    fn execute_query(&self, options: QueryOptions) -> EventStream {
        let args = Self::build_args(&options);
        self.executor.run(CliInvocation {
            args,
            working_dir: options.working_dir,
            env: options.env,
        })
    }

    fn abort(&self) {
        self.executor.abort();
    }
}

/// Claude CLI message types (JSON Lines output).
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClaudeMessage {
    System {
        #[serde(default)]
        subtype: Option<String>,
        #[serde(default)]
        session_id: Option<String>,
    },
    Assistant {
        message: MessageBody,
    },
    User {
        message: MessageBody,
    },
    Result {
        #[serde(default)]
        session_id: Option<String>,
        #[serde(default)]
        is_error: bool,
        #[serde(default)]
        result: Option<String>,
        #[serde(default)]
        subtype: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    #[serde(default)]
    content: Vec<ClaudeBlock>,
}

/// Content blocks within a message.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClaudeBlock {
    Text {
        text: String,
    },
    Thinking {
        thinking: String,
    },
    ToolUse {
        #[serde(default)]
        id: Option<String>,
        name: String,
        #[serde(default)]
        input: Value,
    },
    ToolResult {
        #[serde(default)]
        tool_use_id: Option<String>,
        #[serde(default)]
        content: Value,
        #[serde(default)]
        is_error: bool,
    },
    #[serde(other)]
    Other,
}

/// Translate one stream-json record into a canonical event.
pub fn translate_claude_event(record: &Value) -> Option<CanonicalEvent> {
    let message = ClaudeMessage::deserialize(record).ok()?;

    match message {
        ClaudeMessage::System {
            subtype,
            session_id,
        } => match (subtype.as_deref(), session_id) {
            (Some("init"), Some(session_id)) => Some(CanonicalEvent::SessionStart { session_id }),
            _ => None,
        },
        ClaudeMessage::Assistant { message } => {
            let blocks: Vec<ContentBlock> = message
                .content
                .into_iter()
                .filter_map(|block| match block {
                    ClaudeBlock::Text { text } if !text.is_empty() => Some(ContentBlock::Text { text }),
                    ClaudeBlock::Thinking { thinking } => Some(ContentBlock::Thinking { thinking }),
                    ClaudeBlock::ToolUse { id, name, input } => {
                        Some(ContentBlock::ToolUse { id, name, input })
                    }
                    _ => None,
                })
                .collect();
            assistant(blocks)
        }
        ClaudeMessage::User { message } => {
            let blocks: Vec<ContentBlock> = message
                .content
                .into_iter()
                .filter_map(|block| match block {
                    ClaudeBlock::ToolResult {
                        tool_use_id,
                        content,
                        is_error,
                    } => Some(ContentBlock::ToolResult {
                        tool_use_id,
                        content: flatten_content(&content),
                        is_error,
                    }),
                    _ => None,
                })
                .collect();
            assistant(blocks)
        }
        ClaudeMessage::Result {
            session_id,
            is_error,
            result,
            subtype,
        } => {
            if is_error {
                let message = result
                    .filter(|r| !r.trim().is_empty())
                    .or(subtype)
                    .unwrap_or_else(|| "Unknown error".to_string());
                Some(CanonicalEvent::error(message))
            } else {
                Some(CanonicalEvent::Complete { session_id })
            }
        }
        ClaudeMessage::Unknown => None,
    }
}

fn assistant(blocks: Vec<ContentBlock>) -> Option<CanonicalEvent> {
    if blocks.is_empty() {
        None
    } else {
        Some(CanonicalEvent::Assistant { blocks })
    }
}

/// Tool results arrive either as a plain string or as a list of text blocks.
fn flatten_content(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
