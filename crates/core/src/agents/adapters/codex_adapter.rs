//! Codex adapter running the OpenAI Codex CLI in `exec --json` mode.
//!
//! The CLI prints one JSON record per line. Records are translated into
//! canonical events by [`translate_codex_event`]; process handling is
//! delegated to [`AgentProcessExecutor`].

use crate::agents::base::{EventStream, Provider, QueryOptions};
use crate::agents::executor::{AgentProcessExecutor, BackendSpec, CliInvocation};
use crate::agents::provider_kind::ProviderKind;
use crate::agents::resolver::{CredentialSource, ExecutableResolver};
use async_trait::async_trait;
use fp_protocol::events::{CanonicalEvent, ContentBlock};
use serde_json::Value;
use std::sync::Arc;

pub const CODEX_BACKEND: BackendSpec = BackendSpec {
    name: "codex",
    executables: &["codex"],
    path_override_var: "CODEX_CMD",
    credential_vars: &["OPENAI_API_KEY", "CODEX_API_KEY"],
    translate: translate_codex_event,
};

/// Separator placed between a system prompt and the user prompt, since
/// `codex exec` has no system-prompt argument.
pub const SYSTEM_PROMPT_SEPARATOR: &str = "\n\n---\n\n";

/// Provider backed by the Codex CLI.
#[derive(Clone)]
pub struct CodexProvider {
    executor: AgentProcessExecutor,
}

impl CodexProvider {
    pub fn new(
        resolver: Arc<dyn ExecutableResolver>,
        credentials: Arc<dyn CredentialSource>,
    ) -> Self {
        Self::with_executor(AgentProcessExecutor::new(CODEX_BACKEND, resolver, credentials))
    }

    pub fn with_executor(executor: AgentProcessExecutor) -> Self {
        Self { executor }
    }

    /// Build the argument vector for one query. The prompt is always last.
    pub fn build_args(options: &QueryOptions) -> Vec<String> {
        let prompt = match options.system_prompt.as_deref() {
            Some(system) if !system.trim().is_empty() => {
                format!("{system}{SYSTEM_PROMPT_SEPARATOR}{}", options.prompt)
            }
            _ => options.prompt.clone(),
        };

        vec![
            "exec".to_string(),
            "--model".to_string(),
            options.model.clone(),
            "--json".to_string(),
            "--full-auto".to_string(),
            prompt,
        ]
    }
}

#[async_trait]
impl Provider for CodexProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Codex
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

/// Translate one `codex exec --json` record into a canonical event.
///
/// Unknown records map to `None`.
pub fn translate_codex_event(record: &Value) -> Option<CanonicalEvent> {
    match str_field(record, "type")? {
        "thread.started" => Some(CanonicalEvent::SessionStart {
            session_id: str_field(record, "thread_id")?.to_string(),
        }),
        "item.completed" => translate_item(record.get("item")?),
        "turn.completed" => Some(CanonicalEvent::Complete { session_id: None }),
        "turn.failed" | "error" => Some(CanonicalEvent::error(error_message(record))),
        _ => None,
    }
}

fn translate_item(item: &Value) -> Option<CanonicalEvent> {
    let block = match str_field(item, "type")? {
        "reasoning" => ContentBlock::Thinking {
            thinking: str_field(item, "text")?.to_string(),
        },
        "agent_message" => ContentBlock::Text {
            text: str_field(item, "text")
                .or_else(|| str_field(item, "content"))?
                .to_string(),
        },
        "command_execution" => {
            let command = str_field(item, "command").unwrap_or_default();
            let output = str_field(item, "aggregated_output")
                .or_else(|| str_field(item, "output"))
                .unwrap_or_default();
            let mut text = format!("$ {command}");
            if !output.is_empty() {
                text.push('\n');
                text.push_str(output.trim_end());
            }
            ContentBlock::Text { text }
        }
        "file_change" => {
            let changes = item.get("changes")?.as_array()?;
            let lines: Vec<String> = changes
                .iter()
                .filter_map(|change| {
                    let path = str_field(change, "path")?;
                    let kind = str_field(change, "kind").unwrap_or("update");
                    Some(format!("{kind}: {path}"))
                })
                .collect();
            if lines.is_empty() {
                return None;
            }
            ContentBlock::Text {
                text: lines.join("\n"),
            }
        }
        "mcp_tool_call" => {
            let server = str_field(item, "server").unwrap_or("mcp");
            let tool = str_field(item, "tool")?;
            ContentBlock::ToolUse {
                id: str_field(item, "id").map(str::to_string),
                name: format!("{server}.{tool}"),
                input: item.get("arguments").cloned().unwrap_or(Value::Null),
            }
        }
        _ => return None,
    };

    Some(CanonicalEvent::Assistant {
        blocks: vec![block],
    })
}

/// Best available error message of a failure record.
///
/// Order: `error.message`, `item.message`, top-level `message`, `error` as a
/// bare string, then a generic fallback.
pub fn error_message(record: &Value) -> String {
    record
        .get("error")
        .and_then(|e| str_field(e, "message"))
        .or_else(|| record.get("item").and_then(|i| str_field(i, "message")))
        .or_else(|| str_field(record, "message"))
        .or_else(|| record.get("error").and_then(Value::as_str))
        .unwrap_or("Unknown error")
        .to_string()
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_translate_thread_started() {
        let event = translate_codex_event(&json!({"type": "thread.started", "thread_id": "t1"}));
        assert_eq!(
            event,
            Some(CanonicalEvent::SessionStart {
                session_id: "t1".to_string()
            })
        );
    }

    #[test]
    fn test_translate_agent_message_text_or_content() {
        let from_text = translate_codex_event(&json!({
            "type": "item.completed",
            "item": {"type": "agent_message", "text": "hello"}
        }));
        assert_eq!(from_text, Some(CanonicalEvent::assistant_text("hello")));

        let from_content = translate_codex_event(&json!({
            "type": "item.completed",
            "item": {"type": "agent_message", "content": "done"}
        }));
        assert_eq!(from_content, Some(CanonicalEvent::assistant_text("done")));
    }

    #[test]
    fn test_translate_reasoning() {
        let event = translate_codex_event(&json!({
            "type": "item.completed",
            "item": {"type": "reasoning", "text": "thinking hard"}
        }));
        assert_eq!(event, Some(CanonicalEvent::assistant_thinking("thinking hard")));
    }

    #[test]
    fn test_translate_command_execution() {
        let event = translate_codex_event(&json!({
            "type": "item.completed",
            "item": {
                "type": "command_execution",
                "command": "ls -la",
                "aggregated_output": "total 0\n",
                "exit_code": 0
            }
        }));
        assert_eq!(event.and_then(|e| e.text()).as_deref(), Some("$ ls -la\ntotal 0"));
    }

    #[test]
    fn test_translate_file_change() {
        let event = translate_codex_event(&json!({
            "type": "item.completed",
            "item": {
                "type": "file_change",
                "changes": [
                    {"path": "src/lib.rs", "kind": "update"},
                    {"path": "src/new.rs", "kind": "add"}
                ]
            }
        }));
        assert_eq!(
            event.and_then(|e| e.text()).as_deref(),
            Some("update: src/lib.rs\nadd: src/new.rs")
        );
    }

    #[test]
    fn test_translate_mcp_tool_call() {
        let event = translate_codex_event(&json!({
            "type": "item.completed",
            "item": {
                "id": "item_7",
                "type": "mcp_tool_call",
                "server": "docs",
                "tool": "search",
                "arguments": {"q": "tokio"}
            }
        }));

        match event {
            Some(CanonicalEvent::Assistant { blocks }) => match &blocks[0] {
                ContentBlock::ToolUse { id, name, input } => {
                    assert_eq!(id.as_deref(), Some("item_7"));
                    assert_eq!(name, "docs.search");
                    assert_eq!(input["q"], "tokio");
                }
                other => panic!("Expected tool use, got {other:?}"),
            },
            other => panic!("Expected assistant event, got {other:?}"),
        }
    }

    #[test]
    fn test_translate_turn_completed() {
        assert_eq!(
            translate_codex_event(&json!({"type": "turn.completed", "usage": {}})),
            Some(CanonicalEvent::Complete { session_id: None })
        );
    }

    #[test]
    fn test_error_message_fallback_order() {
        let structured = json!({"type": "turn.failed", "error": {"message": "structured"}, "message": "top"});
        assert_eq!(error_message(&structured), "structured");

        let nested = json!({"type": "error", "item": {"message": "nested"}, "message": "top"});
        assert_eq!(error_message(&nested), "nested");

        let top = json!({"type": "error", "message": "top"});
        assert_eq!(error_message(&top), "top");

        let bare = json!({"type": "error", "error": "bare string"});
        assert_eq!(error_message(&bare), "bare string");

        let nothing = json!({"type": "error"});
        assert_eq!(error_message(&nothing), "Unknown error");
    }

    #[test]
    fn test_translate_unknown_records_are_dropped() {
        assert_eq!(translate_codex_event(&json!({"type": "turn.started"})), None);
        assert_eq!(translate_codex_event(&json!({"type": "item.started", "item": {}})), None);
        assert_eq!(
            translate_codex_event(&json!({"type": "item.completed", "item": {"type": "todo_list"}})),
            None
        );
        assert_eq!(translate_codex_event(&json!({"no_type": true})), None);
        assert_eq!(translate_codex_event(&json!({"type": 5})), None);
    }

    #[test]
    fn test_build_args_prompt_last() {
        let options = QueryOptions::new("Fix the bug", "gpt-5-codex");
        let args = CodexProvider::build_args(&options);
        assert_eq!(
            args,
            vec!["exec", "--model", "gpt-5-codex", "--json", "--full-auto", "Fix the bug"]
        );
    }

    #[test]
    fn test_build_args_prepends_system_prompt() {
        let options = QueryOptions::new("Fix the bug", "gpt-5").with_system_prompt("You are terse");
        let args = CodexProvider::build_args(&options);
        assert_eq!(
            args.last().map(String::as_str),
            Some("You are terse\n\n---\n\nFix the bug")
        );
    }
}
