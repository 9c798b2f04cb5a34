//! Provider implementations.

pub mod claude_adapter;
pub mod codex_adapter;
pub mod mock_agent;

pub use claude_adapter::ClaudeProvider;
pub use codex_adapter::CodexProvider;
pub use mock_agent::MockProvider;
