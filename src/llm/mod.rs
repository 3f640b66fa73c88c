//! LLM 客户端层
//!
//! 统一的 [`LlmClient`] trait 与三种实现：
//! - [`OpenAiClient`]: OpenAI 兼容端点（含自建代理）
//! - [`create_deepseek_client`]: DeepSeek（OpenAI 兼容格式）
//! - [`MockLlmClient`]: 测试与无 Key 场景的兜底

pub mod deepseek;
pub mod mock;
pub mod openai;
pub mod traits;

pub use deepseek::{create_deepseek_client, DEEPSEEK_BASE_URL, DEEPSEEK_CHAT, DEEPSEEK_REASONER};
pub use mock::MockLlmClient;
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::{LlmClient, LlmError, Message, Role};
