//! Mock LLM 客户端
//!
//! 两种用法：
//! - 无 API Key 时的兜底后端：固定返回一条 chat 意图的 JSON，引擎落到闲聊分支；
//! - 测试脚本：`with_replies` 预置一串应答（可混入错误注入），按顺序消费，
//!   耗尽后回到固定应答。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError, Message};

/// 脚本耗尽后的固定应答
const DEFAULT_REPLY: &str = r#"{"intent": "chat", "form_fields": [], "field_updates": {}}"#;

pub struct MockLlmClient {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
        }
    }

    /// 预置一串脚本化应答，按调用顺序逐条消费
    pub fn with_replies<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = Result<String, LlmError>>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
        }
    }

    /// 预置单条成功应答
    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self::with_replies([Ok(reply.into())])
    }
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, _messages: &[Message]) -> Result<String, LlmError> {
        if let Some(scripted) = self.replies.lock().unwrap().pop_front() {
            return scripted;
        }
        Ok(DEFAULT_REPLY.to_string())
    }
}
