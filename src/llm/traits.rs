//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / DeepSeek / Mock）实现同一个 [`LlmClient`] trait。
//! 错误按「配额耗尽 / 连接失败 / 超时 / 其他」区分：配额耗尽对当前回合是
//! 终止性的，上层要向用户展示完整的处理指引，而不是静默降级。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 消息角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// 单条对话消息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// LLM 调用错误
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    /// API 配额已用完（含持续性限流）。必须与其他错误可区分：
    /// 上层对它展示完整指引并终止当前回合，而不是降级继续。
    #[error("API 配额已用完：{0}")]
    QuotaExceeded(String),

    /// 无法连接到服务端（拒绝连接、DNS 解析失败等），诊断信息完整保留
    #[error("无法连接到 LLM 服务：{0}")]
    Connection(String),

    /// 请求超出配置的时限
    #[error("LLM 请求超时（{0} 秒）")]
    Timeout(u64),

    /// 其他 API 层错误
    #[error("LLM API 错误：{0}")]
    Api(String),

    /// 应答内容为空
    #[error("LLM 返回内容为空")]
    EmptyResponse,
}

/// LLM 客户端：对一组消息做一次非流式补全
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError>;

    /// 累计 token 统计：(prompt, completion, total)。无统计的后端返回零值。
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_constructors_set_role() {
        assert_eq!(Message::system("a").role, Role::System);
        assert_eq!(Message::user("b").role, Role::User);
        assert_eq!(Message::assistant("c").role, Role::Assistant);
    }

    #[test]
    fn quota_error_is_distinguishable() {
        let err = LlmError::QuotaExceeded("insufficient_quota".into());
        assert!(matches!(err, LlmError::QuotaExceeded(_)));
        assert!(err.to_string().contains("配额"));
    }
}
