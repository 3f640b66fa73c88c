//! OpenAI 兼容 API 客户端
//!
//! 通过 async-openai 调用任意 OpenAI 兼容端点（base_url 可配置），
//! 同一实现覆盖 OpenAI、DeepSeek 及自建代理。调用错误在此处归类为
//! [`LlmError`]：配额耗尽与连接失败都必须与普通 API 错误区分开。

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError, Message, Role};

/// 单次请求的默认时限（秒）
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// 累计 token 用量（跨请求累加）
#[derive(Debug, Default)]
pub struct TokenUsage {
    prompt: AtomicU64,
    completion: AtomicU64,
}

impl TokenUsage {
    fn add(&self, prompt: u64, completion: u64) {
        self.prompt.fetch_add(prompt, Ordering::Relaxed);
        self.completion.fetch_add(completion, Ordering::Relaxed);
    }

    fn snapshot(&self) -> (u64, u64, u64) {
        let prompt = self.prompt.load(Ordering::Relaxed);
        let completion = self.completion.load(Ordering::Relaxed);
        (prompt, completion, prompt + completion)
    }
}

/// OpenAI 兼容客户端
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    timeout_secs: u64,
    usage: TokenUsage,
}

impl OpenAiClient {
    /// 创建客户端。`base_url` 为 None 时使用官方端点；`api_key` 为 None 时
    /// 依次退到环境变量 `OPENAI_API_KEY`、占位密钥（本地代理不校验密钥）。
    pub fn new(base_url: Option<&str>, model: &str, api_key: Option<&str>) -> Self {
        let api_key = api_key
            .map(String::from)
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_else(|| "sk-placeholder".to_string());

        let config = if let Some(url) = base_url {
            OpenAIConfig::new().with_api_base(url).with_api_key(api_key)
        } else {
            OpenAIConfig::new().with_api_key(api_key)
        };

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            usage: TokenUsage::default(),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs.max(1);
        self
    }

    // 消息构造只有 content 一个必填项，build 不会失败
    fn to_openai_messages(&self, messages: &[Message]) -> Vec<ChatCompletionRequestMessage> {
        messages
            .iter()
            .map(|m| match m.role {
                Role::System => ChatCompletionRequestMessage::System(
                    ChatCompletionRequestSystemMessageArgs::default()
                        .content(m.content.clone())
                        .build()
                        .unwrap(),
                ),
                Role::User => ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(m.content.clone())
                        .build()
                        .unwrap(),
                ),
                Role::Assistant => ChatCompletionRequestMessage::Assistant(
                    ChatCompletionRequestAssistantMessageArgs::default()
                        .content(m.content.clone())
                        .build()
                        .unwrap(),
                ),
            })
            .collect()
    }
}

/// 依据错误文本归类。async-openai 的错误在不同版本间类型不稳，
/// 这里按服务端返回的标志文本识别，与各版本兼容。
fn classify_api_error(text: &str) -> LlmError {
    let lower = text.to_lowercase();
    if lower.contains("insufficient_quota")
        || lower.contains("exceeded your current quota")
        || lower.contains("rate limit")
    {
        LlmError::QuotaExceeded(text.to_string())
    } else if lower.contains("connection refused")
        || lower.contains("dns error")
        || lower.contains("error sending request")
        || lower.contains("connect")
    {
        LlmError::Connection(text.to_string())
    } else {
        LlmError::Api(text.to_string())
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(self.to_openai_messages(messages))
            .build()
            .map_err(|e| LlmError::Api(e.to_string()))?;

        let chat = self.client.chat();
        let call = chat.create(request);
        let response = match tokio::time::timeout(Duration::from_secs(self.timeout_secs), call).await
        {
            Err(_) => return Err(LlmError::Timeout(self.timeout_secs)),
            Ok(result) => result.map_err(|e| classify_api_error(&e.to_string()))?,
        };

        if let Some(usage) = &response.usage {
            self.usage
                .add(usage.prompt_tokens as u64, usage.completion_tokens as u64);
        }

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(content)
    }

    fn token_usage(&self) -> (u64, u64, u64) {
        self.usage.snapshot()
    }
}
