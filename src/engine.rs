//! 对话编排器
//!
//! 每条消息一个完整回合：追加历史 -> 兜底实体抽取 -> 意图分类 -> 按动作
//! 分支（澄清 / 闲聊、新建表单、填写表单）-> 渲染 -> 对称追加系统回复。
//! 回合全程持有会话锁：同键消息串行，不同键并行。回合永远给出回复，
//! 分类器的错误在这里转成对用户可见的话术。

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::catalog;
use crate::config::AppConfig;
use crate::extract::{self, ExtractedEntities};
use crate::form::ActiveForm;
use crate::intent::{
    Classification, ClassifyContext, IntentAction, IntentClassifier, RuleClassifier,
    StructuredClassifier, WorkflowKind,
};
use crate::llm::{create_deepseek_client, LlmClient, LlmError, MockLlmClient, OpenAiClient};
use crate::profile::{DirectoryProfileLookup, ProfileLookup};
use crate::render::{FormRenderer, HtmlFormRenderer};
use crate::session::{Session, SessionStore, DEFAULT_SESSION_KEY};

/// 闲聊兜底：列出可创建的表单类型
const CHAT_MENU: &str = "我理解您的意思。我可以帮您创建以下类型的表单：\n• 订酒店\n• 定机票\n• 请假\n• 报销发票\n\n如果您需要创建表单，请告诉我您的需求。";

/// 配额耗尽的完整处理指引，不截断展示
const QUOTA_GUIDANCE: &str = "抱歉，AI 服务配额已用完，无法继续使用智能识别功能。\n\n解决方案：\n1. 请检查您的服务账户配额和账单信息\n2. 登录服务商控制台查看配额详情\n3. 如果配额已用完，请充值或升级您的账户\n\n系统暂时无法识别您的意图，但您仍可以使用其他功能。";

const CREATE_READY: &str = "好的，我已经为您创建了表单，请填写以下信息：";
const CREATE_FALLBACK: &str = "抱歉，我无法创建表单，请提供更详细的信息。";
const FILL_DONE: &str = "好的，我已经更新了表单数据。";
const FILL_NO_FORM: &str = "抱歉，当前没有可填写的表单。请先创建一个表单。";
const FILL_NO_UPDATES: &str = "抱歉，我没有理解您要填写哪些字段。请告诉我具体要填写什么内容。";

/// 降级错误展示的字符数上限
const ERROR_DISPLAY_CAP: usize = 200;

/// 一个回合的返回（线格式 camelCase）
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub response_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_markup: Option<String>,
    pub has_form: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_id: Option<String>,
    pub needs_clarification: bool,
    /// 动作标记：create_form / fill_form / chat
    pub intent_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow: Option<WorkflowKind>,
}

impl ChatReply {
    fn chat(text: impl Into<String>) -> Self {
        Self {
            response_text: text.into(),
            form_markup: None,
            has_form: false,
            form_id: None,
            needs_clarification: false,
            intent_type: IntentAction::Chat.as_str().to_string(),
            workflow: None,
        }
    }

    fn clarification(text: impl Into<String>, action: IntentAction) -> Self {
        Self {
            needs_clarification: true,
            intent_type: action.as_str().to_string(),
            ..Self::chat(text)
        }
    }
}

/// 对话引擎：会话存储 + 分类器 + 资料查询 + 渲染器
pub struct DialogueEngine {
    store: SessionStore,
    classifier: Arc<dyn IntentClassifier>,
    profiles: Arc<dyn ProfileLookup>,
    renderer: Arc<dyn FormRenderer>,
}

impl DialogueEngine {
    pub fn new(
        store: SessionStore,
        classifier: Arc<dyn IntentClassifier>,
        profiles: Arc<dyn ProfileLookup>,
        renderer: Arc<dyn FormRenderer>,
    ) -> Self {
        Self {
            store,
            classifier,
            profiles,
            renderer,
        }
    }

    /// 处理一条用户消息。`session_key` 缺省映射到固定键。
    pub async fn handle_message(&self, session_key: Option<&str>, text: &str) -> ChatReply {
        let key = session_key.unwrap_or(DEFAULT_SESSION_KEY);
        let session = self.store.get_or_create(key).await;
        let mut session = session.lock().await;

        session.touch();
        session.history.push(text.to_string());

        // 兜底实体抽取：分类器的结果优先，这里只补缺；新姓名覆盖记忆
        let fallback_entities = extract::extract(text);
        if let Some(name) = &fallback_entities.name {
            session.remembered_name = Some(name.clone());
        }

        let classified = {
            let ctx = ClassifyContext {
                history: &session.history,
                last_workflow: session.last_workflow,
                current_fields: session
                    .form
                    .as_ref()
                    .map(|form| form.fields.as_slice())
                    .unwrap_or(&[]),
            };
            self.classifier.classify(text, &ctx).await
        };

        let reply = match classified {
            Ok(classification) => {
                self.apply(&mut session, classification, &fallback_entities)
                    .await
            }
            Err(err) => Self::degraded_reply(&err),
        };

        session.history.push(reply.response_text.clone());
        reply
    }

    /// 按分类结论执行动作分支
    async fn apply(
        &self,
        session: &mut Session,
        classification: Classification,
        fallback: &ExtractedEntities,
    ) -> ChatReply {
        if classification.needs_clarification {
            let prompt = classification
                .clarification
                .unwrap_or_else(|| CHAT_MENU.to_string());
            return ChatReply::clarification(prompt, classification.action);
        }

        match classification.action {
            IntentAction::Chat => ChatReply::chat(CHAT_MENU),
            IntentAction::CreateForm => self.create_form(session, classification, fallback).await,
            IntentAction::FillForm => self.fill_form(session, &classification),
        }
    }

    async fn create_form(
        &self,
        session: &mut Session,
        classification: Classification,
        fallback: &ExtractedEntities,
    ) -> ChatReply {
        let workflow = classification.workflow;
        let entities = ExtractedEntities::merged(classification.entities, fallback.clone());

        // 字段来源：分类器建议优先，否则按工作流查模板目录
        let from_catalog = classification.proposed_fields.is_empty();
        let fields = if !from_catalog {
            classification.proposed_fields
        } else if let Some(workflow) = workflow {
            let lookup_name = entities.name.clone().or_else(|| session.remembered_name.clone());
            let profile = self.profiles.lookup(lookup_name.as_deref()).await;
            catalog::fields_for(workflow, &entities, &profile)
        } else {
            Vec::new()
        };

        if fields.is_empty() {
            // 创建意图给不出任何字段：按失败处理，不动会话里的旧表单
            warn!(workflow = ?workflow, "创建表单失败：无可用字段");
            let mut reply = ChatReply::clarification(CREATE_FALLBACK, IntentAction::CreateForm);
            reply.workflow = workflow;
            return reply;
        }

        let form = ActiveForm::new(fields);
        let markup = self.renderer.render(&form.fields, &form.values);
        let form_id = form.id.clone();
        info!(form_id = %form_id, workflow = ?workflow, fields = form.fields.len(), "创建表单");

        if let Some(workflow) = workflow {
            session.last_workflow = Some(workflow);
        }
        // 模板目录创建的表单报工作流名；分类器建议字段的表单用通用话术
        let response_text = match workflow {
            Some(workflow) if from_catalog => {
                format!("好的，您的{}表单已准备好，请填写以下信息：", workflow.label())
            }
            _ => CREATE_READY.to_string(),
        };
        session.form = Some(form);

        ChatReply {
            response_text,
            form_markup: Some(markup),
            has_form: true,
            form_id: Some(form_id),
            needs_clarification: false,
            intent_type: IntentAction::CreateForm.as_str().to_string(),
            workflow,
        }
    }

    fn fill_form(&self, session: &mut Session, classification: &Classification) -> ChatReply {
        let Some(form) = session.form.as_mut() else {
            return ChatReply::clarification(FILL_NO_FORM, IntentAction::FillForm);
        };

        if classification.field_updates.is_empty() {
            // 表单在，但没解析出要填什么：保留表单，提示补充
            let mut reply = ChatReply::clarification(FILL_NO_UPDATES, IntentAction::FillForm);
            reply.has_form = true;
            return reply;
        }

        form.apply_updates(&classification.field_updates);
        let markup = self.renderer.render(&form.fields, &form.values);
        info!(form_id = %form.id, updates = classification.field_updates.len(), "更新表单数据");

        ChatReply {
            response_text: FILL_DONE.to_string(),
            form_markup: Some(markup),
            has_form: true,
            form_id: Some(form.id.clone()),
            needs_clarification: false,
            intent_type: IntentAction::FillForm.as_str().to_string(),
            workflow: session.last_workflow,
        }
    }

    /// 分类器错误的展示策略：配额给完整指引；连接诊断原样展示；
    /// 其余截断并前缀通用抱歉话术。错误回合一律按待澄清标记。
    fn degraded_reply(err: &LlmError) -> ChatReply {
        let text = match err {
            LlmError::QuotaExceeded(detail) => {
                error!("LLM 配额耗尽：{detail}");
                QUOTA_GUIDANCE.to_string()
            }
            LlmError::Connection(_) => {
                error!("LLM 连接失败：{err}");
                err.to_string()
            }
            other => {
                error!("意图分类失败：{other}");
                let mut detail = other.to_string();
                if detail.chars().count() > ERROR_DISPLAY_CAP {
                    detail = detail.chars().take(ERROR_DISPLAY_CAP).collect::<String>() + "...";
                }
                format!("抱歉，调用 AI 服务时发生错误：\n\n{detail}")
            }
        };
        ChatReply::clarification(text, IntentAction::Chat)
    }

    /// 清除会话；key 缺省映射到固定键
    pub async fn clear_session(&self, session_key: Option<&str>) {
        let key = session_key.unwrap_or(DEFAULT_SESSION_KEY);
        self.store.clear(key).await;
        info!(session = key, "清除会话");
    }

    /// 会话历史快照
    pub async fn history(&self, session_key: Option<&str>) -> Vec<String> {
        self.store
            .history(session_key.unwrap_or(DEFAULT_SESSION_KEY))
            .await
    }

    pub async fn active_sessions(&self) -> usize {
        self.store.active_count().await
    }

    /// 清理闲置会话，返回清理条数
    pub async fn cleanup_expired(&self, max_idle: Duration) -> usize {
        let removed = self.store.cleanup_expired(max_idle).await;
        if removed > 0 {
            info!(removed, "清理过期会话");
        }
        removed
    }
}

/// 依配置组建引擎：选择分类器变体与 LLM 后端
pub fn build_engine(config: &AppConfig) -> DialogueEngine {
    let classifier: Arc<dyn IntentClassifier> = match config.classifier.variant.as_str() {
        "structured" => Arc::new(StructuredClassifier::new(create_llm_from_config(config))),
        _ => Arc::new(RuleClassifier::with_history_scan_limit(
            config.app.history_scan_limit,
        )),
    };
    DialogueEngine::new(
        SessionStore::new(),
        classifier,
        Arc::new(DirectoryProfileLookup),
        Arc::new(HtmlFormRenderer),
    )
}

/// 根据配置与环境变量选择 LLM 后端：
/// - `DEEPSEEK_API_KEY` 存在，或 provider 为 deepseek 且有 `OPENAI_API_KEY` -> DeepSeek
/// - `OPENAI_API_KEY` 存在 -> OpenAI 兼容端点（base_url 可配置）
/// - 都没有 -> Mock（告警提示，回复固定为闲聊意图）
pub fn create_llm_from_config(config: &AppConfig) -> Arc<dyn LlmClient> {
    let timeout = config.llm.timeouts.request;
    let has_deepseek_key = std::env::var("DEEPSEEK_API_KEY").is_ok();
    let has_openai_key = std::env::var("OPENAI_API_KEY").is_ok();

    if has_deepseek_key || (config.llm.provider == "deepseek" && has_openai_key) {
        let model = config.llm.deepseek.model.as_deref();
        return Arc::new(create_deepseek_client(model, timeout));
    }
    if has_openai_key {
        let model = config
            .llm
            .openai
            .model
            .as_deref()
            .unwrap_or(&config.llm.model);
        return Arc::new(
            OpenAiClient::new(config.llm.base_url.as_deref(), model, None).with_timeout(timeout),
        );
    }

    warn!("未配置 DEEPSEEK_API_KEY / OPENAI_API_KEY，使用 Mock LLM（仅返回闲聊意图）");
    Arc::new(MockLlmClient::new())
}
