//! 结构化分类器：LLM 返回 JSON 意图与字段增量
//!
//! 每回合一次 LLM 调用：系统指令限定三元意图与业务域，用户提示附当前
//! 表单上下文（字段类型先经双语映射表规范化）。应答剥离 Markdown 围栏后
//! 按严格 JSON 解析。create_form 还要过业务关键词守卫，LLM 的创建信号
//! 从不被盲目采信；fill_form 不设守卫。

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::extract;
use crate::form::{FieldKind, FormField};
use crate::intent::{
    business_workflow, Classification, ClassifyContext, IntentAction, IntentClassifier,
};
use crate::llm::{LlmClient, LlmError, Message};

/// 结构化变体的固定置信度（应答不携带分数）
const STRUCTURED_CONFIDENCE: f32 = 0.85;

/// 双语字段类型映射表：自由标签 -> 规范类型
static FIELD_TYPE_MAP: LazyLock<HashMap<&'static str, FieldKind>> = LazyLock::new(|| {
    HashMap::from([
        ("日期", FieldKind::Date),
        ("date", FieldKind::Date),
        ("生日", FieldKind::Date),
        ("时间", FieldKind::DatetimeLocal),
        ("datetime", FieldKind::DatetimeLocal),
        ("姓名", FieldKind::Text),
        ("名字", FieldKind::Text),
        ("name", FieldKind::Text),
        ("文本", FieldKind::Text),
        ("text", FieldKind::Text),
        ("性别", FieldKind::Select),
        ("gender", FieldKind::Select),
        ("sex", FieldKind::Select),
        ("选择", FieldKind::Select),
        ("select", FieldKind::Select),
        ("邮箱", FieldKind::Email),
        ("email", FieldKind::Email),
        ("电话", FieldKind::Tel),
        ("phone", FieldKind::Tel),
        ("数字", FieldKind::Number),
        ("number", FieldKind::Number),
        ("多行文本", FieldKind::Textarea),
        ("textarea", FieldKind::Textarea),
        ("密码", FieldKind::Password),
        ("password", FieldKind::Password),
        ("复选框", FieldKind::Checkbox),
        ("checkbox", FieldKind::Checkbox),
        ("单选", FieldKind::Radio),
        ("radio", FieldKind::Radio),
    ])
});

/// 系统指令：限定业务域与三元意图
const SYSTEM_INSTRUCTION: &str = "你是一个表单构建与填写助手。只有在用户明确表达业务意图（订酒店、定机票、请假、报销发票）时才创建表单。对于自我介绍、聊天等非业务意图，必须返回 chat 意图。";

fn build_prompt(context: &str, message: &str) -> String {
    format!(
        "现有表单定义（可能为空）：\n\n{context}\n\n用户的自然语言输入：\n\n{message}\n\n\
         请返回JSON，必须包含：\n\n\
         - intent: \"create_form\" | \"fill_form\" | \"chat\"\n\n\
         - form_fields: 当需要创建或更新表单结构时的字段数组（格式同上），否则返回 []\n\n\
         - field_updates: 当 intent 为 fill_form 时，需要填写/修改的字段键值对，键使用字段的 name\
         （若用户只提供 label，请结合上下文推断 name）。无变更则为空对象。\n\n\
         重要规则：\n\n\
         1. 只有在用户明确表达以下业务意图时，才将 intent 设为 create_form：\n\
            - 订酒店/预订酒店/酒店预订\n\
            - 定机票/预订机票/机票预订\n\
            - 请假/申请请假/请假申请\n\
            - 报销发票/发票报销/报销申请\n\n\
         2. 以下情况必须将 intent 设为 chat（不创建表单）：\n\
            - 自我介绍（如：\"我叫xxx\"、\"我是xxx\"）\n\
            - 普通聊天、问候、闲聊\n\
            - 询问时间、天气等非业务相关问题\n\n\
         3. 如果用户只是提供要填写的内容（如\"把姓名填成张三\"），intent 设为 fill_form，\
         将相应字段写入 field_updates。\n\n\
         4. 如果用户输入只是个人信息介绍或聊天，没有明确的业务意图，intent 必须设为 chat，\
         form_fields 返回空数组 []。\n\n\
         5. 只返回 JSON，不要额外文字。"
    )
}

/// 剥离应答外围的 Markdown 代码围栏
fn strip_code_fences(response: &str) -> &str {
    let mut cleaned = response.trim();
    if let Some(rest) = cleaned.strip_prefix("```json") {
        cleaned = rest;
    } else if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest;
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest;
    }
    cleaned.trim()
}

/// 规范化单个类型标签：原文或小写命中映射表；空标签退到 text；未映射原样传递
fn normalize_kind(kind: &FieldKind) -> FieldKind {
    let tag = kind.as_str().trim();
    if tag.is_empty() {
        return FieldKind::Text;
    }
    if let Some(mapped) = FIELD_TYPE_MAP.get(tag) {
        return mapped.clone();
    }
    if let Some(mapped) = FIELD_TYPE_MAP.get(tag.to_lowercase().as_str()) {
        return mapped.clone();
    }
    kind.clone()
}

/// 规范化字段列表：类型走映射表；非选择类剥离选项
fn normalize_fields(fields: Vec<FormField>) -> Vec<FormField> {
    fields
        .into_iter()
        .map(|mut field| {
            field.kind = normalize_kind(&field.kind);
            if !field.kind.is_selection() {
                field.options = None;
            }
            field
        })
        .collect()
}

/// LLM 应答的线格式：缺省键补默认，未知键忽略
#[derive(Debug, Clone, Default, Deserialize)]
struct LlmIntentReply {
    #[serde(default)]
    intent: String,
    #[serde(default)]
    form_fields: Vec<FormField>,
    #[serde(default)]
    field_updates: Map<String, Value>,
}

/// LLM 结构化分类器
pub struct StructuredClassifier {
    llm: Arc<dyn LlmClient>,
}

impl StructuredClassifier {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// 当前表单上下文（规范化后序列化），空表单为 `[]`
    fn form_context(fields: &[FormField]) -> String {
        if fields.is_empty() {
            return "[]".to_string();
        }
        let normalized = normalize_fields(fields.to_vec());
        serde_json::to_string(&normalized).unwrap_or_else(|_| "[]".to_string())
    }

    async fn recognize(
        &self,
        message: &str,
        current_fields: &[FormField],
    ) -> Result<LlmIntentReply, LlmError> {
        let context = Self::form_context(current_fields);
        let messages = [
            Message::system(SYSTEM_INSTRUCTION),
            Message::user(build_prompt(&context, message)),
        ];
        let response = self.llm.complete(&messages).await?;
        let json = strip_code_fences(&response);
        serde_json::from_str(json).map_err(|e| LlmError::Api(format!("应答不是合法 JSON：{e}")))
    }
}

#[async_trait]
impl IntentClassifier for StructuredClassifier {
    async fn classify(
        &self,
        message: &str,
        ctx: &ClassifyContext<'_>,
    ) -> Result<Classification, LlmError> {
        let entities = extract::extract(message);

        let reply = match self.recognize(message, ctx.current_fields).await {
            Ok(reply) => reply,
            // 配额耗尽不吞掉：上层要向用户展示完整指引
            Err(err @ LlmError::QuotaExceeded(_)) => return Err(err),
            Err(err) => {
                warn!("结构化意图识别失败，降级为 chat：{err}");
                LlmIntentReply::default()
            }
        };

        let mut action = match reply.intent.as_str() {
            "create_form" => IntentAction::CreateForm,
            "fill_form" => IntentAction::FillForm,
            _ => IntentAction::Chat,
        };
        let mut proposed_fields = normalize_fields(reply.form_fields);
        let mut workflow = None;

        if action == IntentAction::CreateForm {
            workflow = business_workflow(message);
            // 业务守卫：消息没有业务关键词时不采信 LLM 的创建信号
            if workflow.is_none() {
                debug!("create_form 未过业务守卫，降级为 chat：{message}");
                action = IntentAction::Chat;
                proposed_fields.clear();
            }
        }

        Ok(Classification {
            action,
            workflow,
            confidence: STRUCTURED_CONFIDENCE,
            needs_clarification: false,
            clarification: None,
            entities,
            proposed_fields,
            field_updates: reply.field_updates,
        })
    }
}
