//! 意图识别：分类结论契约与两种分类器变体
//!
//! 编排器只面向 [`IntentClassifier`] trait。规则变体（零外部依赖的关键词
//! 级联）与结构化变体（LLM 返回 JSON 意图与字段增量）产出同一个
//! [`Classification`]，喂给同一套表单状态合并逻辑。

pub mod rules;
pub mod structured;

pub use rules::RuleClassifier;
pub use structured::StructuredClassifier;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::extract::ExtractedEntities;
use crate::form::FormField;
use crate::llm::LlmError;

/// 业务工作流
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowKind {
    Hotel,
    Flight,
    Train,
    Leave,
    Expense,
}

impl WorkflowKind {
    /// 中文名，用于回复话术
    pub fn label(&self) -> &'static str {
        match self {
            WorkflowKind::Hotel => "酒店预订",
            WorkflowKind::Flight => "机票预订",
            WorkflowKind::Train => "火车票预订",
            WorkflowKind::Leave => "请假申请",
            WorkflowKind::Expense => "报销申请",
        }
    }
}

/// 回合动作：编排器按它选择分支
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentAction {
    CreateForm,
    FillForm,
    Chat,
}

impl IntentAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentAction::CreateForm => "create_form",
            IntentAction::FillForm => "fill_form",
            IntentAction::Chat => "chat",
        }
    }
}

/// 一次分类的完整结论
#[derive(Debug, Clone)]
pub struct Classification {
    pub action: IntentAction,
    /// create_form 解析出的工作流；chat / fill_form 为 None
    pub workflow: Option<WorkflowKind>,
    /// 规则变体：0.9 关键词命中 / 0.6 粘连上下文 / 0.0 待澄清；
    /// 结构化变体固定 0.85（应答不携带分数）
    pub confidence: f32,
    pub needs_clarification: bool,
    /// needs_clarification 为 true 时必有追问话术
    pub clarification: Option<String>,
    /// 分类器侧的实体抽取结果
    pub entities: ExtractedEntities,
    /// create_form 的建议字段（规则变体留空，由模板目录补全）
    pub proposed_fields: Vec<FormField>,
    /// fill_form 的字段更新：字段名 -> 新值
    pub field_updates: Map<String, Value>,
}

impl Classification {
    /// 闲聊结论
    pub fn chat() -> Self {
        Self {
            action: IntentAction::Chat,
            workflow: None,
            confidence: 0.0,
            needs_clarification: false,
            clarification: None,
            entities: ExtractedEntities::default(),
            proposed_fields: Vec::new(),
            field_updates: Map::new(),
        }
    }

    /// 待澄清结论，附追问话术
    pub fn clarify(prompt: impl Into<String>) -> Self {
        Self {
            needs_clarification: true,
            clarification: Some(prompt.into()),
            ..Self::chat()
        }
    }
}

/// 分类上下文：会话侧信息的只读快照
pub struct ClassifyContext<'a> {
    /// 全量对话历史，末尾是本回合的用户消息
    pub history: &'a [String],
    /// 会话最近一次解析出的工作流
    pub last_workflow: Option<WorkflowKind>,
    /// 当前表单字段，结构化变体把它作为上下文负载
    pub current_fields: &'a [FormField],
}

/// 意图分类器：两种变体实现同一契约。
/// 规则变体从不返回 Err；结构化变体只把配额耗尽上抛。
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(
        &self,
        message: &str,
        ctx: &ClassifyContext<'_>,
    ) -> Result<Classification, LlmError>;
}

/// 业务关键词族（中英双语）。create_form 的业务守卫与工作流判定共用。
/// 注意没有火车票一族：结构化变体的守卫只认这四类业务。
const HOTEL_KEYWORDS: [&str; 8] = [
    "订酒店", "预订酒店", "酒店预订", "定酒店", "订房", "预订房间", "hotel", "book hotel",
];
const FLIGHT_KEYWORDS: [&str; 10] = [
    "定机票", "订机票", "预订机票", "机票预订", "买机票", "购票", "flight", "book flight",
    "book ticket", "airline",
];
const LEAVE_KEYWORDS: [&str; 9] = [
    "请假", "申请请假", "请假申请", "请年假", "请病假", "申请休假", "leave", "apply leave",
    "vacation",
];
const EXPENSE_KEYWORDS: [&str; 8] = [
    "报销", "报销发票", "发票报销", "报销申请", "申请报销", "费用报销", "expense",
    "reimbursement",
];

/// 消息命中的首个业务族；按酒店、机票、请假、报销的固定顺序判定
pub fn business_workflow(message: &str) -> Option<WorkflowKind> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_lowercase();
    let hit = |keywords: &[&str]| {
        keywords
            .iter()
            .any(|kw| trimmed.contains(kw) || lower.contains(&kw.to_lowercase()))
    };

    if hit(&HOTEL_KEYWORDS) {
        Some(WorkflowKind::Hotel)
    } else if hit(&FLIGHT_KEYWORDS) {
        Some(WorkflowKind::Flight)
    } else if hit(&LEAVE_KEYWORDS) {
        Some(WorkflowKind::Leave)
    } else if hit(&EXPENSE_KEYWORDS) {
        Some(WorkflowKind::Expense)
    } else {
        None
    }
}

/// 消息是否带有明确业务意图
pub fn is_business_intent(message: &str) -> bool {
    business_workflow(message).is_some()
}
