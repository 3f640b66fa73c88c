//! 规则分类器：关键词级联，零外部依赖
//!
//! 扫描三组互斥的领域关键词（酒店 / 机票 / 火车票）加一组更宽的出行意图
//! 词。命中一组即解析；命中多组必追问，与消息顺序无关；全不命中时回看
//! 粘连上下文，再退到出行三选一或通用追问。

use async_trait::async_trait;

use crate::extract;
use crate::intent::{
    Classification, ClassifyContext, IntentAction, IntentClassifier, WorkflowKind,
};
use crate::llm::LlmError;

/// 领域关键词组，三组互斥
const HOTEL_SET: [&str; 5] = ["酒店", "订房", "住宿", "宾馆", "hotel"];
const FLIGHT_SET: [&str; 5] = ["机票", "航班", "飞机", "flight", "airline"];
const TRAIN_SET: [&str; 5] = ["火车", "高铁", "动车", "train", "railway"];

/// 更宽的出行意图词：只用于触发三选一追问，从不直接解析
const TRAVEL_SET: [&str; 11] = [
    "去", "出差", "旅游", "旅行", "出行", "预订", "订票", "travel", "trip", "going", "book",
];

/// 关键词直接命中的置信度
const KEYWORD_CONFIDENCE: f32 = 0.9;
/// 粘连上下文解析的置信度
const STICKY_CONFIDENCE: f32 = 0.6;

/// 粘连回看历史条数的默认上限
pub const DEFAULT_HISTORY_SCAN_LIMIT: usize = 50;

const AMBIGUOUS_CLARIFICATION: &str =
    "您同时提到了多种预订服务，请问您想办理哪一种：酒店、机票还是火车票？";
const SERVICE_CLARIFICATION: &str = "请问您是想要预订酒店、购买机票，还是预订火车票呢？";
const GENERIC_CLARIFICATION: &str =
    "抱歉，我暂时没有理解您的需求。您可以告诉我要订酒店、订机票或订火车票。";

/// 关键词规则分类器
pub struct RuleClassifier {
    history_scan_limit: usize,
}

impl RuleClassifier {
    pub fn new() -> Self {
        Self {
            history_scan_limit: DEFAULT_HISTORY_SCAN_LIMIT,
        }
    }

    pub fn with_history_scan_limit(limit: usize) -> Self {
        Self {
            history_scan_limit: limit,
        }
    }

    /// 消息命中的领域，按酒店、机票、火车的固定顺序收集
    fn matched_workflows(lower: &str) -> Vec<WorkflowKind> {
        let mut matched = Vec::new();
        let hit = |set: &[&str]| set.iter().any(|kw| lower.contains(kw));
        if hit(&HOTEL_SET) {
            matched.push(WorkflowKind::Hotel);
        }
        if hit(&FLIGHT_SET) {
            matched.push(WorkflowKind::Flight);
        }
        if hit(&TRAIN_SET) {
            matched.push(WorkflowKind::Train);
        }
        matched
    }

    fn has_travel_intent(lower: &str) -> bool {
        TRAVEL_SET.iter().any(|kw| lower.contains(kw))
    }

    /// 有界回看历史（新到旧），找最近一条恰好提到单一领域的回合
    fn sticky_from_history(&self, history: &[String]) -> Option<WorkflowKind> {
        history
            .iter()
            .rev()
            .take(self.history_scan_limit)
            .find_map(|turn| {
                let lower = turn.to_lowercase();
                let matched = Self::matched_workflows(&lower);
                if matched.len() == 1 {
                    Some(matched[0])
                } else {
                    None
                }
            })
    }

    fn resolved(workflow: WorkflowKind, confidence: f32) -> Classification {
        Classification {
            action: IntentAction::CreateForm,
            workflow: Some(workflow),
            confidence,
            ..Classification::chat()
        }
    }
}

impl Default for RuleClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IntentClassifier for RuleClassifier {
    async fn classify(
        &self,
        message: &str,
        ctx: &ClassifyContext<'_>,
    ) -> Result<Classification, LlmError> {
        let lower = message.to_lowercase();
        let matched = Self::matched_workflows(&lower);

        let mut classification = match matched.len() {
            1 => Self::resolved(matched[0], KEYWORD_CONFIDENCE),
            n if n >= 2 => Classification::clarify(AMBIGUOUS_CLARIFICATION),
            _ => {
                // 无领域信号：先粘连，再出行追问，最后通用追问
                if let Some(prior) = ctx
                    .last_workflow
                    .or_else(|| self.sticky_from_history(ctx.history))
                {
                    Self::resolved(prior, STICKY_CONFIDENCE)
                } else if Self::has_travel_intent(&lower) {
                    Classification::clarify(SERVICE_CLARIFICATION)
                } else {
                    Classification::clarify(GENERIC_CLARIFICATION)
                }
            }
        };

        classification.entities = extract::extract(message);
        Ok(classification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(history: &'a [String], last_workflow: Option<WorkflowKind>) -> ClassifyContext<'a> {
        ClassifyContext {
            history,
            last_workflow,
            current_fields: &[],
        }
    }

    async fn classify(message: &str) -> Classification {
        RuleClassifier::new()
            .classify(message, &ctx(&[], None))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn single_domain_keyword_resolves() {
        let cls = classify("我要订酒店").await;
        assert_eq!(cls.action, IntentAction::CreateForm);
        assert_eq!(cls.workflow, Some(WorkflowKind::Hotel));
        assert_eq!(cls.confidence, 0.9);
        assert!(!cls.needs_clarification);

        assert_eq!(classify("查一下航班").await.workflow, Some(WorkflowKind::Flight));
        assert_eq!(classify("买张高铁票").await.workflow, Some(WorkflowKind::Train));
    }

    #[tokio::test]
    async fn two_domains_clarify_regardless_of_order() {
        for message in ["订酒店还是订机票", "订机票还是订酒店", "book a hotel and flight"] {
            let cls = classify(message).await;
            assert!(cls.needs_clarification, "{message}");
            assert_eq!(cls.workflow, None);
            assert!(cls.clarification.as_deref().unwrap().contains("酒店"));
        }
    }

    #[tokio::test]
    async fn travel_intent_without_domain_asks_three_way() {
        for message in ["打算明天去北京", "going to Beijing", "我想出差"] {
            let cls = classify(message).await;
            assert!(cls.needs_clarification, "{message}");
            let prompt = cls.clarification.unwrap();
            assert!(prompt.contains("酒店") && prompt.contains("机票") && prompt.contains("火车"));
        }
    }

    #[tokio::test]
    async fn chitchat_without_history_gets_generic_clarification() {
        let cls = classify("今天天气怎么样").await;
        assert!(cls.needs_clarification);
        assert_eq!(cls.clarification.as_deref(), Some(GENERIC_CLARIFICATION));
        assert_eq!(cls.confidence, 0.0);
    }

    #[tokio::test]
    async fn sticky_last_workflow_resolves_follow_up() {
        let cls = RuleClassifier::new()
            .classify("还是老样子", &ctx(&[], Some(WorkflowKind::Hotel)))
            .await
            .unwrap();
        assert_eq!(cls.action, IntentAction::CreateForm);
        assert_eq!(cls.workflow, Some(WorkflowKind::Hotel));
        assert_eq!(cls.confidence, 0.6);
    }

    #[tokio::test]
    async fn sticky_falls_back_to_history_scan() {
        let history = vec![
            "我想订酒店".to_string(),
            "好的，您的酒店预订表单已准备好，请填写以下信息：".to_string(),
            "嗯".to_string(),
        ];
        let cls = RuleClassifier::new()
            .classify("嗯", &ctx(&history, None))
            .await
            .unwrap();
        assert_eq!(cls.workflow, Some(WorkflowKind::Hotel));
        assert_eq!(cls.confidence, 0.6);
    }

    #[tokio::test]
    async fn history_scan_is_bounded() {
        let mut history = vec!["我想订酒店".to_string()];
        history.extend((0..60).map(|i| format!("闲聊 {i}")));
        let cls = RuleClassifier::with_history_scan_limit(50)
            .classify("嗯", &ctx(&history, None))
            .await
            .unwrap();
        // 领域信号在 50 条窗口之外，不粘连
        assert!(cls.needs_clarification);
    }

    #[tokio::test]
    async fn ambiguous_history_turns_do_not_stick() {
        let history = vec!["订酒店还是订机票".to_string()];
        let cls = RuleClassifier::new()
            .classify("嗯", &ctx(&history, None))
            .await
            .unwrap();
        assert!(cls.needs_clarification);
    }

    #[tokio::test]
    async fn direct_keyword_beats_sticky_context() {
        let cls = RuleClassifier::new()
            .classify("改订火车票吧", &ctx(&[], Some(WorkflowKind::Hotel)))
            .await
            .unwrap();
        assert_eq!(cls.workflow, Some(WorkflowKind::Train));
        assert_eq!(cls.confidence, 0.9);
    }

    #[tokio::test]
    async fn entities_ride_along_with_classification() {
        let cls = classify("我叫jeffery，打算明天去北京，帮我订酒店").await;
        assert_eq!(cls.workflow, Some(WorkflowKind::Hotel));
        assert_eq!(cls.entities.name.as_deref(), Some("jeffery"));
        assert_eq!(cls.entities.destination.as_deref(), Some("北京"));
        assert_eq!(cls.entities.date.as_deref(), Some("明天"));
    }
}
