//! chatform - 对话式表单引擎
//!
//! 把自由文本消息解析为结构化表单操作（创建 / 填写），覆盖固定的业务
//! 工作流：订酒店、定机票、订火车票、请假、报销。
//!
//! 模块划分：
//! - **engine**: 对话编排器，引擎入口 `handle_message`
//! - **intent**: 意图分类契约与规则 / 结构化两种变体
//! - **extract**: 实体抽取（姓名 / 目的地 / 日期的有序规则级联）
//! - **catalog**: 出行工作流的字段模板与默认值求解
//! - **form**: 表单字段模型与激活表单状态
//! - **render**: 表单渲染（HTML 实现）
//! - **session**: 键控会话存储，同键回合串行
//! - **profile**: 用户资料查询协作方
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）
//! - **config**: 应用配置（TOML + 环境变量）
//! - **observability**: tracing 初始化

pub mod catalog;
pub mod config;
pub mod engine;
pub mod extract;
pub mod form;
pub mod intent;
pub mod llm;
pub mod observability;
pub mod profile;
pub mod render;
pub mod session;

pub use engine::{build_engine, ChatReply, DialogueEngine};
