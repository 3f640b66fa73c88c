//! 会话存储
//!
//! 会话键 -> `Arc<Mutex<Session>>`。回合在会话级 Mutex 上串行：锁覆盖整个
//! 回合（包括 LLM 调用与渲染），同键请求依次执行，不同键互不阻塞。
//! 清除会话把历史与表单一并移除；未知键的清除是空操作。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};

use crate::form::ActiveForm;
use crate::intent::WorkflowKind;

/// 未提供会话键时的固定键
pub const DEFAULT_SESSION_KEY: &str = "default";

/// 单个会话的全部状态
#[derive(Debug)]
pub struct Session {
    /// 对话历史：用户消息与系统回复对称追加，只增不改
    pub history: Vec<String>,
    /// 当前表单，至多一个；None 即无字段、无值、无标识
    pub form: Option<ActiveForm>,
    /// 最近一次解析出的工作流，供无新意图信号的后续回合粘连
    pub last_workflow: Option<WorkflowKind>,
    /// 最近抽取到的用户姓名，新值覆盖旧值
    pub remembered_name: Option<String>,
    /// 最后活跃时间，过期清理用
    pub last_active: Instant,
}

impl Session {
    fn new() -> Self {
        Self {
            history: Vec::new(),
            form: None,
            last_workflow: None,
            remembered_name: None,
            last_active: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_active = Instant::now();
    }
}

/// 键控会话存储
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// 取会话，未见过的键惰性创建
    pub async fn get_or_create(&self, key: &str) -> Arc<Mutex<Session>> {
        if let Some(session) = self.sessions.read().await.get(key) {
            return session.clone();
        }
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Session::new())))
            .clone()
    }

    /// 清除会话（历史与表单一并移除）；未知键为空操作
    pub async fn clear(&self, key: &str) {
        self.sessions.write().await.remove(key);
    }

    /// 会话历史快照；未知键返回空
    pub async fn history(&self, key: &str) -> Vec<String> {
        let session = match self.sessions.read().await.get(key) {
            Some(session) => session.clone(),
            None => return Vec::new(),
        };
        let session = session.lock().await;
        session.history.clone()
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// 清理闲置超过 max_idle 的会话，返回清理条数。
    /// 正被回合占用（锁拿不到）的会话视为活跃，跳过。
    pub async fn cleanup_expired(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| match session.try_lock() {
            Ok(guard) => guard.last_active.elapsed() <= max_idle,
            Err(_) => true,
        });
        before - sessions.len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
