//! 用户资料查询（只读协作方）
//!
//! 查询永不失败：未提供姓名或目录中不存在时返回空资料而不是错误。
//! [`DirectoryProfileLookup`] 模拟外部用户信息 API（演示数据 + 人为延迟）。

use std::time::Duration;

use async_trait::async_trait;

/// 用户资料。任何字段都可能为空（未知用户），但资料本身总是存在。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProfile {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub id_card: String,
    /// 偏好交通方式，顺序即偏好程度
    pub preferred_transportation: Vec<String>,
    pub default_city: String,
}

/// 按姓名取用户资料
#[async_trait]
pub trait ProfileLookup: Send + Sync {
    async fn lookup(&self, name: Option<&str>) -> UserProfile;
}

/// 模拟外部 API 的查询延迟
const LOOKUP_LATENCY: Duration = Duration::from_millis(100);

/// 内置演示资料目录
#[derive(Debug, Default)]
pub struct DirectoryProfileLookup;

#[async_trait]
impl ProfileLookup for DirectoryProfileLookup {
    async fn lookup(&self, name: Option<&str>) -> UserProfile {
        tokio::time::sleep(LOOKUP_LATENCY).await;

        match name {
            Some("jeffery") => UserProfile {
                name: "jeffery".to_string(),
                phone: "138****8888".to_string(),
                email: "user@example.com".to_string(),
                id_card: "110101199001011234".to_string(),
                preferred_transportation: vec![
                    "飞机".to_string(),
                    "高铁".to_string(),
                    "自驾".to_string(),
                    "大巴".to_string(),
                ],
                default_city: "北京".to_string(),
            },
            _ => UserProfile::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn known_name_returns_full_profile() {
        let profile = DirectoryProfileLookup.lookup(Some("jeffery")).await;
        assert_eq!(profile.phone, "138****8888");
        assert_eq!(profile.default_city, "北京");
        assert_eq!(profile.preferred_transportation.first().map(String::as_str), Some("飞机"));
    }

    #[tokio::test]
    async fn unknown_or_missing_name_returns_empty_profile() {
        assert_eq!(
            DirectoryProfileLookup.lookup(Some("张三")).await,
            UserProfile::default()
        );
        assert_eq!(DirectoryProfileLookup.lookup(None).await, UserProfile::default());
    }
}
