//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `CHATFORM__*` 覆盖
//! （双下划线表示嵌套，如 `CHATFORM__CLASSIFIER__VARIANT=structured`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub classifier: ClassifierSection,
    pub llm: LlmSection,
}

/// [app] 段：应用名与会话参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: Option<String>,
    /// 规则分类器粘连回看的历史条数上限
    pub history_scan_limit: usize,
    /// 会话闲置过期秒数（过期清理扫描用）
    pub session_timeout_secs: u64,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            history_scan_limit: 50,
            session_timeout_secs: 3600,
        }
    }
}

/// [classifier] 段：分类器变体
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassifierSection {
    /// rules（关键词规则，无需 API Key）/ structured（LLM 结构化）
    pub variant: String,
}

impl Default for ClassifierSection {
    fn default() -> Self {
        Self {
            variant: "rules".to_string(),
        }
    }
}

/// [llm] 段：后端选择与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：deepseek / openai；优先级由 API Key 与 provider 共同决定
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub deepseek: LlmDeepSeekSection,
    pub openai: LlmOpenAiSection,
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "deepseek".to_string(),
            model: crate::llm::DEEPSEEK_CHAT.to_string(),
            base_url: None,
            deepseek: LlmDeepSeekSection::default(),
            openai: LlmOpenAiSection::default(),
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LlmDeepSeekSection {
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LlmOpenAiSection {
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmTimeoutsSection {
    /// 单次请求时限（秒）
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self { request: 60 }
    }
}

/// 从 config 目录加载配置，环境变量 CHATFORM__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 CHATFORM__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{name}.toml");
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("CHATFORM")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    config.try_deserialize()
}

/// 重新从磁盘与环境变量加载配置（配置热更新：调用方决定是否用新配置重建引擎）
pub fn reload_config() -> Result<AppConfig, config::ConfigError> {
    load_config(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_usable_without_any_file() {
        let config = AppConfig::default();
        assert_eq!(config.classifier.variant, "rules");
        assert_eq!(config.llm.provider, "deepseek");
        assert_eq!(config.llm.timeouts.request, 60);
        assert_eq!(config.app.history_scan_limit, 50);
        assert_eq!(config.app.session_timeout_secs, 3600);
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chatform.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[classifier]\nvariant = \"structured\"\n\n[llm]\nprovider = \"openai\"\n\n[llm.timeouts]\nrequest = 5"
        )
        .unwrap();

        let config = load_config(Some(path)).unwrap();
        assert_eq!(config.classifier.variant, "structured");
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.timeouts.request, 5);
        // 未覆盖的键保持默认
        assert_eq!(config.app.history_scan_limit, 50);
    }

    #[test]
    fn partial_section_keeps_sibling_defaults() {
        let parsed: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(
                "[app]\nhistory_scan_limit = 10\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(parsed.app.history_scan_limit, 10);
        assert_eq!(parsed.app.session_timeout_secs, 3600);
    }
}
