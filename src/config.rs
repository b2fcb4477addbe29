//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `FRINK__*` 覆盖（双下划线表示嵌套，
//! 如 `FRINK__LLM__PROVIDER=anthropic`）。API Key 始终只从环境变量读取。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub session: SessionSection,
}

/// [app] 段：循环轮数上限
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    /// 单次运行的最大编排轮数，防止死循环
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
        }
    }
}

fn default_max_turns() -> usize {
    50
}

/// [llm] 段：Provider 选择与模型名
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// openai / anthropic
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    #[serde(default)]
    pub openai: LlmOpenAiSection,
    #[serde(default)]
    pub anthropic: LlmAnthropicSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            openai: LlmOpenAiSection::default(),
            anthropic: LlmAnthropicSection::default(),
        }
    }
}

fn default_provider() -> String {
    "anthropic".to_string()
}

fn default_model() -> String {
    "claude-sonnet-4-5".to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmOpenAiSection {
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmAnthropicSection {
    pub model: Option<String>,
}

/// [session] 段：Claude CLI 与确认策略
#[derive(Debug, Clone, Deserialize)]
pub struct SessionSection {
    /// Claude Code 可执行文件名或路径
    #[serde(default = "default_claude_bin")]
    pub claude_bin: String,
    /// 跳过 Claude 侧交互确认
    #[serde(default = "default_yolo_mode")]
    pub yolo_mode: bool,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            claude_bin: default_claude_bin(),
            yolo_mode: default_yolo_mode(),
        }
    }
}

fn default_claude_bin() -> String {
    "claude".to_string()
}

fn default_yolo_mode() -> bool {
    true
}

/// 从 config 目录加载配置，环境变量 FRINK__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 FRINK__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
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
        config::Environment::with_prefix("FRINK")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.app.max_turns, 50);
        assert_eq!(cfg.llm.provider, "anthropic");
        assert_eq!(cfg.session.claude_bin, "claude");
        assert!(cfg.session.yolo_mode);
    }
}
