//! Provider 层：抽象与实现（OpenAI / Anthropic / Scripted）

pub mod anthropic;
pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::AgentError;

pub use anthropic::AnthropicProvider;
pub use mock::{ScriptedProvider, ScriptedTurn};
pub use openai::OpenAiProvider;
pub use traits::{ProviderClient, TurnEvent, TurnStream};

/// 按 Provider 标识读取对应环境变量中的 API Key
pub fn api_key_for(provider: &str) -> Option<String> {
    match provider {
        "openai" => std::env::var("OPENAI_API_KEY").ok(),
        "anthropic" => std::env::var("ANTHROPIC_API_KEY").ok(),
        _ => None,
    }
}

/// 根据配置与环境变量创建 Provider；缺少 Key 属前置条件失败，在任何运行开始前上报
pub fn create_provider(cfg: &AppConfig) -> Result<Arc<dyn ProviderClient>, AgentError> {
    let provider = cfg.llm.provider.to_lowercase();
    let Some(api_key) = api_key_for(&provider) else {
        return Err(AgentError::Config(match provider.as_str() {
            "openai" => "OPENAI_API_KEY is not set".to_string(),
            "anthropic" => "ANTHROPIC_API_KEY is not set".to_string(),
            other => format!("Unknown provider: {}", other),
        }));
    };

    match provider.as_str() {
        "openai" => {
            let model = cfg
                .llm
                .openai
                .model
                .clone()
                .unwrap_or_else(|| cfg.llm.model.clone());
            tracing::info!("Using OpenAI provider ({})", model);
            Ok(Arc::new(OpenAiProvider::new(
                cfg.llm.base_url.as_deref(),
                &model,
                &api_key,
            )))
        }
        "anthropic" => {
            let model = cfg
                .llm
                .anthropic
                .model
                .clone()
                .unwrap_or_else(|| cfg.llm.model.clone());
            tracing::info!("Using Anthropic provider ({})", model);
            Ok(Arc::new(AnthropicProvider::new(
                cfg.llm.base_url.as_deref(),
                &model,
                &api_key,
            )))
        }
        other => Err(AgentError::Config(format!("Unknown provider: {}", other))),
    }
}
