//! 脚本化 Provider（用于测试与无 Key 试运行）
//!
//! 按预设顺序逐轮吐出事件；脚本耗尽后返回空轮（无文本无工具调用，令循环按完成谓词收尾）。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::stream;
use serde_json::Value;

use crate::conversation::{ChatMessage, ToolCallRequest};
use crate::core::AgentError;
use crate::llm::{ProviderClient, TurnEvent, TurnStream};
use crate::tools::ToolSpec;

/// 一轮脚本：事件序列，或一次 Provider 级失败
pub enum ScriptedTurn {
    Events(Vec<TurnEvent>),
    Failure { message: String, rate_limited: bool },
}

impl ScriptedTurn {
    /// 纯文本轮（模型认为说完即止）
    pub fn text(text: impl Into<String>) -> Self {
        ScriptedTurn::Events(vec![TurnEvent::TextDelta(text.into())])
    }

    /// 工具调用轮：依序请求若干工具，id 自动编号
    pub fn tool_calls(calls: Vec<(&str, Value)>) -> Self {
        ScriptedTurn::Events(
            calls
                .into_iter()
                .enumerate()
                .map(|(i, (name, arguments))| {
                    TurnEvent::ToolCall(ToolCallRequest {
                        id: format!("call_{}", i + 1),
                        name: name.to_string(),
                        arguments,
                    })
                })
                .collect(),
        )
    }
}

/// 脚本化客户端：每次 run_turn 弹出一轮脚本
pub struct ScriptedProvider {
    turns: Mutex<VecDeque<ScriptedTurn>>,
}

impl ScriptedProvider {
    pub fn new(turns: Vec<ScriptedTurn>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
        }
    }
}

#[async_trait]
impl ProviderClient for ScriptedProvider {
    async fn run_turn(
        &self,
        _history: &[ChatMessage],
        _tools: &[ToolSpec],
    ) -> Result<TurnStream, AgentError> {
        let next = self
            .turns
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();

        match next {
            Some(ScriptedTurn::Events(events)) => {
                Ok(Box::pin(stream::iter(events.into_iter().map(Ok))))
            }
            Some(ScriptedTurn::Failure {
                message,
                rate_limited,
            }) => Err(AgentError::provider(message, rate_limited)),
            None => Ok(Box::pin(stream::iter(Vec::new()))),
        }
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
