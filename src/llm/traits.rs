//! Provider 抽象
//!
//! 所有后端（OpenAI / Anthropic / Scripted）实现 ProviderClient：run_turn 返回
//! 一条轮次事件流（文本片段随到随发，工具调用在流中依次出现），流结束即本轮结束。
//! 编排器只消费该流，不感知 Provider 身份与线格式。

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use crate::conversation::{ChatMessage, ToolCallRequest};
use crate::core::AgentError;
use crate::tools::ToolSpec;

/// 单轮内的流式事件：文本片段或一次完整的工具调用请求
#[derive(Debug, Clone)]
pub enum TurnEvent {
    TextDelta(String),
    ToolCall(ToolCallRequest),
}

/// 轮次事件流；错误项为 Provider 级失败（致命）
pub type TurnStream = Pin<Box<dyn Stream<Item = Result<TurnEvent, AgentError>> + Send>>;

/// Provider 客户端 trait：给定历史与工具表，产出一轮事件流
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// 执行一轮：返回的流结束后，本轮的全部文本与工具调用均已发出
    async fn run_turn(
        &self,
        history: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<TurnStream, AgentError>;

    fn provider_name(&self) -> &'static str;

    fn model_name(&self) -> &str;
}
