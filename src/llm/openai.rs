//! OpenAI Provider
//!
//! 通过 async_openai 调用 Chat Completions（可配置 base_url 以兼容代理端点）。
//! 真流式：content 片段随到随发；tool_calls 分片按 index 聚合，流结束后依序发出。

use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionTool, ChatCompletionToolArgs, CreateChatCompletionRequestArgs, FunctionCall,
    FunctionObjectArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use tokio::sync::mpsc;

use crate::conversation::{ChatMessage, Role, ToolCallRequest};
use crate::core::AgentError;
use crate::llm::{ProviderClient, TurnEvent, TurnStream};
use crate::tools::ToolSpec;

/// OpenAI 客户端：持有 Client 与 model 名
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiProvider {
    pub fn new(base_url: Option<&str>, model: &str, api_key: &str) -> Self {
        let config = match base_url {
            Some(url) => OpenAIConfig::new().with_api_base(url).with_api_key(api_key),
            None => OpenAIConfig::new().with_api_key(api_key),
        };
        Self {
            client: Client::with_config(config),
            model: model.to_string(),
        }
    }

    fn to_openai_messages(
        &self,
        messages: &[ChatMessage],
    ) -> Result<Vec<ChatCompletionRequestMessage>, AgentError> {
        let mut out = Vec::with_capacity(messages.len());
        for m in messages {
            let converted = match m.role {
                Role::System => ChatCompletionRequestMessage::System(
                    ChatCompletionRequestSystemMessageArgs::default()
                        .content(m.content.clone())
                        .build()
                        .map_err(to_provider_error)?,
                ),
                Role::User => ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(m.content.clone())
                        .build()
                        .map_err(to_provider_error)?,
                ),
                Role::Assistant => {
                    let mut args = ChatCompletionRequestAssistantMessageArgs::default();
                    args.content(m.content.clone());
                    if !m.tool_calls.is_empty() {
                        let calls: Vec<ChatCompletionMessageToolCall> = m
                            .tool_calls
                            .iter()
                            .map(|tc| ChatCompletionMessageToolCall {
                                id: tc.id.clone(),
                                r#type: Default::default(),
                                function: FunctionCall {
                                    name: tc.name.clone(),
                                    arguments: tc.arguments.to_string(),
                                },
                            })
                            .collect();
                        args.tool_calls(calls);
                    }
                    ChatCompletionRequestMessage::Assistant(
                        args.build().map_err(to_provider_error)?,
                    )
                }
                Role::Tool => ChatCompletionRequestMessage::Tool(
                    ChatCompletionRequestToolMessageArgs::default()
                        .content(m.content.clone())
                        .tool_call_id(m.tool_call_id.clone().unwrap_or_default())
                        .build()
                        .map_err(to_provider_error)?,
                ),
            };
            out.push(converted);
        }
        Ok(out)
    }

    fn to_openai_tools(&self, tools: &[ToolSpec]) -> Result<Vec<ChatCompletionTool>, AgentError> {
        tools
            .iter()
            .map(|spec| {
                ChatCompletionToolArgs::default()
                    .function(
                        FunctionObjectArgs::default()
                            .name(spec.name)
                            .description(spec.description)
                            .parameters(spec.parameters.clone())
                            .build()
                            .map_err(to_provider_error)?,
                    )
                    .build()
                    .map_err(to_provider_error)
            })
            .collect()
    }
}

/// 聚合中的 tool_call 分片（按 chunk index 聚合 id/name/arguments 片段）
#[derive(Default)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

fn to_provider_error(e: OpenAIError) -> AgentError {
    let message = e.to_string();
    // 限流分类：async_openai 将 HTTP 错误折叠为文本，按内容识别 429
    let rate_limited = message.contains("429") || message.to_lowercase().contains("rate limit");
    AgentError::provider(message, rate_limited)
}

#[async_trait]
impl ProviderClient for OpenAiProvider {
    async fn run_turn(
        &self,
        history: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<TurnStream, AgentError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(self.to_openai_messages(history)?)
            .tools(self.to_openai_tools(tools)?)
            .build()
            .map_err(to_provider_error)?;

        let mut upstream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(to_provider_error)?;

        let (tx, rx) = mpsc::unbounded_channel::<Result<TurnEvent, AgentError>>();

        // 后台消费上游流：文本片段立即转发，tool_calls 聚合到流结束后依 index 顺序发出
        tokio::spawn(async move {
            let mut partials: Vec<PartialToolCall> = Vec::new();

            while let Some(item) = upstream.next().await {
                let chunk = match item {
                    Ok(c) => c,
                    Err(e) => {
                        let _ = tx.send(Err(to_provider_error(e)));
                        return;
                    }
                };
                for choice in &chunk.choices {
                    if let Some(content) = &choice.delta.content {
                        if !content.is_empty() {
                            let _ = tx.send(Ok(TurnEvent::TextDelta(content.clone())));
                        }
                    }
                    if let Some(tool_chunks) = &choice.delta.tool_calls {
                        for tc in tool_chunks {
                            let idx = tc.index as usize;
                            if partials.len() <= idx {
                                partials.resize_with(idx + 1, PartialToolCall::default);
                            }
                            let slot = &mut partials[idx];
                            if let Some(id) = &tc.id {
                                slot.id.push_str(id);
                            }
                            if let Some(f) = &tc.function {
                                if let Some(name) = &f.name {
                                    slot.name.push_str(name);
                                }
                                if let Some(args) = &f.arguments {
                                    slot.arguments.push_str(args);
                                }
                            }
                        }
                    }
                }
            }

            for partial in partials {
                if partial.name.is_empty() {
                    continue;
                }
                // 参数 JSON 解析失败时原样透传字符串，由分发器转为可恢复的参数错误
                let arguments = serde_json::from_str(&partial.arguments)
                    .unwrap_or(serde_json::Value::String(partial.arguments));
                let _ = tx.send(Ok(TurnEvent::ToolCall(ToolCallRequest {
                    id: partial.id,
                    name: partial.name,
                    arguments,
                })));
            }
        });

        Ok(Box::pin(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })))
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
