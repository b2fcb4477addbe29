//! Anthropic Provider
//!
//! 通过 reqwest 调用 Messages API。非流式请求，全文作为单个 TextDelta 发出
//! （与 OpenAI 端同一 TurnStream 形状，编排器无感知）；tool_use 块转为 ToolCall 事件。

use async_trait::async_trait;
use futures_util::stream;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::conversation::{ChatMessage, Role, ToolCallRequest};
use crate::core::AgentError;
use crate::llm::{ProviderClient, TurnEvent, TurnStream};
use crate::tools::ToolSpec;

const DEFAULT_API_BASE: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 8192;

/// Anthropic 客户端：持有 reqwest Client、API Key 与 model 名
pub struct AnthropicProvider {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl AnthropicProvider {
    pub fn new(base_url: Option<&str>, model: &str, api_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: base_url.unwrap_or(DEFAULT_API_BASE).trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    /// 历史转线格式：system 消息并入顶层 system 字段；连续 tool 结果合并为一条
    /// user 消息（tool_result 块必须紧跟对应 assistant 的 tool_use 轮）
    fn to_request_body(&self, history: &[ChatMessage], tools: &[ToolSpec]) -> Value {
        let mut system = String::new();
        let mut messages: Vec<Value> = Vec::new();
        let mut pending_results: Vec<Value> = Vec::new();

        let flush_results = |messages: &mut Vec<Value>, pending: &mut Vec<Value>| {
            if !pending.is_empty() {
                messages.push(json!({ "role": "user", "content": std::mem::take(pending) }));
            }
        };

        for m in history {
            match m.role {
                Role::System => {
                    if !system.is_empty() {
                        system.push_str("\n\n");
                    }
                    system.push_str(&m.content);
                }
                Role::User => {
                    flush_results(&mut messages, &mut pending_results);
                    messages.push(json!({ "role": "user", "content": m.content }));
                }
                Role::Assistant => {
                    flush_results(&mut messages, &mut pending_results);
                    let mut blocks: Vec<Value> = Vec::new();
                    if !m.content.is_empty() {
                        blocks.push(json!({ "type": "text", "text": m.content }));
                    }
                    for tc in &m.tool_calls {
                        blocks.push(json!({
                            "type": "tool_use",
                            "id": tc.id,
                            "name": tc.name,
                            "input": tc.arguments,
                        }));
                    }
                    messages.push(json!({ "role": "assistant", "content": blocks }));
                }
                Role::Tool => {
                    pending_results.push(json!({
                        "type": "tool_result",
                        "tool_use_id": m.tool_call_id.clone().unwrap_or_default(),
                        "content": m.content,
                    }));
                }
            }
        }
        flush_results(&mut messages, &mut pending_results);

        let tool_defs: Vec<Value> = tools
            .iter()
            .map(|spec| {
                json!({
                    "name": spec.name,
                    "description": spec.description,
                    "input_schema": spec.parameters,
                })
            })
            .collect();

        json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "system": system,
            "messages": messages,
            "tools": tool_defs,
        })
    }
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    /// thinking 等其他块类型忽略
    #[serde(other)]
    Other,
}

#[async_trait]
impl ProviderClient for AnthropicProvider {
    async fn run_turn(
        &self,
        history: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<TurnStream, AgentError> {
        let body = self.to_request_body(history, tools);

        let response = self
            .http
            .post(format!("{}/v1/messages", self.api_base))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::provider(e.to_string(), false))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            // 429 限流 / 529 过载，均可在原则上重试；当前策略仍是中止并上报
            let rate_limited = status.as_u16() == 429 || status.as_u16() == 529;
            return Err(AgentError::provider(
                format!("anthropic returned {}: {}", status, text),
                rate_limited,
            ));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| AgentError::provider(format!("invalid response body: {}", e), false))?;

        let mut events: Vec<Result<TurnEvent, AgentError>> = Vec::new();
        let mut text = String::new();
        for block in parsed.content {
            match block {
                ContentBlock::Text { text: t } => text.push_str(&t),
                ContentBlock::ToolUse { id, name, input } => {
                    events.push(Ok(TurnEvent::ToolCall(ToolCallRequest {
                        id,
                        name,
                        arguments: input,
                    })));
                }
                ContentBlock::Other => {}
            }
        }
        if !text.is_empty() {
            events.insert(0, Ok(TurnEvent::TextDelta(text)));
        }

        Ok(Box::pin(stream::iter(events)))
    }

    fn provider_name(&self) -> &'static str {
        "anthropic"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_results_merge_into_single_user_message() {
        let provider = AnthropicProvider::new(None, "claude-sonnet-4-5", "sk-test");
        let history = vec![
            ChatMessage::system("sys"),
            ChatMessage::user("go"),
            ChatMessage::assistant(
                "working",
                vec![
                    ToolCallRequest {
                        id: "tu_1".into(),
                        name: "todo_read".into(),
                        arguments: json!({}),
                    },
                    ToolCallRequest {
                        id: "tu_2".into(),
                        name: "todo_read".into(),
                        arguments: json!({}),
                    },
                ],
            ),
            ChatMessage::tool("tu_1", "[]"),
            ChatMessage::tool("tu_2", "[]"),
        ];
        let body = provider.to_request_body(&history, &crate::tools::tool_specs());

        assert_eq!(body["system"], "sys");
        let messages = body["messages"].as_array().unwrap();
        // user, assistant, merged tool results
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2]["role"], "user");
        assert_eq!(messages[2]["content"].as_array().unwrap().len(), 2);
        assert_eq!(messages[2]["content"][0]["type"], "tool_result");
        assert_eq!(messages[1]["content"][1]["type"], "tool_use");
    }
}
