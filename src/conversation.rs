//! 对话历史类型
//!
//! AgentOrchestrator 独占持有的 append-only 消息序列：system / user / assistant / tool 四种角色，
//! assistant 可携带若干 ToolCallRequest，tool 消息通过 tool_call_id 回填调用结果。

use serde::{Deserialize, Serialize};

/// 消息角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// 模型请求的一次工具调用：id 由 Provider 分配，arguments 为原始 JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// 对话消息：assistant 可携带 tool_calls，tool 角色携带 tool_call_id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// 仅 assistant 消息使用
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,
    /// 仅 tool 消息使用
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls,
            tool_call_id: None,
        }
    }

    /// 工具结果消息（成功结果或错误文本均走此通道回填历史）
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

/// 单轮 Provider 输出的汇总：流式文本片段拼接后的全文 + 本轮请求的全部工具调用
#[derive(Debug, Clone, Default)]
pub struct TurnOutput {
    pub text: String,
    pub tool_calls: Vec<ToolCallRequest>,
}
