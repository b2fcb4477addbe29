//! 运行过程事件：循环向调用方单向推送的进度流
//!
//! 通过 mpsc 通道消费，顺序即发生顺序：ToolCall 在分发时刻发出（不早于、不晚于），
//! TextDelta 随 Provider 流式片段到达即发出，与工具处理互不干扰。

use serde::Serialize;

/// 工具结果预览最大字符数
const RESULT_PREVIEW_CHARS: usize = 200;

/// 单次运行的过程事件（可序列化为 JSON 供外部展示）
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// 轮次更新（当前第几轮）
    TurnUpdate { turn: usize, max_turns: usize },
    /// 模型流式输出的一段文本
    TextDelta { text: String },
    /// 开始分发一次工具调用
    ToolCall { tool: String },
    /// 工具返回（预览，避免过长）
    ToolResult {
        tool: String,
        ok: bool,
        preview: String,
    },
    /// 致命错误（Provider 失败或取消），每次运行至多一次
    Error { text: String },
    /// 运行结束：最终任务完成度
    Done { completed: usize, total: usize },
}

impl AgentEvent {
    /// 工具结果事件，结果文本截断为预览
    pub fn tool_result(tool: &str, ok: bool, result: &str) -> Self {
        let preview: String = result.chars().take(RESULT_PREVIEW_CHARS).collect();
        let preview = if result.chars().count() > RESULT_PREVIEW_CHARS {
            format!("{}...", preview)
        } else {
            preview
        };
        AgentEvent::ToolResult {
            tool: tool.to_string(),
            ok,
            preview,
        }
    }
}

/// 向可选通道发送事件；接收端关闭时静默丢弃
pub fn send_event(
    tx: &Option<&tokio::sync::mpsc::UnboundedSender<AgentEvent>>,
    ev: AgentEvent,
) {
    if let Some(t) = tx {
        let _ = t.send(ev);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_result_preview_truncates() {
        let long = "x".repeat(500);
        match AgentEvent::tool_result("send_to_claude", true, &long) {
            AgentEvent::ToolResult { preview, ok, .. } => {
                assert!(ok);
                assert!(preview.ends_with("..."));
                assert!(preview.chars().count() <= 203);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let ev = AgentEvent::ToolCall {
            tool: "todo_read".to_string(),
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "tool_call");
        assert_eq!(json["tool"], "todo_read");
    }
}
