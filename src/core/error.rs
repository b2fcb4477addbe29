//! Agent 错误类型
//!
//! 错误分级：仅 Provider 错误是循环致命的；Session / 工具参数 / 未知工具 / 任务未完成
//! 均为可恢复错误，作为工具结果回填历史，让模型自我纠正。

use thiserror::Error;

/// Agent 运行过程中可能出现的错误（Provider、外部会话、工具调用、配置等）
#[derive(Error, Debug)]
pub enum AgentError {
    /// Provider 传输/认证/限流错误；rate_limited 供上层区分限流与其他故障
    #[error("Provider error: {message}")]
    Provider { message: String, rate_limited: bool },

    /// Claude 会话不可达或异常退出，触发错误原样透出
    #[error("Claude session failed: {0}")]
    Session(String),

    /// 工具参数格式错误（JSON 解析失败或字段缺失）
    #[error("Invalid tool arguments: {0}")]
    ToolArguments(String),

    /// 模型请求了不存在的工具
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// mark_task_complete 调用过早：仍有未完成任务
    #[error("Cannot complete: {0}")]
    IncompleteTasks(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("Config error: {0}")]
    Config(String),
}

impl AgentError {
    /// 可恢复错误作为工具结果写回对话历史，循环继续；致命错误终止本次运行
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AgentError::Session(_)
                | AgentError::ToolArguments(_)
                | AgentError::UnknownTool(_)
                | AgentError::IncompleteTasks(_)
        )
    }

    pub fn provider(message: impl Into<String>, rate_limited: bool) -> Self {
        AgentError::Provider {
            message: message.into(),
            rate_limited,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_and_cancel_are_fatal() {
        assert!(!AgentError::provider("boom", false).is_recoverable());
        assert!(!AgentError::provider("slow down", true).is_recoverable());
        assert!(!AgentError::Cancelled.is_recoverable());
    }

    #[test]
    fn tool_level_errors_are_recoverable() {
        assert!(AgentError::Session("claude exited".into()).is_recoverable());
        assert!(AgentError::ToolArguments("missing prompt".into()).is_recoverable());
        assert!(AgentError::UnknownTool("fly_to_moon".into()).is_recoverable());
        assert!(AgentError::IncompleteTasks("2 remaining".into()).is_recoverable());
    }
}
