//! 工具分发器
//!
//! 固定工具名映射为封闭的 ToolKind 枚举；未知名称走显式 fallback，产生可恢复错误而非崩溃。
//! 分发器持有 TaskStore 与 SessionManager 的共享句柄（由编排器显式传入，不经全局状态）；
//! 每次分发输出结构化审计日志（JSON）。

use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::conversation::ToolCallRequest;
use crate::core::AgentError;
use crate::session::SessionManager;
use crate::tasks::{TaskInput, TaskStatus, TaskStore};

/// 审计日志中参数预览的最大字符数
const ARGS_PREVIEW_CHARS: usize = 200;

/// 已知工具的封闭集合
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    SendToClaude,
    TodoWrite,
    TodoRead,
    TodoAdd,
    TodoUpdate,
    TodoRemove,
    ResetClaudeSession,
    MarkTaskComplete,
}

impl ToolKind {
    /// 按名称解析；None 即未知工具（这是工具名校验的唯一位置）
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "send_to_claude" => Some(Self::SendToClaude),
            "todo_write" => Some(Self::TodoWrite),
            "todo_read" => Some(Self::TodoRead),
            "todo_add" => Some(Self::TodoAdd),
            "todo_update" => Some(Self::TodoUpdate),
            "todo_remove" => Some(Self::TodoRemove),
            "reset_claude_session" => Some(Self::ResetClaudeSession),
            "mark_task_complete" => Some(Self::MarkTaskComplete),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct SendArgs {
    prompt: String,
}

#[derive(Deserialize)]
struct TodoWriteArgs {
    tasks: Vec<TaskInput>,
}

#[derive(Deserialize)]
struct TodoAddArgs {
    task: String,
}

#[derive(Deserialize)]
struct TodoUpdateArgs {
    id: u64,
    status: TaskStatus,
}

#[derive(Deserialize)]
struct TodoRemoveArgs {
    id: u64,
}

/// 工具分发器：按 ToolKind 路由到 TaskStore / SessionManager 上的处理函数
pub struct ToolDispatcher {
    tasks: Arc<Mutex<TaskStore>>,
    session: Arc<SessionManager>,
}

impl ToolDispatcher {
    pub fn new(tasks: Arc<Mutex<TaskStore>>, session: Arc<SessionManager>) -> Self {
        Self { tasks, session }
    }

    /// 分发一次工具调用；可恢复错误由调用方（编排器）作为工具结果回填历史
    pub async fn dispatch(&self, call: &ToolCallRequest) -> Result<String, AgentError> {
        let start = Instant::now();
        let result = self.dispatch_inner(call).await;

        let (ok, outcome) = match &result {
            Ok(_) => (true, "ok"),
            Err(e) if e.is_recoverable() => (false, "error"),
            Err(_) => (false, "fatal"),
        };
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": call.name,
            "ok": ok,
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview(&call.arguments),
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        result
    }

    async fn dispatch_inner(&self, call: &ToolCallRequest) -> Result<String, AgentError> {
        let Some(kind) = ToolKind::from_name(&call.name) else {
            return Err(AgentError::UnknownTool(call.name.clone()));
        };

        match kind {
            ToolKind::SendToClaude => {
                let args: SendArgs = parse_args(&call.arguments)?;
                self.session.send(&args.prompt).await
            }
            ToolKind::TodoWrite => {
                let args: TodoWriteArgs = parse_args(&call.arguments)?;
                let count = args.tasks.len();
                self.tasks.lock().await.replace_all(args.tasks);
                Ok(format!("Task list replaced: {} tasks", count))
            }
            ToolKind::TodoRead => {
                let store = self.tasks.lock().await;
                let listing = serde_json::to_string_pretty(store.list())
                    .unwrap_or_else(|_| "[]".to_string());
                Ok(listing)
            }
            ToolKind::TodoAdd => {
                let args: TodoAddArgs = parse_args(&call.arguments)?;
                let id = self.tasks.lock().await.add(args.task);
                Ok(format!("Task added with id {}", id))
            }
            ToolKind::TodoUpdate => {
                let args: TodoUpdateArgs = parse_args(&call.arguments)?;
                let mut store = self.tasks.lock().await;
                store
                    .update(args.id, args.status)
                    .map_err(|e| AgentError::ToolArguments(e.to_string()))?;
                let s = store.summary();
                Ok(format!(
                    "Task {} updated. {}/{} completed",
                    args.id, s.completed, s.total
                ))
            }
            ToolKind::TodoRemove => {
                let args: TodoRemoveArgs = parse_args(&call.arguments)?;
                self.tasks
                    .lock()
                    .await
                    .remove(args.id)
                    .map_err(|e| AgentError::ToolArguments(e.to_string()))?;
                Ok(format!("Task {} removed", args.id))
            }
            ToolKind::ResetClaudeSession => {
                self.session.reset().await;
                Ok("Claude session reset. The next prompt starts with a fresh context.".to_string())
            }
            ToolKind::MarkTaskComplete => {
                let store = self.tasks.lock().await;
                if store.is_complete() {
                    let s = store.summary();
                    Ok(format!("All {} tasks completed.", s.total))
                } else {
                    // 逐项列举未完成任务，驱动模型继续工作（可恢复）
                    let remaining: Vec<String> = store
                        .remaining()
                        .iter()
                        .map(|t| format!("#{} [{:?}] {}", t.id, t.status, t.text))
                        .collect();
                    let detail = if remaining.is_empty() {
                        "task list is empty; create tasks before completing".to_string()
                    } else {
                        format!("{} tasks remaining:\n{}", remaining.len(), remaining.join("\n"))
                    };
                    Err(AgentError::IncompleteTasks(detail))
                }
            }
        }
    }
}

fn parse_args<T: for<'de> Deserialize<'de>>(args: &Value) -> Result<T, AgentError> {
    serde_json::from_value(args.clone()).map_err(|e| AgentError::ToolArguments(e.to_string()))
}

fn args_preview(args: &Value) -> String {
    let s = args.to_string();
    if s.chars().count() > ARGS_PREVIEW_CHARS {
        format!("{}...", s.chars().take(ARGS_PREVIEW_CHARS).collect::<String>())
    } else {
        s
    }
}
