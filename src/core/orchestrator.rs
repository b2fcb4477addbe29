//! Agent 编排器：主控循环
//!
//! Running -> {Completed, Failed}。每轮：执行 Provider 轮（文本片段随流转发）->
//! 按接收顺序串行分发工具调用（外部会话与任务清单不允许轮内并发变更）->
//! 逐调用回填 tool 结果消息 -> 下一轮。mark_task_complete 成功即 Completed 并立即停止；
//! Provider 失败即 Failed（恰好一次 Error 事件）；无工具调用的轮立即按完成谓词收尾。

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::conversation::{ChatMessage, TurnOutput};
use crate::core::events::{send_event, AgentEvent};
use crate::core::AgentError;
use crate::llm::{ProviderClient, TurnEvent};
use crate::prompts::SYSTEM_PROMPT;
use crate::session::SessionManager;
use crate::tasks::TaskStore;
use crate::tools::{tool_specs, ToolDispatcher, ToolKind};

/// 运行终态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Completed,
    Failed,
}

/// 运行结果：终态 + 任务完成度 + 外部会话调用次数
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub state: RunState,
    pub completed: usize,
    pub total: usize,
    pub session_calls: u64,
    pub error: Option<String>,
}

impl RunOutcome {
    /// 总体成功：全部任务完成且清单非空
    pub fn success(&self) -> bool {
        self.state == RunState::Completed && self.total > 0 && self.completed == self.total
    }
}

/// 编排器：独占持有对话历史，组件（TaskStore / SessionManager）显式传入
pub struct AgentOrchestrator {
    provider: Arc<dyn ProviderClient>,
    dispatcher: ToolDispatcher,
    tasks: Arc<Mutex<TaskStore>>,
    session: Arc<SessionManager>,
    cancel_token: CancellationToken,
    max_turns: usize,
    history: Vec<ChatMessage>,
}

impl AgentOrchestrator {
    pub fn new(
        provider: Arc<dyn ProviderClient>,
        tasks: Arc<Mutex<TaskStore>>,
        session: Arc<SessionManager>,
        cancel_token: CancellationToken,
        max_turns: usize,
    ) -> Self {
        let dispatcher = ToolDispatcher::new(tasks.clone(), session.clone());
        Self {
            provider,
            dispatcher,
            tasks,
            session,
            cancel_token,
            max_turns,
            history: Vec::new(),
        }
    }

    /// 对话历史（只读；供测试断言回填内容）
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// 执行一次完整运行；可恢复错误不会越过此边界，恒定解析为带摘要的终态
    pub async fn run(
        &mut self,
        task_prompt: &str,
        event_tx: Option<&UnboundedSender<AgentEvent>>,
    ) -> RunOutcome {
        self.history.push(ChatMessage::system(SYSTEM_PROMPT));
        self.history.push(ChatMessage::user(task_prompt));
        let specs = tool_specs();

        for turn in 0..self.max_turns {
            send_event(
                &event_tx,
                AgentEvent::TurnUpdate {
                    turn,
                    max_turns: self.max_turns,
                },
            );

            if self.cancel_token.is_cancelled() {
                return self.fail(AgentError::Cancelled, event_tx).await;
            }

            // Provider 挂起点：取消时放弃本轮调用，其最终结果被丢弃
            let stream = tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    return self.fail(AgentError::Cancelled, event_tx).await;
                }
                result = self.provider.run_turn(&self.history, &specs) => match result {
                    Ok(s) => s,
                    Err(e) => return self.fail(e, event_tx).await,
                },
            };

            let mut stream = stream;
            let mut output = TurnOutput::default();
            loop {
                let item = tokio::select! {
                    _ = self.cancel_token.cancelled() => {
                        return self.fail(AgentError::Cancelled, event_tx).await;
                    }
                    item = stream.next() => item,
                };
                match item {
                    None => break,
                    Some(Ok(TurnEvent::TextDelta(text))) => {
                        send_event(&event_tx, AgentEvent::TextDelta { text: text.clone() });
                        output.text.push_str(&text);
                    }
                    Some(Ok(TurnEvent::ToolCall(call))) => output.tool_calls.push(call),
                    Some(Err(e)) => return self.fail(e, event_tx).await,
                }
            }

            self.history.push(ChatMessage::assistant(
                output.text.clone(),
                output.tool_calls.clone(),
            ));

            // 模型说完且未行动：立即收尾，由完成谓词决定终态（不追加续问轮）
            if output.tool_calls.is_empty() {
                tracing::info!(turn, "no tool calls, assessing completion");
                break;
            }

            for call in &output.tool_calls {
                // ToolCall 事件在分发时刻发出，与分发本身保持因果顺序
                send_event(
                    &event_tx,
                    AgentEvent::ToolCall {
                        tool: call.name.clone(),
                    },
                );

                let kind = ToolKind::from_name(&call.name);
                match self.dispatcher.dispatch(call).await {
                    Ok(result) => {
                        send_event(&event_tx, AgentEvent::tool_result(&call.name, true, &result));
                        self.history.push(ChatMessage::tool(&call.id, &result));
                        if kind == Some(ToolKind::MarkTaskComplete) {
                            // 收尾闸门放行：本轮剩余调用不再分发
                            return self.finish(RunState::Completed, None, event_tx).await;
                        }
                    }
                    Err(e) if e.is_recoverable() => {
                        // 可恢复失败回填历史，让模型自我纠正（会话故障、参数错误、任务未完成）
                        let text = format!("Error: {}", e);
                        send_event(&event_tx, AgentEvent::tool_result(&call.name, false, &text));
                        self.history.push(ChatMessage::tool(&call.id, &text));
                    }
                    Err(e) => return self.fail(e, event_tx).await,
                }

                // 外部会话调用已跑完，此处收尾不会留下不一致的 Worker 状态
                if self.cancel_token.is_cancelled() {
                    return self.fail(AgentError::Cancelled, event_tx).await;
                }
            }
        }

        let state = if self.tasks.lock().await.is_complete() {
            RunState::Completed
        } else {
            RunState::Failed
        };
        self.finish(state, None, event_tx).await
    }

    /// 致命终止：恰好一次 Error 事件，随后输出终态摘要
    async fn fail(
        &self,
        error: AgentError,
        event_tx: Option<&UnboundedSender<AgentEvent>>,
    ) -> RunOutcome {
        tracing::error!(%error, "run failed");
        send_event(
            &event_tx,
            AgentEvent::Error {
                text: error.to_string(),
            },
        );
        self.finish(RunState::Failed, Some(error.to_string()), event_tx)
            .await
    }

    async fn finish(
        &self,
        state: RunState,
        error: Option<String>,
        event_tx: Option<&UnboundedSender<AgentEvent>>,
    ) -> RunOutcome {
        let summary = self.tasks.lock().await.summary();
        send_event(
            &event_tx,
            AgentEvent::Done {
                completed: summary.completed,
                total: summary.total,
            },
        );
        RunOutcome {
            state,
            completed: summary.completed,
            total: summary.total,
            session_calls: self.session.call_count(),
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Role;
    use crate::llm::{ScriptedProvider, ScriptedTurn};
    use crate::session::{SessionConfig, SessionManager, Worker, WorkerFactory};
    use async_trait::async_trait;
    use serde_json::json;
    use std::path::PathBuf;
    use tokio::sync::mpsc;

    struct EchoWorker;

    #[async_trait]
    impl Worker for EchoWorker {
        async fn send(&self, prompt: &str) -> Result<String, AgentError> {
            Ok(format!("done: {}", prompt))
        }
    }

    fn orchestrator_with_limit(turns: Vec<ScriptedTurn>, max_turns: usize) -> AgentOrchestrator {
        let tasks = Arc::new(Mutex::new(TaskStore::new()));
        let factory: WorkerFactory = Arc::new(|_| Arc::new(EchoWorker));
        let session = Arc::new(SessionManager::new(
            SessionConfig {
                working_dir: PathBuf::from("/tmp"),
                yolo_mode: true,
            },
            factory,
        ));
        AgentOrchestrator::new(
            Arc::new(ScriptedProvider::new(turns)),
            tasks,
            session,
            CancellationToken::new(),
            max_turns,
        )
    }

    fn orchestrator(turns: Vec<ScriptedTurn>) -> AgentOrchestrator {
        orchestrator_with_limit(turns, 20)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<AgentEvent>) -> Vec<AgentEvent> {
        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        events
    }

    #[tokio::test]
    async fn text_only_turn_terminates_without_completion() {
        let mut orch = orchestrator(vec![ScriptedTurn::text("I believe we are done.")]);
        let outcome = orch.run("do something", None).await;

        // 空任务清单 -> 完成谓词不成立
        assert_eq!(outcome.state, RunState::Failed);
        assert!(!outcome.success());
        assert_eq!(outcome.total, 0);
        // 未发生任何工具分发
        assert!(orch.history().iter().all(|m| m.role != Role::Tool));
    }

    #[tokio::test]
    async fn text_turn_with_all_tasks_done_resolves_completed() {
        let mut orch = orchestrator(vec![
            ScriptedTurn::tool_calls(vec![(
                "todo_write",
                json!({ "tasks": [{ "task": "a", "status": "completed" }] }),
            )]),
            // 模型说完未行动，但完成谓词成立
            ScriptedTurn::text("everything is finished"),
        ]);
        let outcome = orch.run("task", None).await;

        assert_eq!(outcome.state, RunState::Completed);
        assert!(outcome.success());
        assert_eq!((outcome.completed, outcome.total), (1, 1));
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn max_turns_exhaustion_resolves_from_predicate() {
        // 轮数耗尽不是致命错误：按完成谓词收尾
        let mut orch = orchestrator_with_limit(
            vec![ScriptedTurn::tool_calls(vec![(
                "todo_write",
                json!({ "tasks": [{ "task": "a" }] }),
            )])],
            1,
        );
        let outcome = orch.run("task", None).await;
        assert_eq!(outcome.state, RunState::Failed);
        assert!(outcome.error.is_none());
        assert_eq!((outcome.completed, outcome.total), (0, 1));

        let mut orch = orchestrator_with_limit(
            vec![ScriptedTurn::tool_calls(vec![(
                "todo_write",
                json!({ "tasks": [{ "task": "a", "status": "completed" }] }),
            )])],
            1,
        );
        let outcome = orch.run("task", None).await;
        assert_eq!(outcome.state, RunState::Completed);
    }

    #[tokio::test]
    async fn completion_gate_fails_then_succeeds() {
        let mut orch = orchestrator(vec![
            ScriptedTurn::tool_calls(vec![(
                "todo_write",
                json!({ "tasks": [{ "task": "a" }, { "task": "b" }] }),
            )]),
            // a 完成后立刻尝试收尾：b 仍 pending，闸门拒绝
            ScriptedTurn::tool_calls(vec![
                ("todo_update", json!({ "id": 1, "status": "completed" })),
                ("mark_task_complete", json!({})),
            ]),
            ScriptedTurn::tool_calls(vec![
                ("todo_update", json!({ "id": 2, "status": "completed" })),
                ("mark_task_complete", json!({})),
            ]),
        ]);
        let outcome = orch.run("finish a and b", None).await;

        assert_eq!(outcome.state, RunState::Completed);
        assert!(outcome.success());
        assert_eq!((outcome.completed, outcome.total), (2, 2));

        // 第一次 mark_task_complete 的拒绝作为工具结果回填了历史
        let rejections: Vec<&ChatMessage> = orch
            .history()
            .iter()
            .filter(|m| m.role == Role::Tool && m.content.contains("remaining"))
            .collect();
        assert_eq!(rejections.len(), 1);
        assert!(rejections[0].content.contains("b"));
    }

    #[tokio::test]
    async fn provider_failure_emits_one_error_and_preserves_store() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut orch = orchestrator(vec![
            ScriptedTurn::tool_calls(vec![(
                "todo_write",
                json!({ "tasks": [{ "task": "a" }] }),
            )]),
            ScriptedTurn::Failure {
                message: "bad gateway".to_string(),
                rate_limited: false,
            },
        ]);
        let outcome = orch.run("task", Some(&tx)).await;

        assert_eq!(outcome.state, RunState::Failed);
        assert!(outcome.error.unwrap().contains("bad gateway"));
        // 第 1 轮的变更完好保留，无第 2 轮的部分效果
        assert_eq!((outcome.completed, outcome.total), (0, 1));

        let events = drain(&mut rx);
        let errors = events
            .iter()
            .filter(|e| matches!(e, AgentEvent::Error { .. }))
            .count();
        assert_eq!(errors, 1);
    }

    #[tokio::test]
    async fn tool_call_events_interleave_with_dispatch() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut orch = orchestrator(vec![ScriptedTurn::tool_calls(vec![
            ("todo_add", json!({ "task": "x" })),
            ("todo_read", json!({})),
        ])]);
        orch.run("task", Some(&tx)).await;

        let names: Vec<String> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                AgentEvent::ToolCall { tool } => Some(format!("call:{}", tool)),
                AgentEvent::ToolResult { tool, .. } => Some(format!("result:{}", tool)),
                _ => None,
            })
            .collect();
        // 每个调用的 ToolCall 事件紧贴其分发，而非批量提前或事后发出
        assert_eq!(
            names,
            vec![
                "call:todo_add",
                "result:todo_add",
                "call:todo_read",
                "result:todo_read"
            ]
        );
    }

    #[tokio::test]
    async fn unknown_tool_feeds_back_and_loop_continues() {
        let mut orch = orchestrator(vec![
            ScriptedTurn::tool_calls(vec![("fly_to_moon", json!({}))]),
            ScriptedTurn::text("giving up"),
        ]);
        let outcome = orch.run("task", None).await;

        assert_eq!(outcome.state, RunState::Failed);
        assert!(orch
            .history()
            .iter()
            .any(|m| m.role == Role::Tool && m.content.contains("Unknown tool")));
    }

    #[tokio::test]
    async fn successful_completion_skips_remaining_calls_in_turn() {
        let mut orch = orchestrator(vec![ScriptedTurn::tool_calls(vec![
            (
                "todo_write",
                json!({ "tasks": [{ "task": "a", "status": "completed" }] }),
            ),
            ("mark_task_complete", json!({})),
            ("todo_add", json!({ "task": "should never be added" })),
        ])]);
        let outcome = orch.run("task", None).await;

        assert_eq!(outcome.state, RunState::Completed);
        // mark_task_complete 之后的调用未被分发
        assert_eq!(outcome.total, 1);
    }

    #[tokio::test]
    async fn cancelled_before_first_turn_fails_with_one_error() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let tasks = Arc::new(Mutex::new(TaskStore::new()));
        let factory: WorkerFactory = Arc::new(|_| Arc::new(EchoWorker));
        let session = Arc::new(SessionManager::new(
            SessionConfig {
                working_dir: PathBuf::from("/tmp"),
                yolo_mode: true,
            },
            factory,
        ));
        let token = CancellationToken::new();
        token.cancel();
        let mut orch = AgentOrchestrator::new(
            Arc::new(ScriptedProvider::new(vec![ScriptedTurn::text("unreached")])),
            tasks,
            session,
            token,
            20,
        );

        let outcome = orch.run("task", Some(&tx)).await;
        assert_eq!(outcome.state, RunState::Failed);
        let errors = drain(&mut rx)
            .iter()
            .filter(|e| matches!(e, AgentEvent::Error { .. }))
            .count();
        assert_eq!(errors, 1);
    }

    #[tokio::test]
    async fn send_to_claude_counts_session_calls() {
        let mut orch = orchestrator(vec![
            ScriptedTurn::tool_calls(vec![
                ("send_to_claude", json!({ "prompt": "explore" })),
                ("send_to_claude", json!({ "prompt": "implement" })),
            ]),
            ScriptedTurn::text("done"),
        ]);
        let outcome = orch.run("task", None).await;
        assert_eq!(outcome.session_calls, 2);
    }
}
