//! Claude CLI Worker
//!
//! 每次 send 以 `claude -p <prompt> --output-format text` 方式调用；首次之后追加
//! `--continue` 延续该工作目录下的最近对话，Worker 被替换（reset）即自然开启新对话。
//! yolo 模式追加 `--dangerously-skip-permissions` 跳过交互确认。

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::process::Command;

use crate::core::AgentError;
use crate::session::{SessionConfig, Worker};

/// 调用 Claude Code CLI 的 Worker；不设内部超时，长调用阻塞循环直至返回或进程被取消
pub struct ClaudeCliWorker {
    config: SessionConfig,
    claude_bin: String,
    /// 已发送过至少一条 prompt（其后使用 --continue 延续上下文）
    started: AtomicBool,
}

impl ClaudeCliWorker {
    pub fn new(config: SessionConfig, claude_bin: String) -> Self {
        Self {
            config,
            claude_bin,
            started: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Worker for ClaudeCliWorker {
    async fn send(&self, prompt: &str) -> Result<String, AgentError> {
        let mut cmd = Command::new(&self.claude_bin);
        cmd.arg("-p")
            .arg(prompt)
            .arg("--output-format")
            .arg("text")
            .current_dir(&self.config.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if self.started.swap(true, Ordering::SeqCst) {
            cmd.arg("--continue");
        }
        if self.config.yolo_mode {
            cmd.arg("--dangerously-skip-permissions");
        }

        tracing::debug!(dir = %self.config.working_dir.display(), "spawning claude");

        let output = cmd
            .output()
            .await
            .map_err(|e| AgentError::Session(format!("failed to spawn {}: {}", self.claude_bin, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AgentError::Session(format!(
                "claude exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
