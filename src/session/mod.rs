//! 外部 Claude 会话管理
//!
//! SessionManager 持有至多一个活跃 Worker（get-or-create，以「槽位为空」为键）；
//! reset 整体替换而非原地修改，保证重新获取会话的组件总能看到一致的新句柄。
//! send 内部串行化（同一时刻最多一个 in-flight 调用），调用计数跨 reset 保留。

pub mod claude;

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::core::AgentError;

pub use claude::ClaudeCliWorker;

/// 会话配置快照：工作目录 + 是否跳过交互确认（yolo）
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub working_dir: PathBuf,
    pub yolo_mode: bool,
}

/// 外部执行器抽象：发送 prompt、返回全文输出。具体实现为 Claude CLI；测试用脚本化假 Worker。
#[async_trait]
pub trait Worker: Send + Sync {
    async fn send(&self, prompt: &str) -> Result<String, AgentError>;
}

/// Worker 工厂：reset 后按同一 SessionConfig 重建（全新上下文）
pub type WorkerFactory = Arc<dyn Fn(&SessionConfig) -> Arc<dyn Worker> + Send + Sync>;

/// 会话管理器：单例槽位 + 调用计数 + send 串行锁
pub struct SessionManager {
    config: SessionConfig,
    factory: WorkerFactory,
    /// 当前活跃 Worker；None 表示下次 send 时重建
    current: Mutex<Option<Arc<dyn Worker>>>,
    /// 自管理器创建以来的 send 次数（reset 不清零）
    calls: AtomicU64,
    /// 串行化 send：外部会话有状态，不允许并发调用
    send_lock: Mutex<()>,
}

impl SessionManager {
    pub fn new(config: SessionConfig, factory: WorkerFactory) -> Self {
        Self {
            config,
            factory,
            current: Mutex::new(None),
            calls: AtomicU64::new(0),
            send_lock: Mutex::new(()),
        }
    }

    /// 默认实现：Claude CLI Worker
    pub fn with_claude_cli(config: SessionConfig, claude_bin: String) -> Self {
        let factory: WorkerFactory =
            Arc::new(move |cfg: &SessionConfig| -> Arc<dyn Worker> {
                Arc::new(ClaudeCliWorker::new(cfg.clone(), claude_bin.clone()))
            });
        Self::new(config, factory)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// 槽位为空则用工厂新建，否则复用现有 Worker
    async fn get_or_create(&self) -> Arc<dyn Worker> {
        let mut slot = self.current.lock().await;
        match slot.as_ref() {
            Some(worker) => worker.clone(),
            None => {
                let worker = (self.factory)(&self.config);
                *slot = Some(worker.clone());
                worker
            }
        }
    }

    /// 发送 prompt 给外部会话并返回全文输出；失败透出 Session 错误（可恢复）
    pub async fn send(&self, prompt: &str) -> Result<String, AgentError> {
        let _guard = self.send_lock.lock().await;
        let worker = self.get_or_create().await;
        self.calls.fetch_add(1, Ordering::Relaxed);
        worker.send(prompt).await
    }

    /// 丢弃当前 Worker（及其积累的上下文）；幂等，下次 send 以同配置重建
    pub async fn reset(&self) {
        let mut slot = self.current.lock().await;
        *slot = None;
        tracing::info!("Claude session reset");
    }

    /// 自创建以来的 send 总次数
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}
