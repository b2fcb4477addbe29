//! 运行监管：生命周期与中断管理
//!
//! 持有 CancellationToken，用户 Ctrl+C 时取消当前运行；取消在两个挂起点可观测：
//! in-flight 的 Provider 轮被放弃，in-flight 的外部会话调用允许跑完再收尾。

use tokio_util::sync::CancellationToken;

/// 运行级生命周期管理：取消令牌
#[derive(Debug, Default)]
pub struct RunSupervisor {
    cancel_token: CancellationToken,
}

impl RunSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// 触发取消（用户 Ctrl+C）
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// 注册 Ctrl+C 监听，触发时取消
    pub fn spawn_ctrl_c_handler(&self) {
        let token = self.cancel_token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, cancelling run");
                token.cancel();
            }
        });
    }
}
