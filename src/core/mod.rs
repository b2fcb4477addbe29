//! 核心层：错误分类、事件流、编排循环与运行监管

pub mod error;
pub mod events;
pub mod orchestrator;
pub mod supervisor;

pub use error::AgentError;
pub use events::AgentEvent;
pub use orchestrator::{AgentOrchestrator, RunOutcome, RunState};
pub use supervisor::RunSupervisor;
