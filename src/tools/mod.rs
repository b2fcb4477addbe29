//! 工具层：固定工具表（Schema）与封闭枚举分发器

pub mod dispatcher;
pub mod schema;

pub use dispatcher::{ToolDispatcher, ToolKind};
pub use schema::{tool_specs, ToolSpec};
