//! Frink：自主编码循环编排器
//!
//! 推理模型通过工具调用驱动外部 Claude Code 会话完成编码任务，
//! 以自管理的任务清单状态机作为收尾闸门。
//!
//! 模块划分：
//! - `tasks`：任务清单状态机（单一事实来源 + 完成谓词）
//! - `session`：外部 Claude 会话管理（单例槽位、reset 整体替换、调用计数）
//! - `llm`：Provider 抽象与 OpenAI / Anthropic 实现（统一流式轮接口）
//! - `tools`：固定工具表与封闭枚举分发器
//! - `core`：错误分类、事件流、编排循环、运行监管
//! - `conversation`：Provider 无关的对话消息模型
//! - `prompts`：系统与任务提示词模板
//! - `config`：TOML + 环境变量配置加载

pub mod cli;
pub mod config;
pub mod conversation;
pub mod core;
pub mod llm;
pub mod observability;
pub mod prompts;
pub mod session;
pub mod tasks;
pub mod tools;
