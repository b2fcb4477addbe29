//! 命令行参数

use std::path::PathBuf;

use clap::Parser;

/// 自主编码循环编排器：推理模型驱动 Claude Code 完成编码任务
#[derive(Debug, Parser)]
#[command(name = "frink", version, about)]
pub struct Cli {
    /// 任务描述（与 --file 二选一）
    pub task: Option<String>,

    /// 从文件读取任务描述
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Claude Code 的工作目录（默认当前目录）
    #[arg(short = 'd', long)]
    pub dir: Option<PathBuf>,

    /// 预定义任务清单文件（每行一个任务，跳过规划阶段）
    #[arg(long)]
    pub tasks: Option<PathBuf>,

    /// 覆盖配置中的 Provider（openai / anthropic）
    #[arg(long)]
    pub provider: Option<String>,

    /// 覆盖配置中的最大编排轮数
    #[arg(long)]
    pub max_turns: Option<usize>,

    /// 配置文件路径（默认按 config/default.toml 查找）
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}
