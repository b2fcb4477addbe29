//! frink 可执行入口

use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tokio::sync::Mutex;

use frink::cli::Cli;
use frink::config::load_config;
use frink::core::{AgentEvent, AgentOrchestrator, RunSupervisor};
use frink::llm::create_provider;
use frink::observability;
use frink::prompts::{build_task_prompt, build_task_prompt_with_predefined_tasks};
use frink::session::{SessionConfig, SessionManager};
use frink::tasks::{TaskInput, TaskStatus, TaskStore};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init();

    let cli = Cli::parse();

    let task = resolve_task(&cli)?;
    let working_dir = resolve_working_dir(&cli)?;

    let mut cfg = load_config(cli.config.clone()).context("Failed to load config")?;
    if let Some(provider) = &cli.provider {
        cfg.llm.provider = provider.clone();
    }
    if let Some(max_turns) = cli.max_turns {
        cfg.app.max_turns = max_turns;
    }

    // 前置条件：缺 Key 在任何运行开始前失败
    let provider = create_provider(&cfg).map_err(|e| anyhow!(e.to_string()))?;

    let session = Arc::new(SessionManager::with_claude_cli(
        SessionConfig {
            working_dir: working_dir.clone(),
            yolo_mode: cfg.session.yolo_mode,
        },
        cfg.session.claude_bin.clone(),
    ));

    let tasks = Arc::new(Mutex::new(TaskStore::new()));
    let predefined = load_predefined_tasks(&cli)?;
    if let Some(lines) = &predefined {
        let inputs: Vec<TaskInput> = lines
            .iter()
            .map(|t| TaskInput {
                task: t.clone(),
                status: TaskStatus::Pending,
            })
            .collect();
        tasks.lock().await.replace_all(inputs);
        tracing::info!("Seeded {} predefined tasks", lines.len());
    }

    let working_dir_str = working_dir.display().to_string();
    let prompt = match &predefined {
        Some(lines) => build_task_prompt_with_predefined_tasks(&task, &working_dir_str, lines),
        None => build_task_prompt(&task, &working_dir_str),
    };

    let supervisor = RunSupervisor::new();
    supervisor.spawn_ctrl_c_handler();

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(print_events(event_rx));

    let mut orchestrator = AgentOrchestrator::new(
        provider,
        tasks,
        session,
        supervisor.cancel_token(),
        cfg.app.max_turns,
    );
    let outcome = orchestrator.run(&prompt, Some(&event_tx)).await;

    drop(event_tx);
    let _ = printer.await;

    println!();
    println!(
        "Result: {}. {}/{} tasks completed, {} claude call(s)",
        if outcome.success() { "success" } else { "failed" },
        outcome.completed,
        outcome.total,
        outcome.session_calls
    );
    if let Some(error) = &outcome.error {
        println!("Error: {}", error);
    }

    if !outcome.success() {
        std::process::exit(1);
    }
    Ok(())
}

/// 任务描述：位置参数与 --file 二选一
fn resolve_task(cli: &Cli) -> Result<String> {
    match (&cli.task, &cli.file) {
        (Some(task), None) => Ok(task.clone()),
        (None, Some(path)) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read task file {}", path.display()))?;
            let text = text.trim().to_string();
            if text.is_empty() {
                Err(anyhow!("Task file {} is empty", path.display()))
            } else {
                Ok(text)
            }
        }
        (Some(_), Some(_)) => Err(anyhow!("Provide either a task argument or --file, not both")),
        (None, None) => Err(anyhow!("No task given; pass a task argument or --file")),
    }
}

fn resolve_working_dir(cli: &Cli) -> Result<PathBuf> {
    let dir = match &cli.dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to resolve current directory")?,
    };
    dir.canonicalize()
        .with_context(|| format!("Working directory {} does not exist", dir.display()))
}

/// 预定义任务文件：每行一个任务，空行忽略
fn load_predefined_tasks(cli: &Cli) -> Result<Option<Vec<String>>> {
    let Some(path) = &cli.tasks else {
        return Ok(None);
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read tasks file {}", path.display()))?;
    let lines: Vec<String> = text
        .lines()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect();
    if lines.is_empty() {
        return Err(anyhow!("Tasks file {} contains no tasks", path.display()));
    }
    Ok(Some(lines))
}

/// 消费事件流并渲染到终端
async fn print_events(mut rx: mpsc::UnboundedReceiver<AgentEvent>) {
    let mut in_text = false;
    while let Some(event) = rx.recv().await {
        match event {
            AgentEvent::TurnUpdate { turn, max_turns } => {
                end_text_block(&mut in_text);
                println!("--- turn {}/{} ---", turn + 1, max_turns);
            }
            AgentEvent::TextDelta { text } => {
                print!("{}", text);
                let _ = std::io::stdout().flush();
                in_text = true;
            }
            AgentEvent::ToolCall { tool } => {
                end_text_block(&mut in_text);
                println!("[tool] {}", tool);
            }
            AgentEvent::ToolResult { tool, ok, preview } => {
                end_text_block(&mut in_text);
                let mark = if ok { "ok" } else { "err" };
                println!("[tool] {} {}: {}", tool, mark, preview);
            }
            AgentEvent::Error { text } => {
                end_text_block(&mut in_text);
                eprintln!("[error] {}", text);
            }
            AgentEvent::Done { completed, total } => {
                end_text_block(&mut in_text);
                println!("[done] {}/{} tasks completed", completed, total);
            }
        }
    }
}

fn end_text_block(in_text: &mut bool) {
    if *in_text {
        println!();
        *in_text = false;
    }
}
