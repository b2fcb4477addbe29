//! 工具表与参数 JSON Schema
//!
//! 固定的八个工具；Schema 注入 Provider 请求，减少模型输出格式错误。
//! 各 Provider 自行转换为其线格式（OpenAI function / Anthropic tool）。

use serde_json::{json, Value};

/// 工具描述：名称、供模型理解的说明、参数 JSON Schema
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

/// 返回完整工具表（顺序固定，便于测试断言）
pub fn tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "send_to_claude",
            description: "Send a prompt to Claude Code to DO WORK (reads/writes files, runs \
                          commands, git operations). Returns Claude's full output.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "prompt": {
                        "type": "string",
                        "description": "Instruction for Claude Code to execute"
                    }
                },
                "required": ["prompt"]
            }),
        },
        ToolSpec {
            name: "todo_write",
            description: "Replace YOUR entire task list (for planning and tracking YOUR progress).",
            parameters: json!({
                "type": "object",
                "properties": {
                    "tasks": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "task": { "type": "string" },
                                "status": {
                                    "type": "string",
                                    "enum": ["pending", "in_progress", "completed"]
                                }
                            },
                            "required": ["task"]
                        }
                    }
                },
                "required": ["tasks"]
            }),
        },
        ToolSpec {
            name: "todo_read",
            description: "Read YOUR current task list with ids and statuses.",
            parameters: json!({ "type": "object", "properties": {} }),
        },
        ToolSpec {
            name: "todo_add",
            description: "Add a new pending task to YOUR list as you discover more work.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "task": { "type": "string", "description": "Task text" }
                },
                "required": ["task"]
            }),
        },
        ToolSpec {
            name: "todo_update",
            description: "Update YOUR task status by id (pending -> in_progress -> completed).",
            parameters: json!({
                "type": "object",
                "properties": {
                    "id": { "type": "integer", "description": "Task id from todo_read/todo_write" },
                    "status": {
                        "type": "string",
                        "enum": ["pending", "in_progress", "completed"]
                    }
                },
                "required": ["id", "status"]
            }),
        },
        ToolSpec {
            name: "todo_remove",
            description: "Remove an irrelevant task from YOUR list by id.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "id": { "type": "integer" }
                },
                "required": ["id"]
            }),
        },
        ToolSpec {
            name: "reset_claude_session",
            description: "Clear Claude Code's context and start fresh (use when Claude is stuck).",
            parameters: json!({ "type": "object", "properties": {} }),
        },
        ToolSpec {
            name: "mark_task_complete",
            description: "Signal that ALL YOUR tasks are done. Fails with the remaining task \
                          list if any task is not completed.",
            parameters: json!({ "type": "object", "properties": {} }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_eight_tools_present() {
        let names: Vec<&str> = tool_specs().iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec![
                "send_to_claude",
                "todo_write",
                "todo_read",
                "todo_add",
                "todo_update",
                "todo_remove",
                "reset_claude_session",
                "mark_task_complete",
            ]
        );
    }

    #[test]
    fn schemas_are_objects() {
        for spec in tool_specs() {
            assert_eq!(spec.parameters["type"], "object", "{}", spec.name);
        }
    }
}
