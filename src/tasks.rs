//! 任务清单状态机
//!
//! 编排模型自我管理的 TODO 列表：replace_all / add / update / remove / list / summary，
//! is_complete 作为收尾闸门（非空且全部 completed）。id 单调递增，列表内唯一；插入顺序即展示顺序。

use serde::{Deserialize, Serialize};

/// 任务状态；约定流转 pending -> in_progress -> completed，但 store 不强制（由模型遵守）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Pending
    }
}

/// 单个任务；仅 TaskStore 可创建与变更
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub text: String,
    pub status: TaskStatus,
}

/// replace_all 的输入项：文本 + 可选初始状态（缺省 pending）
#[derive(Debug, Clone, Deserialize)]
pub struct TaskInput {
    pub task: String,
    #[serde(default)]
    pub status: TaskStatus,
}

/// 完成度统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaskSummary {
    pub total: usize,
    pub completed: usize,
}

/// 内存任务清单：有序 Vec，id 由内部计数器分配，跨 replace_all 不复用
#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
    next_id: u64,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// 整表替换：分配全新 id；空列表合法（但完成闸门要求非空）
    pub fn replace_all(&mut self, inputs: Vec<TaskInput>) {
        self.tasks.clear();
        for input in inputs {
            let id = self.fresh_id();
            self.tasks.push(Task {
                id,
                text: input.task,
                status: input.status,
            });
        }
    }

    /// 追加一个 pending 任务，返回其 id
    pub fn add(&mut self, text: impl Into<String>) -> u64 {
        let id = self.fresh_id();
        self.tasks.push(Task {
            id,
            text: text.into(),
            status: TaskStatus::Pending,
        });
        id
    }

    /// 原地更新状态；任意状态间迁移均允许
    pub fn update(&mut self, id: u64, status: TaskStatus) -> Result<(), TaskNotFound> {
        match self.tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                task.status = status;
                Ok(())
            }
            None => Err(TaskNotFound(id)),
        }
    }

    pub fn remove(&mut self, id: u64) -> Result<(), TaskNotFound> {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        if self.tasks.len() == before {
            Err(TaskNotFound(id))
        } else {
            Ok(())
        }
    }

    /// 按插入顺序的只读视图
    pub fn list(&self) -> &[Task] {
        &self.tasks
    }

    pub fn summary(&self) -> TaskSummary {
        TaskSummary {
            total: self.tasks.len(),
            completed: self
                .tasks
                .iter()
                .filter(|t| t.status == TaskStatus::Completed)
                .count(),
        }
    }

    /// 完成闸门：非空且全部 completed
    pub fn is_complete(&self) -> bool {
        let s = self.summary();
        s.total > 0 && s.completed == s.total
    }

    /// 未完成任务（pending / in_progress），供 mark_task_complete 的错误信息列举
    pub fn remaining(&self) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.status != TaskStatus::Completed)
            .collect()
    }
}

/// update / remove 引用了不存在的 id
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("No task with id {0}")]
pub struct TaskNotFound(pub u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_update_remove_roundtrip() {
        let mut store = TaskStore::new();
        let a = store.add("explore repo");
        let b = store.add("write tests");
        assert_eq!(store.list().len(), 2);
        assert_ne!(a, b);

        store.update(a, TaskStatus::InProgress).unwrap();
        store.update(a, TaskStatus::Completed).unwrap();
        assert_eq!(store.summary(), TaskSummary { total: 2, completed: 1 });
        assert!(!store.is_complete());

        store.remove(b).unwrap();
        assert!(store.is_complete());
    }

    #[test]
    fn completed_never_exceeds_total() {
        let mut store = TaskStore::new();
        let a = store.add("a");
        store.update(a, TaskStatus::Completed).unwrap();
        store.update(a, TaskStatus::Completed).unwrap();
        let s = store.summary();
        assert!(s.completed <= s.total);

        store.remove(a).unwrap();
        let s = store.summary();
        assert_eq!(s.total, 0);
        assert_eq!(s.completed, 0);
        assert!(!store.is_complete(), "empty list must not count as complete");
    }

    #[test]
    fn replace_all_assigns_fresh_unique_ids() {
        let mut store = TaskStore::new();
        let old = store.add("old");
        store.replace_all(vec![
            TaskInput { task: "a".into(), status: TaskStatus::Pending },
            TaskInput { task: "b".into(), status: TaskStatus::Completed },
        ]);

        let ids: Vec<u64> = store.list().iter().map(|t| t.id).collect();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
        assert!(!ids.contains(&old), "replace_all must not reuse prior ids");

        // 旧 id 不再可解析
        assert_eq!(store.update(old, TaskStatus::Completed), Err(TaskNotFound(old)));

        let texts: Vec<&str> = store.list().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[test]
    fn update_unknown_id_fails() {
        let mut store = TaskStore::new();
        assert_eq!(store.update(42, TaskStatus::Completed), Err(TaskNotFound(42)));
        assert_eq!(store.remove(42), Err(TaskNotFound(42)));
    }

    #[test]
    fn remaining_lists_non_completed_in_order() {
        let mut store = TaskStore::new();
        let a = store.add("first");
        let _b = store.add("second");
        let c = store.add("third");
        store.update(a, TaskStatus::Completed).unwrap();
        store.update(c, TaskStatus::InProgress).unwrap();

        let remaining: Vec<&str> = store.remaining().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(remaining, vec!["second", "third"]);
    }
}
