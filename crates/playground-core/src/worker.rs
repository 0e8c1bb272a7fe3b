// Worker definition
//
// A worker is a named group of tasks sharing a concurrency slot budget.
// Slots bound how many runs of the worker's tasks execute at once; keep them
// low when tasks block their thread.

use std::sync::Arc;

use crate::task::{erase, DynTask, Task};

/// Named set of tasks hosted together
#[derive(Clone)]
pub struct Worker {
    name: String,
    slots: usize,
    tasks: Vec<Arc<dyn DynTask>>,
}

impl Worker {
    pub fn builder(name: impl Into<String>) -> WorkerBuilder {
        WorkerBuilder {
            name: name.into(),
            slots: WorkerBuilder::DEFAULT_SLOTS,
            tasks: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slots(&self) -> usize {
        self.slots
    }

    pub fn tasks(&self) -> &[Arc<dyn DynTask>] {
        &self.tasks
    }

    pub fn task_names(&self) -> Vec<String> {
        self.tasks.iter().map(|t| t.name().to_string()).collect()
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("name", &self.name)
            .field("slots", &self.slots)
            .field("tasks", &self.task_names())
            .finish()
    }
}

/// Builder for Worker
pub struct WorkerBuilder {
    name: String,
    slots: usize,
    tasks: Vec<Arc<dyn DynTask>>,
}

impl WorkerBuilder {
    pub const DEFAULT_SLOTS: usize = 100;

    /// Concurrency slots; clamped to at least 1
    pub fn slots(mut self, slots: usize) -> Self {
        self.slots = slots.max(1);
        self
    }

    pub fn task<T: Task>(mut self, task: T) -> Self {
        self.tasks.push(erase(task));
        self
    }

    pub fn dyn_task(mut self, task: Arc<dyn DynTask>) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn build(self) -> Worker {
        Worker {
            name: self.name,
            slots: self.slots,
            tasks: self.tasks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use crate::task::{EmptyModel, TaskContext};
    use async_trait::async_trait;

    struct Noop(&'static str);

    #[async_trait]
    impl Task for Noop {
        type Input = EmptyModel;
        type Output = EmptyModel;

        fn name(&self) -> &str {
            self.0
        }

        async fn run(&self, _input: EmptyModel, _ctx: &TaskContext) -> Result<EmptyModel, TaskError> {
            Ok(EmptyModel {})
        }
    }

    #[test]
    fn test_builder_collects_tasks() {
        let worker = Worker::builder("test-worker")
            .slots(3)
            .task(Noop("a"))
            .task(Noop("b"))
            .build();

        assert_eq!(worker.name(), "test-worker");
        assert_eq!(worker.slots(), 3);
        assert_eq!(worker.task_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_slots_default_and_clamp() {
        assert_eq!(Worker::builder("w").build().slots(), 100);
        assert_eq!(Worker::builder("w").slots(0).build().slots(), 1);
    }
}
