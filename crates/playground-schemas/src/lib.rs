// Shared schemas for the playground tasks
// Types here are the contract between whoever triggers a task and the worker
// that runs it.

pub mod catalog;
pub mod tasks;

pub use catalog::{default_registry, SchemaCatalog, TaskSchemaEntry, TASK_SCHEMAS};
pub use tasks::*;
