// Task Runner Abstraction
//
// This crate provides a platform-agnostic way to trigger tasks on a workflow
// orchestration platform and follow them to completion.
//
// Key design decisions:
// - OrchestrationClient is the only seam to the platform (REST client, local orchestrator, mocks)
// - Task schemas live in a static registry; unknown task names fall back to "no input"
// - Payload validation and argument checks fail locally, before any remote call
// - Terminal status is observed by polling or by consuming the run's event stream
// - Typed tasks are erased to a JSON-in/JSON-out DynTask for hosting on workers
// - LocalOrchestrator hosts workers in-process for examples and tests

pub mod client;
pub mod error;
pub mod runner;
pub mod schema;
pub mod status;
pub mod task;
pub mod worker;

// In-process orchestrator
pub mod local;

// In-memory implementations for testing
pub mod memory;

// Re-exports for convenience
pub use client::{BulkRunItem, OrchestrationClient, RunEventStream};
pub use error::{ClientError, Result, RunnerError, TaskError};
pub use local::LocalOrchestrator;
pub use runner::{
    positive_duration, Payload, RunOptions, TaskRunner, TaskStub, WaitMode, DEFAULT_POLL_INTERVAL,
};
pub use schema::{SchemaRegistry, SchemaRegistryBuilder, StructuredSchema, TaskSchema, Validator};
pub use status::{Outcome, RunDetails, RunEvent, RunEventKind, RunRef, RunStatus};
pub use task::{erase, DynTask, EmptyModel, LogSink, Task, TaskContext, TaskOptions};
pub use worker::{Worker, WorkerBuilder};
