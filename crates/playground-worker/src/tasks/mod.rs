// Task definitions hosted by the playground workers

pub mod blocking;
pub mod chat;
pub mod hello;

pub use blocking::{BenchmarkReport, CpuHeavyWithProcessPool, SyncSleepTask};
pub use chat::ChatOtel;
pub use hello::{ExternallyTriggeredTask, FirstWorkflow, FirstWorkflowOutput, SayHello};
