// Playground Worker Library
// Decision: Task definitions, bootstraps and the AppContext are a library so the
// CLI can host the same workers in-process with `--local`

pub mod context;
pub mod error;
pub mod pool;
pub mod tasks;
pub mod workers;

pub use context::AppContext;
pub use error::WorkerError;
pub use pool::{default_pool_size, CpuPool, MAX_CPU_WORKERS};
pub use workers::{default_worker, start_workers, sync_worker, WorkerSelection};
