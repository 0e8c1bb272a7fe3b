// OpenAPI document for the facade

use utoipa::OpenApi;

use crate::error::ErrorResponse;
use crate::runs::{self, RunStatusResponse};
use crate::tasks::{self, RunTaskRequest, RunTaskResponse, TaskListResponse};
use crate::HealthResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::healthz,
        tasks::list_tasks,
        tasks::run_task,
        runs::get_run_status,
    ),
    components(schemas(
        HealthResponse,
        TaskListResponse,
        RunTaskRequest,
        RunTaskResponse,
        RunStatusResponse,
        ErrorResponse,
    )),
    tags(
        (name = "health", description = "Liveness"),
        (name = "tasks", description = "Task listing and submission"),
        (name = "runs", description = "Run status"),
    ),
    info(
        title = "Hatchet Playground API",
        description = "Trigger playground tasks and follow their runs"
    )
)]
pub struct ApiDoc;
