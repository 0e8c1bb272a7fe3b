// Minimal tasks: no side effects, immediate results

use async_trait::async_trait;
use playground_core::{EmptyModel, Task, TaskContext, TaskError};
use playground_schemas::{
    ExternallyTriggeredTaskInput, ExternallyTriggeredTaskOutput, SayHelloInput, SayHelloOutput,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirstWorkflowOutput {
    pub meaning_of_life: u32,
}

pub struct FirstWorkflow;

#[async_trait]
impl Task for FirstWorkflow {
    type Input = EmptyModel;
    type Output = FirstWorkflowOutput;

    fn name(&self) -> &str {
        "first-workflow"
    }

    async fn run(&self, _input: EmptyModel, ctx: &TaskContext) -> Result<FirstWorkflowOutput, TaskError> {
        ctx.log("executed task");
        Ok(FirstWorkflowOutput { meaning_of_life: 42 })
    }
}

pub struct SayHello;

#[async_trait]
impl Task for SayHello {
    type Input = SayHelloInput;
    type Output = SayHelloOutput;

    fn name(&self) -> &str {
        "say_hello"
    }

    async fn run(&self, input: SayHelloInput, _ctx: &TaskContext) -> Result<SayHelloOutput, TaskError> {
        Ok(SayHelloOutput {
            message: format!("Hello, {}!", input.name),
        })
    }
}

pub struct ExternallyTriggeredTask;

#[async_trait]
impl Task for ExternallyTriggeredTask {
    type Input = ExternallyTriggeredTaskInput;
    type Output = ExternallyTriggeredTaskOutput;

    fn name(&self) -> &str {
        "externally-triggered-task"
    }

    async fn run(
        &self,
        input: ExternallyTriggeredTaskInput,
        ctx: &TaskContext,
    ) -> Result<ExternallyTriggeredTaskOutput, TaskError> {
        ctx.log(format!("triggered for user_id={}", input.user_id));
        Ok(ExternallyTriggeredTaskOutput { ok: true })
    }
}
