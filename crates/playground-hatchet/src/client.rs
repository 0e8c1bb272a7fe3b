// Hatchet REST client
//
// Maps OrchestrationClient onto the platform's v1 REST endpoints:
// - trigger:    POST /api/v1/stable/tenants/{tenant}/workflow-runs/trigger
// - status:     GET  /api/v1/stable/workflow-runs/{id}/status
// - details:    GET  /api/v1/stable/workflow-runs/{id}
// - events:     GET  /api/v1/stable/workflow-runs/{id}/task-events
//
// The REST API has no push channel, so subscribe() polls the task-events
// endpoint and yields rows it has not seen yet.

use async_trait::async_trait;
use futures::stream;
use playground_core::{ClientError, OrchestrationClient, RunDetails, RunEvent, RunEventStream, RunRef, RunStatus};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::VecDeque;
use tracing::{debug, info};

use crate::config::HatchetConfig;
use crate::types::{ApiErrors, TaskEventList, TriggerWorkflowRunRequest, WorkflowRunDetails};

/// Client for the hosted orchestration platform
#[derive(Debug, Clone)]
pub struct HatchetClient {
    config: HatchetConfig,
    http: reqwest::Client,
}

impl HatchetClient {
    pub fn new(config: HatchetConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &HatchetConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.server_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self
            .http
            .get(self.url(path))
            .bearer_auth(&self.config.token)
            .send()
            .await
            .map_err(transport)?;
        handle_response(response).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T, ClientError> {
        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(&self.config.token)
            .json(body)
            .send()
            .await
            .map_err(transport)?;
        handle_response(response).await
    }

    async fn fetch_events(&self, workflow_run_id: &str) -> Result<TaskEventList, ClientError> {
        self.get(&format!(
            "/api/v1/stable/workflow-runs/{}/task-events",
            workflow_run_id
        ))
        .await
    }

    /// Rename a `{ "<namespace><task>": output }` key back to the bare task name
    fn strip_output_namespace(&self, output: Value) -> Value {
        match output {
            Value::Object(map) if map.len() == 1 && self.config.namespace.is_some() => map
                .into_iter()
                .map(|(key, value)| (self.config.strip_namespace(&key).to_string(), value))
                .collect::<Map<String, Value>>()
                .into(),
            other => other,
        }
    }
}

fn transport(e: reqwest::Error) -> ClientError {
    if e.is_decode() {
        ClientError::Serialization(e.to_string())
    } else {
        ClientError::Transport(e.to_string())
    }
}

async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrors>(&body)
            .ok()
            .and_then(|e| e.message())
            .unwrap_or(body);

        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(message));
        }
        return Err(ClientError::Api {
            status: status.as_u16(),
            message,
        });
    }

    response.json().await.map_err(transport)
}

/// Polling state behind `subscribe`
struct EventCursor {
    client: HatchetClient,
    workflow_run_id: String,
    seen: usize,
    pending: VecDeque<RunEvent>,
    polled: bool,
    finished: bool,
}

impl EventCursor {
    /// Fetch status then events; marks the cursor finished once the run is terminal
    async fn poll(&mut self) -> Result<(), ClientError> {
        if self.polled {
            tokio::time::sleep(self.client.config.event_poll_interval).await;
        }
        self.polled = true;

        let status = self.client.get_status(&self.workflow_run_id).await?;
        let events = self.client.fetch_events(&self.workflow_run_id).await?;

        let new_rows = events.rows.into_iter().skip(self.seen);
        for row in new_rows {
            self.seen += 1;
            self.pending.push_back(row.into_run_event(&self.workflow_run_id));
        }

        if status.is_terminal() {
            self.finished = true;
        }
        Ok(())
    }
}

#[async_trait]
impl OrchestrationClient for HatchetClient {
    fn name(&self) -> &'static str {
        "hatchet"
    }

    async fn trigger(
        &self,
        task_name: &str,
        input: Value,
        key: Option<String>,
    ) -> Result<RunRef, ClientError> {
        let mut additional_metadata = Map::new();
        if let Some(key) = key {
            additional_metadata.insert("idempotency_key".to_string(), Value::String(key));
        }

        let request = TriggerWorkflowRunRequest {
            workflow_name: self.config.namespaced(task_name),
            input,
            additional_metadata,
        };

        let details: WorkflowRunDetails = self
            .post(
                &format!(
                    "/api/v1/stable/tenants/{}/workflow-runs/trigger",
                    self.config.tenant_id
                ),
                &request,
            )
            .await?;

        info!(
            workflow_run_id = %details.run.metadata.id,
            workflow_name = %request.workflow_name,
            "Triggered workflow run"
        );
        Ok(RunRef::new(details.run.metadata.id, task_name))
    }

    async fn get_status(&self, workflow_run_id: &str) -> Result<RunStatus, ClientError> {
        self.get(&format!(
            "/api/v1/stable/workflow-runs/{}/status",
            workflow_run_id
        ))
        .await
    }

    async fn get_run(&self, workflow_run_id: &str) -> Result<RunDetails, ClientError> {
        let details: WorkflowRunDetails = self
            .get(&format!("/api/v1/stable/workflow-runs/{}", workflow_run_id))
            .await?;
        let run = details.run;

        Ok(RunDetails {
            workflow_run_id: run.metadata.id,
            status: run.status,
            output: run.output.map(|o| self.strip_output_namespace(o)),
            error_message: run.error_message,
        })
    }

    async fn subscribe(&self, workflow_run_id: &str) -> Result<RunEventStream, ClientError> {
        debug!(workflow_run_id = %workflow_run_id, "Subscribing to task events");
        let cursor = EventCursor {
            client: self.clone(),
            workflow_run_id: workflow_run_id.to_string(),
            seen: 0,
            pending: VecDeque::new(),
            polled: false,
            finished: false,
        };

        let events = stream::unfold(cursor, |mut cursor| async move {
            loop {
                if let Some(event) = cursor.pending.pop_front() {
                    return Some((Ok(event), cursor));
                }
                if cursor.finished {
                    return None;
                }
                if let Err(e) = cursor.poll().await {
                    cursor.finished = true;
                    return Some((Err(e), cursor));
                }
            }
        });

        Ok(Box::pin(events))
    }
}
