pub mod profiles;
pub mod types;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::task::{TaskId, TaskSnapshot};
use async_trait::async_trait;
use reqwest::StatusCode;
use types::{ErrorResponse, JobRequest, MessageResponse, StatusResponse, SubmitResponse};

/// Request/response seam between the engine and the server.
///
/// Implementations hold no task state; every call is independent.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Start a job. Never retried.
    async fn submit(&self, job: &JobRequest) -> Result<TaskId, EngineError>;

    /// Fetch the current status and result payload of a task
    async fn poll(&self, task_id: &TaskId) -> Result<TaskSnapshot, EngineError>;

    /// Ask the server to move a task into `cancelling`. Best-effort.
    async fn request_cancel(&self, task_id: &TaskId) -> Result<String, EngineError>;
}

pub struct PlayarrClient {
    client: reqwest::Client,
    api_url: String,
}

impl PlayarrClient {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url(),
        }
    }

    fn task_url(&self, route: &str, task_id: &TaskId) -> String {
        format!(
            "{}/{}/{}",
            self.api_url,
            route,
            urlencoding::encode(task_id.as_str())
        )
    }
}

impl Default for PlayarrClient {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

/// Server-supplied `error` field, or a generic HTTP status message when the
/// body cannot be parsed.
async fn error_message(response: reqwest::Response, fallback: String) -> String {
    match response.json::<ErrorResponse>().await {
        Ok(ErrorResponse { error: Some(msg) }) if !msg.is_empty() => msg,
        _ => fallback,
    }
}

#[async_trait]
impl Transport for PlayarrClient {
    async fn submit(&self, job: &JobRequest) -> Result<TaskId, EngineError> {
        let url = format!("{}/{}", self.api_url, job.endpoint());
        tracing::debug!("Submitting {} job: {}", job.kind(), url);

        let request = self.client.post(&url);
        let request = match job {
            JobRequest::Scan(body) => request.json(body),
            JobRequest::Fix(body) => request.json(body),
        };

        let response = request
            .send()
            .await
            .map_err(|e| EngineError::Submission(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let msg = error_message(response, format!("HTTP error {}", status.as_u16())).await;
            return Err(EngineError::Submission(msg));
        }

        let body = response
            .json::<SubmitResponse>()
            .await
            .map_err(|e| EngineError::Submission(format!("Invalid submit response: {}", e)))?;

        tracing::info!(
            "{} job accepted as task {} ({})",
            job.kind().label(),
            body.task_id,
            body.message.as_deref().unwrap_or("queued")
        );
        Ok(body.task_id)
    }

    async fn poll(&self, task_id: &TaskId) -> Result<TaskSnapshot, EngineError> {
        let url = self.task_url("status", task_id);
        tracing::debug!("Polling: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| EngineError::Transport(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {
                let body = response
                    .json::<StatusResponse>()
                    .await
                    .map_err(|e| EngineError::Transport(format!("Invalid status response: {}", e)))?;
                Ok(body.into())
            }
            StatusCode::NOT_FOUND => {
                tracing::debug!("Task {} not found on server", task_id);
                Err(EngineError::NotFound(task_id.clone()))
            }
            status => {
                let msg = error_message(response, format!("Poll error {}", status.as_u16())).await;
                Err(EngineError::Transport(msg))
            }
        }
    }

    async fn request_cancel(&self, task_id: &TaskId) -> Result<String, EngineError> {
        let url = self.task_url("stop_task", task_id);
        tracing::debug!("Requesting cancel: {}", url);

        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| EngineError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let msg = error_message(response, format!("HTTP error {}", status.as_u16())).await;
            return Err(EngineError::Transport(msg));
        }

        let ack = response
            .json::<MessageResponse>()
            .await
            .ok()
            .and_then(|body| body.message)
            .unwrap_or_else(|| "Cancellation requested".to_string());
        Ok(ack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_url_is_encoded() {
        let client = PlayarrClient::new(&EngineConfig::new("http://host:5000", 2000));
        let url = client.task_url("status", &TaskId::new("scan_a b"));
        assert_eq!(url, "http://host:5000/api/status/scan_a%20b");
    }
}
