use crate::error::EngineError;
use crate::task::{TaskId, TaskKind, TaskSnapshot, TaskStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScanRequest {
    pub directory: String,
    pub profile_name: String,
}

/// One file handed to the fix worker
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FixFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    pub relative_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FixOptions {
    pub target_audio_codec: String,
    pub target_audio_bitrate: Option<String>,
    pub output_suffix: String,
    pub backup: bool,
}

impl Default for FixOptions {
    fn default() -> Self {
        Self {
            target_audio_codec: "aac".to_string(),
            target_audio_bitrate: None,
            output_suffix: ".fixed".to_string(),
            backup: false,
        }
    }
}

impl FixOptions {
    /// The suffix ends up in an output filename, so it must not be empty
    /// and must not contain a path separator.
    pub fn validate(&self) -> Result<(), EngineError> {
        let suffix = self.output_suffix.trim();
        if suffix.is_empty() || suffix.contains('/') || suffix.contains('\\') {
            return Err(EngineError::Rejected(format!(
                "Output suffix invalid: '{}'",
                self.output_suffix
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FixRequest {
    pub files_to_fix: Vec<FixFile>,
    pub fix_options: FixOptions,
}

/// Job parameters for either submission endpoint
#[derive(Debug, Clone, PartialEq)]
pub enum JobRequest {
    Scan(ScanRequest),
    Fix(FixRequest),
}

impl JobRequest {
    pub fn kind(&self) -> TaskKind {
        match self {
            JobRequest::Scan(_) => TaskKind::Scan,
            JobRequest::Fix(_) => TaskKind::Fix,
        }
    }

    /// Path below `/api`
    pub fn endpoint(&self) -> &'static str {
        match self {
            JobRequest::Scan(_) => "scan",
            JobRequest::Fix(_) => "fix",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    pub task_id: TaskId,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of `GET /api/status/{task_id}`
#[derive(Debug, Deserialize)]
pub struct StatusResponse {
    pub status: TaskStatus,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub processed_count: Option<u64>,
    #[serde(default)]
    pub total_files: Option<u64>,
    #[serde(default)]
    pub current_file: Option<String>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl From<StatusResponse> for TaskSnapshot {
    fn from(response: StatusResponse) -> Self {
        let progress = response
            .progress
            .filter(|p| p.is_finite())
            .map(|p| p.round().clamp(0.0, 100.0) as u8)
            .unwrap_or(0);

        TaskSnapshot {
            status: response.status,
            progress,
            processed_count: response.processed_count.unwrap_or(0),
            total_count: response.total_files,
            current_item: response.current_file.filter(|s| !s.is_empty()),
            error: response.error,
            result: response.result,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

/// Error body the server attaches to non-2xx responses
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
}
