//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.
//!
//! Every `/api/*` response is wrapped in [`ApiResponse`]. Request bodies
//! keep their fields as loose JSON values so a missing or mistyped field is
//! reported as a 400 with the usual envelope instead of an extractor rejection.

use relboard_core::{ProjectId, RelboardError, StepStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// RESPONSE ENVELOPE
// =============================================================================

/// `{ success, data?, error? }`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Successful response carrying `data`.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Failed response carrying a message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// QUERY PARAMETERS
// =============================================================================

/// `?projectId=` filter for list endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub project_id: Option<String>,
}

impl ListQuery {
    /// Parse the filter. An empty value means "no filter".
    pub fn project(&self) -> Result<Option<ProjectId>, RelboardError> {
        match self.project_id.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw.parse().map(Some),
        }
    }
}

// =============================================================================
// STEP REQUESTS
// =============================================================================

/// `PATCH /api/releases/{id}/step` body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepUpdateRequest {
    pub step_name: Option<Value>,
    pub status: Option<Value>,
}

impl StepUpdateRequest {
    /// Check both fields are present strings and the status is canonical.
    pub fn validate(self) -> Result<(String, StepStatus), RelboardError> {
        let step_name = required_step_name(self.step_name)?;
        let status = match self.status {
            None | Some(Value::Null) => {
                return Err(RelboardError::InvalidInput(
                    "status is required".to_string(),
                ));
            }
            Some(Value::String(raw)) => raw.parse()?,
            Some(other) => return Err(RelboardError::InvalidStatus(other.to_string())),
        };
        Ok((step_name, status))
    }
}

/// `POST /api/releases/{id}/step/advance` body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceStepRequest {
    pub step_name: Option<Value>,
}

impl AdvanceStepRequest {
    pub fn validate(self) -> Result<String, RelboardError> {
        required_step_name(self.step_name)
    }
}

fn required_step_name(step_name: Option<Value>) -> Result<String, RelboardError> {
    match step_name {
        None | Some(Value::Null) => Err(RelboardError::InvalidInput(
            "stepName is required".to_string(),
        )),
        Some(Value::String(name)) => Ok(name),
        Some(_) => Err(RelboardError::InvalidInput(
            "stepName must be a string".to_string(),
        )),
    }
}
