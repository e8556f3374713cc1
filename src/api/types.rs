//! Wire types for the workflow-run endpoint

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Path of the workflow-run endpoint, relative to the profile base URL
pub const WORKFLOW_RUN_PATH: &str = "v1/workflow/run";

/// Output reported when a successful response carries no output text
pub const SUCCESS_PLACEHOLDER: &str = "Request succeeded";

/// Request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRequest {
    pub parameters: WorkflowParameters,
    pub workflow_id: String,
}

impl WorkflowRequest {
    pub fn new(input: impl Into<String>, workflow_id: impl Into<String>) -> Self {
        Self {
            parameters: WorkflowParameters {
                input: input.into(),
            },
            workflow_id: workflow_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowParameters {
    pub input: String,
}

/// Response body; either side may be absent
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WorkflowResponse {
    #[serde(default)]
    pub result: Option<WorkflowResult>,
    #[serde(default)]
    pub error: Option<WorkflowError>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WorkflowResult {
    #[serde(default)]
    pub output: Option<String>,
}

/// Application-level error carried in an otherwise well-formed response
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WorkflowError {
    #[serde(default)]
    pub message: Option<String>,
    /// Some deployments send a number, others a string
    #[serde(default)]
    pub code: Option<Value>,
}

impl WorkflowError {
    pub fn code_text(&self) -> Option<String> {
        match &self.code {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        }
    }
}
