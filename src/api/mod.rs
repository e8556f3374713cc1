//! Workflow API access
//!
//! This module provides:
//! - wire types for the workflow-run endpoint
//! - `WorkflowClient`, the HTTP implementation of `MessageSender`
//! - `SendPipeline`, a worker thread that runs sends in the background

pub mod client;
pub mod pipeline;
pub mod types;

pub use client::{endpoint_url, interpret_response, MessageSender, WorkflowClient};
pub use pipeline::{SendCommand, SendEvent, SendPipeline};
pub use types::{
    WorkflowError, WorkflowParameters, WorkflowRequest, WorkflowResponse, WorkflowResult,
    SUCCESS_PLACEHOLDER, WORKFLOW_RUN_PATH,
};
