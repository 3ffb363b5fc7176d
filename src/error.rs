use crate::validator::ValidationIssue;
use itertools::Itertools;
use thiserror::Error;

/// The requested target cannot be exported to.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnsupportedFormatError {
    #[error("Export format '{0}' is not registered")]
    Unregistered(String),

    #[error("Export format '{0}' is declared but has no serializer yet")]
    NotImplemented(String),
}

/// A condition or instruction cannot be rendered for the requested target.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranspileError {
    #[error("Operation '{operation}' is not supported by the {target} emitter")]
    UnsupportedOperation { operation: String, target: String },

    #[error("Operation '{operation}' on '{variable}' requires a value")]
    MissingValue { operation: String, variable: String },
}

/// The reachable part of a flow violates a structural requirement of the target.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TraversalError {
    #[error("Flow '{flow_id}' has no entry node")]
    MissingEntry { flow_id: String },

    #[error(
        "Node '{node_id}' in flow '{flow_id}' has {count} connections on output '{socket}', but a script target can only follow one"
    )]
    AmbiguousOutput {
        flow_id: String,
        node_id: String,
        socket: String,
        count: usize,
    },

    #[error(
        "Nodes '{first}' and '{second}' in flow '{flow_id}' both map to block id '{block_id}'"
    )]
    BlockIdCollision {
        flow_id: String,
        block_id: String,
        first: String,
        second: String,
    },

    #[error("Node '{node_id}' in flow '{flow_id}' sits on a cycle that passes through no hub")]
    UnanchoredCycle { flow_id: String, node_id: String },

    #[error(
        "Node '{missing_node_id}' not found in flow '{flow_id}', which is required by a connection from node '{source_node_id}'"
    )]
    NodeNotFound {
        flow_id: String,
        missing_node_id: String,
        source_node_id: String,
    },

    #[error("Jump node '{node_id}' in flow '{flow_id}' targets unknown hub '{hub_id}'")]
    HubNotFound {
        flow_id: String,
        node_id: String,
        hub_id: String,
    },
}

/// Every blocking issue the validator found, never just the first.
#[derive(Error, Debug, Clone, PartialEq)]
#[error(
    "Export validation failed with {} issue(s):\n{}",
    .issues.len(),
    .issues.iter().map(|i| format!("  - {}", i)).join("\n")
)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

/// Errors that can occur while converting an editor model into a `Project`.
#[derive(Error, Debug, Clone)]
pub enum ProjectConversionError {
    #[error("Failed to parse project JSON: {0}")]
    JsonParseError(String),

    #[error("Invalid project data: {0}")]
    Invalid(String),
}

/// The umbrella error returned by the export pipeline.
#[derive(Error, Debug, Clone)]
pub enum ExportError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    UnsupportedFormat(#[from] UnsupportedFormatError),

    #[error(transparent)]
    Transpile(#[from] TranspileError),

    #[error(transparent)]
    Traversal(#[from] TraversalError),

    #[error("Failed to encode {format} output: {message}")]
    Encoding { format: String, message: String },
}
