//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and traits from the kataribe crate.
//! Import this module to get access to the core functionality without having to import
//! each type individually.
//!
//! # Example
//!
//! ```rust,no_run
//! use kataribe::prelude::*;
//!
//! # fn run_example(project: Project) -> Result<()> {
//! let exporter = Exporter::builder(project)
//!     .only_flows(["intro"])
//!     .unreachable_policy(UnreachablePolicy::Reject)
//!     .build();
//!
//! let report = exporter.validate(ExportFormat::Yarn);
//! for issue in report.warnings() {
//!     println!("{}", issue);
//! }
//!
//! let output = exporter.export_named("yarn")?;
//! for file in output.into_files() {
//!     std::fs::write(&file.filename, file.content)?;
//! }
//! # Ok(())
//! # }
//! ```

// Export pipeline
pub use crate::exporter::{
    ExportOptions, ExportOutput, Exporter, ExporterBuilder, OutputFile, UnreachablePolicy,
};
pub use crate::format::{ExportFormat, FormatFamily};
pub use crate::validator::{IssueKind, Severity, ValidationIssue, ValidationReport, Validator};

// Flow model
pub use crate::flow::{
    Connection, DialogueData, ExitData, FlowGraph, FlowNode, HubData, IntoProject, JumpData,
    NodeData, NodeKind, Project, Response, SceneData, Sheet, SubflowData, VariableDefinition,
    VariableKind,
};

// Condition and instruction ASTs
pub use crate::ast::{
    Assignment, Condition, Instruction, Logic, Operand, Operation, Operator, Rule, Value,
    VariableRef,
};

// Error types
pub use crate::error::{
    ExportError, ProjectConversionError, TranspileError, TraversalError, UnsupportedFormatError,
    ValidationError,
};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
