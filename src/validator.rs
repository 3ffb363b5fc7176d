//! Pre-flight checks run before any traversal or serialization.

use crate::ast::{Condition, Instruction, VariableRef};
use crate::error::{UnsupportedFormatError, ValidationError};
use crate::exporter::{ExportOptions, UnreachablePolicy};
use crate::flow::{FlowGraph, FlowNode, NodeData, Project, SheetIndex};
use crate::format::{ExportFormat, FormatFamily};
use crate::transpiler::{Emitter, transpile_condition, transpile_instruction};
use ahash::{AHashMap, AHashSet};
use std::collections::VecDeque;
use std::collections::hash_map::Entry;
use std::fmt;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

/// What is wrong. Paired with its location in [`ValidationIssue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    EmptyScope,
    UnknownFlow,
    MissingEntry,
    MultipleEntries { count: usize },
    DanglingConnection { missing_node_id: String },
    UnknownSocket { socket: String },
    UnknownHub { hub_id: String },
    DuplicateHub { hub_id: String },
    UnknownSubflow { flow_ref: String },
    UnknownVariable { variable: String },
    UnknownSpeaker { speaker: String },
    Untranspilable { message: String },
    AmbiguousOutput { socket: String, count: usize },
    VariableNameClash {
        name: String,
        first: String,
        second: String,
    },
    Unreachable,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueKind::EmptyScope => write!(f, "there are no flows to export"),
            IssueKind::UnknownFlow => write!(f, "the requested flow does not exist"),
            IssueKind::MissingEntry => write!(f, "the flow has no entry node"),
            IssueKind::MultipleEntries { count } => {
                write!(f, "the flow has {} entry nodes, expected one", count)
            }
            IssueKind::DanglingConnection { missing_node_id } => {
                write!(f, "a connection points to missing node '{}'", missing_node_id)
            }
            IssueKind::UnknownSocket { socket } => {
                write!(f, "a connection uses unknown socket '{}'", socket)
            }
            IssueKind::UnknownHub { hub_id } => write!(f, "jump targets unknown hub '{}'", hub_id),
            IssueKind::DuplicateHub { hub_id } => {
                write!(f, "hub id '{}' is used by more than one hub", hub_id)
            }
            IssueKind::UnknownSubflow { flow_ref } => {
                write!(f, "subflow '{}' is not part of the export", flow_ref)
            }
            IssueKind::UnknownVariable { variable } => {
                write!(f, "variable '{}' does not exist", variable)
            }
            IssueKind::UnknownSpeaker { speaker } => {
                write!(f, "speaker sheet '{}' does not exist", speaker)
            }
            IssueKind::Untranspilable { message } => write!(f, "{}", message),
            IssueKind::AmbiguousOutput { socket, count } => write!(
                f,
                "output '{}' has {} connections, script targets can follow only one",
                socket, count
            ),
            IssueKind::VariableNameClash {
                name,
                first,
                second,
            } => write!(
                f,
                "variables '{}' and '{}' both render as '{}'",
                first, second, name
            ),
            IssueKind::Unreachable => write!(f, "the node cannot be reached from the entry"),
        }
    }
}

/// A single finding, located by flow and (when applicable) node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub flow_id: String,
    pub node_id: Option<String>,
    pub kind: IssueKind,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        match &self.node_id {
            Some(node) => write!(
                f,
                "[{}] flow '{}', node '{}': {}",
                level, self.flow_id, node, self.kind
            ),
            None => write!(f, "[{}] flow '{}': {}", level, self.flow_id, self.kind),
        }
    }
}

/// The outcome of a validation run: every issue found, in discovery order.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub format: ExportFormat,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// True when nothing blocks the export.
    pub fn is_ready(&self) -> bool {
        self.errors().next().is_none()
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    /// The warnings when the export may proceed, otherwise every blocking issue.
    pub fn into_result(self) -> Result<Vec<ValidationIssue>, ValidationError> {
        if self.is_ready() {
            Ok(self.issues)
        } else {
            Err(ValidationError {
                issues: self
                    .issues
                    .into_iter()
                    .filter(|i| i.severity == Severity::Error)
                    .collect(),
            })
        }
    }
}

/// Checks a project against a target before anything is generated.
pub struct Validator<'a> {
    project: &'a Project,
    options: &'a ExportOptions,
    sheets: SheetIndex<'a>,
}

impl<'a> Validator<'a> {
    pub fn new(project: &'a Project, options: &'a ExportOptions) -> Self {
        Self {
            project,
            options,
            sheets: SheetIndex::new(&project.sheets),
        }
    }

    /// Parses `format` first, so unknown and unimplemented targets fail before any graph check.
    pub fn validate_named(&self, format: &str) -> Result<ValidationReport, UnsupportedFormatError> {
        let format: ExportFormat = format.parse()?;
        Ok(self.validate(format))
    }

    pub fn validate(&self, format: ExportFormat) -> ValidationReport {
        let mut issues = Vec::new();

        for id in self.options.unknown_flows(self.project) {
            issues.push(ValidationIssue {
                severity: Severity::Error,
                flow_id: id.to_string(),
                node_id: None,
                kind: IssueKind::UnknownFlow,
            });
        }

        let flows = self.options.scoped_flows(self.project);
        if flows.is_empty() {
            issues.push(ValidationIssue {
                severity: Severity::Error,
                flow_id: self.project.name.clone(),
                node_id: None,
                kind: IssueKind::EmptyScope,
            });
        }

        self.check_variable_names(format, &mut issues);

        let scope: AHashSet<&str> = flows.iter().map(|f| f.id.as_str()).collect();
        for flow in &flows {
            FlowCheck {
                flow,
                format,
                emitter: format.emitter(),
                sheets: &self.sheets,
                scope: &scope,
                unreachable: self.options.unreachable,
                issues: &mut issues,
            }
            .run();
        }

        for issue in &issues {
            match issue.severity {
                Severity::Warning => warn!(%format, "{}", issue),
                Severity::Error => debug!(%format, "{}", issue),
            }
        }

        ValidationReport { format, issues }
    }

    /// Flattened targets join sheet and variable names, so distinct variables can collide.
    fn check_variable_names(&self, format: ExportFormat, issues: &mut Vec<ValidationIssue>) {
        let emitter = format.emitter();
        let mut rendered: AHashMap<String, VariableRef> = AHashMap::new();
        for var in self.sheets.variables() {
            let reference = var.reference();
            match rendered.entry(emitter.variable(&reference)) {
                Entry::Vacant(slot) => {
                    slot.insert(reference);
                }
                Entry::Occupied(slot) => issues.push(ValidationIssue {
                    severity: Severity::Error,
                    flow_id: self.project.name.clone(),
                    node_id: None,
                    kind: IssueKind::VariableNameClash {
                        name: slot.key().clone(),
                        first: slot.get().to_string(),
                        second: reference.to_string(),
                    },
                }),
            }
        }
    }
}

/// The checks for a single flow.
struct FlowCheck<'v, 'a> {
    flow: &'a FlowGraph,
    format: ExportFormat,
    emitter: &'static dyn Emitter,
    sheets: &'v SheetIndex<'a>,
    scope: &'v AHashSet<&'a str>,
    unreachable: UnreachablePolicy,
    issues: &'v mut Vec<ValidationIssue>,
}

impl FlowCheck<'_, '_> {
    fn push(&mut self, severity: Severity, node_id: Option<&str>, kind: IssueKind) {
        self.issues.push(ValidationIssue {
            severity,
            flow_id: self.flow.id.clone(),
            node_id: node_id.map(str::to_string),
            kind,
        });
    }

    fn run(mut self) {
        let flow = self.flow;
        let entries: Vec<&FlowNode> = flow
            .nodes
            .iter()
            .filter(|n| matches!(n.data, NodeData::Entry))
            .collect();
        match entries.len() {
            0 => self.push(Severity::Error, None, IssueKind::MissingEntry),
            1 => {}
            count => self.push(Severity::Error, None, IssueKind::MultipleEntries { count }),
        }

        self.check_connections();
        self.check_hubs_and_subflows();

        let reachable = match entries.first() {
            Some(entry) => self.reachable_from(entry),
            None => AHashSet::new(),
        };

        for node in &flow.nodes {
            let live = entries.is_empty() || reachable.contains(node.id.as_str());
            if !live {
                let severity = match self.unreachable {
                    UnreachablePolicy::Warn => Severity::Warning,
                    UnreachablePolicy::Reject => Severity::Error,
                };
                self.push(severity, Some(&node.id), IssueKind::Unreachable);
            }
            // Structured targets serialize every node, live or not.
            if live || self.format.family() == FormatFamily::Structured {
                self.check_node(node);
            }
        }
    }

    fn check_connections(&mut self) {
        let flow = self.flow;
        for conn in &flow.connections {
            let source = flow.node(&conn.source);
            let target = flow.node(&conn.target);
            for (id, node) in [(&conn.source, source), (&conn.target, target)] {
                if node.is_none() {
                    self.push(
                        Severity::Error,
                        Some(&conn.source),
                        IssueKind::DanglingConnection {
                            missing_node_id: id.clone(),
                        },
                    );
                }
            }
            if let Some(source) = source {
                if !source.output_sockets().contains(&conn.source_socket.as_str()) {
                    self.push(
                        Severity::Error,
                        Some(&source.id),
                        IssueKind::UnknownSocket {
                            socket: conn.source_socket.clone(),
                        },
                    );
                }
            }
            if let Some(target) = target {
                if !target.has_input() {
                    self.push(
                        Severity::Error,
                        Some(&target.id),
                        IssueKind::UnknownSocket {
                            socket: conn.target_socket.clone(),
                        },
                    );
                }
            }
        }
    }

    fn check_hubs_and_subflows(&mut self) {
        let flow = self.flow;
        let mut seen_hubs = AHashSet::new();
        for node in &flow.nodes {
            match &node.data {
                NodeData::Hub(hub) => {
                    if !seen_hubs.insert(hub.hub_id.as_str()) {
                        self.push(
                            Severity::Error,
                            Some(&node.id),
                            IssueKind::DuplicateHub {
                                hub_id: hub.hub_id.clone(),
                            },
                        );
                    }
                }
                NodeData::Jump(jump) if flow.hub(&jump.target_hub).is_none() => {
                    self.push(
                        Severity::Error,
                        Some(&node.id),
                        IssueKind::UnknownHub {
                            hub_id: jump.target_hub.clone(),
                        },
                    );
                }
                NodeData::Subflow(subflow) if !self.scope.contains(subflow.flow_ref.as_str()) => {
                    self.push(
                        Severity::Error,
                        Some(&node.id),
                        IssueKind::UnknownSubflow {
                            flow_ref: subflow.flow_ref.clone(),
                        },
                    );
                }
                _ => {}
            }
        }
    }

    /// Breadth-first over connections and jump → hub transfers.
    fn reachable_from(&self, entry: &FlowNode) -> AHashSet<String> {
        let flow = self.flow;
        let mut seen = AHashSet::new();
        let mut queue = VecDeque::from([entry.id.as_str()]);
        seen.insert(entry.id.clone());

        while let Some(id) = queue.pop_front() {
            let Some(node) = flow.node(id) else { continue };
            let mut next: Vec<&str> = flow
                .outgoing_all(&node.id)
                .map(|c| c.target.as_str())
                .collect();
            if let NodeData::Jump(jump) = &node.data {
                if let Some(hub) = flow.hub(&jump.target_hub) {
                    next.push(hub.id.as_str());
                }
            }
            for target in next {
                if seen.insert(target.to_string()) {
                    queue.push_back(target);
                }
            }
        }
        seen
    }

    /// Variable, speaker, expression and fan-out checks for a node that will be emitted.
    fn check_node(&mut self, node: &FlowNode) {
        match &node.data {
            NodeData::Dialogue(dialogue) => {
                if let Some(speaker) = &dialogue.speaker {
                    if self.sheets.sheet(speaker).is_none() {
                        self.push(
                            Severity::Warning,
                            Some(&node.id),
                            IssueKind::UnknownSpeaker {
                                speaker: speaker.clone(),
                            },
                        );
                    }
                }
                for response in &dialogue.responses {
                    if let Some(condition) = &response.condition {
                        self.check_condition(node, condition);
                    }
                    if let Some(instruction) = &response.instruction {
                        self.check_instruction(node, instruction);
                    }
                }
            }
            NodeData::Condition(condition) => self.check_condition(node, condition),
            NodeData::Instruction(instruction) => self.check_instruction(node, instruction),
            _ => {}
        }

        if self.format.family() == FormatFamily::TextScript {
            let flow = self.flow;
            for socket in node.output_sockets() {
                let count = flow.outgoing(&node.id, socket).count();
                if count > 1 {
                    self.push(
                        Severity::Error,
                        Some(&node.id),
                        IssueKind::AmbiguousOutput {
                            socket: socket.to_string(),
                            count,
                        },
                    );
                }
            }
        }
    }

    fn check_condition(&mut self, node: &FlowNode, condition: &Condition) {
        self.check_variables(node, &condition.variables());
        if let Err(err) = transpile_condition(condition, self.emitter) {
            self.push(
                Severity::Error,
                Some(&node.id),
                IssueKind::Untranspilable {
                    message: err.to_string(),
                },
            );
        }
    }

    fn check_instruction(&mut self, node: &FlowNode, instruction: &Instruction) {
        self.check_variables(node, &instruction.variables());
        if let Err(err) = transpile_instruction(instruction, self.emitter) {
            self.push(
                Severity::Error,
                Some(&node.id),
                IssueKind::Untranspilable {
                    message: err.to_string(),
                },
            );
        }
    }

    fn check_variables(&mut self, node: &FlowNode, refs: &[&VariableRef]) {
        let mut reported = AHashSet::new();
        for var in refs {
            if self.sheets.resolve(var).is_none() && reported.insert(var.to_string()) {
                self.push(
                    Severity::Error,
                    Some(&node.id),
                    IssueKind::UnknownVariable {
                        variable: var.to_string(),
                    },
                );
            }
        }
    }
}
