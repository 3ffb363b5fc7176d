use crate::flow::{FlowGraph, Project};

/// What to do with nodes no path from `entry` reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnreachablePolicy {
    /// Report them as warnings and export anyway.
    #[default]
    Warn,
    /// Treat them as blocking validation errors.
    Reject,
}

/// Per-call export configuration.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Ids of the flows to export, in project order. `None` exports every flow.
    pub flows: Option<Vec<String>>,
    pub unreachable: UnreachablePolicy,
    /// Emit source node ids as comments in script targets.
    pub include_comments: bool,
}

impl ExportOptions {
    /// The flows in scope, in project order.
    pub fn scoped_flows<'p>(&self, project: &'p Project) -> Vec<&'p FlowGraph> {
        match &self.flows {
            None => project.flows.iter().collect(),
            Some(ids) => project
                .flows
                .iter()
                .filter(|f| ids.iter().any(|id| id == &f.id))
                .collect(),
        }
    }

    /// Requested flow ids that do not exist in the project.
    pub fn unknown_flows<'o>(&'o self, project: &Project) -> Vec<&'o str> {
        self.flows
            .iter()
            .flatten()
            .filter(|id| project.flow(id).is_none())
            .map(String::as_str)
            .collect()
    }
}
