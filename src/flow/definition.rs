use crate::ast::{Condition, Instruction};

/// Output socket of entry, hub, instruction, scene, subflow and response-less dialogue nodes.
pub const OUTPUT_SOCKET: &str = "output";
/// Input socket every node except `entry` exposes.
pub const INPUT_SOCKET: &str = "input";
/// Output socket a condition node follows when it holds.
pub const TRUE_SOCKET: &str = "true";
/// Output socket a condition node follows when it fails.
pub const FALSE_SOCKET: &str = "false";

/// A single narrative flow: the graph the editor produces.
///
/// Node and connection order are the deterministic iteration order of every
/// serializer, so they are kept as `Vec`s.
#[derive(Debug, Clone, Default)]
pub struct FlowGraph {
    pub id: String,
    pub name: String,
    pub nodes: Vec<FlowNode>,
    pub connections: Vec<Connection>,
}

impl FlowGraph {
    pub fn node(&self, node_id: &str) -> Option<&FlowNode> {
        self.nodes.iter().find(|n| n.id == node_id)
    }

    /// Returns the first entry node in node order.
    pub fn entry(&self) -> Option<&FlowNode> {
        self.nodes
            .iter()
            .find(|n| matches!(n.data, NodeData::Entry))
    }

    /// Connections leaving `node_id` through `socket`, in connection order.
    pub fn outgoing<'a>(
        &'a self,
        node_id: &'a str,
        socket: &'a str,
    ) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections
            .iter()
            .filter(move |c| c.source == node_id && c.source_socket == socket)
    }

    /// Every connection leaving `node_id`, whatever the socket.
    pub fn outgoing_all<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.iter().filter(move |c| c.source == node_id)
    }

    /// Finds the hub node carrying the author-visible `hub_id`.
    pub fn hub(&self, hub_id: &str) -> Option<&FlowNode> {
        self.nodes.iter().find(|n| match &n.data {
            NodeData::Hub(hub) => hub.hub_id == hub_id,
            _ => false,
        })
    }
}

/// Defines a single node of the flow graph.
#[derive(Debug, Clone)]
pub struct FlowNode {
    pub id: String,
    pub data: NodeData,
}

impl FlowNode {
    pub fn new(id: impl Into<String>, data: NodeData) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.data.kind()
    }

    /// The output sockets this node exposes, in a stable order.
    pub fn output_sockets(&self) -> Vec<&str> {
        match &self.data {
            NodeData::Exit(_) | NodeData::Jump(_) => Vec::new(),
            NodeData::Condition(_) => vec![TRUE_SOCKET, FALSE_SOCKET],
            NodeData::Dialogue(dialogue) if !dialogue.responses.is_empty() => dialogue
                .responses
                .iter()
                .map(|r| r.id.as_str())
                .collect(),
            _ => vec![OUTPUT_SOCKET],
        }
    }

    pub fn has_input(&self) -> bool {
        !matches!(self.data, NodeData::Entry)
    }
}

/// Type-specific payload of a node.
#[derive(Debug, Clone)]
pub enum NodeData {
    Entry,
    Exit(ExitData),
    Dialogue(DialogueData),
    Hub(HubData),
    Jump(JumpData),
    Condition(Condition),
    Instruction(Instruction),
    Scene(SceneData),
    Subflow(SubflowData),
}

impl NodeData {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::Entry => NodeKind::Entry,
            NodeData::Exit(_) => NodeKind::Exit,
            NodeData::Dialogue(_) => NodeKind::Dialogue,
            NodeData::Hub(_) => NodeKind::Hub,
            NodeData::Jump(_) => NodeKind::Jump,
            NodeData::Condition(_) => NodeKind::Condition,
            NodeData::Instruction(_) => NodeKind::Instruction,
            NodeData::Scene(_) => NodeKind::Scene,
            NodeData::Subflow(_) => NodeKind::Subflow,
        }
    }
}

/// Payload-free discriminant of `NodeData`, used in reports and schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Entry,
    Exit,
    Dialogue,
    Hub,
    Jump,
    Condition,
    Instruction,
    Scene,
    Subflow,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Entry => "entry",
            NodeKind::Exit => "exit",
            NodeKind::Dialogue => "dialogue",
            NodeKind::Hub => "hub",
            NodeKind::Jump => "jump",
            NodeKind::Condition => "condition",
            NodeKind::Instruction => "instruction",
            NodeKind::Scene => "scene",
            NodeKind::Subflow => "subflow",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExitData {
    pub label: Option<String>,
}

/// A line of dialogue, optionally followed by player responses.
#[derive(Debug, Clone, Default)]
pub struct DialogueData {
    /// Shortcut of the sheet that speaks this line.
    pub speaker: Option<String>,
    /// Rich text as authored; may contain HTML.
    pub text: String,
    pub stage_directions: Option<String>,
    pub menu_text: Option<String>,
    pub responses: Vec<Response>,
}

/// A player choice hanging off a dialogue node. Its output socket is its `id`.
#[derive(Debug, Clone)]
pub struct Response {
    pub id: String,
    pub text: String,
    pub condition: Option<Condition>,
    pub instruction: Option<Instruction>,
}

impl Response {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            condition: None,
            instruction: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HubData {
    pub hub_id: String,
}

#[derive(Debug, Clone)]
pub struct JumpData {
    pub target_hub: String,
}

#[derive(Debug, Clone, Default)]
pub struct SceneData {
    pub location: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct SubflowData {
    pub flow_ref: String,
}

/// Defines a connection between an output socket and an input socket.
#[derive(Debug, Clone)]
pub struct Connection {
    pub source: String,
    pub source_socket: String,
    pub target: String,
    pub target_socket: String,
}

impl Connection {
    /// A connection from `source`'s `socket` into `target`'s default input.
    pub fn new(source: impl Into<String>, socket: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            source_socket: socket.into(),
            target: target.into(),
            target_socket: INPUT_SOCKET.to_string(),
        }
    }
}
