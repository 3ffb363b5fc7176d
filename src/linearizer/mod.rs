//! Turns a flow graph into an ordered list of blocks for script targets.

use crate::error::{ExportError, TraversalError};
use crate::flow::{
    FALSE_SOCKET, FlowGraph, FlowNode, NodeData, OUTPUT_SOCKET, SheetIndex, TRUE_SOCKET,
};
use crate::helpers::{sanitize_identifier, strip_html};
use crate::transpiler::{Emitter, transpile_condition, transpile_instruction};
use ahash::{AHashMap, AHashSet};
use tracing::debug;

mod block;

pub use block::*;

/// Walks a single flow depth-first from its entry node.
///
/// Entry, dialogue and hub nodes, plus any node with several predecessors,
/// start a block. Everything else is inlined where it is reached. Reaching a
/// block start emits a divert, so cycles through hubs are never unrolled.
pub struct Linearizer<'a> {
    flow: &'a FlowGraph,
    sheets: &'a SheetIndex<'a>,
    emitter: &'a dyn Emitter,
    predecessors: AHashMap<&'a str, usize>,
    block_ids: AHashMap<&'a str, BlockId>,
    claimed: AHashMap<String, &'a str>,
    scheduled: AHashSet<&'a str>,
    inline_stack: Vec<&'a str>,
}

impl<'a> Linearizer<'a> {
    pub fn new(flow: &'a FlowGraph, sheets: &'a SheetIndex<'a>, emitter: &'a dyn Emitter) -> Self {
        let mut sources: AHashMap<&'a str, AHashSet<&'a str>> = AHashMap::new();
        for conn in &flow.connections {
            sources
                .entry(conn.target.as_str())
                .or_default()
                .insert(conn.source.as_str());
        }
        let predecessors = sources
            .into_iter()
            .map(|(target, set)| (target, set.len()))
            .collect();

        Self {
            flow,
            sheets,
            emitter,
            predecessors,
            block_ids: AHashMap::new(),
            claimed: AHashMap::new(),
            scheduled: AHashSet::new(),
            inline_stack: Vec::new(),
        }
    }

    pub fn linearize(mut self) -> Result<LinearFlow, ExportError> {
        let flow = self.flow;
        let entry = flow.entry().ok_or_else(|| TraversalError::MissingEntry {
            flow_id: flow.id.clone(),
        })?;

        let mut blocks = Vec::new();
        let mut pending: Vec<&'a FlowNode> = vec![entry];
        self.scheduled.insert(entry.id.as_str());

        while let Some(node) = pending.pop() {
            let id = self.block_id(node)?;
            let anchor = self.anchor(node).unwrap_or(BlockAnchor::Convergence);
            let mut discovered = Vec::new();
            let lines = self.expand(node, &mut discovered)?;
            debug!(
                flow = %self.flow.id,
                block = %id,
                lines = lines.len(),
                "linearized block"
            );
            blocks.push(Block {
                id,
                node_id: node.id.clone(),
                anchor,
                lines,
            });
            // Reversed so the first block discovered is rendered next.
            pending.extend(discovered.into_iter().rev());
        }

        Ok(LinearFlow {
            flow_id: self.flow.id.clone(),
            flow_name: self.flow.name.clone(),
            blocks,
        })
    }

    fn anchor(&self, node: &FlowNode) -> Option<BlockAnchor> {
        match &node.data {
            NodeData::Entry => Some(BlockAnchor::Entry),
            NodeData::Dialogue(_) => Some(BlockAnchor::Dialogue),
            NodeData::Hub(_) => Some(BlockAnchor::Hub),
            NodeData::Exit(_) | NodeData::Jump(_) => None,
            _ if self.predecessors.get(node.id.as_str()).copied().unwrap_or(0) > 1 => {
                Some(BlockAnchor::Convergence)
            }
            _ => None,
        }
    }

    fn block_id(&mut self, node: &'a FlowNode) -> Result<BlockId, TraversalError> {
        if let Some(id) = self.block_ids.get(node.id.as_str()) {
            return Ok(id.clone());
        }
        let anchor = self.anchor(node).unwrap_or(BlockAnchor::Convergence);
        let raw = sanitize_identifier(&format!("{}_{}", anchor.prefix(), node.id));
        if let Some(other) = self.claimed.get(&raw) {
            return Err(TraversalError::BlockIdCollision {
                flow_id: self.flow.id.clone(),
                block_id: raw,
                first: other.to_string(),
                second: node.id.clone(),
            });
        }
        self.claimed.insert(raw.clone(), node.id.as_str());
        let id = BlockId::new(raw);
        self.block_ids.insert(node.id.as_str(), id.clone());
        Ok(id)
    }

    /// Lines for reaching `node`: a divert when it starts a block, its content otherwise.
    fn enter(
        &mut self,
        node: &'a FlowNode,
        discovered: &mut Vec<&'a FlowNode>,
    ) -> Result<Vec<Line>, ExportError> {
        if self.anchor(node).is_some() {
            return Ok(vec![self.divert_to(node, discovered)?]);
        }
        if self.inline_stack.contains(&node.id.as_str()) {
            return Err(TraversalError::UnanchoredCycle {
                flow_id: self.flow.id.clone(),
                node_id: node.id.clone(),
            }
            .into());
        }
        self.inline_stack.push(node.id.as_str());
        let lines = self.expand(node, discovered);
        self.inline_stack.pop();
        lines
    }

    fn divert_to(
        &mut self,
        node: &'a FlowNode,
        discovered: &mut Vec<&'a FlowNode>,
    ) -> Result<Line, TraversalError> {
        let id = self.block_id(node)?;
        if self.scheduled.insert(node.id.as_str()) {
            discovered.push(node);
        }
        Ok(Line::Divert(id))
    }

    /// Follows the single connection leaving `node` through `socket`.
    fn follow(
        &mut self,
        node: &'a FlowNode,
        socket: &str,
        discovered: &mut Vec<&'a FlowNode>,
    ) -> Result<Vec<Line>, ExportError> {
        let flow = self.flow;
        let connections: Vec<_> = flow.outgoing(&node.id, socket).collect();
        match connections.as_slice() {
            [] => Ok(vec![Line::End]),
            [conn] => {
                let target = flow
                    .node(&conn.target)
                    .ok_or_else(|| TraversalError::NodeNotFound {
                        flow_id: flow.id.clone(),
                        missing_node_id: conn.target.clone(),
                        source_node_id: node.id.clone(),
                    })?;
                self.enter(target, discovered)
            }
            many => Err(TraversalError::AmbiguousOutput {
                flow_id: flow.id.clone(),
                node_id: node.id.clone(),
                socket: socket.to_string(),
                count: many.len(),
            }
            .into()),
        }
    }

    /// Renders the content of `node` itself, followed by whatever comes after it.
    fn expand(
        &mut self,
        node: &'a FlowNode,
        discovered: &mut Vec<&'a FlowNode>,
    ) -> Result<Vec<Line>, ExportError> {
        let mut lines = Vec::new();
        match &node.data {
            NodeData::Entry | NodeData::Hub(_) => {
                lines.extend(self.follow(node, OUTPUT_SOCKET, discovered)?);
            }
            NodeData::Exit(_) => lines.push(Line::End),
            NodeData::Jump(jump) => {
                let flow = self.flow;
                let hub = flow
                    .hub(&jump.target_hub)
                    .ok_or_else(|| TraversalError::HubNotFound {
                        flow_id: flow.id.clone(),
                        node_id: node.id.clone(),
                        hub_id: jump.target_hub.clone(),
                    })?;
                lines.push(self.divert_to(hub, discovered)?);
            }
            NodeData::Dialogue(dialogue) => {
                if let Some(directions) = &dialogue.stage_directions {
                    let directions = strip_html(directions);
                    if !directions.is_empty() {
                        lines.push(Line::Direction(directions));
                    }
                }
                lines.push(Line::Text {
                    speaker: dialogue
                        .speaker
                        .as_deref()
                        .map(|s| self.sheets.speaker_name(s)),
                    text: strip_html(&dialogue.text),
                });

                if dialogue.responses.is_empty() {
                    lines.extend(self.follow(node, OUTPUT_SOCKET, discovered)?);
                } else {
                    for response in &dialogue.responses {
                        let condition = match &response.condition {
                            Some(c) if !c.is_empty() => {
                                Some(transpile_condition(c, self.emitter)?)
                            }
                            _ => None,
                        };
                        let mut body = Vec::new();
                        if let Some(instruction) = &response.instruction {
                            if !instruction.is_empty() {
                                body.push(Line::Action(transpile_instruction(
                                    instruction,
                                    self.emitter,
                                )?));
                            }
                        }
                        body.extend(self.follow(node, &response.id, discovered)?);
                        lines.push(Line::Choice {
                            text: strip_html(&response.text),
                            condition,
                            body,
                        });
                    }
                }
            }
            NodeData::Condition(condition) => {
                let rendered = transpile_condition(condition, self.emitter)?;
                let then = self.follow(node, TRUE_SOCKET, discovered)?;
                let otherwise = self.follow(node, FALSE_SOCKET, discovered)?;
                lines.push(Line::Conditional {
                    condition: rendered,
                    then,
                    otherwise,
                });
            }
            NodeData::Instruction(instruction) => {
                if !instruction.is_empty() {
                    lines.push(Line::Action(transpile_instruction(
                        instruction,
                        self.emitter,
                    )?));
                }
                lines.extend(self.follow(node, OUTPUT_SOCKET, discovered)?);
            }
            NodeData::Scene(scene) => {
                lines.push(Line::Scene {
                    location: scene.location.clone(),
                    description: strip_html(&scene.description),
                });
                lines.extend(self.follow(node, OUTPUT_SOCKET, discovered)?);
            }
            NodeData::Subflow(subflow) => {
                lines.push(Line::Call {
                    flow_id: subflow.flow_ref.clone(),
                });
                lines.extend(self.follow(node, OUTPUT_SOCKET, discovered)?);
            }
        }
        Ok(lines)
    }
}
