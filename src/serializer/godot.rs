//! A node/edge JSON document for a dialogue interpreter written in GDScript.

use super::{ExportContext, encoding_error};
use crate::ast::Value;
use crate::error::ExportError;
use crate::exporter::{ExportOutput, OutputFile};
use crate::flow::{FALSE_SOCKET, FlowGraph, FlowNode, NodeData, OUTPUT_SOCKET, TRUE_SOCKET};
use crate::format::ExportFormat;
use crate::helpers::{IdCounter, strip_html};
use crate::transpiler::{transpile_condition, transpile_instruction};
use ahash::AHashMap;
use serde::Serialize;
use serde_json::{Map, json};

const DOCUMENT_FORMAT: &str = "kataribe-godot";
const DOCUMENT_VERSION: u32 = 1;

#[derive(Serialize)]
struct Document {
    format: &'static str,
    version: u32,
    project: String,
    variables: Vec<Variable>,
    flows: Vec<Flow>,
}

#[derive(Serialize)]
struct Variable {
    name: String,
    sheet: String,
    variable: String,
    #[serde(rename = "type")]
    kind: &'static str,
    default: Value,
}

#[derive(Serialize)]
struct Flow {
    id: String,
    name: String,
    start: Option<u64>,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

#[derive(Serialize)]
struct Node {
    id: u64,
    source_id: String,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(flatten)]
    fields: Map<String, serde_json::Value>,
    next: Option<u64>,
}

#[derive(Serialize)]
struct Edge {
    from: u64,
    from_port: String,
    to: u64,
}

pub(super) fn serialize(ctx: &ExportContext<'_>) -> Result<ExportOutput, ExportError> {
    let variables = ctx
        .sheets
        .variables()
        .iter()
        .map(|var| Variable {
            name: var.reference().to_string(),
            sheet: var.sheet.shortcut.clone(),
            variable: var.definition.name.clone(),
            kind: var.definition.kind.as_str(),
            default: var.initial_value(),
        })
        .collect();

    // One counter for the whole document keeps node ids unique across flows.
    let mut ids = IdCounter::starting_at(1);
    let mut flows = Vec::with_capacity(ctx.flows.len());
    for &flow in &ctx.flows {
        let node_ids: AHashMap<&str, u64> = flow
            .nodes
            .iter()
            .map(|n| (n.id.as_str(), ids.next_id()))
            .collect();
        flows.push(build_flow(ctx, flow, &node_ids)?);
    }

    let document = Document {
        format: DOCUMENT_FORMAT,
        version: DOCUMENT_VERSION,
        project: ctx.project.name.clone(),
        variables,
        flows,
    };
    let json = serde_json::to_string_pretty(&document)
        .map_err(|e| encoding_error(ExportFormat::Godot, e))?;
    Ok(ExportOutput::Single(OutputFile::new(
        format!("{}.json", ctx.project_stem()),
        json,
    )))
}

fn build_flow(
    ctx: &ExportContext<'_>,
    flow: &FlowGraph,
    node_ids: &AHashMap<&str, u64>,
) -> Result<Flow, ExportError> {
    let next = |node: &FlowNode, socket: &str| -> Option<u64> {
        flow.outgoing(&node.id, socket)
            .find_map(|c| node_ids.get(c.target.as_str()).copied())
    };

    let mut nodes = Vec::with_capacity(flow.nodes.len());
    for node in &flow.nodes {
        let Some(&id) = node_ids.get(node.id.as_str()) else {
            continue;
        };
        let mut fields = Map::new();
        let mut follow = next(node, OUTPUT_SOCKET);

        match &node.data {
            NodeData::Entry => {}
            NodeData::Exit(exit) => {
                fields.insert("label".into(), json!(exit.label));
            }
            NodeData::Dialogue(dialogue) => {
                fields.insert("speaker".into(), json!(dialogue.speaker));
                fields.insert(
                    "speaker_name".into(),
                    json!(
                        dialogue
                            .speaker
                            .as_deref()
                            .map(|s| ctx.sheets.speaker_name(s))
                    ),
                );
                fields.insert("text".into(), json!(strip_html(&dialogue.text)));
                fields.insert(
                    "stage_directions".into(),
                    json!(dialogue.stage_directions.as_deref().map(strip_html)),
                );
                fields.insert(
                    "menu_text".into(),
                    json!(dialogue.menu_text.as_deref().map(strip_html)),
                );
                let mut responses = Vec::with_capacity(dialogue.responses.len());
                for response in &dialogue.responses {
                    let condition = match &response.condition {
                        Some(c) if !c.is_empty() => Some(transpile_condition(c, ctx.emitter)?),
                        _ => None,
                    };
                    let instruction = match &response.instruction {
                        Some(i) if !i.is_empty() => Some(transpile_instruction(i, ctx.emitter)?),
                        _ => None,
                    };
                    responses.push(json!({
                        "id": response.id,
                        "text": strip_html(&response.text),
                        "condition": condition,
                        "instruction": instruction,
                        "next": next(node, &response.id),
                    }));
                }
                fields.insert("responses".into(), json!(responses));
            }
            NodeData::Hub(hub) => {
                fields.insert("hub_id".into(), json!(hub.hub_id));
            }
            NodeData::Jump(jump) => {
                fields.insert("target_hub".into(), json!(jump.target_hub));
                follow = flow
                    .hub(&jump.target_hub)
                    .and_then(|hub| node_ids.get(hub.id.as_str()).copied());
            }
            NodeData::Condition(condition) => {
                fields.insert(
                    "condition".into(),
                    json!(transpile_condition(condition, ctx.emitter)?),
                );
                fields.insert("true_next".into(), json!(next(node, TRUE_SOCKET)));
                fields.insert("false_next".into(), json!(next(node, FALSE_SOCKET)));
                follow = None;
            }
            NodeData::Instruction(instruction) => {
                fields.insert(
                    "instruction".into(),
                    json!(transpile_instruction(instruction, ctx.emitter)?),
                );
            }
            NodeData::Scene(scene) => {
                fields.insert("location".into(), json!(scene.location));
                fields.insert("description".into(), json!(strip_html(&scene.description)));
            }
            NodeData::Subflow(subflow) => {
                fields.insert("flow".into(), json!(subflow.flow_ref));
            }
        }

        nodes.push(Node {
            id,
            source_id: node.id.clone(),
            kind: node.kind().as_str(),
            fields,
            next: follow,
        });
    }

    let edges = flow
        .connections
        .iter()
        .filter_map(|conn| {
            Some(Edge {
                from: node_ids.get(conn.source.as_str()).copied()?,
                from_port: conn.source_socket.clone(),
                to: node_ids.get(conn.target.as_str()).copied()?,
            })
        })
        .collect();

    Ok(Flow {
        id: flow.id.clone(),
        name: flow.name.clone(),
        start: flow
            .entry()
            .and_then(|entry| node_ids.get(entry.id.as_str()).copied()),
        nodes,
        edges,
    })
}
