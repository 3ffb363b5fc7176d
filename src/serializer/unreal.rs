//! Unreal DataTable CSVs: dialogue lines, player responses and variables.
//!
//! Row names are the DataTable keys, so every reference between rows
//! (`Next`, `DialogueRow`) uses them. Multiple successors are joined with `|`.

use super::ExportContext;
use crate::error::ExportError;
use crate::exporter::{ExportOutput, OutputFile};
use crate::flow::{FALSE_SOCKET, FlowGraph, FlowNode, NodeData, OUTPUT_SOCKET, TRUE_SOCKET};
use crate::helpers::{CsvTable, sanitize_identifier, single_line, strip_html, truncate};
use crate::transpiler::{transpile_condition, transpile_instruction};
use itertools::Itertools;

const DESCRIPTION_LIMIT: usize = 64;

const LINE_COLUMNS: [&str; 14] = [
    "Name",
    "FlowId",
    "NodeId",
    "NodeType",
    "Speaker",
    "Text",
    "StageDirections",
    "Location",
    "Subflow",
    "Condition",
    "Action",
    "Next",
    "NextOnFalse",
    "Description",
];

const RESPONSE_COLUMNS: [&str; 8] = [
    "Name",
    "DialogueRow",
    "ResponseId",
    "Order",
    "Text",
    "Condition",
    "Action",
    "Next",
];

const VARIABLE_COLUMNS: [&str; 6] = [
    "Name",
    "Sheet",
    "Variable",
    "Type",
    "DefaultValue",
    "Description",
];

pub(super) fn serialize(ctx: &ExportContext<'_>) -> Result<ExportOutput, ExportError> {
    let mut lines = CsvTable::new(&LINE_COLUMNS);
    let mut responses = CsvTable::new(&RESPONSE_COLUMNS);
    for &flow in &ctx.flows {
        for node in &flow.nodes {
            write_node(ctx, flow, node, &mut lines, &mut responses)?;
        }
    }

    let mut variables = CsvTable::new(&VARIABLE_COLUMNS);
    for var in ctx.sheets.variables() {
        variables.push_row([
            var.reference().to_string(),
            var.sheet.shortcut.clone(),
            var.definition.name.clone(),
            var.definition.kind.as_str().to_string(),
            var.initial_value().to_string(),
            truncate(&var.display_name(), DESCRIPTION_LIMIT),
        ]);
    }

    Ok(ExportOutput::Files(vec![
        OutputFile::new("DT_DialogueLines.csv", lines.finish()),
        OutputFile::new("DT_DialogueResponses.csv", responses.finish()),
        OutputFile::new("DT_Variables.csv", variables.finish()),
    ]))
}

fn row_name(flow: &FlowGraph, node_id: &str) -> String {
    sanitize_identifier(&format!("{}_{}", flow.id, node_id))
}

/// Row names of every node connected to `socket`, joined with `|`.
fn successors(flow: &FlowGraph, node: &FlowNode, socket: &str) -> String {
    flow.outgoing(&node.id, socket)
        .map(|c| row_name(flow, &c.target))
        .join("|")
}

fn write_node(
    ctx: &ExportContext<'_>,
    flow: &FlowGraph,
    node: &FlowNode,
    lines: &mut CsvTable,
    responses: &mut CsvTable,
) -> Result<(), ExportError> {
    let name = row_name(flow, &node.id);
    let mut speaker = String::new();
    let mut text = String::new();
    let mut directions = String::new();
    let mut location = String::new();
    let mut subflow = String::new();
    let mut condition = String::new();
    let mut action = String::new();
    let mut next = successors(flow, node, OUTPUT_SOCKET);
    let mut next_on_false = String::new();

    match &node.data {
        NodeData::Entry => {}
        NodeData::Exit(exit) => text = exit.label.clone().unwrap_or_default(),
        NodeData::Dialogue(dialogue) => {
            speaker = dialogue
                .speaker
                .as_deref()
                .map(|s| ctx.sheets.speaker_name(s))
                .unwrap_or_default();
            text = strip_html(&dialogue.text);
            directions = dialogue
                .stage_directions
                .as_deref()
                .map(strip_html)
                .unwrap_or_default();
            for (order, response) in dialogue.responses.iter().enumerate() {
                let response_condition = match &response.condition {
                    Some(c) if !c.is_empty() => transpile_condition(c, ctx.emitter)?,
                    _ => String::new(),
                };
                let response_action = match &response.instruction {
                    Some(i) if !i.is_empty() => transpile_instruction(i, ctx.emitter)?,
                    _ => String::new(),
                };
                responses.push_row([
                    sanitize_identifier(&format!("{}_{}", name, response.id)),
                    name.clone(),
                    response.id.clone(),
                    order.to_string(),
                    strip_html(&response.text),
                    response_condition,
                    response_action,
                    successors(flow, node, &response.id),
                ]);
            }
        }
        NodeData::Hub(hub) => text = hub.hub_id.clone(),
        NodeData::Jump(jump) => {
            next = flow
                .hub(&jump.target_hub)
                .map(|hub| row_name(flow, &hub.id))
                .unwrap_or_default();
        }
        NodeData::Condition(c) => {
            condition = transpile_condition(c, ctx.emitter)?;
            next = successors(flow, node, TRUE_SOCKET);
            next_on_false = successors(flow, node, FALSE_SOCKET);
        }
        NodeData::Instruction(i) => action = transpile_instruction(i, ctx.emitter)?,
        NodeData::Scene(scene) => {
            location = scene.location.clone().unwrap_or_default();
            text = strip_html(&scene.description);
        }
        NodeData::Subflow(s) => subflow = s.flow_ref.clone(),
    }

    let description = truncate(&single_line(&text), DESCRIPTION_LIMIT);
    lines.push_row([
        name,
        flow.id.clone(),
        node.id.clone(),
        node.kind().as_str().to_string(),
        speaker,
        text,
        directions,
        location,
        subflow,
        condition,
        action,
        next,
        next_on_false,
        description,
    ]);
    Ok(())
}
