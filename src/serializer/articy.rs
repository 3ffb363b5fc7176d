//! articy:draft-style XML.
//!
//! Every flow is a flow fragment holding one object per node and per player
//! response. Objects talk through pins: input pins carry conditions, output
//! pins carry instructions. Ids and pins are allocated up front, then the
//! document is written in a single pass.

use super::ExportContext;
use crate::ast::Value;
use crate::error::ExportError;
use crate::exporter::{ExportOutput, OutputFile};
use crate::flow::{FlowGraph, FlowNode, NodeData, NodeKind, OUTPUT_SOCKET, VariableKind};
use crate::helpers::{IdCounter, XmlWriter, sanitize_identifier, single_line, strip_html, truncate};
use crate::transpiler::{transpile_condition, transpile_instruction};
use ahash::AHashMap;
use itertools::Itertools;
use tracing::warn;

const NAME_LIMIT: usize = 64;
/// First object id handed out; articy ids are 64-bit and never zero.
const ID_SEED: u64 = 0x0100_0000_0000_0001;

fn hex(id: u64) -> String {
    format!("0x{:016X}", id)
}

/// Ids of one articy object and its pins.
struct ObjectIds {
    object: u64,
    input: Option<u64>,
    /// `(socket, pin)` in socket order.
    outputs: Vec<(String, u64)>,
}

impl ObjectIds {
    fn allocate(ids: &mut IdCounter, has_input: bool, sockets: &[&str]) -> Self {
        Self {
            object: ids.next_id(),
            input: has_input.then(|| ids.next_id()),
            outputs: sockets
                .iter()
                .map(|s| (s.to_string(), ids.next_id()))
                .collect(),
        }
    }

    fn output(&self, socket: &str) -> Option<u64> {
        self.outputs
            .iter()
            .find(|(s, _)| s == socket)
            .map(|(_, pin)| *pin)
    }
}

/// Ids for one flow: the fragment, each node, and each response.
struct FlowIds<'a> {
    fragment: u64,
    nodes: AHashMap<&'a str, ObjectIds>,
    responses: AHashMap<(&'a str, &'a str), ObjectIds>,
    connections: Vec<u64>,
}

struct Allocation<'a> {
    entities: Vec<(&'a str, u64)>,
    flows: Vec<FlowIds<'a>>,
}

impl<'a> Allocation<'a> {
    fn new(ctx: &ExportContext<'a>) -> Self {
        let mut ids = IdCounter::starting_at(ID_SEED);

        let mut entities: Vec<(&'a str, u64)> = Vec::new();
        for &flow in &ctx.flows {
            for node in &flow.nodes {
                if let NodeData::Dialogue(d) = &node.data {
                    if let Some(speaker) = d.speaker.as_deref() {
                        if !entities.iter().any(|(s, _)| *s == speaker) {
                            entities.push((speaker, ids.next_id()));
                        }
                    }
                }
            }
        }

        let mut flows = Vec::with_capacity(ctx.flows.len());
        for &flow in &ctx.flows {
            let fragment = ids.next_id();
            let mut nodes = AHashMap::new();
            let mut responses = AHashMap::new();
            for node in &flow.nodes {
                match &node.data {
                    NodeData::Dialogue(d) if !d.responses.is_empty() => {
                        nodes.insert(
                            node.id.as_str(),
                            ObjectIds::allocate(&mut ids, true, &[OUTPUT_SOCKET]),
                        );
                        for response in &d.responses {
                            responses.insert(
                                (node.id.as_str(), response.id.as_str()),
                                ObjectIds::allocate(&mut ids, true, &[OUTPUT_SOCKET]),
                            );
                        }
                    }
                    _ => {
                        nodes.insert(
                            node.id.as_str(),
                            ObjectIds::allocate(&mut ids, node.has_input(), &node.output_sockets()),
                        );
                    }
                }
            }
            let fan_out: usize = flow
                .nodes
                .iter()
                .map(|n| match &n.data {
                    NodeData::Dialogue(d) => d.responses.len(),
                    _ => 0,
                })
                .sum();
            let connections = (0..flow.connections.len() + fan_out)
                .map(|_| ids.next_id())
                .collect();
            flows.push(FlowIds {
                fragment,
                nodes,
                responses,
                connections,
            });
        }

        Self { entities, flows }
    }

    fn entity(&self, speaker: &str) -> Option<u64> {
        self.entities
            .iter()
            .find(|(s, _)| *s == speaker)
            .map(|(_, id)| *id)
    }

    fn fragment(&self, ctx: &ExportContext<'_>, flow_id: &str) -> Option<u64> {
        ctx.flows
            .iter()
            .position(|f| f.id == flow_id)
            .and_then(|i| self.flows.get(i))
            .map(|f| f.fragment)
    }
}

pub(super) fn serialize(ctx: &ExportContext<'_>) -> Result<ExportOutput, ExportError> {
    let allocation = Allocation::new(ctx);
    let mut xml = XmlWriter::new();
    xml.open("ArticyData", &[("Version", "1")]);
    xml.empty(
        "Project",
        &[
            ("Name", ctx.project.name.as_str()),
            ("TechnicalName", ctx.project_stem().as_str()),
        ],
    );

    write_variables(ctx, &mut xml);

    xml.open("Entities", &[]);
    for (shortcut, id) in &allocation.entities {
        let display = truncate(&ctx.sheets.speaker_name(shortcut), NAME_LIMIT);
        xml.empty(
            "Entity",
            &[
                ("Id", hex(*id).as_str()),
                ("TechnicalName", sanitize_identifier(shortcut).as_str()),
                ("DisplayName", display.as_str()),
            ],
        );
    }
    xml.close();

    xml.open("Flow", &[]);
    for (flow, ids) in ctx.flows.iter().zip(&allocation.flows) {
        write_flow(ctx, &allocation, flow, ids, &mut xml)?;
    }
    xml.close();

    Ok(ExportOutput::Single(OutputFile::new(
        format!("{}.xml", ctx.project_stem()),
        xml.finish(),
    )))
}

fn write_variables(ctx: &ExportContext<'_>, xml: &mut XmlWriter) {
    xml.open("GlobalVariables", &[]);
    let namespaces = ctx
        .sheets
        .variables()
        .iter()
        .chunk_by(|var| var.sheet.shortcut.clone());
    for (shortcut, group) in &namespaces {
        let mut group = group.peekable();
        let description = group
            .peek()
            .map(|var| var.sheet.name.clone())
            .unwrap_or_default();
        xml.open(
            "Namespace",
            &[("Name", shortcut.as_str()), ("Description", description.as_str())],
        );
        for var in group {
            let kind = match var.definition.kind {
                VariableKind::Number => "Integer",
                VariableKind::Boolean => "Boolean",
                VariableKind::Text | VariableKind::Select => "String",
            };
            let value = match var.initial_value() {
                // articy number variables are integers; fractional defaults round.
                Value::Number(n) if n.fract() != 0.0 => {
                    warn!(
                        variable = %var.reference(),
                        default = n,
                        "rounding fractional default for an integer variable"
                    );
                    Value::Number(n.round()).to_string()
                }
                other => other.to_string(),
            };
            let description = truncate(&var.display_name(), NAME_LIMIT);
            xml.empty(
                "Variable",
                &[
                    ("Name", var.definition.name.as_str()),
                    ("Type", kind),
                    ("Value", value.as_str()),
                    ("Description", description.as_str()),
                ],
            );
        }
        xml.close();
    }
    xml.close();
}

fn element_name(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Entry | NodeKind::Exit | NodeKind::Hub => "Hub",
        NodeKind::Dialogue => "DialogueFragment",
        NodeKind::Jump => "Jump",
        NodeKind::Condition => "Condition",
        NodeKind::Instruction => "Instruction",
        NodeKind::Scene | NodeKind::Subflow => "FlowFragment",
    }
}

/// Writes the `<Pins>` block. `input_expr` and `output_expr` are attached to every pin of their side.
fn write_pins(
    xml: &mut XmlWriter,
    ids: &ObjectIds,
    input_expr: Option<&str>,
    output_expr: Option<&str>,
) {
    xml.open("Pins", &[]);
    if let Some(pin) = ids.input {
        write_pin(xml, pin, "Input", None, input_expr);
    }
    for (index, (_, pin)) in ids.outputs.iter().enumerate() {
        write_pin(xml, *pin, "Output", Some(index), output_expr);
    }
    xml.close();
}

fn write_pin(
    xml: &mut XmlWriter,
    pin: u64,
    semantic: &str,
    index: Option<usize>,
    expression: Option<&str>,
) {
    let id = hex(pin);
    let index = index.map(|i| i.to_string());
    let mut attrs = vec![("Id", id.as_str()), ("Semantic", semantic)];
    if let Some(index) = &index {
        attrs.push(("Index", index.as_str()));
    }
    match expression {
        Some(expr) if !expr.is_empty() => {
            xml.open("Pin", &attrs);
            xml.text_element("Expression", &[], expr);
            xml.close();
        }
        _ => xml.empty("Pin", &attrs),
    }
}

fn write_flow(
    ctx: &ExportContext<'_>,
    allocation: &Allocation<'_>,
    flow: &FlowGraph,
    ids: &FlowIds<'_>,
    xml: &mut XmlWriter,
) -> Result<(), ExportError> {
    let fragment = hex(ids.fragment);
    let display = truncate(&single_line(&flow.name), NAME_LIMIT);
    let technical = sanitize_identifier(&flow.id);
    xml.open(
        "FlowFragment",
        &[
            ("Id", fragment.as_str()),
            ("TechnicalName", technical.as_str()),
            ("DisplayName", display.as_str()),
        ],
    );

    xml.open("Children", &[]);
    for node in &flow.nodes {
        if let Some(object) = ids.nodes.get(node.id.as_str()) {
            write_node(ctx, allocation, flow, ids, node, object, xml)?;
        }
    }
    xml.close();

    xml.open("Connections", &[]);
    let mut connection_ids = ids.connections.iter();
    let mut write_connection = |xml: &mut XmlWriter, source: &ObjectIds, pin: u64, target: &ObjectIds| {
        let (Some(id), Some(target_pin)) = (connection_ids.next(), target.input) else {
            return;
        };
        xml.empty(
            "Connection",
            &[
                ("Id", hex(*id).as_str()),
                ("Source", hex(source.object).as_str()),
                ("SourcePin", hex(pin).as_str()),
                ("Target", hex(target.object).as_str()),
                ("TargetPin", hex(target_pin).as_str()),
            ],
        );
    };

    // Dialogue output pins fan out to their response objects first.
    for node in &flow.nodes {
        let NodeData::Dialogue(d) = &node.data else {
            continue;
        };
        let Some(source) = ids.nodes.get(node.id.as_str()) else {
            continue;
        };
        let Some(pin) = source.output(OUTPUT_SOCKET) else {
            continue;
        };
        for response in &d.responses {
            if let Some(target) = ids.responses.get(&(node.id.as_str(), response.id.as_str())) {
                write_connection(&mut *xml, source, pin, target);
            }
        }
    }

    for conn in &flow.connections {
        let from_response = ids
            .responses
            .get(&(conn.source.as_str(), conn.source_socket.as_str()));
        let source = from_response.or_else(|| ids.nodes.get(conn.source.as_str()));
        let socket = if from_response.is_some() {
            OUTPUT_SOCKET
        } else {
            conn.source_socket.as_str()
        };
        let (Some(source), Some(target)) = (source, ids.nodes.get(conn.target.as_str())) else {
            continue;
        };
        if let Some(pin) = source.output(socket) {
            write_connection(&mut *xml, source, pin, target);
        }
    }
    xml.close();

    xml.close();
    Ok(())
}

fn write_node(
    ctx: &ExportContext<'_>,
    allocation: &Allocation<'_>,
    flow: &FlowGraph,
    ids: &FlowIds<'_>,
    node: &FlowNode,
    object: &ObjectIds,
    xml: &mut XmlWriter,
) -> Result<(), ExportError> {
    let technical = sanitize_identifier(&format!("{}_{}", flow.id, node.id));
    let kind = node.kind();
    let mut attrs = vec![
        ("Id", hex(object.object)),
        ("TechnicalName", technical),
        ("Kind", kind.as_str().to_string()),
    ];
    let mut properties: Vec<(&str, String)> = Vec::new();
    let mut output_expr = None;

    match &node.data {
        NodeData::Entry => attrs.push(("DisplayName", "Start".to_string())),
        NodeData::Exit(exit) => attrs.push((
            "DisplayName",
            truncate(exit.label.as_deref().unwrap_or("End"), NAME_LIMIT),
        )),
        NodeData::Dialogue(d) => {
            let text = strip_html(&d.text);
            attrs.push(("DisplayName", truncate(&single_line(&text), NAME_LIMIT)));
            if let Some(entity) = d.speaker.as_deref().and_then(|s| allocation.entity(s)) {
                attrs.push(("Speaker", hex(entity)));
            }
            properties.push(("Text", text));
            if let Some(menu) = &d.menu_text {
                properties.push(("MenuText", strip_html(menu)));
            }
            if let Some(directions) = &d.stage_directions {
                properties.push(("StageDirections", strip_html(directions)));
            }
        }
        NodeData::Hub(hub) => attrs.push(("DisplayName", truncate(&hub.hub_id, NAME_LIMIT))),
        NodeData::Jump(jump) => {
            attrs.push(("DisplayName", truncate(&jump.target_hub, NAME_LIMIT)));
            if let Some(hub) = flow.hub(&jump.target_hub) {
                if let Some(target) = ids.nodes.get(hub.id.as_str()) {
                    attrs.push(("Target", hex(target.object)));
                    if let Some(pin) = target.input {
                        attrs.push(("TargetPin", hex(pin)));
                    }
                }
            }
        }
        NodeData::Condition(condition) => {
            properties.push(("Expression", transpile_condition(condition, ctx.emitter)?));
        }
        NodeData::Instruction(instruction) => {
            let rendered = transpile_instruction(instruction, ctx.emitter)?;
            properties.push(("Expression", rendered.clone()));
            output_expr = Some(rendered);
        }
        NodeData::Scene(scene) => {
            let description = strip_html(&scene.description);
            let display = scene
                .location
                .clone()
                .unwrap_or_else(|| single_line(&description));
            attrs.push(("DisplayName", truncate(&display, NAME_LIMIT)));
            properties.push(("Text", description));
        }
        NodeData::Subflow(subflow) => {
            attrs.push(("DisplayName", truncate(&subflow.flow_ref, NAME_LIMIT)));
            if let Some(target) = allocation.fragment(ctx, &subflow.flow_ref) {
                attrs.push(("Reference", hex(target)));
            }
        }
    }

    let attr_refs: Vec<(&str, &str)> = attrs.iter().map(|(k, v)| (*k, v.as_str())).collect();
    let element = element_name(kind);
    xml.open(element, &attr_refs);
    if !properties.is_empty() {
        xml.open("Properties", &[]);
        for (name, value) in &properties {
            xml.text_element(name, &[], value);
        }
        xml.close();
    }
    write_pins(xml, object, None, output_expr.as_deref());
    xml.close();

    if let NodeData::Dialogue(d) = &node.data {
        for response in &d.responses {
            let Some(response_ids) = ids.responses.get(&(node.id.as_str(), response.id.as_str()))
            else {
                continue;
            };
            let condition = match &response.condition {
                Some(c) if !c.is_empty() => Some(transpile_condition(c, ctx.emitter)?),
                _ => None,
            };
            let instruction = match &response.instruction {
                Some(i) if !i.is_empty() => Some(transpile_instruction(i, ctx.emitter)?),
                _ => None,
            };
            let text = strip_html(&response.text);
            let display = truncate(&single_line(&text), NAME_LIMIT);
            let technical = sanitize_identifier(&format!("{}_{}_{}", flow.id, node.id, response.id));
            let response_id = hex(response_ids.object);
            xml.open(
                "DialogueFragment",
                &[
                    ("Id", response_id.as_str()),
                    ("TechnicalName", technical.as_str()),
                    ("Kind", "response"),
                    ("DisplayName", display.as_str()),
                ],
            );
            xml.open("Properties", &[]);
            xml.text_element("Text", &[], &text);
            xml.close();
            write_pins(xml, response_ids, condition.as_deref(), instruction.as_deref());
            xml.close();
        }
    }
    Ok(())
}
