//! Dialogue System for Unity database JSON.
//!
//! Each flow becomes a conversation whose entry node is the `START` entry
//! (id 0). Responses become player entries. A condition node becomes two
//! group entries, one guarded by the condition and one by its negation, so
//! the runtime picks whichever holds. Ids are allocated in a first pass and
//! the entries built in a second one, so links can point forward.

use super::{ExportContext, encoding_error};
use crate::ast::Value;
use crate::error::ExportError;
use crate::exporter::{ExportOutput, OutputFile};
use crate::flow::{
    FALSE_SOCKET, FlowGraph, FlowNode, NodeData, OUTPUT_SOCKET, TRUE_SOCKET, VariableKind,
};
use crate::format::ExportFormat;
use crate::helpers::{IdCounter, single_line, strip_html, truncate};
use crate::transpiler::{transpile_condition, transpile_instruction};
use ahash::AHashMap;
use serde::Serialize;

const TITLE_LIMIT: usize = 40;
const PLAYER_ID: u64 = 1;
const START_ID: u64 = 0;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Database {
    version: &'static str,
    title: String,
    actors: Vec<Actor>,
    variables: Vec<Variable>,
    conversations: Vec<Conversation>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Actor {
    id: u64,
    name: String,
    is_player: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Variable {
    id: u64,
    name: String,
    #[serde(rename = "type")]
    kind: &'static str,
    initial_value: Value,
    description: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Conversation {
    id: u64,
    title: String,
    actor_id: u64,
    conversant_id: u64,
    dialogue_entries: Vec<DialogueEntry>,
}

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct DialogueEntry {
    id: u64,
    title: String,
    source_node_id: String,
    is_root: bool,
    is_group: bool,
    actor_id: u64,
    conversant_id: u64,
    menu_text: String,
    dialogue_text: String,
    description: String,
    sequence: String,
    conditions_string: String,
    user_script: String,
    outgoing_links: Vec<Link>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Link {
    origin_conversation_id: u64,
    origin_dialogue_id: u64,
    destination_conversation_id: u64,
    destination_dialogue_id: u64,
    is_connector: bool,
}

/// The entry ids allocated to one node.
enum Slots {
    Single(u64),
    Dialogue { line: u64, responses: Vec<u64> },
    Branch { on_true: u64, on_false: u64 },
}

impl Slots {
    /// The entries a link into this node must point at.
    fn entry_points(&self) -> Vec<u64> {
        match self {
            Slots::Single(id) => vec![*id],
            Slots::Dialogue { line, .. } => vec![*line],
            Slots::Branch { on_true, on_false } => vec![*on_true, *on_false],
        }
    }
}

pub(super) fn serialize(ctx: &ExportContext<'_>) -> Result<ExportOutput, ExportError> {
    let actors = Actors::collect(ctx);

    let mut variable_ids = IdCounter::starting_at(1);
    let variables = ctx
        .sheets
        .variables()
        .iter()
        .map(|var| Variable {
            id: variable_ids.next_id(),
            name: var.reference().to_string(),
            kind: match var.definition.kind {
                VariableKind::Number => "Number",
                VariableKind::Boolean => "Boolean",
                VariableKind::Text | VariableKind::Select => "Text",
            },
            initial_value: var.initial_value(),
            description: var.display_name(),
        })
        .collect();

    let mut conversation_ids = IdCounter::starting_at(1);
    let conversation_of: AHashMap<&str, u64> = ctx
        .flows
        .iter()
        .map(|flow| (flow.id.as_str(), conversation_ids.next_id()))
        .collect();

    let mut conversations = Vec::with_capacity(ctx.flows.len());
    for &flow in &ctx.flows {
        let id = conversation_of.get(flow.id.as_str()).copied().unwrap_or(0);
        let builder = ConversationBuilder {
            ctx,
            flow,
            id,
            actors: &actors,
            conversation_of: &conversation_of,
            slots: allocate(flow),
        };
        conversations.push(builder.build()?);
    }

    let database = Database {
        version: "1.0",
        title: ctx.project.name.clone(),
        actors: actors.list,
        variables,
        conversations,
    };
    let json = serde_json::to_string_pretty(&database)
        .map_err(|e| encoding_error(ExportFormat::Unity, e))?;
    Ok(ExportOutput::Single(OutputFile::new(
        format!("{}.json", ctx.project_stem()),
        json,
    )))
}

/// The player plus every speaker, in order of first appearance.
struct Actors {
    list: Vec<Actor>,
    by_speaker: AHashMap<String, u64>,
}

impl Actors {
    fn collect(ctx: &ExportContext<'_>) -> Self {
        let mut ids = IdCounter::starting_at(PLAYER_ID);
        let mut list = vec![Actor {
            id: ids.next_id(),
            name: "Player".to_string(),
            is_player: true,
        }];
        let mut by_speaker = AHashMap::new();
        for flow in &ctx.flows {
            for node in &flow.nodes {
                let NodeData::Dialogue(dialogue) = &node.data else {
                    continue;
                };
                let Some(speaker) = &dialogue.speaker else {
                    continue;
                };
                if !by_speaker.contains_key(speaker) {
                    let id = ids.next_id();
                    by_speaker.insert(speaker.clone(), id);
                    list.push(Actor {
                        id,
                        name: ctx.sheets.speaker_name(speaker),
                        is_player: false,
                    });
                }
            }
        }
        Self { list, by_speaker }
    }

    fn speaker(&self, shortcut: Option<&str>) -> Option<u64> {
        shortcut.and_then(|s| self.by_speaker.get(s).copied())
    }
}

fn allocate(flow: &FlowGraph) -> AHashMap<&str, Slots> {
    let mut ids = IdCounter::starting_at(START_ID + 1);
    let mut slots = AHashMap::new();
    for node in &flow.nodes {
        let slot = match &node.data {
            NodeData::Entry => Slots::Single(START_ID),
            NodeData::Dialogue(dialogue) => Slots::Dialogue {
                line: ids.next_id(),
                responses: dialogue.responses.iter().map(|_| ids.next_id()).collect(),
            },
            NodeData::Condition(_) => Slots::Branch {
                on_true: ids.next_id(),
                on_false: ids.next_id(),
            },
            _ => Slots::Single(ids.next_id()),
        };
        slots.insert(node.id.as_str(), slot);
    }
    slots
}

struct ConversationBuilder<'b, 'a> {
    ctx: &'b ExportContext<'a>,
    flow: &'a FlowGraph,
    id: u64,
    actors: &'b Actors,
    conversation_of: &'b AHashMap<&'a str, u64>,
    slots: AHashMap<&'a str, Slots>,
}

impl ConversationBuilder<'_, '_> {
    fn build(&self) -> Result<Conversation, ExportError> {
        let flow = self.flow;
        let conversant = flow
            .nodes
            .iter()
            .find_map(|n| match &n.data {
                NodeData::Dialogue(d) => self.actors.speaker(d.speaker.as_deref()),
                _ => None,
            })
            .unwrap_or(PLAYER_ID);

        let mut entries = Vec::new();
        for node in &flow.nodes {
            self.node_entries(node, conversant, &mut entries)?;
        }
        entries.sort_by_key(|e| e.id);

        Ok(Conversation {
            id: self.id,
            title: flow.name.clone(),
            actor_id: PLAYER_ID,
            conversant_id: conversant,
            dialogue_entries: entries,
        })
    }

    fn link(&self, from: u64, to: u64) -> Link {
        Link {
            origin_conversation_id: self.id,
            origin_dialogue_id: from,
            destination_conversation_id: self.id,
            destination_dialogue_id: to,
            is_connector: false,
        }
    }

    /// Links from entry `from` to everything connected to `socket` of `node`.
    fn links(&self, node: &FlowNode, socket: &str, from: u64) -> Vec<Link> {
        self.flow
            .outgoing(&node.id, socket)
            .filter_map(|conn| self.slots.get(conn.target.as_str()))
            .flat_map(|slot| slot.entry_points())
            .map(|to| self.link(from, to))
            .collect()
    }

    fn group(&self, node: &FlowNode, id: u64, title: &str) -> DialogueEntry {
        DialogueEntry {
            id,
            title: title.to_string(),
            source_node_id: node.id.clone(),
            is_group: true,
            actor_id: PLAYER_ID,
            conversant_id: PLAYER_ID,
            ..Default::default()
        }
    }

    fn node_entries(
        &self,
        node: &FlowNode,
        conversant: u64,
        out: &mut Vec<DialogueEntry>,
    ) -> Result<(), ExportError> {
        let Some(slot) = self.slots.get(node.id.as_str()) else {
            return Ok(());
        };
        let emitter = self.ctx.emitter;

        match (&node.data, slot) {
            (NodeData::Dialogue(dialogue), Slots::Dialogue { line, responses }) => {
                let speaker = self
                    .actors
                    .speaker(dialogue.speaker.as_deref())
                    .unwrap_or(conversant);
                let text = strip_html(&dialogue.text);
                let mut entry = DialogueEntry {
                    id: *line,
                    title: truncate(&single_line(&text), TITLE_LIMIT),
                    source_node_id: node.id.clone(),
                    actor_id: speaker,
                    conversant_id: PLAYER_ID,
                    menu_text: dialogue
                        .menu_text
                        .as_deref()
                        .map(strip_html)
                        .unwrap_or_default(),
                    dialogue_text: text,
                    description: dialogue
                        .stage_directions
                        .as_deref()
                        .map(strip_html)
                        .unwrap_or_default(),
                    ..Default::default()
                };
                if dialogue.responses.is_empty() {
                    entry.outgoing_links = self.links(node, OUTPUT_SOCKET, *line);
                } else {
                    entry.outgoing_links =
                        responses.iter().map(|to| self.link(*line, *to)).collect();
                }
                out.push(entry);

                for (response, id) in dialogue.responses.iter().zip(responses) {
                    let text = strip_html(&response.text);
                    let conditions_string = match &response.condition {
                        Some(c) if !c.is_empty() => transpile_condition(c, emitter)?,
                        _ => String::new(),
                    };
                    let user_script = match &response.instruction {
                        Some(i) if !i.is_empty() => transpile_instruction(i, emitter)?,
                        _ => String::new(),
                    };
                    out.push(DialogueEntry {
                        id: *id,
                        title: truncate(&single_line(&text), TITLE_LIMIT),
                        source_node_id: format!("{}:{}", node.id, response.id),
                        actor_id: PLAYER_ID,
                        conversant_id: speaker,
                        menu_text: text.clone(),
                        dialogue_text: text,
                        conditions_string,
                        user_script,
                        outgoing_links: self.links(node, &response.id, *id),
                        ..Default::default()
                    });
                }
            }
            (NodeData::Condition(condition), Slots::Branch { on_true, on_false }) => {
                let rendered = transpile_condition(condition, emitter)?;
                let mut yes = self.group(node, *on_true, "Condition (true)");
                yes.conditions_string = rendered.clone();
                yes.outgoing_links = self.links(node, TRUE_SOCKET, *on_true);
                out.push(yes);

                let mut no = self.group(node, *on_false, "Condition (false)");
                no.conditions_string = format!("{}({})", emitter.negation(), rendered);
                no.outgoing_links = self.links(node, FALSE_SOCKET, *on_false);
                out.push(no);
            }
            (data, Slots::Single(id)) => {
                let mut entry = match data {
                    NodeData::Entry => {
                        let mut start = self.group(node, *id, "START");
                        start.is_root = true;
                        start.is_group = false;
                        start.sequence = "None()".to_string();
                        start
                    }
                    NodeData::Exit(exit) => {
                        self.group(node, *id, exit.label.as_deref().unwrap_or("End"))
                    }
                    NodeData::Hub(hub) => self.group(node, *id, &format!("Hub {}", hub.hub_id)),
                    NodeData::Jump(jump) => {
                        let mut entry = self.group(node, *id, &format!("Jump {}", jump.target_hub));
                        if let Some(hub) = self.flow.hub(&jump.target_hub) {
                            entry.outgoing_links = self
                                .slots
                                .get(hub.id.as_str())
                                .map(Slots::entry_points)
                                .unwrap_or_default()
                                .into_iter()
                                .map(|to| self.link(*id, to))
                                .collect();
                        }
                        entry
                    }
                    NodeData::Instruction(instruction) => {
                        let mut entry = self.group(node, *id, "Instruction");
                        entry.user_script = transpile_instruction(instruction, emitter)?;
                        entry
                    }
                    NodeData::Scene(scene) => {
                        let description = strip_html(&scene.description);
                        let mut entry = self.group(node, *id, "Scene");
                        entry.is_group = false;
                        entry.title = truncate(&single_line(&description), TITLE_LIMIT);
                        entry.dialogue_text = description;
                        if let Some(location) = &scene.location {
                            entry.sequence = format!("LoadLevel({})", location);
                        }
                        entry
                    }
                    NodeData::Subflow(subflow) => {
                        let mut entry =
                            self.group(node, *id, &format!("Subflow {}", subflow.flow_ref));
                        if let Some(target) = self.conversation_of.get(subflow.flow_ref.as_str()) {
                            entry.outgoing_links.push(Link {
                                origin_conversation_id: self.id,
                                origin_dialogue_id: *id,
                                destination_conversation_id: *target,
                                destination_dialogue_id: START_ID,
                                is_connector: true,
                            });
                        }
                        entry
                    }
                    // Dialogue and condition nodes always get their own slot shapes.
                    NodeData::Dialogue(_) | NodeData::Condition(_) => return Ok(()),
                };
                if matches!(
                    data,
                    NodeData::Entry
                        | NodeData::Hub(_)
                        | NodeData::Instruction(_)
                        | NodeData::Scene(_)
                        | NodeData::Subflow(_)
                ) {
                    entry.outgoing_links.extend(self.links(node, OUTPUT_SOCKET, *id));
                }
                out.push(entry);
            }
            _ => {}
        }
        Ok(())
    }
}
