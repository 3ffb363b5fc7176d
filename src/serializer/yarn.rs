use super::{ExportContext, called_flows, flow_file_stems, unique_names};
use crate::error::ExportError;
use crate::exporter::{ExportOutput, OutputFile};
use crate::helpers::{sanitize_identifier, single_line};
use crate::linearizer::{BlockId, LinearFlow, Line};
use ahash::AHashMap;
use std::fmt::Write;

const INDENT: &str = "    ";
const VARIABLES_STEM: &str = "variables";
const VARIABLES_TITLE: &str = "Variables";

pub(super) fn serialize(
    ctx: &ExportContext<'_>,
    flows: &[LinearFlow],
) -> Result<ExportOutput, ExportError> {
    let titles = Titles::new(flows);
    let called = called_flows(ctx);

    let mut files = Vec::with_capacity(flows.len() + 1);
    files.push(OutputFile::new(
        format!("{}.yarn", VARIABLES_STEM),
        variables_file(ctx)?,
    ));
    let stems = flow_file_stems(flows, VARIABLES_STEM);
    for (flow, stem) in flows.iter().zip(&stems) {
        let writer = BlockWriter {
            flow_id: &flow.flow_id,
            titles: &titles,
            // Detoured flows hand control back to the node that called them.
            end: if called.contains(flow.flow_id.as_str()) {
                "<<return>>"
            } else {
                "<<stop>>"
            },
        };
        files.push(OutputFile::new(
            format!("{}.yarn", stem),
            writer.flow_file(ctx, flow),
        ));
    }
    Ok(ExportOutput::Files(files))
}

/// Node titles for every block in scope, unique across all files of the export.
struct Titles<'f> {
    names: AHashMap<(&'f str, &'f str), String>,
    entries: AHashMap<&'f str, String>,
}

impl<'f> Titles<'f> {
    fn new(flows: &'f [LinearFlow]) -> Self {
        let keys: Vec<(&str, &str)> = flows
            .iter()
            .flat_map(|flow| {
                flow.blocks
                    .iter()
                    .map(move |block| (flow.flow_id.as_str(), block.id.as_str()))
            })
            .collect();
        let raw: Vec<String> = keys
            .iter()
            .map(|(flow_id, block)| format!("{}_{}", flow_id, block))
            .collect();
        let unique = unique_names(
            raw.iter().map(String::as_str),
            &[VARIABLES_TITLE],
            sanitize_identifier,
        );
        let names: AHashMap<(&str, &str), String> = keys.into_iter().zip(unique).collect();

        // Subflow calls detour into the entry node of the called flow.
        let entries = flows
            .iter()
            .filter_map(|flow| {
                let entry = flow.entry()?;
                let title = names.get(&(flow.flow_id.as_str(), entry.id.as_str()))?;
                Some((flow.flow_id.as_str(), title.clone()))
            })
            .collect();
        Self { names, entries }
    }

    fn block(&self, flow_id: &str, block: &BlockId) -> String {
        self.names
            .get(&(flow_id, block.as_str()))
            .cloned()
            .unwrap_or_else(|| sanitize_identifier(&format!("{}_{}", flow_id, block)))
    }

    fn entry(&self, flow_id: &str) -> String {
        self.entries
            .get(flow_id)
            .cloned()
            .unwrap_or_else(|| sanitize_identifier(flow_id))
    }
}

fn variables_file(ctx: &ExportContext<'_>) -> Result<String, ExportError> {
    let mut out = format!("title: {}\n---\n", VARIABLES_TITLE);
    for var in ctx.sheets.variables() {
        let _ = writeln!(
            out,
            "<<declare {} = {}>>",
            ctx.emitter.variable(&var.reference()),
            ctx.emitter.literal(&var.initial_value())?
        );
    }
    out.push_str("===\n");
    Ok(out)
}

/// Escapes characters Yarn reads as markup, commands or line metadata.
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '{' | '}' | '[' | ']' | '<' | '>' | '#' | '\\' | '/') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn push_line(out: &mut String, depth: usize, text: &str) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
    out.push_str(text);
    out.push('\n');
}

struct BlockWriter<'w> {
    flow_id: &'w str,
    titles: &'w Titles<'w>,
    end: &'static str,
}

impl BlockWriter<'_> {
    fn flow_file(&self, ctx: &ExportContext<'_>, flow: &LinearFlow) -> String {
        let mut out = String::new();
        for (i, block) in flow.blocks.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            let _ = writeln!(out, "title: {}", self.titles.block(&flow.flow_id, &block.id));
            if i == 0 && !flow.flow_name.is_empty() {
                let _ = writeln!(out, "tags: {}", sanitize_identifier(&flow.flow_name));
            }
            out.push_str("---\n");
            if ctx.options.include_comments {
                let _ = writeln!(out, "// node {}", block.node_id);
            }
            self.write_lines(&mut out, &block.lines, 0);
            out.push_str("===\n");
        }
        out
    }

    fn write_lines(&self, out: &mut String, lines: &[Line], depth: usize) {
        for line in lines {
            match line {
                Line::Text { speaker, text } => {
                    for part in text.lines().filter(|l| !l.trim().is_empty()) {
                        let part = escape_text(part.trim());
                        match speaker {
                            Some(name) => push_line(
                                out,
                                depth,
                                &format!("{}: {}", escape_text(&single_line(name)), part),
                            ),
                            None => push_line(out, depth, &part),
                        }
                    }
                }
                Line::Direction(text) => {
                    push_line(out, depth, &format!("// {}", single_line(text)));
                }
                Line::Choice {
                    text,
                    condition,
                    body,
                } => {
                    let mut head = format!("-> {}", escape_text(&single_line(text)));
                    if let Some(condition) = condition {
                        let _ = write!(head, " <<if {}>>", condition);
                    }
                    push_line(out, depth, &head);
                    self.write_lines(out, body, depth + 1);
                }
                Line::Conditional {
                    condition,
                    then,
                    otherwise,
                } => {
                    push_line(out, depth, &format!("<<if {}>>", condition));
                    self.write_lines(out, then, depth + 1);
                    push_line(out, depth, "<<else>>");
                    self.write_lines(out, otherwise, depth + 1);
                    push_line(out, depth, "<<endif>>");
                }
                Line::Action(script) => {
                    for statement in script.lines() {
                        push_line(out, depth, statement);
                    }
                }
                Line::Scene {
                    location,
                    description,
                } => {
                    if let Some(location) = location {
                        push_line(
                            out,
                            depth,
                            &format!("<<scene {}>>", sanitize_identifier(location)),
                        );
                    }
                    for part in description.lines().filter(|l| !l.trim().is_empty()) {
                        push_line(out, depth, &escape_text(part.trim()));
                    }
                }
                Line::Call { flow_id } => {
                    push_line(
                        out,
                        depth,
                        &format!("<<detour {}>>", self.titles.entry(flow_id)),
                    );
                }
                Line::Divert(id) => push_line(
                    out,
                    depth,
                    &format!("<<jump {}>>", self.titles.block(self.flow_id, id)),
                ),
                Line::End => push_line(out, depth, self.end),
            }
        }
    }
}
