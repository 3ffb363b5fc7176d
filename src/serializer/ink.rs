use super::{ExportContext, called_flows, flow_file_stems, unique_names};
use crate::error::ExportError;
use crate::exporter::{ExportOutput, OutputFile};
use crate::helpers::{sanitize_identifier, single_line};
use crate::linearizer::{BlockAnchor, BlockId, LinearFlow, Line};
use ahash::{AHashMap, AHashSet};
use std::fmt::Write;

const INDENT: &str = "    ";
const MAIN_STEM: &str = "main";
const STOP: &str = "-> END";
const RETURN: &str = "->->";

pub(super) fn serialize(
    ctx: &ExportContext<'_>,
    flows: &[LinearFlow],
) -> Result<ExportOutput, ExportError> {
    let stems = flow_file_stems(flows, MAIN_STEM);
    let knot_names = unique_names(
        flows.iter().map(|f| f.flow_id.as_str()),
        &[],
        sanitize_identifier,
    );
    let knots: AHashMap<&str, String> = flows
        .iter()
        .map(|f| f.flow_id.as_str())
        .zip(knot_names)
        .collect();
    let called = called_flows(ctx);

    let mut files = Vec::with_capacity(flows.len() + 1);
    files.push(OutputFile::new(
        format!("{}.ink", MAIN_STEM),
        main_file(ctx, flows, &stems, &knots, &called)?,
    ));
    for (flow, stem) in flows.iter().zip(&stems) {
        let writer = KnotWriter {
            knot: knot_name(&knots, &flow.flow_id),
            knots: &knots,
            // Called flows are tunnels and hand control back to their caller.
            end: if called.contains(flow.flow_id.as_str()) {
                RETURN
            } else {
                STOP
            },
        };
        files.push(OutputFile::new(
            format!("{}.ink", stem),
            writer.flow_file(ctx, flow),
        ));
    }
    Ok(ExportOutput::Files(files))
}

fn knot_name(knots: &AHashMap<&str, String>, flow_id: &str) -> String {
    knots
        .get(flow_id)
        .cloned()
        .unwrap_or_else(|| sanitize_identifier(flow_id))
}

fn main_file(
    ctx: &ExportContext<'_>,
    flows: &[LinearFlow],
    stems: &[String],
    knots: &AHashMap<&str, String>,
    called: &AHashSet<&str>,
) -> Result<String, ExportError> {
    let mut out = String::new();
    let _ = writeln!(out, "// {}", single_line(&ctx.project.name));

    let variables = ctx.sheets.variables();
    if !variables.is_empty() {
        out.push('\n');
        for var in variables {
            let _ = writeln!(
                out,
                "VAR {} = {}",
                ctx.emitter.variable(&var.reference()),
                ctx.emitter.literal(&var.initial_value())?
            );
        }
    }

    out.push('\n');
    for stem in stems {
        let _ = writeln!(out, "INCLUDE {}.ink", stem);
    }

    out.push('\n');
    match flows.first() {
        Some(first) if called.contains(first.flow_id.as_str()) => {
            let _ = writeln!(out, "-> {} ->", knot_name(knots, &first.flow_id));
            out.push_str("-> END\n");
        }
        Some(first) => {
            let _ = writeln!(out, "-> {}", knot_name(knots, &first.flow_id));
        }
        None => out.push_str("-> END\n"),
    }
    Ok(out)
}

fn push_line(out: &mut String, depth: usize, text: &str) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
    out.push_str(text);
    out.push('\n');
}

/// Escapes characters Ink would read as markup or control flow inside running text.
fn escape_text(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    for (i, &c) in chars.iter().enumerate() {
        let next = chars.get(i + 1).copied();
        let escape = match c {
            '{' | '}' | '[' | ']' | '#' | '|' | '\\' => true,
            '*' | '+' | '-' | '~' | '=' if i == 0 => true,
            // `//` and `/*` open comments.
            '/' => matches!(next, Some('/' | '*')),
            // `->` diverts.
            '-' => next == Some('>'),
            // `<>` glues, `<-` starts a thread.
            '<' => matches!(next, Some('>' | '-')),
            _ => false,
        };
        if escape {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Renders the blocks of one flow as a knot.
struct KnotWriter<'w> {
    knot: String,
    knots: &'w AHashMap<&'w str, String>,
    /// How a finished path ends: the story stops, or a tunnel returns.
    end: &'static str,
}

impl KnotWriter<'_> {
    fn flow_file(&self, ctx: &ExportContext<'_>, flow: &LinearFlow) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== {} ===", self.knot);
        if ctx.options.include_comments && !flow.flow_name.is_empty() {
            let _ = writeln!(out, "// {}", single_line(&flow.flow_name));
        }

        for block in &flow.blocks {
            // The entry block is the knot's own content, every other block is a stitch.
            if block.anchor != BlockAnchor::Entry {
                out.push('\n');
                let _ = writeln!(out, "= {}", block.id);
            }
            if ctx.options.include_comments {
                let _ = writeln!(out, "// node {}", block.node_id);
            }
            self.write_lines(&mut out, &block.lines, 0);
        }
        out
    }

    fn divert(&self, id: &BlockId) -> String {
        format!("-> {}.{}", self.knot, id)
    }

    fn write_lines(&self, out: &mut String, lines: &[Line], depth: usize) {
        for line in lines {
            match line {
                Line::Text { speaker, text } => {
                    for (i, part) in text.lines().filter(|l| !l.trim().is_empty()).enumerate() {
                        let part = escape_text(part.trim());
                        match speaker {
                            Some(name) if i == 0 => push_line(
                                out,
                                depth,
                                &format!("{}: {}", escape_text(&single_line(name)), part),
                            ),
                            _ => push_line(out, depth, &part),
                        }
                    }
                }
                Line::Direction(text) => {
                    push_line(out, depth, &format!("# direction: {}", single_line(text)));
                }
                Line::Choice {
                    text,
                    condition,
                    body,
                } => {
                    let mut head = String::from("*");
                    if let Some(condition) = condition {
                        let _ = write!(head, " {{{}}}", condition);
                    }
                    let _ = write!(head, " [{}]", escape_text(&single_line(text)));
                    match body.as_slice() {
                        [Line::Divert(id)] => {
                            let _ = write!(head, " {}", self.divert(id));
                            push_line(out, depth, &head);
                        }
                        [Line::End] => {
                            let _ = write!(head, " {}", self.end);
                            push_line(out, depth, &head);
                        }
                        _ => {
                            push_line(out, depth, &head);
                            self.write_lines(out, body, depth + 1);
                        }
                    }
                }
                Line::Conditional {
                    condition,
                    then,
                    otherwise,
                } => {
                    push_line(out, depth, &format!("{{ {}:", condition));
                    self.write_lines(out, then, depth + 1);
                    push_line(out, depth, "- else:");
                    self.write_lines(out, otherwise, depth + 1);
                    push_line(out, depth, "}");
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
                        push_line(out, depth, &format!("# scene: {}", single_line(location)));
                    }
                    for part in description.lines().filter(|l| !l.trim().is_empty()) {
                        push_line(out, depth, &escape_text(part.trim()));
                    }
                }
                Line::Call { flow_id } => {
                    push_line(
                        out,
                        depth,
                        &format!("-> {} ->", knot_name(self.knots, flow_id)),
                    );
                }
                Line::Divert(id) => push_line(out, depth, &self.divert(id)),
                Line::End => push_line(out, depth, self.end),
            }
        }
    }
}
