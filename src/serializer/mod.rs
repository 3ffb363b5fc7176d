//! Per-target serializers.
//!
//! Ink and Yarn consume linearized blocks. Unity, Godot, Unreal and articy
//! map every node onto one entity of the target's data model.

use crate::error::ExportError;
use crate::exporter::{ExportOptions, ExportOutput};
use crate::flow::{FlowGraph, NodeData, Project, SheetIndex};
use crate::format::ExportFormat;
use crate::helpers::slugify;
use crate::linearizer::{LinearFlow, Linearizer};
use crate::transpiler::Emitter;
use ahash::AHashSet;
use tracing::debug;

mod articy;
mod godot;
mod ink;
mod unity;
mod unreal;
mod yarn;

/// Everything a serializer reads during one export call.
pub(crate) struct ExportContext<'a> {
    pub project: &'a Project,
    /// The flows in scope, in project order.
    pub flows: Vec<&'a FlowGraph>,
    pub sheets: &'a SheetIndex<'a>,
    pub emitter: &'static dyn Emitter,
    pub options: &'a ExportOptions,
}

impl ExportContext<'_> {
    /// File stem shared by single-document targets.
    pub fn project_stem(&self) -> String {
        slugify(&self.project.name)
    }
}

pub(crate) fn serialize(
    format: ExportFormat,
    ctx: &ExportContext<'_>,
) -> Result<ExportOutput, ExportError> {
    match format {
        ExportFormat::Ink => ink::serialize(ctx, &linearize(ctx)?),
        ExportFormat::Yarn => yarn::serialize(ctx, &linearize(ctx)?),
        ExportFormat::Unity => unity::serialize(ctx),
        ExportFormat::Godot => godot::serialize(ctx),
        ExportFormat::Unreal => unreal::serialize(ctx),
        ExportFormat::Articy => articy::serialize(ctx),
    }
}

fn linearize(ctx: &ExportContext<'_>) -> Result<Vec<LinearFlow>, ExportError> {
    let flows = ctx
        .flows
        .iter()
        .map(|flow| Linearizer::new(flow, ctx.sheets, ctx.emitter).linearize())
        .collect::<Result<Vec<_>, _>>()?;
    debug!(
        flows = flows.len(),
        blocks = flows.iter().map(|f| f.blocks.len()).sum::<usize>(),
        "linearized"
    );
    Ok(flows)
}

/// Maps a `serde_json` failure onto the pipeline error.
fn encoding_error(format: ExportFormat, err: serde_json::Error) -> ExportError {
    ExportError::Encoding {
        format: format.to_string(),
        message: err.to_string(),
    }
}

/// Distinct names for `ids`, in order.
///
/// Each id is mapped through `normalize`. A name that clashes with one of
/// `reserved` or with an earlier name gets `_2`, `_3`... appended.
fn unique_names<'i>(
    ids: impl IntoIterator<Item = &'i str>,
    reserved: &[&str],
    normalize: impl Fn(&str) -> String,
) -> Vec<String> {
    let mut taken: AHashSet<String> = reserved.iter().map(|r| r.to_string()).collect();
    ids.into_iter()
        .map(|id| {
            let base = normalize(id);
            let mut name = base.clone();
            let mut suffix = 2;
            while !taken.insert(name.clone()) {
                name = format!("{}_{}", base, suffix);
                suffix += 1;
            }
            name
        })
        .collect()
}

/// One file stem per flow for multi-file targets: slugified flow ids, kept clear of `reserved`.
fn flow_file_stems(flows: &[LinearFlow], reserved: &str) -> Vec<String> {
    unique_names(flows.iter().map(|f| f.flow_id.as_str()), &[reserved], slugify)
}

/// Ids of the flows some subflow node in scope calls.
///
/// Script targets end these flows with a return to the caller instead of
/// stopping the story.
fn called_flows<'a>(ctx: &ExportContext<'a>) -> AHashSet<&'a str> {
    ctx.flows
        .iter()
        .flat_map(|&flow| flow.nodes.iter())
        .filter_map(|node| match &node.data {
            NodeData::Subflow(subflow) => Some(subflow.flow_ref.as_str()),
            _ => None,
        })
        .collect()
}
