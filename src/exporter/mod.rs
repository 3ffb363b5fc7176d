//! The export pipeline: validate, then hand the scoped flows to the target serializer.

use crate::error::ExportError;
use crate::flow::{Project, SheetIndex};
use crate::format::ExportFormat;
use crate::serializer::{self, ExportContext};
use crate::validator::{ValidationReport, Validator};
use tracing::{debug, info};

mod options;

pub use options::{ExportOptions, UnreachablePolicy};

/// One generated file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub filename: String,
    pub content: String,
}

impl OutputFile {
    pub fn new(filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }
}

/// The artifacts of a successful export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutput {
    /// Targets that produce one document for the whole project.
    Single(OutputFile),
    /// Targets that split their output over several files.
    Files(Vec<OutputFile>),
}

impl ExportOutput {
    pub fn files(&self) -> impl Iterator<Item = &OutputFile> {
        match self {
            ExportOutput::Single(file) => std::slice::from_ref(file).iter(),
            ExportOutput::Files(files) => files.iter(),
        }
    }

    pub fn into_files(self) -> Vec<OutputFile> {
        match self {
            ExportOutput::Single(file) => vec![file],
            ExportOutput::Files(files) => files,
        }
    }

    pub fn file(&self, filename: &str) -> Option<&OutputFile> {
        self.files().find(|f| f.filename == filename)
    }
}

/// Exports a project to any registered target.
///
/// Holds no state between calls, so one exporter can serve several formats
/// and threads.
pub struct Exporter {
    project: Project,
    options: ExportOptions,
}

pub struct ExporterBuilder {
    project: Project,
    options: ExportOptions,
}

impl ExporterBuilder {
    pub fn new(project: Project) -> Self {
        Self {
            project,
            options: ExportOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ExportOptions) -> Self {
        self.options = options;
        self
    }

    /// Restricts the export to these flow ids.
    pub fn only_flows<I, S>(mut self, flows: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.flows = Some(flows.into_iter().map(Into::into).collect());
        self
    }

    pub fn unreachable_policy(mut self, policy: UnreachablePolicy) -> Self {
        self.options.unreachable = policy;
        self
    }

    pub fn include_comments(mut self, enabled: bool) -> Self {
        self.options.include_comments = enabled;
        self
    }

    pub fn build(self) -> Exporter {
        Exporter {
            project: self.project,
            options: self.options,
        }
    }
}

impl Exporter {
    pub fn builder(project: Project) -> ExporterBuilder {
        ExporterBuilder::new(project)
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    pub fn validate(&self, format: ExportFormat) -> ValidationReport {
        Validator::new(&self.project, &self.options).validate(format)
    }

    /// Resolves `format` by identifier, then exports.
    pub fn export_named(&self, format: &str) -> Result<ExportOutput, ExportError> {
        let format: ExportFormat = format.parse()?;
        self.export(format)
    }

    pub fn export(&self, format: ExportFormat) -> Result<ExportOutput, ExportError> {
        info!(%format, project = %self.project.name, "exporting");

        let report = self.validate(format);
        let warnings = report.into_result()?;
        debug!(%format, warnings = warnings.len(), "validation passed");

        let sheets = SheetIndex::new(&self.project.sheets);
        let ctx = ExportContext {
            project: &self.project,
            flows: self.options.scoped_flows(&self.project),
            sheets: &sheets,
            emitter: format.emitter(),
            options: &self.options,
        };

        let output = serializer::serialize(format, &ctx)?;
        let files = output.files().count();
        info!(%format, files, "export finished");
        Ok(output)
    }
}
