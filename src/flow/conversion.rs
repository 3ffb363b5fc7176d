use super::project::Project;
use crate::error::ProjectConversionError;

/// A trait for editor-side data models that can be converted into a kataribe `Project`.
///
/// This is the seam that keeps the exporter independent of how the editor
/// stores its graphs. Implement it on the structs you deserialize your own
/// format into, and hand the resulting `Project` to the `Exporter`.
///
/// # Example
///
/// ```rust,no_run
/// use kataribe::prelude::*;
///
/// struct MyDocument { title: String }
///
/// impl IntoProject for MyDocument {
///     fn into_project(self) -> std::result::Result<Project, ProjectConversionError> {
///         if self.title.is_empty() {
///             return Err(ProjectConversionError::Invalid("missing title".to_string()));
///         }
///         Ok(Project { name: self.title, flows: vec![], sheets: vec![] })
///     }
/// }
/// ```
pub trait IntoProject {
    /// Consumes the object and converts it into an exportable project.
    fn into_project(self) -> Result<Project, ProjectConversionError>;
}
