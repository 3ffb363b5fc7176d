//! # Kataribe - Narrative Export Compiler
//!
//! **Kataribe** turns the dialogue flow graphs of a narrative editor into
//! artifacts that game engines and middleware load directly: Ink and Yarn
//! scripts, Dialogue System for Unity and Godot JSON, Unreal DataTable CSVs
//! and articy:draft-style XML.
//!
//! ## Core Workflow
//!
//! The exporter operates on a canonical internal model of a project: flows
//! of typed nodes and socket connections, plus the sheets that hold the
//! variables conditions and instructions refer to. The primary workflow is:
//!
//! 1.  **Load Your Data**: Parse the editor's export (JSON or anything else) into your own structs.
//! 2.  **Convert to Kataribe's Model**: Implement the `IntoProject` trait to translate them into a `Project`.
//! 3.  **Build an Exporter**: `Exporter::builder(project)` takes the project plus options such as the flows in scope.
//! 4.  **Export**: Call `export` with an `ExportFormat` (or `export_named` with an identifier) and write the returned files.
//!
//! Every export validates first. Validation collects every problem instead
//! of stopping at the first one, and nothing is generated unless it passes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kataribe::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let flow = FlowGraph {
//!         id: "intro".to_string(),
//!         name: "Intro".to_string(),
//!         nodes: vec![
//!             FlowNode::new("start", NodeData::Entry),
//!             FlowNode::new(
//!                 "hello",
//!                 NodeData::Dialogue(DialogueData {
//!                     text: "<p>Hello!</p>".to_string(),
//!                     responses: vec![Response::new("bye", "Bye")],
//!                     ..Default::default()
//!                 }),
//!             ),
//!             FlowNode::new("end", NodeData::Exit(ExitData::default())),
//!         ],
//!         connections: vec![
//!             Connection::new("start", "output", "hello"),
//!             Connection::new("hello", "bye", "end"),
//!         ],
//!     };
//!     let project = Project { name: "Demo".to_string(), flows: vec![flow], sheets: vec![] };
//!
//!     let exporter = Exporter::builder(project).build();
//!     for file in exporter.export(ExportFormat::Ink)?.files() {
//!         println!("--- {}\n{}", file.filename, file.content);
//!     }
//!     Ok(())
//! }
//! ```

pub mod ast;
pub mod error;
pub mod exporter;
pub mod flow;
pub mod format;
pub mod helpers;
pub mod linearizer;
pub mod prelude;
pub mod transpiler;
pub mod validator;

mod serializer;
