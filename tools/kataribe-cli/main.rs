use clap::Parser;
use kataribe::prelude::*;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// --- JSON Deserialization Structs (Input Format Specific) ---
// These structs match the editor's project export and are only used here for conversion.

#[derive(Deserialize)]
struct RawProject {
    name: String,
    #[serde(default)]
    sheets: Vec<RawSheet>,
    #[serde(default)]
    flows: Vec<RawFlow>,
}

#[derive(Deserialize)]
struct RawSheet {
    shortcut: String,
    name: String,
    #[serde(default)]
    variables: Vec<RawVariable>,
}

#[derive(Deserialize)]
struct RawVariable {
    name: String,
    #[serde(default, alias = "displayName")]
    display_name: Option<String>,
    #[serde(rename = "type", alias = "kind")]
    kind: String,
    #[serde(default)]
    default: serde_json::Value,
}

#[derive(Deserialize)]
struct RawFlow {
    id: String,
    #[serde(default)]
    name: String,
    nodes: Vec<RawNode>,
    #[serde(default)]
    connections: Vec<RawConnection>,
}

#[derive(Deserialize)]
struct RawNode {
    id: String,
    #[serde(rename = "type")]
    node_type: String,
    #[serde(default)]
    data: RawNodeData,
}

#[derive(Deserialize, Default)]
struct RawNodeData {
    speaker: Option<String>,
    #[serde(default)]
    text: String,
    #[serde(alias = "stageDirections")]
    stage_directions: Option<String>,
    #[serde(alias = "menuText")]
    menu_text: Option<String>,
    #[serde(default)]
    responses: Vec<RawResponse>,
    label: Option<String>,
    #[serde(alias = "hubId")]
    hub_id: Option<String>,
    #[serde(alias = "targetHub")]
    target_hub: Option<String>,
    condition: Option<RawCondition>,
    #[serde(default)]
    assignments: Vec<RawAssignment>,
    location: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(alias = "flowRef")]
    flow_ref: Option<String>,
}

#[derive(Deserialize)]
struct RawResponse {
    id: String,
    #[serde(default)]
    text: String,
    condition: Option<RawCondition>,
    #[serde(default)]
    instruction: Vec<RawAssignment>,
}

#[derive(Deserialize)]
struct RawCondition {
    #[serde(default)]
    logic: Logic,
    #[serde(default)]
    rules: Vec<RawRule>,
}

#[derive(Deserialize)]
struct RawRule {
    sheet: String,
    variable: String,
    operator: String,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default, alias = "valueType")]
    value_type: Option<String>,
    #[serde(default, alias = "valueSheet")]
    value_sheet: Option<String>,
}

#[derive(Deserialize)]
struct RawAssignment {
    sheet: String,
    variable: String,
    operator: String,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default, alias = "valueType")]
    value_type: Option<String>,
    #[serde(default, alias = "valueSheet")]
    value_sheet: Option<String>,
}

#[derive(Deserialize)]
struct RawConnection {
    source: String,
    #[serde(alias = "sourcePin", alias = "source_pin")]
    source_socket: String,
    target: String,
    #[serde(default = "default_input", alias = "targetPin", alias = "target_pin")]
    target_socket: String,
}

fn default_input() -> String {
    "input".to_string()
}

// --- Converter Implementation ---
// This implements the conversion from the raw JSON model to kataribe's canonical Project.

type ConversionResult<T> = std::result::Result<T, ProjectConversionError>;

/// Kinds of the project's variables, used to type literal values the editor stores as strings.
struct KindLookup<'a> {
    sheets: &'a [Sheet],
}

impl KindLookup<'_> {
    fn kind(&self, var: &VariableRef) -> Option<VariableKind> {
        self.sheets
            .iter()
            .find(|s| s.shortcut == var.sheet)
            .and_then(|s| s.variables.iter().find(|v| v.name == var.variable))
            .map(|v| v.kind)
    }

    /// Converts a raw literal, reading numeric and boolean strings by the variable's kind.
    fn literal(&self, var: &VariableRef, raw: serde_json::Value) -> Value {
        let kind = self.kind(var);
        match raw {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or_default()),
            serde_json::Value::String(s) => match (kind, s.trim()) {
                (Some(VariableKind::Number), t) if t.parse::<f64>().is_ok() => {
                    Value::Number(t.parse().unwrap_or_default())
                }
                (Some(VariableKind::Boolean), "true") => Value::Bool(true),
                (Some(VariableKind::Boolean), "false") => Value::Bool(false),
                _ => Value::Text(s),
            },
            other => Value::Text(other.to_string()),
        }
    }

    fn operand(
        &self,
        var: &VariableRef,
        value: serde_json::Value,
        value_type: Option<&str>,
        value_sheet: Option<String>,
    ) -> ConversionResult<Option<Operand>> {
        match value_type {
            Some("variable_ref") => {
                let name = value.as_str().ok_or_else(|| {
                    ProjectConversionError::Invalid(format!(
                        "variable reference on '{}' has no variable name",
                        var
                    ))
                })?;
                let sheet = value_sheet.unwrap_or_else(|| var.sheet.clone());
                Ok(Some(Operand::Variable(VariableRef::new(sheet, name))))
            }
            _ if value.is_null() => Ok(None),
            _ => Ok(Some(Operand::Literal(self.literal(var, value)))),
        }
    }

    fn condition(&self, raw: RawCondition) -> ConversionResult<Condition> {
        let rules = raw
            .rules
            .into_iter()
            .map(|r| {
                let variable = VariableRef::new(r.sheet, r.variable);
                let operator: Operator = r.operator.parse().map_err(ProjectConversionError::Invalid)?;
                let value = if operator.is_unary() {
                    None
                } else {
                    self.operand(&variable, r.value, r.value_type.as_deref(), r.value_sheet)?
                };
                Ok(Rule {
                    variable,
                    operator,
                    value,
                })
            })
            .collect::<ConversionResult<Vec<_>>>()?;
        Ok(Condition::new(raw.logic, rules))
    }

    fn instruction(&self, raw: Vec<RawAssignment>) -> ConversionResult<Instruction> {
        let assignments = raw
            .into_iter()
            .map(|a| {
                let variable = VariableRef::new(a.sheet, a.variable);
                let operation: Operation =
                    a.operator.parse().map_err(ProjectConversionError::Invalid)?;
                let value = if operation.takes_value() {
                    self.operand(&variable, a.value, a.value_type.as_deref(), a.value_sheet)?
                } else {
                    None
                };
                Ok(Assignment {
                    variable,
                    operation,
                    value,
                })
            })
            .collect::<ConversionResult<Vec<_>>>()?;
        Ok(Instruction::new(assignments))
    }

    fn node(&self, raw: RawNode) -> ConversionResult<FlowNode> {
        let data = raw.data;
        let missing = |field: &str| {
            ProjectConversionError::Invalid(format!(
                "{} node '{}' is missing '{}'",
                raw.node_type, raw.id, field
            ))
        };
        let node_data = match raw.node_type.as_str() {
            "entry" => NodeData::Entry,
            "exit" => NodeData::Exit(ExitData { label: data.label }),
            "dialogue" => {
                let responses = data
                    .responses
                    .into_iter()
                    .map(|r| {
                        Ok(Response {
                            id: r.id,
                            text: r.text,
                            condition: r.condition.map(|c| self.condition(c)).transpose()?,
                            instruction: if r.instruction.is_empty() {
                                None
                            } else {
                                Some(self.instruction(r.instruction)?)
                            },
                        })
                    })
                    .collect::<ConversionResult<Vec<_>>>()?;
                NodeData::Dialogue(DialogueData {
                    speaker: data.speaker,
                    text: data.text,
                    stage_directions: data.stage_directions,
                    menu_text: data.menu_text,
                    responses,
                })
            }
            "hub" => NodeData::Hub(HubData {
                hub_id: data.hub_id.ok_or_else(|| missing("hub_id"))?,
            }),
            "jump" => NodeData::Jump(JumpData {
                target_hub: data.target_hub.ok_or_else(|| missing("target_hub"))?,
            }),
            "condition" => NodeData::Condition(
                self.condition(data.condition.ok_or_else(|| missing("condition"))?)?,
            ),
            "instruction" => NodeData::Instruction(self.instruction(data.assignments)?),
            "scene" => NodeData::Scene(SceneData {
                location: data.location,
                description: data.description,
            }),
            "subflow" => NodeData::Subflow(SubflowData {
                flow_ref: data.flow_ref.ok_or_else(|| missing("flow_ref"))?,
            }),
            other => {
                return Err(ProjectConversionError::Invalid(format!(
                    "node '{}' has unknown type '{}'",
                    raw.id, other
                )));
            }
        };
        Ok(FlowNode::new(raw.id, node_data))
    }
}

fn variable_kind(raw: &str) -> ConversionResult<VariableKind> {
    match raw {
        "number" => Ok(VariableKind::Number),
        "boolean" => Ok(VariableKind::Boolean),
        "text" => Ok(VariableKind::Text),
        "select" => Ok(VariableKind::Select),
        other => Err(ProjectConversionError::Invalid(format!(
            "unknown variable type '{}'",
            other
        ))),
    }
}

impl IntoProject for RawProject {
    fn into_project(self) -> ConversionResult<Project> {
        let sheets = self
            .sheets
            .into_iter()
            .map(|s| {
                let variables = s
                    .variables
                    .into_iter()
                    .map(|v| {
                        let default = serde_json::from_value(v.default)
                            .map_err(|e| ProjectConversionError::JsonParseError(e.to_string()))?;
                        Ok(VariableDefinition {
                            name: v.name,
                            display_name: v.display_name,
                            kind: variable_kind(&v.kind)?,
                            default,
                        })
                    })
                    .collect::<ConversionResult<Vec<_>>>()?;
                Ok(Sheet {
                    shortcut: s.shortcut,
                    name: s.name,
                    variables,
                })
            })
            .collect::<ConversionResult<Vec<_>>>()?;

        let lookup = KindLookup { sheets: &sheets };
        let flows = self
            .flows
            .into_iter()
            .map(|f| {
                let nodes = f
                    .nodes
                    .into_iter()
                    .map(|n| lookup.node(n))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                let connections = f
                    .connections
                    .into_iter()
                    .map(|c| Connection {
                        source: c.source,
                        source_socket: c.source_socket,
                        target: c.target,
                        target_socket: c.target_socket,
                    })
                    .collect();
                Ok(FlowGraph {
                    id: f.id,
                    name: f.name,
                    nodes,
                    connections,
                })
            })
            .collect::<ConversionResult<Vec<_>>>()?;

        Ok(Project {
            name: self.name,
            flows,
            sheets,
        })
    }
}

/// Export narrative flow graphs to game-engine dialogue formats
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the project JSON file
    project_path: PathBuf,

    /// Target format: ink, yarn, unity, godot, unreal or articy
    #[arg(short, long, default_value = "ink")]
    format: String,

    /// Directory the generated files are written to
    #[arg(short, long, default_value = "export")]
    out_dir: PathBuf,

    /// Export only these flow ids (repeatable)
    #[arg(long = "flow")]
    flows: Vec<String>,

    /// Fail instead of warning when a node is unreachable
    #[arg(long)]
    strict: bool,

    /// Emit source node ids as comments in script targets
    #[arg(long)]
    comments: bool,

    /// Only run validation and print the report
    #[arg(long)]
    validate_only: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    run(cli);
}

fn run(cli: Cli) {
    let total_start = Instant::now();

    // --- 1. Loading and Conversion ---
    let project_json = fs::read_to_string(&cli.project_path).unwrap_or_else(|e| {
        exit_with_error(&format!(
            "Failed to read project file '{}': {}",
            cli.project_path.display(),
            e
        ))
    });
    let raw: RawProject = serde_json::from_str(&project_json)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse project JSON: {}", e)));
    let project = raw
        .into_project()
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to convert project: {}", e)));

    let format: ExportFormat = cli
        .format
        .parse()
        .unwrap_or_else(|e: UnsupportedFormatError| exit_with_error(&e.to_string()));

    // --- 2. Exporter ---
    let mut builder = Exporter::builder(project)
        .include_comments(cli.comments)
        .unreachable_policy(if cli.strict {
            UnreachablePolicy::Reject
        } else {
            UnreachablePolicy::Warn
        });
    if !cli.flows.is_empty() {
        builder = builder.only_flows(cli.flows);
    }
    let exporter = builder.build();

    if cli.validate_only {
        let report = exporter.validate(format);
        for issue in &report.issues {
            println!("{}", issue);
        }
        if report.is_ready() {
            println!(
                "Project is ready for {} export ({} warning(s))",
                format,
                report.warnings().count()
            );
            return;
        }
        exit_with_error(&format!(
            "{} blocking issue(s) for {} export",
            report.errors().count(),
            format
        ));
    }

    // --- 3. Export ---
    let export_start = Instant::now();
    let output = exporter
        .export(format)
        .unwrap_or_else(|e| exit_with_error(&e.to_string()));
    let export_duration = export_start.elapsed();

    // --- 4. Writing ---
    fs::create_dir_all(&cli.out_dir).unwrap_or_else(|e| {
        exit_with_error(&format!(
            "Failed to create output directory '{}': {}",
            cli.out_dir.display(),
            e
        ))
    });
    for file in output.files() {
        let path = cli.out_dir.join(Path::new(&file.filename));
        fs::write(&path, &file.content).unwrap_or_else(|e| {
            exit_with_error(&format!("Failed to write '{}': {}", path.display(), e))
        });
        info!(path = %path.display(), bytes = file.content.len(), "wrote file");
    }

    println!("\n--- Export Summary ---");
    println!("Format:          {}", format);
    println!("Files written:   {}", output.files().count());
    println!("Export:          {:?}", export_duration);
    println!("Total Execution: {:?}", total_start.elapsed());
}

fn exit_with_error(message: &str) -> ! {
    error!("{}", message);
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
