use super::FlowGraph;
use crate::ast::{Value, VariableRef};
use ahash::AHashMap;
use std::collections::hash_map::Entry;

/// Everything an export reads: the flows and the sheets their references point into.
#[derive(Debug, Clone, Default)]
pub struct Project {
    pub name: String,
    pub flows: Vec<FlowGraph>,
    pub sheets: Vec<Sheet>,
}

impl Project {
    pub fn flow(&self, flow_id: &str) -> Option<&FlowGraph> {
        self.flows.iter().find(|f| f.id == flow_id)
    }
}

/// A sheet groups variables under a shortcut and doubles as a speaker.
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub shortcut: String,
    pub name: String,
    pub variables: Vec<VariableDefinition>,
}

#[derive(Debug, Clone)]
pub struct VariableDefinition {
    pub name: String,
    pub display_name: Option<String>,
    pub kind: VariableKind,
    pub default: Value,
}

impl VariableDefinition {
    pub fn new(name: impl Into<String>, kind: VariableKind, default: Value) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            kind,
            default,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableKind {
    Number,
    Boolean,
    Text,
    Select,
}

impl VariableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariableKind::Number => "number",
            VariableKind::Boolean => "boolean",
            VariableKind::Text => "text",
            VariableKind::Select => "select",
        }
    }

    /// The value a variable of this kind holds when the sheet leaves it unset.
    pub fn zero_value(&self) -> Value {
        match self {
            VariableKind::Number => Value::Number(0.0),
            VariableKind::Boolean => Value::Bool(false),
            VariableKind::Text | VariableKind::Select => Value::Text(String::new()),
        }
    }
}

/// A resolved variable: the sheet it lives on plus its definition.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedVariable<'a> {
    pub sheet: &'a Sheet,
    pub definition: &'a VariableDefinition,
}

impl ResolvedVariable<'_> {
    pub fn reference(&self) -> VariableRef {
        VariableRef::new(&self.sheet.shortcut, &self.definition.name)
    }

    pub fn display_name(&self) -> String {
        let variable = self
            .definition
            .display_name
            .as_deref()
            .unwrap_or(&self.definition.name);
        format!("{} / {}", self.sheet.name, variable)
    }

    /// The declared default, or the kind's zero value when the default is null.
    pub fn initial_value(&self) -> Value {
        match &self.definition.default {
            Value::Null => self.definition.kind.zero_value(),
            other => other.clone(),
        }
    }
}

/// Lookup table over a project's sheets. Built once per export call.
pub struct SheetIndex<'a> {
    sheets: AHashMap<&'a str, &'a Sheet>,
    variables: AHashMap<(&'a str, &'a str), ResolvedVariable<'a>>,
    ordered: Vec<ResolvedVariable<'a>>,
}

impl<'a> SheetIndex<'a> {
    pub fn new(sheets: &'a [Sheet]) -> Self {
        let mut by_shortcut = AHashMap::new();
        let mut variables = AHashMap::new();
        let mut ordered = Vec::new();
        for sheet in sheets {
            by_shortcut.entry(sheet.shortcut.as_str()).or_insert(sheet);
            for definition in &sheet.variables {
                // A repeated name keeps its first declaration, like a repeated shortcut.
                let key = (sheet.shortcut.as_str(), definition.name.as_str());
                if let Entry::Vacant(slot) = variables.entry(key) {
                    let resolved = *slot.insert(ResolvedVariable { sheet, definition });
                    ordered.push(resolved);
                }
            }
        }
        Self {
            sheets: by_shortcut,
            variables,
            ordered,
        }
    }

    pub fn sheet(&self, shortcut: &str) -> Option<&'a Sheet> {
        self.sheets.get(shortcut).copied()
    }

    pub fn resolve(&self, var: &VariableRef) -> Option<ResolvedVariable<'a>> {
        self.variables
            .get(&(var.sheet.as_str(), var.variable.as_str()))
            .copied()
    }

    /// Display name of a speaker reference; falls back to the raw shortcut.
    pub fn speaker_name(&self, shortcut: &str) -> String {
        self.sheet(shortcut)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| shortcut.to_string())
    }

    /// Every variable of the project in sheet order, then declaration order.
    pub fn variables(&self) -> &[ResolvedVariable<'a>] {
        &self.ordered
    }
}
