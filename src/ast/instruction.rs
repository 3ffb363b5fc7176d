use super::{Operand, VariableRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of operations an assignment may perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Set,
    Add,
    Subtract,
    SetTrue,
    SetFalse,
    Toggle,
    Clear,
    SetIfUnset,
}

impl Operation {
    pub const ALL: [Operation; 8] = [
        Operation::Set,
        Operation::Add,
        Operation::Subtract,
        Operation::SetTrue,
        Operation::SetFalse,
        Operation::Toggle,
        Operation::Clear,
        Operation::SetIfUnset,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Set => "set",
            Operation::Add => "add",
            Operation::Subtract => "subtract",
            Operation::SetTrue => "set_true",
            Operation::SetFalse => "set_false",
            Operation::Toggle => "toggle",
            Operation::Clear => "clear",
            Operation::SetIfUnset => "set_if_unset",
        }
    }

    /// Whether the operation reads the assignment's value.
    pub fn takes_value(&self) -> bool {
        matches!(
            self,
            Operation::Set | Operation::Add | Operation::Subtract | Operation::SetIfUnset
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| format!("unknown instruction operation '{}'", s))
    }
}

/// A single `variable operation value` statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Assignment {
    pub variable: VariableRef,
    pub operation: Operation,
    #[serde(default)]
    pub value: Option<Operand>,
}

/// An ordered list of assignments, executed top to bottom.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Instruction {
    pub assignments: Vec<Assignment>,
}

impl Instruction {
    pub fn new(assignments: Vec<Assignment>) -> Self {
        Self { assignments }
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn variables(&self) -> Vec<&VariableRef> {
        let mut vars = Vec::new();
        for assignment in &self.assignments {
            vars.push(&assignment.variable);
            if let Some(var) = assignment.value.as_ref().and_then(Operand::variable_ref) {
                vars.push(var);
            }
        }
        vars
    }
}
