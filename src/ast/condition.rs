use super::{Operand, VariableRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the rules of a condition are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Logic {
    #[default]
    All,
    Any,
}

/// The closed set of comparison operators a rule may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    Contains,
    NotContains,
    IsTrue,
    IsFalse,
    IsNil,
}

impl Operator {
    pub const ALL: [Operator; 11] = [
        Operator::Equals,
        Operator::NotEquals,
        Operator::GreaterThan,
        Operator::LessThan,
        Operator::GreaterThanOrEqual,
        Operator::LessThanOrEqual,
        Operator::Contains,
        Operator::NotContains,
        Operator::IsTrue,
        Operator::IsFalse,
        Operator::IsNil,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "not_equals",
            Operator::GreaterThan => "greater_than",
            Operator::LessThan => "less_than",
            Operator::GreaterThanOrEqual => "greater_than_or_equal",
            Operator::LessThanOrEqual => "less_than_or_equal",
            Operator::Contains => "contains",
            Operator::NotContains => "not_contains",
            Operator::IsTrue => "is_true",
            Operator::IsFalse => "is_false",
            Operator::IsNil => "is_nil",
        }
    }

    /// Unary operators test the variable alone and ignore the rule's value.
    pub fn is_unary(&self) -> bool {
        matches!(
            self,
            Operator::IsTrue | Operator::IsFalse | Operator::IsNil
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operator::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| format!("unknown condition operator '{}'", s))
    }
}

/// A single `variable operator value` test.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rule {
    pub variable: VariableRef,
    pub operator: Operator,
    #[serde(default)]
    pub value: Option<Operand>,
}

/// The engine-agnostic boolean expression attached to condition nodes and responses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Condition {
    #[serde(default)]
    pub logic: Logic,
    pub rules: Vec<Rule>,
}

impl Condition {
    pub fn new(logic: Logic, rules: Vec<Rule>) -> Self {
        Self { logic, rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Collects every variable the condition reads, in rule order.
    pub fn variables(&self) -> Vec<&VariableRef> {
        let mut vars = Vec::new();
        for rule in &self.rules {
            vars.push(&rule.variable);
            if let Some(var) = rule.value.as_ref().and_then(Operand::variable_ref) {
                vars.push(var);
            }
        }
        vars
    }
}
