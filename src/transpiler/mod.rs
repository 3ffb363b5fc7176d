//! Renders condition and instruction ASTs in each target's native syntax.
//!
//! Every target implements [`Emitter`]. The trait's default methods encode a
//! C-like grammar (`a == b && c > 1`, `x = x + 1;`); targets override the
//! hooks where their syntax differs and inherit everything else.

use crate::ast::{Assignment, Condition, Instruction, Logic, Operand, Operation, Operator, Rule, Value, VariableRef};
use crate::error::TranspileError;

mod targets;

pub use targets::{
    ArticyEmitter, GodotEmitter, InkEmitter, UnityEmitter, UnrealEmitter, YarnEmitter,
};

/// Per-target rendering hooks for the expression IR.
pub trait Emitter: Send + Sync {
    /// Human-readable target name used in error messages.
    fn target(&self) -> &'static str;

    /// How the target names a sheet variable.
    fn variable(&self, var: &VariableRef) -> String;

    fn true_literal(&self) -> &'static str {
        "true"
    }

    /// The target's null literal, or `None` when variables can never be unset.
    fn null_literal(&self) -> Option<&'static str> {
        Some("null")
    }

    fn negation(&self) -> &'static str {
        "!"
    }

    fn terminator(&self) -> &'static str {
        ";"
    }

    fn logic_op(&self, logic: Logic) -> &'static str {
        match logic {
            Logic::All => "&&",
            Logic::Any => "||",
        }
    }

    fn literal(&self, value: &Value) -> Result<String, TranspileError> {
        render_literal(self, value)
    }

    /// Maps a comparison operator onto the target's infix token.
    fn condition_op(&self, op: Operator) -> Result<&'static str, TranspileError> {
        default_condition_op(self, op)
    }

    fn emit_rule(&self, rule: &Rule) -> Result<String, TranspileError> {
        render_rule(self, rule)
    }

    fn emit_assignment(&self, assignment: &Assignment) -> Result<String, TranspileError> {
        render_assignment(self, assignment)
    }

    /// Renders "assign `value` to `var` unless it already holds something".
    fn emit_set_if_unset(&self, var: &str, value: &str) -> Result<String, TranspileError> {
        let null = self
            .null_literal()
            .ok_or_else(|| unsupported(self, Operation::SetIfUnset.as_str()))?;
        Ok(format!(
            "if ({} == {}) {} = {}{}",
            var,
            null,
            var,
            value,
            self.terminator()
        ))
    }
}

/// Renders a condition as a single boolean expression.
pub fn transpile_condition(
    condition: &Condition,
    emitter: &dyn Emitter,
) -> Result<String, TranspileError> {
    let rendered = condition
        .rules
        .iter()
        .map(|rule| emitter.emit_rule(rule))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(match rendered.len() {
        0 => emitter.true_literal().to_string(),
        1 => rendered.into_iter().next().unwrap_or_default(),
        _ => rendered
            .iter()
            .map(|r| format!("({})", r))
            .collect::<Vec<_>>()
            .join(&format!(" {} ", emitter.logic_op(condition.logic))),
    })
}

/// Renders an instruction as one statement per line.
pub fn transpile_instruction(
    instruction: &Instruction,
    emitter: &dyn Emitter,
) -> Result<String, TranspileError> {
    let statements = instruction
        .assignments
        .iter()
        .map(|a| emitter.emit_assignment(a))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(statements.join("\n"))
}

pub(crate) fn unsupported<E: Emitter + ?Sized>(emitter: &E, operation: &str) -> TranspileError {
    TranspileError::UnsupportedOperation {
        operation: operation.to_string(),
        target: emitter.target().to_string(),
    }
}

/// Double-quoted string literal with backslash escapes, shared by every target.
pub(crate) fn quote_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

pub(crate) fn render_literal<E: Emitter + ?Sized>(
    emitter: &E,
    value: &Value,
) -> Result<String, TranspileError> {
    match value {
        Value::Number(_) => Ok(value.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Text(s) => Ok(quote_string(s)),
        Value::Null => emitter
            .null_literal()
            .map(str::to_string)
            .ok_or_else(|| unsupported(emitter, "null literal")),
    }
}

pub(crate) fn render_operand<E: Emitter + ?Sized>(
    emitter: &E,
    operand: &Operand,
) -> Result<String, TranspileError> {
    match operand {
        Operand::Literal(value) => emitter.literal(value),
        Operand::Variable(var) => Ok(emitter.variable(var)),
    }
}

pub(crate) fn default_condition_op<E: Emitter + ?Sized>(
    emitter: &E,
    op: Operator,
) -> Result<&'static str, TranspileError> {
    match op {
        Operator::Equals => Ok("=="),
        Operator::NotEquals => Ok("!="),
        Operator::GreaterThan => Ok(">"),
        Operator::LessThan => Ok("<"),
        Operator::GreaterThanOrEqual => Ok(">="),
        Operator::LessThanOrEqual => Ok("<="),
        other => Err(unsupported(emitter, other.as_str())),
    }
}

/// The value a binary rule compares against; a missing value is an error.
pub(crate) fn rule_value<E: Emitter + ?Sized>(
    emitter: &E,
    rule: &Rule,
) -> Result<String, TranspileError> {
    let operand = rule
        .value
        .as_ref()
        .ok_or_else(|| TranspileError::MissingValue {
            operation: rule.operator.as_str().to_string(),
            variable: rule.variable.to_string(),
        })?;
    render_operand(emitter, operand)
}

pub(crate) fn render_rule<E: Emitter + ?Sized>(
    emitter: &E,
    rule: &Rule,
) -> Result<String, TranspileError> {
    let var = emitter.variable(&rule.variable);
    match rule.operator {
        Operator::IsTrue => Ok(format!("{} == true", var)),
        Operator::IsFalse => Ok(format!("{} == false", var)),
        Operator::IsNil => {
            let null = emitter
                .null_literal()
                .ok_or_else(|| unsupported(emitter, Operator::IsNil.as_str()))?;
            Ok(format!("{} == {}", var, null))
        }
        op => {
            let token = emitter.condition_op(op)?;
            let value = rule_value(emitter, rule)?;
            Ok(format!("{} {} {}", var, token, value))
        }
    }
}

/// The value an assignment writes; a missing value is an error.
pub(crate) fn assignment_value<E: Emitter + ?Sized>(
    emitter: &E,
    assignment: &Assignment,
) -> Result<String, TranspileError> {
    let operand = assignment
        .value
        .as_ref()
        .ok_or_else(|| TranspileError::MissingValue {
            operation: assignment.operation.as_str().to_string(),
            variable: assignment.variable.to_string(),
        })?;
    render_operand(emitter, operand)
}

pub(crate) fn render_assignment<E: Emitter + ?Sized>(
    emitter: &E,
    assignment: &Assignment,
) -> Result<String, TranspileError> {
    let var = emitter.variable(&assignment.variable);
    let t = emitter.terminator();
    match assignment.operation {
        Operation::Set => Ok(format!(
            "{} = {}{}",
            var,
            assignment_value(emitter, assignment)?,
            t
        )),
        Operation::Add => Ok(format!(
            "{} = {} + {}{}",
            var,
            var,
            assignment_value(emitter, assignment)?,
            t
        )),
        Operation::Subtract => Ok(format!(
            "{} = {} - {}{}",
            var,
            var,
            assignment_value(emitter, assignment)?,
            t
        )),
        Operation::SetTrue => Ok(format!("{} = true{}", var, t)),
        Operation::SetFalse => Ok(format!("{} = false{}", var, t)),
        Operation::Toggle => Ok(format!("{} = {}{}{}", var, emitter.negation(), var, t)),
        Operation::Clear => {
            let null = emitter
                .null_literal()
                .ok_or_else(|| unsupported(emitter, Operation::Clear.as_str()))?;
            Ok(format!("{} = {}{}", var, null, t))
        }
        Operation::SetIfUnset => {
            let value = assignment_value(emitter, assignment)?;
            emitter.emit_set_if_unset(&var, &value)
        }
    }
}
