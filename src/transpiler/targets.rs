use super::{
    Emitter, assignment_value, default_condition_op, render_rule, rule_value, unsupported,
};
use crate::ast::{Assignment, Logic, Operation, Operator, Rule, VariableRef};
use crate::error::TranspileError;
use crate::helpers::sanitize_identifier;

/// `sheet_variable`, the flat identifier form used by Ink and Yarn.
fn flat_name(var: &VariableRef) -> String {
    sanitize_identifier(&format!("{}_{}", var.sheet, var.variable))
}

/// Ink: `~ x = v` statements and `not` for unset checks. Ink has no null,
/// so a cleared variable holds `0` and "unset" means falsy.
pub struct InkEmitter;

impl Emitter for InkEmitter {
    fn target(&self) -> &'static str {
        "ink"
    }

    fn variable(&self, var: &VariableRef) -> String {
        flat_name(var)
    }

    fn null_literal(&self) -> Option<&'static str> {
        None
    }

    fn negation(&self) -> &'static str {
        "not "
    }

    fn terminator(&self) -> &'static str {
        ""
    }

    fn condition_op(&self, op: Operator) -> Result<&'static str, TranspileError> {
        match op {
            Operator::Contains => Ok("?"),
            Operator::NotContains => Ok("!?"),
            other => default_condition_op(self, other),
        }
    }

    fn emit_rule(&self, rule: &Rule) -> Result<String, TranspileError> {
        match rule.operator {
            Operator::IsNil => Ok(format!("not {}", self.variable(&rule.variable))),
            _ => render_rule(self, rule),
        }
    }

    fn emit_assignment(&self, assignment: &Assignment) -> Result<String, TranspileError> {
        let var = self.variable(&assignment.variable);
        Ok(match assignment.operation {
            Operation::Set => format!("~ {} = {}", var, assignment_value(self, assignment)?),
            Operation::Add => format!("~ {} += {}", var, assignment_value(self, assignment)?),
            Operation::Subtract => format!("~ {} -= {}", var, assignment_value(self, assignment)?),
            Operation::SetTrue => format!("~ {} = true", var),
            Operation::SetFalse => format!("~ {} = false", var),
            Operation::Toggle => format!("~ {} = not {}", var, var),
            Operation::Clear => format!("~ {} = 0", var),
            Operation::SetIfUnset => format!(
                "{{ not {}:\n    ~ {} = {}\n}}",
                var,
                var,
                assignment_value(self, assignment)?
            ),
        })
    }
}

/// Yarn Spinner: `<<set $x to v>>`. Yarn variables always hold a typed value,
/// so null checks, clearing and substring tests have no equivalent.
pub struct YarnEmitter;

impl Emitter for YarnEmitter {
    fn target(&self) -> &'static str {
        "yarn"
    }

    fn variable(&self, var: &VariableRef) -> String {
        format!("${}", flat_name(var))
    }

    fn null_literal(&self) -> Option<&'static str> {
        None
    }

    fn terminator(&self) -> &'static str {
        ""
    }

    fn emit_assignment(&self, assignment: &Assignment) -> Result<String, TranspileError> {
        let var = self.variable(&assignment.variable);
        match assignment.operation {
            Operation::Set => Ok(format!(
                "<<set {} to {}>>",
                var,
                assignment_value(self, assignment)?
            )),
            Operation::Add => Ok(format!(
                "<<set {} to {} + {}>>",
                var,
                var,
                assignment_value(self, assignment)?
            )),
            Operation::Subtract => Ok(format!(
                "<<set {} to {} - {}>>",
                var,
                var,
                assignment_value(self, assignment)?
            )),
            Operation::SetTrue => Ok(format!("<<set {} to true>>", var)),
            Operation::SetFalse => Ok(format!("<<set {} to false>>", var)),
            Operation::Toggle => Ok(format!("<<set {} to !{}>>", var, var)),
            op @ (Operation::Clear | Operation::SetIfUnset) => Err(unsupported(self, op.as_str())),
        }
    }
}

/// Dialogue System for Unity: Lua over the `Variable[...]` table.
pub struct UnityEmitter;

impl Emitter for UnityEmitter {
    fn target(&self) -> &'static str {
        "unity"
    }

    fn variable(&self, var: &VariableRef) -> String {
        format!("Variable[\"{}.{}\"]", var.sheet, var.variable)
    }

    fn null_literal(&self) -> Option<&'static str> {
        Some("nil")
    }

    fn negation(&self) -> &'static str {
        "not "
    }

    fn terminator(&self) -> &'static str {
        ""
    }

    fn logic_op(&self, logic: Logic) -> &'static str {
        match logic {
            Logic::All => "and",
            Logic::Any => "or",
        }
    }

    fn condition_op(&self, op: Operator) -> Result<&'static str, TranspileError> {
        match op {
            Operator::NotEquals => Ok("~="),
            other => default_condition_op(self, other),
        }
    }

    fn emit_rule(&self, rule: &Rule) -> Result<String, TranspileError> {
        match rule.operator {
            Operator::Contains | Operator::NotContains => {
                let found = if rule.operator == Operator::Contains {
                    "~="
                } else {
                    "=="
                };
                Ok(format!(
                    "string.find({}, {}, 1, true) {} nil",
                    self.variable(&rule.variable),
                    rule_value(self, rule)?,
                    found
                ))
            }
            _ => render_rule(self, rule),
        }
    }

    fn emit_set_if_unset(&self, var: &str, value: &str) -> Result<String, TranspileError> {
        Ok(format!("if {} == nil then {} = {} end", var, var, value))
    }
}

/// Godot: GDScript-flavoured expressions for a custom dialogue interpreter.
pub struct GodotEmitter;

impl Emitter for GodotEmitter {
    fn target(&self) -> &'static str {
        "godot"
    }

    fn variable(&self, var: &VariableRef) -> String {
        format!("{}.{}", var.sheet, var.variable)
    }

    fn negation(&self) -> &'static str {
        "not "
    }

    fn terminator(&self) -> &'static str {
        ""
    }

    fn logic_op(&self, logic: Logic) -> &'static str {
        match logic {
            Logic::All => "and",
            Logic::Any => "or",
        }
    }

    fn emit_rule(&self, rule: &Rule) -> Result<String, TranspileError> {
        match rule.operator {
            Operator::Contains => Ok(format!(
                "{} in {}",
                rule_value(self, rule)?,
                self.variable(&rule.variable)
            )),
            Operator::NotContains => Ok(format!(
                "not ({} in {})",
                rule_value(self, rule)?,
                self.variable(&rule.variable)
            )),
            _ => render_rule(self, rule),
        }
    }

    fn emit_set_if_unset(&self, var: &str, value: &str) -> Result<String, TranspileError> {
        Ok(format!("if {} == null: {} = {}", var, var, value))
    }
}

/// Unreal: C-like strings evaluated by a DataTable-driven dialogue component.
pub struct UnrealEmitter;

impl Emitter for UnrealEmitter {
    fn target(&self) -> &'static str {
        "unreal"
    }

    fn variable(&self, var: &VariableRef) -> String {
        format!("{}.{}", var.sheet, var.variable)
    }

    fn emit_rule(&self, rule: &Rule) -> Result<String, TranspileError> {
        match rule.operator {
            Operator::Contains | Operator::NotContains => {
                let negation = if rule.operator == Operator::NotContains {
                    "!"
                } else {
                    ""
                };
                Ok(format!(
                    "{}Contains({}, {})",
                    negation,
                    self.variable(&rule.variable),
                    rule_value(self, rule)?
                ))
            }
            _ => render_rule(self, rule),
        }
    }
}

/// articy:draft expresso scripts. Global variables are never null.
pub struct ArticyEmitter;

impl Emitter for ArticyEmitter {
    fn target(&self) -> &'static str {
        "articy"
    }

    fn variable(&self, var: &VariableRef) -> String {
        format!("{}.{}", var.sheet, var.variable)
    }

    fn null_literal(&self) -> Option<&'static str> {
        None
    }
}
