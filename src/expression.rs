//! Legacy condition and value expressions.
//!
//! Expressions are opaque to the engine and delegated to an
//! [`ExpressionEvaluator`]. [`SimpleExpressionEvaluator`] understands the
//! small subset rule authors use most:
//!
//! - the empty expression, which is `true` as a condition
//! - string (`"text"` or `'text'`), integer, float and boolean literals
//! - `this.<Property>` reads a property of the record
//! - `ThisNode.ClassName` yields the record's class name without schema
//! - `<operand> = <operand>` and `<operand> <> <operand>`

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::store::{ExpressionContext, ExpressionEvaluator, StoreError};
use crate::value::Value;

/// An opaque expression string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Expr(String);

impl Expr {
    /// Wraps an expression string.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Returns the expression text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the expression is blank.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for Expr {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

static COMPARISON: OnceLock<Regex> = OnceLock::new();
static PROPERTY: OnceLock<Regex> = OnceLock::new();
static LITERAL: OnceLock<Regex> = OnceLock::new();

fn compiled(cell: &'static OnceLock<Regex>, pattern: &str) -> Result<&'static Regex, StoreError> {
    if let Some(re) = cell.get() {
        return Ok(re);
    }
    let re = Regex::new(pattern)
        .map_err(|e| StoreError::Backend(format!("invalid regex '{pattern}': {e}")))?;
    // Another thread may have initialized it while we compiled.
    Ok(cell.get_or_init(|| re))
}

/// Evaluator for the common expression subset.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleExpressionEvaluator;

impl SimpleExpressionEvaluator {
    /// Creates the evaluator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn operand(text: &str, ctx: &ExpressionContext<'_>) -> Result<Value, StoreError> {
        let text = text.trim();

        let literal = compiled(&LITERAL, r#"^(?:"([^"]*)"|'([^']*)')$"#)?;
        if let Some(caps) = literal.captures(text) {
            let s = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            return Ok(Value::String(s.to_string()));
        }

        match text {
            "true" | "TRUE" | "True" => return Ok(Value::Bool(true)),
            "false" | "FALSE" | "False" => return Ok(Value::Bool(false)),
            "ThisNode.ClassName" => {
                return Ok(Value::String(ctx.instance.class.short_name().to_string()));
            }
            _ => {}
        }

        if let Ok(v) = text.parse::<i64>() {
            return Ok(Value::Int(v));
        }
        if let Ok(v) = text.parse::<f64>() {
            return Ok(Value::Float(v));
        }

        let property = compiled(&PROPERTY, r"^this\.([A-Za-z_][A-Za-z0-9_]*)$")?;
        if let Some(caps) = property.captures(text) {
            let name = caps.get(1).map_or("", |m| m.as_str());
            return ctx.instances.read_property(ctx.instance, name);
        }

        Err(StoreError::Expression(format!("unsupported expression '{text}'")))
    }
}

impl ExpressionEvaluator for SimpleExpressionEvaluator {
    fn evaluate(&self, expr: &Expr, ctx: &ExpressionContext<'_>) -> Result<Value, StoreError> {
        let text = expr.as_str().trim();
        if text.is_empty() {
            return Ok(Value::Bool(true));
        }

        let comparison = compiled(&COMPARISON, r"^(.+?)\s*(<>|=)\s*(.+)$")?;
        if let Some(caps) = comparison.captures(text) {
            let lhs = Self::operand(caps.get(1).map_or("", |m| m.as_str()), ctx)?;
            let rhs = Self::operand(caps.get(3).map_or("", |m| m.as_str()), ctx)?;
            let equal = lhs == rhs || lhs.display_string() == rhs.display_string();
            let negate = caps.get(2).is_some_and(|m| m.as_str() == "<>");
            return Ok(Value::Bool(equal != negate));
        }

        Self::operand(text, ctx)
    }
}
