//! Dotted-path expression interpreter.
//!
//! Expressions are a `.`-separated chain of segments evaluated left to right
//! from the page's global object:
//!
//! ```text
//! document.title
//! document.querySelector('#main').innerText
//! localStorage.getItem(token)
//! ```
//!
//! A segment of the form `name(args)` calls the method `name` on the previous
//! value with comma-separated string arguments; anything else is a property
//! read. Nothing else is executed, so arbitrary code cannot run.

use serde_json::Value;

use crate::error::EvalError;
use crate::runtime::{JsValue, ObjectModel};

/// One step of a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub name: String,
    /// `Some` for call segments, holding the already-unquoted arguments.
    pub args: Option<Vec<String>>,
}

impl Segment {
    pub fn property(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: None,
        }
    }

    pub fn call(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args: Some(args),
        }
    }

    pub fn is_call(&self) -> bool {
        self.args.is_some()
    }
}

/// A parsed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    segments: Vec<Segment>,
}

impl Expression {
    /// Parse an expression. Every input parses; segments that do not look
    /// like calls are treated as property names verbatim.
    pub fn parse(input: &str) -> Self {
        let segments = input.trim().split('.').map(parse_segment).collect();
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

fn parse_segment(part: &str) -> Segment {
    let call = part
        .strip_suffix(')')
        .and_then(|inner| inner.split_once('('))
        .filter(|(name, _)| is_identifier(name));
    match call {
        Some((name, args)) => Segment::call(name, split_args(args)),
        None => Segment::property(part),
    }
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn split_args(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(',').map(|arg| unquote(arg.trim()).to_string()).collect()
}

/// Strip one leading and one trailing quote character.
fn unquote(arg: &str) -> &str {
    let is_quote = |c: char| c == '\'' || c == '"';
    let arg = arg.strip_prefix(is_quote).unwrap_or(arg);
    arg.strip_suffix(is_quote).unwrap_or(arg)
}

/// Evaluate `input` against `model` and coerce the final value.
///
/// Nodes become their text content, objects their JSON text, and primitives
/// are returned as-is.
pub async fn evaluate<M>(model: &M, input: &str) -> Result<Value, EvalError>
where
    M: ObjectModel + ?Sized,
{
    let expression = Expression::parse(input);
    let mut current = model.root().await?;

    for segment in expression.segments() {
        if current.is_null() {
            return Err(EvalError::NullDereference(segment.name.clone()));
        }
        current = match &segment.args {
            Some(args) => model.invoke(&current, &segment.name, args).await?,
            None => model.property(&current, &segment.name).await?,
        };
        if current.is_undefined() {
            return Err(EvalError::UndefinedPath(segment.name.clone()));
        }
    }

    coerce(model, current).await
}

async fn coerce<M>(model: &M, value: JsValue) -> Result<Value, EvalError>
where
    M: ObjectModel + ?Sized,
{
    Ok(match value {
        JsValue::Node(node) => model.text_content(&node).await?,
        JsValue::Object(object) => model.to_json(&object).await?,
        JsValue::Scalar(v) => v,
        JsValue::Undefined => Value::Null,
    })
}

#[cfg(test)]
#[path = "eval_tests.rs"]
mod tests;
