use crate::error::EvaluateError;
use crate::tpl::ast::{Branch, Node};
use crate::tpl::resolver::{Context, Lookup};
use crate::value::Value;
use std::borrow::Cow;
use std::collections::HashMap;
use std::iter;
use std::rc::Rc;

pub type Fragment<'a> = Result<Cow<'a, str>, EvaluateError>;

/// Lazy stream of output fragments. An `Err` item ends the render.
pub type Fragments<'a> = Box<dyn Iterator<Item = Fragment<'a>> + 'a>;

impl Node {
    /// Produces this node's output for `ctx` as a lazy fragment stream.
    ///
    /// Each call starts a fresh stream. Guards and loop collections are
    /// resolved when the stream reaches the node.
    pub fn emit<'a>(&'a self, ctx: Context<'a>) -> Fragments<'a> {
        match self {
            Node::Literal(text) => Box::new(iter::once(Ok(Cow::Borrowed(text.as_str())))),
            Node::Print(path) => Box::new(iter::once_with(move || {
                ctx.resolve(path).map(|v| Cow::Owned(v.to_string()))
            })),
            Node::Conditional { branches } => match select_branch(branches, &ctx) {
                Ok(Some(body)) => emit_all(body, ctx),
                Ok(None) => Box::new(iter::empty()),
                Err(e) => Box::new(iter::once(Err(e))),
            },
            Node::Loop { path, body } => match loop_items(path, &ctx) {
                Ok(items) => Box::new(
                    items
                        .into_iter()
                        .flat_map(move |item| emit_all(body, ctx.with_item(item))),
                ),
                Err(e) => Box::new(iter::once(Err(e))),
            },
            Node::Root { children } => emit_all(children, ctx),
        }
    }

    /// Drains `emit` into a string, failing on the first error.
    pub fn process(&self, ctx: Context<'_>) -> Result<String, EvaluateError> {
        self.emit(ctx).collect()
    }
}

fn emit_all<'a>(nodes: &'a [Node], ctx: Context<'a>) -> Fragments<'a> {
    Box::new(nodes.iter().flat_map(move |node| node.emit(ctx.clone())))
}

/// Body of the first branch whose guard is truthy, else the `else` body.
fn select_branch<'a>(
    branches: &'a [Branch],
    ctx: &Context<'_>,
) -> Result<Option<&'a [Node]>, EvaluateError> {
    for branch in branches {
        match &branch.guard {
            Some(guard) => {
                if ctx.resolve(guard)?.is_truthy() {
                    return Ok(Some(branch.body.as_slice()));
                }
            }
            None => return Ok(Some(branch.body.as_slice())),
        }
    }
    Ok(None)
}

/// Values bound to `item` on each iteration.
///
/// Maps yield `{key, value}` pairs in ascending key order, lists their
/// elements, strings their characters.
fn loop_items(path: &str, ctx: &Context<'_>) -> Result<Vec<Rc<Value>>, EvaluateError> {
    let value = ctx.resolve(path)?;
    match &*value {
        Value::Map(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Ok(entries
                .into_iter()
                .map(|(key, value)| {
                    let mut pair = HashMap::with_capacity(2);
                    pair.insert("key".to_string(), Value::Str(key.clone()));
                    pair.insert("value".to_string(), value.clone());
                    Rc::new(Value::Map(pair))
                })
                .collect())
        }
        Value::List(list) => Ok(list.iter().cloned().map(Rc::new).collect()),
        Value::Str(s) => Ok(s
            .chars()
            .map(|c| Rc::new(Value::Str(c.to_string())))
            .collect()),
        other => Err(EvaluateError::NotIterable {
            path: path.to_string(),
            value: other.describe(),
        }),
    }
}
