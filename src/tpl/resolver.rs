use crate::error::EvaluateError;
use crate::value::Value;
use std::borrow::Cow;
use std::rc::Rc;

/// Key lookup capability the resolver depends on.
///
/// Lookups borrow from the level where possible. A value that only exists
/// as a view of the level, such as one character of a string, is owned.
pub trait Lookup {
    fn lookup(&self, key: &str) -> Option<Cow<'_, Value>>;

    /// Rendering of this level used in resolution errors.
    fn describe(&self) -> String;
}

fn as_index(key: &str) -> Option<usize> {
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse().ok()
}

impl Lookup for Value {
    /// Map keys by name; list elements and string characters by an
    /// all-digit key.
    fn lookup(&self, key: &str) -> Option<Cow<'_, Value>> {
        match self {
            Value::Map(m) => m.get(key).map(Cow::Borrowed),
            Value::List(l) => as_index(key).and_then(|i| l.get(i)).map(Cow::Borrowed),
            Value::Str(s) => as_index(key)
                .and_then(|i| s.chars().nth(i))
                .map(|c| Cow::Owned(Value::Str(c.to_string()))),
            _ => None,
        }
    }

    fn describe(&self) -> String {
        match self {
            Value::Str(s) => format!("{s:?}"),
            other => other.to_string(),
        }
    }
}

/// The scope a template is evaluated in: the caller's value plus the
/// current loop `item`, if any.
///
/// Cloning is cheap, so each loop iteration gets its own scope and the
/// caller's value is never touched.
#[derive(Clone)]
pub struct Context<'a> {
    root: &'a Value,
    item: Option<Rc<Value>>,
}

impl<'a> Context<'a> {
    pub fn new(root: &'a Value) -> Self {
        Self { root, item: None }
    }

    /// A copy of this scope with `item` bound to `value`.
    pub fn with_item(&self, value: Rc<Value>) -> Self {
        Self {
            root: self.root,
            item: Some(value),
        }
    }

    pub fn resolve(&self, path: &str) -> Result<Cow<'_, Value>, EvaluateError> {
        resolve(path, self)
    }
}

impl Lookup for Context<'_> {
    fn lookup(&self, key: &str) -> Option<Cow<'_, Value>> {
        if key == "item"
            && let Some(item) = &self.item
        {
            return Some(Cow::Borrowed(item.as_ref()));
        }
        self.root.lookup(key)
    }

    /// The root with the bound `item` merged in, as a lookup would see it.
    fn describe(&self) -> String {
        match (&self.item, self.root) {
            (None, root) => root.describe(),
            (Some(item), Value::Map(map)) => {
                let mut scope = map.clone();
                scope.insert("item".to_string(), Value::clone(item));
                Value::Map(scope).describe()
            }
            (Some(item), root) => format!("{} with item {}", root.describe(), item.describe()),
        }
    }
}

/// Resolves a dotted `path` against `context`.
///
/// The whole path is first tried as a literal key, so a flat `"a.b"` key
/// wins over the nested `a -> b`. Otherwise the path is split on its first
/// dot and each half is resolved in turn.
pub fn resolve<'v, C>(path: &str, context: &'v C) -> Result<Cow<'v, Value>, EvaluateError>
where
    C: Lookup + ?Sized,
{
    if let Some(value) = context.lookup(path) {
        return Ok(value);
    }

    match path.split_once('.') {
        Some((head, rest)) => match resolve(head, context)? {
            Cow::Borrowed(next) => resolve(rest, next),
            Cow::Owned(next) => resolve(rest, &next).map(|v| Cow::Owned(v.into_owned())),
        },
        None => Err(EvaluateError::NoSuchKey {
            key: path.to_string(),
            context: context.describe(),
        }),
    }
}
