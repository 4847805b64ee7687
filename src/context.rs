//! Runtime values and the context mapping that rendering resolves
//! against.

use std::{collections::HashMap,
          fmt::{self, Debug},
          sync::Arc};

use kstring::KString;

use crate::{error::ErrorHandler,
            escape::SafeString,
            lazy::{Lazy, Thunk},
            node::Node};

/// A runtime value: what lazy resolution produces, what attribute
/// values and `If` branches hold, and what contexts map names to.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(KString),
    Safe(SafeString),
    List(Vec<Value>),
    Map(HashMap<KString, Value>),
    /// A sub-tree as a value.
    Node(Arc<Node>),
    /// A deferred computation, resolved transitively at use time.
    Lazy(Lazy),
    /// A zero-argument callable, invoked during lookup.
    Thunk(Thunk),
}

impl Value {
    /// Host-language truthiness: absent, false, zero and empty
    /// containers are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Safe(s) => !s.is_empty(),
            Value::List(l) => !l.is_empty(),
            Value::Map(m) => !m.is_empty(),
            Value::Node(n) => n.is_truthy(),
            // Unresolved deferred values count as present; resolve
            // first where the distinction matters.
            Value::Lazy(_) | Value::Thunk(_) => true,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(KString::from_ref(s))
    }
}
impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(KString::from_string(s))
    }
}
impl From<KString> for Value {
    fn from(s: KString) -> Self {
        Value::Str(s)
    }
}
impl From<SafeString> for Value {
    fn from(s: SafeString) -> Self {
        Value::Safe(s)
    }
}
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}
impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}
impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}
impl From<usize> for Value {
    fn from(i: usize) -> Self {
        Value::Int(i as i64)
    }
}
impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}
impl From<Lazy> for Value {
    fn from(l: Lazy) -> Self {
        Value::Lazy(l)
    }
}
impl From<Thunk> for Value {
    fn from(t: Thunk) -> Self {
        Value::Thunk(t)
    }
}
impl From<Node> for Value {
    fn from(n: Node) -> Self {
        Value::Node(Arc::new(n))
    }
}
impl From<Vec<Value>> for Value {
    fn from(l: Vec<Value>) -> Self {
        Value::List(l)
    }
}
impl From<std::ops::Range<i64>> for Value {
    fn from(r: std::ops::Range<i64>) -> Self {
        Value::List(r.map(Value::Int).collect())
    }
}
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::None,
        }
    }
}

/// Make a context or scope binding; the value-side analog of `att`.
pub fn bind(key: impl Into<KString>, val: impl Into<Value>) -> (KString, Value) {
    (key.into(), val.into())
}

/// The key/value mapping a tree is rendered against. Treated as
/// immutable during a render; scoped constructs work on derived
/// copies.
#[derive(Clone, Default)]
pub struct Context {
    vars: HashMap<KString, Value>,
    error_handler: Option<ErrorHandler>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion.
    pub fn with(mut self, key: impl Into<KString>, value: impl Into<Value>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<KString>, value: impl Into<Value>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.vars.get(key)
    }

    /// Install a render-failure handler; see `crate::error`.
    pub fn with_error_handler(mut self, handler: ErrorHandler) -> Self {
        self.error_handler = Some(handler);
        self
    }

    pub(crate) fn handler(&self) -> Option<&ErrorHandler> {
        self.error_handler.as_ref()
    }

    /// A copy of this context with `overrides` applied on top;
    /// overrides win on key collision. The original is untouched.
    pub fn derived(&self, overrides: impl IntoIterator<Item = (KString, Value)>) -> Context {
        let mut ctx = self.clone();
        ctx.vars.extend(overrides);
        ctx
    }
}

impl Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Context")
            .field("vars", &self.vars)
            .field("error_handler",
                   &self.error_handler.as_ref().map(|_| "(handler)"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_truthiness() {
        assert!(!Value::None.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::Str(KString::from_static("")).is_truthy());
        assert!(!Value::List(vec![]).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Int(-1).is_truthy());
        assert!(Value::from("x").is_truthy());
    }

    #[test]
    fn t_derived_does_not_touch_parent() {
        let parent = Context::new().with("x", 1);
        let child = parent.derived([bind("x", 2), bind("y", 3)]);
        assert!(matches!(parent.get("x"), Some(Value::Int(1))));
        assert!(parent.get("y").is_none());
        assert!(matches!(child.get("x"), Some(Value::Int(2))));
        assert!(matches!(child.get("y"), Some(Value::Int(3))));
    }

    #[test]
    fn t_range_value() {
        match Value::from(0..3) {
            Value::List(l) => assert_eq!(l.len(), 3),
            _ => panic!("expected list"),
        }
    }
}
