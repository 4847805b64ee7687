//! Deferred values, resolved against the context at render time.

use std::{fmt::{self, Debug},
          sync::Arc};

use anyhow::{bail, Result};
use kstring::KString;

use crate::context::{Context, Value};

/// Bound on transitive resolution; a chain longer than this is
/// reported as an error instead of looping.
const MAX_RESOLVE_STEPS: usize = 64;

/// A user function evaluated with the context at render time.
#[derive(Clone)]
pub struct ContextFn(Arc<dyn Fn(&Context) -> Result<Value> + Send + Sync>);

impl ContextFn {
    pub fn new(f: impl Fn(&Context) -> Result<Value> + Send + Sync + 'static) -> Self {
        ContextFn(Arc::new(f))
    }

    pub fn call(&self, ctx: &Context) -> Result<Value> {
        (self.0)(ctx)
    }
}

impl Debug for ContextFn {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ContextFn(..)")
    }
}

/// A zero-argument callable stored in the context; lookup invokes it
/// in place of the stored value.
#[derive(Clone)]
pub struct Thunk(Arc<dyn Fn() -> Result<Value> + Send + Sync>);

impl Thunk {
    pub fn new(f: impl Fn() -> Result<Value> + Send + Sync + 'static) -> Self {
        Thunk(Arc::new(f))
    }

    pub fn call(&self) -> Result<Value> {
        (self.0)()
    }
}

impl Debug for Thunk {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Thunk(..)")
    }
}

/// A deferred computation placed in a tree or an attribute; resolved
/// when rendering reaches it.
#[derive(Clone, Debug)]
pub enum Lazy {
    /// Dotted-path lookup into the context, e.g. `"user.name"`.
    Lookup(KString),
    /// Arbitrary computation over the context.
    Func(ContextFn),
}

impl Lazy {
    pub fn resolve(&self, ctx: &Context) -> Result<Value> {
        match self {
            Lazy::Lookup(path) => resolve_lookup(ctx, path),
            Lazy::Func(f) => f.call(ctx),
        }
    }

    /// Place this lazy value directly into a tree.
    pub fn into_node(self) -> crate::node::Node {
        crate::node::Node::Lazy(self)
    }

    /// Derive a lazy that resolves a further dotted path on the
    /// result of this one.
    pub fn sub(self, path: impl Into<KString>) -> Lazy {
        let path = path.into();
        Lazy::Func(ContextFn::new(move |ctx| {
            let base = resolve_lazy(Value::Lazy(self.clone()), ctx)?;
            let mut current = base;
            for bit in path.split('.') {
                current = match lookup_step(&current, bit) {
                    Some(v) => force_thunks(v)?,
                    None => return Ok(Value::None),
                };
            }
            Ok(current)
        }))
    }
}

/// A lazy context lookup for the dotted `path`.
pub fn lookup(path: impl Into<KString>) -> Lazy {
    Lazy::Lookup(path.into())
}

/// A lazy computation over the context.
pub fn context_fn(f: impl Fn(&Context) -> Result<Value> + Send + Sync + 'static) -> Lazy {
    Lazy::Func(ContextFn::new(f))
}

/// Resolve `value` transitively until it is neither lazy nor a thunk.
pub fn resolve_lazy(value: Value, ctx: &Context) -> Result<Value> {
    let mut current = value;
    for _ in 0..MAX_RESOLVE_STEPS {
        current = match current {
            Value::Lazy(l) => l.resolve(ctx)?,
            Value::Thunk(t) => t.call()?,
            other => return Ok(other),
        };
    }
    bail!("lazy resolution chain exceeded {MAX_RESOLVE_STEPS} steps")
}

/// One path segment: mapping-key access, then list-index access.
/// `None` means the segment cannot be resolved here.
fn lookup_step(current: &Value, bit: &str) -> Option<Value> {
    match current {
        Value::Map(m) => m.get(bit).cloned(),
        Value::List(items) => bit.parse::<usize>().ok().and_then(|i| items.get(i).cloned()),
        _ => None,
    }
}

/// Invoke zero-argument callables met along a lookup. A failure
/// raised by the callable's own body propagates; this is what keeps
/// lookup misses silent but genuine errors visible.
fn force_thunks(value: Value) -> Result<Value> {
    let mut current = value;
    for _ in 0..MAX_RESOLVE_STEPS {
        match current {
            Value::Thunk(t) => current = t.call()?,
            other => return Ok(other),
        }
    }
    bail!("thunk chain exceeded {MAX_RESOLVE_STEPS} steps")
}

/// Resolve a dotted `path` against the context. Any segment that
/// cannot be resolved yields `Value::None`; errors from invoked
/// callables propagate unchanged.
pub fn resolve_lookup(ctx: &Context, path: &str) -> Result<Value> {
    let mut current: Option<Value> = None;
    for bit in path.split('.') {
        let next = match &current {
            None => ctx.get(bit).cloned(),
            Some(v) => lookup_step(v, bit),
        };
        current = match next {
            Some(v) => Some(force_thunks(v)?),
            None => return Ok(Value::None),
        };
    }
    Ok(current.unwrap_or(Value::None))
}
