//! Depth-first rendering of node trees against a context.
//!
//! Rendering emits into a caller-supplied `String` sink, depth-first
//! and left-to-right. Failures below a child boundary are captured
//! there: the boundary emits an inline diagnostic block, invokes the
//! context's handler, and rendering continues with the following
//! siblings (see `crate::error`).

use std::fmt::Write;

use anyhow::{bail, Result};
use kstring::KString;

use crate::{attr::flat_attrs,
            context::{Context, Value},
            error::emit_render_error,
            escape::{escape_into, mark_safe},
            format::render_format,
            lazy::resolve_lazy,
            node::{Each, Fragment, If, Node, Scope}};

/// State threaded through one render call: the fragment target (if
/// any) and the trail of enclosing elements for diagnostics.
pub(crate) struct RenderState<'a> {
    pub fragment: Option<&'a str>,
    pub trail: Vec<KString>,
}

impl<'a> RenderState<'a> {
    pub fn new(fragment: Option<&'a str>) -> Self {
        RenderState {
            fragment,
            trail: Vec::new(),
        }
    }
}

/// Render `child` behind a failure boundary: an error below becomes
/// an inline diagnostic in `out` instead of aborting the surrounding
/// render.
pub(crate) fn try_render_child(child: &Node,
                               ctx: &Context,
                               st: &mut RenderState,
                               out: &mut String) -> Result<()> {
    st.trail.push(child.describe());
    if let Err(e) = render_node(child, ctx, st, out) {
        emit_render_error(&e, ctx, &st.trail, out);
    }
    st.trail.pop();
    Ok(())
}

pub(crate) fn render_node(node: &Node,
                          ctx: &Context,
                          st: &mut RenderState,
                          out: &mut String) -> Result<()> {
    if st.fragment.is_some() {
        return search_fragment(node, ctx, st, out);
    }
    match node {
        Node::None => Ok(()),
        Node::String(s) => {
            escape_into(out, s);
            Ok(())
        }
        Node::Preserialized(s) => {
            out.push_str(s.as_str());
            Ok(())
        }
        Node::Value(v) => render_value(v.clone(), ctx, st, out),
        Node::Lazy(l) => render_value(Value::Lazy(l.clone()), ctx, st, out),
        Node::Group(g) => {
            for child in &g.0 {
                try_render_child(child, ctx, st, out)?;
            }
            Ok(())
        }
        Node::Element(e) => {
            out.push('<');
            out.push_str(e.meta.tag_name);
            flat_attrs(&e.attr, ctx, st, out)?;
            if e.meta.has_closing_tag {
                out.push('>');
                for child in &e.body {
                    try_render_child(child, ctx, st, out)?;
                }
                out.push_str("</");
                out.push_str(e.meta.tag_name);
                out.push('>');
            } else {
                out.push_str(" />");
            }
            Ok(())
        }
        Node::If(n) => render_if(n, ctx, st, out),
        Node::Each(n) => render_each(n, ctx, st, out),
        Node::Scope(n) => render_scope(n, ctx, st, out),
        Node::Fragment(f) => {
            // No target set: a fragment is transparent.
            for child in &f.body {
                try_render_child(child, ctx, st, out)?;
            }
            Ok(())
        }
        Node::Format(f) => render_format(f, ctx, st, out),
    }
}

fn render_if(n: &If,
             ctx: &Context,
             st: &mut RenderState,
             out: &mut String) -> Result<()> {
    let branch = if resolve_lazy(n.condition.clone(), ctx)?.is_truthy() {
        Some(&n.then)
    } else {
        n.otherwise.as_ref()
    };
    match branch {
        Some(v) => render_branch_value(v, ctx, st, out),
        None => Ok(()),
    }
}

/// Render an `If` branch behind its own boundary, like any child.
fn render_branch_value(v: &Value,
                       ctx: &Context,
                       st: &mut RenderState,
                       out: &mut String) -> Result<()> {
    match v {
        Value::Node(n) => try_render_child(n, ctx, st, out),
        other => render_value(other.clone(), ctx, st, out),
    }
}

fn render_each(n: &Each,
               ctx: &Context,
               st: &mut RenderState,
               out: &mut String) -> Result<()> {
    let items = match resolve_lazy(n.over.clone(), ctx)? {
        Value::List(items) => items,
        Value::None => return Ok(()),
        Value::Str(_) | Value::Safe(_) => {
            // A bare string is not iterated character-wise.
            bail!("iteration over {:?}: a string is not iterable", n.var.as_str())
        }
        other => bail!("iteration over {:?}: not a list but {:?}",
                       n.var.as_str(), other),
    };
    let index_key = KString::from_string(format!("{}_index", n.var));
    let mut scoped = ctx.clone();
    for (i, value) in items.into_iter().enumerate() {
        scoped.insert(n.var.clone(), value);
        scoped.insert(index_key.clone(), Value::Int(i as i64));
        try_render_child(&n.body, &scoped, st, out)?;
    }
    Ok(())
}

fn render_scope(n: &Scope,
                ctx: &Context,
                st: &mut RenderState,
                out: &mut String) -> Result<()> {
    let scoped = ctx.derived(n.bindings.iter().cloned());
    for child in &n.body {
        try_render_child(child, &scoped, st, out)?;
    }
    Ok(())
}

/// Render a resolved-or-scalar value as output text.
pub(crate) fn render_value(value: Value,
                           ctx: &Context,
                           st: &mut RenderState,
                           out: &mut String) -> Result<()> {
    match resolve_lazy(value, ctx)? {
        Value::None => Ok(()),
        Value::Node(n) => render_node(&n, ctx, st, out),
        Value::Safe(s) => {
            out.push_str(s.as_str());
            Ok(())
        }
        Value::Str(s) => {
            escape_into(out, &s);
            Ok(())
        }
        Value::Bool(b) => {
            out.push_str(if b { "true" } else { "false" });
            Ok(())
        }
        Value::Int(i) => {
            write!(out, "{i}")?;
            Ok(())
        }
        Value::Float(f) => {
            write!(out, "{f}")?;
            Ok(())
        }
        Value::List(items) => {
            for v in items {
                render_value(v, ctx, st, out)?;
            }
            Ok(())
        }
        Value::Map(_) => bail!("cannot render a map value as text"),
        Value::Lazy(_) | Value::Thunk(_) => {
            unreachable!("resolve_lazy returns a concrete value")
        }
    }
}

/// Evaluate a node as a programmatic value instead of output text:
/// scalar leaves keep their scalar form (so booleans can drive
/// attribute presence), conditionals pass their taken branch through
/// unchanged, anything else renders to its (safe) text.
pub(crate) fn eval_value(node: &Node,
                         ctx: &Context,
                         st: &mut RenderState) -> Result<Value> {
    match node {
        Node::None => Ok(Value::None),
        Node::String(s) => Ok(Value::Str(s.clone())),
        Node::Preserialized(s) => Ok(Value::Safe(s.clone())),
        Node::Value(v) => resolve_lazy(v.clone(), ctx),
        Node::Lazy(l) => {
            match resolve_lazy(Value::Lazy(l.clone()), ctx)? {
                Value::Node(n) => eval_value(&n, ctx, st),
                other => Ok(other),
            }
        }
        Node::If(n) => {
            let branch = if resolve_lazy(n.condition.clone(), ctx)?.is_truthy() {
                Some(&n.then)
            } else {
                n.otherwise.as_ref()
            };
            match branch {
                None => Ok(Value::None),
                Some(v) => match resolve_lazy(v.clone(), ctx)? {
                    Value::Node(n) => eval_value(&n, ctx, st),
                    other => Ok(other),
                },
            }
        }
        other => {
            let mut s = String::new();
            render_node(other, ctx, st, &mut s)?;
            Ok(Value::Safe(mark_safe(s)))
        }
    }
}

/// Fragment search mode: a fragment target is set, so nothing emits
/// output until the named fragment is found; structure (conditions,
/// iterations, scopes) is still evaluated on the way. A fragment with
/// a *different* name renders nothing at all, nested fragments
/// included.
fn search_fragment(node: &Node,
                   ctx: &Context,
                   st: &mut RenderState,
                   out: &mut String) -> Result<()> {
    debug_assert!(st.fragment.is_some());
    match node {
        Node::Fragment(f) => render_searched_fragment(f, ctx, st, out),
        Node::Group(g) => {
            for child in &g.0 {
                try_render_child(child, ctx, st, out)?;
            }
            Ok(())
        }
        Node::Element(e) => {
            // The tag's own markup is suppressed; only the subtree is
            // searched.
            for child in &e.body {
                try_render_child(child, ctx, st, out)?;
            }
            Ok(())
        }
        Node::If(n) => {
            let branch = if resolve_lazy(n.condition.clone(), ctx)?.is_truthy() {
                Some(&n.then)
            } else {
                n.otherwise.as_ref()
            };
            match branch {
                Some(Value::Node(n)) => try_render_child(n, ctx, st, out),
                _ => Ok(()),
            }
        }
        Node::Each(n) => render_each(n, ctx, st, out),
        Node::Scope(n) => render_scope(n, ctx, st, out),
        Node::Lazy(l) => {
            match resolve_lazy(Value::Lazy(l.clone()), ctx)? {
                Value::Node(n) => render_node(&n, ctx, st, out),
                _ => Ok(()),
            }
        }
        // Leaves produce no output while searching.
        Node::None
        | Node::String(_)
        | Node::Preserialized(_)
        | Node::Value(_)
        | Node::Format(_) => Ok(()),
    }
}

fn render_searched_fragment(f: &Fragment,
                            ctx: &Context,
                            st: &mut RenderState,
                            out: &mut String) -> Result<()> {
    let target = st.fragment.expect("search mode");
    if f.name.as_str() == target {
        // Matched: the whole subtree renders normally; nested
        // fragments below it are not filtered further.
        let saved = st.fragment.take();
        for child in &f.body {
            try_render_child(child, ctx, st, out)?;
        }
        st.fragment = saved;
        Ok(())
    } else {
        Ok(())
    }
}
