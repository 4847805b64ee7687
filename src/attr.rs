//! Attribute construction, flattening and merging.

use std::sync::Arc;

use anyhow::{bail, Result};
use kstring::KString;

use crate::{context::{Context, Value},
            escape::escape_into,
            lazy::resolve_lazy,
            node::{Group, Node},
            render::{eval_value, RenderState}};

/// An attribute entry for a tag constructor. `None` entries (from
/// `opt_att`) are skipped.
pub fn att(key: impl Into<KString>, val: impl Into<Value>) -> Option<(KString, Value)> {
    Some((key.into(), val.into()))
}

/// An attribute that is present only when `val` is.
pub fn opt_att<V: Into<Value>>(key: impl Into<KString>,
                               val: Option<V>) -> Option<(KString, Value)> {
    val.map(|val| (key.into(), val.into()))
}

/// Things that can serve as the attribute list of a tag constructor.
pub trait ToAttrs {
    fn to_attrs(self) -> Vec<(KString, Value)>;
}

impl<const N: usize> ToAttrs for [Option<(KString, Value)>; N] {
    fn to_attrs(self) -> Vec<(KString, Value)> {
        self.into_iter().flatten().collect()
    }
}
impl ToAttrs for Vec<(KString, Value)> {
    fn to_attrs(self) -> Vec<(KString, Value)> {
        self
    }
}
impl ToAttrs for () {
    fn to_attrs(self) -> Vec<(KString, Value)> {
        Vec::new()
    }
}

/// Attribute-name transform: a leading underscore is stripped (so
/// names can dodge reserved words), remaining underscores become
/// hyphens.
pub fn attr_key(key: &str) -> KString {
    let key = key.strip_prefix('_').unwrap_or(key);
    if key.contains('_') {
        KString::from_string(key.replace('_', "-"))
    } else {
        KString::from_ref(key)
    }
}

/// Emit ` key="value"` pairs for all present attributes, resolving
/// lazy values and evaluating sub-trees. Booleans follow the HTML
/// boolean-attribute convention: `true` emits the bare key, `false`
/// omits it (except for the literal name "value", which keeps its
/// text form).
pub(crate) fn flat_attrs(attrs: &[(KString, Value)],
                         ctx: &Context,
                         st: &mut RenderState,
                         out: &mut String) -> Result<()> {
    for (key, value) in attrs {
        let key = attr_key(key);
        let mut value = resolve_lazy(value.clone(), ctx)?;
        let mut from_subtree = false;
        while let Value::Node(n) = value {
            value = eval_value(&n, ctx, st)?;
            from_subtree = true;
        }
        if from_subtree {
            // A sub-tree that rendered to nothing suppresses the
            // attribute entirely.
            match &value {
                Value::Str(s) if s.is_empty() => continue,
                Value::Safe(s) if s.is_empty() => continue,
                _ => {}
            }
        }
        match value {
            Value::None => {}
            Value::Bool(b) if key.as_str() != "value" => {
                if b {
                    out.push(' ');
                    out.push_str(&key);
                }
            }
            Value::Bool(b) => emit_attr(out, &key, if b { "true" } else { "false" }),
            Value::Safe(s) => {
                out.push(' ');
                out.push_str(&key);
                out.push_str("=\"");
                out.push_str(s.as_str());
                out.push('"');
            }
            Value::Str(s) => emit_attr(out, &key, &s),
            Value::Int(i) => emit_attr(out, &key, &i.to_string()),
            Value::Float(f) => emit_attr(out, &key, &f.to_string()),
            Value::List(_) | Value::Map(_) => {
                bail!("unsupported value type for attribute {:?}", key.as_str())
            }
            // resolve_lazy/eval_value have run already.
            Value::Lazy(_) | Value::Thunk(_) => {
                bail!("unresolved lazy value for attribute {:?}", key.as_str())
            }
            // Drained by the `while let Value::Node` loop above.
            Value::Node(_) => unreachable!("Node values are drained before match"),
        }
    }
    Ok(())
}

fn emit_attr(out: &mut String, key: &str, value: &str) {
    out.push(' ');
    out.push_str(key);
    out.push_str("=\"");
    escape_into(out, value);
    out.push('"');
}

fn attr_separator(key: &str) -> &'static str {
    if key == "style" {
        ";"
    } else if key.len() > 2
        && key.starts_with("on")
        && key.chars().all(|c| c.is_ascii_lowercase())
    {
        // Event-handler attributes chain statements.
        ";"
    } else {
        // class and everything else.
        " "
    }
}

fn join_attr_values(old: Value, sep: &'static str, new: Value) -> Value {
    match (old, new) {
        (Value::Str(a), Value::Str(b)) => {
            Value::Str(KString::from_string(format!("{a}{sep}{b}")))
        }
        // At least one side is lazy, safe or a sub-tree: join
        // structurally so it is still resolved at render time.
        (old, new) => Value::Node(Arc::new(Node::Group(Group(vec![
            Node::from_value(old),
            Node::String(KString::from_static(sep)),
            Node::from_value(new),
        ])))),
    }
}

/// Merge two attribute lists. Keys present on both sides get their
/// values joined with a per-key separator (space for class-like keys,
/// semicolon for style and event-handler keys), so derived components
/// can add to an attribute without clobbering it. One-sided keys pass
/// through unchanged.
pub fn merge_attrs(base: impl ToAttrs, overrides: impl ToAttrs) -> Vec<(KString, Value)> {
    let mut merged = base.to_attrs();
    for (key, newval) in overrides.to_attrs() {
        let norm = attr_key(&key);
        if let Some(slot) = merged.iter_mut().find(|(k, _)| attr_key(k) == norm) {
            let old = std::mem::take(&mut slot.1);
            slot.1 = join_attr_values(old, attr_separator(&norm), newval);
        } else {
            merged.push((key, newval));
        }
    }
    merged
}
