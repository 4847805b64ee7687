//! Context-aware, escaping-aware string interpolation.
//!
//! Placeholders: `{}` (auto-numbered), `{0}` (positional), `{name}`
//! (named); `{{` and `}}` are literal braces. Escaping is applied per
//! value: literal template segments pass through unescaped only when
//! the template itself is marked safe, substituted values are escaped
//! unless individually safe.

use anyhow::{bail, Result};
use kstring::KString;

use crate::{context::{Context, Value},
            escape::escape_into,
            lazy::resolve_lazy,
            node::Node,
            render::{render_node, RenderState}};

/// The interpolation element; see the module docs.
#[derive(Debug, Clone)]
pub struct Format {
    pub template: Value,
    pub args: Vec<Value>,
    pub named: Vec<(KString, Value)>,
}

/// Interpolation with positional arguments only.
pub fn format(template: impl Into<Value>,
              args: impl IntoIterator<Item = Value>) -> Node {
    Node::Format(Format {
        template: template.into(),
        args: args.into_iter().collect(),
        named: Vec::new(),
    })
}

/// Interpolation with positional and named arguments.
pub fn format_named(template: impl Into<Value>,
                    args: impl IntoIterator<Item = Value>,
                    named: impl IntoIterator<Item = (KString, Value)>) -> Node {
    Node::Format(Format {
        template: template.into(),
        args: args.into_iter().collect(),
        named: named.into_iter().collect(),
    })
}

pub(crate) fn render_format(f: &Format,
                            ctx: &Context,
                            st: &mut RenderState,
                            out: &mut String) -> Result<()> {
    let (template, template_safe) = match resolve_lazy(f.template.clone(), ctx)? {
        Value::Str(s) => (s, false),
        Value::Safe(s) => (s.into_kstring(), true),
        other => bail!("format template must be text, got {other:?}"),
    };

    let mut literal = String::new();
    let mut auto_index = 0usize;
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                let _ = chars.next();
                literal.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                let _ = chars.next();
                literal.push('}');
            }
            '{' => {
                emit_literal(out, &literal, template_safe);
                literal.clear();
                let mut field = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => field.push(c),
                        None => bail!("unclosed placeholder in format template"),
                    }
                }
                let value = field_value(f, &field, &mut auto_index)?;
                emit_value(value, ctx, st, out)?;
            }
            '}' => bail!("stray '}}' in format template"),
            c => literal.push(c),
        }
    }
    emit_literal(out, &literal, template_safe);
    Ok(())
}

fn emit_literal(out: &mut String, literal: &str, safe: bool) {
    if safe {
        out.push_str(literal);
    } else {
        escape_into(out, literal);
    }
}

fn field_value(f: &Format, field: &str, auto_index: &mut usize) -> Result<Value> {
    if field.is_empty() {
        let i = *auto_index;
        *auto_index += 1;
        match f.args.get(i) {
            Some(v) => Ok(v.clone()),
            None => bail!("format placeholder {{}} #{i} has no argument"),
        }
    } else if field.chars().all(|c| c.is_ascii_digit()) {
        let i: usize = field.parse()?;
        match f.args.get(i) {
            Some(v) => Ok(v.clone()),
            None => bail!("format placeholder {{{i}}} has no argument"),
        }
    } else {
        match f.named.iter().find(|(k, _)| k.as_str() == field) {
            Some((_, v)) => Ok(v.clone()),
            None => bail!("format placeholder {{{field}}} has no argument"),
        }
    }
}

/// Substituted values are escaped individually; safe values and
/// rendered sub-trees (whose output is escaped already) pass through.
fn emit_value(value: Value,
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
            out.push_str(&i.to_string());
            Ok(())
        }
        Value::Float(v) => {
            out.push_str(&v.to_string());
            Ok(())
        }
        other => bail!("cannot interpolate {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{escape::mark_safe, lazy::lookup, render, Context};

    macro_rules! t {
        ($tree:expr, $ctx:expr, $expected:expr) => {
            assert_eq!(render(&$tree, &$ctx).unwrap(), $expected);
        };
        ($tree:expr, $expected:expr) => {
            t!($tree, Context::new(), $expected);
        };
    }

    #[test]
    fn t_plain_text() {
        t!(format("xkcd and xhtml are great", []), "xkcd and xhtml are great");
    }

    #[test]
    fn t_template_escaping() {
        t!(format("\"", []), "&quot;");
        t!(format("<>", []), "&lt;&gt;");
        t!(format("&", []), "&amp;");
        t!(format(mark_safe("\""), []), "\"");
        t!(format(mark_safe("<&>"), []), "<&>");
    }

    #[test]
    fn t_arguments() {
        t!(format("test: {}", [Value::from("field1")]), "test: field1");
        t!(format("<>: {}", [Value::from("field1")]), "&lt;&gt;: field1");
        t!(format("<>: {}", [Value::from("&")]), "&lt;&gt;: &amp;");
    }

    #[test]
    fn t_per_value_escaping() {
        // Safe template, raw argument: only the argument is escaped.
        t!(format(mark_safe("<>: {}"), [Value::from("&")]), "<>: &amp;");
        // Raw template, safe argument: only the template is escaped.
        t!(format("<>: {}", [Value::from(mark_safe("&"))]), "&lt;&gt;: &");
        t!(format(mark_safe("<>: {}"), [Value::from(mark_safe("&"))]), "<>: &");
    }

    #[test]
    fn t_named_arguments() {
        t!(format_named(mark_safe("<>: {test}"), [],
                        [(KString::from_static("test"),
                          Value::from(mark_safe("&")))]),
           "<>: &");
    }

    #[test]
    fn t_positional_index() {
        t!(format("{1}{0}", [Value::from("a"), Value::from("b")]), "ba");
    }

    #[test]
    fn t_literal_braces() {
        t!(format("a {{b}} c", []), "a {b} c");
    }

    #[test]
    fn t_lazy_zero_interpolates() {
        // A present-but-falsy value must still substitute.
        let ctx = Context::new().with("zero", 0);
        t!(format("1{}", [Value::from(lookup("zero"))]), ctx, "10");
    }

    #[test]
    fn t_subtree_argument() {
        let tree = format("node: {}",
                          [Value::from(crate::tags::span((), "x & y"))]);
        t!(tree, "node: <span>x &amp; y</span>");
    }

    #[test]
    fn t_unknown_placeholder_is_error() {
        // Rendered at the top boundary, so the failure surfaces as an
        // inline diagnostic rather than an Err.
        let out = render(&format("{nope}", []), &Context::new()).unwrap();
        assert!(out.contains("~~~ Exception:"));
        assert!(out.contains("no argument"));
    }
}
