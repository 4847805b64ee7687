//! A lazily-evaluated HTML templating and manipulation library.
//!
//! Trees of composable nodes (markup tags, literal text, deferred
//! lookups, conditionals, iterations, scoped context and named
//! fragments) are built once ahead of time and rendered any number of
//! times against different contexts:
//!
//! ```
//! use lazyhtml::{att, div, each, li, lookup, render, ul, Context};
//!
//! let tree = div([att("class", "users")],
//!                ul((), each(lookup("names"), "name",
//!                            li((), lookup("name").into_node()))));
//! let ctx = Context::new().with("names", vec!["ada".into(), "grace".into()]);
//! assert_eq!(render(&tree, &ctx).unwrap(),
//!            "<div class=\"users\"><ul><li>ada</li><li>grace</li></ul></div>");
//! ```
//!
//! Rendering never mutates the tree; the tree functions (`filter`,
//! `wrap`, `delete`, `replace` on [`Node`]) rewrite it between
//! renders.

pub mod attr;
pub mod context;
pub mod error;
pub mod escape;
pub mod format;
pub mod id;
pub mod lazy;
pub mod node;
mod render;
pub mod tags;

use anyhow::Result;

pub use attr::{att, attr_key, merge_attrs, opt_att, ToAttrs};
pub use context::{bind, Context, Value};
pub use error::{ErrorHandler, StructureError};
pub use escape::{escape, mark_safe, SafeString};
pub use format::{format, format_named, Format};
pub use id::html_id;
pub use lazy::{context_fn, lookup, resolve_lazy, resolve_lookup, ContextFn, Lazy,
               Thunk};
pub use node::{each, fragment, group, if_, if_else, raw, scope, text, Each,
               Element, Fragment, Group, If, Node, Scope, ToBody};
pub use tags::{element, ElementMeta};
#[doc(no_inline)]
pub use tags::*;

use render::{try_render_child, RenderState};

/// Non-breaking space.
pub const NBSP: &str = "\u{00A0}";

const DOCTYPE: &str = "<!DOCTYPE html>\n";

/// Serialize `root` against `context`. Rendering failures inside the
/// tree are reported through the context's error handler and appear
/// as inline diagnostic blocks in the output; see `crate::error`.
pub fn render(root: &Node, context: &Context) -> Result<String> {
    let mut out = String::new();
    render_into(root, context, &mut out)?;
    Ok(out)
}

/// Like [`render`], emitting into a caller-owned sink.
pub fn render_into(root: &Node, context: &Context, out: &mut String) -> Result<()> {
    let mut st = RenderState::new(None);
    try_render_child(root, context, &mut st, out)
}

/// Render only the named [`fragment`] of the tree; everything outside
/// it is suppressed, enclosing markup included. An unknown name
/// yields the empty string.
pub fn render_fragment(root: &Node, context: &Context, fragment: &str)
                       -> Result<String> {
    let mut out = String::new();
    let mut st = RenderState::new(Some(fragment));
    try_render_child(root, context, &mut st, &mut out)?;
    Ok(out)
}

/// Serialize a full document: doctype marker, then the tree.
pub fn render_document(root: &Node, context: &Context) -> Result<String> {
    let mut out = String::from(DOCTYPE);
    render_into(root, context, &mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    macro_rules! t {
        ($tree:expr, $ctx:expr, $expected:expr) => {
            assert_eq!(render(&$tree, &$ctx).unwrap(), $expected);
        };
        ($tree:expr, $expected:expr) => {
            t!($tree, Context::new(), $expected);
        };
    }

    #[test]
    fn t_if() {
        t!(if_else(true, "true", "false"), "true");
        t!(if_else(false, "true", "false"), "false");
        t!(if_(false, "true"), "");
        t!(if_else(lookup("cond"), "true", "false"),
           Context::new().with("cond", false),
           "false");
    }

    #[test]
    fn t_iteration() {
        let tree = each(lookup("count"), "i", lookup("i").into_node());
        t!(tree, Context::new().with("count", 0..6), "012345");
        // The iterable can also be given directly.
        t!(each(0..6, "i", lookup("i").into_node()), "012345");
    }

    #[test]
    fn t_iteration_index() {
        let tree = each(lookup("xs"), "x",
                        group([lookup("x_index").into_node(),
                               text(":"),
                               lookup("x").into_node()]));
        let ctx = Context::new().with("xs", vec!["a".into(), "b".into()]);
        t!(tree, ctx, "0:a1:b");
    }

    #[test]
    fn t_iteration_over_string_is_guarded() {
        let tree = each(lookup("s"), "c", lookup("c").into_node());
        let out = render(&tree, &Context::new().with("s", "abc")).unwrap();
        assert!(out.contains("not iterable"));
    }

    #[test]
    fn t_scoped_context() {
        t!(scope([bind("additional", 42)], lookup("additional").into_node()),
           "42");
        t!(scope([bind("additional", 42)],
                 div((), lookup("additional").into_node())),
           "<div>42</div>");
        // The binding shadows an outer value inside the scope only;
        // siblings never see it.
        let tree = group([scope([bind("x", 42)], lookup("x").into_node()),
                          text("|"),
                          lookup("x").into_node()]);
        t!(tree, Context::new().with("x", 1), "42|1");
    }

    #[test]
    fn t_fragments() {
        let tree = div((), [fragment("redpill", div((), "RED!")),
                            fragment("bluepill", div((), "BLUE!"))]);
        let ctx = Context::new();
        assert_eq!(render(&tree, &ctx).unwrap(),
                   "<div><div>RED!</div><div>BLUE!</div></div>");
        assert_eq!(render_fragment(&tree, &ctx, "redpill").unwrap(),
                   "<div>RED!</div>");
        assert_eq!(render_fragment(&tree, &ctx, "bluepill").unwrap(),
                   "<div>BLUE!</div>");
        assert_eq!(render_fragment(&tree, &ctx, "greenpill").unwrap(), "");
    }

    #[test]
    fn t_fragment_behind_condition() {
        let tree = div((), if_(lookup("show"), fragment("inner", "found")));
        let ctx = Context::new().with("show", true);
        assert_eq!(render_fragment(&tree, &ctx, "inner").unwrap(), "found");
        let ctx = Context::new().with("show", false);
        assert_eq!(render_fragment(&tree, &ctx, "inner").unwrap(), "");
    }

    #[test]
    fn t_rendering_is_idempotent() {
        let tree = div([att("class", lookup("c"))],
                       each(lookup("xs"), "x", lookup("x").into_node()));
        let ctx = Context::new()
            .with("c", "k")
            .with("xs", vec![1.into(), 2.into()]);
        let first = render(&tree, &ctx).unwrap();
        let second = render(&tree, &ctx).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, "<div class=\"k\">12</div>");
    }

    #[test]
    fn t_delete_affects_render() {
        let mut tree = div([att("title", if_(true, span((), "gone")))],
                           [span((), "x"), text("kept")]);
        tree.delete(|n, _| {
            matches!(n, Node::Element(e) if e.meta.tag_name == "span")
        });
        // Both the child span and the one nested inside the attribute
        // value are gone.
        assert_eq!(render(&tree, &Context::new()).unwrap(),
                   "<div>kept</div>");
    }

    #[test]
    fn t_document_doctype() {
        assert_eq!(render_document(&html((), ()), &Context::new()).unwrap(),
                   "<!DOCTYPE html>\n<html></html>");
    }

    #[test]
    fn t_lazy_leaf_escapes() {
        t!(div((), lookup("v").into_node()),
           Context::new().with("v", "<&>"),
           "<div>&lt;&amp;&gt;</div>");
        t!(div((), lookup("v").into_node()),
           Context::new().with("v", mark_safe("<b>ok</b>")),
           "<div><b>ok</b></div>");
    }

    #[test]
    fn t_nbsp() {
        assert_eq!(NBSP.as_bytes(), &[0xC2, 0xA0]);
    }
}
