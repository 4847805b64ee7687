//! Render-failure capture and structural-misuse errors.
//!
//! The rendering discipline is: catch at the nearest enclosing
//! element boundary, emit a visible inline diagnostic, invoke the
//! context's handler, and keep rendering the remaining siblings. The
//! alternative (propagating a wrapped error and aborting the render)
//! is deliberately not offered; one discipline, applied everywhere.

use std::sync::Arc;

use itertools::Itertools;
use kstring::KString;

use crate::{context::Context, escape::escape};

/// Structural misuse caught at construction time, never at render
/// time.
#[derive(Debug, thiserror::Error)]
pub enum StructureError {
    #[error("void element <{tag}> cannot have children")]
    VoidWithChildren { tag: &'static str },
    #[error("element has an empty tag name")]
    EmptyTag,
}

/// A handler invoked with the context and the diagnostic message when
/// rendering a node fails. Installed via
/// `Context::with_error_handler`; the default logs through `tracing`.
pub type ErrorHandler = Arc<dyn Fn(&Context, &str) + Send + Sync>;

/// Build the diagnostic: the chain of enclosing elements, indented,
/// with the failure at the end.
fn diagnostic_message(err: &anyhow::Error, trail: &[KString]) -> String {
    let chain = trail
        .iter()
        .enumerate()
        .map(|(i, d)| format!("{:indent$}{d}", "", indent = i * 2))
        .join("\n");
    let indent = trail.len() * 2;
    format!("{chain}\n{:indent$}{err:#}", "")
}

/// Called at a failed child boundary: report through the handler and
/// substitute a visible inline marker for the child's output.
pub(crate) fn emit_render_error(err: &anyhow::Error,
                                ctx: &Context,
                                trail: &[KString],
                                out: &mut String) {
    let message = diagnostic_message(err, trail);
    match ctx.handler() {
        Some(handler) => handler(ctx, &message),
        None => {
            tracing::error!("error while rendering:\n{message}");
            // The debug form carries the backtrace when one was
            // captured.
            tracing::debug!("{err:?}");
        }
    }

    let shown = escape(&format!("{err:#}"));
    out.push_str("<pre style=\"border: solid 1px red; color: red; padding: 1rem; \
                  background-color: #ffdddd\">");
    out.push_str("    <code>~~~ Exception: ");
    out.push_str(shown.as_str());
    out.push_str(" ~~~</code></pre>");
    out.push_str("<script>alert(\"Error: ");
    out.push_str(shown.as_str());
    out.push_str("\")</script>");
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{context_fn, render, tags::div, Context};

    #[test]
    fn t_diagnostic_names_enclosing_elements() {
        let err = anyhow::anyhow!("boom");
        let trail = vec![KString::from_static("<div>"),
                         KString::from_static("if")];
        let msg = diagnostic_message(&err, &trail);
        assert_eq!(msg, "<div>\n  if\n    boom");
    }

    #[test]
    fn t_failing_child_keeps_siblings_rendering() {
        let tree = div((), [crate::text("before"),
                            crate::node::Node::Lazy(context_fn(|_| {
                                anyhow::bail!("broken value")
                            })),
                            crate::text("after")]);
        let out = render(&tree, &Context::new()).unwrap();
        assert!(out.starts_with("<div>before"));
        assert!(out.contains("~~~ Exception: broken value ~~~"));
        assert!(out.ends_with("after</div>"));
    }

    #[test]
    fn t_handler_hook_is_invoked() {
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        let ctx = Context::new().with_error_handler(Arc::new(move |_ctx, msg| {
            seen2.lock().unwrap().push(msg.to_string());
        }));
        let tree = div((), crate::node::Node::Lazy(context_fn(|_| {
            anyhow::bail!("handled")
        })));
        let _ = render(&tree, &ctx).unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("<div>"));
        assert!(seen[0].contains("handled"));
    }
}
