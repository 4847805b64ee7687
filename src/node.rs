//! The render-tree node types and the tree-introspection functions
//! (filter, wrap, delete, replace).

use std::sync::Arc;

use kstring::KString;

use crate::{context::Value,
            escape::SafeString,
            format::Format,
            lazy::Lazy,
            tags::ElementMeta};

/// One node of a render tree. Constructed once, rendered any number
/// of times; rendering never mutates the tree.
#[derive(Debug, Clone, Default)]
pub enum Node {
    /// Absent; renders to nothing.
    #[default]
    None,
    /// Literal text, escaped at render time.
    String(KString),
    /// Already-escaped text, emitted verbatim.
    Preserialized(SafeString),
    /// A scalar leaf (boolean, number, ...). Mostly useful as an `If`
    /// branch or attribute value, where the raw value matters.
    Value(Value),
    /// A deferred computation resolved at render time.
    Lazy(Lazy),
    /// A plain ordered container without markup of its own.
    Group(Group),
    /// A markup tag with attributes and children.
    Element(Element),
    If(If),
    Each(Each),
    Scope(Scope),
    Fragment(Fragment),
    Format(Format),
}

#[derive(Debug, Clone, Default)]
pub struct Group(pub Vec<Node>);

#[derive(Debug, Clone)]
pub struct Element {
    pub meta: &'static ElementMeta,
    /// Ordered; insertion order is preserved in the output.
    pub attr: Vec<(KString, Value)>,
    pub body: Vec<Node>,
}

/// Conditional: renders `then` when the (possibly lazy) condition is
/// truthy, else `otherwise` when present. Branches are values so that
/// plain booleans survive un-stringified where callers need them
/// (attribute presence).
#[derive(Debug, Clone)]
pub struct If {
    pub condition: Value,
    pub then: Value,
    pub otherwise: Option<Value>,
}

/// Iteration: renders `body` once per element of the resolved list,
/// against a derived context binding `var` and `var_index`.
#[derive(Debug, Clone)]
pub struct Each {
    pub over: Value,
    pub var: KString,
    pub body: Box<Node>,
}

/// Scoped context injection: children see the parent context with the
/// bindings applied on top; siblings do not.
#[derive(Debug, Clone)]
pub struct Scope {
    pub bindings: Vec<(KString, Value)>,
    pub body: Vec<Node>,
}

/// A named sub-tree that can be rendered in isolation.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub name: KString,
    pub body: Vec<Node>,
}

impl Node {
    /// Truthiness for nodes used as values: a container with no
    /// children and empty text count as false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Node::None => false,
            Node::String(s) => !s.is_empty(),
            Node::Preserialized(s) => !s.is_empty(),
            Node::Value(v) => v.is_truthy(),
            Node::Lazy(_) => true,
            Node::Group(g) => !g.0.is_empty(),
            Node::Element(e) => !e.body.is_empty(),
            Node::Scope(s) => !s.body.is_empty(),
            Node::Fragment(f) => !f.body.is_empty(),
            Node::If(_) | Node::Each(_) | Node::Format(_) => true,
        }
    }

    /// Short description for render-failure diagnostics.
    pub(crate) fn describe(&self) -> KString {
        match self {
            Node::None => KString::from_static("(none)"),
            Node::String(_) => KString::from_static("text"),
            Node::Preserialized(_) => KString::from_static("preserialized"),
            Node::Value(_) => KString::from_static("value"),
            Node::Lazy(Lazy::Lookup(path)) => {
                KString::from_string(format!("lookup {path:?}"))
            }
            Node::Lazy(Lazy::Func(_)) => KString::from_static("context fn"),
            Node::Group(_) => KString::from_static("group"),
            Node::Element(e) => {
                KString::from_string(format!("<{}>", e.meta.tag_name))
            }
            Node::If(_) => KString::from_static("if"),
            Node::Each(e) => KString::from_string(format!("each {:?}", e.var.as_str())),
            Node::Scope(_) => KString::from_static("scope"),
            Node::Fragment(f) => {
                KString::from_string(format!("fragment {:?}", f.name.as_str()))
            }
            Node::Format(_) => KString::from_static("format"),
        }
    }

    /// Turn a resolved value back into a node.
    pub fn from_value(v: Value) -> Node {
        match v {
            Value::None => Node::None,
            Value::Str(s) => Node::String(s),
            Value::Safe(s) => Node::Preserialized(s),
            Value::Lazy(l) => Node::Lazy(l),
            Value::Node(n) => Arc::try_unwrap(n).unwrap_or_else(|n| (*n).clone()),
            other => Node::Value(other),
        }
    }

    /// Append a child to a container node. Returns false when the
    /// node kind cannot hold children.
    pub fn push_child(&mut self, child: Node) -> bool {
        match self {
            Node::Group(g) => g.0.push(child),
            Node::Element(e) => e.body.push(child),
            Node::Scope(s) => s.body.push(child),
            Node::Fragment(f) => f.body.push(child),
            _ => return false,
        }
        true
    }
}

// Leaf conversions.

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Node::String(KString::from_ref(s))
    }
}
impl From<String> for Node {
    fn from(s: String) -> Self {
        Node::String(KString::from_string(s))
    }
}
impl From<KString> for Node {
    fn from(s: KString) -> Self {
        Node::String(s)
    }
}
impl From<SafeString> for Node {
    fn from(s: SafeString) -> Self {
        Node::Preserialized(s)
    }
}
impl From<Lazy> for Node {
    fn from(l: Lazy) -> Self {
        Node::Lazy(l)
    }
}
impl From<bool> for Node {
    fn from(b: bool) -> Self {
        Node::Value(Value::Bool(b))
    }
}
impl From<i64> for Node {
    fn from(i: i64) -> Self {
        Node::Value(Value::Int(i))
    }
}
impl From<i32> for Node {
    fn from(i: i32) -> Self {
        Node::Value(Value::Int(i as i64))
    }
}
impl From<Vec<Node>> for Node {
    fn from(body: Vec<Node>) -> Self {
        Node::Group(Group(body))
    }
}

/// Things that can serve as the child list of a container; covers
/// arrays, vectors, a single node and nothing.
pub trait ToBody {
    fn to_body(self) -> Vec<Node>;
}

impl ToBody for Vec<Node> {
    fn to_body(self) -> Vec<Node> {
        self
    }
}
impl<const N: usize> ToBody for [Node; N] {
    fn to_body(self) -> Vec<Node> {
        self.into()
    }
}
impl ToBody for Node {
    fn to_body(self) -> Vec<Node> {
        vec![self]
    }
}
impl ToBody for () {
    fn to_body(self) -> Vec<Node> {
        Vec::new()
    }
}
impl ToBody for &str {
    fn to_body(self) -> Vec<Node> {
        vec![Node::from(self)]
    }
}

// Constructors.

/// Literal text (escaped on render).
pub fn text(s: impl Into<KString>) -> Node {
    Node::String(s.into())
}

/// Pre-escaped text, emitted verbatim on render.
pub fn raw(s: impl Into<KString>) -> Node {
    Node::Preserialized(crate::escape::mark_safe(s))
}

/// A plain container without markup of its own.
pub fn group(body: impl ToBody) -> Node {
    Node::Group(Group(body.to_body()))
}

/// Conditional without an else branch.
pub fn if_(condition: impl Into<Value>, then: impl Into<Value>) -> Node {
    Node::If(If {
        condition: condition.into(),
        then: then.into(),
        otherwise: None,
    })
}

/// Conditional with both branches.
pub fn if_else(condition: impl Into<Value>,
               then: impl Into<Value>,
               otherwise: impl Into<Value>) -> Node {
    Node::If(If {
        condition: condition.into(),
        then: then.into(),
        otherwise: Some(otherwise.into()),
    })
}

/// Iteration over a (possibly lazy) list. The loop variable and its
/// `<var>_index` companion are visible to `body` only.
pub fn each(over: impl Into<Value>,
            var: impl Into<KString>,
            body: impl Into<Node>) -> Node {
    Node::Each(Each {
        over: over.into(),
        var: var.into(),
        body: Box::new(body.into()),
    })
}

/// Scoped context bindings for the given children.
pub fn scope(bindings: impl IntoIterator<Item = (KString, Value)>,
             body: impl ToBody) -> Node {
    Node::Scope(Scope {
        bindings: bindings.into_iter().collect(),
        body: body.to_body(),
    })
}

/// A named sub-tree, selectable via `render_fragment`.
pub fn fragment(name: impl Into<KString>, body: impl ToBody) -> Node {
    Node::Fragment(Fragment {
        name: name.into(),
        body: body.to_body(),
    })
}

// ------------------------------------------------------------------
// Tree functions.
//
// All of them walk the subtree of the node they are called on (the
// node itself excluded), depth-first and pre-order, attribute-value
// sub-trees of a markup element before its body. The predicate
// receives each candidate together with its ancestor path, outermost
// first. Matches are collected first and mutations applied afterwards
// in reverse pre-order, so indices collected earlier stay valid.

/// One edge of a path from a node to a descendant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Index into a child list (group, element body, scope, fragment).
    Body(usize),
    /// Index into an element's attribute list; the value must be a
    /// sub-tree.
    Attr(usize),
    Then,
    Else,
    EachBody,
}

fn value_subtree(v: &Value) -> Option<&Node> {
    match v {
        Value::Node(n) => Some(n),
        _ => None,
    }
}

fn value_subtree_mut(v: &mut Value) -> Option<&mut Node> {
    match v {
        Value::Node(n) => Some(Arc::make_mut(n)),
        _ => None,
    }
}

/// Visit all direct children of `node` in walk order.
fn for_each_child<'a>(node: &'a Node, mut f: impl FnMut(Step, &'a Node)) {
    match node {
        Node::Group(g) => {
            for (i, c) in g.0.iter().enumerate() {
                f(Step::Body(i), c);
            }
        }
        Node::Element(e) => {
            for (i, (_k, v)) in e.attr.iter().enumerate() {
                if let Some(n) = value_subtree(v) {
                    f(Step::Attr(i), n);
                }
            }
            for (i, c) in e.body.iter().enumerate() {
                f(Step::Body(i), c);
            }
        }
        Node::If(node) => {
            if let Some(n) = value_subtree(&node.then) {
                f(Step::Then, n);
            }
            if let Some(n) = node.otherwise.as_ref().and_then(value_subtree) {
                f(Step::Else, n);
            }
        }
        Node::Each(e) => f(Step::EachBody, &*e.body),
        Node::Scope(s) => {
            for (i, c) in s.body.iter().enumerate() {
                f(Step::Body(i), c);
            }
        }
        Node::Fragment(fr) => {
            for (i, c) in fr.body.iter().enumerate() {
                f(Step::Body(i), c);
            }
        }
        Node::None
        | Node::String(_)
        | Node::Preserialized(_)
        | Node::Value(_)
        | Node::Lazy(_)
        | Node::Format(_) => {}
    }
}

type Pred<'p> = dyn FnMut(&Node, &[&Node]) -> bool + 'p;

fn collect<'a>(node: &'a Node,
               ancestors: &mut Vec<&'a Node>,
               path: &mut Vec<Step>,
               pred: &mut Pred,
               hits: &mut Vec<(Vec<Step>, &'a Node)>) {
    // Can't recurse inside the for_each_child closure (it borrows
    // `hits` etc. mutably), so gather the children first.
    let mut children: Vec<(Step, &'a Node)> = Vec::new();
    for_each_child(node, |step, child| children.push((step, child)));
    for (step, child) in children {
        path.push(step);
        if pred(child, ancestors) {
            hits.push((path.clone(), child));
        }
        ancestors.push(child);
        collect(child, ancestors, path, pred, hits);
        ancestors.pop();
        path.pop();
    }
}

#[derive(Clone)]
enum Apply {
    Delete,
    Replace(Option<Node>),
    Wrap(Node),
}

impl Node {
    fn child_mut(&mut self, step: Step) -> Option<&mut Node> {
        match (self, step) {
            (Node::Group(g), Step::Body(i)) => g.0.get_mut(i),
            (Node::Element(e), Step::Body(i)) => e.body.get_mut(i),
            (Node::Element(e), Step::Attr(i)) => {
                e.attr.get_mut(i).and_then(|(_k, v)| value_subtree_mut(v))
            }
            (Node::If(n), Step::Then) => value_subtree_mut(&mut n.then),
            (Node::If(n), Step::Else) => {
                n.otherwise.as_mut().and_then(value_subtree_mut)
            }
            (Node::Each(e), Step::EachBody) => Some(&mut *e.body),
            (Node::Scope(s), Step::Body(i)) => s.body.get_mut(i),
            (Node::Fragment(f), Step::Body(i)) => f.body.get_mut(i),
            _ => None,
        }
    }

    fn apply_at(&mut self, path: &[Step], op: &Apply) {
        let (last, init) = match path.split_last() {
            Some(p) => p,
            None => return,
        };
        let mut parent: &mut Node = self;
        for step in init {
            parent = match parent.child_mut(*step) {
                Some(c) => c,
                None => return,
            };
        }
        match op {
            Apply::Delete => parent.remove_child(*last),
            Apply::Replace(None) => parent.remove_child(*last),
            Apply::Replace(Some(r)) => parent.set_child(*last, r.clone()),
            Apply::Wrap(wrapper) => {
                let can_hold = matches!(wrapper,
                                        Node::Group(_) | Node::Element(_)
                                        | Node::Scope(_) | Node::Fragment(_));
                if !can_hold {
                    // Wrapper cannot hold children; leave the
                    // original in place.
                    return;
                }
                if let Some(child) = parent.child_mut(*last) {
                    let old = std::mem::take(child);
                    let mut wrapped = wrapper.clone();
                    let _ = wrapped.push_child(old);
                    *child = wrapped;
                }
            }
        }
    }

    /// Remove the child at `step`: list children are removed from the
    /// list, single-slot children become absent.
    fn remove_child(&mut self, step: Step) {
        match (self, step) {
            (Node::Group(g), Step::Body(i)) => {
                if i < g.0.len() {
                    let _ = g.0.remove(i);
                }
            }
            (Node::Element(e), Step::Body(i)) => {
                if i < e.body.len() {
                    let _ = e.body.remove(i);
                }
            }
            (Node::Element(e), Step::Attr(i)) => {
                if let Some((_k, v)) = e.attr.get_mut(i) {
                    *v = Value::None;
                }
            }
            (Node::If(n), Step::Then) => n.then = Value::None,
            (Node::If(n), Step::Else) => n.otherwise = None,
            (Node::Each(e), Step::EachBody) => *e.body = Node::None,
            (Node::Scope(s), Step::Body(i)) => {
                if i < s.body.len() {
                    let _ = s.body.remove(i);
                }
            }
            (Node::Fragment(f), Step::Body(i)) => {
                if i < f.body.len() {
                    let _ = f.body.remove(i);
                }
            }
            _ => {}
        }
    }

    fn set_child(&mut self, step: Step, replacement: Node) {
        match (self, step) {
            (Node::Element(e), Step::Attr(i)) => {
                if let Some((_k, v)) = e.attr.get_mut(i) {
                    *v = Value::Node(Arc::new(replacement));
                }
            }
            (Node::If(n), Step::Then) => {
                n.then = Value::Node(Arc::new(replacement));
            }
            (Node::If(n), Step::Else) => {
                n.otherwise = Some(Value::Node(Arc::new(replacement)));
            }
            (node, step) => {
                if let Some(c) = node.child_mut(step) {
                    *c = replacement;
                }
            }
        }
    }

    fn collect_paths(&self, pred: &mut Pred) -> Vec<Vec<Step>> {
        let mut ancestors: Vec<&Node> = vec![self];
        let mut path = Vec::new();
        let mut hits = Vec::new();
        collect(self, &mut ancestors, &mut path, pred, &mut hits);
        hits.into_iter().map(|(p, _)| p).collect()
    }

    /// All descendants (the node itself excluded) for which the
    /// predicate holds, in depth-first pre-order. The predicate
    /// receives each candidate and its ancestor path, outermost
    /// first.
    pub fn filter<'a>(&'a self,
                      mut pred: impl FnMut(&Node, &[&Node]) -> bool)
                      -> Vec<&'a Node> {
        let mut ancestors: Vec<&Node> = vec![self];
        let mut path = Vec::new();
        let mut hits = Vec::new();
        collect(self, &mut ancestors, &mut path, &mut pred, &mut hits);
        hits.into_iter().map(|(_, n)| n).collect()
    }

    /// Replace every match with a deep copy of `wrapper` holding the
    /// match as its appended child. Returns the number of matches.
    /// `wrapper` must be a container node (group, element, scope or
    /// fragment).
    pub fn wrap(&mut self,
                mut pred: impl FnMut(&Node, &[&Node]) -> bool,
                wrapper: &Node) -> usize {
        let paths = self.collect_paths(&mut pred);
        for path in paths.iter().rev() {
            self.apply_at(path, &Apply::Wrap(wrapper.clone()));
        }
        paths.len()
    }

    /// Remove every match from its container. Returns the number of
    /// matches.
    pub fn delete(&mut self, mut pred: impl FnMut(&Node, &[&Node]) -> bool) -> usize {
        let paths = self.collect_paths(&mut pred);
        for path in paths.iter().rev() {
            self.apply_at(path, &Apply::Delete);
        }
        paths.len()
    }

    /// Replace the first match (in walk order) with `replacement`, or
    /// every match when `all` is set. A `None` replacement deletes.
    /// Returns the number of replacements made.
    pub fn replace(&mut self,
                   mut pred: impl FnMut(&Node, &[&Node]) -> bool,
                   replacement: Option<Node>,
                   all: bool) -> usize {
        let mut paths = self.collect_paths(&mut pred);
        if !all {
            paths.truncate(1);
        }
        for path in paths.iter().rev() {
            self.apply_at(path, &Apply::Replace(replacement.clone()));
        }
        paths.len()
    }

    /// Deep copy; the clone shares no mutable state with the
    /// original.
    pub fn copy(&self) -> Node {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::att;
    use crate::tags::{div, li, span, ul};

    fn is_span(n: &Node, _ancestors: &[&Node]) -> bool {
        matches!(n, Node::Element(e) if e.meta.tag_name == "span")
    }

    #[test]
    fn t_filter_finds_nested_and_attribute_subtrees() {
        let tree = div([att("data_x", span((), "in attr"))],
                       [span((), "a"), div((), [span((), "b")])]);
        let found = tree.filter(is_span);
        assert_eq!(found.len(), 3);
    }

    #[test]
    fn t_filter_excludes_self() {
        let tree = span((), "x");
        assert_eq!(tree.filter(is_span).len(), 0);
    }

    #[test]
    fn t_ancestors_outermost_first() {
        let tree = div((), [ul((), [li((), "x")])]);
        let mut seen = Vec::new();
        tree.filter(|n, anc| {
            if matches!(n, Node::Element(e) if e.meta.tag_name == "li") {
                seen.push(anc.iter()
                          .map(|a| a.describe().to_string())
                          .collect::<Vec<_>>());
            }
            false
        });
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], vec!["<div>", "<ul>"]);
    }

    #[test]
    fn t_delete_removes_all_matches() {
        let mut tree = div((), [span((), "a"), div((), [span((), "b")]), text("t")]);
        assert_eq!(tree.delete(is_span), 2);
        assert_eq!(tree.filter(is_span).len(), 0);
        // The unrelated children survive.
        if let Node::Element(e) = &tree {
            assert_eq!(e.body.len(), 2);
        } else {
            panic!("expected element");
        }
    }

    #[test]
    fn t_replace_first_match_only_by_default() {
        let mut tree = div((), [span((), "a"), span((), "b")]);
        let n = tree.replace(is_span, Some(text("x")), false);
        assert_eq!(n, 1);
        assert_eq!(tree.filter(is_span).len(), 1);
    }

    #[test]
    fn t_replace_all() {
        let mut tree = div((), [span((), "a"), div((), [span((), "b")])]);
        let n = tree.replace(is_span, Some(text("x")), true);
        assert_eq!(n, 2);
        assert_eq!(tree.filter(is_span).len(), 0);
    }

    #[test]
    fn t_replace_none_deletes() {
        let mut tree = div((), [span((), "a")]);
        tree.replace(is_span, None, true);
        if let Node::Element(e) = &tree {
            assert!(e.body.is_empty());
        } else {
            panic!("expected element");
        }
    }

    #[test]
    fn t_wrap_each_match_gets_its_own_wrapper() {
        let mut tree = div((), [span((), "a"), span((), "b")]);
        let n = tree.wrap(is_span, &ul((), ()));
        assert_eq!(n, 2);
        // Both spans still present, each inside its own <ul>.
        assert_eq!(tree.filter(is_span).len(), 2);
        let uls = tree.filter(|n, _| {
            matches!(n, Node::Element(e) if e.meta.tag_name == "ul")
        });
        assert_eq!(uls.len(), 2);
        for u in uls {
            if let Node::Element(e) = u {
                assert_eq!(e.body.len(), 1);
            }
        }
    }

    #[test]
    fn t_copy_is_deep() {
        let tree = div((), [span((), "a")]);
        let mut copy = tree.copy();
        copy.delete(is_span);
        assert_eq!(tree.filter(is_span).len(), 1);
        assert_eq!(copy.filter(is_span).len(), 0);
    }
}
