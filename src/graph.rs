//! Graph builder with deterministic DOT serialization
//!
//! Declarations accumulate append-only in call order and serialize to the
//! same bytes every time. Identifiers, attribute keys, and values are
//! free-form: anything the renderer would reject passes through verbatim,
//! and an edge may reference an id that was never declared (DOT treats it
//! as an implicit node).

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::error::DotsmithError;

// ============================================================================
// ATTRIBUTE LIST
// ============================================================================

/// Ordered attribute list with dict-style update semantics.
///
/// The first declaration of a key fixes its position; re-declaring the key
/// overwrites the value in place, so serialization order stays stable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttrList {
    entries: Vec<(String, String)>,
}

impl AttrList {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AttrList {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = AttrList::new();
        for (k, v) in iter {
            attrs.set(k, v);
        }
        attrs
    }
}

// ============================================================================
// STATEMENTS
// ============================================================================

/// One declaration in call order.
#[derive(Debug, Clone)]
enum Statement {
    Node { id: String, attrs: AttrList },
    Edge { from: String, to: String, attrs: AttrList },
    Rank { ids: Vec<String> },
    Subgraph(GraphBuilder),
}

// ============================================================================
// GRAPH BUILDER
// ============================================================================

/// Append-only builder for a DOT graph description.
///
/// Serialization is an immutable snapshot: the same sequence of calls always
/// yields byte-identical output, and calling [`GraphBuilder::dot_source`]
/// twice yields the same bytes.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    name: String,
    directed: bool,
    graph_attrs: AttrList,
    node_defaults: AttrList,
    edge_defaults: AttrList,
    statements: Vec<Statement>,
}

impl GraphBuilder {
    /// Create a builder for a graph named `G`.
    pub fn new(directed: bool) -> Self {
        Self::named("G", directed)
    }

    pub fn named(name: impl Into<String>, directed: bool) -> Self {
        Self {
            name: name.into(),
            directed,
            graph_attrs: AttrList::new(),
            node_defaults: AttrList::new(),
            edge_defaults: AttrList::new(),
            statements: Vec::new(),
        }
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    /// Set a graph-level default attribute.
    pub fn graph_attr(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.graph_attrs.set(key, value);
        self
    }

    /// Set a default attribute applied to every node.
    pub fn node_defaults(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.node_defaults.set(key, value);
        self
    }

    /// Set a default attribute applied to every edge.
    pub fn edge_defaults(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.edge_defaults.set(key, value);
        self
    }

    /// Declare a node with no attributes of its own.
    pub fn add_node(&mut self, id: impl Into<String>) -> &mut Self {
        self.statements.push(Statement::Node {
            id: id.into(),
            attrs: AttrList::new(),
        });
        self
    }

    /// Declare a node with attributes.
    pub fn add_node_with<I, K, V>(&mut self, id: impl Into<String>, attrs: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.statements.push(Statement::Node {
            id: id.into(),
            attrs: attrs.into_iter().collect(),
        });
        self
    }

    /// Declare an edge. Endpoints need not be declared nodes.
    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
        self.statements.push(Statement::Edge {
            from: from.into(),
            to: to.into(),
            attrs: AttrList::new(),
        });
        self
    }

    /// Declare an edge with attributes.
    pub fn add_edge_with<I, K, V>(
        &mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        attrs: I,
    ) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.statements.push(Statement::Edge {
            from: from.into(),
            to: to.into(),
            attrs: attrs.into_iter().collect(),
        });
        self
    }

    /// Constrain the given nodes to the same rank.
    pub fn rank<I, S>(&mut self, ids: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.statements.push(Statement::Rank {
            ids: ids.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Declare a nested subgraph with its own defaults and namespace.
    ///
    /// The child inherits the edge operator of the root graph; nesting depth
    /// is unbounded.
    pub fn subgraph(
        &mut self,
        name: impl Into<String>,
        build: impl FnOnce(&mut GraphBuilder),
    ) -> &mut Self {
        let mut child = GraphBuilder::named(name, self.directed);
        build(&mut child);
        self.statements.push(Statement::Subgraph(child));
        self
    }

    /// Serialize the accumulated declarations to DOT source.
    pub fn dot_source(&self) -> String {
        let mut out = String::new();
        let keyword = if self.directed { "digraph" } else { "graph" };
        let _ = writeln!(out, "{} {} {{", keyword, id_token(&self.name));
        self.write_body(&mut out, 1);
        out.push_str("}\n");
        out
    }

    /// Write the DOT source to `path`, creating parent directories.
    pub fn save_dot(&self, path: impl AsRef<Path>) -> Result<PathBuf, DotsmithError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.dot_source())?;
        Ok(path.to_path_buf())
    }

    fn write_body(&self, out: &mut String, depth: usize) {
        let pad = "  ".repeat(depth);
        for (scope, attrs) in [
            ("graph", &self.graph_attrs),
            ("node", &self.node_defaults),
            ("edge", &self.edge_defaults),
        ] {
            if !attrs.is_empty() {
                let _ = write!(out, "{pad}{scope} [");
                write_attrs(out, attrs);
                out.push_str("]\n");
            }
        }
        let operator = if self.directed { "->" } else { "--" };
        for statement in &self.statements {
            match statement {
                Statement::Node { id, attrs } => {
                    let _ = write!(out, "{pad}{}", quoted(id));
                    if !attrs.is_empty() {
                        out.push_str(" [");
                        write_attrs(out, attrs);
                        out.push(']');
                    }
                    out.push('\n');
                }
                Statement::Edge { from, to, attrs } => {
                    let _ = write!(out, "{pad}{} {} {}", quoted(from), operator, quoted(to));
                    if !attrs.is_empty() {
                        out.push_str(" [");
                        write_attrs(out, attrs);
                        out.push(']');
                    }
                    out.push('\n');
                }
                Statement::Rank { ids } => {
                    let _ = write!(out, "{pad}{{ rank=same;");
                    for id in ids {
                        let _ = write!(out, " {};", quoted(id));
                    }
                    out.push_str(" }\n");
                }
                Statement::Subgraph(child) => {
                    let _ = writeln!(out, "{pad}subgraph {} {{", id_token(&child.name));
                    child.write_body(out, depth + 1);
                    let _ = writeln!(out, "{pad}}}");
                }
            }
        }
    }
}

// ============================================================================
// DOT TOKEN FORMATTING
// ============================================================================

/// Attributes in declaration order; `label` always goes last.
fn write_attrs(out: &mut String, attrs: &AttrList) {
    let mut first = true;
    for (key, value) in attrs.iter().filter(|(key, _)| *key != "label") {
        if !first {
            out.push_str(", ");
        }
        let _ = write!(out, "{}={}", id_token(key), quoted(value));
        first = false;
    }
    if let Some(label) = attrs.get("label") {
        if !first {
            out.push_str(", ");
        }
        let _ = write!(out, "label={}", quoted(label));
    }
}

/// Bare token when valid as a DOT identifier, quoted otherwise.
fn id_token(text: &str) -> String {
    if is_bare_id(text) {
        text.to_string()
    } else {
        quoted(text)
    }
}

/// Single-pass check, no regex: `[A-Za-z_][A-Za-z0-9_]*`.
fn is_bare_id(text: &str) -> bool {
    let mut bytes = text.bytes();
    match bytes.next() {
        Some(b) if b.is_ascii_alphabetic() || b == b'_' => {}
        _ => return false,
    }
    bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

fn quoted(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}
