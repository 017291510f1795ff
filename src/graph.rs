//! Workflow graph definition and validation.
//!
//! A [`Graph`] is explicit data: a node table, a successor edge table, an
//! entry point, and an interrupt-before set. [`GraphBuilder`] provides the
//! fluent construction API and [`GraphBuilder::compile`] validates the
//! structure before first execution: orphan nodes, dangling edges, missing
//! entry points and unknown interrupt targets are all build-time errors, not
//! runtime surprises.

use miette::Diagnostic;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use thiserror::Error;

use crate::node::Node;
use crate::types::NodeName;

/// Builder for constructing workflow graphs.
///
/// # Required Configuration
///
/// Every graph must have:
/// - at least one executable node added via [`add_node`](Self::add_node)
/// - an entry point set via [`set_entry_point`](Self::set_entry_point)
/// - an outgoing edge for every node, terminating at the `"End"` sentinel
///
/// `"End"` is a virtual target and is never registered with `add_node`.
///
/// # Examples
///
/// ```
/// use threadloom::graph::GraphBuilder;
/// # struct MyNode;
/// # #[async_trait::async_trait]
/// # impl threadloom::node::Node for MyNode {
/// #     async fn run(&self, _: &threadloom::state::WorkflowState, _: threadloom::node::NodeContext)
/// #         -> Result<threadloom::state::StateUpdate, threadloom::node::NodeError> {
/// #         Ok(threadloom::state::StateUpdate::default())
/// #     }
/// # }
///
/// let graph = GraphBuilder::new()
///     .add_node("process_input", MyNode)
///     .add_node("respond", MyNode)
///     .set_entry_point("process_input")
///     .add_edge("process_input", "respond")
///     .add_edge("respond", "End")
///     .interrupt_before("respond")
///     .compile()
///     .unwrap();
///
/// assert!(graph.should_interrupt_before("respond"));
/// ```
#[derive(Default)]
pub struct GraphBuilder {
    nodes: FxHashMap<String, Arc<dyn Node>>,
    edges: FxHashMap<String, NodeName>,
    entry_point: Option<String>,
    interrupt_before: FxHashSet<String>,
}

impl GraphBuilder {
    /// Creates a new, empty graph builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a node implementation under the given name.
    ///
    /// Registering `"End"` is ignored with a warning; the sentinel is
    /// structural and never executed.
    #[must_use]
    pub fn add_node(mut self, name: impl Into<String>, node: impl Node + 'static) -> Self {
        let name = name.into();
        if name == "End" {
            tracing::warn!(name, "ignoring registration of the virtual End sentinel");
            return self;
        }
        self.nodes.insert(name, Arc::new(node));
        self
    }

    /// Adds a directed edge. Each node has exactly one successor; adding a
    /// second edge from the same node replaces the first.
    #[must_use]
    pub fn add_edge(mut self, from: impl Into<String>, to: impl Into<NodeName>) -> Self {
        self.edges.insert(from.into(), to.into());
        self
    }

    /// Designates the node execution starts from.
    #[must_use]
    pub fn set_entry_point(mut self, name: impl Into<String>) -> Self {
        self.entry_point = Some(name.into());
        self
    }

    /// Marks a node as an interrupt point: execution pauses and checkpoints
    /// *before* this node runs, until a caller resumes the thread.
    #[must_use]
    pub fn interrupt_before(mut self, name: impl Into<String>) -> Self {
        self.interrupt_before.insert(name.into());
        self
    }

    /// Validates the graph and produces an executable [`Graph`].
    ///
    /// # Errors
    ///
    /// - [`GraphError::NoNodes`]: the builder is empty
    /// - [`GraphError::MissingEntryPoint`]: no entry point was set
    /// - [`GraphError::UnknownEntryPoint`]: the entry point is not registered
    /// - [`GraphError::DanglingEdge`]: an edge references an unregistered node
    /// - [`GraphError::MissingEdge`]: a node has no outgoing edge
    /// - [`GraphError::UnknownInterrupt`]: an interrupt target is unregistered
    /// - [`GraphError::OrphanNode`]: a node is unreachable from the entry point
    pub fn compile(self) -> Result<Graph, GraphError> {
        if self.nodes.is_empty() {
            return Err(GraphError::NoNodes);
        }
        let entry_point = self.entry_point.ok_or(GraphError::MissingEntryPoint)?;
        if !self.nodes.contains_key(&entry_point) {
            return Err(GraphError::UnknownEntryPoint { name: entry_point });
        }
        for (from, to) in &self.edges {
            if !self.nodes.contains_key(from) {
                return Err(GraphError::DanglingEdge {
                    from: from.clone(),
                    to: to.encode(),
                });
            }
            if let NodeName::Named(target) = to
                && !self.nodes.contains_key(target)
            {
                return Err(GraphError::DanglingEdge {
                    from: from.clone(),
                    to: to.encode(),
                });
            }
        }
        for name in self.nodes.keys() {
            if !self.edges.contains_key(name) {
                return Err(GraphError::MissingEdge { from: name.clone() });
            }
        }
        for name in &self.interrupt_before {
            if !self.nodes.contains_key(name) {
                return Err(GraphError::UnknownInterrupt { name: name.clone() });
            }
        }

        // Reachability walk from the entry point along successors.
        let mut visited: FxHashSet<String> = FxHashSet::default();
        let mut cursor = Some(entry_point.clone());
        while let Some(name) = cursor {
            if !visited.insert(name.clone()) {
                break; // cycle: everything on it is already visited
            }
            cursor = match self.edges.get(&name) {
                Some(NodeName::Named(next)) => Some(next.clone()),
                _ => None,
            };
        }
        if let Some(orphan) = self.nodes.keys().find(|n| !visited.contains(*n)) {
            return Err(GraphError::OrphanNode {
                name: orphan.clone(),
            });
        }

        Ok(Graph {
            nodes: self.nodes,
            edges: self.edges,
            entry_point,
            interrupt_before: self.interrupt_before,
        })
    }
}

/// A validated, executable workflow graph.
///
/// Produced by [`GraphBuilder::compile`]; immutable afterwards. Cloning is
/// cheap (nodes are shared via `Arc`).
#[derive(Clone)]
pub struct Graph {
    nodes: FxHashMap<String, Arc<dyn Node>>,
    edges: FxHashMap<String, NodeName>,
    entry_point: String,
    interrupt_before: FxHashSet<String>,
}

impl Graph {
    /// The node execution starts from.
    #[must_use]
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    /// Look up a node implementation by name.
    #[must_use]
    pub fn node(&self, name: &str) -> Option<Arc<dyn Node>> {
        self.nodes.get(name).cloned()
    }

    /// The successor of a node. Validation guarantees every registered node
    /// has one; unknown names return `End` so callers cannot loop forever.
    #[must_use]
    pub fn successor(&self, name: &str) -> NodeName {
        self.edges.get(name).cloned().unwrap_or(NodeName::End)
    }

    /// Whether execution must pause and checkpoint before running `name`.
    #[must_use]
    pub fn should_interrupt_before(&self, name: &str) -> bool {
        self.interrupt_before.contains(name)
    }

    /// Registered node names, in no particular order.
    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("entry_point", &self.entry_point)
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("interrupt_before", &self.interrupt_before)
            .finish()
    }
}

/// Structural validation errors raised at graph compile time.
#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("graph has no nodes")]
    #[diagnostic(
        code(threadloom::graph::no_nodes),
        help("Register at least one node with add_node before compiling.")
    )]
    NoNodes,

    #[error("graph has no entry point")]
    #[diagnostic(
        code(threadloom::graph::missing_entry),
        help("Call set_entry_point with a registered node name.")
    )]
    MissingEntryPoint,

    #[error("entry point references unknown node: {name}")]
    #[diagnostic(code(threadloom::graph::unknown_entry))]
    UnknownEntryPoint { name: String },

    #[error("edge references unknown node: {from} -> {to}")]
    #[diagnostic(code(threadloom::graph::dangling_edge))]
    DanglingEdge { from: String, to: String },

    #[error("node has no outgoing edge: {from}")]
    #[diagnostic(
        code(threadloom::graph::missing_edge),
        help("Every node needs an edge, terminating at the End sentinel.")
    )]
    MissingEdge { from: String },

    #[error("interrupt-before references unknown node: {name}")]
    #[diagnostic(code(threadloom::graph::unknown_interrupt))]
    UnknownInterrupt { name: String },

    #[error("node is unreachable from the entry point: {name}")]
    #[diagnostic(code(threadloom::graph::orphan_node))]
    OrphanNode { name: String },
}
