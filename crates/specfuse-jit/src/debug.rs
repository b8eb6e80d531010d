//! Debug Graphs
//!
//! Inspection of what the executor actually ran. A [`DebugGraph`] is a tree
//! of nodes and blocks (control flow nodes own blocks, blocks own nodes);
//! differentiable subgraph nodes carry the graph of their forward plan.
//!
//! [`graph_for`] rebuilds the optimized graph of a scripted function from its
//! debug state and falls back to replaying the function and reading the last
//! executed optimized graph when that state is ambiguous.
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

use std::fmt;

use tracing::debug;

use crate::error::{JitError, JitResult};

/// Node kind of a differentiable subgraph.
pub const DIFFERENTIABLE_GRAPH: &str = "prim::DifferentiableGraph";

// =============================================================================
// Identifiers
// =============================================================================

/// Index of a node in its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Returns the raw index.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Index of a block in its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(usize);

impl BlockId {
    /// Returns the raw index.
    pub fn index(self) -> usize {
        self.0
    }
}

// =============================================================================
// Graph
// =============================================================================

/// A node of a debug graph.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    /// Node kind, e.g. `aten::mul` or `prim::If`.
    pub kind: String,
    /// Nested blocks, in order.
    pub blocks: Vec<BlockId>,
    /// Attached subgraph (differentiable graphs, fusion groups).
    pub subgraph: Option<Box<DebugGraph>>,
}

/// An ordered list of nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    /// Nodes in execution order.
    pub nodes: Vec<NodeId>,
}

/// Arena-backed tree of nodes and blocks. Block 0 is the top level.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugGraph {
    nodes: Vec<GraphNode>,
    blocks: Vec<Block>,
}

impl DebugGraph {
    /// Creates a graph with an empty top-level block.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            blocks: vec![Block::default()],
        }
    }

    /// The top-level block.
    pub fn root(&self) -> BlockId {
        BlockId(0)
    }

    /// Appends a node of `kind` to `block`.
    pub fn add_node(&mut self, block: BlockId, kind: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(GraphNode {
            kind: kind.into(),
            blocks: Vec::new(),
            subgraph: None,
        });
        self.blocks[block.0].nodes.push(id);
        id
    }

    /// Adds a new empty block owned by `node`.
    pub fn add_block(&mut self, node: NodeId) -> BlockId {
        let id = BlockId(self.blocks.len());
        self.blocks.push(Block::default());
        self.nodes[node.0].blocks.push(id);
        id
    }

    /// Returns a node.
    pub fn node(&self, id: NodeId) -> &GraphNode {
        &self.nodes[id.0]
    }

    /// Returns a block.
    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0]
    }

    /// Top-level nodes in order.
    pub fn top_level(&self) -> &[NodeId] {
        &self.blocks[0].nodes
    }

    /// Total number of nodes, at any nesting level.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True for a graph without nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Replaces the subgraph attached to `node`.
    pub fn set_subgraph(&mut self, node: NodeId, graph: DebugGraph) {
        self.nodes[node.0].subgraph = Some(Box::new(graph));
    }

    /// Differentiable subgraph nodes in pre-order.
    ///
    /// The blocks of a differentiable node itself are not searched.
    pub fn differentiable_nodes(&self) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = self.top_level().iter().rev().copied().collect();

        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.0];
            if node.kind == DIFFERENTIABLE_GRAPH {
                found.push(id);
                continue;
            }
            for block in node.blocks.iter().rev() {
                stack.extend(self.blocks[block.0].nodes.iter().rev().copied());
            }
        }

        found
    }
}

impl Default for DebugGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DebugGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        enum Item {
            Node(NodeId, usize),
            Block(BlockId, usize),
        }

        let mut stack: Vec<Item> = self
            .top_level()
            .iter()
            .rev()
            .map(|&id| Item::Node(id, 0))
            .collect();

        while let Some(item) = stack.pop() {
            match item {
                Item::Node(id, depth) => {
                    let node = &self.nodes[id.0];
                    write!(f, "{:indent$}%{} = {}", "", id.0, node.kind, indent = depth * 2)?;
                    if let Some(sub) = &node.subgraph {
                        write!(f, " [subgraph: {} nodes]", sub.len())?;
                    }
                    writeln!(f)?;
                    for &block in node.blocks.iter().rev() {
                        stack.push(Item::Block(block, depth + 1));
                    }
                }
                Item::Block(id, depth) => {
                    writeln!(f, "{:indent$}block{}:", "", id.0, indent = depth * 2)?;
                    for &node in self.blocks[id.0].nodes.iter().rev() {
                        stack.push(Item::Node(node, depth + 1));
                    }
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// Graph Extraction
// =============================================================================

/// Debug state exposed by a scripted function's executor.
pub trait DebugStateSource {
    /// Graphs of the function's execution plans.
    fn execution_plans(&self) -> JitResult<Vec<DebugGraph>>;

    /// For each differentiable node, in pre-order, the graphs of the forward
    /// executor's execution plans.
    fn differentiable_states(&self) -> JitResult<Vec<Vec<DebugGraph>>>;
}

/// Rebuilds the optimized graph from debug state.
///
/// Requires a unique execution plan and one executor state per
/// differentiable node. Nodes whose state has exactly one plan get that
/// plan's graph as their subgraph; the others are left untouched.
pub fn try_graph_for(source: &dyn DebugStateSource) -> JitResult<DebugGraph> {
    let plans = source.execution_plans()?;
    let [plan] = plans.as_slice() else {
        return Err(JitError::DebugState(format!(
            "expected exactly one execution plan, found {}",
            plans.len()
        )));
    };
    let mut graph = plan.clone();

    let states = source.differentiable_states()?;
    let diff_nodes = graph.differentiable_nodes();
    if states.len() != diff_nodes.len() {
        return Err(JitError::DebugState(format!(
            "{} differentiable nodes but {} executor states",
            diff_nodes.len(),
            states.len()
        )));
    }

    for (node, state) in diff_nodes.into_iter().zip(states) {
        if let [forward] = state.as_slice() {
            graph.set_subgraph(node, forward.clone());
        }
    }

    Ok(graph)
}

/// Optimized graph for a scripted function.
///
/// Falls back to `replay` (run the function, return the last executed
/// optimized graph) when the debug state cannot be used.
pub fn graph_for<F>(source: &dyn DebugStateSource, replay: F) -> Option<DebugGraph>
where
    F: FnOnce() -> Option<DebugGraph>,
{
    match try_graph_for(source) {
        Ok(graph) => Some(graph),
        Err(err) => {
            debug!(error = %err, "debug state unusable, replaying for last executed graph");
            replay()
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
