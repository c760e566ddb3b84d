//! Lineage graph: provenance tracking for cached distributed results
//!
//! Every cached intermediate is registered as a node in a provenance DAG.
//! A node's reference count records how many consumers retain an edge to it;
//! a node becomes evictable exactly when the count reaches zero. This layer
//! only reports evictability; the eviction decision belongs to an external
//! memory manager. Graph mutation is single-writer (`&mut self`), and the
//! caller is responsible for keeping the graph acyclic.

use crate::error::{Error, Result};

/// Opaque handle addressing a node in a [`LineageGraph`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineageId(usize);

/// One provenance record
#[derive(Debug, Clone)]
struct LineageNode {
    name: String,
    num_refs: usize,
    children: Vec<LineageId>,
    /// Handle of the materialized result this node describes, if any.
    /// A plain lookup key, never an ownership edge.
    back_ref: Option<String>,
}

/// Arena of lineage nodes addressed by [`LineageId`] handles
#[derive(Debug, Default, Clone)]
pub struct LineageGraph {
    nodes: Vec<LineageNode>,
}

impl LineageGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new node with reference count zero and no children
    pub fn create(&mut self, name: impl Into<String>) -> LineageId {
        let id = LineageId(self.nodes.len());
        self.nodes.push(LineageNode {
            name: name.into(),
            num_refs: 0,
            children: Vec::new(),
            back_ref: None,
        });
        id
    }

    /// Number of nodes in the arena
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena holds no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn node(&self, id: LineageId) -> Result<&LineageNode> {
        self.nodes
            .get(id.0)
            .ok_or_else(|| Error::Internal(format!("unknown lineage node {}", id.0)))
    }

    fn node_mut(&mut self, id: LineageId) -> Result<&mut LineageNode> {
        self.nodes
            .get_mut(id.0)
            .ok_or_else(|| Error::Internal(format!("unknown lineage node {}", id.0)))
    }

    /// Name the node was registered under
    pub fn name(&self, id: LineageId) -> Result<&str> {
        Ok(&self.node(id)?.name)
    }

    /// Append `child` to `parent`'s dependency list and increment the
    /// child's reference count
    ///
    /// A child may be added under multiple parents; the structure is a DAG.
    /// No cycle detection is performed.
    pub fn add_child(&mut self, parent: LineageId, child: LineageId) -> Result<()> {
        self.node(parent)?;
        self.node_mut(child)?.num_refs += 1;
        self.node_mut(parent)?.children.push(child);
        Ok(())
    }

    /// Drop one reference to a node
    ///
    /// Returns the remaining reference count. Releasing a node already at
    /// zero is an error.
    pub fn release(&mut self, id: LineageId) -> Result<usize> {
        let node = self.node_mut(id)?;
        if node.num_refs == 0 {
            return Err(Error::Internal(format!(
                "release of lineage node '{}' with zero references",
                node.name
            )));
        }
        node.num_refs -= 1;
        Ok(node.num_refs)
    }

    /// Current reference count of a node
    pub fn num_references(&self, id: LineageId) -> Result<usize> {
        Ok(self.node(id)?.num_refs)
    }

    /// Whether the node may be evicted (reference count is zero)
    pub fn is_evictable(&self, id: LineageId) -> Result<bool> {
        Ok(self.node(id)?.num_refs == 0)
    }

    /// Ordered dependency list of a node
    pub fn children(&self, id: LineageId) -> Result<&[LineageId]> {
        Ok(&self.node(id)?.children)
    }

    /// Record the handle of the materialized result backing this node
    pub fn set_back_reference(&mut self, id: LineageId, handle: impl Into<String>) -> Result<()> {
        self.node_mut(id)?.back_ref = Some(handle.into());
        Ok(())
    }

    /// Whether a materialized result exists for this node
    pub fn has_back_reference(&self, id: LineageId) -> Result<bool> {
        Ok(self.node(id)?.back_ref.is_some())
    }

    /// Handle of the materialized result, if recorded
    pub fn back_reference(&self, id: LineageId) -> Result<Option<&str>> {
        Ok(self.node(id)?.back_ref.as_deref())
    }
}
