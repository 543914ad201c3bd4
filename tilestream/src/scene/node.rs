//! Owned scene subtrees.

use std::path::PathBuf;

/// What a scene node carries.
///
/// The engine treats node contents opaquely; the kinds exist so readers
/// and tests can describe what they produced.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Pure grouping node.
    Group,
    /// Renderable geometry with the given vertex count.
    Geometry { vertices: usize },
    /// A set of light points.
    LightPoints { points: usize },
    /// A static model loaded from `path`.
    Model { path: PathBuf },
}

/// A detached scene subtree, owned by exactly one holder at a time.
///
/// Subtrees are built off the render thread, moved into the live scene by
/// [`SceneGraph::attach`](super::SceneGraph::attach) and handed back by
/// [`SceneGraph::detach`](super::SceneGraph::detach).
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    name: String,
    kind: NodeKind,
    children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            children: Vec::new(),
        }
    }

    /// Create an empty grouping node.
    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Group)
    }

    /// Create a geometry leaf.
    pub fn geometry(name: impl Into<String>, vertices: usize) -> Self {
        Self::new(name, NodeKind::Geometry { vertices })
    }

    /// Create a light point leaf.
    pub fn light_points(name: impl Into<String>, points: usize) -> Self {
        Self::new(name, NodeKind::LightPoints { points })
    }

    /// Builder-style child append.
    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn add_child(&mut self, child: SceneNode) {
        self.children.push(child);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn children(&self) -> &[SceneNode] {
        &self.children
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(SceneNode::node_count).sum::<usize>()
    }

    /// Release up to `budget` descendants, deepest last-added leaves first.
    ///
    /// Returns the number of descendants still held. The subtree root is
    /// never released here; once this returns 0 the caller drops the root.
    pub fn release(&mut self, budget: usize) -> usize {
        let mut released = 0;
        while released < budget {
            match self.pop_leaf() {
                Some(leaf) => {
                    drop(leaf);
                    released += 1;
                }
                None => break,
            }
        }
        self.node_count() - 1
    }

    /// Detach one leaf from the bottom of the subtree.
    fn pop_leaf(&mut self) -> Option<SceneNode> {
        let last = self.children.last_mut()?;
        if last.children.is_empty() {
            self.children.pop()
        } else {
            last.pop_leaf()
        }
    }
}
