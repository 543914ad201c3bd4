//! In-memory scene graph.

use std::collections::HashMap;

use super::{AttachPoint, ContentCategory, NodeHandle, SceneGraph, SceneNode};

#[derive(Debug)]
struct LiveNode {
    node: SceneNode,
    parent: AttachPoint,
    children: Vec<NodeHandle>,
}

/// A [`SceneGraph`] that keeps attached subtrees in a handle map.
///
/// Besides the trait operations it exposes counters so callers can assert
/// what is currently spliced in and how much has been released.
#[derive(Debug, Default)]
pub struct SceneArena {
    next_handle: u64,
    live: HashMap<NodeHandle, LiveNode>,
    branches: HashMap<ContentCategory, Vec<NodeHandle>>,
    released: usize,
}

impl SceneArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `handle` refers to an attached subtree.
    pub fn contains(&self, handle: NodeHandle) -> bool {
        self.live.contains_key(&handle)
    }

    /// Number of attached subtrees, including nested ones.
    pub fn attached_count(&self) -> usize {
        self.live.len()
    }

    /// Number of subtrees attached directly to `category`.
    pub fn branch_len(&self, category: ContentCategory) -> usize {
        self.branches.get(&category).map_or(0, Vec::len)
    }

    /// Total nodes currently held by the live scene.
    pub fn node_count(&self) -> usize {
        self.live.values().map(|live| live.node.node_count()).sum()
    }

    /// Nodes released through [`SceneGraph::free_subtree`] so far.
    pub fn released(&self) -> usize {
        self.released
    }

    fn take(&mut self, handle: NodeHandle) -> Option<SceneNode> {
        let live = self.live.remove(&handle)?;
        let mut node = live.node;
        for child in live.children {
            if let Some(subtree) = self.take(child) {
                node.add_child(subtree);
            }
        }
        Some(node)
    }
}

impl SceneGraph for SceneArena {
    fn attach(&mut self, node: SceneNode, parent: AttachPoint) -> Result<NodeHandle, SceneNode> {
        let handle = NodeHandle::new(self.next_handle);

        match parent {
            AttachPoint::Branch(category) => {
                self.branches.entry(category).or_default().push(handle);
            }
            AttachPoint::Under(parent_handle) => match self.live.get_mut(&parent_handle) {
                Some(live) => live.children.push(handle),
                None => return Err(node),
            },
        }

        self.next_handle += 1;
        self.live.insert(
            handle,
            LiveNode {
                node,
                parent,
                children: Vec::new(),
            },
        );
        Ok(handle)
    }

    fn detach(&mut self, handle: NodeHandle) -> Option<SceneNode> {
        let parent = self.live.get(&handle)?.parent;
        match parent {
            AttachPoint::Branch(category) => {
                if let Some(list) = self.branches.get_mut(&category) {
                    list.retain(|h| *h != handle);
                }
            }
            AttachPoint::Under(parent_handle) => {
                if let Some(live) = self.live.get_mut(&parent_handle) {
                    live.children.retain(|h| *h != handle);
                }
            }
        }
        self.take(handle)
    }

    fn free_subtree(&mut self, node: &mut SceneNode, budget: usize) -> usize {
        let before = node.node_count() - 1;
        let remaining = node.release(budget);
        self.released += before - remaining;
        remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terrain() -> SceneNode {
        SceneNode::group("terrain")
            .with_child(SceneNode::geometry("surface", 128))
            .with_child(SceneNode::geometry("objects", 64))
    }

    #[test]
    fn test_attach_and_detach_branch() {
        let mut scene = SceneArena::new();
        let handle = scene
            .attach(terrain(), AttachPoint::Branch(ContentCategory::Terrain))
            .unwrap();

        assert!(scene.contains(handle));
        assert_eq!(scene.branch_len(ContentCategory::Terrain), 1);
        assert_eq!(scene.node_count(), 3);

        let node = scene.detach(handle).unwrap();
        assert_eq!(node, terrain());
        assert!(!scene.contains(handle));
        assert_eq!(scene.branch_len(ContentCategory::Terrain), 0);
        assert_eq!(scene.node_count(), 0);
    }

    #[test]
    fn test_detach_brings_nested_attachments() {
        let mut scene = SceneArena::new();
        let parent = scene
            .attach(terrain(), AttachPoint::Branch(ContentCategory::Terrain))
            .unwrap();
        let model = scene
            .attach(SceneNode::group("hangar"), AttachPoint::Under(parent))
            .unwrap();
        assert_eq!(scene.attached_count(), 2);

        let node = scene.detach(parent).unwrap();
        assert_eq!(node.node_count(), 4);
        assert!(!scene.contains(model));
        assert_eq!(scene.attached_count(), 0);
    }

    #[test]
    fn test_attach_under_unknown_handle_returns_node() {
        let mut scene = SceneArena::new();
        let result = scene.attach(
            SceneNode::group("orphan"),
            AttachPoint::Under(NodeHandle::new(42)),
        );

        assert_eq!(result.unwrap_err().name(), "orphan");
        assert_eq!(scene.attached_count(), 0);
    }

    #[test]
    fn test_detach_unknown_handle() {
        let mut scene = SceneArena::new();
        assert!(scene.detach(NodeHandle::new(7)).is_none());
    }

    #[test]
    fn test_free_subtree_counts_released() {
        let mut scene = SceneArena::new();
        let mut node = terrain();

        assert_eq!(scene.free_subtree(&mut node, 1), 1);
        assert_eq!(scene.free_subtree(&mut node, 5), 0);
        assert_eq!(scene.released(), 2);
    }
}
