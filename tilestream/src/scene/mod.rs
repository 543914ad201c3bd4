//! Scene graph seam.
//!
//! The engine never builds rendering primitives. It moves owned
//! [`SceneNode`] subtrees in and out of a live scene through the
//! [`SceneGraph`] trait, which only the render thread calls.
//! [`SceneArena`] is an in-memory implementation used by tests and headless
//! tools.

mod arena;
mod node;

pub use arena::SceneArena;
pub use node::{NodeKind, SceneNode};

use std::fmt;

/// Top-level branch of the live scene a tile's content is grouped under.
///
/// The declaration order is the order in which a detached tile releases its
/// content during a staged free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContentCategory {
    Terrain,
    GroundLights,
    VasiLights,
    RunwayLights,
    TaxiLights,
}

impl ContentCategory {
    /// All categories in release order.
    pub const ALL: [ContentCategory; 5] = [
        ContentCategory::Terrain,
        ContentCategory::GroundLights,
        ContentCategory::VasiLights,
        ContentCategory::RunwayLights,
        ContentCategory::TaxiLights,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ContentCategory::Terrain => "terrain",
            ContentCategory::GroundLights => "ground_lights",
            ContentCategory::VasiLights => "vasi_lights",
            ContentCategory::RunwayLights => "runway_lights",
            ContentCategory::TaxiLights => "taxi_lights",
        }
    }
}

impl fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Opaque handle to a subtree attached to the live scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle(u64);

impl NodeHandle {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Where an attached subtree is spliced in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachPoint {
    /// One of the top-level content branches.
    Branch(ContentCategory),
    /// Below a previously attached subtree.
    Under(NodeHandle),
}

/// The live scene, owned by the render thread.
pub trait SceneGraph {
    /// Splice `node` into the scene below `parent`.
    ///
    /// Gives the node back when `parent` is not part of the scene.
    fn attach(&mut self, node: SceneNode, parent: AttachPoint) -> Result<NodeHandle, SceneNode>;

    /// Pull an attached subtree back out of the scene.
    ///
    /// Anything attached [`AttachPoint::Under`] the handle comes out with
    /// it as children of the returned node. `None` if the handle is unknown.
    fn detach(&mut self, handle: NodeHandle) -> Option<SceneNode>;

    /// Release up to `budget` nodes of a detached subtree.
    ///
    /// Returns the number of nodes still to release below the subtree root.
    fn free_subtree(&mut self, node: &mut SceneNode, budget: usize) -> usize {
        node.release(budget)
    }
}
