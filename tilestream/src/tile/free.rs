//! Resumable teardown of detached tile content.
//!
//! Releasing a tile's whole node graph at once can touch thousands of
//! objects. A [`StagedFree`] holds the detached branches and releases them
//! a few chunks per call, keeping its own resume point.
//!
//! A chunk is one content category, or `max_nodes_per_chunk` nodes of a
//! category that holds more than that.

use std::collections::VecDeque;

use tracing::trace;

use crate::scene::{ContentCategory, SceneGraph, SceneNode};

/// Default number of nodes released per chunk.
pub const DEFAULT_MAX_NODES_PER_CHUNK: usize = 256;

#[derive(Debug)]
pub struct StagedFree {
    pending: VecDeque<(ContentCategory, SceneNode)>,
    max_nodes_per_chunk: usize,
    total_chunks: usize,
    released_chunks: usize,
}

impl StagedFree {
    /// Plan the release of `branches`, ordered by category.
    pub fn new(
        branches: impl IntoIterator<Item = (ContentCategory, SceneNode)>,
        max_nodes_per_chunk: usize,
    ) -> Self {
        let max_nodes_per_chunk = max_nodes_per_chunk.max(1);
        let mut pending: Vec<_> = branches.into_iter().collect();
        pending.sort_by_key(|(category, _)| *category);

        let total_chunks = pending
            .iter()
            .map(|(_, node)| chunks_for(node, max_nodes_per_chunk))
            .sum();

        Self {
            pending: pending.into(),
            max_nodes_per_chunk,
            total_chunks,
            released_chunks: 0,
        }
    }

    /// Release at most `budget` chunks. Returns the number released.
    pub fn step<S: SceneGraph + ?Sized>(&mut self, scene: &mut S, budget: usize) -> usize {
        let mut done = 0;
        while done < budget {
            let Some((_, node)) = self.pending.front_mut() else {
                break;
            };
            let remaining = scene.free_subtree(node, self.max_nodes_per_chunk);
            done += 1;

            if remaining == 0 {
                if let Some((category, root)) = self.pending.pop_front() {
                    trace!(%category, "Released content category");
                    drop(root);
                }
            }
        }
        self.released_chunks += done;
        done
    }

    pub fn is_done(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn total_chunks(&self) -> usize {
        self.total_chunks
    }

    pub fn released_chunks(&self) -> usize {
        self.released_chunks
    }

    pub fn remaining_chunks(&self) -> usize {
        self.total_chunks.saturating_sub(self.released_chunks)
    }

    /// Category the next chunk will come from.
    pub fn current_category(&self) -> Option<ContentCategory> {
        self.pending.front().map(|(category, _)| *category)
    }
}

fn chunks_for(node: &SceneNode, max_nodes_per_chunk: usize) -> usize {
    let descendants = node.node_count() - 1;
    descendants.div_ceil(max_nodes_per_chunk).max(1)
}
