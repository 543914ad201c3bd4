//! Tests for the tile lifecycle

use super::*;
use crate::bucket::Bucket;
use crate::geo::Cartesian;
use crate::scene::{
    AttachPoint, ContentCategory, NodeHandle, SceneArena, SceneGraph, SceneNode,
};
use proptest::prelude::*;

fn bucket() -> Bucket {
    Bucket::from_parts(-123, 37, 2, 4)
}

fn entry() -> TileEntry {
    TileEntry::new(bucket(), Cartesian::default(), 10_000.0)
}

fn content_with_lights(light_categories: usize) -> TileContent {
    let terrain = SceneNode::group("terrain")
        .with_child(SceneNode::geometry("surface", 1024))
        .with_child(SceneNode::geometry("objects", 96));
    let light = || vec![SceneNode::light_points("lights", 24)];
    let mut lights = LightPointLists::default();
    if light_categories > 0 {
        lights.ground = light();
    }
    if light_categories > 1 {
        lights.vasi = light();
    }
    if light_categories > 2 {
        lights.runway = light();
    }
    if light_categories > 3 {
        lights.taxi = light();
    }
    TileContent::new(terrain, 7_500.0).with_lights(lights)
}

fn active_entry(scene: &mut SceneArena, light_categories: usize) -> TileEntry {
    let mut entry = entry();
    entry.schedule(1).unwrap();
    entry.fill(content_with_lights(light_categories)).unwrap();
    entry.attach(scene).unwrap();
    entry
}

/// Scene that refuses everything attached to one branch.
#[derive(Default)]
struct PickyScene {
    inner: SceneArena,
    refused: Option<ContentCategory>,
}

impl SceneGraph for PickyScene {
    fn attach(&mut self, node: SceneNode, parent: AttachPoint) -> Result<NodeHandle, SceneNode> {
        match parent {
            AttachPoint::Branch(category) if Some(category) == self.refused => Err(node),
            _ => self.inner.attach(node, parent),
        }
    }

    fn detach(&mut self, handle: NodeHandle) -> Option<SceneNode> {
        self.inner.detach(handle)
    }
}

#[test]
fn test_full_lifecycle() {
    let mut scene = SceneArena::new();
    let mut entry = entry();
    assert_eq!(entry.state(), TileState::Unused);

    let ticket = entry.schedule(7).unwrap();
    assert_eq!(entry.state(), TileState::Scheduled);
    assert_eq!(entry.generation(), 7);

    ticket.start();
    assert_eq!(entry.state(), TileState::Loading);

    entry.fill(content_with_lights(2)).unwrap();
    assert_eq!(entry.state(), TileState::Loaded);
    assert_eq!(entry.bounding_radius(), 7_500.0);
    assert!(!entry.is_attached());

    entry.attach(&mut scene).unwrap();
    assert_eq!(entry.state(), TileState::Active);
    assert!(entry.is_attached());
    assert_eq!(scene.branch_len(ContentCategory::Terrain), 1);
    assert_eq!(scene.branch_len(ContentCategory::GroundLights), 1);
    assert_eq!(scene.branch_len(ContentCategory::VasiLights), 1);

    entry.detach(&mut scene, 256).unwrap();
    assert_eq!(entry.state(), TileState::PendingEviction);
    assert!(!entry.is_attached());
    assert_eq!(scene.attached_count(), 0);

    assert_eq!(entry.free_step(&mut scene, 1).unwrap(), (TileState::PartiallyFreed(1), 1));
    assert_eq!(entry.free_step(&mut scene, 1).unwrap(), (TileState::PartiallyFreed(2), 1));
    assert_eq!(entry.free_step(&mut scene, 1).unwrap(), (TileState::Freed, 1));
    assert!(entry.is_freed());
}

#[test]
fn test_out_of_order_transitions_are_rejected() {
    let mut scene = SceneArena::new();
    let mut entry = entry();

    assert!(matches!(
        entry.fill(content_with_lights(0)),
        Err(TileStateError::InvalidTransition { operation: "fill", .. })
    ));
    assert!(entry.attach(&mut scene).is_err());
    assert!(entry.free_step(&mut scene, 4).is_err());
    assert!(entry.detach(&mut scene, 16).is_err());

    entry.schedule(1).unwrap();
    assert!(entry.schedule(2).is_err());
    assert!(entry.attach(&mut scene).is_err());
}

#[test]
fn test_detach_before_fill_frees_in_one_step() {
    let mut scene = SceneArena::new();
    let mut entry = entry();
    entry.schedule(1).unwrap();

    entry.detach(&mut scene, 16).unwrap();
    assert_eq!(entry.state(), TileState::PendingEviction);
    assert_eq!(entry.free_step(&mut scene, 1).unwrap(), (TileState::Freed, 0));
}

#[test]
fn test_detach_loaded_entry_frees_unattached_content() {
    let mut scene = SceneArena::new();
    let mut entry = entry();
    entry.schedule(1).unwrap();
    entry.fill(content_with_lights(1)).unwrap();

    entry.detach(&mut scene, 256).unwrap();
    assert_eq!(entry.free_progress().map(StagedFree::total_chunks), Some(2));
    assert_eq!(entry.free_step(&mut scene, 8).unwrap(), (TileState::Freed, 2));
    assert_eq!(scene.released(), 3);
}

#[test]
fn test_rejected_attach_rolls_back() {
    let mut scene = PickyScene {
        refused: Some(ContentCategory::VasiLights),
        ..Default::default()
    };
    let mut entry = entry();
    entry.schedule(1).unwrap();
    entry.fill(content_with_lights(3)).unwrap();

    let err = entry.attach(&mut scene).unwrap_err();
    assert_eq!(
        err,
        TileStateError::AttachRejected {
            bucket: bucket(),
            category: ContentCategory::VasiLights
        }
    );
    assert_eq!(entry.state(), TileState::Loaded);
    assert_eq!(scene.inner.attached_count(), 0);
    assert_eq!(entry.content().map(TileContent::category_count), Some(4));

    scene.refused = None;
    entry.attach(&mut scene).unwrap();
    assert_eq!(scene.inner.attached_count(), 4);
}

#[test]
fn test_models_attach_under_terrain() {
    let mut scene = SceneArena::new();
    let mut entry = entry();
    entry.schedule(1).unwrap();
    let model = ModelPlacement {
        path: "tower.ac".into(),
        lon_deg: -122.37,
        lat_deg: 37.62,
        elevation_m: 4.0,
        heading_deg: 90.0,
    };
    entry
        .fill(content_with_lights(0).with_models(vec![model.clone(), model]))
        .unwrap();
    entry.attach(&mut scene).unwrap();

    let models = entry.take_models();
    assert_eq!(models.len(), 2);
    assert_eq!(entry.pending_models(), 2);
    assert!(entry.take_models().is_empty());

    assert!(entry.model_ready(&mut scene, Some(SceneNode::group("tower"))));
    assert!(!entry.model_ready(&mut scene, None));
    assert_eq!(entry.pending_models(), 0);
    assert_eq!(scene.attached_count(), 2);

    // the model comes out with the terrain branch
    entry.detach(&mut scene, 256).unwrap();
    assert_eq!(scene.attached_count(), 0);
}

#[test]
fn test_model_for_detached_tile_is_dropped() {
    let mut scene = SceneArena::new();
    let mut entry = active_entry(&mut scene, 0);
    entry.detach(&mut scene, 256).unwrap();

    assert!(!entry.model_ready(&mut scene, Some(SceneNode::group("late"))));
    assert_eq!(scene.attached_count(), 0);
}

#[test]
fn test_reschedule_issues_fresh_ticket() {
    let mut entry = entry();
    let first = entry.schedule(1).unwrap();
    first.start();
    assert_eq!(entry.state(), TileState::Loading);

    let mut other = TileEntry::new(bucket(), Cartesian::default(), 1.0);
    let second = other.schedule(2).unwrap();
    assert!(!second.is_started());
    assert_eq!(other.state(), TileState::Scheduled);
}

proptest! {
    /// With `R` chunks to release and budget `B`, an entry is freed after
    /// exactly ceil(R/B) steps and is never attached in between.
    #[test]
    fn prop_freed_after_ceil_r_over_b_steps(
        light_categories in 0usize..=4,
        budget in 1usize..6,
    ) {
        let mut scene = SceneArena::new();
        let mut entry = active_entry(&mut scene, light_categories);
        let categories = 1 + light_categories;

        entry.detach(&mut scene, 4096).unwrap();
        prop_assert!(!entry.is_attached());
        prop_assert_eq!(
            entry.free_progress().map(StagedFree::total_chunks),
            Some(categories)
        );

        let mut calls = 0;
        loop {
            let (state, spent) = entry.free_step(&mut scene, budget).unwrap();
            calls += 1;
            prop_assert!(spent >= 1 && spent <= budget);
            prop_assert!(!entry.is_attached());
            if state == TileState::Freed {
                break;
            }
            prop_assert!(matches!(state, TileState::PartiallyFreed(_)));
        }
        prop_assert_eq!(calls, categories.div_ceil(budget));
    }

    /// Chunk-limited categories take one step per chunk.
    #[test]
    fn prop_chunked_terrain_step_count(
        leaves in 1usize..200,
        max_nodes in 1usize..40,
    ) {
        let mut scene = SceneArena::new();
        let mut terrain = SceneNode::group("terrain");
        for i in 0..leaves {
            terrain.add_child(SceneNode::geometry(format!("patch-{i}"), 3));
        }
        let mut entry = entry();
        entry.schedule(1).unwrap();
        entry.fill(TileContent::new(terrain, 1.0)).unwrap();
        entry.attach(&mut scene).unwrap();
        entry.detach(&mut scene, max_nodes).unwrap();

        let mut calls = 0;
        while entry.free_step(&mut scene, 1).unwrap().0 != TileState::Freed {
            calls += 1;
        }
        calls += 1;
        prop_assert_eq!(calls, leaves.div_ceil(max_nodes));
        prop_assert_eq!(scene.released(), leaves);
    }
}
