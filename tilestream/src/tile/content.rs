//! Tile content built by the loader.

use std::collections::BTreeMap;
use std::mem;
use std::path::PathBuf;

use crate::bucket::Bucket;
use crate::scene::{ContentCategory, SceneNode};

/// Light point sets produced alongside terrain geometry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LightPointLists {
    pub ground: Vec<SceneNode>,
    pub vasi: Vec<SceneNode>,
    pub runway: Vec<SceneNode>,
    pub taxi: Vec<SceneNode>,
}

impl LightPointLists {
    pub fn is_empty(&self) -> bool {
        self.ground.is_empty() && self.vasi.is_empty() && self.runway.is_empty() && self.taxi.is_empty()
    }

    /// Move every list of `other` onto the end of ours.
    pub fn append(&mut self, mut other: LightPointLists) {
        self.ground.append(&mut other.ground);
        self.vasi.append(&mut other.vasi);
        self.runway.append(&mut other.runway);
        self.taxi.append(&mut other.taxi);
    }

    fn into_categories(self) -> [(ContentCategory, Vec<SceneNode>); 4] {
        [
            (ContentCategory::GroundLights, self.ground),
            (ContentCategory::VasiLights, self.vasi),
            (ContentCategory::RunwayLights, self.runway),
            (ContentCategory::TaxiLights, self.taxi),
        ]
    }
}

/// A static model placed on a tile, loaded after the tile is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelPlacement {
    pub path: PathBuf,
    pub lon_deg: f64,
    pub lat_deg: f64,
    pub elevation_m: f64,
    pub heading_deg: f64,
}

/// Everything a tile contributes to the scene, grouped by category.
///
/// Only non-empty categories are stored. Terrain is always present.
#[derive(Debug)]
pub struct TileContent {
    branches: BTreeMap<ContentCategory, SceneNode>,
    bounding_radius: f64,
    models: Vec<ModelPlacement>,
    placeholder: bool,
}

impl TileContent {
    pub fn new(terrain: SceneNode, bounding_radius: f64) -> Self {
        let mut branches = BTreeMap::new();
        branches.insert(ContentCategory::Terrain, terrain);
        Self {
            branches,
            bounding_radius,
            models: Vec::new(),
            placeholder: false,
        }
    }

    /// Flat surface covering `bucket`, used when no scenery could be read.
    pub fn placeholder(bucket: &Bucket) -> Self {
        let terrain = SceneNode::group(format!("ocean-{}", bucket.index()))
            .with_child(SceneNode::geometry("surface", 4));
        let radius = 0.5 * bucket.width_m().hypot(bucket.height_m());

        let mut content = Self::new(terrain, radius);
        content.placeholder = true;
        content
    }

    /// Group each non-empty light list into its own category branch.
    pub fn with_lights(mut self, lights: LightPointLists) -> Self {
        for (category, nodes) in lights.into_categories() {
            if nodes.is_empty() {
                continue;
            }
            let branch = self
                .branches
                .entry(category)
                .or_insert_with(|| SceneNode::group(category.name()));
            for node in nodes {
                branch.add_child(node);
            }
        }
        self
    }

    /// Merge extra geometry into the terrain branch.
    pub fn with_terrain_children(mut self, children: Vec<SceneNode>) -> Self {
        if let Some(terrain) = self.branches.get_mut(&ContentCategory::Terrain) {
            for child in children {
                terrain.add_child(child);
            }
        }
        self
    }

    pub fn with_models(mut self, models: Vec<ModelPlacement>) -> Self {
        self.models = models;
        self
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    pub fn bounding_radius(&self) -> f64 {
        self.bounding_radius
    }

    /// Categories with content, in release order.
    pub fn categories(&self) -> impl Iterator<Item = ContentCategory> + '_ {
        self.branches.keys().copied()
    }

    pub fn category_count(&self) -> usize {
        self.branches.len()
    }

    pub fn branch(&self, category: ContentCategory) -> Option<&SceneNode> {
        self.branches.get(&category)
    }

    /// Static models still waiting to be loaded.
    pub fn models(&self) -> &[ModelPlacement] {
        &self.models
    }

    /// Total scene nodes held.
    pub fn node_count(&self) -> usize {
        self.branches.values().map(SceneNode::node_count).sum()
    }

    pub(crate) fn take_branches(&mut self) -> BTreeMap<ContentCategory, SceneNode> {
        mem::take(&mut self.branches)
    }

    pub(crate) fn restore_branches(&mut self, branches: BTreeMap<ContentCategory, SceneNode>) {
        self.branches.extend(branches);
    }

    pub(crate) fn take_models(&mut self) -> Vec<ModelPlacement> {
        mem::take(&mut self.models)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_is_flat_terrain_only() {
        let bucket = Bucket::from_parts(-123, 37, 2, 4);
        let content = TileContent::placeholder(&bucket);

        assert!(content.is_placeholder());
        assert_eq!(
            content.categories().collect::<Vec<_>>(),
            vec![ContentCategory::Terrain]
        );
        assert!(content.bounding_radius() > 0.5 * bucket.height_m());
        assert!(content.models().is_empty());
    }

    #[test]
    fn test_only_non_empty_lights_become_categories() {
        let lights = LightPointLists {
            ground: vec![SceneNode::light_points("g", 40)],
            runway: vec![
                SceneNode::light_points("r1", 12),
                SceneNode::light_points("r2", 12),
            ],
            ..Default::default()
        };
        let content = TileContent::new(SceneNode::group("terrain"), 1000.0).with_lights(lights);

        assert_eq!(
            content.categories().collect::<Vec<_>>(),
            vec![
                ContentCategory::Terrain,
                ContentCategory::GroundLights,
                ContentCategory::RunwayLights
            ]
        );
        assert_eq!(
            content
                .branch(ContentCategory::RunwayLights)
                .map(SceneNode::node_count),
            Some(3)
        );
    }

    #[test]
    fn test_append_lights() {
        let mut a = LightPointLists {
            taxi: vec![SceneNode::light_points("t", 3)],
            ..Default::default()
        };
        assert!(!a.is_empty());
        a.append(LightPointLists {
            taxi: vec![SceneNode::light_points("t2", 3)],
            vasi: vec![SceneNode::light_points("v", 4)],
            ..Default::default()
        });
        assert_eq!(a.taxi.len(), 2);
        assert_eq!(a.vasi.len(), 1);
        assert!(LightPointLists::default().is_empty());
    }
}
