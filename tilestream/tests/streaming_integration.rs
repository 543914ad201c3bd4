//! End-to-end streaming: config file, scenery on disk, threaded loader and
//! a viewer flying across bucket boundaries.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::TempDir;
use tilestream::bucket::{Bucket, BucketAddressing, SgBucketAddressing};
use tilestream::config::{ConfigFile, ConfigLocation};
use tilestream::loader::{ModelReader, TilePayload, TileReadError, TileReader};
use tilestream::manager::{TileManager, TileManagerConfig, ViewerPosition};
use tilestream::scene::{ContentCategory, SceneArena, SceneNode};
use tilestream::tile::{LightPointLists, TileState};

/// Any readable file is a terrain mesh; `apt*` files carry runway lights.
struct DiskTiles;

impl TileReader for DiskTiles {
    fn read_tile(&self, path: &Path) -> Result<TilePayload, TileReadError> {
        fs::metadata(path).map_err(|_| TileReadError::NotFound(path.to_path_buf()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut lights = LightPointLists::default();
        if name.starts_with("apt") {
            lights.runway.push(SceneNode::light_points("rwy28l", 64));
        }
        Ok(TilePayload {
            geometry: SceneNode::group(name).with_child(SceneNode::geometry("mesh", 2_000)),
            bounding_radius: 12_000.0,
            lights,
        })
    }
}

struct DiskModels;

impl ModelReader for DiskModels {
    fn load_model(&self, path: &Path) -> Result<SceneNode, TileReadError> {
        fs::metadata(path).map_err(|_| TileReadError::NotFound(path.to_path_buf()))?;
        Ok(SceneNode::group("model").with_child(SceneNode::geometry("lod0", 50)))
    }
}

fn write_gz_tile(root: &Path, bucket: &Bucket, manifest: &str, files: &[&str]) {
    let dir = root.join(bucket.base_path());
    fs::create_dir_all(&dir).unwrap();

    let file = fs::File::create(dir.join(format!("{}.stg.gz", bucket.index()))).unwrap();
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder.write_all(manifest.as_bytes()).unwrap();
    encoder.finish().unwrap();

    for name in files {
        fs::write(dir.join(name), b"payload").unwrap();
    }
}

fn write_config(home: &Path, scenery: &Path) -> ConfigFile {
    let location = ConfigLocation::under(home);
    let path = location.ensure_exists().unwrap();
    fs::write(
        &path,
        format!(
            "[scenery]\npaths = {}\n\n[cache]\nmax_tiles = 30\n\n[view]\nvisibility = 20000\n\n[loader]\nthreads = 2\n\n[manager]\ndelete_budget = 2\n",
            scenery.display()
        ),
    )
    .unwrap();
    location.load().unwrap()
}

/// Every invariant that must hold between two frames.
fn check_frame(manager: &TileManager, scene: &SceneArena) {
    let cache = manager.cache();
    assert!(cache.size() <= cache.max_size());

    let buckets = cache.buckets();
    let unique: HashSet<_> = buckets.iter().collect();
    assert_eq!(unique.len(), buckets.len());

    let attached = cache.iter().filter(|e| e.is_attached()).count();
    assert_eq!(scene.branch_len(ContentCategory::Terrain), attached);

    for entry in manager.pending_deletes() {
        assert!(!entry.is_attached());
        if let Some(cached) = cache.get(&entry.bucket()) {
            assert_ne!(cached.generation(), entry.generation());
        }
        assert!(matches!(
            entry.state(),
            TileState::PendingEviction | TileState::PartiallyFreed(_)
        ));
    }
}

fn run_until(
    manager: &mut TileManager,
    viewer: &ViewerPosition,
    visibility_m: f64,
    scene: &mut SceneArena,
    mut done: impl FnMut(&TileManager, &SceneArena) -> bool,
) {
    for _ in 0..5_000 {
        manager.update(viewer, visibility_m, scene).unwrap();
        check_frame(manager, scene);
        if done(manager, scene) {
            return;
        }
        thread::sleep(Duration::from_millis(1));
    }
    panic!("condition not reached");
}

fn ring_settled(manager: &TileManager, _: &SceneArena) -> bool {
    manager.deferred().next().is_none()
        && manager
            .working_set()
            .iter()
            .all(|b| manager.cache().get(b).is_some_and(|e| e.is_attached()))
        && manager.cache().iter().all(|e| e.pending_models() == 0)
}

#[test]
fn test_fly_across_buckets() {
    let scenery = TempDir::new().unwrap();
    let home = TempDir::new().unwrap();
    let file = write_config(home.path(), scenery.path());
    let config = TileManagerConfig::from(&file);
    assert_eq!(config.loader_threads(), 2);

    let addressing = SgBucketAddressing::new();
    let start = ViewerPosition::new(-122.375, 37.619, 1_500.0);
    let ksfo = addressing.bucket_for(start.lon_deg, start.lat_deg).unwrap();
    write_gz_tile(
        scenery.path(),
        &ksfo,
        "OBJECT_BASE base.btg\nOBJECT apt.btg\nOBJECT_STATIC tower.ac -122.37 37.61 4 90\nBOGUS line\n",
        &["base.btg", "apt.btg", "tower.ac"],
    );

    let mut manager = TileManager::new(
        config,
        Box::new(addressing),
        Arc::new(DiskTiles),
        Arc::new(DiskModels),
    );
    let mut scene = SceneArena::new();
    let visibility = file.view.visibility_m;

    run_until(&mut manager, &start, visibility, &mut scene, ring_settled);

    let home_tile = manager.cache().get(&ksfo).unwrap();
    assert!(!home_tile.is_placeholder());
    assert!(home_tile.is_inner_ring());
    assert_eq!(scene.branch_len(ContentCategory::RunwayLights), 1);
    assert_eq!(manager.stats().models_attached, 1);

    // head east, crossing a bucket boundary every few frames
    let mut viewer = start;
    for _ in 0..120 {
        viewer.lon_deg += 0.02;
        manager.update(&viewer, visibility, &mut scene).unwrap();
        check_frame(&manager, &scene);
        thread::sleep(Duration::from_millis(1));
    }

    run_until(&mut manager, &viewer, visibility, &mut scene, ring_settled);
    run_until(&mut manager, &viewer, visibility, &mut scene, |m, _| {
        m.pending_deletes().next().is_none()
    });

    let stats = manager.stats();
    assert!(stats.scheduling_passes > 1);
    assert_eq!(stats.teleports, 0);
    assert!(stats.evictions > 0);
    assert_eq!(stats.tiles_freed, stats.evictions + stats.stale_discarded);
    assert!(!manager.cache().exists(&ksfo));
    assert_eq!(scene.branch_len(ContentCategory::RunwayLights), 0);
}

#[test]
fn test_teleport_then_reinit() {
    let scenery = TempDir::new().unwrap();
    let config = TileManagerConfig::new()
        .with_scenery_paths(vec![scenery.path().to_path_buf()])
        .with_loader_threads(1)
        .with_max_tiles(40);
    let mut manager = TileManager::new(
        config,
        Box::new(SgBucketAddressing::new()),
        Arc::new(DiskTiles),
        Arc::new(DiskModels),
    );
    let mut scene = SceneArena::new();

    let ksfo = ViewerPosition::new(-122.375, 37.619, 300.0);
    run_until(&mut manager, &ksfo, 20_000.0, &mut scene, ring_settled);
    assert!(manager.stats().placeholder_rate() > 0.99);

    let jfk = ViewerPosition::new(-73.78, 40.64, 300.0);
    let report = manager.update(&jfk, 20_000.0, &mut scene).unwrap();
    assert!(report.teleported);
    check_frame(&manager, &scene);
    run_until(&mut manager, &jfk, 20_000.0, &mut scene, ring_settled);

    manager.reinit(&mut scene).unwrap();
    assert!(manager.cache().is_empty());
    assert_eq!(scene.attached_count(), 0);

    run_until(&mut manager, &jfk, 20_000.0, &mut scene, ring_settled);
    assert_eq!(manager.stats().teleports, 1);
}
