//! End-to-end checks across the capture pipeline crates

use approx::assert_relative_eq;
use capture3d_core::{BoundingBox, Error, Point3f, TriangleMesh};
use capture3d_pipeline::prelude::*;
use capture3d_simplification::{edge_incidence, find_boundaries, is_closed, smooth};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_frame(rng: &mut StdRng, width: u32, height: u32) -> Frame {
    let pixels = (0..width * height * 4).map(|_| rng.gen()).collect();
    Frame::new(width, height, pixels).unwrap()
}

fn random_cloud(rng: &mut StdRng, count: usize) -> PointCloud {
    (0..count)
        .map(|_| {
            Point::new(
                Point3f::new(
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-10.0..10.0),
                ),
                [rng.gen(), rng.gen(), rng.gen()],
                1.0,
            )
        })
        .collect()
}

fn cube() -> TriangleMesh {
    let vertices = vec![
        Point3f::new(0.0, 0.0, 0.0),
        Point3f::new(1.0, 0.0, 0.0),
        Point3f::new(1.0, 1.0, 0.0),
        Point3f::new(0.0, 1.0, 0.0),
        Point3f::new(0.0, 0.0, 1.0),
        Point3f::new(1.0, 0.0, 1.0),
        Point3f::new(1.0, 1.0, 1.0),
        Point3f::new(0.0, 1.0, 1.0),
    ];
    let triangles = vec![
        [0, 2, 1], [0, 3, 2],
        [4, 5, 6], [4, 6, 7],
        [0, 1, 5], [0, 5, 4],
        [1, 2, 6], [1, 6, 5],
        [2, 3, 7], [2, 7, 6],
        [3, 0, 4], [3, 4, 7],
    ];
    TriangleMesh::from_vertices_and_triangles(vertices, triangles)
}

fn grid(n: u32) -> TriangleMesh {
    let mut vertices = Vec::new();
    for y in 0..=n {
        for x in 0..=n {
            vertices.push(Point3f::new(x as f32, y as f32, 0.0));
        }
    }
    let row = n + 1;
    let mut triangles = Vec::new();
    for y in 0..n {
        for x in 0..n {
            let i = y * row + x;
            triangles.push([i, i + 1, i + row + 1]);
            triangles.push([i, i + row + 1, i + row]);
        }
    }
    TriangleMesh::from_vertices_and_triangles(vertices, triangles)
}

#[test]
fn test_build_is_deterministic() {
    let mut rng = StdRng::seed_from_u64(7);
    let frames: Vec<_> = (0..3).map(|_| random_frame(&mut rng, 16, 12)).collect();
    let params = BuildParams::default();
    let motions = [Vector3f::zeros(), Vector3f::new(0.6, 0.8, 0.0), Vector3f::x()];

    let first = build_point_cloud(&frames, Some(&motions[..]), &params).unwrap();
    let second = build_point_cloud(&frames, Some(&motions[..]), &params).unwrap();
    assert!(!first.is_empty());
    assert_eq!(first.as_bytes(), second.as_bytes());
}

#[test]
fn test_lod_levels_never_grow() {
    let mut rng = StdRng::seed_from_u64(11);
    for count in [1, 2, 7, 100, 1000] {
        let cloud = random_cloud(&mut rng, count);
        let levels = generate_lod_levels(cloud, 6).unwrap();
        assert_eq!(levels.len(), 6);
        for pair in levels.windows(2) {
            assert!(pair[1].len() <= pair[0].len());
            assert!(!pair[1].is_empty());
        }
    }
}

#[test]
fn test_index_covers_every_point() {
    let mut rng = StdRng::seed_from_u64(3);
    let cloud = random_cloud(&mut rng, 2000);
    let index = build_index(&cloud, 6, 16).unwrap();

    for (i, point) in cloud.iter().enumerate() {
        let query = BoundingBox::around(point.position, 0.01);
        assert!(index.query(&query).contains(&i), "point {} missing", i);
    }
}

fn fan_on_shared_edge() -> TriangleMesh {
    TriangleMesh::from_vertices_and_triangles(
        vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(0.5, 1.0, 0.0),
            Point3f::new(0.5, -1.0, 0.0),
            Point3f::new(0.5, 0.0, 1.0),
        ],
        vec![[0, 1, 2], [1, 0, 3], [0, 1, 4]],
    )
}

#[test]
fn test_closed_mesh_has_no_boundaries() {
    let closed = cube();
    assert!(is_closed(&closed));
    assert!(find_boundaries(&closed).unwrap().is_empty());

    let mut open = cube();
    open.triangles.truncate(10);
    assert!(!is_closed(&open));
    assert_eq!(find_boundaries(&open).unwrap().len(), 1);
}

#[test]
fn test_boundaries_empty_iff_every_edge_shared_twice() {
    let mut rng = StdRng::seed_from_u64(29);
    for source in [cube(), grid(3)] {
        for _ in 0..100 {
            let mut mesh = source.clone();
            mesh.triangles.retain(|_| rng.gen_bool(0.8));

            let closed = edge_incidence(&mesh).values().all(|&count| count == 2);
            let loops = find_boundaries(&mesh).unwrap();
            assert_eq!(loops.is_empty(), closed);
            assert!(loops.iter().all(|l| l.closed));
        }
    }
}

#[test]
fn test_non_manifold_chain_is_reported_but_not_filled() {
    let mesh = fan_on_shared_edge();
    let loops = find_boundaries(&mesh).unwrap();
    assert_eq!(loops.len(), 2);
    assert_eq!(loops.iter().filter(|l| !l.closed).count(), 1);

    let repaired = repair_mesh(&mesh).unwrap();
    assert_eq!(repaired.triangle_count(), 5);
    assert!(repaired.triangles[3..].iter().all(|t| !t.contains(&4)));
}

#[test]
fn test_frame_size_mismatch_propagates() {
    let frames = [
        Frame::filled(4, 4, [255, 255, 255, 255]),
        Frame::filled(8, 4, [255, 255, 255, 255]),
    ];
    let mut pipeline = CapturePipeline::new(PipelineConfig::default()).unwrap();
    assert!(matches!(
        pipeline.process_video(&frames, None),
        Err(Error::FrameSizeMismatch {
            expected: (4, 4),
            actual: (8, 4)
        })
    ));

    // stills of different sizes are fine
    assert!(pipeline.process_frames(&frames, None).is_ok());

    let mask = SegmentationMask::new(2, 2, vec![1.0; 4]).unwrap();
    assert!(matches!(
        pipeline.process_frames(&frames[..1], Some(std::slice::from_ref(&mask))),
        Err(Error::FrameSizeMismatch { .. })
    ));
}

#[test]
fn test_alpha_threshold_drops_faint_pixel() {
    let mut frame = Frame::filled(2, 2, [255, 255, 255, 255]);
    frame.set_pixel(1, 0, [255, 255, 255, 51]);
    let params = BuildParams::default();
    assert_eq!(params.sampler.alpha_threshold, 0.5);

    let cloud = build_point_cloud(&[frame], None, &params).unwrap();
    assert_eq!(cloud.len(), 3);
}

#[test]
fn test_single_point_cloud_survives_every_level() {
    let cloud = PointCloud::from_points(vec![Point::new(Point3f::origin(), [1.0; 3], 1.0)]);
    let levels = generate_lod_levels(cloud, 4).unwrap();
    assert_eq!(levels.len(), 4);
    assert!(levels.iter().all(|level| level.len() == 1));
}

#[test]
fn test_strided_frame_positions() {
    let frame = Frame::filled(4, 4, [255, 255, 255, 255]);
    let mut params = BuildParams::default();
    params.sampler.stride = 2;
    params.sampler.scale = 1.0;

    let cloud = build_point_cloud(&[frame], None, &params).unwrap();
    let expected = [(-2.0, 2.0), (0.0, 2.0), (-2.0, 0.0), (0.0, 0.0)];
    assert_eq!(cloud.len(), expected.len());
    for (point, (x, y)) in cloud.iter().zip(expected) {
        assert_relative_eq!(point.position.x, x);
        assert_relative_eq!(point.position.y, y);
        assert_relative_eq!(point.position.z, 0.0);
    }
}

#[test]
fn test_decimate_to_zero_does_not_fail() {
    let mesh = grid(6);
    let simplified = simplify_mesh(&mesh, 0).unwrap();
    assert!(simplified.triangle_count() < mesh.triangle_count());
    assert!(simplified.validate().is_ok());

    let again = simplify_mesh(&simplified, 0).unwrap();
    assert!(again.triangle_count() <= simplified.triangle_count());
}

#[test]
fn test_smooth_without_neighbors_is_noop() {
    let vertices = vec![
        Point3f::new(1.0, 2.0, 3.0),
        Point3f::new(-4.0, 0.5, 2.0),
        Point3f::new(9.0, -1.0, 0.0),
    ];
    // collapsed triangles give every vertex an empty ring
    let mesh = TriangleMesh::from_vertices_and_triangles(
        vertices.clone(),
        vec![[0, 0, 0], [1, 1, 1], [2, 2, 2]],
    );
    let smoothed = smooth(&mesh).unwrap();
    assert_eq!(smoothed.vertices, vertices);
    assert_eq!(smoothed.triangles, mesh.triangles);
}

#[test]
fn test_smooth_rejects_mesh_without_triangles() {
    let mesh = TriangleMesh::from_vertices_and_triangles(vec![Point3f::origin(); 3], Vec::new());
    assert!(matches!(smooth(&mesh), Err(Error::UnindexedMesh)));
}

#[test]
fn test_repair_closes_open_mesh() {
    let mut open = cube();
    open.triangles.truncate(10);
    let repaired = repair_mesh(&open).unwrap();
    assert!(is_closed(&repaired));
    assert_eq!(repaired.triangle_count(), 12);
}

#[test]
fn test_active_level_by_distance() {
    let mut rng = StdRng::seed_from_u64(5);
    let levels = generate_lod_levels(random_cloud(&mut rng, 256), 5).unwrap();

    let near = select_active_level(&levels, 1.0).unwrap();
    let far = select_active_level(&levels, 100.0).unwrap();
    assert_eq!(near.len(), levels[0].len());
    assert_eq!(far.len(), levels[4].len());
}

#[test]
fn test_pipeline_with_background_filter() {
    let mut rng = StdRng::seed_from_u64(19);
    let cloud = random_cloud(&mut rng, 500);
    let generation = cloud.generation;

    let worker = FilterWorker::spawn(IdentityFilter);
    let ticket = worker.submit(cloud.clone()).unwrap();
    let filtered = ticket.wait().unwrap();
    assert_eq!(filtered.as_bytes(), cloud.as_bytes());
    assert_eq!(filtered.generation, generation);

    let cancelled = worker.submit(cloud).unwrap();
    cancelled.cancel();
    assert!(matches!(cancelled.wait(), Err(Error::Cancelled)));
}

#[test]
fn test_capture_pipeline_video() {
    let mut rng = StdRng::seed_from_u64(23);
    let frames: Vec<_> = (0..4).map(|_| random_frame(&mut rng, 12, 12)).collect();
    let config = PipelineConfig::for_quality(QualityTier::Low).with_alpha_threshold(0.0);
    let mut pipeline = CapturePipeline::new(config).unwrap();

    let output = pipeline.process_video(&frames, None).unwrap();
    assert_eq!(output.levels.len(), 3);
    assert_eq!(output.levels[0].len(), 4 * 9);
    assert_eq!(output.index.len(), 4 * 9);

    let snapshot = pipeline.shared_index().snapshot().unwrap();
    assert_eq!(snapshot.generation(), output.generation());
    let nearest = snapshot.find_k_nearest(&Point3f::origin(), 3);
    assert_eq!(nearest.len(), 3);
}
