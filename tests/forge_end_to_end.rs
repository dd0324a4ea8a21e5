//! Requests decoded from JSON, run through the worker pool, checked against
//! the mesh and terrain invariants.

use std::sync::Arc;

use glam::DVec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use planetforge::error::{ConfigError, ProtocolError};
use planetforge::forge::{ChunkForge, ForgeConfig, ForgeError, ForgeMessage, Task, TaskOutput};
use planetforge::layers::{FractalLayer, Layer, LayerConfig};
use planetforge::mesh::{ChunkResult, MeshError};
use planetforge::noise::{noise4, simplex01, simplex11};
use planetforge::terrain::{Seed, TerrainFunction, TerrainSettings};
use planetforge::{ChunkRequest, FaceDirection};

const BUILD_REQUEST: &str = r#"{
    "taskType": "buildTask",
    "chunkLength": 1000,
    "subdivisions": 4,
    "depth": 0,
    "faceDirection": "Forward",
    "position": [0, 0, 500],
    "craters": [],
    "craterModifiers": {
        "radiusModifier": 1,
        "steepnessModifier": 1,
        "maxDepthModifier": 1,
        "scaleFactor": 1
    }
}"#;

fn forge(workers: usize) -> ChunkForge {
    let terrain = TerrainFunction::new(TerrainSettings::earth_like(), Seed::from(7)).unwrap();
    ChunkForge::new(
        Arc::new(terrain),
        ForgeConfig {
            workers,
            ..ForgeConfig::default()
        },
    )
    .unwrap()
}

fn run_chunk(forge: &ChunkForge, task: Task) -> ChunkResult {
    let id = forge.submit(task).unwrap();
    let completed = forge.recv().unwrap();
    assert_eq!(completed.id, id);
    match completed.outcome.unwrap() {
        TaskOutput::Chunk(chunk) => chunk,
        other => panic!("expected a chunk, got {other:?}"),
    }
}

fn random_points(count: usize, rng_seed: u64, scale: f64) -> Vec<[f64; 4]> {
    let mut rng = ChaCha8Rng::seed_from_u64(rng_seed);
    (0..count)
        .map(|_| {
            [
                rng.random_range(-scale..scale),
                rng.random_range(-scale..scale),
                rng.random_range(-scale..scale),
                rng.random_range(-scale..scale),
            ]
        })
        .collect()
}

#[test]
fn test_json_request_builds_expected_chunk() {
    let forge = forge(2);
    let chunk = run_chunk(&forge, Task::from_json(BUILD_REQUEST).unwrap());

    assert_eq!(chunk.positions.len(), 75);
    assert_eq!(chunk.indices.len(), 96);
    assert_eq!(chunk.normals.len(), 75);

    let radius = 500.0;
    let relief = TerrainSettings::earth_like().total_relief();
    // f32 storage loses a little precision at this magnitude.
    let slack = 1e-2 * (radius + relief);
    for i in 0..chunk.vertex_count() {
        let distance = chunk.position(i).length() as f64;
        assert!(
            distance >= radius - relief - slack && distance <= radius + relief + slack,
            "vertex {i} at distance {distance}"
        );
    }
}

#[test]
fn test_chunk_geometry_invariants() {
    let forge = forge(1);
    let request = ChunkRequest::root(FaceDirection::Up, 1000.0, 8);
    let chunk = run_chunk(&forge, Task::Build(request));

    assert_eq!(chunk.vertex_count(), 81);
    assert_eq!(chunk.positions.len(), 243);
    assert_eq!(chunk.indices.len(), 384);
    assert_eq!(chunk.normals.len(), 243);
    for i in 0..chunk.vertex_count() {
        let length = chunk.normal(i).length();
        assert!((length - 1.0).abs() < 1e-4, "normal {i} has length {length}");
    }
    assert!(chunk.indices.iter().all(|index| (index as usize) < 81));
}

#[test]
fn test_reply_round_trips_through_json() {
    let forge = forge(1);
    forge.submit(Task::from_json(BUILD_REQUEST).unwrap()).unwrap();
    let reply = ForgeMessage::from(forge.recv().unwrap());
    let json = reply.to_json().unwrap();
    assert!(json.contains("\"status\":\"chunk\""));
    let ForgeMessage::Chunk { id, result } = ForgeMessage::from_json(&json).unwrap() else {
        panic!("expected a chunk reply");
    };
    assert_eq!(id, reply.id());
    assert_eq!(result.positions.len(), 75);
    assert_eq!(result.indices.len(), 96);
}

#[test]
fn test_zero_subdivisions_rejected_before_queueing() {
    let forge = forge(1);
    let request = ChunkRequest::root(FaceDirection::Left, 1000.0, 0);
    let err = forge.submit(Task::Build(request)).unwrap_err();
    assert!(matches!(err, ForgeError::Config(ConfigError::ZeroSubdivisions)));
    assert_eq!(forge.pending(), 0);
}

#[test]
fn test_malformed_requests_are_protocol_errors() {
    let unknown_face = BUILD_REQUEST.replace("\"Forward\"", "\"Inward\"");
    assert!(matches!(Task::from_json(&unknown_face), Err(ProtocolError::Malformed(_))));

    let negative_length = BUILD_REQUEST.replace("\"chunkLength\": 1000", "\"chunkLength\": -1000");
    let task = Task::from_json(&negative_length).unwrap();
    assert!(matches!(
        forge(1).submit(task),
        Err(ForgeError::Protocol(ProtocolError::InvalidChunkLength(_)))
    ));
}

#[test]
fn test_mesh_errors_convert_into_forge_errors() {
    let err: ForgeError = MeshError::from(ConfigError::ZeroSubdivisions).into();
    assert_eq!(err.to_string(), "subdivisions must be > 0");
}

#[test]
fn test_noise4_is_bit_identical_across_calls() {
    for [x, y, z, w] in random_points(1_000, 11, 100.0) {
        let first = noise4(x, y, z, w);
        let second = noise4(x, y, z, w);
        assert_eq!(first.0.to_bits(), second.0.to_bits());
        assert_eq!(first.1, second.1);
    }
}

#[test]
fn test_simplex_ranges() {
    for [x, y, z, w] in random_points(10_000, 12, 50.0) {
        let point = DVec3::new(x, y, z);
        let (unit, _) = simplex01(point, w);
        let (signed, _) = simplex11(point, w);
        assert!((0.0..=1.0).contains(&unit), "simplex01 = {unit}");
        assert!((-1.0..=1.0).contains(&signed), "simplex11 = {signed}");
    }
}

#[test]
fn test_fractal_layer_normalized() {
    let layer = FractalLayer::new(LayerConfig::new(2.0, 6, 2.0, 2.0, 1.0, 0.0), 100.0).unwrap();
    for [x, y, z, w] in random_points(2_000, 13, 1.0) {
        let Some(unit) = DVec3::new(x, y, z).try_normalize() else {
            continue;
        };
        let value = layer.evaluate(unit, w * 1000.0).value;
        assert!((0.0..=1.0 + 1e-9).contains(&value), "fractal = {value}");
    }
}

#[test]
fn test_fractal_layer_degenerate_guards() {
    let unit_decay = LayerConfig::new(1.0, 4, 1.0, 2.0, 1.0, 0.0);
    assert_eq!(
        FractalLayer::new(unit_decay, 100.0).err(),
        Some(ConfigError::UnitDecay(1.0))
    );
    let unit_min = LayerConfig::new(1.0, 4, 2.0, 2.0, 1.0, 1.0);
    assert_eq!(
        FractalLayer::new(unit_min, 100.0).err(),
        Some(ConfigError::UnitMinValue(1.0))
    );
}

#[test]
fn test_whole_planet_depth_one() {
    let forge = forge(4);
    let mut ids = Vec::new();
    for face in FaceDirection::all() {
        for child in ChunkRequest::root(face, 200.0, 4).children() {
            ids.push(forge.submit(Task::Build(child)).unwrap());
        }
    }
    let completed = forge.drain();
    assert_eq!(completed.len(), 24);
    assert_eq!(forge.pending(), 0);
    for done in completed {
        assert!(ids.contains(&done.id));
        let Ok(TaskOutput::Chunk(chunk)) = done.outcome else {
            panic!("task {:?} failed", done.id);
        };
        assert_eq!(chunk.vertex_count(), 25);
    }
}
