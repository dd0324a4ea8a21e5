//! Requests and replies exchanged with the chunk forge.
//!
//! Both directions have a JSON form: requests are tagged by `taskType`
//! (`buildTask`, `heightTask`), replies by `status`.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::geometry::{ChunkPatch, FaceDirection};
use crate::mesh::{validate_subdivisions, ChunkResult, NormalMode};
use crate::terrain::{Crater, CraterModifiers};

use super::ForgeError;

/// Deepest chunk level accepted; `2^depth` must stay well inside f64 precision.
pub const MAX_DEPTH: u32 = 32;

/// Identifies a submitted task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

/// Build one chunk mesh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkRequest {
    /// Edge length of a depth-0 chunk; the base sphere radius is half of it.
    pub chunk_length: f64,
    pub subdivisions: u32,
    pub depth: u32,
    pub face_direction: FaceDirection,
    /// Chunk origin in the unrotated (+Z face) frame.
    pub position: DVec3,
    #[serde(default)]
    pub craters: Vec<Crater>,
    #[serde(default)]
    pub crater_modifiers: CraterModifiers,
    #[serde(default)]
    pub normal_mode: NormalMode,
}

impl ChunkRequest {
    /// The depth-0 chunk covering a whole face.
    pub fn root(face_direction: FaceDirection, chunk_length: f64, subdivisions: u32) -> Self {
        Self {
            chunk_length,
            subdivisions,
            depth: 0,
            face_direction,
            position: DVec3::new(0.0, 0.0, chunk_length / 2.0),
            craters: Vec::new(),
            crater_modifiers: CraterModifiers::default(),
            normal_mode: NormalMode::default(),
        }
    }

    /// The four children of this chunk, one depth level down.
    pub fn children(&self) -> [ChunkRequest; 4] {
        let quarter = self.chunk_length / 2f64.powi(self.depth as i32 + 2);
        [(-1.0, -1.0), (1.0, -1.0), (-1.0, 1.0), (1.0, 1.0)].map(|(sx, sy)| ChunkRequest {
            depth: self.depth + 1,
            position: self.position + DVec3::new(sx * quarter, sy * quarter, 0.0),
            ..self.clone()
        })
    }

    pub fn validate(&self) -> Result<(), ForgeError> {
        if !(self.chunk_length.is_finite() && self.chunk_length > 0.0) {
            return Err(ProtocolError::InvalidChunkLength(self.chunk_length).into());
        }
        if !self.position.is_finite() {
            return Err(ProtocolError::InvalidPosition(self.position.to_array()).into());
        }
        if self.depth > MAX_DEPTH {
            return Err(ProtocolError::InvalidDepth(self.depth).into());
        }
        validate_subdivisions(self.subdivisions)?;
        Ok(())
    }

    pub fn patch(&self) -> ChunkPatch {
        ChunkPatch::new(
            self.chunk_length,
            self.depth,
            self.subdivisions,
            self.face_direction,
            self.position,
        )
    }
}

/// Query the surface radius along one direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeightRequest {
    pub direction: DVec3,
    /// Base sphere radius.
    pub radius: f64,
    #[serde(default)]
    pub craters: Vec<Crater>,
    #[serde(default)]
    pub crater_modifiers: CraterModifiers,
}

impl HeightRequest {
    pub fn validate(&self) -> Result<(), ForgeError> {
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(ProtocolError::InvalidRadius(self.radius).into());
        }
        if !self.direction.is_finite() || self.direction == DVec3::ZERO {
            return Err(ProtocolError::InvalidDirection(self.direction.to_array()).into());
        }
        Ok(())
    }
}

/// Surface point found by a [`HeightRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeightResult {
    /// Distance from the planet centre.
    pub height: f64,
    pub position: DVec3,
}

/// A unit of work for the forge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "taskType")]
pub enum Task {
    #[serde(rename = "buildTask")]
    Build(ChunkRequest),
    #[serde(rename = "heightTask", alias = "collisionTask")]
    Height(HeightRequest),
}

impl Task {
    pub fn from_json(json: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn validate(&self) -> Result<(), ForgeError> {
        match self {
            Task::Build(request) => request.validate(),
            Task::Height(request) => request.validate(),
        }
    }

    /// Scheduling depth: shallower tasks are dispatched first. Height
    /// queries rank with root chunks.
    pub fn depth(&self) -> u32 {
        match self {
            Task::Build(request) => request.depth,
            Task::Height(_) => 0,
        }
    }
}

/// What a finished task produced.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutput {
    Chunk(ChunkResult),
    Height(HeightResult),
}

/// A task as handed back by the forge.
#[derive(Debug)]
pub struct Completed {
    pub id: TaskId,
    pub outcome: Result<TaskOutput, ForgeError>,
}

/// Reply wire form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ForgeMessage {
    Chunk { id: TaskId, result: ChunkResult },
    Height { id: TaskId, result: HeightResult },
    Error { id: TaskId, message: String },
}

impl ForgeMessage {
    pub fn from_json(json: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn id(&self) -> TaskId {
        match self {
            ForgeMessage::Chunk { id, .. }
            | ForgeMessage::Height { id, .. }
            | ForgeMessage::Error { id, .. } => *id,
        }
    }
}

impl From<Completed> for ForgeMessage {
    fn from(completed: Completed) -> Self {
        let id = completed.id;
        match completed.outcome {
            Ok(TaskOutput::Chunk(result)) => ForgeMessage::Chunk { id, result },
            Ok(TaskOutput::Height(result)) => ForgeMessage::Height { id, result },
            Err(err) => ForgeMessage::Error {
                id,
                message: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::mesh::IndexBuffer;

    const BUILD_JSON: &str = r#"{
        "taskType": "buildTask",
        "chunkLength": 1000,
        "subdivisions": 4,
        "depth": 0,
        "faceDirection": "Forward",
        "position": [0, 0, 500],
        "craters": [],
        "craterModifiers": {
            "radiusModifier": 1, "steepnessModifier": 1, "maxDepthModifier": 1, "scaleFactor": 1
        }
    }"#;

    #[test]
    fn test_decode_build_task() {
        let task = Task::from_json(BUILD_JSON).unwrap();
        assert_eq!(task, Task::Build(ChunkRequest::root(FaceDirection::Forward, 1000.0, 4)));
        assert!(task.validate().is_ok());
    }

    #[test]
    fn test_decode_height_task_and_alias() {
        let json = r#"{ "taskType": "collisionTask", "direction": [0, 1, 0], "radius": 10 }"#;
        let Task::Height(request) = Task::from_json(json).unwrap() else {
            panic!("expected a height task");
        };
        assert_eq!(request.direction, DVec3::Y);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_malformed_requests() {
        let unknown_face = BUILD_JSON.replace("Forward", "Sideways");
        assert!(matches!(Task::from_json(&unknown_face), Err(ProtocolError::Malformed(_))));
        assert!(matches!(Task::from_json("{}"), Err(ProtocolError::Malformed(_))));
        assert!(matches!(
            Task::from_json(r#"{ "taskType": "danceTask" }"#),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn test_validation_errors() {
        let negative = ChunkRequest {
            chunk_length: -5.0,
            ..ChunkRequest::root(FaceDirection::Up, 1.0, 4)
        };
        assert!(matches!(
            negative.validate(),
            Err(ForgeError::Protocol(ProtocolError::InvalidChunkLength(_)))
        ));

        let zero_subs = ChunkRequest::root(FaceDirection::Up, 1000.0, 0);
        assert!(matches!(
            zero_subs.validate(),
            Err(ForgeError::Config(ConfigError::ZeroSubdivisions))
        ));

        let too_deep = ChunkRequest {
            depth: MAX_DEPTH + 1,
            ..ChunkRequest::root(FaceDirection::Up, 1000.0, 4)
        };
        assert!(matches!(
            too_deep.validate(),
            Err(ForgeError::Protocol(ProtocolError::InvalidDepth(_)))
        ));

        let nowhere = HeightRequest {
            direction: DVec3::ZERO,
            radius: 1.0,
            craters: Vec::new(),
            crater_modifiers: CraterModifiers::default(),
        };
        assert!(nowhere.validate().is_err());
    }

    #[test]
    fn test_children_tile_the_parent() {
        let parent = ChunkRequest::root(FaceDirection::Left, 1000.0, 4);
        let children = parent.children();
        for child in &children {
            assert_eq!(child.depth, 1);
            assert_eq!(child.patch().patch_size(), 500.0);
            assert_eq!(child.position.z, 500.0);
            assert_eq!(child.position.x.abs(), 250.0);
            assert_eq!(child.position.y.abs(), 250.0);
        }
        let grandchildren = children[3].children();
        assert_eq!(grandchildren[0].position, DVec3::new(125.0, 125.0, 500.0));
    }

    #[test]
    fn test_reply_json_round_trip() {
        let mut indices = IndexBuffer::with_capacity(3, 3);
        for i in [0, 1, 2] {
            indices.push(i);
        }
        let message = ForgeMessage::Chunk {
            id: TaskId(7),
            result: ChunkResult {
                positions: vec![0.0; 9],
                indices,
                normals: vec![0.0; 9],
                average_elevation: 1.5,
            },
        };
        let json = message.to_json().unwrap();
        assert!(json.contains("\"status\":\"chunk\""));
        assert!(json.contains("\"averageElevation\":1.5"));
        assert_eq!(ForgeMessage::from_json(&json).unwrap(), message);
    }

    #[test]
    fn test_failed_task_becomes_error_reply() {
        let completed = Completed {
            id: TaskId(3),
            outcome: Err(ProtocolError::InvalidDepth(99).into()),
        };
        let message = ForgeMessage::from(completed);
        assert_eq!(message.id(), TaskId(3));
        assert!(matches!(message, ForgeMessage::Error { ref message, .. } if message.contains("99")));
    }
}
