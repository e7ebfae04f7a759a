use serde::{Deserialize, Serialize};

/// Minor checkpoint as reported by the game: a titled point on the climb with
/// its own reached flag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub name: String,
    pub world_z: f64,
    #[serde(default)]
    pub reached: bool,
}

impl Waypoint {
    pub fn new(name: impl Into<String>, world_z: f64, reached: bool) -> Self {
        Self {
            name: name.into(),
            world_z,
            reached,
        }
    }
}

/// Major segment boundary. It carries no reached flag of its own; a boundary
/// counts as reached once the local agent is above it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentBoundary {
    pub name: String,
    pub world_z: f64,
}

impl SegmentBoundary {
    pub fn new(name: impl Into<String>, world_z: f64) -> Self {
        Self {
            name: name.into(),
            world_z,
        }
    }

    #[inline(always)]
    pub fn is_reached_by(&self, agent_z: Option<f64>) -> bool {
        agent_z.is_some_and(|z| z > self.world_z)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Checkpoint {
    pub name: String,
    pub raw_z: f64,
    pub reached: bool,
    pub normalized_height: f32, // 0..1 between base and peak
    pub display_height: f32,    // display units above base
}

/// Answer to "where is the next thing to climb to?" for one agent.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NextCheckpoint {
    pub name: String,
    pub display_distance: f32,
    pub normalized_height: f32,
}

pub const PEAK_NAME: &str = "PEAK";

/// One-decimal quantization used to merge waypoints that sit on the same spot.
/// Keys saturate at `i64::MIN`/`i64::MAX` once `|raw_z|` passes about 9.2e17,
/// far beyond any real elevation.
#[inline(always)]
pub fn dedup_key(raw_z: f64) -> i64 {
    (raw_z * 10.0).round() as i64
}
