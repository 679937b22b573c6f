//! Obstacles: fixed polygons and polygons moving along a trajectory.

use fleet_core::ObstacleId;
use fleet_geom::{Envelope, MultiPolygon, Polygon};

use crate::Trajectory;

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StaticObstacle {
    pub id: ObstacleId,
    /// Absolute placement in the world; concave obstacles have several
    /// convex parts.
    pub shape: MultiPolygon,
}

/// A polygon whose reference point follows `trajectory`.
///
/// The obstacle exists only while the trajectory is defined: before its
/// first timestamp and after its last it occupies nothing.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DynamicObstacle {
    pub id: ObstacleId,
    /// Shape relative to the reference point.
    pub shape: Polygon,
    pub trajectory: Trajectory,
}

impl DynamicObstacle {
    pub fn new(id: ObstacleId, shape: Polygon, trajectory: Trajectory) -> Self {
        Self { id, shape, trajectory }
    }

    /// `[start, end]` of existence.
    pub fn span(&self) -> (f64, f64) {
        (self.trajectory.start_time(), self.trajectory.end_time())
    }

    /// Envelope of everything the obstacle ever covers.
    pub fn swept_envelope(&self) -> Envelope {
        let path = Envelope::from_points(self.trajectory.points().iter().copied());
        let shape = self.shape.envelope();
        Envelope { min: path.min + shape.min, max: path.max + shape.max }
    }
}
