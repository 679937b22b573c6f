//! CSV world loader.
//!
//! # CSV format
//!
//! One row per polygon vertex or trajectory waypoint.
//!
//! ```csv
//! obstacle_id,kind,x,y,t,part
//! 0,vertex,0,0,,
//! 0,vertex,4,0,,
//! 0,vertex,4,1,,
//! 1,vertex,-0.5,-0.5,,
//! 1,vertex,0.5,-0.5,,
//! 1,vertex,0,0.5,,
//! 1,waypoint,10,0,0,
//! 1,waypoint,10,10,5,
//! ```
//!
//! **`kind`** field:
//!
//! | Value      | Meaning                                                  |
//! |------------|----------------------------------------------------------|
//! | `vertex`   | Polygon vertex; `t` is ignored and may be empty          |
//! | `waypoint` | Trajectory waypoint at time `t` (required)               |
//!
//! An obstacle with at least one waypoint is dynamic and its vertices are
//! relative to the reference point; otherwise it is static and its vertices
//! are absolute.  Vertices may come in any order (the convex hull is kept);
//! waypoints must appear in strictly increasing time order.
//!
//! The optional `part` column (default 0) splits the vertices of a static
//! obstacle into several convex parts, which is how concave obstacles are
//! written.  Dynamic obstacles have a single part.
//!
//! Obstacle IDs are taken from the file.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use fleet_core::ObstacleId;
use fleet_geom::{MultiPolygon, Point, Polygon};

use crate::{Trajectory, World, WorldBuilder, WorldError};

// ── CSV record ────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ObstacleRecord {
    obstacle_id: u32,
    kind:        String,
    x:           f64,
    y:           f64,
    t:           Option<f64>,
    #[serde(default)]
    part:        Option<u32>,
}

#[derive(Default)]
struct RawObstacle {
    parts:     BTreeMap<u32, Vec<Point>>,
    waypoints: Vec<Point>,
    times:     Vec<f64>,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Load a [`World`] from a CSV file.
pub fn load_world_csv(path: &Path) -> Result<World, WorldError> {
    let file = std::fs::File::open(path).map_err(WorldError::Io)?;
    load_world_reader(file)
}

/// Like [`load_world_csv`] but accepts any `Read` source.
///
/// Useful for testing (pass a `std::io::Cursor`) or loading from network
/// streams.
pub fn load_world_reader<R: Read>(reader: R) -> Result<World, WorldError> {
    // ── Parse CSV rows ────────────────────────────────────────────────────
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut by_obstacle: BTreeMap<u32, RawObstacle> = BTreeMap::new();

    for result in csv_reader.deserialize::<ObstacleRecord>() {
        let row = result.map_err(|e| WorldError::Parse(e.to_string()))?;
        let raw = by_obstacle.entry(row.obstacle_id).or_default();
        match row.kind.trim() {
            "vertex" => raw
                .parts
                .entry(row.part.unwrap_or(0))
                .or_default()
                .push(Point::new(row.x, row.y)),
            "waypoint" => {
                let t = row.t.ok_or_else(|| {
                    WorldError::Parse(format!(
                        "obstacle {}: waypoint ({}, {}) has no timestamp",
                        row.obstacle_id, row.x, row.y
                    ))
                })?;
                raw.waypoints.push(Point::new(row.x, row.y));
                raw.times.push(t);
            }
            other => {
                return Err(WorldError::Parse(format!(
                    "invalid kind {other:?}: expected \"vertex\" or \"waypoint\""
                )));
            }
        }
    }

    // ── Build obstacles in ID order ───────────────────────────────────────
    let mut builder = WorldBuilder::new();
    for (raw_id, raw) in by_obstacle {
        let id = ObstacleId(raw_id);
        let mut shapes = raw
            .parts
            .into_values()
            .map(|vertices| {
                Polygon::new(vertices).map_err(|e| WorldError::Obstacle(id, e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if raw.waypoints.is_empty() {
            if shapes.is_empty() {
                return Err(WorldError::Obstacle(id, "no vertices".into()));
            }
            builder.add_static_with_id(id, MultiPolygon::new(shapes));
        } else {
            let shape = match (shapes.pop(), shapes.is_empty()) {
                (Some(shape), true) => shape,
                (None, _) => return Err(WorldError::Obstacle(id, "no vertices".into())),
                (Some(_), false) => {
                    return Err(WorldError::Obstacle(
                        id,
                        "a dynamic obstacle has a single part".into(),
                    ));
                }
            };
            let trajectory = Trajectory::new(raw.waypoints, raw.times)
                .map_err(|e| WorldError::Obstacle(id, e.to_string()))?;
            builder.add_dynamic_with_id(id, shape, trajectory);
        }
    }

    Ok(builder.build())
}
