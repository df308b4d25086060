//! Data models for a probing survey
//!
//! This module provides:
//! - Grid configuration (survey area, steps, heights and feeds)
//! - Grid coverage descriptors handed to persistence
//! - Probe samples and the append-only result set
//! - Tagged controller commands
//! - Heightmap persistence

pub mod command;
pub mod heightmap;

pub use command::{Command, CommandIntent};
pub use heightmap::{CsvHeightmapWriter, HeightmapSink};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tolerance applied when deciding whether the last stepped coordinate
/// still lies inside the configured range.
const AXIS_EPSILON: f64 = 1e-9;

/// Most coordinates generated along one axis
pub const MAX_AXIS_POINTS: usize = 10_000;

/// Most points a single survey may visit
pub const MAX_GRID_POINTS: usize = 100_000;

/// Survey grid configuration
///
/// Immutable for the lifetime of a session. Every planned command is derived
/// from these values. Distances are in millimeters, feeds in mm/min.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// First X coordinate of the grid
    pub x_start: f64,
    /// First Y coordinate of the grid
    pub y_start: f64,
    /// Last X coordinate (inclusive)
    pub x_end: f64,
    /// Last Y coordinate (inclusive)
    pub y_end: f64,
    /// Distance between columns
    pub x_step: f64,
    /// Distance between rows
    pub y_step: f64,
    /// Z target of each probe move, relative to the last zeroed surface
    pub probe_depth: f64,
    /// Z height the tool retracts to between probes
    pub retract_height: f64,
    /// Feed rate for probe moves
    pub probe_feed: f64,
    /// Feed rate for arc hops between points
    pub travel_feed: f64,
    /// Z value recorded for a probe that never triggered
    pub missed_probe_sentinel: f64,
    /// Dwell before each probe in seconds, 0 disables it
    pub dwell_seconds: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            x_start: 0.0,
            y_start: 0.0,
            x_end: 100.0,
            y_end: 60.0,
            x_step: 10.0,
            y_step: 10.0,
            probe_depth: -20.0,
            retract_height: 15.0,
            probe_feed: 1000.0,
            travel_feed: 1000.0,
            missed_probe_sentinel: -999.0,
            dwell_seconds: 0.0,
        }
    }
}

impl GridConfig {
    /// X coordinates of the grid columns, low to high
    pub fn x_positions(&self) -> Vec<f64> {
        axis_positions(self.x_start, self.x_end, self.x_step)
    }

    /// Y coordinates of the grid rows, low to high
    pub fn y_positions(&self) -> Vec<f64> {
        axis_positions(self.y_start, self.y_end, self.y_step)
    }

    /// Number of grid points the configured ranges describe.
    ///
    /// Computed in floating point so absurd ranges report their true size
    /// (possibly infinite) instead of overflowing.
    pub fn requested_points(&self) -> f64 {
        axis_count(self.x_start, self.x_end, self.x_step)
            * axis_count(self.y_start, self.y_end, self.y_step)
    }

    /// Whether the grid fits within [`MAX_GRID_POINTS`]
    pub fn within_point_limit(&self) -> bool {
        self.requested_points() <= MAX_GRID_POINTS as f64
    }

    /// Describe the area this configuration covers
    pub fn coverage(&self) -> GridCoverage {
        GridCoverage {
            x_start: self.x_start,
            x_end: self.x_end,
            y_start: self.y_start,
            y_end: self.y_end,
            columns: self.x_positions().len(),
            rows: self.y_positions().len(),
        }
    }
}

/// Number of coordinates on an axis from `start` to `end` inclusive.
///
/// A non-positive or non-finite step collapses the axis to its start
/// coordinate; a start beyond the end yields no coordinates at all.
fn axis_count(start: f64, end: f64, step: f64) -> f64 {
    if !start.is_finite() || !end.is_finite() || start > end + AXIS_EPSILON {
        return 0.0;
    }

    if !step.is_finite() || step <= 0.0 {
        return 1.0;
    }

    ((end - start) / step + AXIS_EPSILON).floor() + 1.0
}

/// Sample an axis, truncated to [`MAX_AXIS_POINTS`] coordinates
fn axis_positions(start: f64, end: f64, step: f64) -> Vec<f64> {
    let count = axis_count(start, end, step);
    let count = if count > MAX_AXIS_POINTS as f64 {
        tracing::warn!(
            "Axis {}..{} step {} needs {} points, truncating to {}",
            start,
            end,
            step,
            count,
            MAX_AXIS_POINTS
        );
        MAX_AXIS_POINTS
    } else {
        count as usize
    };
    (0..count).map(|i| start + i as f64 * step).collect()
}

/// Grid coverage descriptor
///
/// Summarises which area was surveyed; passed to persistence alongside the
/// samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridCoverage {
    /// First X coordinate
    pub x_start: f64,
    /// Last X coordinate
    pub x_end: f64,
    /// First Y coordinate
    pub y_start: f64,
    /// Last Y coordinate
    pub y_end: f64,
    /// Number of grid columns
    pub columns: usize,
    /// Number of grid rows
    pub rows: usize,
}

impl GridCoverage {
    /// Number of grid points
    pub fn point_count(&self) -> usize {
        self.columns * self.rows
    }

    /// Default heightmap file name for this coverage
    pub fn default_file_name(&self) -> String {
        format!("heightmap_{}x{}.csv", self.x_end, self.y_end)
    }
}

impl fmt::Display for GridCoverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "X {}..{} Y {}..{} ({}x{} points)",
            self.x_start, self.x_end, self.y_start, self.y_end, self.columns, self.rows
        )
    }
}

/// One probe measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbeSample {
    /// X coordinate reported by the controller
    pub x: f64,
    /// Y coordinate reported by the controller
    pub y: f64,
    /// Measured Z, or the sentinel when the probe missed
    pub z: f64,
    /// Whether the probe triggered
    pub ok: bool,
}

impl ProbeSample {
    /// A sample where the probe touched the surface
    pub fn measured(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z, ok: true }
    }

    /// A sample where the probe never triggered
    pub fn missed(x: f64, y: f64, sentinel: f64) -> Self {
        Self {
            x,
            y,
            z: sentinel,
            ok: false,
        }
    }
}

/// Ordered, append-only set of probe samples
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    samples: Vec<ProbeSample>,
}

impl ResultSet {
    /// Create an empty result set
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample
    pub fn push(&mut self, sample: ProbeSample) {
        self.samples.push(sample);
    }

    /// Samples in the order they were measured
    pub fn samples(&self) -> &[ProbeSample] {
        &self.samples
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no samples have been recorded
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of probes that never triggered
    pub fn missed_count(&self) -> usize {
        self.samples.iter().filter(|s| !s.ok).count()
    }

    /// Iterate over samples
    pub fn iter(&self) -> std::slice::Iter<'_, ProbeSample> {
        self.samples.iter()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a ProbeSample;
    type IntoIter = std::slice::Iter<'a, ProbeSample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_positions_inclusive() {
        assert_eq!(axis_positions(0.0, 10.0, 5.0), vec![0.0, 5.0, 10.0]);
        assert_eq!(axis_positions(0.0, 9.0, 5.0), vec![0.0, 5.0]);
    }

    #[test]
    fn test_axis_positions_float_accumulation() {
        let xs = axis_positions(0.0, 0.3, 0.1);
        assert_eq!(xs.len(), 4);
        assert!((xs[3] - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_axis_positions_degenerate() {
        assert_eq!(axis_positions(0.0, 10.0, 0.0), vec![0.0]);
        assert_eq!(axis_positions(0.0, 10.0, -1.0), vec![0.0]);
        assert_eq!(axis_positions(0.0, 10.0, f64::NAN), vec![0.0]);
        assert!(axis_positions(10.0, 0.0, 1.0).is_empty());
    }

    #[test]
    fn test_huge_axis_is_bounded() {
        assert_eq!(axis_count(0.0, 1e308, 1e-10), f64::INFINITY);
        assert_eq!(axis_positions(0.0, 1e308, 1e-10).len(), MAX_AXIS_POINTS);
        assert_eq!(axis_positions(-1e308, 1e308, 1.0).len(), MAX_AXIS_POINTS);
        assert_eq!(axis_positions(0.0, 9_999.0, 1.0).len(), MAX_AXIS_POINTS);
        assert_eq!(axis_positions(0.0, 10_000.0, 1.0).len(), MAX_AXIS_POINTS);
    }

    #[test]
    fn test_point_limit() {
        assert!(GridConfig::default().within_point_limit());
        assert_eq!(GridConfig::default().requested_points(), 77.0);

        let grid = GridConfig {
            x_end: 1e308,
            x_step: 1e-10,
            ..GridConfig::default()
        };
        assert!(!grid.within_point_limit());
        let coverage = grid.coverage();
        assert_eq!(coverage.columns, MAX_AXIS_POINTS);

        let grid = GridConfig {
            x_end: 1000.0,
            y_end: 1000.0,
            x_step: 1.0,
            y_step: 1.0,
            ..GridConfig::default()
        };
        assert_eq!(grid.requested_points(), 1001.0 * 1001.0);
        assert!(!grid.within_point_limit());
    }

    #[test]
    fn test_default_coverage() {
        let coverage = GridConfig::default().coverage();
        assert_eq!(coverage.columns, 11);
        assert_eq!(coverage.rows, 7);
        assert_eq!(coverage.point_count(), 77);
        assert_eq!(coverage.default_file_name(), "heightmap_100x60.csv");
    }

    #[test]
    fn test_result_set_order_and_missed() {
        let mut results = ResultSet::new();
        results.push(ProbeSample::measured(0.0, 0.0, -1.5));
        results.push(ProbeSample::missed(10.0, 0.0, -999.0));

        assert_eq!(results.len(), 2);
        assert_eq!(results.missed_count(), 1);
        assert_eq!(results.samples()[1].z, -999.0);
        assert!(!results.samples()[1].ok);
    }

    #[test]
    fn test_grid_config_partial_deserialize() {
        let config: GridConfig = serde_json::from_str(r#"{"x_end": 20.0}"#).unwrap();
        assert_eq!(config.x_end, 20.0);
        assert_eq!(config.y_end, 60.0);
    }
}
