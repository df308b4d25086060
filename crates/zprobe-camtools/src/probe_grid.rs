//! Probe grid path planner
//!
//! Turns a [`GridConfig`] into the ordered command sequence for a surface
//! survey. Rows are visited in a serpentine order (even rows low to high X,
//! odd rows high to low X). The tool moves between points with an arc that
//! starts and ends at the retract height and bulges upward, so it never
//! dips towards the material on the way.
//!
//! Row hops run in the XZ plane (G18), which is selected once in the setup
//! block. Row turns move along Y, so they temporarily switch to the YZ plane
//! (G19) and restore G18 afterwards.
//!
//! The `G92 Z0` that rezeroes Z after a probe is not part of the plan: it
//! only makes sense once the probe actually touched, so the session inserts
//! it at the front of the queue when the probe report arrives.

use zprobe_core::{Command, CommandIntent, GridConfig, GridCoverage};

/// Arc plane selection words
const PLANE_XY: &str = "G17";
const PLANE_XZ: &str = "G18";
const PLANE_YZ: &str = "G19";

/// One grid location
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPoint {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

/// Axis an arc hop travels along
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HopAxis {
    /// Within a row, in the XZ plane
    X,
    /// At a row turn, in the YZ plane
    Y,
}

/// Arc direction word for an upward hop of signed length `delta` along `axis`.
///
/// In G18 the circular direction is defined looking down the Y axis onto the
/// Z-X plane, which mirrors the usual X-right/Z-up picture: an over-the-top
/// move towards +X is counter-clockwise there (G3). In G19 the plane is Y-Z
/// seen from +X, so an over-the-top move towards +Y is clockwise (G2).
pub fn hop_direction(axis: HopAxis, delta: f64) -> &'static str {
    match (axis, delta >= 0.0) {
        (HopAxis::X, true) => "G3",
        (HopAxis::X, false) => "G2",
        (HopAxis::Y, true) => "G2",
        (HopAxis::Y, false) => "G3",
    }
}

/// Generator for probe survey command sequences
pub struct GridPlanner {
    config: GridConfig,
}

impl GridPlanner {
    /// Create a planner for the given grid
    pub fn new(config: GridConfig) -> Self {
        Self { config }
    }

    /// Area descriptor for persistence
    pub fn coverage(&self) -> GridCoverage {
        self.config.coverage()
    }

    /// Grid points in visiting order
    pub fn points(&self) -> Vec<GridPoint> {
        let xs = self.config.x_positions();
        let ys = self.config.y_positions();

        let mut points = Vec::with_capacity(xs.len() * ys.len());
        for (row, &y) in ys.iter().enumerate() {
            if row % 2 == 0 {
                points.extend(xs.iter().map(|&x| GridPoint { x, y }));
            } else {
                points.extend(xs.iter().rev().map(|&x| GridPoint { x, y }));
            }
        }
        points
    }

    /// Number of probe moves in the plan
    pub fn probe_count(&self) -> usize {
        self.config.x_positions().len() * self.config.y_positions().len()
    }

    /// Build the full command sequence
    pub fn plan(&self) -> Vec<Command> {
        let points = self.points();
        let Some(first) = points.first() else {
            return Vec::new();
        };

        let p = &self.config;
        let mut commands = Vec::with_capacity(points.len() * 4 + 8);

        // Setup
        commands.push(Command::new(CommandIntent::Setup, "G21"));
        commands.push(Command::new(CommandIntent::Setup, "G90"));
        commands.push(Command::new(CommandIntent::ZeroOffset, "G92 X0 Y0"));
        commands.push(Command::new(CommandIntent::PlaneSelect, PLANE_XZ));
        commands.push(self.retract());
        commands.push(Command::new(
            CommandIntent::Travel,
            format!("G0 X{:.3} Y{:.3}", first.x, first.y),
        ));

        for (i, point) in points.iter().enumerate() {
            if p.dwell_seconds > 0.0 {
                commands.push(Command::new(
                    CommandIntent::Dwell,
                    format!("G4 P{:.3}", p.dwell_seconds),
                ));
            }
            commands.push(Command::new(
                CommandIntent::Probe,
                format!("G38.2 Z{:.3} F{:.1}", p.probe_depth, p.probe_feed),
            ));
            commands.push(self.retract());

            if let Some(next) = points.get(i + 1) {
                self.push_hop(&mut commands, point, next);
            }
        }

        commands.push(Command::new(CommandIntent::PlaneSelect, PLANE_XY));

        tracing::debug!(
            "Planned {} commands for {} probe points",
            commands.len(),
            points.len()
        );
        commands
    }

    /// Render the plan as a G-code program
    pub fn to_gcode(&self) -> String {
        let mut gcode = String::new();
        let coverage = self.coverage();

        gcode.push_str("; Z Probe Grid\n");
        gcode.push_str(&format!("; Area: {}\n", coverage));
        for command in self.plan() {
            gcode.push_str(&command.text);
            gcode.push('\n');
        }
        gcode
    }

    fn retract(&self) -> Command {
        Command::new(
            CommandIntent::Travel,
            format!("G0 Z{:.3}", self.config.retract_height),
        )
    }

    /// Append the arc moving from `from` to `next`.
    ///
    /// The arc center sits halfway between the two points at retract height,
    /// so the radius is half the distance between them.
    fn push_hop(&self, commands: &mut Vec<Command>, from: &GridPoint, next: &GridPoint) {
        let p = &self.config;

        if next.y == from.y {
            let dx = next.x - from.x;
            commands.push(Command::new(
                CommandIntent::ArcHop,
                format!(
                    "{} X{:.3} Z{:.3} I{:.3} K0 F{:.1}",
                    hop_direction(HopAxis::X, dx),
                    next.x,
                    p.retract_height,
                    dx / 2.0,
                    p.travel_feed
                ),
            ));
        } else {
            let dy = next.y - from.y;
            commands.push(Command::new(CommandIntent::PlaneSelect, PLANE_YZ));
            commands.push(Command::new(
                CommandIntent::ArcHop,
                format!(
                    "{} Y{:.3} Z{:.3} J{:.3} K0 F{:.1}",
                    hop_direction(HopAxis::Y, dy),
                    next.y,
                    p.retract_height,
                    dy / 2.0,
                    p.travel_feed
                ),
            ));
            commands.push(Command::new(CommandIntent::PlaneSelect, PLANE_XZ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hop_direction_rises() {
        assert_eq!(hop_direction(HopAxis::X, 5.0), "G3");
        assert_eq!(hop_direction(HopAxis::X, -5.0), "G2");
        assert_eq!(hop_direction(HopAxis::Y, 5.0), "G2");
        assert_eq!(hop_direction(HopAxis::Y, -5.0), "G3");
    }

    #[test]
    fn test_serpentine_points() {
        let planner = GridPlanner::new(GridConfig {
            x_end: 10.0,
            y_end: 5.0,
            x_step: 5.0,
            y_step: 5.0,
            ..GridConfig::default()
        });
        let xs: Vec<f64> = planner.points().iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![0.0, 5.0, 10.0, 10.0, 5.0, 0.0]);
    }

    #[test]
    fn test_empty_grid_has_no_plan() {
        let planner = GridPlanner::new(GridConfig {
            x_start: 10.0,
            x_end: 0.0,
            ..GridConfig::default()
        });
        assert!(planner.plan().is_empty());
        assert_eq!(planner.probe_count(), 0);
    }
}
