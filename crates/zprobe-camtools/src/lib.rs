//! # zprobe CAM Tools
//!
//! Command generation for surface probing surveys.
//!
//! - **Probe Grid**: serpentine grid traversal with upward arc hops between
//!   probe points

pub mod probe_grid;

pub use probe_grid::{hop_direction, GridPlanner, GridPoint, HopAxis};
