//! # zprobe Core
//!
//! Core types and utilities for zprobe.
//! Provides the survey data model, tagged controller commands,
//! heightmap persistence and the shared error types.

pub mod data;
pub mod error;

pub use data::{
    Command, CommandIntent, CsvHeightmapWriter, GridConfig, GridCoverage, HeightmapSink,
    ProbeSample, ResultSet, MAX_AXIS_POINTS, MAX_GRID_POINTS,
};

pub use error::{ConnectionError, ControllerError, Error, PersistenceError, Result};
