//! Heightmap persistence
//!
//! A finished (or aborted) survey is handed to a [`HeightmapSink`] exactly
//! once. [`CsvHeightmapWriter`] stores it as a three column table, one row per
//! sample in grid-traversal order.

use super::{GridCoverage, ResultSet};
use crate::error::{PersistenceError, Result};
use async_trait::async_trait;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Header row of the heightmap table
pub const CSV_HEADER: &str = "X,Y,Z";

/// Destination for the samples of a session
#[async_trait]
pub trait HeightmapSink: Send + Sync {
    /// Store the samples collected for `coverage`
    async fn persist(&self, results: &ResultSet, coverage: &GridCoverage) -> Result<()>;
}

/// Render samples as CSV text
pub fn render_csv(results: &ResultSet) -> String {
    let mut csv = String::with_capacity(16 + results.len() * 24);
    csv.push_str(CSV_HEADER);
    csv.push('\n');
    for sample in results {
        // Writing to a String cannot fail
        let _ = writeln!(csv, "{},{},{}", sample.x, sample.y, sample.z);
    }
    csv
}

/// Writes the heightmap to a CSV file
#[derive(Debug, Clone)]
pub struct CsvHeightmapWriter {
    path: PathBuf,
}

impl CsvHeightmapWriter {
    /// Write to an explicit file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Write into `dir` using the default file name for `coverage`
    pub fn in_directory(dir: impl AsRef<Path>, coverage: &GridCoverage) -> Self {
        Self::new(dir.as_ref().join(coverage.default_file_name()))
    }

    /// Destination path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl HeightmapSink for CsvHeightmapWriter {
    async fn persist(&self, results: &ResultSet, coverage: &GridCoverage) -> Result<()> {
        let csv = render_csv(results);
        tokio::fs::write(&self.path, csv)
            .await
            .map_err(|e| PersistenceError::WriteFailed {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })?;

        tracing::info!(
            "Saved {} samples ({}) to {}",
            results.len(),
            coverage,
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ProbeSample;

    #[test]
    fn test_render_csv() {
        let mut results = ResultSet::new();
        results.push(ProbeSample::measured(0.0, 0.0, -1.25));
        results.push(ProbeSample::missed(10.0, 0.0, -999.0));

        assert_eq!(render_csv(&results), "X,Y,Z\n0,0,-1.25\n10,0,-999\n");
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render_csv(&ResultSet::new()), "X,Y,Z\n");
    }
}
