//! Output formatting
//!
//! Reports produced after a run:
//!
//! - **text**: collector summary and per-operation statistics tables
//! - **report**: measurement table merging harness output with tracker timings
//! - **csv**: per-operation sample series for external plotting
//! - **json**: structured statistics export

pub mod csv;
pub mod json;
pub mod report;
pub mod text;

use crate::stats::Sample;
use crate::Result;
use std::path::{Path, PathBuf};

/// Writes one operation's ordered sample series somewhere under a directory
///
/// Implementations only read the samples. The tracker calls `render` once
/// per operation label and keeps going when a call fails.
pub trait SeriesRenderer {
    /// Render `samples` for `label` into `output_dir`, returning the file written
    fn render(&self, label: &str, samples: &[Sample], output_dir: &Path) -> Result<PathBuf>;
}
