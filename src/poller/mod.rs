//! Folder polling
//!
//! Every interval the poller lists each bound folder under the root, runs
//! each regular file through its folder's handlers and moves fully
//! delivered files to `done/<folder>/`. Cycles never overlap.

mod runner;
mod scan;

pub use runner::{BuildError, CycleReport, Poller};
pub use scan::{ScanError, scan_folder};
