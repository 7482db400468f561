//! Output generation for canonical articles and the run summary.
//!
//! # Submodules
//!
//! - [`json`]: One JSON file per canonical article, plus the loader that
//!   rebuilds the first-seen index from those files
//! - [`summary`]: The per-run statistics file
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── _normalization_summary.json
//! ├── www.athensreview.com/
//! │   ├── 3f1c…e9.json
//! │   └── 8a02…41.json
//! └── www.hawaiitribune-herald.com/
//!     └── 5b7d…0c.json
//! ```

pub mod json;
pub mod summary;
