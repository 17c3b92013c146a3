//! Output generation.
//!
//! # Submodules
//!
//! - [`json`]: writes article records and the run summary as JSON files
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── training-how-to-build-muscle.json   # <categorySlug>-<slug>.json
//! ├── articles-best-back-exercises.json
//! └── summary.json                        # rewritten every run
//! ```

pub mod json;
