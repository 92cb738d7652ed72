//! Core pipeline orchestration and domain logic for watchshots.
//!
//! This crate ties together candidate sources, categorization, and the
//! fetcher into the `collect` workflow, and builds the dataset summary.

pub mod categorizer;
pub mod pipeline;
pub mod report;

pub use categorizer::Categorizer;
pub use pipeline::{
    CandidateStatus, ProgressReporter, SilentProgress, collect, collect_from_urls_file,
    prepare_output_dir,
};
pub use report::{count_images, generate_dataset_info, render_text};
