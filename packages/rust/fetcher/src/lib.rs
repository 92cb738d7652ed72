//! Image download, normalization, and persistence.
//!
//! This crate provides:
//! - [`naming`]: deterministic dataset paths and URL hashes
//! - [`normalize`]: alpha flattening, downscaling, and JPEG re-encoding
//! - [`engine`]: the [`Fetcher`] that ties them together for one candidate

pub mod engine;
pub mod naming;
pub mod normalize;

pub use engine::{FetchOutcome, Fetcher};
pub use naming::{ANY_COMPONENT, HASH_LEN, artifact_path, url_hash};
pub use normalize::{ImagePolicy, NormalizedImage, flatten_alpha, normalize, target_dimensions};
