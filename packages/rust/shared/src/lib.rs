//! Shared types, error model, and configuration for watchshots.
//!
//! This crate is the foundation depended on by all other watchshots crates.
//! It provides:
//! - [`WatchshotsError`]: the unified error type
//! - Domain types ([`Candidate`], [`Category`], [`CollectSummary`], [`DatasetInfo`])
//! - Configuration ([`AppConfig`], [`CollectConfig`], config loading)
//! - The shared HTTP client builder ([`build_client`])

pub mod config;
pub mod error;
pub mod http;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BlogConfig, CategoryRule, CollectConfig, DEFAULT_USER_AGENT, DefaultsConfig,
    HttpConfig, ImageConfig, LinkEntry, PacingConfig, RedditConfig, UrlTable, config_dir,
    config_file_path, default_category_rules, init_config, load_config, load_config_from,
    renderer_token,
};
pub use error::{Result, WatchshotsError};
pub use http::{MAX_REDIRECTS, build_client};
pub use types::{Candidate, Category, CollectSummary, DatasetInfo, RunId};
