//! Dataset summary: count stored images per directory and write
//! `dataset_info.json` / `dataset_info.txt` at the dataset root.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::Local;
use tracing::{debug, info, instrument};
use walkdir::WalkDir;

use watchshots_shared::{DatasetInfo, Result, WatchshotsError};

/// Machine-readable summary filename.
pub const INFO_JSON: &str = "dataset_info.json";
/// Human-readable summary filename.
pub const INFO_TXT: &str = "dataset_info.txt";

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.iter().any(|ext| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Count images under `output_dir`, keyed by containing directory relative to it.
///
/// Keys are `/`-joined; images directly in the root are keyed `.`.
pub fn count_images(output_dir: &Path) -> Result<BTreeMap<String, usize>> {
    let mut counts = BTreeMap::new();

    for entry in WalkDir::new(output_dir).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(output_dir).to_path_buf();
            let source = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
            WatchshotsError::io(path, source)
        })?;

        if !entry.file_type().is_file() || !is_image(entry.path()) {
            continue;
        }

        let parent = entry.path().parent().unwrap_or(output_dir);
        let relative = parent.strip_prefix(output_dir).unwrap_or(parent);
        let key = if relative.as_os_str().is_empty() {
            ".".to_string()
        } else {
            relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/")
        };

        *counts.entry(key).or_insert(0) += 1;
    }

    Ok(counts)
}

/// Render the plain-text summary.
pub fn render_text(info: &DatasetInfo) -> String {
    let mut out = String::new();
    out.push_str("Smartwatch Screenshot Dataset\n");
    out.push_str(&format!(
        "Generated: {}\n",
        info.created_at.format("%Y-%m-%d %H:%M:%S")
    ));
    out.push_str(&"=".repeat(50));
    out.push_str("\n\n");
    out.push_str(&format!("Total images: {}\n\n", info.total_images));
    out.push_str("Per category:\n");
    for (category, count) in &info.categories {
        out.push_str(&format!("  {category}: {count}\n"));
    }
    out
}

/// Scan `output_dir` and write both summary files. Never touches the images.
#[instrument(skip_all, fields(output_dir = %output_dir.display()))]
pub fn generate_dataset_info(output_dir: &Path) -> Result<DatasetInfo> {
    if !output_dir.is_dir() {
        return Err(WatchshotsError::validation(format!(
            "dataset directory does not exist: {}",
            output_dir.display()
        )));
    }

    let categories = count_images(output_dir)?;
    let info = DatasetInfo {
        total_images: categories.values().sum(),
        categories,
        created_at: Local::now(),
    };
    debug!(directories = info.categories.len(), "images counted");

    let json_path = output_dir.join(INFO_JSON);
    let json = serde_json::to_string_pretty(&info)
        .map_err(|e| WatchshotsError::validation(format!("failed to serialize dataset info: {e}")))?;
    std::fs::write(&json_path, json).map_err(|e| WatchshotsError::io(&json_path, e))?;

    let txt_path = output_dir.join(INFO_TXT);
    std::fs::write(&txt_path, render_text(&info)).map_err(|e| WatchshotsError::io(&txt_path, e))?;

    info!(total_images = info.total_images, "dataset info written");
    Ok(info)
}
