use sanitize_filename::sanitize;
use std::path::{Path, PathBuf};
use url::Url;

const FALLBACK_NAME: &str = "download.bin";

/// File name for a saved binary body: the last non-empty path segment, sanitized.
pub fn suggest_file_name(url: &Url) -> String {
    url.path_segments()
        .and_then(|s| s.filter(|seg| !seg.is_empty()).last())
        .map(sanitize)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| FALLBACK_NAME.to_string())
}

pub fn suggest_path(out_dir: &Path, url: &Url) -> PathBuf {
    out_dir.join(suggest_file_name(url))
}
