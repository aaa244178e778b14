//! Voice style asset discovery.

use std::path::Path;

/// List the voice style files in `dir`.
///
/// Only regular, non-hidden files whose extension equals `extension` are
/// returned, as bare file names in directory enumeration order. A missing
/// directory yields an empty list so callers can show "no styles available"
/// instead of failing.
pub fn list_style_assets(dir: &Path, extension: &str) -> Vec<String> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            log::warn!("Cannot read voice style directory {}: {e}", dir.display());
            return Vec::new();
        }
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry in {}: {e}", dir.display());
                continue;
            }
        };

        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(extension) {
            continue;
        }

        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            log::warn!("Skipping non UTF-8 file name {}", path.display());
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        names.push(name);
    }

    log::debug!("Found {} voice styles in {}", names.len(), dir.display());
    names
}

/// The style preselected for a fresh session: the first listed asset.
pub fn default_style(dir: &Path, extension: &str) -> Option<String> {
    list_style_assets(dir, extension).into_iter().next()
}
