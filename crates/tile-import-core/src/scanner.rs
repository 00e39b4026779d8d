use std::path::Path;

use tracing::{debug, instrument, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::DiscoveryConfig;
use crate::error::{ImportError, Result};
use crate::model::Candidate;
use crate::pattern::TileName;

/// Rejects empty, missing and non-directory roots before anything is walked.
pub fn validate_root(root: &Path) -> Result<()> {
    let shown = root.to_string_lossy().to_string();
    if shown.trim().is_empty() {
        return Err(ImportError::InvalidPath {
            path: shown,
            reason: "input path is empty".into(),
        });
    }
    if !root.exists() {
        return Err(ImportError::InvalidPath {
            path: shown,
            reason: "path does not exist".into(),
        });
    }
    if !root.is_dir() {
        return Err(ImportError::InvalidPath {
            path: shown,
            reason: "path is not a directory".into(),
        });
    }
    Ok(())
}

fn walk(root: &Path, cfg: &DiscoveryConfig) -> impl Iterator<Item = DirEntry> {
    WalkDir::new(root)
        .follow_links(cfg.follow_links)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                warn!(error = %e, "skipping unreadable directory entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
}

/// Pre-flight count of every regular file below `root`.
///
/// Stops as soon as the running count reaches `cfg.max_files`. Returns the count
/// on success; [`ImportError::ZeroFiles`] when the tree holds no files at all.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn count_files(root: &Path, cfg: &DiscoveryConfig) -> Result<usize> {
    let mut count = 0usize;
    for _ in walk(root, cfg) {
        count += 1;
        if count >= cfg.max_files {
            return Err(ImportError::TooManyFiles { count });
        }
    }
    if count == 0 {
        return Err(ImportError::ZeroFiles {
            path: root.to_path_buf(),
        });
    }
    debug!(count, "pre-flight count");
    Ok(count)
}

/// Checks one path against the extension allow-list and the filename grammar.
pub fn classify(path: &Path, cfg: &DiscoveryConfig) -> Option<Candidate> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_ascii_lowercase())?;
    if !cfg.accepts_extension(&ext) {
        return None;
    }
    let tile = TileName::from_path(path)?;
    Some(Candidate {
        base_name: tile.name,
        separator: tile.separator,
        tile_index: tile.udim,
        extension: tile.ext.to_ascii_lowercase(),
        path: path.to_path_buf(),
    })
}

/// Lazily yields every candidate tile below `root` that `keep` accepts.
pub fn candidates<'a, F>(
    root: &'a Path,
    cfg: &'a DiscoveryConfig,
    mut keep: F,
) -> impl Iterator<Item = Candidate> + 'a
where
    F: FnMut(&Path) -> bool + 'a,
{
    walk(root, cfg)
        .filter(move |e| keep(e.path()))
        .filter_map(move |e| classify(e.path(), cfg))
}

/// Collects all candidate tiles below `root`.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn scan(root: &Path, cfg: &DiscoveryConfig) -> Vec<Candidate> {
    let found: Vec<Candidate> = candidates(root, cfg, |_| true).collect();
    debug!(count = found.len(), "candidate tiles");
    found
}
