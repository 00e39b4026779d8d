use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error::{ImportError, Result};
use crate::model::{Colourspace, Resolution, TileRecord};

/// One tile as stored in the catalog artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogTile {
    pub udim: String,
    pub path: PathBuf,
    pub res: Resolution,
    pub bitdepth: Option<u32>,
    pub channels: Option<u32>,
}

impl From<TileRecord> for CatalogTile {
    fn from(r: TileRecord) -> Self {
        Self {
            udim: r.tile_index,
            path: r.path,
            res: r.resolution,
            bitdepth: r.bit_depth,
            channels: r.channel_count,
        }
    }
}

type Groups = BTreeMap<String, Vec<CatalogTile>>;

/// Discovered tiles keyed by base name, then extension, each group sorted by tile index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    sets: BTreeMap<String, Groups>,
}

impl Catalog {
    /// Groups `records` by `(base name, extension)`.
    ///
    /// A repeated `(base name, extension, tile index)` replaces the earlier record.
    #[instrument(skip_all)]
    pub fn build(records: impl IntoIterator<Item = TileRecord>) -> Self {
        let mut staged: BTreeMap<String, BTreeMap<String, BTreeMap<String, CatalogTile>>> =
            BTreeMap::new();
        for record in records {
            let name = record.base_name.clone();
            let ext = record.extension.clone();
            let tile = CatalogTile::from(record);
            if let Some(prev) = staged
                .entry(name)
                .or_default()
                .entry(ext)
                .or_default()
                .insert(tile.udim.clone(), tile)
            {
                debug!(path = %prev.path.display(), "duplicate tile replaced");
            }
        }
        let sets = staged
            .into_iter()
            .map(|(name, exts)| {
                let groups = exts
                    .into_iter()
                    .map(|(ext, tiles)| (ext, tiles.into_values().collect()))
                    .collect();
                (name, groups)
            })
            .collect();
        Self { sets }
    }

    /// Re-sorts and de-duplicates tiles loaded from outside.
    pub fn normalize(&mut self) {
        for groups in self.sets.values_mut() {
            for tiles in groups.values_mut() {
                // Stable sort keeps the later duplicate last, so dedup keeps it.
                tiles.sort_by(|a, b| a.udim.cmp(&b.udim));
                let mut deduped: Vec<CatalogTile> = Vec::with_capacity(tiles.len());
                for tile in tiles.drain(..) {
                    match deduped.last_mut() {
                        Some(last) if last.udim == tile.udim => *last = tile,
                        _ => deduped.push(tile),
                    }
                }
                *tiles = deduped;
            }
            groups.retain(|_, tiles| !tiles.is_empty());
        }
        self.sets.retain(|_, groups| !groups.is_empty());
    }

    pub fn group(&self, name: &str, extension: &str) -> Option<&[CatalogTile]> {
        self.sets
            .get(name)
            .and_then(|g| g.get(&extension.to_ascii_lowercase()))
            .map(Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sets.keys().map(String::as_str)
    }

    /// `(name, extension, tiles)` for every group, names then extensions ascending.
    pub fn groups(&self) -> impl Iterator<Item = (&str, &str, &[CatalogTile])> {
        self.sets.iter().flat_map(|(name, groups)| {
            groups
                .iter()
                .map(move |(ext, tiles)| (name.as_str(), ext.as_str(), tiles.as_slice()))
        })
    }

    pub fn group_count(&self) -> usize {
        self.sets.values().map(BTreeMap::len).sum()
    }

    pub fn tile_count(&self) -> usize {
        self.groups().map(|(_, _, t)| t.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// One display row per group, attributes taken from the first tile.
    pub fn rows(&self) -> Vec<CatalogRow> {
        self.groups()
            .filter_map(|(name, ext, tiles)| {
                let first = tiles.first()?;
                Some(CatalogRow {
                    name: name.to_string(),
                    file_type: ext.to_ascii_uppercase(),
                    udim_count: tiles.len(),
                    size: first.res,
                    depth: first
                        .bitdepth
                        .map(|b| format!("{b}-bit"))
                        .unwrap_or_else(|| "unknown".into()),
                    colourspace: Colourspace::for_channels(first.channels),
                })
            })
            .collect()
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let mut catalog: Catalog = serde_json::from_str(s)?;
        catalog.normalize();
        Ok(catalog)
    }
}

/// Table row shown to the user for one texture set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRow {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "File Type")]
    pub file_type: String,
    #[serde(rename = "Udim Count")]
    pub udim_count: usize,
    #[serde(rename = "Size")]
    pub size: Resolution,
    #[serde(rename = "Depth")]
    pub depth: String,
    #[serde(rename = "Colourspace")]
    pub colourspace: Colourspace,
}

/// `img_search_<YYYYMMDD_HHMMSS>.json`
pub fn artifact_file_name(at: NaiveDateTime) -> String {
    format!("img_search_{}.json", at.format("%Y%m%d_%H%M%S"))
}

/// Writes `catalog` into `out_dir` under a timestamped name and returns the path.
pub fn write_catalog_at(out_dir: &Path, catalog: &Catalog, at: NaiveDateTime) -> Result<PathBuf> {
    if catalog.is_empty() {
        return Err(ImportError::Write("catalog is empty".into()));
    }
    let out_path = out_dir.join(artifact_file_name(at));
    let json = catalog.to_json_pretty()?;
    fs::write(&out_path, json)
        .map_err(|e| ImportError::Write(format!("write {}: {e}", out_path.display())))?;
    info!(path = %out_path.display(), groups = catalog.group_count(), "catalog written");
    Ok(out_path)
}

pub fn write_catalog(out_dir: &Path, catalog: &Catalog) -> Result<PathBuf> {
    write_catalog_at(out_dir, catalog, Local::now().naive_local())
}

pub fn read_catalog(path: &Path) -> Result<Catalog> {
    let text = fs::read_to_string(path)
        .map_err(|e| ImportError::Write(format!("read {}: {e}", path.display())))?;
    Catalog::from_json_str(&text)
}

/// Reads the artifact once and deletes it.
pub fn consume_catalog(path: &Path) -> Result<Catalog> {
    let catalog = read_catalog(path)?;
    match fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "catalog artifact deleted"),
        Err(e) => warn!(path = %path.display(), error = %e, "failed to delete catalog artifact"),
    }
    Ok(catalog)
}
