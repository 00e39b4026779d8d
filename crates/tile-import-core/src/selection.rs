use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::catalog::Catalog;
use crate::error::{ImportError, Result};
use crate::model::{Colourspace, Depth, SelectionEntry};

/// A user's choice of one catalog group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRequest {
    pub name: String,
    pub extension: String,
    #[serde(default)]
    pub broadcaster: bool,
    /// Overrides the depth read from the first tile.
    #[serde(default)]
    pub depth: Option<Depth>,
    /// Overrides the colourspace derived from the first tile.
    #[serde(default)]
    pub colourspace: Option<Colourspace>,
}

impl SelectionRequest {
    pub fn new(name: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extension: extension.into(),
            broadcaster: false,
            depth: None,
            colourspace: None,
        }
    }
    pub fn broadcaster(mut self, v: bool) -> Self {
        self.broadcaster = v;
        self
    }
    pub fn depth(mut self, v: Depth) -> Self {
        self.depth = Some(v);
        self
    }
    pub fn colourspace(mut self, v: Colourspace) -> Self {
        self.colourspace = Some(v);
        self
    }
}

/// Builds one [`SelectionEntry`] per request, in request order, with partition indices set.
pub fn resolve_selection(
    catalog: &Catalog,
    requests: &[SelectionRequest],
) -> Result<Vec<SelectionEntry>> {
    let mut entries = Vec::with_capacity(requests.len());
    for req in requests {
        let tiles = catalog
            .group(&req.name, &req.extension)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ImportError::UnknownEntry {
                name: req.name.clone(),
                extension: req.extension.clone(),
            })?;
        let first = &tiles[0];
        let depth = match (req.depth, first.bitdepth) {
            (Some(d), _) => d,
            (None, Some(bits)) => Depth::from_bits(bits).unwrap_or_else(|| {
                warn!(name = %req.name, bits, "unsupported bit depth, using 8-bit");
                Depth::Bits8
            }),
            (None, None) => {
                warn!(name = %req.name, "unknown bit depth, using 8-bit");
                Depth::Bits8
            }
        };
        entries.push(SelectionEntry {
            name: req.name.clone(),
            file_type: req.extension.to_ascii_uppercase(),
            size: first.res,
            depth,
            colourspace: req
                .colourspace
                .unwrap_or_else(|| Colourspace::for_channels(first.channels)),
            broadcaster: req.broadcaster,
            files: tiles.iter().map(|t| t.path.clone()).collect(),
            paint_index: 0,
            route_index: 0,
        });
    }
    assign_partition_indices(&mut entries);
    Ok(entries)
}

/// Numbers broadcaster entries by `route_index` and the rest by `paint_index`,
/// each from 0 in selection order. The other index is reset to 0.
pub fn assign_partition_indices(entries: &mut [SelectionEntry]) {
    let mut next_route = 0;
    let mut next_paint = 0;
    for entry in entries.iter_mut() {
        if entry.broadcaster {
            entry.route_index = next_route;
            entry.paint_index = 0;
            next_route += 1;
        } else {
            entry.paint_index = next_paint;
            entry.route_index = 0;
            next_paint += 1;
        }
    }
}
