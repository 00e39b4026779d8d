//! Tiled-image filename grammar.
//!
//! `opacity.1001.tif` splits into name `opacity`, separator `.`, tile `1001`, extension `tif`.
//! The name may be empty: `x1001.tif` has name `""` and separator `x`.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

/// Literal placeholder the host expands per tile.
pub const UDIM_TOKEN: &str = "$UDIM";

static TILE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<name>.*?)(?P<sep>[^0-9])(?P<udim>[0-9]{4})\.(?P<ext>\w+)$")
        .expect("tile filename pattern is valid")
});

/// Components of a filename that follows the tile naming convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileName {
    pub name: String,
    pub separator: char,
    pub udim: String,
    /// Extension exactly as written in the filename.
    pub ext: String,
}

impl TileName {
    /// Parses a bare filename (no directory part).
    pub fn parse(file_name: &str) -> Option<Self> {
        let caps = TILE_PATTERN.captures(file_name)?;
        let separator = caps["sep"].chars().next()?;
        Some(Self {
            name: caps["name"].to_string(),
            separator,
            udim: caps["udim"].to_string(),
            ext: caps["ext"].to_string(),
        })
    }

    /// Parses the final component of `path`.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.file_name()
            .and_then(|n| n.to_str())
            .and_then(Self::parse)
    }

    pub fn extension_lowercase(&self) -> String {
        self.ext.to_ascii_lowercase()
    }

    /// `<name><sep>$UDIM.<ext>`
    pub fn template(&self) -> String {
        format!("{}{}{}.{}", self.name, self.separator, UDIM_TOKEN, self.ext)
    }

    /// Rebuilds the filename for another tile of the same set.
    pub fn with_udim(&self, udim: &str) -> String {
        self.template().replacen(UDIM_TOKEN, udim, 1)
    }
}

/// Import template for the set `first_file` belongs to: `<dir>/<name><sep>$UDIM.<ext>`.
pub fn image_template(first_file: &Path) -> Option<String> {
    let tile = TileName::from_path(first_file)?;
    let dir = first_file
        .parent()
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_default();
    Some(format!("{dir}/{}", tile.template()))
}
