use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Pixel dimensions of a tile. Serialized as `"WxH"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("resolution '{s}' is not of the form WxH"))?;
        let width = w
            .trim()
            .parse()
            .map_err(|e| format!("bad width in '{s}': {e}"))?;
        let height = h
            .trim()
            .parse()
            .map_err(|e| format!("bad height in '{s}': {e}"))?;
        Ok(Self { width, height })
    }
}

impl From<Resolution> for String {
    fn from(r: Resolution) -> Self {
        r.to_string()
    }
}

impl TryFrom<String> for Resolution {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// A file that passed the extension allow-list and the filename grammar,
/// before any metadata has been read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub base_name: String,
    pub separator: char,
    /// Four ASCII digits.
    pub tile_index: String,
    /// Lower-cased extension.
    pub extension: String,
    pub path: PathBuf,
}

/// One physical tile on disk with its image metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRecord {
    pub base_name: String,
    pub tile_index: String,
    pub extension: String,
    pub path: PathBuf,
    pub resolution: Resolution,
    /// `None` when the provider does not report a depth.
    pub bit_depth: Option<u32>,
    /// `None` when the provider does not report a channel count.
    pub channel_count: Option<u32>,
}

impl TileRecord {
    pub fn from_candidate(
        candidate: Candidate,
        resolution: Resolution,
        bit_depth: Option<u32>,
        channel_count: Option<u32>,
    ) -> Self {
        Self {
            base_name: candidate.base_name,
            tile_index: candidate.tile_index,
            extension: candidate.extension,
            path: candidate.path,
            resolution,
            bit_depth,
            channel_count,
        }
    }
}

/// Bit depth choices offered for paint nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Depth {
    #[default]
    #[serde(rename = "8-bit")]
    Bits8,
    #[serde(rename = "16-bit")]
    Bits16,
    #[serde(rename = "32-bit")]
    Bits32,
}

impl Depth {
    pub const ALL: [Depth; 3] = [Depth::Bits8, Depth::Bits16, Depth::Bits32];

    pub fn bits(self) -> u32 {
        match self {
            Depth::Bits8 => 8,
            Depth::Bits16 => 16,
            Depth::Bits32 => 32,
        }
    }

    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            8 => Some(Depth::Bits8),
            16 => Some(Depth::Bits16),
            32 => Some(Depth::Bits32),
            _ => None,
        }
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-bit", self.bits())
    }
}

impl FromStr for Depth {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().trim_end_matches("-bit");
        digits
            .parse()
            .ok()
            .and_then(Depth::from_bits)
            .ok_or(())
    }
}

/// Colourspace handling for a paint node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Colourspace {
    #[default]
    Color,
    Scalar,
}

impl Colourspace {
    /// Single-channel images are scalar data, everything else is colour.
    pub fn for_channels(channels: Option<u32>) -> Self {
        if channels == Some(1) {
            Colourspace::Scalar
        } else {
            Colourspace::Color
        }
    }
}

impl fmt::Display for Colourspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Colourspace::Color => "color",
            Colourspace::Scalar => "scalar",
        })
    }
}

impl FromStr for Colourspace {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "color" | "colour" => Ok(Colourspace::Color),
            "scalar" => Ok(Colourspace::Scalar),
            _ => Err(()),
        }
    }
}

/// A texture set approved for placement on the node graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionEntry {
    pub name: String,
    /// Upper-cased extension, as displayed.
    pub file_type: String,
    pub size: Resolution,
    pub depth: Depth,
    pub colourspace: Colourspace,
    pub broadcaster: bool,
    /// Every tile path of the group, in tile order.
    pub files: Vec<PathBuf>,
    /// Position within the non-broadcaster partition; 0 for broadcaster entries.
    pub paint_index: usize,
    /// Position within the broadcaster partition; 0 for non-broadcaster entries.
    pub route_index: usize,
}

impl SelectionEntry {
    /// Index within the entry's own partition.
    pub fn partition_index(&self) -> usize {
        if self.broadcaster {
            self.route_index
        } else {
            self.paint_index
        }
    }
}

/// Axis-aligned rectangle in node-graph units. `x,y` is top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }
    pub fn right(&self) -> f64 {
        self.x + self.w
    }
    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }
    /// Returns true if `r` lies fully inside `self` (edges may touch).
    pub fn contains(&self, r: &Rect) -> bool {
        r.x >= self.x && r.y >= self.y && r.right() <= self.right() && r.bottom() <= self.bottom()
    }
    /// Smallest rectangle covering all of `rects`, or `None` when empty.
    pub fn bounding<'a>(rects: impl IntoIterator<Item = &'a Rect>) -> Option<Rect> {
        let mut iter = rects.into_iter();
        let first = iter.next()?;
        let (mut left, mut top, mut right, mut bottom) =
            (first.x, first.y, first.right(), first.bottom());
        for r in iter {
            left = left.min(r.x);
            top = top.min(r.y);
            right = right.max(r.right());
            bottom = bottom.max(r.bottom());
        }
        Some(Rect::new(left, top, right - left, bottom - top))
    }
    /// Grows the rectangle by `dx` on the left and right and `dy` on top and bottom.
    pub fn inflate(&self, dx: f64, dy: f64) -> Rect {
        Rect::new(self.x - dx, self.y - dy, self.w + dx * 2.0, self.h + dy * 2.0)
    }
}

/// Width and height of a node as reported by the node graph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct NodeSize {
    pub w: f64,
    pub h: f64,
}

impl NodeSize {
    pub fn new(w: f64, h: f64) -> Self {
        Self { w, h }
    }
}

/// Geometry of one generated node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePlacement {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub has_route: bool,
    pub paint_index: usize,
    pub route_index: usize,
}

impl NodePlacement {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.w, self.h)
    }
}

/// Bounding container grouping one partition of placed nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackdropContainer {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub label: String,
}

impl BackdropContainer {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.w, self.h)
    }
}
