use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ImportError, Result};

/// File ceiling for a single scan.
pub const MAX_FILES: usize = 3200;
/// Horizontal padding between a backdrop and its members.
pub const XPADDING: f64 = 50.0;
/// Vertical padding between a backdrop and its members.
pub const YPADDING: f64 = 50.0;
/// Vertical stride between rows of a column; rows are spaced at twice this value.
pub const STRIDE: f64 = 118.0;
/// Column for entries without a broadcaster.
pub const PAINT_COLUMN_X: f64 = -400.0;

pub const BROADCASTER_NODE_TYPE: &str = "Misc/Teleport Broadcast";
pub const BACKDROP_NODE_TYPE: &str = "Misc/Backdrop";

/// Scan-side configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Lower-case extensions accepted by the scanner.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Abort once the pre-flight count reaches this many files.
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    /// Follow symbolic links while walking.
    #[serde(default = "default_follow_links")]
    pub follow_links: bool,
    /// Directory the catalog artifact is written to.
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            max_files: default_max_files(),
            follow_links: default_follow_links(),
            out_dir: default_out_dir(),
        }
    }
}

impl DiscoveryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_files == 0 {
            return Err(ImportError::InvalidConfig(
                "max_files must be greater than zero".into(),
            ));
        }
        if self.extensions.is_empty() {
            return Err(ImportError::InvalidConfig(
                "extension allow-list is empty".into(),
            ));
        }
        if let Some(bad) = self
            .extensions
            .iter()
            .find(|e| e.is_empty() || e.starts_with('.') || *e != &e.to_ascii_lowercase())
        {
            return Err(ImportError::InvalidConfig(format!(
                "extension '{bad}' must be lower-case without a leading dot"
            )));
        }
        Ok(())
    }

    pub fn accepts_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e == ext)
    }

    pub fn builder() -> DiscoveryConfigBuilder {
        DiscoveryConfigBuilder::default()
    }
}

fn default_extensions() -> Vec<String> {
    ["tif", "exr", "txt", "jpeg", "jpg"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_max_files() -> usize {
    MAX_FILES
}
fn default_follow_links() -> bool {
    true
}
fn default_out_dir() -> PathBuf {
    std::env::temp_dir()
}

#[derive(Debug, Default, Clone)]
pub struct DiscoveryConfigBuilder {
    cfg: DiscoveryConfig,
}

impl DiscoveryConfigBuilder {
    pub fn extensions<I, S>(mut self, exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cfg.extensions = exts.into_iter().map(Into::into).collect();
        self
    }
    pub fn max_files(mut self, v: usize) -> Self {
        self.cfg.max_files = v;
        self
    }
    pub fn follow_links(mut self, v: bool) -> Self {
        self.cfg.follow_links = v;
        self
    }
    pub fn out_dir(mut self, v: impl Into<PathBuf>) -> Self {
        self.cfg.out_dir = v.into();
        self
    }
    pub fn build(self) -> DiscoveryConfig {
        self.cfg
    }
}

/// Layout-side configuration. Defaults match the fixed layout constants.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutConfig {
    #[serde(default = "default_x_padding")]
    pub x_padding: f64,
    #[serde(default = "default_y_padding")]
    pub y_padding: f64,
    #[serde(default = "default_stride")]
    pub stride: f64,
    /// X of nodes that have no broadcaster.
    #[serde(default = "default_paint_column_x")]
    pub paint_column_x: f64,
    #[serde(default = "default_broadcaster_node_type")]
    pub broadcaster_node_type: String,
    #[serde(default = "default_backdrop_node_type")]
    pub backdrop_node_type: String,
    /// Fill value for new paint nodes.
    #[serde(default)]
    pub fill: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            x_padding: default_x_padding(),
            y_padding: default_y_padding(),
            stride: default_stride(),
            paint_column_x: default_paint_column_x(),
            broadcaster_node_type: default_broadcaster_node_type(),
            backdrop_node_type: default_backdrop_node_type(),
            fill: 0.0,
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, v) in [
            ("x_padding", self.x_padding),
            ("y_padding", self.y_padding),
            ("stride", self.stride),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(ImportError::InvalidConfig(format!(
                    "{name} must be a finite non-negative number, got {v}"
                )));
            }
        }
        if !self.paint_column_x.is_finite() {
            return Err(ImportError::InvalidConfig(
                "paint_column_x must be finite".into(),
            ));
        }
        Ok(())
    }

    pub fn builder() -> LayoutConfigBuilder {
        LayoutConfigBuilder::default()
    }
}

fn default_x_padding() -> f64 {
    XPADDING
}
fn default_y_padding() -> f64 {
    YPADDING
}
fn default_stride() -> f64 {
    STRIDE
}
fn default_paint_column_x() -> f64 {
    PAINT_COLUMN_X
}
fn default_broadcaster_node_type() -> String {
    BROADCASTER_NODE_TYPE.to_string()
}
fn default_backdrop_node_type() -> String {
    BACKDROP_NODE_TYPE.to_string()
}

#[derive(Debug, Default, Clone)]
pub struct LayoutConfigBuilder {
    cfg: LayoutConfig,
}

impl LayoutConfigBuilder {
    pub fn padding(mut self, x: f64, y: f64) -> Self {
        self.cfg.x_padding = x;
        self.cfg.y_padding = y;
        self
    }
    pub fn stride(mut self, v: f64) -> Self {
        self.cfg.stride = v;
        self
    }
    pub fn paint_column_x(mut self, v: f64) -> Self {
        self.cfg.paint_column_x = v;
        self
    }
    pub fn fill(mut self, v: f32) -> Self {
        self.cfg.fill = v;
        self
    }
    pub fn build(self) -> LayoutConfig {
        self.cfg
    }
}
