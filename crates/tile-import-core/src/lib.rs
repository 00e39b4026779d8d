//! Core library for importing UDIM texture sets.
//!
//! - Discovery: walk a folder, match `<name><sep><udim>.<ext>` filenames, read image headers
//! - Catalog: group tiles by name then extension, sorted, serializable as a single JSON document
//! - Layout: place paint nodes, broadcaster nodes and backdrops on a host node graph
//! - Diagnostics: `[Flag] message` lines carried from the discovery process to its caller
//!
//! Quick example:
//! ```ignore
//! use tile_import_core::prelude::*;
//! # fn main() -> anyhow::Result<()> {
//! let cfg = DiscoveryConfig::builder().out_dir("/tmp").build();
//! let mut diag = Diagnostics::new(std::io::stdout());
//! let catalog = Discovery::new(&cfg, &ImageCrateProvider).discover("textures".as_ref(), &mut diag)?;
//! let entries = resolve_selection(&catalog, &[SelectionRequest::new("diffuse", "tif").broadcaster(true)])?;
//! let mut graph = RecordingGraph::new();
//! let report = ImportSession::default().import(&mut graph, &entries)?;
//! println!("backdrops: {}", report.backdrops.len());
//! # Ok(()) }
//! ```

pub mod catalog;
pub mod config;
pub mod diagnostics;
pub mod discovery;
pub mod error;
pub mod graph;
pub mod layout;
pub mod metadata;
pub mod model;
pub mod pattern;
pub mod scanner;
pub mod selection;

pub use catalog::*;
pub use config::*;
pub use diagnostics::*;
pub use discovery::*;
pub use error::*;
pub use layout::*;
pub use metadata::*;
pub use model::*;
pub use pattern::*;
pub use selection::*;

/// Convenience prelude for common types and functions.
/// Importing `tile_import_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::catalog::{Catalog, CatalogRow, CatalogTile, consume_catalog, write_catalog};
    pub use crate::config::{DiscoveryConfig, LayoutConfig};
    pub use crate::diagnostics::{DiagnosticLine, DiagnosticReport, Diagnostics, Flag};
    pub use crate::discovery::Discovery;
    pub use crate::error::{ErrorKind, ImportError};
    pub use crate::graph::memory::RecordingGraph;
    pub use crate::graph::{NodeGraph, ScalePolicy};
    pub use crate::layout::{ImportReport, ImportSession, LayoutPlan, plan_layout};
    pub use crate::metadata::{ImageCrateProvider, ImageHandle, ImageProvider, ImageSpec};
    pub use crate::model::{
        BackdropContainer, Colourspace, Depth, NodePlacement, NodeSize, Rect, Resolution,
        SelectionEntry, TileRecord,
    };
    pub use crate::pattern::TileName;
    pub use crate::selection::{SelectionRequest, resolve_selection};
}
