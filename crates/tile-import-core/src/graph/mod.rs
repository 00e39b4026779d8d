//! Host node-graph boundary.
//!
//! The layout driver only needs to create nodes, read their native size, and move or
//! resize them. [`memory::RecordingGraph`] implements the trait in memory.

pub mod memory;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{Colourspace, NodeSize};

/// How imported tiles are fitted to the paint node resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScalePolicy {
    #[default]
    ScaleThePatch,
}

pub trait NodeGraph {
    type Node: Clone;

    fn create_paint_node(
        &mut self,
        width: u32,
        height: u32,
        bit_depth: u32,
        fill: f32,
    ) -> Result<Self::Node>;
    fn create_node(&mut self, type_name: &str) -> Result<Self::Node>;

    fn set_name(&mut self, node: &Self::Node, name: &str) -> Result<()>;
    /// Channel names are unique across the graph; hosts reject duplicates.
    fn set_channel_name(&mut self, node: &Self::Node, name: &str) -> Result<()>;
    fn connect_input(&mut self, node: &Self::Node, port: &str, source: &Self::Node) -> Result<()>;
    fn set_colourspace(&mut self, node: &Self::Node, colourspace: Colourspace) -> Result<()>;
    fn add_tag(&mut self, node: &Self::Node, tag: &str) -> Result<()>;

    /// Native size of a node after creation.
    fn node_size(&self, node: &Self::Node) -> NodeSize;
    fn set_position(&mut self, node: &Self::Node, x: f64, y: f64);
    fn set_size(&mut self, node: &Self::Node, w: f64, h: f64);

    fn import_images(
        &mut self,
        node: &Self::Node,
        template: &str,
        policy: ScalePolicy,
    ) -> Result<()>;
}
