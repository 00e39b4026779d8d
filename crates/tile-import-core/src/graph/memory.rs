use std::collections::HashSet;

use serde::Serialize;

use super::{NodeGraph, ScalePolicy};
use crate::error::{ImportError, Result};
use crate::model::{Colourspace, NodeSize};

/// Default size for paint nodes.
pub const PAINT_NODE_SIZE: NodeSize = NodeSize { w: 160.0, h: 60.0 };
/// Default size for any other node type.
pub const OTHER_NODE_SIZE: NodeSize = NodeSize { w: 120.0, h: 40.0 };

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordedKind {
    Paint {
        width: u32,
        height: u32,
        bit_depth: u32,
        fill: f32,
    },
    Typed {
        type_name: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedNode {
    pub id: usize,
    #[serde(flatten)]
    pub kind: RecordedKind,
    pub name: Option<String>,
    pub channel_name: Option<String>,
    pub colourspace: Option<Colourspace>,
    pub position: Option<(f64, f64)>,
    pub size: NodeSize,
    pub tags: Vec<String>,
    pub inputs: Vec<(String, usize)>,
    pub imports: Vec<(String, ScalePolicy)>,
}

impl RecordedNode {
    pub fn is_type(&self, type_name: &str) -> bool {
        matches!(&self.kind, RecordedKind::Typed { type_name: t } if t == type_name)
    }

    pub fn is_paint(&self) -> bool {
        matches!(self.kind, RecordedKind::Paint { .. })
    }
}

/// In-memory [`NodeGraph`] that records every call; used for dry runs and tests.
#[derive(Debug, Clone, Serialize)]
pub struct RecordingGraph {
    nodes: Vec<RecordedNode>,
    #[serde(skip)]
    paint_size: NodeSize,
    #[serde(skip)]
    other_size: NodeSize,
    #[serde(skip)]
    channel_names: HashSet<String>,
    #[serde(skip)]
    failing_paint: HashSet<(u32, u32)>,
}

impl Default for RecordingGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingGraph {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            paint_size: PAINT_NODE_SIZE,
            other_size: OTHER_NODE_SIZE,
            channel_names: HashSet::new(),
            failing_paint: HashSet::new(),
        }
    }

    pub fn with_node_sizes(mut self, paint: NodeSize, other: NodeSize) -> Self {
        self.paint_size = paint;
        self.other_size = other;
        self
    }

    /// Paint nodes of exactly this resolution fail to create.
    pub fn with_paint_failure(mut self, width: u32, height: u32) -> Self {
        self.failing_paint.insert((width, height));
        self
    }

    pub fn nodes(&self) -> &[RecordedNode] {
        &self.nodes
    }

    pub fn node(&self, id: usize) -> Option<&RecordedNode> {
        self.nodes.get(id)
    }

    pub fn nodes_of_type<'a>(&'a self, type_name: &'a str) -> impl Iterator<Item = &'a RecordedNode> {
        self.nodes.iter().filter(move |n| n.is_type(type_name))
    }

    pub fn paint_nodes(&self) -> impl Iterator<Item = &RecordedNode> {
        self.nodes.iter().filter(|n| n.is_paint())
    }

    fn push(&mut self, kind: RecordedKind, size: NodeSize) -> usize {
        let id = self.nodes.len();
        self.nodes.push(RecordedNode {
            id,
            kind,
            name: None,
            channel_name: None,
            colourspace: None,
            position: None,
            size,
            tags: Vec::new(),
            inputs: Vec::new(),
            imports: Vec::new(),
        });
        id
    }

    fn get_mut(&mut self, node: usize) -> Result<&mut RecordedNode> {
        self.nodes
            .get_mut(node)
            .ok_or_else(|| ImportError::Graph(format!("no node with id {node}")))
    }
}

impl NodeGraph for RecordingGraph {
    type Node = usize;

    fn create_paint_node(
        &mut self,
        width: u32,
        height: u32,
        bit_depth: u32,
        fill: f32,
    ) -> Result<usize> {
        if width == 0 || height == 0 || self.failing_paint.contains(&(width, height)) {
            return Err(ImportError::Graph(format!(
                "cannot create {width}x{height} paint node"
            )));
        }
        let size = self.paint_size;
        Ok(self.push(
            RecordedKind::Paint {
                width,
                height,
                bit_depth,
                fill,
            },
            size,
        ))
    }

    fn create_node(&mut self, type_name: &str) -> Result<usize> {
        let size = self.other_size;
        Ok(self.push(
            RecordedKind::Typed {
                type_name: type_name.to_string(),
            },
            size,
        ))
    }

    fn set_name(&mut self, node: &usize, name: &str) -> Result<()> {
        self.get_mut(*node)?.name = Some(name.to_string());
        Ok(())
    }

    fn set_channel_name(&mut self, node: &usize, name: &str) -> Result<()> {
        if self.channel_names.contains(name) {
            return Err(ImportError::Graph(format!(
                "channel name '{name}' already in use"
            )));
        }
        let previous = self.get_mut(*node)?.channel_name.replace(name.to_string());
        if let Some(old) = previous {
            self.channel_names.remove(&old);
        }
        self.channel_names.insert(name.to_string());
        Ok(())
    }

    fn connect_input(&mut self, node: &usize, port: &str, source: &usize) -> Result<()> {
        if *source >= self.nodes.len() {
            return Err(ImportError::Graph(format!("no node with id {source}")));
        }
        self.get_mut(*node)?.inputs.push((port.to_string(), *source));
        Ok(())
    }

    fn set_colourspace(&mut self, node: &usize, colourspace: Colourspace) -> Result<()> {
        self.get_mut(*node)?.colourspace = Some(colourspace);
        Ok(())
    }

    fn add_tag(&mut self, node: &usize, tag: &str) -> Result<()> {
        self.get_mut(*node)?.tags.push(tag.to_string());
        Ok(())
    }

    fn node_size(&self, node: &usize) -> NodeSize {
        self.nodes.get(*node).map(|n| n.size).unwrap_or_default()
    }

    fn set_position(&mut self, node: &usize, x: f64, y: f64) {
        if let Some(n) = self.nodes.get_mut(*node) {
            n.position = Some((x, y));
        }
    }

    fn set_size(&mut self, node: &usize, w: f64, h: f64) {
        if let Some(n) = self.nodes.get_mut(*node) {
            n.size = NodeSize::new(w, h);
        }
    }

    fn import_images(&mut self, node: &usize, template: &str, policy: ScalePolicy) -> Result<()> {
        self.get_mut(*node)?
            .imports
            .push((template.to_string(), policy));
        Ok(())
    }
}
