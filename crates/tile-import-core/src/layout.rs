//! Node and backdrop geometry for a resolved selection.
//!
//! Entries without a broadcaster stack in a column at `paint_column_x`; entries with
//! one stack at `x = 0` with their broadcaster node to the right. Rows in each column
//! are `2 * stride` apart. Backdrops enclose their members with fixed padding.

use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::config::LayoutConfig;
use crate::error::{ImportError, Result};
use crate::graph::{NodeGraph, ScalePolicy};
use crate::model::{BackdropContainer, NodePlacement, NodeSize, Rect, SelectionEntry};
use crate::pattern::image_template;

/// Horizontal position of an entry's paint node.
pub fn node_x(entry: &SelectionEntry, cfg: &LayoutConfig) -> f64 {
    if entry.broadcaster {
        0.0
    } else {
        cfg.paint_column_x
    }
}

/// Vertical position of an entry's paint node; `order` is its position in the selection.
pub fn node_y(entry: &SelectionEntry, order: usize, cfg: &LayoutConfig) -> f64 {
    if order == 0 {
        return 0.0;
    }
    if !entry.broadcaster && entry.paint_index == 0 {
        return 0.0;
    }
    cfg.stride * entry.partition_index() as f64 * 2.0
}

/// Placement of an entry's paint node once its native size is known.
pub fn place_primary(
    entry: &SelectionEntry,
    order: usize,
    size: NodeSize,
    cfg: &LayoutConfig,
) -> NodePlacement {
    NodePlacement {
        x: node_x(entry, cfg),
        y: node_y(entry, order, cfg),
        w: size.w,
        h: size.h,
        has_route: entry.broadcaster,
        paint_index: entry.paint_index,
        route_index: entry.route_index,
    }
}

/// Broadcaster node sits at twice the primary's width, on the primary's row.
pub fn place_companion(primary: &NodePlacement, size: NodeSize) -> NodePlacement {
    NodePlacement {
        x: primary.w * 2.0,
        y: primary.y,
        w: size.w,
        h: size.h,
        has_route: true,
        paint_index: primary.paint_index,
        route_index: primary.route_index,
    }
}

/// Bounding box of `members` grown by the configured padding on every side.
pub fn enclose(members: &[Rect], cfg: &LayoutConfig) -> Result<Rect> {
    Rect::bounding(members)
        .map(|r| r.inflate(cfg.x_padding, cfg.y_padding))
        .ok_or_else(|| ImportError::Layout("backdrop has no member nodes".into()))
}

/// Number of backdrops a selection needs: one per distinct broadcaster flag.
pub fn backdrop_count(entries: &[SelectionEntry]) -> usize {
    let with = entries.iter().any(|e| e.broadcaster);
    let without = entries.iter().any(|e| !e.broadcaster);
    usize::from(with) + usize::from(without)
}

/// `Import Batch: <n> (<YYYYMMDD>)`
pub fn backdrop_label(import_number: u64, date: NaiveDate) -> String {
    format!("Import Batch: {import_number} ({})", date.format("%Y%m%d"))
}

/// `import backdrop <YYYYMMDD>`
pub fn backdrop_tag(date: NaiveDate) -> String {
    format!("import backdrop {}", date.format("%Y%m%d"))
}

/// Geometry of one selection entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedEntry {
    pub name: String,
    pub paint: NodePlacement,
    pub companion: Option<NodePlacement>,
}

impl PlacedEntry {
    fn member_rects(&self) -> impl Iterator<Item = Rect> + '_ {
        std::iter::once(self.paint.rect()).chain(self.companion.as_ref().map(|c| c.rect()))
    }
}

/// Member rectangles per backdrop. Broadcaster partition first when split.
fn partition_members(placed: &[PlacedEntry], split: bool) -> Vec<Vec<Rect>> {
    if !split {
        return vec![placed.iter().flat_map(|p| p.member_rects()).collect()];
    }
    let (routed, plain): (Vec<&PlacedEntry>, Vec<&PlacedEntry>) =
        placed.iter().partition(|p| p.paint.has_route);
    vec![
        routed.into_iter().flat_map(|p| p.member_rects()).collect(),
        plain.into_iter().flat_map(|p| p.member_rects()).collect(),
    ]
}

/// Pure layout of a whole selection with uniform node sizes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutPlan {
    pub entries: Vec<PlacedEntry>,
    pub backdrops: Vec<BackdropContainer>,
}

pub fn plan_layout(
    entries: &[SelectionEntry],
    paint_size: NodeSize,
    broadcaster_size: NodeSize,
    label: &str,
    cfg: &LayoutConfig,
) -> LayoutPlan {
    let placed: Vec<PlacedEntry> = entries
        .iter()
        .enumerate()
        .map(|(order, entry)| {
            let paint = place_primary(entry, order, paint_size, cfg);
            let companion = entry
                .broadcaster
                .then(|| place_companion(&paint, broadcaster_size));
            PlacedEntry {
                name: entry.name.clone(),
                paint,
                companion,
            }
        })
        .collect();
    let split = backdrop_count(entries) == 2;
    let backdrops = partition_members(&placed, split)
        .iter()
        .filter_map(|members| match enclose(members, cfg) {
            Ok(r) => Some(BackdropContainer {
                x: r.x,
                y: r.y,
                w: r.w,
                h: r.h,
                label: label.to_string(),
            }),
            Err(e) => {
                debug!(error = %e, "skipping backdrop");
                None
            }
        })
        .collect();
    LayoutPlan {
        entries: placed,
        backdrops,
    }
}

/// Backdrop created on first fit and only moved or resized afterwards.
struct BackdropSlot<N> {
    node: Option<N>,
    geometry: Option<Rect>,
}

impl<N: Clone> BackdropSlot<N> {
    fn new() -> Self {
        Self {
            node: None,
            geometry: None,
        }
    }

    fn fit<G: NodeGraph<Node = N>>(
        &mut self,
        graph: &mut G,
        members: &[Rect],
        label: &str,
        tag: &str,
        cfg: &LayoutConfig,
    ) -> Result<()> {
        let rect = enclose(members, cfg)?;
        let node = match &self.node {
            Some(node) => node.clone(),
            None => {
                let node = graph.create_node(&cfg.backdrop_node_type)?;
                graph.set_name(&node, label)?;
                graph.add_tag(&node, tag)?;
                self.node = Some(node.clone());
                node
            }
        };
        graph.set_size(&node, rect.w, rect.h);
        graph.set_position(&node, rect.x, rect.y);
        self.geometry = Some(rect);
        Ok(())
    }

    fn container(&self, label: &str) -> Option<BackdropContainer> {
        self.geometry.map(|r| BackdropContainer {
            x: r.x,
            y: r.y,
            w: r.w,
            h: r.h,
            label: label.to_string(),
        })
    }
}

/// Outcome of one import action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportReport {
    pub import_number: u64,
    pub entries: Vec<PlacedEntry>,
    pub backdrops: Vec<BackdropContainer>,
    /// Entries that could not be placed or imported, with the reason.
    pub failures: Vec<String>,
}

/// Caller-owned state across import actions.
#[derive(Debug, Clone, Default)]
pub struct ImportSession {
    cfg: LayoutConfig,
    import_count: u64,
}

impl ImportSession {
    pub fn new(cfg: LayoutConfig) -> Self {
        Self {
            cfg,
            import_count: 0,
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.cfg
    }

    /// Number of import actions that placed at least one entry.
    pub fn import_count(&self) -> u64 {
        self.import_count
    }

    pub fn import<G: NodeGraph>(
        &mut self,
        graph: &mut G,
        entries: &[SelectionEntry],
    ) -> Result<ImportReport> {
        self.import_on(graph, entries, Local::now().date_naive())
    }

    /// Places `entries` on `graph`, stamping backdrops with `date`.
    ///
    /// A failure for one entry or one backdrop is logged and recorded in the report;
    /// the remaining entries are still placed.
    #[instrument(skip_all, fields(entries = entries.len()))]
    pub fn import_on<G: NodeGraph>(
        &mut self,
        graph: &mut G,
        entries: &[SelectionEntry],
        date: NaiveDate,
    ) -> Result<ImportReport> {
        self.cfg.validate()?;
        if entries.is_empty() {
            info!("no entries selected, nothing to import");
            return Ok(ImportReport {
                import_number: self.import_count,
                entries: Vec::new(),
                backdrops: Vec::new(),
                failures: Vec::new(),
            });
        }
        self.import_count += 1;
        let import_number = self.import_count;
        let label = backdrop_label(import_number, date);
        let tag = backdrop_tag(date);
        let split = backdrop_count(entries) == 2;

        let mut slots = [BackdropSlot::<G::Node>::new(), BackdropSlot::new()];
        let mut placed: Vec<PlacedEntry> = Vec::with_capacity(entries.len());
        let mut failures = Vec::new();

        for (order, entry) in entries.iter().enumerate() {
            let (node, entry_geometry) = match self.place_entry(graph, entry, order, date) {
                Ok(v) => v,
                Err(e) => {
                    warn!(name = %entry.name, error = %e, "failed to place entry");
                    failures.push(format!("{}: {e}", entry.name));
                    continue;
                }
            };
            placed.push(entry_geometry);

            for (slot, members) in slots.iter_mut().zip(partition_members(&placed, split)) {
                if let Err(e) = slot.fit(graph, &members, &label, &tag, &self.cfg) {
                    debug!(error = %e, "skipping backdrop");
                }
            }

            if let Err(e) = import_entry_images(graph, &node, entry) {
                warn!(name = %entry.name, error = %e, "failed to import images");
                failures.push(format!("{}: {e}", entry.name));
            }
        }

        let backdrops: Vec<BackdropContainer> =
            slots.iter().filter_map(|s| s.container(&label)).collect();
        info!(
            import_number,
            placed = placed.len(),
            backdrops = backdrops.len(),
            failures = failures.len(),
            "import finished"
        );
        Ok(ImportReport {
            import_number,
            entries: placed,
            backdrops,
            failures,
        })
    }

    fn place_entry<G: NodeGraph>(
        &self,
        graph: &mut G,
        entry: &SelectionEntry,
        order: usize,
        date: NaiveDate,
    ) -> Result<(G::Node, PlacedEntry)> {
        let node = graph.create_paint_node(
            entry.size.width,
            entry.size.height,
            entry.depth.bits(),
            self.cfg.fill,
        )?;
        graph.set_name(&node, &entry.name)?;
        graph.set_colourspace(&node, entry.colourspace)?;
        let paint = place_primary(entry, order, graph.node_size(&node), &self.cfg);
        graph.set_position(&node, paint.x, paint.y);

        let companion = if entry.broadcaster {
            let broadcaster = self.create_broadcaster(graph, &node, &entry.name, date)?;
            let placement = place_companion(&paint, graph.node_size(&broadcaster));
            graph.set_position(&broadcaster, placement.x, placement.y);
            Some(placement)
        } else {
            None
        };
        Ok((
            node,
            PlacedEntry {
                name: entry.name.clone(),
                paint,
                companion,
            },
        ))
    }

    fn create_broadcaster<G: NodeGraph>(
        &self,
        graph: &mut G,
        source: &G::Node,
        channel: &str,
        date: NaiveDate,
    ) -> Result<G::Node> {
        let node = graph.create_node(&self.cfg.broadcaster_node_type)?;
        graph.set_name(&node, "Broadcaster")?;
        if let Err(e) = graph.set_channel_name(&node, channel) {
            let fallback = format!("{channel} {}", date.format("%Y%m%d"));
            warn!(channel, fallback = %fallback, error = %e, "duplicate broadcaster channel");
            graph.set_channel_name(&node, &fallback)?;
        }
        graph.connect_input(&node, "Input", source)?;
        Ok(node)
    }
}

fn import_entry_images<G: NodeGraph>(
    graph: &mut G,
    node: &G::Node,
    entry: &SelectionEntry,
) -> Result<()> {
    let first = entry
        .files
        .first()
        .ok_or_else(|| ImportError::Layout(format!("'{}' has no files", entry.name)))?;
    let template = image_template(first).ok_or_else(|| {
        ImportError::Layout(format!(
            "'{}' does not follow the tile naming convention",
            first.display()
        ))
    })?;
    graph.import_images(node, &template, ScalePolicy::ScaleThePatch)
}
