//! Collision-free node placement
//!
//! Nodes are laid out on a per-family grid: each family has a vertical
//! band and new nodes fill a fixed-width grid inside it. Placement never
//! returns a slot already occupied by a valid sibling, within a bounded
//! retry budget.

use crate::constants;
use crate::graph::{NodeId, SceneGraph};
use crate::types::Family;
use log::warn;
use std::collections::HashSet;

/// Grid geometry for placement and reflow
#[derive(Debug, Clone, Copy)]
pub struct LayoutConfig {
    pub spacing_x: i32,
    pub spacing_y: i32,
    pub columns: usize,
    /// Collision probes before giving up and accepting an overlap
    pub max_probe: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            spacing_x: constants::layout::SPACING_X,
            spacing_y: constants::layout::SPACING_Y,
            columns: constants::layout::GRID_COLUMNS,
            max_probe: constants::layout::PLACEMENT_RETRY,
        }
    }
}

/// Pick a position for a new node under `parent`.
///
/// Precedence: an explicit position is used verbatim; otherwise an
/// alignment source puts the node one column to its right; otherwise the
/// node lands on its family's grid.
pub fn place(
    graph: &SceneGraph,
    parent: NodeId,
    family: Family,
    explicit: Option<(i32, i32)>,
    align: Option<NodeId>,
    cfg: &LayoutConfig,
) -> (i32, i32) {
    if let Some(pos) = explicit {
        return pos;
    }
    let occupied = graph.occupied_positions(parent);

    if let Some(source) = align.and_then(|id| graph.node(id)) {
        let mut pos = (source.position.0 + cfg.spacing_x, source.position.1);
        let mut probes = 0;
        while occupied.contains(&pos) && probes < cfg.max_probe {
            pos.0 += cfg.spacing_x;
            probes += 1;
        }
        return pos;
    }

    grid_slot(
        &occupied,
        family,
        graph.siblings_of_family(parent, family, None).len(),
        cfg,
    )
}

/// Grid cell for the n-th node of a family, advanced past occupied cells
fn grid_slot(
    occupied: &HashSet<(i32, i32)>,
    family: Family,
    index: usize,
    cfg: &LayoutConfig,
) -> (i32, i32) {
    let mut n = index;
    for probe in 0..=cfg.max_probe {
        let col = (n % cfg.columns) as i32;
        let row = (n / cfg.columns) as i32;
        let pos = (
            col * cfg.spacing_x,
            family.row_offset() - row * cfg.spacing_y,
        );
        if !occupied.contains(&pos) {
            return pos;
        }
        if probe == cfg.max_probe {
            warn!("placement probes exhausted for {family}, accepting overlap");
            return pos;
        }
        n += 1;
    }
    unreachable!("probe loop always returns")
}

/// Plan a full re-grid of `parent`'s children.
///
/// Children are bucketed by family, ordered by current position, and
/// assigned fresh grid cells. Pure planner: the caller applies the moves.
pub fn reflow(
    graph: &SceneGraph,
    parent: NodeId,
    cfg: &LayoutConfig,
) -> Vec<(NodeId, (i32, i32))> {
    let mut plan = Vec::new();
    for family in Family::PRIORITY {
        let mut members: Vec<NodeId> = graph.siblings_of_family(parent, family, None);
        members.sort_by_key(|id| {
            graph
                .node(*id)
                .map(|n| (n.position.1, n.position.0, n.id))
                .unwrap_or((0, 0, *id))
        });
        for (index, id) in members.into_iter().enumerate() {
            let col = (index % cfg.columns) as i32;
            let row = (index / cfg.columns) as i32;
            plan.push((
                id,
                (
                    col * cfg.spacing_x,
                    family.row_offset() - row * cfg.spacing_y,
                ),
            ));
        }
    }
    plan
}
