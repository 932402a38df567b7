//! Automatic wiring: candidate scoring and minimum-input satisfaction

pub mod priority;

use crate::constants;
use crate::error::EngineError;
use crate::graph::{NodeId, SceneGraph, WireReason};
use crate::layout::LayoutConfig;
use crate::types::{Family, TypeRegistry};
use log::{debug, info};
use serde::Serialize;
use std::collections::HashSet;

/// Scoring weights for automatic wiring
#[derive(Debug, Clone, Copy)]
pub struct WireConfig {
    /// Minimum score a scored candidate must reach to be connected
    pub threshold: i32,
    pub same_type_bonus: i32,
    pub family_bonus: i32,
    pub free_output_bonus: i32,
    pub recency_step: i32,
    pub rank_step: i32,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            threshold: constants::wire::SCORE_THRESHOLD,
            same_type_bonus: constants::wire::SAME_TYPE_BONUS,
            family_bonus: constants::wire::FAMILY_BONUS,
            free_output_bonus: constants::wire::FREE_OUTPUT_BONUS,
            recency_step: constants::wire::RECENCY_STEP,
            rank_step: constants::wire::PRIORITY_RANK_STEP,
        }
    }
}

/// How a freshly created node gets its first input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireMode {
    /// Leave inputs empty
    #[default]
    None,
    /// Rightmost same-family sibling
    Auto,
    /// Best candidate above the score threshold
    Scored,
}

impl WireMode {
    /// Parse a mode label; unknown labels fail rather than silently
    /// falling back
    pub fn parse(label: &str) -> Result<WireMode, EngineError> {
        match label.trim().to_lowercase().as_str() {
            "" | "none" | "off" => Ok(WireMode::None),
            "auto" => Ok(WireMode::Auto),
            "scored" | "smart" => Ok(WireMode::Scored),
            other => Err(EngineError::InvalidArguments(format!(
                "unknown wire mode '{other}'"
            ))),
        }
    }
}

/// A scored wiring candidate
#[derive(Debug, Clone, Serialize)]
pub struct ScoredCandidate {
    #[serde(skip)]
    pub id: NodeId,
    pub path: String,
    pub score: i32,
    pub detail: String,
}

/// Rightmost same-family sibling of `node`, newest id on position ties
pub fn pick_auto_source(graph: &SceneGraph, parent: NodeId, node: NodeId) -> Option<NodeId> {
    let family = graph.node(node)?.family();
    graph
        .siblings_of_family(parent, family, Some(node))
        .into_iter()
        .max_by_key(|id| {
            graph
                .node(*id)
                .map(|n| (n.position.0, n.id))
                .unwrap_or((i32::MIN, 0))
        })
}

/// Score every sibling of `node` as a potential input source, best first.
///
/// Deterministic given one graph state: score ties break on higher id so
/// repeated calls always order candidates identically.
pub fn score_candidates(
    graph: &SceneGraph,
    cfg: &WireConfig,
    parent: NodeId,
    node: NodeId,
) -> Vec<ScoredCandidate> {
    let target = match graph.node(node) {
        Some(n) => n,
        None => return Vec::new(),
    };
    let siblings = graph.children_of(parent);
    let mut out = Vec::new();
    for (index, id) in siblings.iter().enumerate() {
        if *id == node {
            continue;
        }
        let candidate = match graph.node(*id) {
            Some(n) if n.valid => n,
            _ => continue,
        };
        let mut score = 0;
        let mut parts = Vec::new();
        if candidate.type_name() == target.type_name() {
            score += cfg.same_type_bonus;
            parts.push("same type".to_string());
        }
        if candidate.family() == target.family() {
            score += cfg.family_bonus;
            parts.push("same family".to_string());
        }
        if let Some((rank, table_len)) =
            priority::preference_rank(target.type_name(), candidate.type_name())
        {
            score += (table_len - rank) as i32 * cfg.rank_step;
            parts.push(format!("preferred source rank {rank}"));
        }
        if graph.consumer_count(*id) == 0 {
            score += cfg.free_output_bonus;
            parts.push("free output".to_string());
        }
        let recency = index as i32 * cfg.recency_step;
        score += recency;
        if recency > 0 {
            parts.push(format!("recency {recency}"));
        }
        out.push(ScoredCandidate {
            id: *id,
            path: candidate.path.clone(),
            score,
            detail: parts.join(", "),
        });
    }
    out.sort_by_key(|c| (std::cmp::Reverse(c.score), std::cmp::Reverse(c.id)));
    out
}

/// Best candidate at or above the threshold, if any
pub fn choose_scored(
    graph: &SceneGraph,
    cfg: &WireConfig,
    parent: NodeId,
    node: NodeId,
) -> Option<ScoredCandidate> {
    score_candidates(graph, cfg, parent, node)
        .into_iter()
        .next()
        .filter(|c| c.score >= cfg.threshold)
}

/// One successfully filled input slot
#[derive(Debug, Clone, Serialize)]
pub struct SlotFill {
    pub slot: usize,
    pub source: String,
    /// True when the source node was synthesized for this slot
    pub created: bool,
}

/// One input slot that could not be filled
#[derive(Debug, Clone, Serialize)]
pub struct SlotFailure {
    pub slot: usize,
    pub reason: String,
}

/// Outcome of a minimum-input satisfaction pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct SatisfyReport {
    pub filled: Vec<SlotFill>,
    pub unsatisfied: Vec<SlotFailure>,
}

impl SatisfyReport {
    pub fn complete(&self) -> bool {
        self.unsatisfied.is_empty()
    }
}

/// Fallback source type synthesized for an unfillable slot.
///
/// A couple of filter types want a specific secondary input (a displace
/// map, a lookup ramp, a second solid); everything else gets the family's
/// generic generator.
fn fallback_type(target_type: &str, family: Family, slot: usize) -> Option<&'static str> {
    match (target_type, slot) {
        ("displaceFx", 1) => return Some("noiseFx"),
        ("lookupFx", 1) => return Some("rampFx"),
        ("booleanGeo", 1) => return Some("sphereGeo"),
        _ => {}
    }
    match family {
        Family::Visual => Some("constantFx"),
        Family::Channel => Some("constantChan"),
        Family::Geometry => Some("boxGeo"),
        Family::Data | Family::Container | Family::Material => None,
    }
}

/// Fill every empty required input of `node`.
///
/// Per slot, in order: a caller-preferred path, then the most recent
/// same-family sibling not already feeding this node, then a synthesized
/// fallback generator placed to the node's left. Slots that cannot be
/// filled are reported, never silently skipped.
pub fn satisfy_min_inputs(
    graph: &mut SceneGraph,
    registry: &TypeRegistry,
    node: NodeId,
    preferred_paths: &[String],
    layout_cfg: &LayoutConfig,
) -> Result<SatisfyReport, EngineError> {
    let (parent, family, type_name, min_inputs, node_pos) = {
        let n = graph
            .node(node)
            .ok_or_else(|| EngineError::InvalidPath(format!("#{node}")))?;
        let parent = match n.parent {
            Some(p) => p,
            None => return Ok(SatisfyReport::default()),
        };
        (
            parent,
            n.family(),
            n.descriptor.name.clone(),
            n.descriptor.min_inputs,
            n.position,
        )
    };

    let mut report = SatisfyReport::default();
    let mut used: HashSet<NodeId> = (0..min_inputs)
        .filter_map(|slot| graph.node(node).and_then(|n| n.input(slot)))
        .collect();

    let mut preferred = preferred_paths.iter();
    for slot in 0..min_inputs {
        if graph.node(node).and_then(|n| n.input(slot)).is_some() {
            continue;
        }

        // Caller-named sources are consumed in order, one per empty slot
        if let Some(path) = preferred.next() {
            match graph.resolve_path(path) {
                Ok(source) if source != node => {
                    graph.connect(source, node, slot, WireReason::Explicit)?;
                    used.insert(source);
                    report.filled.push(SlotFill {
                        slot,
                        source: path.clone(),
                        created: false,
                    });
                    continue;
                }
                Ok(_) => {
                    report.unsatisfied.push(SlotFailure {
                        slot,
                        reason: format!("'{path}' is the node itself"),
                    });
                    continue;
                }
                Err(_) => {
                    report.unsatisfied.push(SlotFailure {
                        slot,
                        reason: format!("preferred source '{path}' not found"),
                    });
                    continue;
                }
            }
        }

        // Most recent unused same-family sibling
        let sibling = graph
            .siblings_of_family(parent, family, Some(node))
            .into_iter()
            .rev()
            .find(|id| !used.contains(id));
        if let Some(source) = sibling {
            let source_path = graph
                .node(source)
                .map(|n| n.path.clone())
                .unwrap_or_default();
            graph.connect(source, node, slot, WireReason::Auto)?;
            used.insert(source);
            debug!("slot {slot} of #{node} fed from sibling {source_path}");
            report.filled.push(SlotFill {
                slot,
                source: source_path,
                created: false,
            });
            continue;
        }

        // No sibling available: synthesize a generator
        let Some(fallback) = fallback_type(&type_name, family, slot) else {
            report.unsatisfied.push(SlotFailure {
                slot,
                reason: format!("no fallback source for {family} inputs"),
            });
            continue;
        };
        let descriptor = match registry.get(fallback) {
            Some(d) => d,
            None => {
                report.unsatisfied.push(SlotFailure {
                    slot,
                    reason: format!("fallback type '{fallback}' not registered"),
                });
                continue;
            }
        };
        let base = descriptor.base_name().to_lowercase();
        let name = graph.unique_child_name(parent, &format!("auto_{base}"));
        let occupied = graph.occupied_positions(parent);
        let mut pos = (
            node_pos.0 - layout_cfg.spacing_x,
            node_pos.1 + slot as i32 * layout_cfg.spacing_y,
        );
        let mut probes = 0;
        while occupied.contains(&pos) && probes < layout_cfg.max_probe {
            pos.0 -= layout_cfg.spacing_x;
            probes += 1;
        }
        let source = graph.create_child(parent, descriptor, &name, pos)?;
        let source_path = graph
            .node(source)
            .map(|n| n.path.clone())
            .unwrap_or_default();
        graph.connect(source, node, slot, WireReason::Fallback)?;
        used.insert(source);
        info!("synthesized {source_path} for slot {slot} of #{node}");
        report.filled.push(SlotFill {
            slot,
            source: source_path,
            created: true,
        });
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::SceneGraph;

    fn graph() -> (SceneGraph, TypeRegistry) {
        let registry = TypeRegistry::builtin();
        let root = registry.get("baseComp").unwrap();
        (SceneGraph::new(root), registry)
    }

    #[test]
    fn test_wire_mode_parse() {
        assert_eq!(WireMode::parse("").unwrap(), WireMode::None);
        assert_eq!(WireMode::parse("Auto").unwrap(), WireMode::Auto);
        assert_eq!(WireMode::parse("scored").unwrap(), WireMode::Scored);
        assert!(WireMode::parse("always").is_err());
    }

    #[test]
    fn test_pick_auto_source_prefers_rightmost() {
        let (mut g, reg) = graph();
        let a = g
            .create_child(g.root(), reg.get("noiseFx").unwrap(), "a", (0, 0))
            .unwrap();
        let b = g
            .create_child(g.root(), reg.get("movieInFx").unwrap(), "b", (440, 0))
            .unwrap();
        let _chan = g
            .create_child(g.root(), reg.get("lfoChan").unwrap(), "c", (900, -300))
            .unwrap();
        let blur = g
            .create_child(g.root(), reg.get("blurFx").unwrap(), "blur", (220, 0))
            .unwrap();
        assert_eq!(pick_auto_source(&g, g.root(), blur), Some(b));
        let _ = a;
    }

    #[test]
    fn test_scoring_orders_by_merit() {
        let (mut g, reg) = graph();
        let cfg = WireConfig::default();
        let movie = g
            .create_child(g.root(), reg.get("movieInFx").unwrap(), "movie", (0, 0))
            .unwrap();
        let chan = g
            .create_child(g.root(), reg.get("lfoChan").unwrap(), "lfo", (0, -300))
            .unwrap();
        let blur = g
            .create_child(g.root(), reg.get("blurFx").unwrap(), "blur", (220, 0))
            .unwrap();
        let ranked = score_candidates(&g, &cfg, g.root(), blur);
        assert_eq!(ranked[0].id, movie);
        assert!(ranked[0].score >= cfg.threshold);
        // Cross-family candidate scores below the same-family one
        let chan_entry = ranked.iter().find(|c| c.id == chan).unwrap();
        assert!(chan_entry.score < ranked[0].score);
    }

    #[test]
    fn test_scored_choice_respects_threshold() {
        let (mut g, reg) = graph();
        let cfg = WireConfig::default();
        // Only a cross-family candidate with nothing going for it
        let _dat = g
            .create_child(g.root(), reg.get("jsonDat").unwrap(), "d", (0, -1500))
            .unwrap();
        let blur = g
            .create_child(g.root(), reg.get("blurFx").unwrap(), "blur", (220, 0))
            .unwrap();
        assert!(choose_scored(&g, &cfg, g.root(), blur).is_none());
    }

    #[test]
    fn test_satisfy_uses_recent_sibling() {
        let (mut g, reg) = graph();
        let layout_cfg = LayoutConfig::default();
        let _old = g
            .create_child(g.root(), reg.get("noiseFx").unwrap(), "old", (0, 0))
            .unwrap();
        let recent = g
            .create_child(g.root(), reg.get("movieInFx").unwrap(), "recent", (220, 0))
            .unwrap();
        let blur = g
            .create_child(g.root(), reg.get("blurFx").unwrap(), "blur", (440, 0))
            .unwrap();
        let report = satisfy_min_inputs(&mut g, &reg, blur, &[], &layout_cfg).unwrap();
        assert!(report.complete());
        assert_eq!(g.node(blur).unwrap().input(0), Some(recent));
        assert!(!report.filled[0].created);
    }

    #[test]
    fn test_satisfy_synthesizes_fallbacks() {
        let (mut g, reg) = graph();
        let layout_cfg = LayoutConfig::default();
        let displace = g
            .create_child(g.root(), reg.get("displaceFx").unwrap(), "disp", (440, 0))
            .unwrap();
        let report = satisfy_min_inputs(&mut g, &reg, displace, &[], &layout_cfg).unwrap();
        assert!(report.complete());
        assert_eq!(report.filled.len(), 2);
        assert!(report.filled.iter().all(|f| f.created));
        // Slot 1 of a displace gets a noise map, not a solid
        let slot1 = g.node(displace).unwrap().input(1).unwrap();
        assert_eq!(g.node(slot1).unwrap().type_name(), "noiseFx");
        let slot0 = g.node(displace).unwrap().input(0).unwrap();
        assert_eq!(g.node(slot0).unwrap().type_name(), "constantFx");
        assert!(g.node(slot0).unwrap().name.starts_with("auto_"));
    }

    #[test]
    fn test_satisfy_reports_missing_preferred_path() {
        let (mut g, reg) = graph();
        let layout_cfg = LayoutConfig::default();
        let blur = g
            .create_child(g.root(), reg.get("blurFx").unwrap(), "blur", (0, 0))
            .unwrap();
        let report = satisfy_min_inputs(
            &mut g,
            &reg,
            blur,
            &["/nowhere".to_string()],
            &layout_cfg,
        )
        .unwrap();
        assert!(!report.complete());
        assert!(report.unsatisfied[0].reason.contains("/nowhere"));
        assert_eq!(g.node(blur).unwrap().connected_inputs(), 0);
    }
}
