//! The live scene graph
//!
//! `SceneGraph` owns every node, the path index, the protected-path set,
//! and the bounded connection audit log. It is touched exclusively by the
//! mutation thread; nothing here is synchronized.

use super::node::{Node, NodeId};
use crate::constants;
use crate::error::EngineError;
use crate::types::{Family, TypeDescriptor};
use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

/// Why a connection was made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WireReason {
    /// The caller named the source
    Explicit,
    /// Same-family recency heuristic
    Auto,
    /// Scored candidate selection
    Scored,
    /// Synthesized fallback source for a required input
    Fallback,
}

/// One entry in the append-only connection audit log
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionRecord {
    pub source: String,
    pub target: String,
    pub slot: usize,
    pub reason: WireReason,
    pub at: DateTime<Utc>,
}

/// Normalize a node path: trim, ensure a single leading slash, no
/// trailing slash (except the root itself)
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let mut norm = if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    };
    while norm.len() > 1 && norm.ends_with('/') {
        norm.pop();
    }
    norm
}

/// The node graph owned by the mutation thread
pub struct SceneGraph {
    nodes: HashMap<NodeId, Node>,
    paths: HashMap<String, NodeId>,
    root: NodeId,
    next_id: NodeId,
    records: VecDeque<ConnectionRecord>,
    protected: HashSet<String>,
}

impl SceneGraph {
    /// Create a graph holding only the root container
    pub fn new(root_descriptor: Arc<TypeDescriptor>) -> Self {
        let root = Node::new(0, "", "/", root_descriptor, None, (0, 0));
        let mut paths = HashMap::new();
        paths.insert("/".to_string(), 0);
        let mut nodes = HashMap::new();
        nodes.insert(0, root);
        Self {
            nodes,
            paths,
            root: 0,
            next_id: 1,
            records: VecDeque::new(),
            protected: HashSet::new(),
        }
    }

    /// Root container id
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Total live nodes, root included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// Resolve a path string to a live node id
    pub fn resolve_path(&self, path: &str) -> Result<NodeId, EngineError> {
        let norm = normalize_path(path);
        self.paths
            .get(&norm)
            .copied()
            .filter(|id| self.nodes.get(id).map(|n| n.valid).unwrap_or(false))
            .ok_or_else(|| EngineError::InvalidPath(path.to_string()))
    }

    /// True when the path is already taken
    pub fn path_exists(&self, path: &str) -> bool {
        self.paths.contains_key(&normalize_path(path))
    }

    /// Children of `parent` in creation order
    pub fn children_of(&self, parent: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(&parent)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// Valid children of `parent` belonging to `family`, in creation order
    pub fn siblings_of_family(
        &self,
        parent: NodeId,
        family: Family,
        exclude: Option<NodeId>,
    ) -> Vec<NodeId> {
        self.children_of(parent)
            .into_iter()
            .filter(|id| Some(*id) != exclude)
            .filter(|id| {
                self.nodes
                    .get(id)
                    .map(|n| n.valid && n.family() == family)
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Positions already used by valid children of `parent`.
    ///
    /// Invariant the layout planner maintains: no two valid siblings under
    /// one parent share a position (best effort under the retry budget).
    pub fn occupied_positions(&self, parent: NodeId) -> HashSet<(i32, i32)> {
        self.children_of(parent)
            .into_iter()
            .filter_map(|id| self.nodes.get(&id))
            .filter(|n| n.valid)
            .map(|n| n.position)
            .collect()
    }

    /// Number of input slots across the graph fed by `id`
    pub fn consumer_count(&self, id: NodeId) -> usize {
        self.nodes
            .values()
            .flat_map(|n| n.inputs.iter())
            .filter(|slot| **slot == Some(id))
            .count()
    }

    /// First name of the form `baseN` not taken under `parent`
    pub fn unique_child_name(&self, parent: NodeId, base: &str) -> String {
        let parent_path = self
            .nodes
            .get(&parent)
            .map(|n| n.path.clone())
            .unwrap_or_else(|| "/".to_string());
        let mut i = 1usize;
        loop {
            let name = format!("{base}{i}");
            if !self.path_exists(&child_path(&parent_path, &name)) {
                return name;
            }
            i += 1;
        }
    }

    /// Create a node under `parent`.
    ///
    /// The name must be unique among siblings; only container-family nodes
    /// (and the root) may own children.
    pub fn create_child(
        &mut self,
        parent: NodeId,
        descriptor: Arc<TypeDescriptor>,
        name: &str,
        position: (i32, i32),
    ) -> Result<NodeId, EngineError> {
        let parent_node = self
            .nodes
            .get(&parent)
            .filter(|n| n.valid)
            .ok_or_else(|| EngineError::InvalidPath(format!("#{parent}")))?;
        if parent != self.root && parent_node.family() != Family::Container {
            return Err(EngineError::InvalidArguments(format!(
                "{} is not a container",
                parent_node.path
            )));
        }
        if name.is_empty() || name.contains('/') {
            return Err(EngineError::InvalidArguments(format!(
                "bad node name '{name}'"
            )));
        }
        let path = child_path(&parent_node.path, name);
        if self.path_exists(&path) {
            return Err(EngineError::InvalidArguments(format!(
                "'{path}' already exists"
            )));
        }

        let id = self.next_id;
        self.next_id += 1;
        let node = Node::new(id, name, path.clone(), descriptor, Some(parent), position);
        self.nodes.insert(id, node);
        self.paths.insert(path, id);
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.push(id);
        }
        Ok(id)
    }

    /// Destroy a node and its whole subtree. Returns (name, parent path).
    ///
    /// Refuses when the target is protected or owns a protected descendant.
    pub fn destroy(&mut self, id: NodeId) -> Result<(String, String), EngineError> {
        let node = self
            .nodes
            .get(&id)
            .filter(|n| n.valid)
            .ok_or_else(|| EngineError::InvalidPath(format!("#{id}")))?;
        if id == self.root {
            return Err(EngineError::Protected("/".to_string()));
        }
        if self.is_protected(&node.path) {
            return Err(EngineError::Protected(node.path.clone()));
        }
        let name = node.name.clone();
        let parent = node.parent;
        let parent_path = parent
            .and_then(|p| self.nodes.get(&p))
            .map(|n| n.path.clone())
            .unwrap_or_default();

        // Collect the subtree, children first is not required: invalidate,
        // unindex, then drop references from remaining input slots.
        let mut doomed = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(n) = self.nodes.get(&current) {
                stack.extend(n.children.iter().copied());
                doomed.push(current);
            }
        }
        let doomed_set: HashSet<NodeId> = doomed.iter().copied().collect();
        for current in &doomed {
            if let Some(n) = self.nodes.get_mut(current) {
                n.valid = false;
                self.paths.remove(&n.path);
            }
        }
        for n in self.nodes.values_mut() {
            for slot in n.inputs.iter_mut() {
                if slot.map_or(false, |src| doomed_set.contains(&src)) {
                    *slot = None;
                }
            }
        }
        for current in &doomed {
            self.nodes.remove(current);
        }
        if let Some(p) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            p.children.retain(|c| *c != id);
        }
        debug!("destroyed {} node(s) under {}", doomed.len(), parent_path);
        Ok((name, parent_path))
    }

    /// Rename a node, re-pathing its whole subtree. Returns the new path.
    pub fn rename(&mut self, id: NodeId, new_name: &str) -> Result<String, EngineError> {
        if new_name.is_empty() || new_name.contains('/') {
            return Err(EngineError::InvalidArguments(format!(
                "bad node name '{new_name}'"
            )));
        }
        let node = self
            .nodes
            .get(&id)
            .filter(|n| n.valid)
            .ok_or_else(|| EngineError::InvalidPath(format!("#{id}")))?;
        if node.parent.is_none() {
            return Err(EngineError::Protected("/".to_string()));
        }
        let parent_path = node
            .parent
            .and_then(|p| self.nodes.get(&p))
            .map(|n| n.path.clone())
            .unwrap_or_default();
        let new_path = child_path(&parent_path, new_name);
        if node.path != new_path && self.path_exists(&new_path) {
            return Err(EngineError::InvalidArguments(format!(
                "'{new_path}' already exists"
            )));
        }

        if let Some(n) = self.nodes.get_mut(&id) {
            n.name = new_name.to_string();
        }
        self.repath(id, &parent_path);
        Ok(new_path)
    }

    fn repath(&mut self, id: NodeId, parent_path: &str) {
        let (old_path, name, children) = match self.nodes.get(&id) {
            Some(n) => (n.path.clone(), n.name.clone(), n.children.clone()),
            None => return,
        };
        let new_path = child_path(parent_path, &name);
        self.paths.remove(&old_path);
        self.paths.insert(new_path.clone(), id);
        if let Some(n) = self.nodes.get_mut(&id) {
            n.path = new_path.clone();
        }
        for child in children {
            self.repath(child, &new_path);
        }
    }

    /// Connect `source`'s output into `target`'s input `slot` and log it
    pub fn connect(
        &mut self,
        source: NodeId,
        target: NodeId,
        slot: usize,
        reason: WireReason,
    ) -> Result<(), EngineError> {
        if source == target {
            return Err(EngineError::ConnectionFailed(
                "cannot connect a node to itself".to_string(),
            ));
        }
        let source_path = self
            .nodes
            .get(&source)
            .filter(|n| n.valid)
            .map(|n| n.path.clone())
            .ok_or_else(|| EngineError::ConnectionFailed(format!("source #{source} is gone")))?;
        let target_path = {
            let target_node = self
                .nodes
                .get_mut(&target)
                .filter(|n| n.valid)
                .ok_or_else(|| EngineError::ConnectionFailed(format!("target #{target} is gone")))?;
            target_node.set_input(slot, Some(source));
            target_node.path.clone()
        };
        self.push_record(ConnectionRecord {
            source: source_path,
            target: target_path,
            slot,
            reason,
            at: Utc::now(),
        });
        Ok(())
    }

    /// Clear one slot, or every slot when `slot` is `None`.
    /// Returns the indices actually cleared.
    pub fn disconnect(&mut self, target: NodeId, slot: Option<usize>) -> Vec<usize> {
        let mut cleared = Vec::new();
        if let Some(node) = self.nodes.get_mut(&target) {
            match slot {
                Some(index) => {
                    if node.input(index).is_some() {
                        node.set_input(index, None);
                        cleared.push(index);
                    }
                }
                None => {
                    for (index, slot) in node.inputs.iter_mut().enumerate() {
                        if slot.take().is_some() {
                            cleared.push(index);
                        }
                    }
                }
            }
        }
        cleared
    }

    /// Mark a path (and thereby its ancestors) as protected from deletion
    pub fn protect(&mut self, path: &str) {
        let norm = normalize_path(path);
        if !norm.is_empty() {
            self.protected.insert(norm);
        }
    }

    /// A path is protected when it is marked itself or when a protected
    /// node lives somewhere beneath it
    pub fn is_protected(&self, path: &str) -> bool {
        let norm = normalize_path(path);
        if norm.is_empty() {
            return false;
        }
        self.protected.iter().any(|p| {
            *p == norm || p.starts_with(&format!("{}/", norm.trim_end_matches('/')))
        })
    }

    fn push_record(&mut self, record: ConnectionRecord) {
        if self.records.len() >= constants::graph::CONNECTION_LOG_CAP {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Most recent connection records, newest last
    pub fn history(&self, limit: usize) -> Vec<&ConnectionRecord> {
        let skip = self.records.len().saturating_sub(limit);
        self.records.iter().skip(skip).collect()
    }
}

fn child_path(parent_path: &str, name: &str) -> String {
    if parent_path == "/" {
        format!("/{name}")
    } else {
        format!("{parent_path}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeRegistry;

    fn graph() -> (SceneGraph, TypeRegistry) {
        let registry = TypeRegistry::builtin();
        let root = registry.get("baseComp").unwrap();
        (SceneGraph::new(root), registry)
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("project/blur1"), "/project/blur1");
        assert_eq!(normalize_path("/project/blur1/"), "/project/blur1");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path("  "), "");
    }

    #[test]
    fn test_create_and_resolve() {
        let (mut g, reg) = graph();
        let desc = reg.get("containerComp").unwrap();
        let project = g.create_child(g.root(), desc, "project", (0, 0)).unwrap();
        assert_eq!(g.node(project).unwrap().path, "/project");
        assert_eq!(g.resolve_path("project").unwrap(), project);
        assert_eq!(g.resolve_path("/project/").unwrap(), project);
        assert!(g.resolve_path("/nope").is_err());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let (mut g, reg) = graph();
        let desc = reg.get("containerComp").unwrap();
        g.create_child(g.root(), desc.clone(), "a", (0, 0)).unwrap();
        assert!(matches!(
            g.create_child(g.root(), desc, "a", (10, 10)),
            Err(EngineError::InvalidArguments(_))
        ));
    }

    #[test]
    fn test_non_container_cannot_own_children() {
        let (mut g, reg) = graph();
        let blur = g
            .create_child(g.root(), reg.get("blurFx").unwrap(), "blur1", (0, 0))
            .unwrap();
        assert!(g
            .create_child(blur, reg.get("noiseFx").unwrap(), "noise1", (0, 0))
            .is_err());
    }

    #[test]
    fn test_unique_child_name() {
        let (mut g, reg) = graph();
        let desc = reg.get("noiseFx").unwrap();
        assert_eq!(g.unique_child_name(g.root(), "noise"), "noise1");
        g.create_child(g.root(), desc.clone(), "noise1", (0, 0)).unwrap();
        assert_eq!(g.unique_child_name(g.root(), "noise"), "noise2");
    }

    #[test]
    fn test_destroy_cascades_and_clears_slots() {
        let (mut g, reg) = graph();
        let container = g
            .create_child(g.root(), reg.get("containerComp").unwrap(), "box", (0, 0))
            .unwrap();
        let inner = g
            .create_child(container, reg.get("noiseFx").unwrap(), "noise1", (0, 0))
            .unwrap();
        let blur = g
            .create_child(g.root(), reg.get("blurFx").unwrap(), "blur1", (220, 0))
            .unwrap();
        g.connect(inner, blur, 0, WireReason::Explicit).unwrap();

        g.destroy(container).unwrap();
        assert!(g.resolve_path("/box").is_err());
        assert!(g.resolve_path("/box/noise1").is_err());
        assert_eq!(g.node(blur).unwrap().input(0), None);
        assert_eq!(g.children_of(g.root()), vec![blur]);
    }

    #[test]
    fn test_protected_paths_cover_ancestors() {
        let (mut g, reg) = graph();
        let container = g
            .create_child(g.root(), reg.get("containerComp").unwrap(), "sys", (0, 0))
            .unwrap();
        let inner = g
            .create_child(container, reg.get("textDat").unwrap(), "control", (0, 0))
            .unwrap();
        g.protect("/sys/control");

        assert!(matches!(g.destroy(inner), Err(EngineError::Protected(_))));
        assert!(matches!(g.destroy(container), Err(EngineError::Protected(_))));
        assert!(g.is_protected("/sys"));
        assert!(!g.is_protected("/sysother"));
    }

    #[test]
    fn test_rename_repaths_subtree() {
        let (mut g, reg) = graph();
        let container = g
            .create_child(g.root(), reg.get("containerComp").unwrap(), "old", (0, 0))
            .unwrap();
        let inner = g
            .create_child(container, reg.get("noiseFx").unwrap(), "noise1", (0, 0))
            .unwrap();
        let new_path = g.rename(container, "fresh").unwrap();
        assert_eq!(new_path, "/fresh");
        assert_eq!(g.node(inner).unwrap().path, "/fresh/noise1");
        assert_eq!(g.resolve_path("/fresh/noise1").unwrap(), inner);
        assert!(g.resolve_path("/old").is_err());
    }

    #[test]
    fn test_connection_log_is_bounded() {
        let (mut g, reg) = graph();
        let a = g
            .create_child(g.root(), reg.get("noiseFx").unwrap(), "a", (0, 0))
            .unwrap();
        let b = g
            .create_child(g.root(), reg.get("blurFx").unwrap(), "b", (220, 0))
            .unwrap();
        for _ in 0..(constants::graph::CONNECTION_LOG_CAP + 25) {
            g.connect(a, b, 0, WireReason::Auto).unwrap();
        }
        assert_eq!(
            g.history(usize::MAX).len(),
            constants::graph::CONNECTION_LOG_CAP
        );
    }

    #[test]
    fn test_self_connection_rejected() {
        let (mut g, reg) = graph();
        let a = g
            .create_child(g.root(), reg.get("blurFx").unwrap(), "a", (0, 0))
            .unwrap();
        assert!(matches!(
            g.connect(a, a, 0, WireReason::Explicit),
            Err(EngineError::ConnectionFailed(_))
        ));
    }
}
