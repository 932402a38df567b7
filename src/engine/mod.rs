//! The graph mutation facade
//!
//! `Engine` owns the scene graph and executes parsed commands against it,
//! one at a time, on the dispatch worker thread. Every command returns a
//! JSON payload; per-item soft failures (an unknown property, a missing
//! wiring candidate) are reported inside the payload instead of failing
//! the whole operation.

use crate::error::EngineError;
use crate::graph::{NodeId, PropertyValue, SceneGraph, WireReason};
use crate::layout::{self, LayoutConfig};
use crate::types::{Family, TypeRegistry};
use crate::wire::{self, WireConfig, WireMode};
use crate::dispatch::command::Command;
use log::{info, warn};
use serde_json::{json, Map, Value};

pub struct Engine {
    graph: SceneGraph,
    registry: TypeRegistry,
    layout: LayoutConfig,
    wire: WireConfig,
}

impl Engine {
    /// Engine over the built-in type catalog with an empty root container
    pub fn new() -> Result<Self, EngineError> {
        Self::with_registry(TypeRegistry::builtin())
    }

    pub fn with_registry(registry: TypeRegistry) -> Result<Self, EngineError> {
        let root = registry
            .get("baseComp")
            .ok_or_else(|| EngineError::UnknownType("baseComp".to_string()))?;
        Ok(Self {
            graph: SceneGraph::new(root),
            registry,
            layout: LayoutConfig::default(),
            wire: WireConfig::default(),
        })
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Mark a path as undeletable
    pub fn protect(&mut self, path: &str) {
        self.graph.protect(path);
    }

    /// Execute one command and produce its result payload
    pub fn execute(&mut self, command: Command) -> Result<Value, EngineError> {
        match command {
            Command::Create {
                label,
                parent,
                name,
                position,
                hint,
                properties,
                wire,
                inputs,
            } => self.create(
                &label,
                &parent,
                name.as_deref(),
                position,
                hint,
                properties,
                wire,
                &inputs,
            ),
            Command::Delete { path } => self.delete(&path),
            Command::Set { path, name, value } => self.set(&path, &name, &value),
            Command::SetMany { path, properties } => self.set_many(&path, properties),
            Command::Connect {
                source,
                target,
                slot,
            } => self.connect(&source, &target, slot),
            Command::ConnectChain { paths } => self.connect_chain(&paths),
            Command::AutoConnect {
                target,
                slot,
                apply,
            } => self.auto_connect(&target, slot, apply),
            Command::Disconnect { target, slot } => self.disconnect(&target, slot),
            Command::Rename { path, name } => self.rename(&path, &name),
            Command::EnsureInputs { path, sources } => self.ensure_inputs(&path, &sources),
            Command::Layout { parent } => self.reflow(&parent),
            Command::List {
                parent,
                recursive,
                family,
            } => self.list(&parent, recursive, family),
            Command::Get { path, property } => self.get(&path, property.as_deref()),
            Command::ListProperties { path } => self.list_properties(&path),
            Command::ListTypes { family, search } => Ok(self.list_types(family, &search)),
            Command::History { limit } => self.history(limit),
            Command::BuildWorkflow { kind, parent } => self.build_workflow(&kind, &parent),
        }
    }

    /// Build one of the starter chains out of plain create steps.
    ///
    /// Each preset is a label sequence; chained presets wire every node to
    /// the one before it through auto mode.
    fn build_workflow(&mut self, kind: &str, parent: &str) -> Result<Value, EngineError> {
        let steps: &[(&str, WireMode)] = match kind.trim().to_lowercase().as_str() {
            "audio" => &[("audioInChan", WireMode::None), ("outChan", WireMode::Auto)],
            "video" => &[
                ("movieInFx", WireMode::None),
                ("levelFx", WireMode::Auto),
                ("outFx", WireMode::Auto),
            ],
            "render" => &[
                ("geometryComp", WireMode::None),
                ("cameraComp", WireMode::None),
                ("lightComp", WireMode::None),
                ("renderFx", WireMode::None),
            ],
            other => {
                return Err(EngineError::InvalidArguments(format!(
                    "unknown workflow '{other}', expected audio, video, or render"
                )))
            }
        };
        let mut created = Vec::new();
        for &(label, wire) in steps {
            let result = self.create(label, parent, None, None, None, Map::new(), wire, &[])?;
            created.push(result["path"].clone());
        }
        info!("built {kind} workflow under {parent}");
        Ok(json!({"workflow": kind, "created": created}))
    }

    #[allow(clippy::too_many_arguments)]
    fn create(
        &mut self,
        label: &str,
        parent_path: &str,
        name: Option<&str>,
        position: Option<(i32, i32)>,
        hint: Option<Family>,
        properties: Map<String, Value>,
        wire_mode: WireMode,
        inputs: &[String],
    ) -> Result<Value, EngineError> {
        let descriptor = self.registry.resolve(label, hint)?;
        let parent = self.graph.resolve_path(parent_path)?;
        let family = descriptor.family;

        let name = match name {
            Some(n) => n.to_string(),
            None => {
                let base = descriptor.base_name().to_lowercase();
                self.graph.unique_child_name(parent, &base)
            }
        };
        // A named first input anchors the new node one column to its right
        let align = inputs
            .first()
            .and_then(|path| self.graph.resolve_path(path).ok());
        let pos = layout::place(&self.graph, parent, family, position, align, &self.layout);
        let node = self
            .graph
            .create_child(parent, descriptor.clone(), &name, pos)?;
        info!("created {} ({})", self.node_path(node), descriptor.name);

        let mut diagnostics = Vec::new();
        self.apply_properties(node, &properties, &mut diagnostics);

        // Explicitly named sources fill slots in order
        let mut connections = Vec::new();
        for (slot, path) in inputs.iter().enumerate() {
            match self.graph.resolve_path(path) {
                Ok(source) => {
                    self.graph
                        .connect(source, node, slot, WireReason::Explicit)?;
                    connections.push(json!({"slot": slot, "source": path}));
                }
                Err(_) => diagnostics.push(format!("input '{path}' not found")),
            }
        }

        match wire_mode {
            WireMode::None => {}
            WireMode::Auto => {
                if self.graph.node(node).map_or(false, |n| n.input(0).is_none()) {
                    match wire::pick_auto_source(&self.graph, parent, node) {
                        Some(source) => {
                            let source_path = self.node_path(source);
                            self.graph.connect(source, node, 0, WireReason::Auto)?;
                            connections.push(json!({"slot": 0, "source": source_path}));
                        }
                        None => diagnostics.push("no auto-wire candidate".to_string()),
                    }
                }
            }
            WireMode::Scored => {
                if self.graph.node(node).map_or(false, |n| n.input(0).is_none()) {
                    let ranked = wire::score_candidates(&self.graph, &self.wire, parent, node);
                    match ranked
                        .first()
                        .filter(|c| c.score >= self.wire.threshold)
                        .cloned()
                    {
                        Some(candidate) => {
                            self.graph
                                .connect(candidate.id, node, 0, WireReason::Scored)?;
                            connections.push(json!({
                                "slot": 0,
                                "source": candidate.path,
                                "score": candidate.score,
                            }));
                        }
                        None if ranked.is_empty() => {
                            diagnostics.push("no wiring candidates".to_string())
                        }
                        None => {
                            // The miss explains itself: every candidate, scored
                            let listing = ranked
                                .iter()
                                .map(|c| format!("{} (score {})", c.path, c.score))
                                .collect::<Vec<_>>()
                                .join(", ");
                            diagnostics.push(format!(
                                "no candidate above score threshold {}: {listing}",
                                self.wire.threshold
                            ));
                        }
                    }
                }
            }
        }

        // Required slots are always satisfied or reported, whatever the mode
        let report =
            wire::satisfy_min_inputs(&mut self.graph, &self.registry, node, &[], &self.layout)?;
        for fill in report.filled {
            connections.push(json!({
                "slot": fill.slot,
                "source": fill.source,
                "created": fill.created,
            }));
        }
        let unsatisfied = report.unsatisfied;

        let n = self
            .graph
            .node(node)
            .ok_or_else(|| EngineError::InvalidPath(format!("#{node}")))?;
        Ok(json!({
            "path": n.path,
            "name": n.name,
            "type": n.type_name(),
            "family": n.family().name(),
            "position": [n.position.0, n.position.1],
            "connections": connections,
            "diagnostics": diagnostics,
            "unsatisfied": unsatisfied,
        }))
    }

    /// Apply a property map to a node, collecting soft failures.
    /// Unknown names never fail the surrounding operation.
    fn apply_properties(
        &mut self,
        id: NodeId,
        properties: &Map<String, Value>,
        diagnostics: &mut Vec<String>,
    ) {
        for (name, value) in properties {
            let Some(node) = self.graph.node_mut(id) else {
                return;
            };
            match node.property_name_ci(name) {
                Some(actual) => {
                    let coerced = node.properties[&actual].coerce_like(value);
                    node.properties.insert(actual, coerced);
                }
                None => diagnostics.push(format!("unknown property '{name}'")),
            }
        }
    }

    fn delete(&mut self, path: &str) -> Result<Value, EngineError> {
        let id = self.graph.resolve_path(path)?;
        let target_path = self.node_path(id);
        let (name, parent) = self.graph.destroy(id)?;
        info!("deleted {target_path}");
        Ok(json!({"deleted": target_path, "name": name, "parent": parent}))
    }

    fn set(&mut self, path: &str, name: &str, value: &Value) -> Result<Value, EngineError> {
        let id = self.graph.resolve_path(path)?;
        let node = self
            .graph
            .node_mut(id)
            .ok_or_else(|| EngineError::InvalidPath(path.to_string()))?;
        let actual = node
            .property_name_ci(name)
            .ok_or_else(|| EngineError::PropertyNotFound {
                path: node.path.clone(),
                name: name.to_string(),
            })?;
        let coerced = node.properties[&actual].coerce_like(value);
        let result = coerced.to_json();
        node.properties.insert(actual.clone(), coerced);
        Ok(json!({"path": node.path, "name": actual, "value": result}))
    }

    fn set_many(
        &mut self,
        path: &str,
        properties: Map<String, Value>,
    ) -> Result<Value, EngineError> {
        let id = self.graph.resolve_path(path)?;
        let mut details = Vec::new();
        let mut updated = 0usize;
        for (name, value) in &properties {
            let node = self
                .graph
                .node_mut(id)
                .ok_or_else(|| EngineError::InvalidPath(path.to_string()))?;
            match node.property_name_ci(name) {
                Some(actual) => {
                    let coerced = node.properties[&actual].coerce_like(value);
                    details.push(json!({
                        "name": actual,
                        "status": "updated",
                        "value": coerced.to_json(),
                    }));
                    node.properties.insert(actual, coerced);
                    updated += 1;
                }
                None => {
                    warn!("{}: no property '{}'", node.path, name);
                    details.push(json!({"name": name, "status": "unknown"}));
                }
            }
        }
        Ok(json!({
            "path": self.node_path(id),
            "updated": updated,
            "details": details,
        }))
    }

    fn connect(&mut self, source: &str, target: &str, slot: usize) -> Result<Value, EngineError> {
        let source_id = self.graph.resolve_path(source)?;
        let target_id = self.graph.resolve_path(target)?;
        self.graph
            .connect(source_id, target_id, slot, WireReason::Explicit)?;
        Ok(json!({
            "source": self.node_path(source_id),
            "target": self.node_path(target_id),
            "slot": slot,
        }))
    }

    fn connect_chain(&mut self, paths: &[String]) -> Result<Value, EngineError> {
        // Resolve everything first so a bad path fails before any wiring
        let ids = paths
            .iter()
            .map(|p| self.graph.resolve_path(p))
            .collect::<Result<Vec<_>, _>>()?;
        let mut links = Vec::new();
        for pair in ids.windows(2) {
            self.graph
                .connect(pair[0], pair[1], 0, WireReason::Explicit)?;
            links.push(json!({
                "source": self.node_path(pair[0]),
                "target": self.node_path(pair[1]),
            }));
        }
        Ok(json!({"links": links}))
    }

    fn auto_connect(&mut self, target: &str, slot: usize, apply: bool) -> Result<Value, EngineError> {
        let id = self.graph.resolve_path(target)?;
        let parent = self
            .graph
            .node(id)
            .and_then(|n| n.parent)
            .ok_or_else(|| EngineError::InvalidArguments("root has no inputs".to_string()))?;
        let candidates = wire::score_candidates(&self.graph, &self.wire, parent, id);
        let mut applied = Value::Null;
        if apply {
            if let Some(best) = candidates
                .first()
                .filter(|c| c.score >= self.wire.threshold)
                .cloned()
            {
                self.graph.connect(best.id, id, slot, WireReason::Scored)?;
                applied = json!({"slot": slot, "source": best.path, "score": best.score});
            }
        }
        Ok(json!({
            "target": self.node_path(id),
            "threshold": self.wire.threshold,
            "candidates": candidates,
            "applied": applied,
        }))
    }

    fn disconnect(&mut self, target: &str, slot: Option<usize>) -> Result<Value, EngineError> {
        let id = self.graph.resolve_path(target)?;
        let cleared = self.graph.disconnect(id, slot);
        Ok(json!({"target": self.node_path(id), "cleared": cleared}))
    }

    fn rename(&mut self, path: &str, name: &str) -> Result<Value, EngineError> {
        let id = self.graph.resolve_path(path)?;
        let new_path = self.graph.rename(id, name)?;
        info!("renamed {path} -> {new_path}");
        Ok(json!({"path": new_path, "name": name}))
    }

    fn ensure_inputs(&mut self, path: &str, sources: &[String]) -> Result<Value, EngineError> {
        let id = self.graph.resolve_path(path)?;
        let report =
            wire::satisfy_min_inputs(&mut self.graph, &self.registry, id, sources, &self.layout)?;
        Ok(json!({
            "path": self.node_path(id),
            "complete": report.complete(),
            "filled": report.filled,
            "unsatisfied": report.unsatisfied,
        }))
    }

    fn reflow(&mut self, parent: &str) -> Result<Value, EngineError> {
        let id = self.graph.resolve_path(parent)?;
        let plan = layout::reflow(&self.graph, id, &self.layout);
        let moved = plan.len();
        for (node, pos) in plan {
            if let Some(n) = self.graph.node_mut(node) {
                n.position = pos;
            }
        }
        Ok(json!({"parent": self.node_path(id), "moved": moved}))
    }

    fn list(
        &self,
        parent: &str,
        recursive: bool,
        family: Option<Family>,
    ) -> Result<Value, EngineError> {
        let id = self.graph.resolve_path(parent)?;
        let mut entries = Vec::new();
        self.collect_entries(id, recursive, family, &mut entries);
        Ok(json!({"parent": self.node_path(id), "nodes": entries}))
    }

    fn collect_entries(
        &self,
        parent: NodeId,
        recursive: bool,
        family: Option<Family>,
        out: &mut Vec<Value>,
    ) {
        for child in self.graph.children_of(parent) {
            if let Some(n) = self.graph.node(child) {
                if family.map_or(true, |want| n.family() == want) {
                    out.push(json!({
                        "path": n.path,
                        "name": n.name,
                        "type": n.type_name(),
                        "family": n.family().name(),
                        "position": [n.position.0, n.position.1],
                        "inputs": n.connected_inputs(),
                        "children": n.children.len(),
                    }));
                }
                if recursive {
                    self.collect_entries(child, true, family, out);
                }
            }
        }
    }

    fn get(&self, path: &str, property: Option<&str>) -> Result<Value, EngineError> {
        let id = self.graph.resolve_path(path)?;
        let n = self
            .graph
            .node(id)
            .ok_or_else(|| EngineError::InvalidPath(path.to_string()))?;
        // A named property narrows the answer to that one value
        if let Some(name) = property {
            let actual = n
                .property_name_ci(name)
                .ok_or_else(|| EngineError::PropertyNotFound {
                    path: n.path.clone(),
                    name: name.to_string(),
                })?;
            return Ok(json!({
                "path": n.path,
                "name": actual,
                "value": n.properties[&actual].to_json(),
            }));
        }
        let inputs: Vec<Value> = n
            .inputs
            .iter()
            .map(|slot| match slot.and_then(|s| self.graph.node(s)) {
                Some(src) => Value::from(src.path.clone()),
                None => Value::Null,
            })
            .collect();
        let children: Vec<&str> = n
            .children
            .iter()
            .filter_map(|c| self.graph.node(*c))
            .map(|c| c.name.as_str())
            .collect();
        let properties: Map<String, Value> = n
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        Ok(json!({
            "path": n.path,
            "name": n.name,
            "type": n.type_name(),
            "family": n.family().name(),
            "position": [n.position.0, n.position.1],
            "inputs": inputs,
            "children": children,
            "properties": properties,
            "consumers": self.graph.consumer_count(id),
        }))
    }

    fn list_properties(&self, path: &str) -> Result<Value, EngineError> {
        let id = self.graph.resolve_path(path)?;
        let n = self
            .graph
            .node(id)
            .ok_or_else(|| EngineError::InvalidPath(path.to_string()))?;
        let listing: Vec<Value> = n
            .properties
            .iter()
            .map(|(name, value)| {
                json!({"name": name, "kind": value.kind(), "value": value.to_json()})
            })
            .collect();
        Ok(json!({"path": n.path, "properties": listing}))
    }

    fn list_types(&self, family: Option<Family>, search: &str) -> Value {
        let grouped = self.registry.names_by_family(family, search);
        let mut out = Map::new();
        for (family, names) in grouped {
            out.insert(family.name().to_string(), json!(names));
        }
        json!({"types": out, "total": self.registry.len()})
    }

    fn history(&self, limit: usize) -> Result<Value, EngineError> {
        let records = self.graph.history(limit);
        Ok(json!({"count": records.len(), "records": records}))
    }

    fn node_path(&self, id: NodeId) -> String {
        self.graph
            .node(id)
            .map(|n| n.path.clone())
            .unwrap_or_default()
    }
}

impl crate::dispatch::CommandExecutor for Engine {
    fn execute(&mut self, command: Command) -> Result<Value, EngineError> {
        Engine::execute(self, command)
    }
}
