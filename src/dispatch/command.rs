//! Command vocabulary and request parsing
//!
//! Every operation the engine performs is a `Command`. Requests arrive as
//! a method name plus a JSON params object; method names are normalized
//! through a small alias table so natural spellings keep working.

use crate::error::EngineError;
use crate::types::Family;
use crate::wire::WireMode;
use serde_json::{Map, Value};

/// Timeout class of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandClass {
    /// Inspects the graph without changing it
    Read,
    /// Changes the graph
    Mutate,
}

/// A fully parsed engine operation
#[derive(Debug, Clone)]
pub enum Command {
    Create {
        label: String,
        parent: String,
        name: Option<String>,
        position: Option<(i32, i32)>,
        hint: Option<Family>,
        properties: Map<String, Value>,
        wire: WireMode,
        inputs: Vec<String>,
    },
    Delete {
        path: String,
    },
    Set {
        path: String,
        name: String,
        value: Value,
    },
    SetMany {
        path: String,
        properties: Map<String, Value>,
    },
    Connect {
        source: String,
        target: String,
        slot: usize,
    },
    ConnectChain {
        paths: Vec<String>,
    },
    AutoConnect {
        target: String,
        slot: usize,
        apply: bool,
    },
    Disconnect {
        target: String,
        slot: Option<usize>,
    },
    Rename {
        path: String,
        name: String,
    },
    EnsureInputs {
        path: String,
        sources: Vec<String>,
    },
    Layout {
        parent: String,
    },
    List {
        parent: String,
        recursive: bool,
        family: Option<Family>,
    },
    Get {
        path: String,
        property: Option<String>,
    },
    ListProperties {
        path: String,
    },
    ListTypes {
        family: Option<Family>,
        search: String,
    },
    History {
        limit: usize,
    },
    BuildWorkflow {
        kind: String,
        parent: String,
    },
}

/// Normalize a method name: lowercase, separators stripped, aliases
/// mapped to the canonical spelling
pub fn canonical_method(method: &str) -> String {
    let token: String = method
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .flat_map(|c| c.to_lowercase())
        .collect();
    let canonical = match token.as_str() {
        "create" | "createnode" | "add" | "addnode" => "create",
        "delete" | "deletenode" | "remove" | "removenode" | "destroy" => "delete",
        "set" | "setproperty" | "setprop" | "setparam" => "set",
        "setmany" | "setproperties" | "updateproperties" => "set_many",
        "connect" | "wire" | "connectnodes" => "connect",
        "connectchain" | "chain" => "connect_chain",
        "autoconnect" | "suggestconnections" | "suggest" => "auto_connect",
        "disconnect" | "unwire" => "disconnect",
        "rename" | "renamenode" => "rename",
        "ensureinputs" | "fixinputs" | "satisfyinputs" => "ensure_inputs",
        "layout" | "arrange" | "reflow" => "layout",
        "list" | "listnodes" | "ls" => "list",
        "get" | "getnode" | "info" | "nodeinfo" => "get",
        "listproperties" | "getproperties" | "props" => "list_properties",
        "listtypes" | "listnodetypes" | "types" => "list_types",
        "history" | "connectionhistory" | "log" => "history",
        "buildworkflow" | "workflow" | "preset" => "build_workflow",
        other => return other.to_string(),
    };
    canonical.to_string()
}

impl Command {
    /// Parse a canonical method name and params object into a command
    pub fn parse(method: &str, params: &Value) -> Result<Command, EngineError> {
        // "create <label>" is shorthand for create with the label as type
        let mut words = method.trim().split_whitespace();
        if let Some(first) = words.next() {
            let rest = words.collect::<Vec<_>>().join(" ");
            if !rest.is_empty()
                && canonical_method(first) == "create"
                && params.get("type").is_none()
            {
                let mut merged = params.as_object().cloned().unwrap_or_default();
                merged.insert("type".to_string(), Value::String(rest));
                return Command::parse("create", &Value::Object(merged));
            }
        }
        let canonical = canonical_method(method);
        match canonical.as_str() {
            "create" => Ok(Command::Create {
                label: require_str(params, "type")?,
                parent: opt_str(params, "parent").unwrap_or_else(|| "/".to_string()),
                name: opt_str(params, "name"),
                position: opt_position(params)?,
                hint: opt_str(params, "family")
                    .as_deref()
                    .and_then(Family::parse_hint),
                properties: opt_object(params, "properties"),
                wire: WireMode::parse(&opt_str(params, "wire").unwrap_or_default())?,
                inputs: opt_str_list(params, "inputs"),
            }),
            "delete" => Ok(Command::Delete {
                path: require_str(params, "path")?,
            }),
            "set" => Ok(Command::Set {
                path: require_str(params, "path")?,
                name: require_str(params, "name")?,
                value: params.get("value").cloned().ok_or_else(|| {
                    EngineError::InvalidArguments("missing 'value'".to_string())
                })?,
            }),
            "set_many" => Ok(Command::SetMany {
                path: require_str(params, "path")?,
                properties: opt_object(params, "properties"),
            }),
            "connect" => Ok(Command::Connect {
                source: require_str(params, "source")?,
                target: require_str(params, "target")?,
                slot: opt_usize(params, "slot")?.unwrap_or(0),
            }),
            "connect_chain" => {
                let paths = opt_str_list(params, "paths");
                if paths.len() < 2 {
                    return Err(EngineError::InvalidArguments(
                        "'paths' needs at least two entries".to_string(),
                    ));
                }
                Ok(Command::ConnectChain { paths })
            }
            "auto_connect" => Ok(Command::AutoConnect {
                target: require_str(params, "target")?,
                slot: opt_usize(params, "slot")?.unwrap_or(0),
                apply: opt_bool(params, "apply").unwrap_or(false),
            }),
            "disconnect" => Ok(Command::Disconnect {
                target: require_str(params, "target")?,
                slot: opt_usize(params, "slot")?,
            }),
            "rename" => Ok(Command::Rename {
                path: require_str(params, "path")?,
                name: require_str(params, "name")?,
            }),
            "ensure_inputs" => Ok(Command::EnsureInputs {
                path: require_str(params, "path")?,
                sources: opt_str_list(params, "sources"),
            }),
            "layout" => Ok(Command::Layout {
                parent: opt_str(params, "parent").unwrap_or_else(|| "/".to_string()),
            }),
            "list" => Ok(Command::List {
                parent: opt_str(params, "parent").unwrap_or_else(|| "/".to_string()),
                recursive: opt_bool(params, "recursive").unwrap_or(false),
                family: opt_str(params, "family")
                    .as_deref()
                    .and_then(Family::parse_hint),
            }),
            "get" => Ok(Command::Get {
                path: require_str(params, "path")?,
                property: opt_str(params, "name"),
            }),
            "list_properties" => Ok(Command::ListProperties {
                path: require_str(params, "path")?,
            }),
            "list_types" => Ok(Command::ListTypes {
                family: opt_str(params, "family")
                    .as_deref()
                    .and_then(Family::parse_hint),
                search: opt_str(params, "search").unwrap_or_default(),
            }),
            "history" => Ok(Command::History {
                limit: opt_usize(params, "limit")?.unwrap_or(20),
            }),
            "build_workflow" => Ok(Command::BuildWorkflow {
                kind: opt_str(params, "kind")
                    .or_else(|| opt_str(params, "name"))
                    .ok_or_else(|| EngineError::InvalidArguments("missing 'kind'".to_string()))?,
                parent: opt_str(params, "parent").unwrap_or_else(|| "/".to_string()),
            }),
            other => Err(EngineError::InvalidArguments(format!(
                "unknown method '{other}'"
            ))),
        }
    }

    /// Timeout class of this command
    pub fn class(&self) -> CommandClass {
        match self {
            Command::List { .. }
            | Command::Get { .. }
            | Command::ListProperties { .. }
            | Command::ListTypes { .. }
            | Command::History { .. } => CommandClass::Read,
            Command::AutoConnect { apply: false, .. } => CommandClass::Read,
            _ => CommandClass::Mutate,
        }
    }
}

fn require_str(params: &Value, key: &str) -> Result<String, EngineError> {
    opt_str(params, key)
        .ok_or_else(|| EngineError::InvalidArguments(format!("missing '{key}'")))
}

fn opt_str(params: &Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(Value::as_str)
        .map(|s| s.to_string())
        .filter(|s| !s.trim().is_empty())
}

fn opt_bool(params: &Value, key: &str) -> Option<bool> {
    params.get(key).and_then(Value::as_bool)
}

fn opt_usize(params: &Value, key: &str) -> Result<Option<usize>, EngineError> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .map(|n| Some(n as usize))
            .ok_or_else(|| EngineError::InvalidArguments(format!("'{key}' must be a non-negative integer"))),
    }
}

fn opt_object(params: &Value, key: &str) -> Map<String, Value> {
    params
        .get(key)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

fn opt_str_list(params: &Value, key: &str) -> Vec<String> {
    params
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(|s| s.to_string())
                .collect()
        })
        .unwrap_or_default()
}

fn opt_position(params: &Value) -> Result<Option<(i32, i32)>, EngineError> {
    let Some(value) = params.get("position") else {
        return Ok(None);
    };
    if value.is_null() {
        return Ok(None);
    }
    let coords = value
        .as_array()
        .filter(|a| a.len() == 2)
        .and_then(|a| Some((a[0].as_f64()?, a[1].as_f64()?)));
    match coords {
        Some((x, y)) => Ok(Some((x as i32, y as i32))),
        None => Err(EngineError::InvalidArguments(
            "'position' must be [x, y]".to_string(),
        )),
    }
}
