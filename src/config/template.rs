// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The graph model: templates, wires and run-time configuration.
//!
//! A [`Template`] is an ordered list of nodes, each an instance of a registered
//! module, plus the wires connecting an output terminal of one node to an input
//! terminal of another. Nodes are addressed by their index in `modules`.
//!
//! # Definition format
//! ```json
//! {
//!   "name": "reduce",
//!   "description": "",
//!   "instrument": "text",
//!   "version": "1.0",
//!   "modules": [
//!     {"module": "text.load", "config": {"files": ["a.txt"]}, "position": [10, 20]},
//!     {"module": "text.case", "config": {"mode": "upper"}}
//!   ],
//!   "wires": [
//!     {"source": [0, "output"], "target": [1, "input"]}
//!   ]
//! }
//! ```

use crate::config::consts::TEMPLATE_VERSION;
use crate::config::dependency_graph::DependencyGraph;
use crate::config::loader::{read_structured, FileFormat};
use crate::errors::{ConfigError, CycleError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Index of a node within its template.
pub type NodeId = usize;

/// A `(node, terminal)` pair, displayed and parsed as `node:terminal`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TerminalRef {
    pub node: NodeId,
    pub terminal: String,
}

impl TerminalRef {
    pub fn new(node: NodeId, terminal: impl Into<String>) -> Self {
        Self {
            node,
            terminal: terminal.into(),
        }
    }
}

impl fmt::Display for TerminalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.node, self.terminal)
    }
}

impl FromStr for TerminalRef {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidTerminalRef {
            value: s.to_string(),
        };
        let (node, terminal) = s.split_once(':').ok_or_else(invalid)?;
        let node = node.trim().parse::<NodeId>().map_err(|_| invalid())?;
        let terminal = terminal.trim();
        if terminal.is_empty() {
            return Err(invalid());
        }
        Ok(TerminalRef::new(node, terminal))
    }
}

/// One node of a template: a module reference plus its stored parameter values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateNode {
    pub module: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub config: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Fields the engine does not interpret; kept so definitions round-trip.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TemplateNode {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            version: None,
            config: Map::new(),
            position: None,
            title: None,
            extra: Map::new(),
        }
    }

    /// Store a parameter value on the node.
    pub fn with(mut self, field: impl Into<String>, value: Value) -> Self {
        self.config.insert(field.into(), value);
        self
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Some([x, y]);
        self
    }
}

/// A directed edge from `source = (node, output terminal)` to `target = (node, input terminal)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wire {
    pub source: (NodeId, String),
    pub target: (NodeId, String),
}

impl Wire {
    pub fn new(
        source: NodeId,
        source_terminal: impl Into<String>,
        target: NodeId,
        target_terminal: impl Into<String>,
    ) -> Self {
        Self {
            source: (source, source_terminal.into()),
            target: (target, target_terminal.into()),
        }
    }

    pub fn source_node(&self) -> NodeId {
        self.source.0
    }

    pub fn source_terminal(&self) -> &str {
        &self.source.1
    }

    pub fn target_node(&self) -> NodeId {
        self.target.0
    }

    pub fn target_terminal(&self) -> &str {
        &self.target.1
    }
}

fn default_version() -> String {
    TEMPLATE_VERSION.to_string()
}

/// A workflow definition. Read-only while it is being evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub instrument: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub modules: Vec<TemplateNode>,
    #[serde(default)]
    pub wires: Vec<Wire>,
}

impl Template {
    pub fn new(name: impl Into<String>, instrument: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            instrument: instrument.into(),
            version: default_version(),
            modules: Vec::new(),
            wires: Vec::new(),
        }
    }

    /// Append a node and return its index.
    pub fn add_node(&mut self, node: TemplateNode) -> NodeId {
        self.modules.push(node);
        self.modules.len() - 1
    }

    /// Append a wire from `source:source_terminal` to `target:target_terminal`.
    pub fn connect(
        &mut self,
        source: NodeId,
        source_terminal: &str,
        target: NodeId,
        target_terminal: &str,
    ) -> &mut Self {
        self.wires
            .push(Wire::new(source, source_terminal, target, target_terminal));
        self
    }

    pub fn node(&self, node: NodeId) -> Option<&TemplateNode> {
        self.modules.get(node)
    }

    /// All wires ending at `node`, in declaration order.
    pub fn input_wires(&self, node: NodeId) -> Vec<&Wire> {
        self.wires
            .iter()
            .filter(|w| w.target_node() == node)
            .collect()
    }

    pub fn graph(&self) -> DependencyGraph {
        DependencyGraph::from_template(self)
    }

    /// Nodes in dependency order, optionally restricted to the ancestors of `target`.
    pub fn order(&self, target: Option<NodeId>) -> Result<Vec<NodeId>, CycleError> {
        self.graph().processing_order(target)
    }

    /// Evaluation order paired with each node's inbound wires.
    pub fn ordered(&self, target: Option<NodeId>) -> Result<Vec<(NodeId, Vec<&Wire>)>, CycleError> {
        Ok(self
            .order(target)?
            .into_iter()
            .map(|node| (node, self.input_wires(node)))
            .collect())
    }

    /// `node` plus everything transitively downstream of it.
    pub fn dependents(&self, node: NodeId) -> BTreeSet<NodeId> {
        self.graph().dependents(node)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json_str(contents: &str) -> Result<Self, ConfigError> {
        Self::parse(Path::new("<inline>.json"), contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        Self::parse(Path::new("<inline>.yaml"), contents)
    }

    /// Load a template definition from a JSON or YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let template: Template = read_structured(path.as_ref())?;
        template.check_version()?;
        Ok(template)
    }

    fn parse(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        let template: Template = FileFormat::from_path(path)?.parse(path, contents)?;
        template.check_version()?;
        Ok(template)
    }

    fn check_version(&self) -> Result<(), ConfigError> {
        if self.version != TEMPLATE_VERSION {
            return Err(ConfigError::UnsupportedTemplateVersion {
                found: self.version.clone(),
                expected: TEMPLATE_VERSION.to_string(),
            });
        }
        Ok(())
    }
}

/// Read every `<instrument>.<name>.json` file in `dir` into a `name -> Template` map.
///
/// Files for other instruments and non-JSON files are skipped.
pub fn load_templates<P: AsRef<Path>>(
    dir: P,
    instrument: &str,
) -> Result<BTreeMap<String, Template>, ConfigError> {
    let dir = dir.as_ref();
    let io_err = |source| ConfigError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let prefix = format!("{}.", instrument);

    let mut templates = BTreeMap::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(name) = file_name
            .strip_prefix(&prefix)
            .and_then(|rest| rest.strip_suffix(".json"))
        else {
            continue;
        };
        if name.is_empty() {
            continue;
        }
        templates.insert(name.to_string(), Template::load(&path)?);
    }
    Ok(templates)
}

/// Run-time parameter overrides: node index (as a string) to `{field: value}`.
///
/// Applied on top of the template's stored values and the module defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunConfig(pub BTreeMap<String, Map<String, Value>>);

impl RunConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_node(&self, node: NodeId) -> Option<&Map<String, Value>> {
        self.0.get(&node.to_string())
    }

    pub fn set(&mut self, node: NodeId, field: impl Into<String>, value: Value) -> &mut Self {
        self.0
            .entry(node.to_string())
            .or_default()
            .insert(field.into(), value);
        self
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        read_structured(path.as_ref())
    }
}

impl From<BTreeMap<String, Map<String, Value>>> for RunConfig {
    fn from(map: BTreeMap<String, Map<String, Value>>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_terminal_ref_parse() {
        let cases = vec![
            ("3:output", Some(TerminalRef::new(3, "output"))),
            (" 0 : input ", Some(TerminalRef::new(0, "input"))),
            ("x:output", None),
            ("3", None),
            ("3:", None),
        ];

        for (text, expected) in cases {
            assert_eq!(text.parse::<TerminalRef>().ok(), expected, "parsing {:?}", text);
        }
        assert_eq!(TerminalRef::new(2, "output").to_string(), "2:output");
    }

    #[test]
    fn test_definition_format_parses() {
        let template = Template::from_json_str(
            r#"{
                "name": "t",
                "instrument": "text",
                "version": "1.0",
                "modules": [
                    {"module": "text.load", "config": {"files": ["a"]}, "position": [1, 2], "x": 5},
                    {"module": "text.case"}
                ],
                "wires": [{"source": [0, "output"], "target": [1, "input"]}]
            }"#,
        )
        .unwrap();

        assert_eq!(template.modules.len(), 2);
        assert_eq!(template.modules[0].config.get("files"), Some(&json!(["a"])));
        assert_eq!(template.modules[0].position, Some([1.0, 2.0]));
        assert_eq!(template.modules[0].extra.get("x"), Some(&json!(5)));
        assert_eq!(template.wires[0], Wire::new(0, "output", 1, "input"));
    }

    #[test]
    fn test_version_is_checked() {
        let err = Template::from_json_str(r#"{"name": "t", "version": "2.0"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedTemplateVersion { .. }));

        let template = Template::from_yaml_str("name: t\n").unwrap();
        assert_eq!(template.version, TEMPLATE_VERSION);
    }

    #[test]
    fn test_json_round_trip_keeps_unknown_fields() {
        let mut template = Template::new("t", "text");
        let mut node = TemplateNode::new("text.case").with("mode", json!("lower"));
        node.extra.insert("note".to_string(), json!("keep me"));
        template.add_node(node);

        let reparsed = Template::from_json_str(&template.to_json().unwrap()).unwrap();
        assert_eq!(reparsed, template);
    }

    #[test]
    fn test_input_wires_keep_declaration_order() {
        let mut template = Template::new("t", "test");
        for _ in 0..3 {
            template.add_node(TemplateNode::new("test.load"));
        }
        template
            .connect(1, "output", 2, "input")
            .connect(0, "output", 2, "input");

        let sources: Vec<NodeId> = template
            .input_wires(2)
            .iter()
            .map(|w| w.source_node())
            .collect();
        assert_eq!(sources, vec![1, 0]);
        assert!(template.input_wires(0).is_empty());
    }

    #[test]
    fn test_run_config_lookup() {
        let mut config = RunConfig::new();
        config.set(1, "factor", json!(2.0));

        assert_eq!(config.for_node(1).and_then(|m| m.get("factor")), Some(&json!(2.0)));
        assert!(config.for_node(0).is_none());

        let parsed: RunConfig = serde_json::from_str(r#"{"1": {"factor": 2.0}}"#).unwrap();
        assert_eq!(parsed, config);
    }
}
