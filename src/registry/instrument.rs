// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::Template;
use crate::errors::RegistryError;
use crate::observability::messages::validation::UnusedDatatypes;
use crate::observability::messages::StructuredLog;
use crate::registry::datatype::DataType;
use crate::registry::module::{Module, ModuleDefinition};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

/// A namespace of modules, datatypes and stock templates.
///
/// Modules are grouped into menu sections (`"Input"`, `"Reduce"`, ...).
/// Construction fails when a terminal names an undeclared datatype or when two
/// modules share a display name; declared datatypes that no terminal uses only
/// produce a warning.
#[derive(Debug)]
pub struct Instrument {
    pub id: String,
    pub name: String,
    pub menu: Vec<(String, Vec<Arc<Module>>)>,
    pub datatypes: Vec<DataType>,
    pub archive: Option<String>,
    pub templates: BTreeMap<String, Template>,
}

/// Serializable description of an instrument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentDefinition {
    pub id: String,
    pub name: String,
    pub archive: Option<String>,
    pub menu: Vec<(String, Vec<ModuleDefinition>)>,
    pub datatypes: Vec<DataType>,
    pub templates: Vec<String>,
}

impl Instrument {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        menu: Vec<(String, Vec<Module>)>,
        datatypes: Vec<DataType>,
    ) -> Result<Self, RegistryError> {
        let menu = menu
            .into_iter()
            .map(|(group, modules)| (group, modules.into_iter().map(Arc::new).collect()))
            .collect();
        let instrument = Self {
            id: id.into(),
            name: name.into(),
            menu,
            datatypes,
            archive: None,
            templates: BTreeMap::new(),
        };
        instrument.check_datatypes()?;
        instrument.check_names()?;
        Ok(instrument)
    }

    pub fn with_archive(mut self, archive: impl Into<String>) -> Self {
        self.archive = Some(archive.into());
        self
    }

    pub fn with_templates(mut self, templates: BTreeMap<String, Template>) -> Self {
        self.templates = templates;
        self
    }

    /// All modules across menu groups, in menu order.
    pub fn modules(&self) -> impl Iterator<Item = &Arc<Module>> {
        self.menu.iter().flat_map(|(_, modules)| modules.iter())
    }

    /// Look up a module by full id, or by short id within this instrument
    /// (`"load"` resolves to `"<instrument>.load"`).
    pub fn module_by_id(&self, id: &str) -> Result<&Arc<Module>, RegistryError> {
        let full = if id.contains('.') {
            id.to_string()
        } else {
            format!("{}.{}", self.id, id)
        };
        self.modules()
            .find(|m| m.id == full)
            .ok_or_else(|| RegistryError::not_found("module", full))
    }

    pub fn module_by_name(&self, name: &str) -> Result<&Arc<Module>, RegistryError> {
        self.modules()
            .find(|m| m.name == name)
            .ok_or_else(|| RegistryError::not_found("module", name))
    }

    pub fn datatype(&self, id: &str) -> Option<&DataType> {
        self.datatypes.iter().find(|d| d.id == id)
    }

    pub fn definition(&self) -> InstrumentDefinition {
        InstrumentDefinition {
            id: self.id.clone(),
            name: self.name.clone(),
            archive: self.archive.clone(),
            menu: self
                .menu
                .iter()
                .map(|(group, modules)| {
                    (group.clone(), modules.iter().map(|m| m.definition()).collect())
                })
                .collect(),
            datatypes: self.datatypes.clone(),
            templates: self.templates.keys().cloned().collect(),
        }
    }

    fn check_datatypes(&self) -> Result<(), RegistryError> {
        let defined: BTreeSet<&str> = self.datatypes.iter().map(|d| d.id.as_str()).collect();
        let used: BTreeSet<&str> = self
            .modules()
            .flat_map(|m| m.terminals())
            .map(|t| t.datatype.as_str())
            .collect();

        let undefined: Vec<&str> = used.difference(&defined).copied().collect();
        if !undefined.is_empty() {
            return Err(RegistryError::InvalidInstrument {
                instrument_id: self.id.clone(),
                reason: format!("undefined datatypes: {}", undefined.join(", ")),
            });
        }

        let unused: Vec<&str> = defined.difference(&used).copied().collect();
        if !unused.is_empty() {
            UnusedDatatypes {
                instrument_id: &self.id,
                datatypes: &unused,
            }
            .log();
        }
        Ok(())
    }

    fn check_names(&self) -> Result<(), RegistryError> {
        let mut names = HashSet::new();
        for module in self.modules() {
            if !names.insert(module.name.as_str()) {
                return Err(RegistryError::InvalidInstrument {
                    instrument_id: self.id.clone(),
                    reason: format!("module name '{}' is not unique", module.name),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::datatype::ValueKind;
    use crate::registry::module::Terminal;
    use crate::traits::ActionOutput;

    fn module(id: &str, name: &str, datatype: &str) -> Module {
        Module::builder(id, "1")
            .name(name)
            .output(Terminal::multiple("output", datatype))
            .action_fn(|_| Ok(ActionOutput::none()))
            .build()
            .unwrap()
    }

    fn datatypes() -> Vec<DataType> {
        vec![
            DataType::new("demo.value", ValueKind::Number),
            DataType::new("demo.unused", ValueKind::Any),
        ]
    }

    #[test]
    fn test_lookup_by_short_and_full_id() {
        let instrument = Instrument::new(
            "demo",
            "Demo",
            vec![("Input".to_string(), vec![module("demo.load", "Load", "demo.value")])],
            datatypes(),
        )
        .unwrap();

        assert_eq!(instrument.module_by_id("load").unwrap().id, "demo.load");
        assert_eq!(instrument.module_by_id("demo.load").unwrap().id, "demo.load");
        assert_eq!(instrument.module_by_name("Load").unwrap().id, "demo.load");
        assert!(matches!(
            instrument.module_by_id("save"),
            Err(RegistryError::NotFound { .. })
        ));
    }

    #[test]
    fn test_undefined_datatype_is_an_error() {
        let err = Instrument::new(
            "demo",
            "Demo",
            vec![("Input".to_string(), vec![module("demo.load", "Load", "demo.missing")])],
            datatypes(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("demo.missing"));
    }

    #[test]
    fn test_module_names_must_be_unique() {
        let err = Instrument::new(
            "demo",
            "Demo",
            vec![
                ("Input".to_string(), vec![module("demo.a", "Same", "demo.value")]),
                ("Reduce".to_string(), vec![module("demo.b", "Same", "demo.value")]),
            ],
            datatypes(),
        )
        .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidInstrument { .. }));
    }

    #[test]
    fn test_definition_lists_menu_and_templates() {
        let mut templates = BTreeMap::new();
        templates.insert("basic".to_string(), Template::new("basic", "demo"));
        let instrument = Instrument::new(
            "demo",
            "Demo",
            vec![("Input".to_string(), vec![module("demo.load", "Load", "demo.value")])],
            datatypes(),
        )
        .unwrap()
        .with_archive("file:///data")
        .with_templates(templates);

        let definition = instrument.definition();
        assert_eq!(definition.menu[0].0, "Input");
        assert_eq!(definition.menu[0].1[0].id, "demo.load");
        assert_eq!(definition.templates, vec!["basic".to_string()]);
        assert_eq!(definition.archive.as_deref(), Some("file:///data"));
    }
}
