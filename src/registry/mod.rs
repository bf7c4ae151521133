// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Module, datatype and instrument registry.
//!
//! The registry is populated once at start-up, wrapped in an `Arc` and shared
//! read-only by every evaluation. Registering an id twice is a no-op when the
//! definitions are identical and a [`RegistryError::Conflict`] otherwise.
//!
//! ```text
//! Instrument ──register_instrument──► Registry ──Arc──► Engine
//!   ├─ datatypes                        ├─ modules     (id -> Arc<Module>)
//!   └─ menu (modules)                   ├─ datatypes   (id -> DataType)
//!                                       └─ instruments (id -> Arc<Instrument>)
//! ```

pub mod datatype;
pub mod instrument;
pub mod module;

pub use datatype::{Bundle, DataType, ExportFormat, ValueKind};
pub use instrument::{Instrument, InstrumentDefinition};
pub use module::{Arity, Module, ModuleBuilder, ModuleDefinition, ParamKind, Parameter, Terminal};

use crate::errors::RegistryError;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct Registry {
    modules: HashMap<String, Arc<Module>>,
    datatypes: HashMap<String, DataType>,
    instruments: BTreeMap<String, Arc<Instrument>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_module(&mut self, module: Module) -> Result<(), RegistryError> {
        self.insert_module(Arc::new(module))
    }

    pub fn lookup_module(&self, id: &str) -> Result<Arc<Module>, RegistryError> {
        self.modules
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::not_found("module", id))
    }

    pub fn register_datatype(&mut self, datatype: DataType) -> Result<(), RegistryError> {
        self.check_datatype(&datatype)?;
        self.datatypes.entry(datatype.id.clone()).or_insert(datatype);
        Ok(())
    }

    pub fn lookup_datatype(&self, id: &str) -> Result<&DataType, RegistryError> {
        self.datatypes
            .get(id)
            .ok_or_else(|| RegistryError::not_found("datatype", id))
    }

    /// Register an instrument together with all of its datatypes and modules.
    ///
    /// Every conflict is checked before anything is inserted, so a failed
    /// registration leaves the registry unchanged.
    pub fn register_instrument(&mut self, instrument: Instrument) -> Result<(), RegistryError> {
        if let Some(existing) = self.instruments.get(&instrument.id) {
            if existing.definition() != instrument.definition() {
                return Err(RegistryError::conflict("instrument", &instrument.id));
            }
            return Ok(());
        }
        for datatype in &instrument.datatypes {
            self.check_datatype(datatype)?;
        }
        for module in instrument.modules() {
            self.check_module(module)?;
        }

        for datatype in &instrument.datatypes {
            self.datatypes
                .entry(datatype.id.clone())
                .or_insert_with(|| datatype.clone());
        }
        for module in instrument.modules() {
            self.modules
                .entry(module.id.clone())
                .or_insert_with(|| module.clone());
        }
        tracing::debug!(
            instrument_id = %instrument.id,
            modules = instrument.modules().count(),
            "registered instrument"
        );
        self.instruments
            .insert(instrument.id.clone(), Arc::new(instrument));
        Ok(())
    }

    pub fn lookup_instrument(&self, id: &str) -> Result<Arc<Instrument>, RegistryError> {
        self.instruments
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::not_found("instrument", id))
    }

    /// Registered instrument ids, sorted.
    pub fn list_instruments(&self) -> Vec<&str> {
        self.instruments.keys().map(String::as_str).collect()
    }

    fn insert_module(&mut self, module: Arc<Module>) -> Result<(), RegistryError> {
        self.check_module(&module)?;
        self.modules.entry(module.id.clone()).or_insert(module);
        Ok(())
    }

    fn check_module(&self, module: &Module) -> Result<(), RegistryError> {
        match self.modules.get(&module.id) {
            Some(existing) if existing.definition() != module.definition() => {
                Err(RegistryError::conflict("module", &module.id))
            }
            _ => Ok(()),
        }
    }

    fn check_datatype(&self, datatype: &DataType) -> Result<(), RegistryError> {
        match self.datatypes.get(&datatype.id) {
            Some(existing) if existing != datatype => {
                Err(RegistryError::conflict("datatype", &datatype.id))
            }
            _ => Ok(()),
        }
    }
}
