// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The built-in `text` instrument.
//!
//! | module       | inputs            | outputs           | cacheable |
//! |--------------|-------------------|-------------------|-----------|
//! | `text.load`  | -                 | output (multiple) | no        |
//! | `text.case`  | input (single)    | output (single)   | yes       |
//! | `text.affix` | input (single)    | output (single)   | yes       |
//! | `text.count` | input (single)    | output (single)   | yes       |
//! | `text.join`  | input (multiple)  | output (single)   | yes       |

pub mod actions;

use crate::errors::RegistryError;
use crate::registry::{DataType, ExportFormat, Instrument, Registry, ValueKind};

/// A text document.
pub const DOCUMENT: &str = "text.document";
/// `{chars, words, lines}` statistics of a document.
pub const STATS: &str = "text.stats";

pub fn text_instrument() -> Result<Instrument, RegistryError> {
    let datatypes = vec![
        DataType::new(DOCUMENT, ValueKind::String)
            .describe("Document", "Plain text, one document per value")
            .exportable(ExportFormat::Json)
            .exportable(ExportFormat::Yaml),
        DataType::new(STATS, ValueKind::Object)
            .describe("Statistics", "Character, word and line counts")
            .exportable(ExportFormat::Json),
    ];
    let menu = vec![
        ("Input".to_string(), vec![actions::load::module()?]),
        (
            "Transform".to_string(),
            vec![
                actions::case::module()?,
                actions::affix::module()?,
                actions::join::module()?,
            ],
        ),
        ("Analyze".to_string(), vec![actions::count::module()?]),
    ];
    Instrument::new("text", "Text Processing", menu, datatypes)
}

/// Register every built-in instrument.
pub fn register_builtin(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.register_instrument(text_instrument()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_instrument_registers_everything() {
        let mut registry = Registry::new();
        register_builtin(&mut registry).unwrap();
        // re-registering the same definitions is a no-op
        register_builtin(&mut registry).unwrap();

        for id in ["text.load", "text.case", "text.affix", "text.count", "text.join"] {
            assert!(registry.lookup_module(id).is_ok(), "{} missing", id);
        }
        assert!(!registry.lookup_module("text.load").unwrap().cacheable);
        assert_eq!(registry.lookup_datatype(STATS).unwrap().kind, ValueKind::Object);
        assert_eq!(registry.list_instruments(), vec!["text"]);
    }

    #[test]
    fn test_short_ids_and_names() {
        let instrument = text_instrument().unwrap();
        assert_eq!(instrument.module_by_id("join").unwrap().id, "text.join");
        assert_eq!(instrument.module_by_name("Count Tokens").unwrap().id, "text.count");
        assert_eq!(instrument.modules().count(), 5);
    }
}
