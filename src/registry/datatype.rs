// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::RegistryError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// JSON value kind that every value of a datatype must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Any,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl ValueKind {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ValueKind::Any => true,
            ValueKind::Bool => value.is_boolean(),
            ValueKind::Number => value.is_number(),
            ValueKind::String => value.is_string(),
            ValueKind::Array => value.is_array(),
            ValueKind::Object => value.is_object(),
        }
    }
}

/// Formats a bundle can be rendered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Json,
    Yaml,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Json => write!(f, "json"),
            ExportFormat::Yaml => write!(f, "yaml"),
        }
    }
}

/// A registered value type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataType {
    pub id: String,
    pub name: String,
    pub description: String,
    pub kind: ValueKind,
    pub export_formats: Vec<ExportFormat>,
}

impl DataType {
    pub fn new(id: impl Into<String>, kind: ValueKind) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: String::new(),
            kind,
            export_formats: Vec::new(),
        }
    }

    pub fn describe(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.name = name.into();
        self.description = description.into();
        self
    }

    pub fn exportable(mut self, format: ExportFormat) -> Self {
        if !self.export_formats.contains(&format) {
            self.export_formats.push(format);
        }
        self
    }

    pub fn check(&self, value: &Value) -> bool {
        self.kind.matches(value)
    }
}

/// An ordered list of values sharing one datatype; what flows across a wire.
///
/// Once handed to the engine a bundle is shared read-only by every consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    pub datatype: String,
    pub values: Vec<Value>,
}

impl Bundle {
    pub fn new(datatype: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            datatype: datatype.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Render the values in `format`, if `datatype` supports it.
    pub fn export(&self, datatype: &DataType, format: ExportFormat) -> Result<String, RegistryError> {
        if datatype.id != self.datatype {
            return Err(RegistryError::Export {
                datatype: datatype.id.clone(),
                reason: format!("bundle holds '{}' values", self.datatype),
            });
        }
        if !datatype.export_formats.contains(&format) {
            return Err(RegistryError::UnsupportedExport {
                datatype: datatype.id.clone(),
                format: format.to_string(),
            });
        }
        let export_err = |reason: String| RegistryError::Export {
            datatype: datatype.id.clone(),
            reason,
        };
        match format {
            ExportFormat::Json => {
                serde_json::to_string_pretty(&self.values).map_err(|e| export_err(e.to_string()))
            }
            ExportFormat::Yaml => {
                serde_yaml::to_string(&self.values).map_err(|e| export_err(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_kind_matches() {
        let cases = vec![
            (ValueKind::Any, json!(null), true),
            (ValueKind::Number, json!(1.5), true),
            (ValueKind::Number, json!("1.5"), false),
            (ValueKind::String, json!("x"), true),
            (ValueKind::Array, json!([]), true),
            (ValueKind::Object, json!([]), false),
            (ValueKind::Bool, json!(true), true),
        ];
        for (kind, value, expected) in cases {
            assert_eq!(kind.matches(&value), expected, "{:?} vs {}", kind, value);
        }
    }

    #[test]
    fn test_export() {
        let text = DataType::new("text.document", ValueKind::String).exportable(ExportFormat::Json);
        let bundle = Bundle::new("text.document", vec![json!("a"), json!("b")]);

        let json = bundle.export(&text, ExportFormat::Json).unwrap();
        assert_eq!(serde_json::from_str::<Value>(&json).unwrap(), json!(["a", "b"]));

        let err = bundle.export(&text, ExportFormat::Yaml).unwrap_err();
        assert!(matches!(err, RegistryError::UnsupportedExport { .. }));

        let other = DataType::new("text.stats", ValueKind::Object).exportable(ExportFormat::Json);
        assert!(matches!(
            bundle.export(&other, ExportFormat::Json),
            Err(RegistryError::Export { .. })
        ));
    }

    #[test]
    fn test_yaml_export() {
        let dt = DataType::new("n", ValueKind::Number).exportable(ExportFormat::Yaml);
        let yaml = Bundle::new("n", vec![json!(1), json!(2)])
            .export(&dt, ExportFormat::Yaml)
            .unwrap();
        let parsed: Vec<i64> = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, vec![1, 2]);
    }
}
