//! Schema types and structures
//!
//! A type's schema is a plain data document: an ordered list of field rules,
//! each naming an attribute, its value type, and whether it is mandatory.
//! Schemas are mutable and widen over time through [`crate::evolve`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{MasterDataError, Result};

/// Declared value type of a field.
///
/// Coercion dispatches on this tag; only `Integer` coerces today. New
/// variants slot in here together with a coercion arm in
/// [`crate::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Free-form string values, passed through unchanged
    #[default]
    String,
    /// Integer values, coerced from numbers and numeric strings
    Integer,
}

/// One declared attribute of a type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRule {
    /// Attribute name, the key into record attribute maps
    pub name: String,
    /// Declared value type
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    /// Whether the attribute must be present and non-empty
    #[serde(default)]
    pub mandatory: bool,
    /// Reserved slot for future constraints (regex, ranges). Carried
    /// verbatim, never interpreted.
    #[serde(default)]
    pub validators: Map<String, Value>,
}

impl FieldRule {
    /// Create an optional rule with an empty validators slot
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            mandatory: false,
            validators: Map::new(),
        }
    }

    /// Create a mandatory rule
    pub fn mandatory(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            mandatory: true,
            validators: Map::new(),
        }
    }
}

/// The schema document of a type: an ordered list of field rules.
///
/// Invariant: no two rules share a name. Enforced on type create/update via
/// [`SchemaDefinition::check_unique_names`]; evolution preserves it by only
/// appending unknown names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    #[serde(default)]
    pub fields: Vec<FieldRule>,
}

impl SchemaDefinition {
    /// Create a schema from a list of rules
    pub fn new(fields: Vec<FieldRule>) -> Self {
        Self { fields }
    }

    /// Whether no fields are declared
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Look up a rule by field name
    pub fn get(&self, name: &str) -> Option<&FieldRule> {
        self.fields.iter().find(|r| r.name == name)
    }

    /// Whether a field of this name is declared
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Fail if two rules share a name
    pub fn check_unique_names(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for rule in &self.fields {
            if !seen.insert(rule.name.as_str()) {
                return Err(MasterDataError::DuplicateFieldRule {
                    name: rule.name.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&FieldType::Integer).unwrap(), "\"integer\"");
        assert_eq!(serde_json::to_string(&FieldType::String).unwrap(), "\"string\"");
    }

    #[test]
    fn test_rule_defaults_on_deserialize() {
        let rule: FieldRule = serde_json::from_str(r#"{"name": "sku"}"#).unwrap();
        assert_eq!(rule.field_type, FieldType::String);
        assert!(!rule.mandatory);
        assert!(rule.validators.is_empty());
    }

    #[test]
    fn test_rule_wire_shape() {
        let rule = FieldRule::mandatory("qty", FieldType::Integer);
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "qty",
                "type": "integer",
                "mandatory": true,
                "validators": {}
            })
        );
    }

    #[test]
    fn test_unique_names_rejects_duplicates() {
        let schema = SchemaDefinition::new(vec![
            FieldRule::new("sku", FieldType::String),
            FieldRule::new("sku", FieldType::Integer),
        ]);
        let err = schema.check_unique_names().unwrap_err();
        assert!(matches!(err, MasterDataError::DuplicateFieldRule { name } if name == "sku"));
    }

    #[test]
    fn test_lookup_by_name() {
        let schema = SchemaDefinition::new(vec![FieldRule::new("color", FieldType::String)]);
        assert!(schema.contains("color"));
        assert!(!schema.contains("size"));
        assert!(schema.check_unique_names().is_ok());
    }
}
