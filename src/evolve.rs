//! Dynamic schema evolution
//!
//! When a cleaned attribute map carries keys the schema does not declare yet,
//! the schema widens: one permissive rule is appended per unknown key.
//! Evolution never removes or retypes existing fields, never marks a field
//! mandatory, and never fails. Persisting the widened schema is the caller's
//! job (the write orchestrator commits it together with the record).

use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::debug;

use crate::schema::{FieldRule, FieldType, SchemaDefinition};

/// Infer the declared type for a newly observed value
fn infer_type(value: &Value) -> FieldType {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => FieldType::Integer,
        _ => FieldType::String,
    }
}

/// Append rules for attribute keys the schema does not declare yet.
///
/// Returns `true` if the schema changed and needs to be persisted.
pub fn evolve_schema(schema: &mut SchemaDefinition, attributes: &Map<String, Value>) -> bool {
    let mut known: HashSet<String> =
        schema.fields.iter().map(|r| r.name.clone()).collect();

    let mut changed = false;
    for (key, value) in attributes {
        if known.contains(key) {
            continue;
        }
        let inferred = infer_type(value);
        debug!(field = %key, ?inferred, "schema evolution: appending rule");
        schema.fields.push(FieldRule::new(key.clone(), inferred));
        known.insert(key.clone());
        changed = true;
    }

    changed
}
