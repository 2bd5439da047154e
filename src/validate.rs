//! Attribute validation against a type's schema
//!
//! Pure functions: a raw attribute payload goes in, a cleaned attribute map
//! comes out, or a field-scoped error. Nothing here touches storage.
//!
//! Cleaning policy:
//! - `null` and `""` count as absent; optional absent fields are omitted from
//!   the output entirely (sparse data, no stored nulls)
//! - `integer` fields are coerced from JSON numbers and numeric strings
//! - undeclared keys with non-empty values pass through verbatim, which is
//!   what feeds schema evolution
//!
//! Validation fails fast on the first violated rule, in declaration order.

use serde_json::{Map, Number, Value};

use crate::error::{MasterDataError, Result};
use crate::schema::{FieldType, SchemaDefinition};

/// Whether a submitted value counts as "not provided"
fn is_absent(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// Coerce a present value to an integer, mirroring a lenient `int(value)`:
/// integers pass, floats truncate toward zero, numeric strings parse.
fn coerce_integer(field: &str, value: &Value) -> Result<Value> {
    let fail = || MasterDataError::TypeCoercionFailure {
        field: field.to_string(),
    };

    match value {
        Value::Number(n) => {
            if n.as_i64().is_some() || n.as_u64().is_some() {
                Ok(value.clone())
            } else if let Some(f) = n.as_f64() {
                // Truncate toward zero, but only within i64 range; wider
                // floats cannot be represented faithfully
                let t = f.trunc();
                if t >= i64::MIN as f64 && t < i64::MAX as f64 {
                    Ok(Value::Number(Number::from(t as i64)))
                } else {
                    Err(fail())
                }
            } else {
                Err(fail())
            }
        }
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .map(Number::from)
                .or_else(|_| s.parse::<u64>().map(Number::from))
                .map(Value::Number)
                .map_err(|_| fail())
        }
        _ => Err(fail()),
    }
}

/// Validate and clean a raw attribute payload against a schema.
///
/// Returns the cleaned map with declared fields first (in declaration order)
/// followed by pass-through adhoc keys, or the first field-scoped violation.
pub fn validate_attributes(
    schema: &SchemaDefinition,
    raw: &Value,
) -> Result<Map<String, Value>> {
    let attributes = raw.as_object().ok_or(MasterDataError::MalformedAttributes)?;

    let mut clean = Map::new();

    for rule in &schema.fields {
        let value = attributes.get(&rule.name);

        if is_absent(value) {
            if rule.mandatory {
                return Err(MasterDataError::MandatoryFieldMissing {
                    field: rule.name.clone(),
                });
            }
            // Optional and empty: skip, do not emit a null
            continue;
        }

        // is_absent rules out None
        let value = value.cloned().unwrap_or(Value::Null);
        let value = match rule.field_type {
            FieldType::Integer => coerce_integer(&rule.name, &value)?,
            FieldType::String => value,
        };
        clean.insert(rule.name.clone(), value);
    }

    // Preserve adhoc attributes not yet in the schema; these drive evolution
    for (key, value) in attributes {
        if !clean.contains_key(key) && !is_absent(Some(value)) {
            clean.insert(key.clone(), value.clone());
        }
    }

    Ok(clean)
}
