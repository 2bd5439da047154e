//! Type and record entities
//!
//! `TypeDefinition` is the registry entry for a user-generated type;
//! `MasterRecord` is one row of the single master table, referencing exactly
//! one type. Both carry chrono timestamps and serialize to the wire shapes
//! the transport layer exposes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::SchemaDefinition;

/// Width of the zero-padded display id
const DISPLAY_ID_WIDTH: usize = 5;

/// Registry entry for a user-generated type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDefinition {
    /// Surrogate id assigned by the store
    pub id: u64,
    /// Display name, unique case-insensitively across active and inactive types
    pub name: String,
    /// The attribute schema records of this type must conform to
    pub schema_definition: SchemaDefinition,
    /// Soft-delete flag. Inactive types stay name-reserved and keep their
    /// records; they can be reactivated later.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TypeDefinition {
    /// Create a new active type. The store assigns the id.
    pub fn new(id: u64, name: impl Into<String>, schema_definition: SchemaDefinition) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            schema_definition,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark the entity as modified
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// One row of the master table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterRecord {
    /// Surrogate id assigned by the store
    pub id: u64,
    /// Id of the owning [`TypeDefinition`]. Deleting the type deletes its
    /// records.
    pub record_type: u64,
    /// Flat attribute map, already cleaned against the type's schema at the
    /// time of write. Not re-validated if the schema later evolves.
    pub attributes: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MasterRecord {
    /// Create a new record. The store assigns the id.
    pub fn new(id: u64, record_type: u64, attributes: Map<String, Value>) -> Self {
        let now = Utc::now();
        Self {
            id,
            record_type,
            attributes,
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark the entity as modified
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Zero-padded 5-digit display id, e.g. `00042`
    pub fn formatted_id(&self) -> String {
        format!("{:0width$}", self.id, width = DISPLAY_ID_WIDTH)
    }
}

/// Wire shape of a type
#[derive(Debug, Clone, Serialize)]
pub struct TypeResource {
    pub id: u64,
    pub name: String,
    pub schema_definition: SchemaDefinition,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&TypeDefinition> for TypeResource {
    fn from(def: &TypeDefinition) -> Self {
        Self {
            id: def.id,
            name: def.name.clone(),
            schema_definition: def.schema_definition.clone(),
            is_active: def.is_active,
            created_at: def.created_at,
            updated_at: def.updated_at,
        }
    }
}

/// Wire shape of a record, including the derived display id
#[derive(Debug, Clone, Serialize)]
pub struct RecordResource {
    pub id: u64,
    pub formatted_id: String,
    pub record_type: u64,
    pub attributes: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&MasterRecord> for RecordResource {
    fn from(record: &MasterRecord) -> Self {
        Self {
            id: record.id,
            formatted_id: record.formatted_id(),
            record_type: record.record_type,
            attributes: record.attributes.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}
