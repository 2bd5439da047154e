//! Durable registries for types and records
//!
//! `MasterStore` holds the full state image in memory and persists it as a
//! single JSON snapshot under the store root:
//!
//! ```text
//! <root>/
//! └── masterdata.json     { checksum, state: { types, records, counters } }
//! ```
//!
//! Every mutation goes through [`MasterStore::commit`]: the change is applied
//! to a clone of the state, the clone is written to a temp file and renamed
//! over the snapshot, and only then swapped in. A failure at any point leaves
//! both the file and the in-memory image untouched, which is the all-or-
//! nothing boundary the record write pipeline relies on. The snapshot carries
//! a SHA256 checksum that is verified on open.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::checksum::Checksum;
use crate::error::{MasterDataError, Result};
use crate::record::{MasterRecord, TypeDefinition};
use crate::schema::SchemaDefinition;

/// Snapshot filename under the store root
pub const SNAPSHOT_FILE: &str = "masterdata.json";

/// Maximum length of a type name
const MAX_TYPE_NAME_LEN: usize = 20;

/// The durable state image: both registries plus id counters
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreState {
    next_type_id: u64,
    next_record_id: u64,
    types: BTreeMap<u64, TypeDefinition>,
    records: BTreeMap<u64, MasterRecord>,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            next_type_id: 1,
            next_record_id: 1,
            types: BTreeMap::new(),
            records: BTreeMap::new(),
        }
    }
}

/// On-disk wrapper: state plus its integrity checksum
#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    checksum: Checksum,
    state: Value,
}

/// A staged record write, applied inside the same commit as any schema save
#[derive(Debug)]
pub(crate) enum RecordWrite {
    Insert {
        record_type: u64,
        attributes: Map<String, Value>,
    },
    Update {
        id: u64,
        attributes: Map<String, Value>,
    },
}

/// The master data store: type registry + record registry
#[derive(Debug)]
pub struct MasterStore {
    root: PathBuf,
    state: StoreState,
}

impl MasterStore {
    /// Open an existing store or create a new one at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        let snapshot_path = root.join(SNAPSHOT_FILE);
        let state = if snapshot_path.exists() {
            Self::load_snapshot(&snapshot_path)?
        } else {
            StoreState::default()
        };

        debug!(
            root = %root.display(),
            types = state.types.len(),
            records = state.records.len(),
            "opened master data store"
        );

        Ok(Self { root, state })
    }

    /// Get the root path of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn load_snapshot(path: &Path) -> Result<StoreState> {
        let content = fs::read_to_string(path)?;
        let snapshot: Snapshot = serde_json::from_str(&content)
            .map_err(|e| MasterDataError::InvalidSnapshot(e.to_string()))?;

        if !snapshot.checksum.verify_json(&snapshot.state) {
            return Err(MasterDataError::ChecksumMismatch {
                expected: snapshot.checksum.to_string(),
                actual: Checksum::from_json(&snapshot.state).to_string(),
            });
        }

        serde_json::from_value(snapshot.state)
            .map_err(|e| MasterDataError::InvalidSnapshot(e.to_string()))
    }

    fn persist(root: &Path, state: &StoreState) -> Result<()> {
        let state_value = serde_json::to_value(state)?;
        let snapshot = Snapshot {
            checksum: Checksum::from_json(&state_value),
            state: state_value,
        };
        let content = serde_json::to_string_pretty(&snapshot)?;

        // Temp file + rename keeps the snapshot replacement atomic
        let tmp_path = root.join(format!("{SNAPSHOT_FILE}.tmp"));
        fs::write(&tmp_path, content)?;
        fs::rename(&tmp_path, root.join(SNAPSHOT_FILE))?;
        Ok(())
    }

    /// Apply a mutation as one atomic unit: mutate a clone of the state,
    /// persist it, then swap it in. Nothing changes if any step fails.
    fn commit<T>(&mut self, mutate: impl FnOnce(&mut StoreState) -> Result<T>) -> Result<T> {
        let mut next = self.state.clone();
        let out = mutate(&mut next)?;
        Self::persist(&self.root, &next)?;
        self.state = next;
        Ok(out)
    }

    // ---- Type registry ------------------------------------------------

    fn check_type_name(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(MasterDataError::InvalidTypeName {
                reason: "name must not be empty".to_string(),
            });
        }
        if name.chars().count() > MAX_TYPE_NAME_LEN {
            return Err(MasterDataError::InvalidTypeName {
                reason: format!("name must be at most {MAX_TYPE_NAME_LEN} characters"),
            });
        }
        Ok(())
    }

    /// Reject a name already held by any type, active or not, other than
    /// `exclude`. Comparison is case-insensitive. A conflict with an
    /// inactive type gets its own error directing the user to reactivate.
    fn check_name_conflict(&self, name: &str, exclude: Option<u64>) -> Result<()> {
        let wanted = name.to_lowercase();
        let conflict = self
            .state
            .types
            .values()
            .filter(|t| Some(t.id) != exclude)
            .find(|t| t.name.to_lowercase() == wanted);

        match conflict {
            Some(existing) if !existing.is_active => {
                Err(MasterDataError::InactiveTypeNameConflict {
                    name: name.to_string(),
                })
            }
            Some(_) => Err(MasterDataError::DuplicateTypeName {
                name: name.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Create a new type. The schema must declare at least one field.
    pub fn create_type(&mut self, name: &str, schema: SchemaDefinition) -> Result<TypeDefinition> {
        Self::check_type_name(name)?;
        self.check_name_conflict(name, None)?;
        if schema.is_empty() {
            return Err(MasterDataError::EmptySchemaOnCreate);
        }
        schema.check_unique_names()?;

        let created = self.commit(|state| {
            let id = state.next_type_id;
            state.next_type_id += 1;
            let def = TypeDefinition::new(id, name, schema);
            state.types.insert(id, def.clone());
            Ok(def)
        })?;

        info!(id = created.id, name = %created.name, "created type");
        Ok(created)
    }

    /// Rename a type and/or replace its schema definition directly.
    ///
    /// Unlike creation, an update may leave the field list empty; the
    /// at-least-one-field rule only applies when a type is born.
    pub fn update_type(
        &mut self,
        id: u64,
        name: Option<&str>,
        schema: Option<SchemaDefinition>,
    ) -> Result<TypeDefinition> {
        if !self.state.types.contains_key(&id) {
            return Err(MasterDataError::TypeNotFound { id });
        }
        if let Some(new_name) = name {
            Self::check_type_name(new_name)?;
            self.check_name_conflict(new_name, Some(id))?;
        }
        if let Some(ref new_schema) = schema {
            new_schema.check_unique_names()?;
        }

        self.commit(|state| {
            let def = state
                .types
                .get_mut(&id)
                .ok_or(MasterDataError::TypeNotFound { id })?;
            if let Some(new_name) = name {
                def.name = new_name.to_string();
            }
            if let Some(new_schema) = schema {
                def.schema_definition = new_schema;
            }
            def.touch();
            Ok(def.clone())
        })
    }

    /// Soft-delete: the type stays name-reserved and keeps its records
    pub fn deactivate_type(&mut self, id: u64) -> Result<TypeDefinition> {
        self.set_type_active(id, false)
    }

    /// Undo a soft-delete
    pub fn reactivate_type(&mut self, id: u64) -> Result<TypeDefinition> {
        self.set_type_active(id, true)
    }

    fn set_type_active(&mut self, id: u64, active: bool) -> Result<TypeDefinition> {
        let def = self.commit(|state| {
            let def = state
                .types
                .get_mut(&id)
                .ok_or(MasterDataError::TypeNotFound { id })?;
            def.is_active = active;
            def.touch();
            Ok(def.clone())
        })?;
        info!(id, name = %def.name, active, "toggled type active flag");
        Ok(def)
    }

    /// Hard-delete a type and cascade to its records
    pub fn delete_type(&mut self, id: u64) -> Result<()> {
        let removed = self.commit(|state| {
            let def = state
                .types
                .remove(&id)
                .ok_or(MasterDataError::TypeNotFound { id })?;
            let before = state.records.len();
            state.records.retain(|_, r| r.record_type != id);
            Ok((def, before - state.records.len()))
        })?;
        info!(id, name = %removed.0.name, cascaded = removed.1, "deleted type");
        Ok(())
    }

    /// Get a type by id
    pub fn get_type(&self, id: u64) -> Result<&TypeDefinition> {
        self.state
            .types
            .get(&id)
            .ok_or(MasterDataError::TypeNotFound { id })
    }

    /// Find a type by name, case-insensitively, active or not
    pub fn find_type_by_name(&self, name: &str) -> Option<&TypeDefinition> {
        let wanted = name.to_lowercase();
        self.state
            .types
            .values()
            .find(|t| t.name.to_lowercase() == wanted)
    }

    /// All types, ordered by id
    pub fn list_types(&self) -> Vec<&TypeDefinition> {
        self.state.types.values().collect()
    }

    // ---- Record registry ----------------------------------------------

    /// Get a record by id
    pub fn get_record(&self, id: u64) -> Result<&MasterRecord> {
        self.state
            .records
            .get(&id)
            .ok_or(MasterDataError::RecordNotFound { id })
    }

    /// Records, most-recent-first by id, optionally filtered by type
    pub fn list_records(&self, record_type: Option<u64>) -> Vec<&MasterRecord> {
        self.state
            .records
            .values()
            .rev()
            .filter(|r| record_type.map_or(true, |t| r.record_type == t))
            .collect()
    }

    /// Delete a single record
    pub fn delete_record(&mut self, id: u64) -> Result<()> {
        self.commit(|state| {
            state
                .records
                .remove(&id)
                .ok_or(MasterDataError::RecordNotFound { id })?;
            Ok(())
        })?;
        info!(id, "deleted record");
        Ok(())
    }

    /// Commit a record write together with an evolved schema, as one unit.
    ///
    /// Called by the write orchestrator only; `updated_type` is `Some` when
    /// evolution widened the schema and it must land with the record.
    pub(crate) fn commit_record_write(
        &mut self,
        updated_type: Option<TypeDefinition>,
        write: RecordWrite,
    ) -> Result<MasterRecord> {
        self.commit(|state| {
            if let Some(mut def) = updated_type {
                if !state.types.contains_key(&def.id) {
                    return Err(MasterDataError::TypeNotFound { id: def.id });
                }
                def.touch();
                debug!(id = def.id, name = %def.name, "persisting evolved schema");
                state.types.insert(def.id, def);
            }

            match write {
                RecordWrite::Insert {
                    record_type,
                    attributes,
                } => {
                    let id = state.next_record_id;
                    state.next_record_id += 1;
                    let record = MasterRecord::new(id, record_type, attributes);
                    state.records.insert(id, record.clone());
                    Ok(record)
                }
                RecordWrite::Update { id, attributes } => {
                    let record = state
                        .records
                        .get_mut(&id)
                        .ok_or(MasterDataError::RecordNotFound { id })?;
                    record.attributes = attributes;
                    record.touch();
                    Ok(record.clone())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldRule, FieldType};
    use tempfile::tempdir;

    fn one_field_schema() -> SchemaDefinition {
        SchemaDefinition::new(vec![FieldRule::mandatory("sku", FieldType::String)])
    }

    #[test]
    fn test_create_and_get_type() {
        let dir = tempdir().unwrap();
        let mut store = MasterStore::open(dir.path()).unwrap();

        let def = store.create_type("Product", one_field_schema()).unwrap();
        assert_eq!(def.id, 1);
        assert!(def.is_active);
        assert_eq!(store.get_type(1).unwrap().name, "Product");
    }

    #[test]
    fn test_name_uniqueness_is_case_insensitive() {
        let dir = tempdir().unwrap();
        let mut store = MasterStore::open(dir.path()).unwrap();
        store.create_type("Color", one_field_schema()).unwrap();

        let err = store.create_type("COLOR", one_field_schema()).unwrap_err();
        assert!(matches!(err, MasterDataError::DuplicateTypeName { name } if name == "COLOR"));
    }

    #[test]
    fn test_inactive_conflict_gets_reactivation_guidance() {
        let dir = tempdir().unwrap();
        let mut store = MasterStore::open(dir.path()).unwrap();
        let def = store.create_type("Size", one_field_schema()).unwrap();
        store.deactivate_type(def.id).unwrap();

        let err = store.create_type("size", one_field_schema()).unwrap_err();
        assert!(matches!(err, MasterDataError::InactiveTypeNameConflict { .. }));
        assert!(err.to_string().contains("INACTIVE"));
    }

    #[test]
    fn test_empty_schema_rejected_on_create() {
        let dir = tempdir().unwrap();
        let mut store = MasterStore::open(dir.path()).unwrap();

        let err = store
            .create_type("Product", SchemaDefinition::default())
            .unwrap_err();
        assert!(matches!(err, MasterDataError::EmptySchemaOnCreate));
    }

    #[test]
    fn test_duplicate_field_names_rejected() {
        let dir = tempdir().unwrap();
        let mut store = MasterStore::open(dir.path()).unwrap();

        let schema = SchemaDefinition::new(vec![
            FieldRule::new("sku", FieldType::String),
            FieldRule::new("sku", FieldType::Integer),
        ]);
        let err = store.create_type("Product", schema).unwrap_err();
        assert!(matches!(err, MasterDataError::DuplicateFieldRule { .. }));
    }

    #[test]
    fn test_type_name_constraints() {
        let dir = tempdir().unwrap();
        let mut store = MasterStore::open(dir.path()).unwrap();

        let err = store.create_type("  ", one_field_schema()).unwrap_err();
        assert!(matches!(err, MasterDataError::InvalidTypeName { .. }));

        let long = "a".repeat(21);
        let err = store.create_type(&long, one_field_schema()).unwrap_err();
        assert!(matches!(err, MasterDataError::InvalidTypeName { .. }));
    }

    #[test]
    fn test_rename_conflict_excludes_self() {
        let dir = tempdir().unwrap();
        let mut store = MasterStore::open(dir.path()).unwrap();
        let def = store.create_type("Product", one_field_schema()).unwrap();
        store.create_type("Color", one_field_schema()).unwrap();

        // Re-saving under its own name (any casing) is fine
        store.update_type(def.id, Some("PRODUCT"), None).unwrap();

        // Taking another type's name is not
        let err = store.update_type(def.id, Some("color"), None).unwrap_err();
        assert!(matches!(err, MasterDataError::DuplicateTypeName { .. }));
    }

    #[test]
    fn test_find_by_name_ignores_case() {
        let dir = tempdir().unwrap();
        let mut store = MasterStore::open(dir.path()).unwrap();
        store.create_type("Product", one_field_schema()).unwrap();

        assert!(store.find_type_by_name("pRoDuCt").is_some());
        assert!(store.find_type_by_name("Gadget").is_none());
    }

    #[test]
    fn test_deactivate_and_reactivate() {
        let dir = tempdir().unwrap();
        let mut store = MasterStore::open(dir.path()).unwrap();
        let def = store.create_type("Size", one_field_schema()).unwrap();

        let def = store.deactivate_type(def.id).unwrap();
        assert!(!def.is_active);
        // Name stays reserved while inactive
        assert!(store.find_type_by_name("size").is_some());

        let def = store.reactivate_type(def.id).unwrap();
        assert!(def.is_active);
    }

    #[test]
    fn test_delete_type_cascades_records() {
        let dir = tempdir().unwrap();
        let mut store = MasterStore::open(dir.path()).unwrap();
        let def = store.create_type("Product", one_field_schema()).unwrap();

        let attrs = serde_json::json!({"sku": "A1"}).as_object().unwrap().clone();
        store
            .commit_record_write(
                None,
                RecordWrite::Insert {
                    record_type: def.id,
                    attributes: attrs,
                },
            )
            .unwrap();
        assert_eq!(store.list_records(None).len(), 1);

        store.delete_type(def.id).unwrap();
        assert!(store.list_records(None).is_empty());
        assert!(matches!(
            store.get_type(def.id),
            Err(MasterDataError::TypeNotFound { .. })
        ));
    }

    #[test]
    fn test_records_list_most_recent_first() {
        let dir = tempdir().unwrap();
        let mut store = MasterStore::open(dir.path()).unwrap();
        let def = store.create_type("Product", one_field_schema()).unwrap();

        for sku in ["A1", "A2", "A3"] {
            let attrs = serde_json::json!({ "sku": sku }).as_object().unwrap().clone();
            store
                .commit_record_write(
                    None,
                    RecordWrite::Insert {
                        record_type: def.id,
                        attributes: attrs,
                    },
                )
                .unwrap();
        }

        let ids: Vec<u64> = store.list_records(None).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let dir = tempdir().unwrap();
        {
            let mut store = MasterStore::open(dir.path()).unwrap();
            store.create_type("Product", one_field_schema()).unwrap();
        }

        let mut store = MasterStore::open(dir.path()).unwrap();
        assert_eq!(store.list_types().len(), 1);
        assert_eq!(store.get_type(1).unwrap().name, "Product");

        // Id assignment continues where it left off
        let def = store.create_type("Color", one_field_schema()).unwrap();
        assert_eq!(def.id, 2);
    }

    #[test]
    fn test_tampered_snapshot_is_rejected() {
        let dir = tempdir().unwrap();
        {
            let mut store = MasterStore::open(dir.path()).unwrap();
            store.create_type("Product", one_field_schema()).unwrap();
        }

        let path = dir.path().join(SNAPSHOT_FILE);
        let tampered = fs::read_to_string(&path)
            .unwrap()
            .replace("Product", "Gadget!");
        fs::write(&path, tampered).unwrap();

        let err = MasterStore::open(dir.path()).unwrap_err();
        assert!(matches!(err, MasterDataError::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_failed_commit_leaves_state_untouched() {
        let dir = tempdir().unwrap();
        let mut store = MasterStore::open(dir.path()).unwrap();
        let def = store.create_type("Product", one_field_schema()).unwrap();

        let err = store
            .commit_record_write(
                None,
                RecordWrite::Update {
                    id: 99,
                    attributes: Map::new(),
                },
            )
            .unwrap_err();
        assert!(matches!(err, MasterDataError::RecordNotFound { .. }));

        // Nothing landed, in memory or on disk
        assert!(store.list_records(None).is_empty());
        let reopened = MasterStore::open(dir.path()).unwrap();
        assert!(reopened.list_records(None).is_empty());
        assert_eq!(reopened.get_type(def.id).unwrap().name, "Product");
    }
}
