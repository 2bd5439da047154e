//! Record write orchestration
//!
//! Sequences every record create/update as validate → evolve → persist:
//!
//! ```text
//! raw attributes ──▶ validate_attributes (type's current schema)
//!                         │ cleaned map
//!                         ▼
//!                    evolve_schema (may widen the schema)
//!                         │ cleaned map + maybe-updated type
//!                         ▼
//!                    MasterStore::commit_record_write (one atomic unit)
//! ```
//!
//! A validation failure stops the pipeline before anything is staged, so no
//! schema mutation or record write can land. The schema save and the record
//! write share a single store commit.

use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::evolve::evolve_schema;
use crate::record::MasterRecord;
use crate::store::{MasterStore, RecordWrite};
use crate::validate::validate_attributes;

/// Orchestrates validated, schema-evolving record writes against a store
pub struct RecordWriter<'a> {
    store: &'a mut MasterStore,
}

impl<'a> RecordWriter<'a> {
    pub fn new(store: &'a mut MasterStore) -> Self {
        Self { store }
    }

    /// Create a record of the given type from a raw attribute payload
    pub fn create(&mut self, type_id: u64, raw_attributes: &Value) -> Result<MasterRecord> {
        let def = self.store.get_type(type_id)?.clone();
        let clean = validate_attributes(&def.schema_definition, raw_attributes)?;

        let mut def = def;
        let changed = evolve_schema(&mut def.schema_definition, &clean);
        debug!(type_id, schema_changed = changed, "creating record");

        self.store.commit_record_write(
            changed.then_some(def),
            RecordWrite::Insert {
                record_type: type_id,
                attributes: clean,
            },
        )
    }

    /// Replace a record's attributes from a raw payload.
    ///
    /// The record keeps the type it was created with; the payload cannot
    /// move it to another type.
    pub fn update(&mut self, record_id: u64, raw_attributes: &Value) -> Result<MasterRecord> {
        let record = self.store.get_record(record_id)?;
        let type_id = record.record_type;

        let def = self.store.get_type(type_id)?.clone();
        let clean = validate_attributes(&def.schema_definition, raw_attributes)?;

        let mut def = def;
        let changed = evolve_schema(&mut def.schema_definition, &clean);
        debug!(record_id, type_id, schema_changed = changed, "updating record");

        self.store.commit_record_write(
            changed.then_some(def),
            RecordWrite::Update {
                id: record_id,
                attributes: clean,
            },
        )
    }
}
