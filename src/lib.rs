//! Master Data Store
//!
//! A generic master data store: users define record types with a
//! JSON-described attribute schema, then create and update records whose
//! attributes are validated against that schema. When a record introduces a
//! previously-unknown attribute, the schema widens itself automatically
//! (dynamic schema evolution).
//!
//! ## Features
//!
//! - **Schema as data**: a type's schema is an ordered list of field rules,
//!   editable at runtime
//! - **Validation & coercion**: mandatory enforcement, integer coercion,
//!   sparse storage of optional fields
//! - **Dynamic schema evolution**: unknown attribute keys append permissive
//!   rules, atomically with the record write
//! - **Soft delete**: deactivated types stay name-reserved and can be
//!   reactivated
//! - **Checksummed snapshots**: store state persists as a SHA256-verified
//!   JSON snapshot, replaced atomically
//!
//! ## Write pipeline
//!
//! ```text
//! raw attributes
//!      │
//!      ▼
//! validate::validate_attributes   (against the type's current schema)
//!      │ cleaned map
//!      ▼
//! evolve::evolve_schema           (appends rules for unknown keys)
//!      │
//!      ▼
//! writer::RecordWriter ──▶ store::MasterStore   (one atomic commit for
//!                                                schema save + record write)
//! ```

pub mod checksum;
pub mod config;
pub mod error;
pub mod evolve;
pub mod record;
pub mod schema;
pub mod store;
pub mod validate;
pub mod writer;

pub use checksum::Checksum;
pub use config::{MasterConfig, OutputFormat};
pub use error::{MasterDataError, Result};
pub use evolve::evolve_schema;
pub use record::{MasterRecord, RecordResource, TypeDefinition, TypeResource};
pub use schema::{FieldRule, FieldType, SchemaDefinition};
pub use store::MasterStore;
pub use validate::validate_attributes;
pub use writer::RecordWriter;
