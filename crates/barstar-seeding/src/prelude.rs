//! Convenience re-exports for common usage.
//!
//! # Example
//!
//! ```ignore
//! use barstar_seeding::prelude::*;
//! ```

// Error types
pub use crate::error::{SeedingError, SeedingResult};

// Configuration
pub use crate::config::{CliArgs, SeedOptions, SeedSettings};

// Schema
pub use crate::schema::{
	ColumnDescriptor, EntityDescriptor, ForeignKeyTarget, GenerationPlan, IntrospectedSchema,
	LogicalType, SchemaIntrospector, SchemaRegistry, SqliteSchemaRegistry, StaticSchemaRegistry,
};

// Generation
pub use crate::faker::{FakeDataProvider, FakerProvider};
pub use crate::generator::RowFactory;
pub use crate::resolver::RecursionGuard;
pub use crate::value::{FieldValue, RowDraft};

// Persistence
pub use crate::persistence::{
	ConstraintViolation, InsertOutcome, PersistenceGateway, SqliteGateway, ViolationKind,
	connect_pool, persist,
};

// Orchestration
pub use crate::migrations;
pub use crate::orchestrator::{ClearedEntity, EntityReport, SeedReport, Seeder};
