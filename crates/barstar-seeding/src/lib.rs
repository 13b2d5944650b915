//! Schema-reflective fake data seeding for the Barstar database.
//!
//! The seeder reads entity and column metadata from a live schema, orders the
//! entities so that every foreign key target is populated before the rows
//! that reference it, and fills each table with plausible synthetic rows.
//!
//! - **Introspection**: [`SchemaIntrospector`](schema::SchemaIntrospector)
//!   turns a [`SchemaRegistry`](schema::SchemaRegistry) into a dependency
//!   ordered [`GenerationPlan`](schema::GenerationPlan)
//! - **Generation**: [`RowFactory`](generator::RowFactory) builds one
//!   [`RowDraft`](value::RowDraft) per attempt, dispatching on each column's
//!   [`LogicalType`](schema::LogicalType)
//! - **Foreign keys**: existing keys are reused; missing parents are
//!   manufactured recursively under a [`RecursionGuard`](resolver::RecursionGuard)
//! - **Persistence**: a [`PersistenceGateway`](persistence::PersistenceGateway)
//!   stores rows inside savepoints so a rejected row never leaves traces
//! - **Orchestration**: [`Seeder`](orchestrator::Seeder) runs the plan with a
//!   bounded number of attempts per row and reports created and skipped counts
//!
//! # Quick Start
//!
//! ```ignore
//! use barstar_seeding::prelude::*;
//!
//! let pool = connect_pool("sqlite://barstar.db").await?;
//! migrations::apply(&pool).await?;
//!
//! let registry = SqliteSchemaRegistry::new(pool.clone());
//! let schema = SchemaIntrospector::new(&registry)
//!     .with_include(vec!["users".to_string()])
//!     .introspect()
//!     .await?;
//!
//! let gateway = SqliteGateway::acquire(&pool).await?;
//! let options = SeedOptions::new().with_count(5);
//! let mut seeder = Seeder::new(schema, gateway, FakerProvider::new(), options);
//! let report = seeder.run().await?;
//! print!("{}", report);
//! ```
//!
//! # Expected misses
//!
//! A draft with an unfillable required column, a foreign key that would
//! recurse into an entity under construction, and a constraint rejection are
//! all ordinary outcomes. They are retried up to the attempt budget and then
//! counted as skipped. Only [`SeedingError`] stops a run.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod error;
pub mod faker;
pub mod generator;
pub mod migrations;
pub mod orchestrator;
pub mod persistence;
pub mod prelude;
pub mod resolver;
pub mod schema;
pub mod value;

// Re-export commonly used types at crate root
pub use config::{SeedOptions, SeedSettings};
pub use error::{SeedingError, SeedingResult};
pub use orchestrator::{SeedReport, Seeder};
pub use value::{FieldValue, RowDraft};
