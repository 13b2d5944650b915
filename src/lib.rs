//! # Barstar
//!
//! Backend tooling for the Barstar venues and social network API.
//!
//! ## Feature Flags
//!
//! - `seeding` (default) - Schema-reflective fake data seeder, re-exported as
//!   [`seeding`]
//!
//! ## Quick Example
//!
//! ```ignore
//! use barstar::prelude::*;
//!
//! let pool = connect_pool("sqlite://barstar.db").await?;
//! let registry = SqliteSchemaRegistry::new(pool.clone());
//! let schema = SchemaIntrospector::new(&registry).introspect().await?;
//! let gateway = SqliteGateway::acquire(&pool).await?;
//!
//! let report = Seeder::new(schema, gateway, FakerProvider::new(), SeedOptions::new())
//!     .run()
//!     .await?;
//! print!("{}", report);
//! ```
//!
//! The `barstar-seed` binary in `crates/barstar-seeding-cli` wraps the same
//! calls behind command line flags.

#[cfg(feature = "seeding")]
pub use barstar_seeding as seeding;

#[cfg(feature = "seeding")]
pub use barstar_seeding::{SeedOptions, SeedReport, Seeder, SeedingError, SeedingResult};

/// Re-exports for `use barstar::prelude::*`.
pub mod prelude {
	#[cfg(feature = "seeding")]
	pub use barstar_seeding::prelude::*;
}
