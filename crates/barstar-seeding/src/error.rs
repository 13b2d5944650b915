//! Error types for the seeding module.
//!
//! Only faults that stop a run are errors. Expected misses while building a
//! row (a required column with no value, a foreign key that would recurse into
//! an entity already under construction, a constraint rejection) are reported
//! through `Option` and [`InsertOutcome`](crate::persistence::InsertOutcome)
//! instead and are retried locally.

use thiserror::Error;

/// Errors that can occur during seeding operations.
#[derive(Debug, Error)]
pub enum SeedingError {
	/// The allow-list filter matched no known entity.
	#[error("No entities match the filter: {}", filter.join(", "))]
	NoMatchingEntities {
		/// Names that were requested.
		filter: Vec<String>,
	},

	/// Schema metadata could not be read or understood.
	#[error("Introspection error: {0}")]
	Introspection(String),

	/// Unrecoverable database failure (connectivity, schema mismatch).
	#[error("Database error: {0}")]
	Database(#[from] sqlx::Error),

	/// Applying the bundled schema migrations failed.
	#[error("Migration error: {0}")]
	Migration(#[from] sqlx::migrate::MigrateError),

	/// Invalid configuration value.
	#[error("Configuration error: {0}")]
	Config(String),

	/// A `${VAR}` reference in the configuration names an unset variable.
	#[error("Environment variable not found: {name}")]
	EnvVarNotFound {
		/// Variable name.
		name: String,
	},

	/// No database URL was configured and `DATABASE_URL` is unset.
	#[error("No database URL configured (set DATABASE_URL or [database] url)")]
	MissingDatabaseUrl,

	/// I/O operation failed.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	/// TOML configuration could not be parsed.
	#[error("TOML error: {0}")]
	TomlError(#[from] toml::de::Error),
}

/// Result type alias for seeding operations.
pub type SeedingResult<T> = Result<T, SeedingError>;
