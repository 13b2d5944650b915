//! Seeder configuration.
//!
//! Settings are read from a TOML file, then overridden by command line
//! arguments:
//!
//! ```toml
//! [database]
//! url = "${DATABASE_URL}"
//!
//! [seeding]
//! count = 10
//! attempts = 5
//!
//! [tables]
//! include = ["users", "venues"]
//!
//! [client_defaults]
//! users = ["created_at", "updated_at"]
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{SeedingError, SeedingResult};

/// Largest accepted `datetime_window_days`, roughly 270 years.
pub(crate) const MAX_DATETIME_WINDOW_DAYS: i64 = 100_000;

/// Largest accepted `duration_max_seconds`, roughly 270 years.
pub(crate) const MAX_DURATION_SECONDS: i64 = MAX_DATETIME_WINDOW_DAYS * 86_400;

/// Top-level seeder settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedSettings {
	/// Database connection.
	pub database: DatabaseSettings,

	/// Generation knobs.
	pub seeding: SeedingSettings,

	/// Entity allow-list.
	pub tables: TableSettings,

	/// Table name to columns filled by the application at insert time.
	pub client_defaults: HashMap<String, Vec<String>>,
}

impl SeedSettings {
	/// Load settings from a TOML file.
	pub fn from_file(path: impl AsRef<Path>) -> SeedingResult<Self> {
		let content = std::fs::read_to_string(path.as_ref())?;
		Self::from_toml(&content)
	}

	/// Parse settings from a TOML string.
	pub fn from_toml(content: &str) -> SeedingResult<Self> {
		Ok(toml::from_str(content)?)
	}

	/// Sets the database URL.
	pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
		self.database.url = url.into();
		self
	}

	/// Sets the allow-list.
	pub fn with_tables(mut self, tables: Vec<String>) -> Self {
		self.tables.include = tables;
		self
	}

	/// Merge command line arguments. Arguments win over file values.
	pub fn merge_cli_args(&mut self, args: &CliArgs) {
		if let Some(ref url) = args.database_url {
			self.database.url = url.clone();
		}

		if let Some(count) = args.count {
			self.seeding.count = count;
		}

		if let Some(attempts) = args.attempts {
			self.seeding.attempts = attempts;
		}

		if !args.tables.is_empty() {
			self.tables.include = args.tables.clone();
		}

		self.seeding.clear |= args.clear;
		self.seeding.generate &= !args.no_generate;
	}

	/// Runtime options for the orchestrator.
	///
	/// # Errors
	///
	/// Returns [`SeedingError::Config`] for values that would make a run
	/// meaningless (zero attempts, a non-positive float bound, ...).
	pub fn seed_options(&self) -> SeedingResult<SeedOptions> {
		let s = &self.seeding;

		if s.attempts == 0 {
			return Err(SeedingError::Config("attempts must be at least 1".to_string()));
		}
		if s.manufacture_attempts == 0 {
			return Err(SeedingError::Config(
				"manufacture_attempts must be at least 1".to_string(),
			));
		}
		if s.integer_max < 0 {
			return Err(SeedingError::Config("integer_max must not be negative".to_string()));
		}
		if !(s.float_max > 0.0 && s.float_max.is_finite()) {
			return Err(SeedingError::Config("float_max must be a positive number".to_string()));
		}
		if !(0..=MAX_DATETIME_WINDOW_DAYS).contains(&s.datetime_window_days) {
			return Err(SeedingError::Config(format!(
				"datetime_window_days must be between 0 and {}",
				MAX_DATETIME_WINDOW_DAYS
			)));
		}
		if !(0..=MAX_DURATION_SECONDS).contains(&s.duration_max_seconds) {
			return Err(SeedingError::Config(format!(
				"duration_max_seconds must be between 0 and {}",
				MAX_DURATION_SECONDS
			)));
		}

		Ok(SeedOptions {
			count: s.count,
			attempts: s.attempts,
			candidate_limit: s.candidate_limit,
			manufacture_attempts: s.manufacture_attempts,
			integer_max: s.integer_max,
			float_max: s.float_max,
			datetime_window_days: s.datetime_window_days,
			duration_max_seconds: s.duration_max_seconds,
			clear: s.clear,
			generate: s.generate,
		})
	}
}

/// Database connection settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
	/// Connection URL.
	///
	/// May be an environment variable reference such as `"${SEED_DB}"`.
	pub url: String,
}

impl DatabaseSettings {
	/// Resolve the URL, expanding an environment variable reference.
	///
	/// An empty URL falls back to `DATABASE_URL`.
	pub fn resolve_url(&self) -> SeedingResult<String> {
		self.resolve_url_with(|name| std::env::var(name).ok())
	}

	fn resolve_url_with(&self, lookup: impl Fn(&str) -> Option<String>) -> SeedingResult<String> {
		if self.url.starts_with("${") && self.url.ends_with('}') {
			let var_name = &self.url[2..self.url.len() - 1];
			lookup(var_name).ok_or_else(|| SeedingError::EnvVarNotFound {
				name: var_name.to_string(),
			})
		} else if self.url.is_empty() {
			lookup("DATABASE_URL").ok_or(SeedingError::MissingDatabaseUrl)
		} else {
			Ok(self.url.clone())
		}
	}
}

/// Generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedingSettings {
	/// Rows to create per entity.
	pub count: usize,

	/// Attempts per desired row before it is skipped.
	pub attempts: usize,

	/// Existing keys fetched per foreign key lookup.
	pub candidate_limit: usize,

	/// Reuse-or-manufacture rounds per foreign key.
	pub manufacture_attempts: usize,

	/// Upper bound for generated integers.
	pub integer_max: i64,

	/// Upper bound for generated floats.
	pub float_max: f64,

	/// How far back generated instants may lie.
	pub datetime_window_days: i64,

	/// Upper bound for generated durations.
	pub duration_max_seconds: i64,

	/// Delete existing rows before generating.
	pub clear: bool,

	/// Generate rows. Clear-only runs turn this off.
	pub generate: bool,
}

impl Default for SeedingSettings {
	fn default() -> Self {
		Self {
			count: 10,
			attempts: 5,
			candidate_limit: 100,
			manufacture_attempts: 3,
			integer_max: 1000,
			float_max: 100.0,
			datetime_window_days: 730,
			duration_max_seconds: 86_400,
			clear: false,
			generate: true,
		}
	}
}

/// Entity allow-list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSettings {
	/// Table or type names; empty means every entity.
	pub include: Vec<String>,
}

/// Command line arguments that can override file values.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
	/// `--database-url`
	pub database_url: Option<String>,
	/// `--count`
	pub count: Option<usize>,
	/// `--attempts`
	pub attempts: Option<usize>,
	/// `--tables`; empty keeps the file value.
	pub tables: Vec<String>,
	/// `--clear`
	pub clear: bool,
	/// `--no-generate`
	pub no_generate: bool,
	/// `--config`
	pub config_file: Option<PathBuf>,
}

/// Runtime options consumed by the seeder.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedOptions {
	/// Rows to create per entity.
	pub count: usize,
	/// Attempts per desired row.
	pub attempts: usize,
	/// Existing keys fetched per foreign key lookup.
	pub candidate_limit: usize,
	/// Reuse-or-manufacture rounds per foreign key.
	pub manufacture_attempts: usize,
	/// Upper bound for generated integers.
	pub integer_max: i64,
	/// Upper bound for generated floats.
	pub float_max: f64,
	/// How far back generated instants may lie.
	pub datetime_window_days: i64,
	/// Upper bound for generated durations.
	pub duration_max_seconds: i64,
	/// Delete existing rows first.
	pub clear: bool,
	/// Generate rows.
	pub generate: bool,
}

impl Default for SeedOptions {
	fn default() -> Self {
		let s = SeedingSettings::default();
		Self {
			count: s.count,
			attempts: s.attempts,
			candidate_limit: s.candidate_limit,
			manufacture_attempts: s.manufacture_attempts,
			integer_max: s.integer_max,
			float_max: s.float_max,
			datetime_window_days: s.datetime_window_days,
			duration_max_seconds: s.duration_max_seconds,
			clear: s.clear,
			generate: s.generate,
		}
	}
}

impl SeedOptions {
	/// Creates default options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets rows per entity.
	pub fn with_count(mut self, count: usize) -> Self {
		self.count = count;
		self
	}

	/// Sets attempts per row.
	pub fn with_attempts(mut self, attempts: usize) -> Self {
		self.attempts = attempts;
		self
	}

	/// Sets the foreign key candidate cap.
	pub fn with_candidate_limit(mut self, limit: usize) -> Self {
		self.candidate_limit = limit;
		self
	}

	/// Sets the clear flag.
	pub fn with_clear(mut self, clear: bool) -> Self {
		self.clear = clear;
		self
	}

	/// Sets the generate flag.
	pub fn with_generate(mut self, generate: bool) -> Self {
		self.generate = generate;
		self
	}
}
