//! Schema metadata used by the seeder.
//!
//! Descriptors are built once per run from a [`SchemaRegistry`] and are not
//! modified afterwards.

pub mod introspector;
pub mod order;
pub mod registry;
pub mod sqlite;

pub use introspector::{GenerationPlan, IntrospectedSchema, SchemaIntrospector, table_to_type_name};
pub use order::resolve_entity_order;
pub use registry::{SchemaRegistry, StaticSchemaRegistry};
pub use sqlite::SqliteSchemaRegistry;

/// Logical type of a column, independent of the storage engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogicalType {
	/// UUID identifier.
	Uuid,
	/// Free text.
	String,
	/// Whole number.
	Integer,
	/// Floating point or numeric.
	Float,
	/// True/false flag.
	Boolean,
	/// Text restricted to the listed members.
	Enum(Vec<String>),
	/// Instant with time zone.
	DateTime,
	/// Calendar date.
	Date,
	/// Time of day.
	Time,
	/// Span of time.
	Duration,
	/// Declared type the seeder has no generator for.
	Unsupported(String),
}

impl LogicalType {
	/// Maps a declared SQL column type onto a logical type.
	///
	/// Matching is by substring, the way SQLite assigns type affinity, so
	/// `VARCHAR(255)` is a string and `BIGINT` an integer. Order matters:
	/// `DATETIME` must be tested before `DATE` and `TIME`, `INTERVAL` before
	/// `INT`.
	pub fn from_declared(declared: &str) -> Self {
		let upper = declared.trim().to_uppercase();

		if upper.contains("UUID") {
			LogicalType::Uuid
		} else if upper.contains("BOOL") {
			LogicalType::Boolean
		} else if upper.contains("TIMESTAMP") || upper.contains("DATETIME") {
			LogicalType::DateTime
		} else if upper.contains("INTERVAL") || upper.contains("DURATION") {
			LogicalType::Duration
		} else if upper.contains("DATE") {
			LogicalType::Date
		} else if upper.contains("TIME") {
			LogicalType::Time
		} else if upper.contains("INT") {
			LogicalType::Integer
		} else if ["REAL", "FLOA", "DOUB", "NUMERIC", "DECIMAL"]
			.iter()
			.any(|marker| upper.contains(marker))
		{
			LogicalType::Float
		} else if upper.is_empty()
			|| ["CHAR", "TEXT", "CLOB", "STRING"]
				.iter()
				.any(|marker| upper.contains(marker))
		{
			LogicalType::String
		} else {
			LogicalType::Unsupported(declared.trim().to_string())
		}
	}

	/// Returns true for free-text columns.
	pub fn is_string(&self) -> bool {
		matches!(self, LogicalType::String)
	}
}

/// Column referenced by a foreign key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyTarget {
	/// Referenced table.
	pub table: String,
	/// Referenced column.
	pub column: String,
}

/// Column metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
	/// Column name.
	pub name: String,
	/// Logical type.
	pub logical_type: LogicalType,
	/// Whether NULL is accepted.
	pub nullable: bool,
	/// The store computes a value when none is given.
	pub server_default: bool,
	/// The application supplies a value when none is given.
	pub client_default: bool,
	/// Identity column assigned by the store (SQLite rowid alias).
	pub auto_increment: bool,
	/// Values must be unique across the table.
	pub unique: bool,
	/// Referenced column, if this column is a foreign key.
	pub foreign_key: Option<ForeignKeyTarget>,
}

impl ColumnDescriptor {
	/// Creates a nullable column with no defaults, constraints or references.
	pub fn new(name: impl Into<String>, logical_type: LogicalType) -> Self {
		Self {
			name: name.into(),
			logical_type,
			nullable: true,
			server_default: false,
			client_default: false,
			auto_increment: false,
			unique: false,
			foreign_key: None,
		}
	}

	/// Marks the column NOT NULL.
	pub fn required(mut self) -> Self {
		self.nullable = false;
		self
	}

	/// Marks the column unique.
	pub fn unique(mut self) -> Self {
		self.unique = true;
		self
	}

	/// Marks the column as having a store-side default.
	pub fn with_server_default(mut self) -> Self {
		self.server_default = true;
		self
	}

	/// Marks the column as having an application-side default.
	pub fn with_client_default(mut self) -> Self {
		self.client_default = true;
		self
	}

	/// Marks the column as a store-assigned identity.
	pub fn auto_increment(mut self) -> Self {
		self.auto_increment = true;
		self
	}

	/// Points the column at `table.column`.
	pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
		self.foreign_key = Some(ForeignKeyTarget {
			table: table.into(),
			column: column.into(),
		});
		self
	}

	/// True when some default exists, on either side.
	pub fn has_default(&self) -> bool {
		self.server_default || self.client_default || self.auto_increment
	}

	/// A row cannot be stored without a value for this column.
	pub fn is_required(&self) -> bool {
		!self.nullable && !self.has_default()
	}
}

/// Entity (table) metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDescriptor {
	/// Type name (PascalCase form of the table for reflected schemas).
	pub name: String,
	/// Underlying table name.
	pub table: String,
	/// Columns in declaration order.
	pub columns: Vec<ColumnDescriptor>,
	/// Foreign key column pairs that must never hold the same key.
	///
	/// Only relationship-style entities (a follow, a friendship) carry these.
	/// Each pair is stored in name order.
	pub distinct_keys: Vec<(String, String)>,
}

impl EntityDescriptor {
	/// Creates an entity from its columns.
	pub fn new(
		name: impl Into<String>,
		table: impl Into<String>,
		columns: Vec<ColumnDescriptor>,
	) -> Self {
		Self {
			name: name.into(),
			table: table.into(),
			columns,
			distinct_keys: Vec::new(),
		}
	}

	/// Declares that foreign keys `a` and `b` must differ within a row.
	///
	/// Ignored unless both columns reference the same table.
	pub fn with_distinct_keys(mut self, a: &str, b: &str) -> Self {
		if a == b || !self.shares_target(a, b) {
			return self;
		}
		let pair = if a < b {
			(a.to_string(), b.to_string())
		} else {
			(b.to_string(), a.to_string())
		};
		if !self.distinct_keys.contains(&pair) {
			self.distinct_keys.push(pair);
		}
		self
	}

	/// Columns that must not repeat the key held by `column`.
	pub fn distinct_partners<'s>(&'s self, column: &'s str) -> impl Iterator<Item = &'s str> + 's {
		self.distinct_keys.iter().filter_map(move |(a, b)| {
			if a == column {
				Some(b.as_str())
			} else if b == column {
				Some(a.as_str())
			} else {
				None
			}
		})
	}

	/// Returns true if `a` and `b` are foreign keys into the same table.
	pub fn shares_target(&self, a: &str, b: &str) -> bool {
		let target = |name: &str| {
			self.column(name)
				.and_then(|column| column.foreign_key.as_ref())
				.map(|fk| fk.table.as_str())
		};
		matches!((target(a), target(b)), (Some(x), Some(y)) if x == y)
	}

	/// Looks up a column by name.
	pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
		self.columns.iter().find(|column| column.name == name)
	}

	/// Columns carrying a foreign key.
	pub fn foreign_key_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
		self.columns.iter().filter(|column| column.foreign_key.is_some())
	}

	/// Tables this entity references, other than itself.
	pub fn dependencies(&self) -> Vec<String> {
		let mut deps: Vec<String> = self
			.foreign_key_columns()
			.filter_map(|column| column.foreign_key.as_ref())
			.map(|target| target.table.clone())
			.filter(|table| *table != self.table)
			.collect();
		deps.sort();
		deps.dedup();
		deps
	}
}
