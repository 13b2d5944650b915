//! Schema registry backed by a live SQLite database.
//!
//! Column facts come from `PRAGMA table_info`, `PRAGMA foreign_key_list` and
//! `PRAGMA index_list`/`index_info`. SQLite has no PRAGMA for CHECK
//! constraints, so enum members are parsed out of the `CREATE TABLE`
//! statement stored in `sqlite_master`.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use regex::Regex;
use sqlx::SqlitePool;

use super::{
	ColumnDescriptor, EntityDescriptor, ForeignKeyTarget, LogicalType, SchemaRegistry,
	resolve_entity_order, table_to_type_name,
};
use crate::error::{SeedingError, SeedingResult};
use crate::persistence::sqlite::quote_ident;

/// Bookkeeping table written by `sqlx::migrate!`.
const MIGRATIONS_TABLE: &str = "_sqlx_migrations";

#[derive(sqlx::FromRow)]
struct TableInfoRow {
	name: String,
	r#type: String,
	notnull: i64,
	dflt_value: Option<String>,
	pk: i64,
}

#[derive(sqlx::FromRow)]
struct ForeignKeyRow {
	table: String,
	from: String,
	to: Option<String>,
}

#[derive(sqlx::FromRow)]
struct IndexListRow {
	name: String,
	unique: i64,
}

#[derive(sqlx::FromRow)]
struct IndexInfoRow {
	name: Option<String>,
}

/// Reflects entity descriptors out of a SQLite database.
pub struct SqliteSchemaRegistry {
	pool: SqlitePool,
	client_defaults: HashMap<String, HashSet<String>>,
}

impl SqliteSchemaRegistry {
	/// Creates a registry reading from `pool`.
	pub fn new(pool: SqlitePool) -> Self {
		Self {
			pool,
			client_defaults: HashMap::new(),
		}
	}

	/// Declares columns whose value the application supplies at insert time.
	///
	/// SQLite has no notion of a client-side default, so these are taken from
	/// configuration and folded into [`ColumnDescriptor::client_default`].
	pub fn with_client_defaults(mut self, defaults: HashMap<String, Vec<String>>) -> Self {
		for (table, columns) in defaults {
			self.client_defaults
				.entry(table)
				.or_default()
				.extend(columns);
		}
		self
	}

	async fn table_names(&self) -> SeedingResult<Vec<String>> {
		let names: Vec<(String,)> = sqlx::query_as(
			"SELECT name FROM sqlite_master \
			 WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND name <> ? \
			 ORDER BY name",
		)
		.bind(MIGRATIONS_TABLE)
		.fetch_all(&self.pool)
		.await
		.map_err(introspection_error)?;

		Ok(names.into_iter().map(|(name,)| name).collect())
	}

	async fn table_info(&self, table: &str) -> SeedingResult<Vec<TableInfoRow>> {
		let query = format!("PRAGMA table_info({})", quote_ident(table));
		sqlx::query_as(&query)
			.fetch_all(&self.pool)
			.await
			.map_err(introspection_error)
	}

	async fn create_table_sql(&self, table: &str) -> SeedingResult<Option<String>> {
		let row: Option<(Option<String>,)> =
			sqlx::query_as("SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?")
				.bind(table)
				.fetch_optional(&self.pool)
				.await
				.map_err(introspection_error)?;

		Ok(row.and_then(|(sql,)| sql))
	}

	/// Column lists of the unique indexes made only of plain columns.
	///
	/// Composite primary keys show up here through their automatic index.
	async fn unique_indexes(&self, table: &str) -> SeedingResult<Vec<Vec<String>>> {
		let query = format!("PRAGMA index_list({})", quote_ident(table));
		let indexes: Vec<IndexListRow> = sqlx::query_as(&query)
			.fetch_all(&self.pool)
			.await
			.map_err(introspection_error)?;

		let mut unique = Vec::new();
		for index in indexes.into_iter().filter(|index| index.unique != 0) {
			let info_query = format!("PRAGMA index_info({})", quote_ident(&index.name));
			let info: Vec<IndexInfoRow> = sqlx::query_as(&info_query)
				.fetch_all(&self.pool)
				.await
				.map_err(introspection_error)?;

			// Expression parts have no column name
			let columns: Option<Vec<String>> = info.into_iter().map(|part| part.name).collect();
			if let Some(columns) = columns.filter(|columns| !columns.is_empty()) {
				unique.push(columns);
			}
		}

		Ok(unique)
	}

	async fn foreign_keys(&self, table: &str) -> SeedingResult<HashMap<String, ForeignKeyTarget>> {
		let query = format!("PRAGMA foreign_key_list({})", quote_ident(table));
		let rows: Vec<ForeignKeyRow> = sqlx::query_as(&query)
			.fetch_all(&self.pool)
			.await
			.map_err(introspection_error)?;

		let mut targets = HashMap::new();
		for row in rows {
			let column = match row.to {
				Some(column) => column,
				None => self.primary_key_column(&row.table).await?.ok_or_else(|| {
					SeedingError::Introspection(format!(
						"Foreign key {}.{} references {} which has no single-column primary key",
						table, row.from, row.table
					))
				})?,
			};
			targets.insert(
				row.from,
				ForeignKeyTarget {
					table: row.table,
					column,
				},
			);
		}

		Ok(targets)
	}

	async fn primary_key_column(&self, table: &str) -> SeedingResult<Option<String>> {
		let info = self.table_info(table).await?;
		let mut keys = info.into_iter().filter(|column| column.pk > 0);
		match (keys.next(), keys.next()) {
			(Some(column), None) => Ok(Some(column.name)),
			_ => Ok(None),
		}
	}

	async fn describe_table(&self, table: &str) -> SeedingResult<EntityDescriptor> {
		let info = self.table_info(table).await?;
		let mut key_groups = self.unique_indexes(table).await?;
		let foreign_keys = self.foreign_keys(table).await?;
		let checks = match self.create_table_sql(table).await? {
			Some(sql) => parse_check_constraints(&sql)?,
			None => CheckConstraints::default(),
		};
		let client_defaults = self.client_defaults.get(table);

		let unique: HashSet<String> = key_groups
			.iter()
			.filter_map(|columns| match columns.as_slice() {
				[column] => Some(column.clone()),
				_ => None,
			})
			.collect();
		let primary_key: Vec<String> = info
			.iter()
			.filter(|column| column.pk > 0)
			.map(|column| column.name.clone())
			.collect();
		let pk_count = primary_key.len();
		key_groups.push(primary_key);

		let columns = info
			.into_iter()
			.map(|row| {
				let single_pk = row.pk > 0 && pk_count == 1;
				let logical_type = match checks.enums.get(&row.name) {
					Some(members) => LogicalType::Enum(members.clone()),
					None => LogicalType::from_declared(&row.r#type),
				};

				ColumnDescriptor {
					nullable: row.notnull == 0 && row.pk == 0,
					server_default: row
						.dflt_value
						.as_deref()
						.is_some_and(|value| !value.eq_ignore_ascii_case("NULL")),
					client_default: client_defaults.is_some_and(|cols| cols.contains(&row.name)),
					// Only `INTEGER PRIMARY KEY` aliases the rowid
					auto_increment: single_pk && row.r#type.eq_ignore_ascii_case("INTEGER"),
					unique: single_pk || unique.contains(&row.name),
					foreign_key: foreign_keys.get(&row.name).cloned(),
					logical_type,
					name: row.name,
				}
			})
			.collect();

		let mut entity = EntityDescriptor::new(table_to_type_name(table), table, columns);

		// A pair of same-target keys that must differ, or that together form
		// a key, marks a relationship-style entity
		for (a, b) in &checks.distinct {
			entity = entity.with_distinct_keys(a, b);
		}
		for group in &key_groups {
			for (i, a) in group.iter().enumerate() {
				for b in &group[i + 1..] {
					entity = entity.with_distinct_keys(a, b);
				}
			}
		}

		Ok(entity)
	}
}

#[async_trait]
impl SchemaRegistry for SqliteSchemaRegistry {
	async fn list_entities(&self) -> SeedingResult<Vec<EntityDescriptor>> {
		let mut entities = Vec::new();
		for table in self.table_names().await? {
			entities.push(self.describe_table(&table).await?);
		}

		tracing::debug!(count = entities.len(), "Reflected SQLite schema");
		Ok(resolve_entity_order(entities))
	}

	async fn columns(&self, table: &str) -> SeedingResult<Vec<ColumnDescriptor>> {
		if self.create_table_sql(table).await?.is_none() {
			return Err(SeedingError::Introspection(format!("Unknown table: {}", table)));
		}
		Ok(self.describe_table(table).await?.columns)
	}
}

fn introspection_error(error: sqlx::Error) -> SeedingError {
	SeedingError::Introspection(error.to_string())
}

/// Facts recovered from the CHECK clauses of a `CREATE TABLE` statement.
#[derive(Debug, Default)]
struct CheckConstraints {
	/// Column name to members, in declaration order, from `col IN (...)`.
	enums: HashMap<String, Vec<String>>,
	/// Column pairs from `a <> b` or `a != b`.
	distinct: Vec<(String, String)>,
}

fn parse_check_constraints(create_sql: &str) -> SeedingResult<CheckConstraints> {
	let check_pattern = Regex::new(r"(?i)\bCHECK\s*\(")
		.map_err(|e| SeedingError::Introspection(e.to_string()))?;
	let in_pattern = Regex::new(r#"(?is)^["`\[]?(\w+)["`\]]?\s+IN\s*\((.*)\)$"#)
		.map_err(|e| SeedingError::Introspection(e.to_string()))?;
	let distinct_pattern =
		Regex::new(r#"(?s)^["`\[]?(\w+)["`\]]?\s*(?:<>|!=)\s*["`\[]?(\w+)["`\]]?$"#)
			.map_err(|e| SeedingError::Introspection(e.to_string()))?;

	let mut checks = CheckConstraints::default();
	for m in check_pattern.find_iter(create_sql) {
		let Some(expr) = extract_parenthesized_expression(create_sql, m.end() - 1) else {
			continue;
		};

		if let Some(caps) = in_pattern.captures(&expr) {
			let members: Vec<String> = caps[2]
				.split(',')
				.map(|member| member.trim().trim_matches('\'').to_string())
				.filter(|member| !member.is_empty())
				.collect();
			if !members.is_empty() {
				checks.enums.insert(caps[1].to_string(), members);
			}
		} else if let Some(caps) = distinct_pattern.captures(&expr) {
			checks
				.distinct
				.push((caps[1].to_string(), caps[2].to_string()));
		}
	}

	Ok(checks)
}

/// Content between the parenthesis at byte `start` and its match.
fn extract_parenthesized_expression(sql: &str, start: usize) -> Option<String> {
	if sql.as_bytes().get(start) != Some(&b'(') {
		return None;
	}

	let mut depth = 0usize;
	for (offset, c) in sql[start..].char_indices() {
		match c {
			'(' => depth += 1,
			')' => {
				depth -= 1;
				if depth == 0 {
					return Some(sql[start + 1..start + offset].trim().to_string());
				}
			}
			_ => {}
		}
	}

	None
}
