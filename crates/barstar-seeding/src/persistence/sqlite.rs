//! SQLite persistence gateway.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::error::ErrorKind;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, Sqlite, SqlitePool, TypeInfo, ValueRef};
use uuid::Uuid;

use super::{ConstraintViolation, InsertOutcome, PersistenceGateway, ViolationKind};
use crate::error::SeedingResult;
use crate::schema::{EntityDescriptor, LogicalType};
use crate::value::{FieldValue, RowDraft};

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S%.6f";

/// Double-quotes an identifier, escaping embedded quotes.
pub fn quote_ident(name: &str) -> String {
	format!("\"{}\"", name.replace('"', "\"\""))
}

/// Opens a pool on `url`, creating the database file if needed.
///
/// Foreign key enforcement is switched on for every connection.
pub async fn connect_pool(url: &str) -> SeedingResult<SqlitePool> {
	let options = SqliteConnectOptions::from_str(url)?
		.create_if_missing(true)
		.foreign_keys(true);

	let pool = SqlitePoolOptions::new()
		.max_connections(4)
		.connect_with(options)
		.await?;

	Ok(pool)
}

/// [`PersistenceGateway`] over one SQLite connection.
///
/// Savepoints are only meaningful on a single connection, so the gateway
/// holds one for its whole lifetime.
pub struct SqliteGateway {
	conn: PoolConnection<Sqlite>,
}

impl SqliteGateway {
	/// Wraps an already acquired connection.
	pub fn new(conn: PoolConnection<Sqlite>) -> Self {
		Self { conn }
	}

	/// Acquires a connection from `pool`.
	pub async fn acquire(pool: &SqlitePool) -> SeedingResult<Self> {
		Ok(Self::new(pool.acquire().await?))
	}

	async fn execute(&mut self, sql: &str) -> SeedingResult<u64> {
		let result = sqlx::query(sql).execute(&mut *self.conn).await?;
		Ok(result.rows_affected())
	}
}

#[async_trait]
impl PersistenceGateway for SqliteGateway {
	async fn select_values(
		&mut self,
		entity: &EntityDescriptor,
		column: &str,
		limit: usize,
	) -> SeedingResult<Vec<FieldValue>> {
		let sql = format!(
			"SELECT {col} FROM {table} WHERE {col} IS NOT NULL LIMIT ?",
			col = quote_ident(column),
			table = quote_ident(&entity.table),
		);
		let rows = sqlx::query(&sql)
			.bind(i64::try_from(limit).unwrap_or(i64::MAX))
			.fetch_all(&mut *self.conn)
			.await?;

		let logical_type = entity.column(column).map(|c| &c.logical_type);
		rows.iter()
			.map(|row| decode_value(row, 0, logical_type))
			.collect()
	}

	async fn insert(
		&mut self,
		entity: &EntityDescriptor,
		row: &RowDraft,
	) -> SeedingResult<InsertOutcome> {
		let table = quote_ident(&entity.table);
		let sql = if row.is_empty() {
			format!("INSERT INTO {} DEFAULT VALUES RETURNING *", table)
		} else {
			let columns: Vec<String> = row.iter().map(|(name, _)| quote_ident(name)).collect();
			let placeholders = vec!["?"; columns.len()].join(", ");
			format!(
				"INSERT INTO {} ({}) VALUES ({}) RETURNING *",
				table,
				columns.join(", "),
				placeholders
			)
		};

		let mut query = sqlx::query(&sql);
		for (_, value) in row.iter() {
			query = bind_value(query, value);
		}

		match query.fetch_one(&mut *self.conn).await {
			Ok(stored) => Ok(InsertOutcome::Inserted(decode_row(entity, &stored)?)),
			Err(error) => match violation_kind(&error) {
				Some(kind) => Ok(InsertOutcome::Rejected(ConstraintViolation {
					kind,
					message: error.to_string(),
				})),
				None => Err(error.into()),
			},
		}
	}

	async fn delete_all(&mut self, table: &str) -> SeedingResult<u64> {
		self.execute(&format!("DELETE FROM {}", quote_ident(table)))
			.await
	}

	async fn count_rows(&mut self, table: &str) -> SeedingResult<u64> {
		let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
		let (count,): (i64,) = sqlx::query_as(&sql).fetch_one(&mut *self.conn).await?;
		Ok(count.max(0) as u64)
	}

	async fn begin_savepoint(&mut self, name: &str) -> SeedingResult<()> {
		self.execute(&format!("SAVEPOINT {}", quote_ident(name)))
			.await?;
		Ok(())
	}

	async fn release_savepoint(&mut self, name: &str) -> SeedingResult<()> {
		self.execute(&format!("RELEASE SAVEPOINT {}", quote_ident(name)))
			.await?;
		Ok(())
	}

	async fn rollback_savepoint(&mut self, name: &str) -> SeedingResult<()> {
		let name = quote_ident(name);
		// ROLLBACK TO leaves the savepoint open
		self.execute(&format!("ROLLBACK TO SAVEPOINT {}", name))
			.await?;
		self.execute(&format!("RELEASE SAVEPOINT {}", name))
			.await?;
		Ok(())
	}
}

fn bind_value<'q>(query: SqliteQuery<'q>, value: &FieldValue) -> SqliteQuery<'q> {
	match value {
		FieldValue::Null => query.bind(None::<String>),
		FieldValue::Text(v) => query.bind(v.clone()),
		FieldValue::Integer(v) => query.bind(*v),
		FieldValue::Float(v) => query.bind(*v),
		FieldValue::Boolean(v) => query.bind(i64::from(*v)),
		FieldValue::Duration(v) => query.bind(v.num_seconds()),
		FieldValue::Bytes(v) => query.bind(v.clone()),
		FieldValue::Uuid(_) | FieldValue::DateTime(_) | FieldValue::Date(_) | FieldValue::Time(_) => {
			query.bind(encode_text(value))
		}
	}
}

/// Text form of the values SQLite stores as TEXT under a richer type.
fn encode_text(value: &FieldValue) -> Option<String> {
	match value {
		FieldValue::Uuid(v) => Some(v.hyphenated().to_string()),
		FieldValue::DateTime(v) => Some(v.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)),
		FieldValue::Date(v) => Some(v.format(DATE_FORMAT).to_string()),
		FieldValue::Time(v) => Some(v.format(TIME_FORMAT).to_string()),
		_ => None,
	}
}

fn decode_row(entity: &EntityDescriptor, row: &SqliteRow) -> SeedingResult<RowDraft> {
	let mut draft = RowDraft::new();
	for (index, column) in row.columns().iter().enumerate() {
		let logical_type = entity.column(column.name()).map(|c| &c.logical_type);
		draft.set(column.name(), decode_value(row, index, logical_type)?);
	}
	Ok(draft)
}

/// Decodes one value by its storage class.
///
/// Text stays byte-for-byte what the store holds so that a reused key binds
/// back to an equal value. Text is lifted to the column's logical type only
/// when it is exactly the form [`encode_text`] writes.
fn decode_value(
	row: &SqliteRow,
	index: usize,
	logical_type: Option<&LogicalType>,
) -> SeedingResult<FieldValue> {
	let raw = row.try_get_raw(index)?;
	if raw.is_null() {
		return Ok(FieldValue::Null);
	}
	let storage = raw.type_info().name().to_uppercase();

	let value = match storage.as_str() {
		"INTEGER" => {
			let v: i64 = row.try_get_unchecked(index)?;
			match logical_type {
				Some(LogicalType::Boolean) => FieldValue::Boolean(v != 0),
				Some(LogicalType::Duration) => chrono::TimeDelta::try_seconds(v)
					.map(FieldValue::Duration)
					.unwrap_or(FieldValue::Integer(v)),
				_ => FieldValue::Integer(v),
			}
		}
		"REAL" => FieldValue::Float(row.try_get_unchecked(index)?),
		"BLOB" => FieldValue::Bytes(row.try_get_unchecked(index)?),
		_ => decode_text(row.try_get_unchecked(index)?, logical_type),
	};

	Ok(value)
}

fn decode_text(text: String, logical_type: Option<&LogicalType>) -> FieldValue {
	let lifted = match logical_type {
		Some(LogicalType::Uuid) => Uuid::parse_str(&text).ok().map(FieldValue::Uuid),
		Some(LogicalType::DateTime) => chrono::DateTime::parse_from_rfc3339(&text)
			.ok()
			.map(|v| FieldValue::DateTime(v.with_timezone(&chrono::Utc))),
		Some(LogicalType::Date) => chrono::NaiveDate::parse_from_str(&text, DATE_FORMAT)
			.ok()
			.map(FieldValue::Date),
		Some(LogicalType::Time) => chrono::NaiveTime::parse_from_str(&text, TIME_FORMAT)
			.ok()
			.map(FieldValue::Time),
		_ => None,
	};

	match lifted {
		Some(value) if encode_text(&value).as_deref() == Some(text.as_str()) => value,
		_ => FieldValue::Text(text),
	}
}

fn violation_kind(error: &sqlx::Error) -> Option<ViolationKind> {
	let sqlx::Error::Database(db_error) = error else {
		return None;
	};
	match db_error.kind() {
		ErrorKind::UniqueViolation => Some(ViolationKind::Unique),
		ErrorKind::ForeignKeyViolation => Some(ViolationKind::ForeignKey),
		ErrorKind::NotNullViolation => Some(ViolationKind::NotNull),
		ErrorKind::CheckViolation => Some(ViolationKind::Check),
		_ => None,
	}
}
