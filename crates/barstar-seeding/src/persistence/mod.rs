//! Persistence gateway and the persistence driver built on it.
//!
//! The gateway is the seeder's only route to the backing store. Constraint
//! rejections are an ordinary [`InsertOutcome`]; every other failure is a
//! [`SeedingError`](crate::error::SeedingError) and stops the run.

pub mod sqlite;

use std::fmt;

use async_trait::async_trait;

pub use sqlite::{SqliteGateway, connect_pool};

use crate::error::SeedingResult;
use crate::schema::EntityDescriptor;
use crate::value::{FieldValue, RowDraft};

/// Savepoint wrapping one insert.
const INSERT_SAVEPOINT: &str = "seed_insert";

/// Which constraint rejected a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
	/// Unique or primary key constraint.
	Unique,
	/// Foreign key constraint.
	ForeignKey,
	/// NOT NULL constraint.
	NotNull,
	/// CHECK constraint.
	Check,
}

impl fmt::Display for ViolationKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			ViolationKind::Unique => "unique",
			ViolationKind::ForeignKey => "foreign key",
			ViolationKind::NotNull => "not null",
			ViolationKind::Check => "check",
		};
		f.write_str(name)
	}
}

/// A row rejected by a store constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintViolation {
	/// Constraint category.
	pub kind: ViolationKind,
	/// Message reported by the store.
	pub message: String,
}

/// Result of a single insert.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
	/// The row was stored; carries every column as the store holds it.
	Inserted(RowDraft),
	/// A constraint rejected the row.
	Rejected(ConstraintViolation),
}

/// Operations the seeder needs from the backing store.
#[async_trait]
pub trait PersistenceGateway: Send {
	/// Up to `limit` non-null values of `column` already stored for `entity`.
	async fn select_values(
		&mut self,
		entity: &EntityDescriptor,
		column: &str,
		limit: usize,
	) -> SeedingResult<Vec<FieldValue>>;

	/// Inserts one row.
	async fn insert(&mut self, entity: &EntityDescriptor, row: &RowDraft)
	-> SeedingResult<InsertOutcome>;

	/// Deletes every row of `table`, returning how many were removed.
	async fn delete_all(&mut self, table: &str) -> SeedingResult<u64>;

	/// Number of rows stored in `table`.
	async fn count_rows(&mut self, table: &str) -> SeedingResult<u64>;

	/// Opens a nested transactional scope.
	async fn begin_savepoint(&mut self, name: &str) -> SeedingResult<()>;

	/// Keeps the work done since the matching [`begin_savepoint`](Self::begin_savepoint).
	async fn release_savepoint(&mut self, name: &str) -> SeedingResult<()>;

	/// Discards the work done since the matching [`begin_savepoint`](Self::begin_savepoint).
	async fn rollback_savepoint(&mut self, name: &str) -> SeedingResult<()>;
}

/// Stores `draft` as a row of `entity`.
///
/// Returns `false` after rolling back just this insert when a constraint
/// rejects the row. Other failures are returned as errors.
pub async fn persist<G>(gateway: &mut G, entity: &EntityDescriptor, draft: &RowDraft) -> SeedingResult<bool>
where
	G: PersistenceGateway + ?Sized,
{
	Ok(persist_returning(gateway, entity, draft).await?.is_some())
}

/// Like [`persist`], but hands back the stored row on success.
pub async fn persist_returning<G>(
	gateway: &mut G,
	entity: &EntityDescriptor,
	draft: &RowDraft,
) -> SeedingResult<Option<RowDraft>>
where
	G: PersistenceGateway + ?Sized,
{
	gateway.begin_savepoint(INSERT_SAVEPOINT).await?;

	match gateway.insert(entity, draft).await {
		Ok(InsertOutcome::Inserted(stored)) => {
			gateway.release_savepoint(INSERT_SAVEPOINT).await?;
			Ok(Some(stored))
		}
		Ok(InsertOutcome::Rejected(violation)) => {
			gateway.rollback_savepoint(INSERT_SAVEPOINT).await?;
			tracing::debug!(
				table = %entity.table,
				kind = %violation.kind,
				message = %violation.message,
				"Row rejected by constraint"
			);
			Ok(None)
		}
		Err(error) => {
			if let Err(rollback_error) = gateway.rollback_savepoint(INSERT_SAVEPOINT).await {
				tracing::error!(error = %rollback_error, "Failed to roll back insert");
			}
			Err(error)
		}
	}
}

#[cfg(test)]
pub(crate) mod testing {
	//! Scripted in-memory gateway for unit tests.

	use std::collections::{HashMap, VecDeque};

	use super::*;
	use crate::error::SeedingError;

	/// Gateway keeping rows in memory with an explicit savepoint log.
	#[derive(Debug, Default)]
	pub struct MemoryGateway {
		pub rows: HashMap<String, Vec<RowDraft>>,
		/// Outcomes handed out before falling back to accepting rows.
		pub scripted: VecDeque<SeedingResult<InsertOutcome>>,
		pub savepoints: Vec<(String, Vec<(String, usize)>)>,
		pub log: Vec<String>,
		pub inserts: usize,
	}

	impl MemoryGateway {
		pub fn new() -> Self {
			Self::default()
		}

		pub fn with_rows(mut self, table: &str, rows: Vec<RowDraft>) -> Self {
			self.rows.insert(table.to_string(), rows);
			self
		}

		pub fn reject_next(&mut self, kind: ViolationKind) {
			self.scripted.push_back(Ok(InsertOutcome::Rejected(ConstraintViolation {
				kind,
				message: "scripted".to_string(),
			})));
		}

		pub fn fail_next(&mut self) {
			self.scripted
				.push_back(Err(SeedingError::Database(sqlx::Error::PoolClosed)));
		}

		pub fn count(&self, table: &str) -> usize {
			self.rows.get(table).map_or(0, Vec::len)
		}

		fn snapshot(&self) -> Vec<(String, usize)> {
			self.rows.iter().map(|(t, r)| (t.clone(), r.len())).collect()
		}
	}

	#[async_trait]
	impl PersistenceGateway for MemoryGateway {
		async fn select_values(
			&mut self,
			entity: &EntityDescriptor,
			column: &str,
			limit: usize,
		) -> SeedingResult<Vec<FieldValue>> {
			Ok(self
				.rows
				.get(&entity.table)
				.map(|rows| {
					rows.iter()
						.filter_map(|row| row.get(column).cloned())
						.filter(|value| !value.is_null())
						.take(limit)
						.collect()
				})
				.unwrap_or_default())
		}

		async fn insert(
			&mut self,
			entity: &EntityDescriptor,
			row: &RowDraft,
		) -> SeedingResult<InsertOutcome> {
			self.inserts += 1;
			if let Some(outcome) = self.scripted.pop_front() {
				return outcome;
			}
			self.rows
				.entry(entity.table.clone())
				.or_default()
				.push(row.clone());
			Ok(InsertOutcome::Inserted(row.clone()))
		}

		async fn delete_all(&mut self, table: &str) -> SeedingResult<u64> {
			self.log.push(format!("delete {}", table));
			Ok(self.rows.remove(table).map_or(0, |rows| rows.len() as u64))
		}

		async fn count_rows(&mut self, table: &str) -> SeedingResult<u64> {
			Ok(self.count(table) as u64)
		}

		async fn begin_savepoint(&mut self, name: &str) -> SeedingResult<()> {
			self.log.push(format!("savepoint {}", name));
			let snapshot = self.snapshot();
			self.savepoints.push((name.to_string(), snapshot));
			Ok(())
		}

		async fn release_savepoint(&mut self, name: &str) -> SeedingResult<()> {
			self.log.push(format!("release {}", name));
			self.savepoints.pop();
			Ok(())
		}

		async fn rollback_savepoint(&mut self, name: &str) -> SeedingResult<()> {
			self.log.push(format!("rollback {}", name));
			if let Some((_, snapshot)) = self.savepoints.pop() {
				let sizes: HashMap<String, usize> = snapshot.into_iter().collect();
				for (table, rows) in self.rows.iter_mut() {
					rows.truncate(sizes.get(table).copied().unwrap_or(0));
				}
			}
			Ok(())
		}
	}
}

#[cfg(test)]
mod tests {
	use super::testing::MemoryGateway;
	use super::*;
	use crate::error::SeedingError;
	use rstest::rstest;

	fn entity() -> EntityDescriptor {
		EntityDescriptor::new("Users", "users", vec![])
	}

	fn draft() -> RowDraft {
		let mut draft = RowDraft::new();
		draft.set("email", FieldValue::Text("a@example.com".to_string()));
		draft
	}

	#[rstest]
	#[tokio::test]
	async fn test_persist_success_releases_savepoint() {
		let mut gateway = MemoryGateway::new();

		assert!(persist(&mut gateway, &entity(), &draft()).await.unwrap());
		assert_eq!(gateway.count("users"), 1);
		assert_eq!(gateway.log, vec!["savepoint seed_insert", "release seed_insert"]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_persist_rejection_rolls_back() {
		let mut gateway = MemoryGateway::new();
		gateway.reject_next(ViolationKind::Unique);

		assert!(!persist(&mut gateway, &entity(), &draft()).await.unwrap());
		assert_eq!(gateway.count("users"), 0);
		assert_eq!(gateway.log, vec!["savepoint seed_insert", "rollback seed_insert"]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_persist_fatal_error_propagates() {
		let mut gateway = MemoryGateway::new();
		gateway.fail_next();

		let result = persist(&mut gateway, &entity(), &draft()).await;
		assert!(matches!(result, Err(SeedingError::Database(_))));
		assert_eq!(gateway.log.last().map(String::as_str), Some("rollback seed_insert"));
	}

	#[rstest]
	fn test_violation_kind_display() {
		assert_eq!(ViolationKind::ForeignKey.to_string(), "foreign key");
	}
}
