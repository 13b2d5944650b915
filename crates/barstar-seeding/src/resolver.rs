//! Foreign key resolution.
//!
//! A foreign key column is filled by reusing a key that already exists in the
//! referenced table. When none is usable the referenced row is manufactured on
//! the spot, unless that would recurse into an entity already being built.

use std::collections::BTreeSet;

use futures::future::BoxFuture;
use rand::seq::SliceRandom;

use crate::error::SeedingResult;
use crate::faker::FakeDataProvider;
use crate::generator::RowFactory;
use crate::persistence::{PersistenceGateway, persist_returning};
use crate::schema::{ColumnDescriptor, EntityDescriptor};
use crate::value::{FieldValue, RowDraft};

/// Savepoint wrapping one manufactured parent row and its own parents.
const MANUFACTURE_SAVEPOINT: &str = "seed_manufacture";

/// Tables under construction in the current call chain.
///
/// Passed down by reference; each level of recursion works on its own
/// extended copy, so siblings never see each other's entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecursionGuard {
	tables: BTreeSet<String>,
}

impl RecursionGuard {
	/// Guard for a top-level row of `table`.
	pub fn root(table: &str) -> Self {
		Self::default().with(table)
	}

	/// Returns true if `table` is already being built.
	pub fn contains(&self, table: &str) -> bool {
		self.tables.contains(table)
	}

	/// A copy of this guard that also covers `table`.
	pub fn with(&self, table: &str) -> Self {
		let mut tables = self.tables.clone();
		tables.insert(table.to_string());
		Self { tables }
	}

	/// Number of tables covered.
	pub fn depth(&self) -> usize {
		self.tables.len()
	}
}

impl<'a, G, P> RowFactory<'a, G, P>
where
	G: PersistenceGateway + ?Sized,
	P: FakeDataProvider + ?Sized,
{
	/// Supplies a value for the foreign key `column` of `entity`.
	///
	/// Returns `Ok(None)` when the referenced entity is unknown, when
	/// manufacturing would recurse into an entity covered by `guard`, or when
	/// every reuse-or-manufacture round failed.
	pub fn resolve<'s>(
		&'s mut self,
		entity: &'s EntityDescriptor,
		column: &'s ColumnDescriptor,
		draft: &'s RowDraft,
		guard: &'s RecursionGuard,
	) -> BoxFuture<'s, SeedingResult<Option<FieldValue>>> {
		Box::pin(async move {
			let Some(reference) = column.foreign_key.as_ref() else {
				return Ok(None);
			};
			let entities = self.entities;
			let Some(target) = entities.get(&reference.table) else {
				tracing::warn!(
					table = %entity.table,
					column = %column.name,
					target = %reference.table,
					"Foreign key references an unknown table"
				);
				return Ok(None);
			};

			// Relationship-style entities never pair a key with itself
			let taken: Vec<&FieldValue> = entity
				.distinct_partners(&column.name)
				.filter_map(|other| draft.get(other))
				.filter(|value| !value.is_null())
				.collect();

			for round in 1..=self.options.manufacture_attempts.max(1) {
				let mut candidates = self
					.gateway
					.select_values(target, &reference.column, self.options.candidate_limit)
					.await?;
				candidates.shuffle(self.faker.rng());

				if let Some(value) = candidates.into_iter().find(|c| !taken.contains(&c)) {
					return Ok(Some(value));
				}

				if guard.contains(&target.table) {
					tracing::debug!(
						table = %entity.table,
						column = %column.name,
						target = %target.table,
						"No reusable key and target is already under construction"
					);
					return Ok(None);
				}

				match self.manufacture(target, guard).await? {
					Some(stored) => {
						let key = stored
							.get(&reference.column)
							.filter(|value| !value.is_null())
							.cloned();
						if key.is_some() {
							return Ok(key);
						}
					}
					None => {
						tracing::debug!(
							table = %entity.table,
							column = %column.name,
							target = %target.table,
							round,
							"Manufacturing referenced row failed"
						);
					}
				}
			}

			Ok(None)
		})
	}

	/// Generates and stores one row of `target`, returning it as stored.
	///
	/// The row and any parents created for it roll back together on failure.
	async fn manufacture(
		&mut self,
		target: &EntityDescriptor,
		guard: &RecursionGuard,
	) -> SeedingResult<Option<RowDraft>> {
		let nested = guard.with(&target.table);
		self.gateway.begin_savepoint(MANUFACTURE_SAVEPOINT).await?;

		let stored = match self.generate(target, &nested).await {
			Ok(Some(parent)) => persist_returning(&mut *self.gateway, target, &parent).await,
			Ok(None) => Ok(None),
			Err(error) => Err(error),
		};

		match stored {
			Ok(Some(row)) => {
				self.gateway.release_savepoint(MANUFACTURE_SAVEPOINT).await?;
				tracing::debug!(table = %target.table, depth = nested.depth(), "Manufactured referenced row");
				Ok(Some(row))
			}
			Ok(None) => {
				self.gateway.rollback_savepoint(MANUFACTURE_SAVEPOINT).await?;
				Ok(None)
			}
			Err(error) => {
				if let Err(rollback_error) =
					self.gateway.rollback_savepoint(MANUFACTURE_SAVEPOINT).await
				{
					tracing::error!(error = %rollback_error, "Failed to roll back manufactured row");
				}
				Err(error)
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use super::*;
	use crate::config::SeedOptions;
	use crate::faker::FakerProvider;
	use crate::persistence::ViolationKind;
	use crate::persistence::testing::MemoryGateway;
	use crate::schema::LogicalType;
	use rstest::{fixture, rstest};
	use uuid::Uuid;

	fn users() -> EntityDescriptor {
		EntityDescriptor::new(
			"Users",
			"users",
			vec![ColumnDescriptor::new("id", LogicalType::Uuid).required().unique()],
		)
	}

	fn followers() -> EntityDescriptor {
		EntityDescriptor::new(
			"Followers",
			"followers",
			vec![
				ColumnDescriptor::new("follower_id", LogicalType::Uuid)
					.required()
					.references("users", "id"),
				ColumnDescriptor::new("followed_id", LogicalType::Uuid)
					.required()
					.references("users", "id"),
			],
		)
		.with_distinct_keys("follower_id", "followed_id")
	}

	fn posts() -> EntityDescriptor {
		EntityDescriptor::new(
			"Posts",
			"posts",
			vec![
				ColumnDescriptor::new("id", LogicalType::Uuid).required().unique(),
				ColumnDescriptor::new("author_id", LogicalType::Uuid)
					.required()
					.references("users", "id"),
				ColumnDescriptor::new("last_editor_id", LogicalType::Uuid)
					.required()
					.references("users", "id"),
			],
		)
	}

	fn comments() -> EntityDescriptor {
		EntityDescriptor::new(
			"Comments",
			"comments",
			vec![
				ColumnDescriptor::new("id", LogicalType::Uuid).required().unique(),
				ColumnDescriptor::new("parent_id", LogicalType::Uuid)
					.required()
					.references("comments", "id"),
			],
		)
	}

	#[fixture]
	fn entities() -> HashMap<String, EntityDescriptor> {
		[users(), followers(), comments(), posts()]
			.into_iter()
			.map(|e| (e.table.clone(), e))
			.collect()
	}

	fn user_row(id: Uuid) -> RowDraft {
		let mut row = RowDraft::new();
		row.set("id", FieldValue::Uuid(id));
		row
	}

	#[rstest]
	fn test_guard_copies_are_independent() {
		let root = RecursionGuard::root("followers");
		let nested = root.with("users");

		assert!(root.contains("followers"));
		assert!(!root.contains("users"));
		assert!(nested.contains("users"));
		assert_eq!(nested.depth(), 2);
	}

	#[rstest]
	#[tokio::test]
	async fn test_reuses_existing_key(entities: HashMap<String, EntityDescriptor>) {
		let id = Uuid::new_v4();
		let mut gateway = MemoryGateway::new().with_rows("users", vec![user_row(id)]);
		let mut faker = FakerProvider::with_seed(1);
		let options = SeedOptions::default();
		let mut factory = RowFactory::new(&entities, &mut gateway, &mut faker, &options);
		let entity = followers();

		let value = factory
			.resolve(
				&entity,
				&entity.columns[0],
				&RowDraft::new(),
				&RecursionGuard::root("followers"),
			)
			.await
			.unwrap();

		assert_eq!(value, Some(FieldValue::Uuid(id)));
		assert_eq!(gateway.inserts, 0);
	}

	#[rstest]
	#[tokio::test]
	async fn test_same_target_conflict_forces_new_parent(
		entities: HashMap<String, EntityDescriptor>,
	) {
		let id = Uuid::new_v4();
		let mut gateway = MemoryGateway::new().with_rows("users", vec![user_row(id)]);
		let mut faker = FakerProvider::with_seed(2);
		let options = SeedOptions::default();
		let mut factory = RowFactory::new(&entities, &mut gateway, &mut faker, &options);
		let entity = followers();
		let mut draft = RowDraft::new();
		draft.set("follower_id", FieldValue::Uuid(id));

		let value = factory
			.resolve(
				&entity,
				&entity.columns[1],
				&draft,
				&RecursionGuard::root("followers"),
			)
			.await
			.unwrap();

		let Some(FieldValue::Uuid(other)) = value else {
			panic!("expected a manufactured key, got {:?}", value);
		};
		assert_ne!(other, id);
		assert_eq!(gateway.count("users"), 2);
	}

	#[rstest]
	#[tokio::test]
	async fn test_plain_entity_may_repeat_a_key(entities: HashMap<String, EntityDescriptor>) {
		let id = Uuid::new_v4();
		let mut gateway = MemoryGateway::new().with_rows("users", vec![user_row(id)]);
		let mut faker = FakerProvider::with_seed(6);
		let options = SeedOptions::default();
		let mut factory = RowFactory::new(&entities, &mut gateway, &mut faker, &options);
		let entity = posts();

		let draft = factory
			.generate(&entity, &RecursionGuard::root("posts"))
			.await
			.unwrap()
			.unwrap();

		assert_eq!(draft.get("author_id"), Some(&FieldValue::Uuid(id)));
		assert_eq!(draft.get("last_editor_id"), Some(&FieldValue::Uuid(id)));
		assert_eq!(gateway.count("users"), 1);
		assert_eq!(gateway.inserts, 0);
	}

	#[rstest]
	#[tokio::test]
	async fn test_recursion_guard_stops_self_reference(
		entities: HashMap<String, EntityDescriptor>,
	) {
		let mut gateway = MemoryGateway::new();
		let mut faker = FakerProvider::with_seed(3);
		let options = SeedOptions::default();
		let mut factory = RowFactory::new(&entities, &mut gateway, &mut faker, &options);
		let entity = comments();

		let value = factory
			.resolve(
				&entity,
				&entity.columns[1],
				&RowDraft::new(),
				&RecursionGuard::root("comments"),
			)
			.await
			.unwrap();

		assert_eq!(value, None);
		assert_eq!(gateway.inserts, 0);
	}

	#[rstest]
	#[tokio::test]
	async fn test_rejected_manufacture_retries_then_gives_up(
		entities: HashMap<String, EntityDescriptor>,
	) {
		let mut gateway = MemoryGateway::new();
		for _ in 0..3 {
			gateway.reject_next(ViolationKind::Unique);
		}
		let mut faker = FakerProvider::with_seed(4);
		let options = SeedOptions::default();
		let mut factory = RowFactory::new(&entities, &mut gateway, &mut faker, &options);
		let entity = followers();

		let value = factory
			.resolve(
				&entity,
				&entity.columns[0],
				&RowDraft::new(),
				&RecursionGuard::root("followers"),
			)
			.await
			.unwrap();

		assert_eq!(value, None);
		assert_eq!(gateway.inserts, options.manufacture_attempts);
		assert_eq!(gateway.count("users"), 0);
		assert!(gateway.savepoints.is_empty());
	}

	#[rstest]
	#[tokio::test]
	async fn test_rejected_manufacture_then_success(entities: HashMap<String, EntityDescriptor>) {
		let mut gateway = MemoryGateway::new();
		gateway.reject_next(ViolationKind::Unique);
		let mut faker = FakerProvider::with_seed(5);
		let options = SeedOptions::default();
		let mut factory = RowFactory::new(&entities, &mut gateway, &mut faker, &options);
		let entity = followers();

		let value = factory
			.resolve(
				&entity,
				&entity.columns[0],
				&RowDraft::new(),
				&RecursionGuard::root("followers"),
			)
			.await
			.unwrap();

		assert!(matches!(value, Some(FieldValue::Uuid(_))));
		assert_eq!(gateway.inserts, 2);
		assert_eq!(gateway.count("users"), 1);
	}
}
