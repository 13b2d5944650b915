//! End-to-end seeding runs against on-disk SQLite databases.

mod helpers;

use barstar_seeding::prelude::*;
use helpers::database::TestDatabase;
use rstest::rstest;

const BUNDLED_TABLES: &[&str] = &[
	"user",
	"users",
	"venues",
	"operators",
	"operator_venues",
	"followers",
	"friends",
	"footsteps",
	"userlocation",
];

#[rstest]
#[tokio::test]
async fn test_allow_listed_entity_is_seeded_alone() {
	let db = TestDatabase::migrated().await;

	let report = db
		.seed(&["Users"], SeedOptions::new().with_count(5).with_attempts(5))
		.await
		.unwrap();

	let users = report.entity("users").unwrap();
	assert_eq!(users.created, 5);
	assert_eq!(users.skipped, 0);
	assert_eq!(report.entities.len(), 1);
	assert_eq!(db.count("users").await, 5);
	for table in BUNDLED_TABLES.iter().filter(|t| **t != "users") {
		assert_eq!(db.count(table).await, 0, "{} was touched", table);
	}
}

#[rstest]
#[tokio::test]
async fn test_pair_constraints_allow_a_single_follow_between_two_users() {
	let db = TestDatabase::migrated().await;
	db.seed(&["users"], SeedOptions::new().with_count(2))
		.await
		.unwrap();

	let report = db
		.seed(&["followers"], SeedOptions::new().with_count(5).with_attempts(3))
		.await
		.unwrap();

	let followers = report.entity("followers").unwrap();
	assert_eq!(followers.created, 1);
	assert_eq!(followers.skipped, 4);
	assert_eq!(followers.attempts, 1 + 4 * 3);
	assert_eq!(db.count("followers").await, 1);
	assert_eq!(db.count("users").await, 2);
}

#[rstest]
#[tokio::test]
async fn test_unknown_table_aborts_before_any_insert() {
	let db = TestDatabase::migrated().await;

	let result = db.seed(&["ghosts"], SeedOptions::new()).await;

	assert!(matches!(
		result,
		Err(SeedingError::NoMatchingEntities { ref filter }) if filter == &vec!["ghosts".to_string()]
	));
	for table in BUNDLED_TABLES {
		assert_eq!(db.count(table).await, 0);
	}
}

#[rstest]
#[tokio::test]
async fn test_clear_twice_leaves_every_table_empty() {
	let db = TestDatabase::migrated().await;
	db.seed(&["users", "footsteps"], SeedOptions::new().with_count(3))
		.await
		.unwrap();
	assert_eq!(db.count("footsteps").await, 3);

	let clear_only = SeedOptions::new().with_clear(true).with_generate(false);
	let first = db.seed(&[], clear_only.clone()).await.unwrap();
	for table in BUNDLED_TABLES {
		assert_eq!(db.count(table).await, 0);
	}

	let second = db.seed(&[], clear_only).await.unwrap();
	for table in BUNDLED_TABLES {
		assert_eq!(db.count(table).await, 0);
	}

	assert!(first.entities.is_empty());
	assert!(first.cleared.iter().any(|c| c.table == "footsteps" && c.deleted == 3));
	assert_eq!(second.cleared.len(), BUNDLED_TABLES.len());
	assert!(second.cleared.iter().all(|c| c.deleted == 0));
}

#[rstest]
#[tokio::test]
async fn test_clear_then_generate_replaces_rows() {
	let db = TestDatabase::migrated().await;
	db.seed(&["users"], SeedOptions::new().with_count(4))
		.await
		.unwrap();

	let report = db
		.seed(&["users"], SeedOptions::new().with_count(2).with_clear(true))
		.await
		.unwrap();

	assert_eq!(report.cleared[0].deleted, 4);
	assert_eq!(report.total_created(), 2);
	assert_eq!(db.count("users").await, 2);
}

#[rstest]
#[tokio::test]
async fn test_plan_places_targets_before_referrers() {
	let db = TestDatabase::migrated().await;

	let schema = db.introspect(&[]).await.unwrap();
	let tables = schema.plan.tables();

	for (index, entity) in schema.plan.iter().enumerate() {
		for dependency in entity.dependencies() {
			let target = tables.iter().position(|t| *t == dependency).unwrap();
			assert!(
				target < index,
				"{} must come before {}",
				dependency,
				entity.table
			);
		}
	}
}

#[rstest]
#[tokio::test]
async fn test_full_run_persists_only_valid_rows() {
	let db = TestDatabase::migrated().await;

	let report = db
		.seed(&[], SeedOptions::new().with_count(3))
		.await
		.unwrap();

	assert_eq!(report.entities.len(), BUNDLED_TABLES.len());
	assert_eq!(report.entity("users").unwrap().created, 3);

	let schema = db.introspect(&[]).await.unwrap();
	for entity in schema.plan.iter() {
		for column in entity.columns.iter().filter(|c| !c.nullable) {
			let sql = format!(
				"SELECT COUNT(*) FROM \"{}\" WHERE \"{}\" IS NULL",
				entity.table, column.name
			);
			let (nulls,): (i64,) = sqlx::query_as(&sql).fetch_one(&db.pool).await.unwrap();
			assert_eq!(nulls, 0, "{}.{} holds NULL", entity.table, column.name);
		}
	}

	for (table, a, b) in [
		("followers", "follower_id", "followed_id"),
		("friends", "requester_id", "accepter_id"),
	] {
		let sql = format!("SELECT COUNT(*) FROM {} WHERE {} = {}", table, a, b);
		let (same,): (i64,) = sqlx::query_as(&sql).fetch_one(&db.pool).await.unwrap();
		assert_eq!(same, 0);
	}
}

#[rstest]
#[case::unfillable_column("CREATE TABLE blobs (id INTEGER PRIMARY KEY, payload BLOB NOT NULL)", "blobs")]
#[case::always_rejected(
	"CREATE TABLE labels (id INTEGER PRIMARY KEY, label TEXT NOT NULL CHECK (length(label) < 0))",
	"labels"
)]
#[tokio::test]
async fn test_retries_are_bounded_when_every_attempt_fails(
	#[case] ddl: &str,
	#[case] table: &str,
) {
	let db = TestDatabase::empty().await;
	db.execute(ddl).await;

	let report = db
		.seed(&[table], SeedOptions::new().with_count(4).with_attempts(3))
		.await
		.unwrap();

	let entity = report.entity(table).unwrap();
	assert_eq!(entity.created, 0);
	assert_eq!(entity.skipped, 4);
	assert_eq!(entity.attempts, 4 * 3);
	assert_eq!(db.count(table).await, 0);
}

#[rstest]
#[tokio::test]
async fn test_self_reference_is_left_null() {
	let db = TestDatabase::empty().await;
	db.execute(
		"CREATE TABLE categories (
			id INTEGER PRIMARY KEY,
			title TEXT NOT NULL,
			parent_id INTEGER REFERENCES categories (id)
		)",
	)
	.await;

	let report = db
		.seed(&["categories"], SeedOptions::new().with_count(2))
		.await
		.unwrap();

	assert_eq!(report.total_created(), 2);
	assert_eq!(db.count("categories").await, 2);
}
