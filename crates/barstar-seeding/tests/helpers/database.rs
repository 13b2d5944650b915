//! Throwaway SQLite databases.
//!
//! Every [`TestDatabase`] lives in its own temporary directory, which is
//! removed when the value is dropped.

use barstar_seeding::prelude::*;
use sqlx::SqlitePool;
use tempfile::TempDir;

/// An on-disk SQLite database owned by one test.
pub struct TestDatabase {
	/// Pool over the database file.
	pub pool: SqlitePool,
	_dir: TempDir,
}

impl TestDatabase {
	/// Creates an empty database.
	pub async fn empty() -> Self {
		let dir = TempDir::new().expect("Failed to create temp dir");
		let url = format!("sqlite://{}", dir.path().join("seed.db").display());
		let pool = connect_pool(&url).await.expect("Failed to open database");
		Self { pool, _dir: dir }
	}

	/// Creates a database holding the bundled application schema.
	pub async fn migrated() -> Self {
		let db = Self::empty().await;
		migrations::apply(&db.pool)
			.await
			.expect("Failed to apply bundled schema");
		db
	}

	/// Runs raw DDL or DML.
	pub async fn execute(&self, sql: &str) {
		sqlx::raw_sql(sql)
			.execute(&self.pool)
			.await
			.expect("Failed to execute SQL");
	}

	/// Number of rows in `table`.
	pub async fn count(&self, table: &str) -> i64 {
		let sql = format!("SELECT COUNT(*) FROM \"{}\"", table);
		let (count,): (i64,) = sqlx::query_as(&sql)
			.fetch_one(&self.pool)
			.await
			.expect("Failed to count rows");
		count
	}

	/// Introspects the live schema, keeping only `include` when non-empty.
	pub async fn introspect(&self, include: &[&str]) -> SeedingResult<IntrospectedSchema> {
		let registry = SqliteSchemaRegistry::new(self.pool.clone());
		SchemaIntrospector::new(&registry)
			.with_include(include.iter().map(|s| s.to_string()).collect())
			.introspect()
			.await
	}

	/// Introspects and seeds in one go.
	pub async fn seed(&self, include: &[&str], options: SeedOptions) -> SeedingResult<SeedReport> {
		let schema = self.introspect(include).await?;
		let gateway = SqliteGateway::acquire(&self.pool).await?;
		let mut seeder = Seeder::new(schema, gateway, FakerProvider::new(), options);
		seeder.run().await
	}
}
