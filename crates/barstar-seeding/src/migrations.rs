//! Bundled application schema.
//!
//! The SQL files under `migrations/` recreate the application's tables on
//! SQLite so a fresh database can be seeded without the application itself.

use sqlx::SqlitePool;
use sqlx::migrate::Migrator;

use crate::error::SeedingResult;

/// Embedded migrations, applied in file name order.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Applies every pending bundled migration to `pool`.
pub async fn apply(pool: &SqlitePool) -> SeedingResult<()> {
	MIGRATOR.run(pool).await?;
	tracing::info!(migrations = MIGRATOR.iter().count(), "Applied bundled schema");
	Ok(())
}
