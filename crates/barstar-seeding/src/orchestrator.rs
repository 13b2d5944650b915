//! Seeding orchestrator.
//!
//! Walks the generation plan in dependency order and creates the configured
//! number of rows for each entity. A row that cannot be produced within the
//! attempt budget is skipped; only store failures stop the run.

use std::fmt;

use crate::config::SeedOptions;
use crate::error::SeedingResult;
use crate::faker::FakeDataProvider;
use crate::generator::RowFactory;
use crate::persistence::{PersistenceGateway, persist};
use crate::resolver::RecursionGuard;
use crate::schema::{EntityDescriptor, GenerationPlan, IntrospectedSchema};

/// Savepoint wrapping one row attempt, including manufactured parents.
const ATTEMPT_SAVEPOINT: &str = "seed_attempt";

/// Savepoint wrapping a clear pass.
const CLEAR_SAVEPOINT: &str = "seed_clear";

/// Per-entity outcome of a generation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityReport {
	/// Entity type name.
	pub entity: String,
	/// Table name.
	pub table: String,
	/// Rows created.
	pub created: usize,
	/// Desired rows given up on.
	pub skipped: usize,
	/// Row attempts made.
	pub attempts: usize,
}

impl EntityReport {
	fn new(entity: &EntityDescriptor) -> Self {
		Self {
			entity: entity.name.clone(),
			table: entity.table.clone(),
			created: 0,
			skipped: 0,
			attempts: 0,
		}
	}
}

impl fmt::Display for EntityReport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{}: {} created, {} skipped",
			self.table, self.created, self.skipped
		)
	}
}

/// Rows removed from one table by a clear pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClearedEntity {
	/// Table name.
	pub table: String,
	/// Rows deleted.
	pub deleted: u64,
}

impl fmt::Display for ClearedEntity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}: {} deleted", self.table, self.deleted)
	}
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
	/// Clear pass, children first. Empty when clearing was not requested.
	pub cleared: Vec<ClearedEntity>,
	/// Generation pass, parents first. Empty for clear-only runs.
	pub entities: Vec<EntityReport>,
}

impl SeedReport {
	/// Rows created across all entities.
	pub fn total_created(&self) -> usize {
		self.entities.iter().map(|e| e.created).sum()
	}

	/// Rows skipped across all entities.
	pub fn total_skipped(&self) -> usize {
		self.entities.iter().map(|e| e.skipped).sum()
	}

	/// Report for one table.
	pub fn entity(&self, table: &str) -> Option<&EntityReport> {
		self.entities.iter().find(|e| e.table == table)
	}
}

impl fmt::Display for SeedReport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for cleared in &self.cleared {
			writeln!(f, "{}", cleared)?;
		}
		for entity in &self.entities {
			writeln!(f, "{}", entity)?;
		}
		Ok(())
	}
}

/// Drives a seeding run over an introspected schema.
///
/// # Examples
///
/// ```ignore
/// let registry = SqliteSchemaRegistry::new(pool.clone());
/// let schema = SchemaIntrospector::new(&registry).introspect().await?;
/// let gateway = SqliteGateway::acquire(&pool).await?;
///
/// let mut seeder = Seeder::new(schema, gateway, FakerProvider::new(), SeedOptions::new());
/// let report = seeder.run().await?;
/// print!("{}", report);
/// ```
pub struct Seeder<G, P> {
	schema: IntrospectedSchema,
	gateway: G,
	faker: P,
	options: SeedOptions,
}

impl<G, P> Seeder<G, P>
where
	G: PersistenceGateway,
	P: FakeDataProvider,
{
	/// Creates a seeder.
	pub fn new(schema: IntrospectedSchema, gateway: G, faker: P, options: SeedOptions) -> Self {
		Self {
			schema,
			gateway,
			faker,
			options,
		}
	}

	/// The generation plan.
	pub fn plan(&self) -> &GenerationPlan {
		&self.schema.plan
	}

	/// Runtime options.
	pub fn options(&self) -> &SeedOptions {
		&self.options
	}

	/// Mutable access to the gateway.
	pub fn gateway_mut(&mut self) -> &mut G {
		&mut self.gateway
	}

	/// Consumes the seeder, returning the gateway.
	pub fn into_gateway(self) -> G {
		self.gateway
	}

	/// Clears and/or generates according to the options.
	pub async fn run(&mut self) -> SeedingResult<SeedReport> {
		let mut report = SeedReport::default();

		if self.options.clear {
			report.cleared = self.clear().await?;
		}
		if self.options.generate {
			report.entities = self.seed().await?;
		}

		tracing::info!(
			created = report.total_created(),
			skipped = report.total_skipped(),
			"Seeding run finished"
		);
		Ok(report)
	}

	/// Deletes every row of every planned entity, children first.
	///
	/// The pass is all or nothing.
	pub async fn clear(&mut self) -> SeedingResult<Vec<ClearedEntity>> {
		let Self {
			schema, gateway, ..
		} = self;

		gateway.begin_savepoint(CLEAR_SAVEPOINT).await?;

		let mut cleared = Vec::with_capacity(schema.plan.len());
		for entity in schema.plan.iter().rev() {
			match gateway.delete_all(&entity.table).await {
				Ok(deleted) => {
					tracing::info!(table = %entity.table, deleted, "Cleared table");
					cleared.push(ClearedEntity {
						table: entity.table.clone(),
						deleted,
					});
				}
				Err(error) => {
					if let Err(rollback_error) = gateway.rollback_savepoint(CLEAR_SAVEPOINT).await {
						tracing::error!(error = %rollback_error, "Failed to roll back clear");
					}
					return Err(error);
				}
			}
		}

		gateway.release_savepoint(CLEAR_SAVEPOINT).await?;
		Ok(cleared)
	}

	/// Generates `count` rows per planned entity, parents first.
	///
	/// Each desired row gets at most `attempts` tries, so an entity never
	/// sees more than `count * attempts` inserts of its own rows.
	pub async fn seed(&mut self) -> SeedingResult<Vec<EntityReport>> {
		let Self {
			schema,
			gateway,
			faker,
			options,
		} = self;

		let mut reports = Vec::with_capacity(schema.plan.len());

		for entity in schema.plan.iter() {
			let mut report = EntityReport::new(entity);
			tracing::info!(table = %entity.table, count = options.count, "Seeding entity");

			for row in 0..options.count {
				let mut created = false;

				for attempt in 1..=options.attempts {
					report.attempts += 1;
					let mut factory =
						RowFactory::new(&schema.entity_by_table, &mut *gateway, &mut *faker, options);
					if attempt_row(&mut factory, entity).await? {
						created = true;
						break;
					}
					tracing::debug!(table = %entity.table, row, attempt, "Row attempt failed");
				}

				if created {
					report.created += 1;
				} else {
					report.skipped += 1;
					tracing::warn!(
						table = %entity.table,
						row,
						attempts = options.attempts,
						"Skipping row after exhausting attempts"
					);
				}
			}

			tracing::info!(
				table = %entity.table,
				created = report.created,
				skipped = report.skipped,
				"Seeded entity"
			);
			reports.push(report);
		}

		Ok(reports)
	}
}

/// One attempt at one row: generate, then persist.
///
/// Everything the attempt wrote (manufactured parents included) is kept on
/// success and rolled back otherwise.
async fn attempt_row<G, P>(
	factory: &mut RowFactory<'_, G, P>,
	entity: &EntityDescriptor,
) -> SeedingResult<bool>
where
	G: PersistenceGateway + ?Sized,
	P: FakeDataProvider + ?Sized,
{
	factory.gateway.begin_savepoint(ATTEMPT_SAVEPOINT).await?;

	let guard = RecursionGuard::root(&entity.table);
	let outcome = match factory.generate(entity, &guard).await {
		Ok(Some(draft)) => persist(&mut *factory.gateway, entity, &draft).await,
		Ok(None) => Ok(false),
		Err(error) => Err(error),
	};

	match outcome {
		Ok(true) => {
			factory.gateway.release_savepoint(ATTEMPT_SAVEPOINT).await?;
			Ok(true)
		}
		Ok(false) => {
			factory.gateway.rollback_savepoint(ATTEMPT_SAVEPOINT).await?;
			Ok(false)
		}
		Err(error) => {
			if let Err(rollback_error) = factory.gateway.rollback_savepoint(ATTEMPT_SAVEPOINT).await {
				tracing::error!(error = %rollback_error, "Failed to roll back row attempt");
			}
			Err(error)
		}
	}
}
