//! Row generation.
//!
//! [`RowFactory::generate`] fills a [`RowDraft`] column by column. Scalar
//! columns are dispatched on their [`LogicalType`]; foreign key columns go
//! through the resolver, which may recurse back into `generate` for the
//! referenced entity.

use std::collections::HashMap;

use chrono::Utc;
use futures::future::BoxFuture;
use rand::Rng;
use rand::seq::SliceRandom;
use uuid::Uuid;

use crate::config::{MAX_DATETIME_WINDOW_DAYS, MAX_DURATION_SECONDS, SeedOptions};
use crate::error::SeedingResult;
use crate::faker::FakeDataProvider;
use crate::persistence::PersistenceGateway;
use crate::resolver::RecursionGuard;
use crate::schema::{ColumnDescriptor, EntityDescriptor, LogicalType};
use crate::value::{FieldValue, RowDraft};

/// OAuth provider tokens used for `provider` columns.
const PROVIDERS: &[&str] = &["google", "apple", "facebook", "github"];

/// Builds candidate rows for one run.
///
/// Borrows everything it needs from the orchestrator for the duration of a
/// single row attempt.
pub struct RowFactory<'a, G: ?Sized, P: ?Sized> {
	pub(crate) entities: &'a HashMap<String, EntityDescriptor>,
	pub(crate) gateway: &'a mut G,
	pub(crate) faker: &'a mut P,
	pub(crate) options: &'a SeedOptions,
}

impl<'a, G, P> RowFactory<'a, G, P>
where
	G: PersistenceGateway + ?Sized,
	P: FakeDataProvider + ?Sized,
{
	/// Creates a factory over the given entities and collaborators.
	pub fn new(
		entities: &'a HashMap<String, EntityDescriptor>,
		gateway: &'a mut G,
		faker: &'a mut P,
		options: &'a SeedOptions,
	) -> Self {
		Self {
			entities,
			gateway,
			faker,
			options,
		}
	}

	/// Produces one candidate row for `entity`.
	///
	/// Returns `Ok(None)` as soon as a required column cannot be populated;
	/// a partially filled draft is never returned. Errors are reserved for
	/// store failures raised while resolving foreign keys.
	pub fn generate<'s>(
		&'s mut self,
		entity: &'s EntityDescriptor,
		guard: &'s RecursionGuard,
	) -> BoxFuture<'s, SeedingResult<Option<RowDraft>>> {
		Box::pin(async move {
			let mut draft = RowDraft::new();

			for column in &entity.columns {
				if draft.contains(&column.name) || column.auto_increment {
					continue;
				}
				if (column.server_default || column.client_default) && !column.unique {
					continue;
				}

				let value = if column.foreign_key.is_some() {
					self.resolve(entity, column, &draft, guard).await?
				} else {
					generate_scalar(column, &mut *self.faker, self.options)
				};

				match value {
					Some(value) => draft.set(column.name.clone(), value),
					None if column.is_required() => {
						tracing::debug!(
							table = %entity.table,
							column = %column.name,
							"Required column left empty, discarding draft"
						);
						return Ok(None);
					}
					None => {}
				}
			}

			Ok(Some(draft))
		})
	}
}

/// Generates a value for a column that is not a foreign key.
///
/// Returns `None` for types no generator exists for.
pub fn generate_scalar<P>(
	column: &ColumnDescriptor,
	faker: &mut P,
	options: &SeedOptions,
) -> Option<FieldValue>
where
	P: FakeDataProvider + ?Sized,
{
	let value = match &column.logical_type {
		LogicalType::Uuid => FieldValue::Uuid(Uuid::new_v4()),
		LogicalType::String => FieldValue::Text(generate_text(&column.name, faker)),
		LogicalType::Enum(members) => {
			FieldValue::Text(members.choose(faker.rng())?.clone())
		}
		LogicalType::Boolean => FieldValue::Boolean(faker.rng().gen_bool(0.5)),
		LogicalType::Integer => {
			FieldValue::Integer(faker.rng().gen_range(0..=options.integer_max.max(0)))
		}
		LogicalType::Float => FieldValue::Float(faker.rng().r#gen::<f64>() * options.float_max),
		LogicalType::DateTime => FieldValue::DateTime(random_instant(faker, options)),
		LogicalType::Date => FieldValue::Date(random_instant(faker, options).date_naive()),
		LogicalType::Time => FieldValue::Time(random_instant(faker, options).time()),
		LogicalType::Duration => {
			let seconds = faker
				.rng()
				.gen_range(0..=options.duration_max_seconds.clamp(0, MAX_DURATION_SECONDS));
			FieldValue::Duration(chrono::Duration::seconds(seconds))
		}
		LogicalType::Unsupported(_) => return None,
	};

	Some(value)
}

/// Text for a string column, picked by name.
fn generate_text<P>(name: &str, faker: &mut P) -> String
where
	P: FakeDataProvider + ?Sized,
{
	let name = name.to_lowercase();

	if name.ends_with("_id") {
		// Denormalised identifier, not a real reference
		format!("{:032x}", faker.rng().r#gen::<u128>())
	} else if name.contains("email") {
		faker.email()
	} else if name.ends_with("name") || name.contains("full_name") {
		faker.person_name()
	} else if name.contains("provider") {
		PROVIDERS
			.choose(faker.rng())
			.map(|p| p.to_string())
			.unwrap_or_default()
	} else if name.contains("token") {
		let rng = faker.rng();
		let (high, low) = (rng.r#gen::<u128>(), rng.r#gen::<u128>());
		format!("{:032x}{:032x}", high, low)
	} else {
		faker.sentence()
	}
}

/// An instant between `datetime_window_days` ago and now.
fn random_instant<P>(faker: &mut P, options: &SeedOptions) -> chrono::DateTime<Utc>
where
	P: FakeDataProvider + ?Sized,
{
	let window = options
		.datetime_window_days
		.clamp(0, MAX_DATETIME_WINDOW_DAYS)
		* 86_400;
	let back = faker.rng().gen_range(0..=window);
	Utc::now() - chrono::Duration::seconds(back)
}
