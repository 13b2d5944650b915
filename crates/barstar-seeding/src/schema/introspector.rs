//! Schema introspection and generation planning.

use std::collections::HashMap;

use super::{EntityDescriptor, SchemaRegistry};
use crate::error::{SeedingError, SeedingResult};

/// Converts a snake_case table name into a PascalCase type name.
///
/// # Examples
///
/// ```
/// use barstar_seeding::schema::table_to_type_name;
///
/// assert_eq!(table_to_type_name("operator_venues"), "OperatorVenues");
/// assert_eq!(table_to_type_name("user"), "User");
/// ```
pub fn table_to_type_name(table: &str) -> String {
	table
		.split('_')
		.filter(|part| !part.is_empty())
		.map(|part| {
			let mut chars = part.chars();
			match chars.next() {
				Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
				None => String::new(),
			}
		})
		.collect()
}

/// Entities in the order they must be populated.
#[derive(Debug, Clone, Default)]
pub struct GenerationPlan {
	entities: Vec<EntityDescriptor>,
}

impl GenerationPlan {
	/// Wraps an already ordered list of entities.
	pub fn new(entities: Vec<EntityDescriptor>) -> Self {
		Self { entities }
	}

	/// Entities, parents first.
	pub fn entities(&self) -> &[EntityDescriptor] {
		&self.entities
	}

	/// Iterates parents first.
	pub fn iter(&self) -> std::slice::Iter<'_, EntityDescriptor> {
		self.entities.iter()
	}

	/// Table names, parents first.
	pub fn tables(&self) -> Vec<&str> {
		self.entities.iter().map(|e| e.table.as_str()).collect()
	}

	/// Number of planned entities.
	pub fn len(&self) -> usize {
		self.entities.len()
	}

	/// Returns true if nothing is planned.
	pub fn is_empty(&self) -> bool {
		self.entities.is_empty()
	}
}

/// Output of [`SchemaIntrospector::introspect`].
#[derive(Debug, Clone)]
pub struct IntrospectedSchema {
	/// Every known entity keyed by table, including ones the filter left out.
	///
	/// Foreign key resolution may need to manufacture rows for those.
	pub entity_by_table: HashMap<String, EntityDescriptor>,
	/// Filtered entities in dependency order.
	pub plan: GenerationPlan,
}

/// Builds entity descriptors and the generation plan from a registry.
pub struct SchemaIntrospector<'a, R: SchemaRegistry + ?Sized> {
	registry: &'a R,
	include: Vec<String>,
}

impl<'a, R: SchemaRegistry + ?Sized> SchemaIntrospector<'a, R> {
	/// Creates an introspector with no inclusion filter.
	pub fn new(registry: &'a R) -> Self {
		Self {
			registry,
			include: Vec::new(),
		}
	}

	/// Restricts the plan to the named entities.
	///
	/// Names match case-insensitively against the table name, the type name,
	/// or the PascalCase form of the table name. An empty list keeps all.
	pub fn with_include(mut self, include: Vec<String>) -> Self {
		self.include = include;
		self
	}

	/// Returns true if `entity` passes the inclusion filter.
	pub fn should_include(&self, entity: &EntityDescriptor) -> bool {
		self.include.is_empty()
			|| self
				.include
				.iter()
				.any(|name| matches_entity(name, entity))
	}

	/// Reads the registry and produces the plan.
	///
	/// Fails with [`SeedingError::NoMatchingEntities`] when a filter is set
	/// and it matches nothing.
	pub async fn introspect(&self) -> SeedingResult<IntrospectedSchema> {
		let entities = self.registry.list_entities().await?;

		for name in &self.include {
			if !entities.iter().any(|entity| matches_entity(name, entity)) {
				tracing::warn!(name = %name, "Filter name matches no entity");
			}
		}

		let planned: Vec<EntityDescriptor> = entities
			.iter()
			.filter(|entity| self.should_include(entity))
			.cloned()
			.collect();

		if !self.include.is_empty() && planned.is_empty() {
			return Err(SeedingError::NoMatchingEntities {
				filter: self.include.clone(),
			});
		}

		let plan = GenerationPlan::new(planned);
		tracing::info!(
			entities = entities.len(),
			planned = plan.len(),
			order = ?plan.tables(),
			"Built generation plan"
		);

		let entity_by_table = entities
			.into_iter()
			.map(|entity| (entity.table.clone(), entity))
			.collect();

		Ok(IntrospectedSchema {
			entity_by_table,
			plan,
		})
	}
}

fn matches_entity(name: &str, entity: &EntityDescriptor) -> bool {
	name.eq_ignore_ascii_case(&entity.table)
		|| name.eq_ignore_ascii_case(&entity.name)
		|| name.eq_ignore_ascii_case(&table_to_type_name(&entity.table))
}
